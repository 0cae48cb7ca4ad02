use crate::error::AppError;
use crate::storage::{feedback, Database};
use actix_web::{web, HttpResponse};
use common::requests::CreateFeedbackRequest;
use serde_json::json;

const RATING_RANGE: std::ops::RangeInclusive<i64> = 1..=5;

fn validate_rating(rating: i64) -> Result<u8, AppError> {
    if RATING_RANGE.contains(&rating) {
        Ok(rating as u8)
    } else {
        Err(AppError::BadRequest(format!(
            "Rating must be between {} and {}",
            RATING_RANGE.start(),
            RATING_RANGE.end()
        )))
    }
}

pub async fn process(
    body: web::Json<CreateFeedbackRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    let rating = validate_rating(body.rating)?;
    let conn = db.open()?;
    let id = feedback::insert_feedback(&conn, &body, rating)?;
    Ok(HttpResponse::Created().json(json!({ "id": id })))
}
