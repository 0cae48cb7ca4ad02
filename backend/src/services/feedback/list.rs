use crate::config::Config;
use crate::error::AppError;
use crate::services::admin::require_admin;
use crate::storage::{feedback, Database};
use actix_web::{web, HttpRequest, HttpResponse};

pub async fn process(
    req: HttpRequest,
    config: web::Data<Config>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    require_admin(&req, &config)?;
    let conn = db.open()?;
    Ok(HttpResponse::Ok().json(feedback::list_feedback(&conn)?))
}
