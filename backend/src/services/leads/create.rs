use crate::error::AppError;
use crate::storage::{leads, Database};
use actix_web::{web, HttpResponse};
use common::requests::CreateLeadRequest;
use log::info;
use serde_json::json;

/// Loose shape check: something before and after a single `@`, with a dot in
/// the domain part.
fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

pub async fn process(
    lead: web::Json<CreateLeadRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    if !looks_like_email(lead.email.trim()) {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }
    let conn = db.open()?;
    let id = leads::insert_lead(&conn, &lead)?;
    info!("New lead from source {:?}", lead.source);
    Ok(HttpResponse::Created().json(json!({ "id": id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(looks_like_email("ada@example.org"));
        assert!(!looks_like_email("ada"));
        assert!(!looks_like_email("@example.org"));
        assert!(!looks_like_email("ada@example"));
        assert!(!looks_like_email("ada@@example.org"));
        assert!(!looks_like_email("a da@example.org"));
    }
}
