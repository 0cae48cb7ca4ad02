//! `POST /api/analytics/events`: client-side analytics events, stored as-is.

use crate::error::AppError;
use crate::instrumentation::SessionContext;
use crate::storage::{events, Database};
use actix_web::web::{post, scope};
use actix_web::{web, HttpResponse, Scope};
use common::requests::TrackEventRequest;
use serde_json::Value;

const API_PATH: &str = "/api/analytics";

pub fn configure_routes() -> Scope {
    scope(API_PATH).route("/events", post().to(track))
}

async fn track(
    event: web::Json<TrackEventRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    let TrackEventRequest {
        session_id,
        event_name,
        event_data,
    } = event.into_inner();
    let event_name = event_name.trim();
    if event_name.is_empty() {
        return Err(AppError::BadRequest("eventName is required".to_string()));
    }

    let session = SessionContext::new(session_id);
    let data = Value::Object(event_data.into_iter().collect());
    let conn = db.open()?;
    events::insert_event(&conn, session.session_id(), event_name, &data)?;
    Ok(HttpResponse::NoContent().finish())
}
