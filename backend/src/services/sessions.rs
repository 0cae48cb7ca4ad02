//! Anonymous browser sessions, valid for 24 hours.
//!
//! - `POST /api/sessions`: opens one. The returned id is what clients pass as
//!   `sessionId` to the upload, export, feedback, analytics and error endpoints.
//! - `GET /api/sessions/{session_id}`: whether it is still active.

use crate::error::AppError;
use crate::storage::{events, Database};
use actix_web::web::{get, post, scope};
use actix_web::{web, HttpResponse, Scope};
use common::requests::{SessionCreated, SessionState};
use log::{info, warn};
use std::time::Duration;

const API_PATH: &str = "/api/sessions";
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(create))
        .route("/{session_id}", get().to(state))
}

async fn create(db: web::Data<Database>) -> Result<HttpResponse, AppError> {
    let conn = db.open()?;
    let (session_id, expires_at) = events::create_session(&conn)?;
    Ok(HttpResponse::Created().json(SessionCreated {
        session_id,
        expires_at,
    }))
}

async fn state(
    session_id: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    let conn = db.open()?;
    let active = events::session_is_active(&conn, &session_id)?;
    Ok(HttpResponse::Ok().json(SessionState {
        session_id: session_id.into_inner(),
        active,
    }))
}

/// Closes expired sessions every `CLEANUP_INTERVAL`; runs for the lifetime of
/// the server.
pub async fn expire_sessions_periodically(db: Database) {
    let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
    loop {
        ticker.tick().await;
        let expired = db.open().and_then(|conn| events::expire_sessions(&conn));
        match expired {
            Ok(0) => {}
            Ok(n) => info!("Expired {} sessions", n),
            Err(e) => warn!("Session cleanup failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::pipeline::geocode::tests::TableGeocoder;
    use crate::services::test_support::TestState;
    use actix_web::{test, App};
    use common::requests::{SessionCreated, SessionState};

    #[actix_web::test]
    async fn created_session_is_active() {
        let state = TestState::new(TableGeocoder::default());
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let req = test::TestRequest::post().uri("/api/sessions").to_request();
        let created: SessionCreated = test::call_and_read_body_json(&app, req).await;
        assert!(created.expires_at.ends_with('Z'));

        let req = test::TestRequest::get()
            .uri(&format!("/api/sessions/{}", created.session_id))
            .to_request();
        let current: SessionState = test::call_and_read_body_json(&app, req).await;
        assert!(current.active);

        let req = test::TestRequest::get().uri("/api/sessions/unknown").to_request();
        let unknown: SessionState = test::call_and_read_body_json(&app, req).await;
        assert!(!unknown.active);
    }
}
