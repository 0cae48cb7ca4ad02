//! `POST /api/errors`: error reports sent by the browser. They are logged at a
//! level matching their severity and kept for `/api/admin/logs`.

use crate::error::AppError;
use crate::instrumentation::{Instrumentation, SessionContext};
use actix_web::web::{post, scope};
use actix_web::{web, HttpResponse, Scope};
use common::requests::ReportErrorRequest;
use serde_json::Value;

const API_PATH: &str = "/api/errors";
const MAX_MESSAGE_LEN: usize = 2000;

pub fn configure_routes() -> Scope {
    scope(API_PATH).route("", post().to(report))
}

async fn report(
    report: web::Json<ReportErrorRequest>,
    instrumentation: web::Data<Instrumentation>,
) -> Result<HttpResponse, AppError> {
    let report = report.into_inner();
    let message = report.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("message is required".to_string()));
    }
    let message: String = message.chars().take(MAX_MESSAGE_LEN).collect();
    let metadata = if report.metadata.is_empty() {
        Value::Null
    } else {
        Value::Object(report.metadata.into_iter().collect())
    };

    instrumentation.report_error(
        &SessionContext::new(report.session_id),
        report.category.trim(),
        report.severity,
        &message,
        metadata,
    );
    Ok(HttpResponse::Accepted().finish())
}

#[cfg(test)]
mod tests {
    use crate::pipeline::geocode::tests::TableGeocoder;
    use crate::services::test_support::TestState;
    use crate::storage::events;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use common::model::admin::ErrorSeverity;
    use serde_json::json;

    #[actix_web::test]
    async fn reports_are_kept_with_metadata() {
        let state = TestState::new(TableGeocoder::default());
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let req = test::TestRequest::post()
            .uri("/api/errors")
            .set_json(json!({
                "sessionId": "s-2",
                "category": "UPLOAD",
                "severity": "CRITICAL",
                "message": "Upload widget crashed",
                "metadata": { "browser": "firefox" }
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::ACCEPTED);

        let conn = state.db.open().unwrap();
        let reports = events::recent_error_reports(&conn, 1).unwrap();
        assert_eq!(reports[0].severity, ErrorSeverity::Critical);
        assert_eq!(reports[0].session_id.as_deref(), Some("s-2"));
        assert!(reports[0].metadata.as_deref().unwrap().contains("firefox"));
    }

    #[actix_web::test]
    async fn unknown_severity_is_rejected() {
        let state = TestState::new(TableGeocoder::default());
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let req = test::TestRequest::post()
            .uri("/api/errors")
            .set_json(json!({ "category": "X", "severity": "SEVERE", "message": "m" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
