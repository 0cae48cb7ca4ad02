//! Operator endpoints under `/api/admin` and the token check every admin
//! route goes through.

use crate::config::Config;
use crate::error::AppError;
use crate::storage::{events, Database};
use actix_web::web::{get, scope};
use actix_web::{web, HttpRequest, HttpResponse, Scope};
use log::warn;
use serde::Deserialize;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

const API_PATH: &str = "/api/admin";
const DEFAULT_LOG_LIMIT: usize = 50;
const MAX_LOG_LIMIT: usize = 500;

pub fn configure_routes() -> Scope {
    scope(API_PATH).route("/logs", get().to(logs))
}

/// Refuses the request unless it carries the configured admin token.
/// Without a configured token every admin request is refused.
pub fn require_admin(req: &HttpRequest, config: &Config) -> Result<(), AppError> {
    let expected = config.admin_token.as_deref().ok_or(AppError::Unauthorized)?;
    let given = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    if given.is_some_and(|given| tokens_match(given.as_bytes(), expected.as_bytes())) {
        Ok(())
    } else {
        warn!("Rejected admin request to {}", req.path());
        Err(AppError::Unauthorized)
    }
}

/// Compares every byte regardless of where the first mismatch is.
fn tokens_match(given: &[u8], expected: &[u8]) -> bool {
    given.len() == expected.len()
        && given
            .iter()
            .zip(expected)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

#[derive(Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
}

/// Most recent error reports, newest first.
async fn logs(
    req: HttpRequest,
    query: web::Query<LogsQuery>,
    config: web::Data<Config>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    require_admin(&req, &config)?;
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT);
    let conn = db.open()?;
    Ok(HttpResponse::Ok().json(events::recent_error_reports(&conn, limit)?))
}
