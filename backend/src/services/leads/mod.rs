//! Email leads collected from the landing page.
//!
//! - `POST /api/leads`: stores `{email, name?, source?}`.
//! - `GET /api/leads`: admin listing, newest first.

use actix_web::web::{get, post, scope};
use actix_web::Scope;

mod create;
mod list;

const API_PATH: &str = "/api/leads";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(create::process))
        .route("", get().to(list::process))
}
