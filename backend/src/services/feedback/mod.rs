//! User feedback on generated maps.
//!
//! - `POST /api/feedback`: `{feedbackType, rating, mapId?, sessionId?, comment?, email?}`
//!   with `rating` an integer from 1 to 5.
//! - `GET /api/feedback`: admin listing, newest first.

use actix_web::web::{get, post, scope};
use actix_web::Scope;

mod create;
mod list;

const API_PATH: &str = "/api/feedback";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(create::process))
        .route("", get().to(list::process))
}
