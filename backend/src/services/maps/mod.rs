//! Map lifecycle endpoints.
//!
//! - `POST /api/maps/upload`: multipart form with an optional `json` part
//!   (`UploadOptions`) and a `file` part holding the CSV. The file is checked
//!   for format and size while streaming and parsed inside the request; the
//!   geocoding and saving run as a background job whose id is returned.
//! - `GET /api/maps/upload/status/{job_id}`: current `JobStatus` of that job.
//! - `GET /api/maps/{map_id}`: the stored `SavedMap`.
//! - `PATCH /api/maps/{map_id}`: field-level update of name, settings or
//!   visibility.
//! - `GET /api/maps/{map_id}/export`: standalone HTML as an attachment.
//! - `GET /api/maps`, `DELETE /api/maps/{map_id}`: admin listing and removal.

use crate::pipeline::geocode::Geocoder;
use actix_web::web::{delete, get, patch, post, resource, scope};
use actix_web::Scope;

mod admin;
mod export;
mod get;
mod get_status;
mod update;
mod upload;

const API_PATH: &str = "/api/maps";

pub fn configure_routes<G: Geocoder + 'static>() -> Scope {
    scope(API_PATH)
        .route("", get().to(admin::list))
        .route("/upload", post().to(upload::process::<G>))
        .route("/upload/status/{job_id}", get().to(get_status::process))
        .route("/{map_id}/export", get().to(export::process))
        .service(
            resource("/{map_id}")
                .route(get().to(get::process))
                .route(patch().to(update::process))
                .route(delete().to(admin::delete)),
        )
}
