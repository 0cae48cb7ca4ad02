//! HTTP surface of the mapper.
//!
//! Every area exposes `configure_routes()` returning its own Actix scope;
//! [`configure_routes`] here mounts them all. Handlers take their
//! collaborators as `web::Data` registered in `main.rs`: `Config`,
//! `Database`, `Instrumentation`, `JobsState` and the geocoder.

pub mod admin;
pub mod analytics;
pub mod errors;
pub mod feedback;
pub mod geocode;
pub mod leads;
pub mod maps;
pub mod pages;
pub mod sessions;

#[cfg(test)]
pub(crate) mod test_support;

use crate::pipeline::geocode::Geocoder;
use actix_web::web::ServiceConfig;

/// Mounts every API scope and the public map pages.
pub fn configure_routes<G: Geocoder + 'static>(cfg: &mut ServiceConfig) {
    cfg.service(maps::configure_routes::<G>())
        .service(geocode::configure_routes::<G>())
        .service(leads::configure_routes())
        .service(feedback::configure_routes())
        .service(sessions::configure_routes())
        .service(analytics::configure_routes())
        .service(errors::configure_routes())
        .service(admin::configure_routes())
        .service(pages::map_routes())
        .service(pages::embed_routes());
}
