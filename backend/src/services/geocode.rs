//! `GET /api/geocode?location=...`: proxies one lookup through the configured
//! geocoder and answers in the collaborator's own wire shape, coordinates as
//! strings.

use crate::config::Config;
use crate::error::AppError;
use crate::pipeline::geocode::{lookup, EnrichOptions, GeocodeError, Geocoder};
use actix_web::web::{get, scope};
use actix_web::{web, HttpResponse, Scope};
use common::requests::{GeocodeQuery, GeocodeResponse};

const API_PATH: &str = "/api/geocode";

pub fn configure_routes<G: Geocoder + 'static>() -> Scope {
    scope(API_PATH).route("", get().to(process::<G>))
}

async fn process<G: Geocoder + 'static>(
    query: web::Query<GeocodeQuery>,
    config: web::Data<Config>,
    geocoder: web::Data<G>,
) -> Result<HttpResponse, AppError> {
    let location = query.location.trim();
    if location.is_empty() {
        return Err(AppError::BadRequest("Location is required".to_string()));
    }

    match lookup(geocoder.get_ref(), location, &EnrichOptions::from(&config.geocoder)).await {
        Ok((label, coords)) => Ok(HttpResponse::Ok().json(GeocodeResponse {
            location: label,
            latitude: coords.latitude.to_string(),
            longitude: coords.longitude.to_string(),
        })),
        Err(GeocodeError::NotFound(_)) => Err(AppError::NotFound(format!("Location '{}'", location))),
        Err(e) => Err(AppError::Upstream(e.to_string())),
    }
}
