//! Geocoding enrichment.
//!
//! Members that already carry usable coordinates pass through untouched. The
//! others are looked up by their free-text `location`; a member whose lookup
//! fails is logged and then dropped, so one bad row never sinks the batch.
//!
//! Lookups run through an ordered buffer of `concurrency` in-flight requests
//! (1 by default, which keeps the public endpoints happy), each bounded by a
//! timeout and retried a configurable number of times on transport errors.

use crate::config::GeocoderConfig;
use common::model::member::{CommunityMember, Coordinates};
use common::requests::GeocodeResponse;
use futures_util::{stream, StreamExt};
use log::{debug, info, warn};
use serde::Deserialize;
use std::future::Future;
use std::pin::pin;
use std::time::Duration;
use thiserror::Error;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geocoder answered with status {0}")]
    Status(u16),

    #[error("no result for '{0}'")]
    NotFound(String),

    #[error("invalid coordinates in response: {0}")]
    Invalid(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl GeocodeError {
    /// Only failures of the exchange itself are worth another attempt.
    fn is_retryable(&self) -> bool {
        match self {
            GeocodeError::Http(_) | GeocodeError::Timeout(_) => true,
            GeocodeError::Status(code) => *code == 429 || *code >= 500,
            GeocodeError::NotFound(_) | GeocodeError::Invalid(_) => false,
        }
    }
}

/// Resolves a free-text location to the collaborator's wire shape.
pub trait Geocoder: Send + Sync {
    fn geocode(
        &self,
        location: &str,
    ) -> impl Future<Output = Result<GeocodeResponse, GeocodeError>> + Send;
}

/// Checks that a response carries parseable, in-range coordinates.
pub fn validate_response(
    response: &GeocodeResponse,
) -> Result<(String, Coordinates), GeocodeError> {
    let latitude = response.latitude.trim().parse::<f64>();
    let longitude = response.longitude.trim().parse::<f64>();
    match (latitude, longitude) {
        (Ok(lat), Ok(lng)) => Coordinates::new(lat, lng)
            .map(|coords| (response.location.clone(), coords))
            .ok_or_else(|| GeocodeError::Invalid(format!("{}, {}", lat, lng))),
        _ => Err(GeocodeError::Invalid(format!(
            "'{}', '{}'",
            response.latitude, response.longitude
        ))),
    }
}

/// Talks to an endpoint implementing `GET ?location=` → `{location, latitude, longitude}`.
pub struct HttpGeocoder {
    client: reqwest::Client,
    url: String,
}

impl HttpGeocoder {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl Geocoder for HttpGeocoder {
    async fn geocode(&self, location: &str) -> Result<GeocodeResponse, GeocodeError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("location", location)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }
        Ok(response.json::<GeocodeResponse>().await?)
    }
}

#[derive(Deserialize)]
struct NominatimPlace {
    display_name: String,
    lat: String,
    lon: String,
}

/// Queries OpenStreetMap's Nominatim search directly.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: NOMINATIM_URL.to_string(),
        }
    }
}

impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, location: &str) -> Result<GeocodeResponse, GeocodeError> {
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", location), ("format", "json"), ("limit", "1")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }
        let places: Vec<NominatimPlace> = response.json().await?;
        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NotFound(location.to_string()))?;
        Ok(GeocodeResponse {
            location: place.display_name,
            latitude: place.lat,
            longitude: place.lon,
        })
    }
}

/// The geocoder selected by configuration.
pub enum ConfiguredGeocoder {
    Http(HttpGeocoder),
    Nominatim(NominatimGeocoder),
}

impl ConfiguredGeocoder {
    pub fn from_config(config: &GeocoderConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;
        Ok(match &config.url {
            Some(url) => ConfiguredGeocoder::Http(HttpGeocoder::new(client, url.clone())),
            None => ConfiguredGeocoder::Nominatim(NominatimGeocoder::new(client)),
        })
    }
}

impl Geocoder for ConfiguredGeocoder {
    async fn geocode(&self, location: &str) -> Result<GeocodeResponse, GeocodeError> {
        match self {
            ConfiguredGeocoder::Http(g) => g.geocode(location).await,
            ConfiguredGeocoder::Nominatim(g) => g.geocode(location).await,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub concurrency: usize,
    pub timeout: Duration,
    pub retries: u32,
}

impl From<&GeocoderConfig> for EnrichOptions {
    fn from(config: &GeocoderConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            timeout: config.timeout,
            retries: config.retries,
        }
    }
}

/// Looks up one location with timeout and retries, then validates the answer.
pub async fn lookup<G: Geocoder>(
    geocoder: &G,
    location: &str,
    options: &EnrichOptions,
) -> Result<(String, Coordinates), GeocodeError> {
    let mut attempt = 0;
    loop {
        let result = match tokio::time::timeout(options.timeout, geocoder.geocode(location)).await {
            Ok(result) => result,
            Err(_) => Err(GeocodeError::Timeout(options.timeout)),
        };
        match result.and_then(|response| validate_response(&response)) {
            Err(e) if e.is_retryable() && attempt < options.retries => {
                attempt += 1;
                debug!("Retrying geocode for '{}' ({}): {}", location, attempt, e);
            }
            other => return other,
        }
    }
}

async fn enrich_member<G: Geocoder>(
    geocoder: &G,
    member: CommunityMember,
    options: &EnrichOptions,
) -> CommunityMember {
    if member.coordinates().is_some() {
        return member;
    }
    let Some(query) = member.location_query() else {
        return member;
    };

    match lookup(geocoder, query, options).await {
        Ok((label, coords)) => {
            debug!("Geocoded {} ('{}') to {:?}", member.name, query, coords.as_array());
            CommunityMember {
                location: Some(label),
                latitude: Some(coords.latitude),
                longitude: Some(coords.longitude),
                ..member
            }
        }
        Err(e) => {
            warn!("Failed to geocode member {} ('{}'): {}", member.name, query, e);
            member
        }
    }
}

/// Fills in missing coordinates and drops members that still have none.
///
/// Output keeps input order. `on_progress(done, total)` is called after each
/// member is settled.
pub async fn enrich_members<G: Geocoder>(
    geocoder: &G,
    members: Vec<CommunityMember>,
    options: &EnrichOptions,
    mut on_progress: impl FnMut(usize, usize),
) -> Vec<CommunityMember> {
    let total = members.len();
    let mut enriched = Vec::with_capacity(total);
    let mut settled = pin!(stream::iter(members)
        .map(|member| enrich_member(geocoder, member, options))
        .buffered(options.concurrency.max(1)));

    let mut done = 0;
    while let Some(member) = settled.next().await {
        done += 1;
        on_progress(done, total);
        if member.coordinates().is_some() {
            enriched.push(member);
        } else {
            warn!("Skipping member {} due to missing or invalid coordinates", member.name);
        }
    }

    info!("{} of {} members placed on the map", enriched.len(), total);
    enriched
}
