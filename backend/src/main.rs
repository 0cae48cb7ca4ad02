mod config;
mod error;
mod instrumentation;
mod job_controller;
mod pipeline;
mod services;
mod storage;

use crate::config::Config;
use crate::instrumentation::Instrumentation;
use crate::job_controller::state::{prune_jobs_periodically, start_job_updater, JobsState};
use crate::pipeline::geocode::ConfiguredGeocoder;
use crate::storage::Database;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use env_logger::Env;
use include_dir::{include_dir, Dir};
use log::{error, info, warn};
use mime_guess::from_path;
use std::io;
use std::thread;
use std::time::Duration;

static STATIC_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/static");

/// Room for a large settings payload on `PATCH /api/maps/{id}`.
const JSON_LIMIT: usize = 1024 * 1024;
const JOB_QUEUE_CAPACITY: usize = 256;

async fn serve_embedded(req: HttpRequest) -> HttpResponse {
    let path = req.path().trim_start_matches('/');
    let file_path = if path.is_empty() { "index.html" } else { path };

    match STATIC_DIR.get_file(file_path) {
        Some(file) => {
            let mime = from_path(file_path).first_or_octet_stream();
            HttpResponse::Ok()
                .content_type(mime.as_ref())
                .body(file.contents().to_vec())
        }
        None => match STATIC_DIR.get_file("index.html") {
            Some(index) => HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body(index.contents().to_vec()),
            None => HttpResponse::NotFound().body("Not Found"),
        },
    }
}

fn startup_error(e: impl std::fmt::Display) -> io::Error {
    error!("{}", e);
    io::Error::other(e.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::load().map_err(startup_error)?;
    let url = config.url();

    let db = Database::new(&config.db_path);
    db.init().map_err(startup_error)?;
    info!("Database ready at {}", config.db_path.display());

    let geocoder =
        ConfiguredGeocoder::from_config(&config.geocoder).map_err(startup_error)?;
    let geocoder = web::Data::new(geocoder);
    match &config.geocoder.url {
        Some(endpoint) => info!("Geocoding through {}", endpoint),
        None => info!("Geocoding through Nominatim"),
    }

    let (jobs_state, rx) = JobsState::new(JOB_QUEUE_CAPACITY);
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        start_job_updater(updater_state, rx).await;
    });
    tokio::spawn(prune_jobs_periodically(jobs_state.clone()));

    tokio::spawn(services::sessions::expire_sessions_periodically(db.clone()));

    if config.open_browser {
        let browser_url = url.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(500));
            if let Err(e) = webbrowser::open(&browser_url) {
                warn!("Could not open a browser: {}", e);
            }
        });
    }

    info!("Server running at {}", url);

    let bind = (config.host.clone(), config.port);
    let instrumentation = Instrumentation::new(db.clone());
    let config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::JsonConfig::default().limit(JSON_LIMIT))
            .app_data(config.clone())
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(instrumentation.clone()))
            .app_data(web::Data::new(jobs_state.clone()))
            .app_data(geocoder.clone())
            .configure(services::configure_routes::<ConfiguredGeocoder>)
            .default_service(web::route().to(serve_embedded))
    })
    .bind(bind)?
    .run()
    .await
}
