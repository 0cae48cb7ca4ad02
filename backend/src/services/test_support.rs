//! An app wired like `main.rs`, around a throwaway database and a table geocoder.

use crate::config::Config;
use crate::instrumentation::Instrumentation;
use crate::job_controller::state::{start_job_updater, JobsState};
use crate::pipeline::geocode::tests::TableGeocoder;
use crate::storage::test_support::temp_db;
use crate::storage::Database;
use actix_web::web::{self, ServiceConfig};
use tempfile::TempDir;

pub(crate) const ADMIN_TOKEN: &str = "letmein";
pub(crate) const BOUNDARY: &str = "mapper-test-boundary";

pub(crate) struct TestState {
    _dir: TempDir,
    pub db: Database,
    pub config: Config,
    pub jobs: JobsState,
    pub geocoder: web::Data<TableGeocoder>,
}

impl TestState {
    /// Must be called inside a runtime: the job updater is spawned here.
    pub fn new(geocoder: TableGeocoder) -> Self {
        let (dir, db) = temp_db();
        let config = Config {
            admin_token: Some(ADMIN_TOKEN.to_string()),
            ..Config::default()
        };
        let (jobs, rx) = JobsState::new(64);
        tokio::spawn(start_job_updater(jobs.clone(), rx));
        Self {
            _dir: dir,
            db,
            config,
            jobs,
            geocoder: web::Data::new(geocoder),
        }
    }

    pub fn configure(&self, cfg: &mut ServiceConfig) {
        cfg.app_data(web::Data::new(self.config.clone()))
            .app_data(web::Data::new(self.db.clone()))
            .app_data(web::Data::new(Instrumentation::new(self.db.clone())))
            .app_data(web::Data::new(self.jobs.clone()))
            .app_data(self.geocoder.clone());
        super::configure_routes::<TableGeocoder>(cfg);
    }
}

/// Builds a `multipart/form-data` body from `(name, filename, content)` parts.
pub(crate) fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let disposition = match filename {
            Some(f) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: text/csv\r\n\r\n",
                name, f
            ),
            None => format!(
                "Content-Disposition: form-data; name=\"{}\"\r\nContent-Type: application/json\r\n\r\n",
                name
            ),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}
