//! The background half of an upload: geocode, center, save.
//!
//! `schedule_map_job` registers a job as `Pending`, returns its id right away
//! and spawns `run_map_job`. Progress is reported as the percentage of members
//! settled by the enricher; the final status carries the saved map id or the
//! failure message.

use crate::error::{AppError, UploadError};
use crate::instrumentation::{
    Instrumentation, SessionContext, MAP_CREATION_COMPLETED, MAP_CREATION_ERROR,
};
use crate::job_controller::state::JobsState;
use crate::pipeline::center::calculate_map_center;
use crate::pipeline::geocode::{enrich_members, EnrichOptions, Geocoder};
use crate::storage::maps::{self, NewMap};
use crate::storage::Database;
use common::jobs::JobStatus;
use common::model::admin::ErrorSeverity;
use common::model::map::SavedMap;
use common::model::member::CommunityMember;
use common::model::settings::MapSettings;
use log::warn;
use serde_json::json;
use std::sync::Arc;

/// Zoom stored with a freshly generated map.
pub const DEFAULT_SAVED_ZOOM: f64 = 2.0;

/// Everything the job needs from the parsed upload.
pub struct MapJobInput {
    pub name: String,
    pub settings: MapSettings,
    pub members: Vec<CommunityMember>,
    pub source_md5: String,
    pub session: SessionContext,
}

/// Shared collaborators of every map job.
pub struct MapJobContext<G> {
    pub jobs: JobsState,
    pub geocoder: Arc<G>,
    pub db: Database,
    pub instrumentation: Instrumentation,
    pub options: EnrichOptions,
}

impl<G> Clone for MapJobContext<G> {
    fn clone(&self) -> Self {
        Self {
            jobs: self.jobs.clone(),
            geocoder: Arc::clone(&self.geocoder),
            db: self.db.clone(),
            instrumentation: self.instrumentation.clone(),
            options: self.options.clone(),
        }
    }
}

fn percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        100
    } else {
        (done * 100 / total) as u32
    }
}

/// Registers the job and runs it in the background. Returns the job id.
pub async fn schedule_map_job<G: Geocoder + 'static>(
    ctx: MapJobContext<G>,
    input: MapJobInput,
) -> String {
    let job_id = ctx.jobs.register().await;
    let value = job_id.clone();

    tokio::spawn(async move {
        let session = input.session.clone();
        let status = match run_map_job(&ctx, &value, input).await {
            Ok(map) => JobStatus::Completed(map.id),
            Err(e) => {
                let message = e.to_string();
                let instrumentation = ctx.instrumentation.clone();
                let (error, job_id) = (message.clone(), value.clone());
                let recorded = tokio::task::spawn_blocking(move || {
                    instrumentation.track(&session, MAP_CREATION_ERROR, json!({ "error": error }));
                    instrumentation.report_error(
                        &session,
                        "MAP",
                        ErrorSeverity::High,
                        &error,
                        json!({ "job_id": job_id }),
                    );
                })
                .await;
                if let Err(e) = recorded {
                    warn!("Could not record failure of job {}: {}", value, e);
                }
                JobStatus::Failed(message)
            }
        };
        ctx.jobs.report(&value, status).await;
    });

    job_id
}

/// Enriches the members, computes the center and stores the map.
pub async fn run_map_job<G: Geocoder>(
    ctx: &MapJobContext<G>,
    job_id: &str,
    input: MapJobInput,
) -> Result<SavedMap, AppError> {
    ctx.jobs.report(job_id, JobStatus::InProgress(0)).await;

    let uploaded = input.members.len();
    let members = enrich_members(
        ctx.geocoder.as_ref(),
        input.members,
        &ctx.options,
        |done, total| ctx.jobs.try_report(job_id, JobStatus::InProgress(percent(done, total))),
    )
    .await;
    if members.is_empty() {
        return Err(UploadError::Process(
            "None of the members could be placed on the map. Check the locations or add coordinates"
                .into(),
        )
        .into());
    }

    let center = calculate_map_center(&members);
    let zoom = input.settings.zoom.unwrap_or(DEFAULT_SAVED_ZOOM);
    let placed = members.len();
    let db = ctx.db.clone();
    let instrumentation = ctx.instrumentation.clone();
    let MapJobInput {
        name,
        settings,
        source_md5,
        session,
        ..
    } = input;

    let saved = tokio::task::spawn_blocking(move || {
        let conn = db.open()?;
        let saved = maps::create_map(
            &conn,
            &NewMap {
                name: &name,
                settings: &settings,
                members: &members,
                center,
                zoom,
                source_md5: Some(&source_md5),
            },
        )?;
        instrumentation.track(
            &session,
            MAP_CREATION_COMPLETED,
            json!({ "map_id": saved.id, "members_count": placed, "dropped": uploaded - placed }),
        );
        Ok::<_, AppError>(saved)
    })
    .await??;
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_controller::state::start_job_updater;
    use crate::pipeline::geocode::tests::TableGeocoder;
    use crate::storage::events;
    use crate::storage::test_support::temp_db;
    use std::time::Duration;

    fn member(name: &str, location: Option<&str>, coords: Option<(f64, f64)>) -> CommunityMember {
        CommunityMember {
            id: format!("member-{}", name),
            uid: name.into(),
            name: name.into(),
            location: location.map(str::to_string),
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            image: None,
            title: None,
            website: None,
            linkedin: None,
        }
    }

    fn input(members: Vec<CommunityMember>) -> MapJobInput {
        MapJobInput {
            name: "Team".into(),
            settings: MapSettings::default(),
            members,
            source_md5: "md5".into(),
            session: SessionContext::anonymous(),
        }
    }

    fn context(db: &Database, geocoder: TableGeocoder) -> MapJobContext<TableGeocoder> {
        let (jobs, _rx) = JobsState::new(64);
        MapJobContext {
            jobs,
            geocoder: Arc::new(geocoder),
            db: db.clone(),
            instrumentation: Instrumentation::new(db.clone()),
            options: EnrichOptions {
                concurrency: 1,
                timeout: Duration::from_secs(5),
                retries: 0,
            },
        }
    }

    #[actix_web::test]
    async fn failed_geocode_keeps_the_rest_of_the_map() {
        let (_dir, db) = temp_db();
        let ctx = context(&db, TableGeocoder::default());
        let members = vec![
            member("A", None, Some((10.0, 20.0))),
            member("B", Some("Paris"), None),
        ];

        let saved = run_map_job(&ctx, "job", input(members)).await.unwrap();

        assert_eq!(saved.members.len(), 1);
        assert_eq!(saved.members[0].name, "A");
        assert_eq!(saved.center, [10.0, 20.0]);
        assert_eq!(saved.zoom, DEFAULT_SAVED_ZOOM);
        assert_eq!(ctx.geocoder.calls(), vec!["Paris".to_string()]);
    }

    #[actix_web::test]
    async fn nothing_placeable_is_a_process_error() {
        let (_dir, db) = temp_db();
        let ctx = context(&db, TableGeocoder::default());

        let err = run_map_job(&ctx, "job", input(vec![member("B", Some("Paris"), None)]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Upload(UploadError::Process(_))));
        let conn = db.open().unwrap();
        assert!(maps::list_maps(&conn).unwrap().is_empty());
    }

    #[actix_web::test]
    async fn scheduled_job_completes_with_the_map_id() {
        let (_dir, db) = temp_db();
        let (jobs, rx) = JobsState::new(64);
        let updater = tokio::spawn(start_job_updater(jobs.clone(), rx));
        let ctx = MapJobContext {
            jobs: jobs.clone(),
            ..context(&db, TableGeocoder::with(&[("Paris", "48.85", "2.35")]))
        };

        let job_id = schedule_map_job(ctx, input(vec![member("B", Some("Paris"), None)])).await;

        let mut status = None;
        for _ in 0..100 {
            status = jobs.status(&job_id).await;
            if matches!(status, Some(JobStatus::Completed(_)) | Some(JobStatus::Failed(_))) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let Some(JobStatus::Completed(map_id)) = status else {
            panic!("job did not complete: {:?}", status);
        };
        let conn = db.open().unwrap();
        let saved = maps::get_map(&conn, &map_id).unwrap().unwrap();
        assert_eq!(saved.center, [48.85, 2.35]);
        updater.abort();
    }

    #[actix_web::test]
    async fn failed_job_records_the_error() {
        let (_dir, db) = temp_db();
        let (jobs, rx) = JobsState::new(64);
        let updater = tokio::spawn(start_job_updater(jobs.clone(), rx));
        let ctx = MapJobContext {
            jobs: jobs.clone(),
            ..context(&db, TableGeocoder::default())
        };

        let job_id = schedule_map_job(ctx, input(vec![member("B", Some("Paris"), None)])).await;

        let mut status = None;
        for _ in 0..100 {
            status = jobs.status(&job_id).await;
            if matches!(status, Some(JobStatus::Failed(_))) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(matches!(status, Some(JobStatus::Failed(_))), "{:?}", status);

        let conn = db.open().unwrap();
        assert_eq!(events::count_events(&conn, MAP_CREATION_ERROR).unwrap(), 1);
        let reports = events::recent_error_reports(&conn, 5).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].category, "MAP");
        assert_eq!(reports[0].severity, ErrorSeverity::High);
        updater.abort();
    }

    #[actix_web::test]
    async fn completed_job_records_the_event() {
        let (_dir, db) = temp_db();
        let ctx = context(&db, TableGeocoder::default());

        run_map_job(&ctx, "job", input(vec![member("A", None, Some((1.0, 2.0)))]))
            .await
            .unwrap();

        let conn = db.open().unwrap();
        assert_eq!(events::count_events(&conn, MAP_CREATION_COMPLETED).unwrap(), 1);
    }

    #[test]
    fn percent_handles_empty_batches() {
        assert_eq!(percent(0, 0), 100);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(3, 3), 100);
    }
}
