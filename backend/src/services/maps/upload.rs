use crate::config::Config;
use crate::error::{AppError, UploadError};
use crate::instrumentation::{
    Instrumentation, SessionContext, MAP_CREATION_ERROR, MAP_CREATION_STARTED,
};
use crate::job_controller::map_job::{schedule_map_job, MapJobContext, MapJobInput};
use crate::job_controller::state::JobsState;
use crate::pipeline::export::DEFAULT_TITLE;
use crate::pipeline::geocode::{EnrichOptions, Geocoder};
use crate::pipeline::parse::{ensure_csv_file_name, parse_members};
use crate::storage::Database;
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use common::model::settings::MapSettings;
use common::requests::{UploadAccepted, UploadOptions};
use futures_util::StreamExt;
use log::info;
use md5::Context;
use serde_json::json;

/// Upper bound for the `json` options part.
const OPTIONS_LIMIT: usize = 64 * 1024;
const MIB: usize = 1024 * 1024;

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
    md5: String,
}

fn malformed(e: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(format!("Malformed upload: {}", e))
}

fn size_error(limit: usize) -> UploadError {
    UploadError::Size {
        limit_mb: limit.div_ceil(MIB),
    }
}

/// Reads a whole field, failing as soon as it grows past `limit` bytes.
async fn read_field(
    field: &mut Field,
    limit: usize,
    mut hasher: Option<&mut Context>,
) -> Result<Vec<u8>, AppError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(malformed)?;
        if bytes.len() + chunk.len() > limit {
            return Err(size_error(limit).into());
        }
        if let Some(hasher) = hasher.as_deref_mut() {
            hasher.consume(&chunk);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Pulls the CSV out of the form, filling `options` from the `json` part as it
/// goes so a rejection can still be attributed to the session.
///
/// The file name is checked before a single byte of content is read, and the
/// content is counted while streaming so an oversized file never reaches the
/// parser.
async fn read_upload(
    mut payload: Multipart,
    max_bytes: usize,
    options: &mut UploadOptions,
) -> Result<Upload, AppError> {
    let mut file = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(malformed)?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(str::to_string));

        match name.as_deref() {
            Some("json") => {
                let bytes = read_field(&mut field, OPTIONS_LIMIT, None).await?;
                *options = serde_json::from_slice(&bytes)
                    .map_err(|e| AppError::BadRequest(format!("Invalid upload options: {}", e)))?;
            }
            Some("file") => {
                let file_name = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename().map(str::to_string))
                    .unwrap_or_default();
                ensure_csv_file_name(&file_name)?;

                let mut hasher = Context::new();
                let bytes = read_field(&mut field, max_bytes, Some(&mut hasher)).await?;
                file = Some((file_name, bytes, format!("{:x}", hasher.finalize())));
            }
            _ => {}
        }
    }

    let (file_name, bytes, md5) =
        file.ok_or_else(|| AppError::BadRequest("Missing file part".to_string()))?;
    Ok(Upload {
        file_name,
        bytes,
        md5,
    })
}

pub async fn process<G: Geocoder + 'static>(
    payload: Multipart,
    config: web::Data<Config>,
    db: web::Data<Database>,
    instrumentation: web::Data<Instrumentation>,
    jobs: web::Data<JobsState>,
    geocoder: web::Data<G>,
) -> Result<HttpResponse, AppError> {
    let mut options = UploadOptions::default();
    let upload = match read_upload(payload, config.max_upload_bytes, &mut options).await {
        Ok(upload) => upload,
        Err(AppError::Upload(e)) => {
            instrumentation.track(
                &SessionContext::new(options.session_id.clone()),
                MAP_CREATION_ERROR,
                json!({ "kind": e.kind(), "error": e.to_string() }),
            );
            return Err(e.into());
        }
        Err(e) => return Err(e),
    };
    let session = SessionContext::new(options.session_id.clone());
    instrumentation.track(
        &session,
        MAP_CREATION_STARTED,
        json!({ "file_name": upload.file_name, "file_size": upload.bytes.len() }),
    );

    let members = match parse_members(&upload.bytes, config.max_rows) {
        Ok(members) => members,
        Err(e) => {
            instrumentation.track(
                &session,
                MAP_CREATION_ERROR,
                json!({ "kind": e.kind(), "error": e.to_string() }),
            );
            return Err(e.into());
        }
    };
    let member_count = members.len();
    info!(
        "Parsed {} members from '{}' ({})",
        member_count, upload.file_name, upload.md5
    );

    let name = options
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string();
    let settings = options
        .settings
        .map(MapSettings::from_patch)
        .unwrap_or_default();

    let job_id = schedule_map_job(
        MapJobContext {
            jobs: jobs.get_ref().clone(),
            geocoder: geocoder.into_inner(),
            db: db.get_ref().clone(),
            instrumentation: instrumentation.get_ref().clone(),
            options: EnrichOptions::from(&config.geocoder),
        },
        MapJobInput {
            name,
            settings,
            members,
            source_md5: upload.md5,
            session,
        },
    )
    .await;

    Ok(HttpResponse::Accepted().json(UploadAccepted {
        job_id,
        member_count,
    }))
}

#[cfg(test)]
mod tests {
    use crate::instrumentation::{MAP_CREATION_ERROR, MAP_CREATION_STARTED};
    use crate::pipeline::geocode::tests::TableGeocoder;
    use crate::services::test_support::{multipart_body, TestState};
    use crate::storage::{events, maps};
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use common::jobs::JobStatus;
    use common::requests::UploadAccepted;
    use serde_json::Value;
    use std::time::Duration;

    const CSV: &[u8] = b"name,location,latitude,longitude\n\
        Ada,Lisbon,38.72,-9.14\n\
        Grace,Paris,,\n";

    fn upload_request(parts: &[(&str, Option<&str>, &[u8])]) -> test::TestRequest {
        let (content_type, body) = multipart_body(parts);
        test::TestRequest::post()
            .uri("/api/maps/upload")
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
    }

    #[actix_web::test]
    async fn oversized_file_is_rejected_before_parsing() {
        let state = TestState::new(TableGeocoder::default());
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
        // Not even a header row: only the size check can reject it.
        let big = vec![b'x'; 6 * 1024 * 1024];

        let req = upload_request(&[("file", Some("big.csv"), big.as_slice())]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "size");
        assert!(body["message"].as_str().unwrap().contains("5 MB"));
    }

    #[actix_web::test]
    async fn non_csv_file_is_a_format_error() {
        let state = TestState::new(TableGeocoder::default());
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let req = upload_request(&[("file", Some("people.xlsx"), CSV)]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "format");
    }

    #[actix_web::test]
    async fn rejected_files_are_tracked_as_creation_errors() {
        let state = TestState::new(TableGeocoder::default());
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
        let options: &[u8] = br#"{"sessionId":"s-7"}"#;
        let big = vec![b'x'; 6 * 1024 * 1024];

        let req = upload_request(&[("json", None, options), ("file", Some("people.xlsx"), CSV)]);
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let req = upload_request(&[("file", Some("big.csv"), big.as_slice())]);
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let conn = state.db.open().unwrap();
        assert_eq!(events::count_events(&conn, MAP_CREATION_ERROR).unwrap(), 2);
        assert_eq!(events::count_events(&conn, MAP_CREATION_STARTED).unwrap(), 0);
    }

    #[actix_web::test]
    async fn missing_columns_are_reported_inline() {
        let state = TestState::new(TableGeocoder::default());
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let csv: &[u8] = b"name,city\nAda,Lisbon\n";
        let req = upload_request(&[("file", Some("people.csv"), csv)]).to_request();
        let resp = test::call_service(&app, req).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "columns");
    }

    #[actix_web::test]
    async fn accepted_upload_completes_into_a_saved_map() {
        let state = TestState::new(TableGeocoder::with(&[("Paris", "48.85", "2.35")]));
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
        let options: &[u8] = br#"{"name":"Makers","sessionId":"s-1","settings":{"customization":{"showName":true}}}"#;

        let resp = test::call_service(
            &app,
            upload_request(&[("json", None, options), ("file", Some("people.CSV"), CSV)]).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let accepted: UploadAccepted = test::read_body_json(resp).await;
        assert_eq!(accepted.member_count, 2);

        let mut status = JobStatus::Pending;
        for _ in 0..100 {
            let req = test::TestRequest::get()
                .uri(&format!("/api/maps/upload/status/{}", accepted.job_id))
                .to_request();
            status = test::call_and_read_body_json(&app, req).await;
            if matches!(status, JobStatus::Completed(_) | JobStatus::Failed(_)) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let JobStatus::Completed(map_id) = status else {
            panic!("upload job did not complete: {:?}", status);
        };

        let conn = state.db.open().unwrap();
        let saved = maps::get_map(&conn, &map_id).unwrap().unwrap();
        assert_eq!(saved.name, "Makers");
        assert_eq!(saved.members.len(), 2);
        assert!(saved.settings.customization.show_name);
        assert_eq!(saved.settings.customization.marker_color, "#E9B893");
        assert_eq!(saved.source_md5.as_deref().map(str::len), Some(32));
        assert_eq!(state.geocoder.calls(), vec!["Paris".to_string()]);
        assert_eq!(events::count_events(&conn, MAP_CREATION_STARTED).unwrap(), 1);
    }

    #[actix_web::test]
    async fn unknown_job_is_not_found() {
        let state = TestState::new(TableGeocoder::default());
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let req = test::TestRequest::get()
            .uri("/api/maps/upload/status/nope")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
