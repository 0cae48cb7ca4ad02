use crate::error::AppError;
use crate::instrumentation::{Instrumentation, SessionContext, MAP_DOWNLOAD_COMPLETED};
use crate::pipeline::export::{export_map, DOWNLOAD_FILE_NAME};
use crate::storage::{maps, Database};
use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    session_id: Option<String>,
}

/// `GET /api/maps/{map_id}/export`: the map as a self-contained HTML download.
pub async fn process(
    map_id: web::Path<String>,
    query: web::Query<ExportQuery>,
    db: web::Data<Database>,
    instrumentation: web::Data<Instrumentation>,
) -> Result<HttpResponse, AppError> {
    let conn = db.open()?;
    let map = maps::get_map(&conn, &map_id)?
        .ok_or_else(|| AppError::NotFound(format!("Map {}", map_id)))?;

    let html = export_map(&map, false)
        .map_err(|e| AppError::Internal(format!("could not serialize map: {}", e)))?;

    let session = SessionContext::new(query.into_inner().session_id);
    instrumentation.track(
        &session,
        MAP_DOWNLOAD_COMPLETED,
        json!({ "map_id": map.id, "members_count": map.members.len() }),
    );

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME),
        ))
        .body(html))
}
