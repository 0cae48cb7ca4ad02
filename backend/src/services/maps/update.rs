use crate::error::AppError;
use crate::storage::{maps, Database};
use actix_web::{web, HttpResponse};
use common::requests::UpdateMapRequest;
use log::info;

/// `PATCH /api/maps/{map_id}`. Only the fields present in the body change;
/// a settings patch is merged per sub-object into the stored settings.
pub async fn process(
    map_id: web::Path<String>,
    update: web::Json<UpdateMapRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    let mut update = update.into_inner();
    if let Some(name) = update.name.as_mut() {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::BadRequest("Map name cannot be empty".to_string()));
        }
        *name = trimmed.to_string();
    }

    let mut conn = db.open()?;
    let map = maps::update_map(&mut conn, &map_id, update)?
        .ok_or_else(|| AppError::NotFound(format!("Map {}", map_id)))?;
    info!("Updated map {}", map.id);
    Ok(HttpResponse::Ok().json(map))
}
