use crate::error::AppError;
use crate::storage::{maps, Database};
use actix_web::{web, HttpResponse};

/// `GET /api/maps/{map_id}`: the stored map, members and settings included.
pub async fn process(
    map_id: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    let conn = db.open()?;
    let map = maps::get_map(&conn, &map_id)?
        .ok_or_else(|| AppError::NotFound(format!("Map {}", map_id)))?;
    Ok(HttpResponse::Ok().json(map))
}
