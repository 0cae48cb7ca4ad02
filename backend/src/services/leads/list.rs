use crate::config::Config;
use crate::error::AppError;
use crate::services::admin::require_admin;
use crate::storage::{leads, Database};
use actix_web::{web, HttpRequest, HttpResponse};

pub async fn process(
    req: HttpRequest,
    config: web::Data<Config>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    require_admin(&req, &config)?;
    let conn = db.open()?;
    Ok(HttpResponse::Ok().json(leads::list_leads(&conn)?))
}
