use crate::config::Config;
use crate::error::AppError;
use crate::services::admin::require_admin;
use crate::storage::{maps, Database};
use actix_web::{web, HttpRequest, HttpResponse};
use log::info;

/// `GET /api/maps`: summaries of every stored map, newest first.
pub async fn list(
    req: HttpRequest,
    config: web::Data<Config>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    require_admin(&req, &config)?;
    let conn = db.open()?;
    Ok(HttpResponse::Ok().json(maps::list_maps(&conn)?))
}

/// `DELETE /api/maps/{map_id}`.
pub async fn delete(
    req: HttpRequest,
    map_id: web::Path<String>,
    config: web::Data<Config>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    require_admin(&req, &config)?;
    let conn = db.open()?;
    if !maps::delete_map(&conn, &map_id)? {
        return Err(AppError::NotFound(format!("Map {}", map_id)));
    }
    info!("Deleted map {}", map_id);
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use crate::pipeline::geocode::tests::TableGeocoder;
    use crate::services::admin::ADMIN_TOKEN_HEADER;
    use crate::services::test_support::{TestState, ADMIN_TOKEN};
    use crate::storage::maps::{self, NewMap};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use common::model::map::MapSummary;
    use common::model::settings::MapSettings;

    #[actix_web::test]
    async fn list_and_delete_are_admin_only() {
        let state = TestState::new(TableGeocoder::default());
        let saved = {
            let conn = state.db.open().unwrap();
            maps::create_map(
                &conn,
                &NewMap {
                    name: "Team",
                    settings: &MapSettings::default(),
                    members: &[],
                    center: [0.0, 0.0],
                    zoom: 2.0,
                    source_md5: None,
                },
            )
            .unwrap()
        };
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let req = test::TestRequest::get().uri("/api/maps").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
        let req = test::TestRequest::delete()
            .uri(&format!("/api/maps/{}", saved.id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/maps")
            .insert_header((ADMIN_TOKEN_HEADER, ADMIN_TOKEN))
            .to_request();
        let summaries: Vec<MapSummary> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, "Team");

        let req = test::TestRequest::delete()
            .uri(&format!("/api/maps/{}", saved.id))
            .insert_header((ADMIN_TOKEN_HEADER, ADMIN_TOKEN))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/maps/{}", saved.id))
            .insert_header((ADMIN_TOKEN_HEADER, ADMIN_TOKEN))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
