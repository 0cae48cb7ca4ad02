//! Live pages for shared maps: `/map/{map_id}` renders the same document as
//! the export, `/embed/{map_id}` the iframe variant without the badge. Maps
//! that are not public answer 404, exactly like unknown ids.

use crate::error::AppError;
use crate::pipeline::export::export_map;
use crate::storage::{maps, Database};
use actix_web::web::{get, scope};
use actix_web::{web, HttpResponse, Scope};

pub fn map_routes() -> Scope {
    scope("/map").route("/{map_id}", get().to(shared))
}

pub fn embed_routes() -> Scope {
    scope("/embed").route("/{map_id}", get().to(embedded))
}

async fn shared(
    map_id: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    render_public(&map_id, &db, false)
}

async fn embedded(
    map_id: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    render_public(&map_id, &db, true)
}

fn render_public(map_id: &str, db: &Database, embed: bool) -> Result<HttpResponse, AppError> {
    let conn = db.open()?;
    let map = maps::get_map(&conn, map_id)?
        .filter(|map| map.is_public)
        .ok_or_else(|| AppError::NotFound(format!("Map {}", map_id)))?;

    let html = export_map(&map, embed)
        .map_err(|e| AppError::Internal(format!("could not serialize map: {}", e)))?;
    Ok(HttpResponse::Ok().content_type("text/html; charset=utf-8").body(html))
}

#[cfg(test)]
mod tests {
    use crate::pipeline::geocode::tests::TableGeocoder;
    use crate::services::test_support::TestState;
    use crate::storage::maps::{self, NewMap};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use common::model::settings::MapSettings;
    use common::requests::UpdateMapRequest;

    const BADGE_TEXT: &str = "Made with Community Mapper";

    #[actix_web::test]
    async fn public_maps_render_and_private_ones_hide() {
        let state = TestState::new(TableGeocoder::default());
        let saved = {
            let conn = state.db.open().unwrap();
            maps::create_map(
                &conn,
                &NewMap {
                    name: "Team",
                    settings: &MapSettings::default(),
                    members: &[],
                    center: [1.0, 2.0],
                    zoom: 2.0,
                    source_md5: None,
                },
            )
            .unwrap()
        };
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let req = test::TestRequest::get().uri(&format!("/map/{}", saved.id)).to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert!(std::str::from_utf8(&body).unwrap().contains(BADGE_TEXT));

        let req = test::TestRequest::get().uri(&format!("/embed/{}", saved.id)).to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert!(!std::str::from_utf8(&body).unwrap().contains(BADGE_TEXT));

        {
            let mut conn = state.db.open().unwrap();
            maps::update_map(
                &mut conn,
                &saved.id,
                UpdateMapRequest {
                    is_public: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        }
        let req = test::TestRequest::get().uri(&format!("/map/{}", saved.id)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
        let req = test::TestRequest::get().uri("/embed/unknown").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
