use crate::storage::{from_json, new_id, to_json};
use common::model::map::{MapSummary, SavedMap};
use common::model::member::CommunityMember;
use common::model::settings::MapSettings;
use common::requests::UpdateMapRequest;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Everything needed to insert a map; ids and timestamps are assigned here.
pub struct NewMap<'a> {
    pub name: &'a str,
    pub settings: &'a MapSettings,
    pub members: &'a [CommunityMember],
    pub center: [f64; 2],
    pub zoom: f64,
    pub source_md5: Option<&'a str>,
}

const SELECT_MAP: &str = "SELECT id, name, settings, members, center_lat, center_lng, zoom, \
     is_public, source_md5, created_at, updated_at FROM maps";

fn map_from_row(row: &Row<'_>) -> rusqlite::Result<SavedMap> {
    let settings: String = row.get(2)?;
    let members: String = row.get(3)?;
    Ok(SavedMap {
        id: row.get(0)?,
        name: row.get(1)?,
        settings: from_json(2, &settings)?,
        members: from_json(3, &members)?,
        center: [row.get(4)?, row.get(5)?],
        zoom: row.get(6)?,
        is_public: row.get::<_, i64>(7)? != 0,
        source_md5: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

pub fn create_map(conn: &Connection, map: &NewMap<'_>) -> rusqlite::Result<SavedMap> {
    let id = new_id();
    conn.execute(
        "INSERT INTO maps (id, name, settings, members, center_lat, center_lng, zoom, source_md5)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            map.name,
            to_json(map.settings)?,
            to_json(&map.members)?,
            map.center[0],
            map.center[1],
            map.zoom,
            map.source_md5,
        ],
    )?;
    get_map(conn, &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_map(conn: &Connection, id: &str) -> rusqlite::Result<Option<SavedMap>> {
    conn.query_row(&format!("{SELECT_MAP} WHERE id = ?1"), params![id], map_from_row)
        .optional()
}

pub fn list_maps(conn: &Connection) -> rusqlite::Result<Vec<MapSummary>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, json_array_length(members), is_public, created_at
         FROM maps ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(MapSummary {
            id: row.get(0)?,
            name: row.get(1)?,
            member_count: row.get::<_, i64>(2)?.max(0) as usize,
            is_public: row.get::<_, i64>(3)? != 0,
            created_at: row.get(4)?,
        })
    })?;
    rows.collect()
}

/// Applies the fields present in `update`. Returns `None` for unknown ids.
///
/// Settings are read, merged and written back inside one transaction so a
/// concurrent rename does not get lost; concurrent settings edits still follow
/// last-writer-wins.
pub fn update_map(
    conn: &mut Connection,
    id: &str,
    update: UpdateMapRequest,
) -> rusqlite::Result<Option<SavedMap>> {
    let tx = conn.transaction()?;

    let stored: Option<String> = tx
        .query_row("SELECT settings FROM maps WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?;
    let Some(stored) = stored else {
        return Ok(None);
    };

    if let Some(name) = update.name {
        tx.execute("UPDATE maps SET name = ?1 WHERE id = ?2", params![name, id])?;
    }
    if let Some(patch) = update.settings {
        let mut settings: MapSettings = from_json(0, &stored)?;
        settings.merge(patch);
        tx.execute(
            "UPDATE maps SET settings = ?1 WHERE id = ?2",
            params![to_json(&settings)?, id],
        )?;
    }
    if let Some(is_public) = update.is_public {
        tx.execute(
            "UPDATE maps SET is_public = ?1 WHERE id = ?2",
            params![is_public as i64, id],
        )?;
    }
    tx.execute(
        "UPDATE maps SET updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') WHERE id = ?1",
        params![id],
    )?;
    tx.commit()?;

    get_map(conn, id)
}

pub fn delete_map(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM maps WHERE id = ?1", params![id])? > 0)
}
