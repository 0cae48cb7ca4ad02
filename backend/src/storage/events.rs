//! Sessions, analytics events and error reports.

use crate::storage::{new_id, to_json};
use common::model::admin::{ErrorReport, ErrorSeverity};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

/// Creates an active session and returns `(id, expires_at)`.
pub fn create_session(conn: &Connection) -> rusqlite::Result<(String, String)> {
    let id = new_id();
    conn.execute("INSERT INTO sessions (id) VALUES (?1)", params![id])?;
    let expires_at = conn.query_row(
        "SELECT expires_at FROM sessions WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok((id, expires_at))
}

/// True when the session exists, is active and has not expired.
pub fn session_is_active(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sessions WHERE id = ?1 AND status = 'active'
             AND expires_at > strftime('%Y-%m-%dT%H:%M:%SZ', 'now')",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Marks every active session past its expiry as `expired`. Returns how many.
pub fn expire_sessions(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE sessions SET status = 'expired'
         WHERE status = 'active' AND expires_at <= strftime('%Y-%m-%dT%H:%M:%SZ', 'now')",
        [],
    )
}

pub fn insert_event(
    conn: &Connection,
    session_id: Option<&str>,
    event_name: &str,
    event_data: &Value,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO analytics_events (id, session_id, event_name, event_data)
         VALUES (?1, ?2, ?3, ?4)",
        params![new_id(), session_id, event_name, to_json(event_data)?],
    )?;
    Ok(())
}

#[cfg(test)]
pub fn count_events(conn: &Connection, event_name: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM analytics_events WHERE event_name = ?1",
        params![event_name],
        |row| row.get(0),
    )
}

pub fn insert_error_report(
    conn: &Connection,
    session_id: Option<&str>,
    category: &str,
    severity: ErrorSeverity,
    message: &str,
    metadata: &Value,
) -> rusqlite::Result<()> {
    let metadata = if metadata.is_null() {
        None
    } else {
        Some(to_json(metadata)?)
    };
    conn.execute(
        "INSERT INTO error_reports (id, session_id, category, severity, message, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![new_id(), session_id, category, severity.as_str(), message, metadata],
    )?;
    Ok(())
}

pub fn recent_error_reports(conn: &Connection, limit: usize) -> rusqlite::Result<Vec<ErrorReport>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, category, severity, message, metadata, created_at
         FROM error_reports ORDER BY created_at DESC, rowid DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], |row| {
        let raw: String = row.get(3)?;
        let severity = ErrorSeverity::parse(&raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                format!("unknown severity '{}'", raw).into(),
            )
        })?;
        Ok(ErrorReport {
            id: row.get(0)?,
            session_id: row.get(1)?,
            category: row.get(2)?,
            severity,
            message: row.get(4)?,
            metadata: row.get(5)?,
            created_at: row.get(6)?,
        })
    })?;
    rows.collect()
}
