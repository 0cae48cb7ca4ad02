use crate::storage::new_id;
use common::model::admin::{Feedback, FeedbackType};
use common::requests::CreateFeedbackRequest;
use rusqlite::types::Type;
use rusqlite::{params, Connection};

/// Stores feedback whose rating has already been validated.
pub fn insert_feedback(
    conn: &Connection,
    feedback: &CreateFeedbackRequest,
    rating: u8,
) -> rusqlite::Result<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO feedback (id, map_id, session_id, feedback_type, rating, comment, email)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            feedback.map_id,
            feedback.session_id,
            feedback.feedback_type.as_str(),
            rating,
            feedback.comment,
            feedback.email,
        ],
    )?;
    Ok(id)
}

pub fn list_feedback(conn: &Connection) -> rusqlite::Result<Vec<Feedback>> {
    let mut stmt = conn.prepare(
        "SELECT id, map_id, session_id, feedback_type, rating, comment, email, created_at
         FROM feedback ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        let raw_type: String = row.get(3)?;
        let feedback_type = FeedbackType::parse(&raw_type).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                format!("unknown feedback type '{}'", raw_type).into(),
            )
        })?;
        Ok(Feedback {
            id: row.get(0)?,
            map_id: row.get(1)?,
            session_id: row.get(2)?,
            feedback_type,
            rating: row.get(4)?,
            comment: row.get(5)?,
            email: row.get(6)?,
            created_at: row.get(7)?,
        })
    })?;
    rows.collect()
}
