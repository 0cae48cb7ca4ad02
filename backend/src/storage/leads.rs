use crate::storage::new_id;
use common::model::admin::Lead;
use common::requests::CreateLeadRequest;
use rusqlite::{params, Connection};

pub fn insert_lead(conn: &Connection, lead: &CreateLeadRequest) -> rusqlite::Result<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO leads (id, email, name, source) VALUES (?1, ?2, ?3, ?4)",
        params![id, lead.email.trim(), lead.name, lead.source],
    )?;
    Ok(id)
}

pub fn list_leads(conn: &Connection) -> rusqlite::Result<Vec<Lead>> {
    let mut stmt = conn.prepare(
        "SELECT id, email, name, source, created_at FROM leads
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Lead {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            source: row.get(3)?,
            created_at: row.get(4)?,
        })
    })?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::temp_db;

    #[test]
    fn inserted_leads_are_listed_newest_first() {
        let (_dir, db) = temp_db();
        let conn = db.open().unwrap();
        for email in ["first@example.com", " second@example.com "] {
            insert_lead(
                &conn,
                &CreateLeadRequest {
                    email: email.into(),
                    name: None,
                    source: Some("pricing".into()),
                },
            )
            .unwrap();
        }

        let leads = list_leads(&conn).unwrap();
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0].email, "second@example.com");
        assert_eq!(leads[1].source.as_deref(), Some("pricing"));
    }
}
