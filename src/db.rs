use rusqlite::{params, Connection, OptionalExtension, Result};
use serde_json::Value;
use std::path::Path;

const MAX_DOCUMENT_LEN: usize = 1_048_576;

/// Profile documents keyed by user id. Stored verbatim; only the
/// translator gives them meaning.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(database_url: &str) -> Result<Self> {
        let path = database_url.trim_start_matches("sqlite://");
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(Path::new(path))?
        };

        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_profiles (
                user_id TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            (),
        )?;

        Ok(Database { conn })
    }

    pub fn upsert_profile(&self, user_id: &str, document: &Value) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let text = document.to_string();
        if text.len() > MAX_DOCUMENT_LEN {
            return Err(rusqlite::Error::ToSqlConversionFailure(
                format!("profile document exceeds {} bytes", MAX_DOCUMENT_LEN).into(),
            ));
        }
        self.conn.execute(
            "INSERT INTO user_profiles (user_id, document, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
             document = excluded.document,
             updated_at = excluded.updated_at",
            params![user_id, text, now],
        )?;
        Ok(())
    }

    pub fn get_profile(&self, user_id: &str) -> Result<Option<Value>> {
        let text: Option<String> = self
            .conn
            .query_row(
                "SELECT document FROM user_profiles WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        match text {
            Some(text) => serde_json::from_str(&text).map(Some).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
            }),
            None => Ok(None),
        }
    }

    pub fn list_user_ids(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id FROM user_profiles ORDER BY user_id ASC")?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    pub fn delete_profile(&self, user_id: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM user_profiles WHERE user_id = ?1", params![user_id])?;
        Ok(removed > 0)
    }
}
