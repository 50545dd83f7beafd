//! SQLite-backed credential store.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use super::store::{CredentialStore, StoreError};
use super::types::Credential;

/// SQLite-backed [`CredentialStore`]. The cookie map is stored as a JSON
/// string, one row per username.
pub struct SqliteCredentialStore {
    conn: Mutex<Connection>,
}

impl SqliteCredentialStore {
    /// Open (and create if needed) the store at the given path.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                cookies TEXT NOT NULL,
                expiry_time TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }
}

impl CredentialStore for SqliteCredentialStore {
    fn find_valid(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Credential>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT cookies, expiry_time FROM accounts WHERE username = ?",
                params![username],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                _ => Err(StoreError::Database(e.to_string())),
            })?;

        let Some((cookies_json, expiry_str)) = row else {
            return Ok(None);
        };

        let expires_at = DateTime::parse_from_rfc3339(&expiry_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::Corrupt(username.to_string(), e.to_string()))?;

        if expires_at < now {
            conn.execute("DELETE FROM accounts WHERE username = ?", params![username])
                .map_err(|e| StoreError::Database(e.to_string()))?;
            return Ok(None);
        }

        let cookies: HashMap<String, String> = serde_json::from_str(&cookies_json)
            .map_err(|e| StoreError::Corrupt(username.to_string(), e.to_string()))?;

        Ok(Some(Credential {
            username: username.to_string(),
            cookies,
            expires_at,
        }))
    }

    fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let cookies_json = serde_json::to_string(&credential.cookies)
            .map_err(|e| StoreError::Corrupt(credential.username.clone(), e.to_string()))?;

        conn.execute(
            "INSERT INTO accounts (username, cookies, expiry_time) VALUES (?, ?, ?)
             ON CONFLICT(username) DO UPDATE SET
                cookies = excluded.cookies,
                expiry_time = excluded.expiry_time",
            params![
                &credential.username,
                &cookies_json,
                credential.expires_at.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn delete(&self, username: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let rows = conn
            .execute("DELETE FROM accounts WHERE username = ?", params![username])
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(rows > 0)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM accounts", [])
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }
}
