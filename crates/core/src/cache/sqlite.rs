//! SQLite-backed metadata cache implementation.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction};
use std::path::Path;
use std::sync::Mutex;

use super::types::{CacheError, CatalogEntry, ItemEntry};
use super::MetadataCache;

/// SQLite-backed [`MetadataCache`].
pub struct SqliteMetadataCache {
    conn: Mutex<Connection>,
}

impl SqliteMetadataCache {
    /// Open (and create if needed) the cache at the given path.
    pub fn new(path: &Path) -> Result<Self, CacheError> {
        let conn = Connection::open(path).map_err(|e| CacheError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory().map_err(|e| CacheError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CacheError> {
        conn.execute_batch(
            r#"
            -- Shows/forums, replaced wholesale on every catalog refresh
            CREATE TABLE IF NOT EXISTS catalog_entries (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_catalog_entries_title ON catalog_entries(title);

            -- Alternate lookup titles for catalog entries
            CREATE TABLE IF NOT EXISTS catalog_alt_titles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entry_id INTEGER NOT NULL REFERENCES catalog_entries(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                UNIQUE(entry_id, title)
            );

            CREATE INDEX IF NOT EXISTS idx_catalog_alt_titles_title ON catalog_alt_titles(title);

            -- Topics, replaced wholesale per catalog entry
            CREATE TABLE IF NOT EXISTS items (
                id INTEGER NOT NULL,
                entry_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                download_ref TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (entry_id, id)
            );

            CREATE INDEX IF NOT EXISTS idx_items_entry ON items(entry_id);
            "#,
        )
        .map_err(|e| CacheError::Database(e.to_string()))?;

        Ok(())
    }

    fn load_alt_titles(conn: &Connection, entry_id: u32) -> Result<Vec<String>, CacheError> {
        let mut stmt = conn
            .prepare("SELECT title FROM catalog_alt_titles WHERE entry_id = ? ORDER BY id")
            .map_err(|e| CacheError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![entry_id], |row| row.get::<_, String>(0))
            .map_err(|e| CacheError::Database(e.to_string()))?;

        let mut titles = Vec::new();
        for row in rows {
            titles.push(row.map_err(|e| CacheError::Database(e.to_string()))?);
        }
        Ok(titles)
    }

    fn load_entry(conn: &Connection, id: u32) -> Result<Option<CatalogEntry>, CacheError> {
        let row: Option<(u32, String, String)> = conn
            .query_row(
                "SELECT id, title, url FROM catalog_entries WHERE id = ?",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                _ => Err(CacheError::Database(e.to_string())),
            })?;

        let Some((id, title, url)) = row else {
            return Ok(None);
        };

        Ok(Some(CatalogEntry {
            id,
            title,
            url,
            alt_titles: Self::load_alt_titles(conn, id)?,
        }))
    }

    fn watermark(conn: &Connection, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Option<DateTime<Utc>>, CacheError> {
        let min: Option<String> = conn
            .query_row(sql, params, |row| row.get(0))
            .map_err(|e| CacheError::Database(e.to_string()))?;

        Ok(min
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }

    fn insert_entries(tx: &Transaction, entries: &[CatalogEntry], now: &str) -> rusqlite::Result<()> {
        for entry in entries {
            tx.execute(
                "INSERT INTO catalog_entries (id, title, url, updated_at) VALUES (?, ?, ?, ?)",
                params![entry.id, &entry.title, &entry.url, now],
            )?;
            for alt in &entry.alt_titles {
                tx.execute(
                    "INSERT OR IGNORE INTO catalog_alt_titles (entry_id, title) VALUES (?, ?)",
                    params![entry.id, alt],
                )?;
            }
        }
        Ok(())
    }
}

impl MetadataCache for SqliteMetadataCache {
    fn catalog_watermark(&self) -> Result<Option<DateTime<Utc>>, CacheError> {
        let conn = self.conn.lock().unwrap();
        Self::watermark(&conn, "SELECT MIN(updated_at) FROM catalog_entries", &[])
    }

    fn replace_catalog(&self, entries: &[CatalogEntry]) -> Result<(), CacheError> {
        let mut conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let tx = conn
            .transaction()
            .map_err(|e| CacheError::Database(e.to_string()))?;

        tx.execute("DELETE FROM catalog_alt_titles", [])
            .map_err(|e| CacheError::Database(e.to_string()))?;
        tx.execute("DELETE FROM catalog_entries", [])
            .map_err(|e| CacheError::Database(e.to_string()))?;

        Self::insert_entries(&tx, entries, &now)
            .map_err(|e| CacheError::Database(e.to_string()))?;

        tx.commit().map_err(|e| CacheError::Database(e.to_string()))
    }

    fn list_catalog(&self) -> Result<Vec<CatalogEntry>, CacheError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare("SELECT id, title, url FROM catalog_entries ORDER BY id")
            .map_err(|e| CacheError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| CacheError::Database(e.to_string()))?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, title, url) = row.map_err(|e| CacheError::Database(e.to_string()))?;
            entries.push(CatalogEntry {
                id,
                title,
                url,
                alt_titles: Self::load_alt_titles(&conn, id)?,
            });
        }
        Ok(entries)
    }

    fn find_entry_by_title(&self, title: &str) -> Result<Option<CatalogEntry>, CacheError> {
        let conn = self.conn.lock().unwrap();

        let by_primary: Option<u32> = conn
            .query_row(
                "SELECT id FROM catalog_entries WHERE title = ? LIMIT 1",
                params![title],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                _ => Err(CacheError::Database(e.to_string())),
            })?;

        let id = match by_primary {
            Some(id) => Some(id),
            None => conn
                .query_row(
                    "SELECT entry_id FROM catalog_alt_titles WHERE title = ? LIMIT 1",
                    params![title],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    _ => Err(CacheError::Database(e.to_string())),
                })?,
        };

        match id {
            Some(id) => Self::load_entry(&conn, id),
            None => Ok(None),
        }
    }

    fn entry_by_id(&self, id: u32) -> Result<Option<CatalogEntry>, CacheError> {
        let conn = self.conn.lock().unwrap();
        Self::load_entry(&conn, id)
    }

    fn items_watermark(&self, entry_id: u32) -> Result<Option<DateTime<Utc>>, CacheError> {
        let conn = self.conn.lock().unwrap();
        Self::watermark(
            &conn,
            "SELECT MIN(updated_at) FROM items WHERE entry_id = ?",
            &[&entry_id],
        )
    }

    fn replace_items(&self, entry_id: u32, items: &[ItemEntry]) -> Result<(), CacheError> {
        let mut conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let tx = conn
            .transaction()
            .map_err(|e| CacheError::Database(e.to_string()))?;

        tx.execute("DELETE FROM items WHERE entry_id = ?", params![entry_id])
            .map_err(|e| CacheError::Database(e.to_string()))?;

        for item in items {
            tx.execute(
                "INSERT OR REPLACE INTO items (id, entry_id, title, download_ref, updated_at)
                 VALUES (?, ?, ?, ?, ?)",
                params![item.id, entry_id, &item.title, &item.download_ref, &now],
            )
            .map_err(|e| CacheError::Database(e.to_string()))?;
        }

        tx.commit().map_err(|e| CacheError::Database(e.to_string()))
    }

    fn list_items(&self, entry_id: u32) -> Result<Vec<ItemEntry>, CacheError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, entry_id, title, download_ref FROM items
                 WHERE entry_id = ? ORDER BY id",
            )
            .map_err(|e| CacheError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![entry_id], |row| {
                Ok(ItemEntry {
                    id: row.get(0)?,
                    entry_id: row.get(1)?,
                    title: row.get(2)?,
                    download_ref: row.get(3)?,
                })
            })
            .map_err(|e| CacheError::Database(e.to_string()))?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row.map_err(|e| CacheError::Database(e.to_string()))?);
        }
        Ok(items)
    }

    fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.lock().unwrap();

        let tx = conn
            .transaction()
            .map_err(|e| CacheError::Database(e.to_string()))?;
        tx.execute("DELETE FROM items", [])
            .map_err(|e| CacheError::Database(e.to_string()))?;
        tx.execute("DELETE FROM catalog_alt_titles", [])
            .map_err(|e| CacheError::Database(e.to_string()))?;
        tx.execute("DELETE FROM catalog_entries", [])
            .map_err(|e| CacheError::Database(e.to_string()))?;
        tx.commit().map_err(|e| CacheError::Database(e.to_string()))
    }
}
