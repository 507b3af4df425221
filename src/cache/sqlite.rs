//! SQLite cache implementation

use crate::cache::schema::initialize_schema;
use crate::cache::{CacheEntry, CacheResult, ResponseCache};
use chrono::{TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

/// TTLs beyond a century are clamped
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// SQLite-backed response cache
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    /// Opens or creates the cache database at `path`
    pub fn new(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory cache (for testing)
    pub fn new_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Number of stored entries, expired or not
    pub fn len(&self) -> CacheResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl ResponseCache for SqliteCache {
    fn get(&mut self, key: &str) -> CacheResult<Option<CacheEntry>> {
        let row = self
            .conn
            .query_row(
                "SELECT body, headers, expires_at FROM responses WHERE key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((body, headers_json, expires_ms)) = row else {
            return Ok(None);
        };

        let expires_at = Utc
            .timestamp_millis_opt(expires_ms)
            .single()
            .unwrap_or_else(Utc::now);

        if Utc::now() > expires_at {
            tracing::trace!("Evicting expired cache entry {}", key);
            self.conn
                .execute("DELETE FROM responses WHERE key = ?1", params![key])?;
            return Ok(None);
        }

        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;

        Ok(Some(CacheEntry {
            key: key.to_string(),
            body,
            headers,
            expires_at,
        }))
    }

    fn put(
        &mut self,
        key: &str,
        body: &str,
        headers: &[(String, String)],
        ttl: Duration,
    ) -> CacheResult<()> {
        if ttl.is_zero() {
            self.conn
                .execute("DELETE FROM responses WHERE key = ?1", params![key])?;
            return Ok(());
        }

        let now = Utc::now();
        let ttl = ttl.min(MAX_TTL);
        let expires_at = now
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        let headers_json = serde_json::to_string(headers)?;

        self.conn.execute(
            "INSERT INTO responses (key, body, headers, stored_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                headers = excluded.headers,
                stored_at = excluded.stored_at,
                expires_at = excluded.expires_at",
            params![
                key,
                body,
                headers_json,
                now.to_rfc3339(),
                expires_at.timestamp_millis()
            ],
        )?;

        Ok(())
    }

    fn purge_expired(&mut self) -> CacheResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM responses WHERE expires_at < ?1",
            params![Utc::now().timestamp_millis()],
        )?;
        Ok(removed)
    }
}
