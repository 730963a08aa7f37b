//! SQLite-backed cache storage.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::entry::CachedResponse;
use crate::error::{CacheError, CacheResult};
use crate::key::RequestKey;
use crate::storage::CacheStorage;

/// Schema for named caches.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS caches (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS entries (
    cache TEXT NOT NULL,
    method TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    status_text TEXT,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    stored_at INTEGER NOT NULL,
    PRIMARY KEY (cache, method, url)
);
"#;

/// Durable cache storage in a single SQLite database.
pub struct SqliteCacheStorage {
    conn: Mutex<Connection>,
}

impl SqliteCacheStorage {
    /// Open (or create) a database file.
    pub fn open(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::Storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> CacheResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> CacheResult<Self> {
        conn.execute_batch(CACHE_SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> CacheResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CacheError::LockPoisoned(e.to_string()))
    }
}

fn ensure_cache(conn: &Connection, cache: &str) -> CacheResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO caches (name) VALUES (?1)",
        params![cache],
    )?;
    Ok(())
}

#[async_trait]
impl CacheStorage for SqliteCacheStorage {
    async fn open(&self, cache: &str) -> CacheResult<()> {
        let conn = self.conn()?;
        ensure_cache(&conn, cache)
    }

    async fn has(&self, cache: &str) -> CacheResult<bool> {
        let conn = self.conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT seq FROM caches WHERE name = ?1",
                params![cache],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    async fn names(&self) -> CacheResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY seq")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    async fn delete(&self, cache: &str) -> CacheResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM entries WHERE cache = ?1", params![cache])?;
        let removed = tx.execute("DELETE FROM caches WHERE name = ?1", params![cache])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    async fn get(&self, cache: &str, key: &RequestKey) -> CacheResult<Option<CachedResponse>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT status, status_text, headers, body, stored_at FROM entries
                 WHERE cache = ?1 AND method = ?2 AND url = ?3",
                params![cache, key.method(), key.url()],
                |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((status, status_text, headers, body, stored_at)) => Ok(Some(CachedResponse {
                status,
                status_text,
                headers: serde_json::from_str(&headers)?,
                body,
                stored_at: stored_at.max(0) as u64,
            })),
            None => Ok(None),
        }
    }

    async fn put(&self, cache: &str, key: &RequestKey, response: CachedResponse) -> CacheResult<()> {
        let headers = serde_json::to_string(&response.headers)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        ensure_cache(&tx, cache)?;
        tx.execute(
            "INSERT OR REPLACE INTO entries
                (cache, method, url, status, status_text, headers, body, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                cache,
                key.method(),
                key.url(),
                response.status,
                response.status_text,
                headers,
                response.body,
                response.stored_at as i64,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn keys(&self, cache: &str) -> CacheResult<Vec<RequestKey>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT method, url FROM entries WHERE cache = ?1 ORDER BY method, url")?;
        let keys = stmt
            .query_map(params![cache], |row| {
                Ok(RequestKey::from_parts(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;

    fn key(path: &str) -> RequestKey {
        RequestKey::get(&Url::parse("https://shop.example.com").unwrap().join(path).unwrap())
    }

    #[tokio::test]
    async fn test_round_trip_entry() {
        let storage = SqliteCacheStorage::in_memory().unwrap();
        let response = offline_fetch::Response::ok("body")
            .with_header(http::header::CONTENT_TYPE, http::HeaderValue::from_static("text/css"));
        let entry = CachedResponse::from_response(&response, 42);

        storage.put("dynamic-v3", &key("/app.css"), entry.clone()).await.unwrap();

        let found = storage.get("dynamic-v3", &key("/app.css")).await.unwrap();
        assert_eq!(found, Some(entry));
        assert!(storage.get("static-v3", &key("/app.css")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_creates_empty_cache_once() {
        let storage = SqliteCacheStorage::in_memory().unwrap();
        assert!(!storage.has("static-v3").await.unwrap());

        storage.open("static-v3").await.unwrap();
        storage.open("static-v3").await.unwrap();

        assert!(storage.has("static-v3").await.unwrap());
        assert_eq!(storage.names().await.unwrap(), vec!["static-v3"]);
        assert!(storage.keys("static-v3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_names_in_creation_order_and_delete() {
        let storage = SqliteCacheStorage::in_memory().unwrap();
        storage.open("static-v2").await.unwrap();
        storage.open("static-v3").await.unwrap();
        storage
            .put("static-v2", &key("/"), CachedResponse::from_response(&offline_fetch::Response::ok("old"), 0))
            .await
            .unwrap();

        assert_eq!(storage.names().await.unwrap(), vec!["static-v2", "static-v3"]);
        assert!(storage.delete("static-v2").await.unwrap());
        assert_eq!(storage.names().await.unwrap(), vec!["static-v3"]);
        assert!(storage.keys("static-v2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = std::env::temp_dir().join(format!("offline-cache-test-{}", std::process::id()));
        let path = dir.join("caches.db");
        {
            let storage = SqliteCacheStorage::open(&path).unwrap();
            storage
                .put("images-v3", &key("/p/1.jpg"), CachedResponse::from_response(&offline_fetch::Response::ok("jpg"), 7))
                .await
                .unwrap();
        }
        let storage = SqliteCacheStorage::open(&path).unwrap();
        let found = storage.match_any(&key("/p/1.jpg")).await.unwrap().unwrap();
        assert_eq!(found.body, b"jpg");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
