//! SQLite-based resource store with file blob support
//!
//! Rows are keyed by (partition, cache key). Small bodies are stored inline in
//! SQLite, large bodies (>10KB) as files under `blobs/`.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::key::{blob_key, resource_key};
use crate::config::Config;
use crate::error::StoreError;
use crate::http::{HttpResponse, header_value};
use crate::proxy::freshness::CACHE_TIME_HEADER;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

/// Bodies larger than this are stored as external blobs
const INLINE_THRESHOLD: usize = 10 * 1024; // 10KB

type Result<T> = std::result::Result<T, StoreError>;

/// A stored response and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResource {
    /// URL the response was fetched from
    pub url: String,
    /// The response exactly as stored
    pub response: HttpResponse,
    /// When the row was written
    pub stored_at: DateTime<Utc>,
}

/// SQLite-backed resource store with file blob support
pub struct ResourceStore {
    conn: Connection,
    root: PathBuf,
    blobs_dir: PathBuf,
}

struct RawRow {
    url: String,
    status: u16,
    status_text: String,
    headers: String,
    body: Option<Vec<u8>>,
    blob_path: Option<String>,
    stored_at: i64,
}

impl ResourceStore {
    /// Default store location (~/.cache/newscache on Linux)
    pub fn default_dir() -> Result<PathBuf> {
        let cache_base = dirs::cache_dir().ok_or(StoreError::NoCacheDir)?;
        Ok(cache_base.join("newscache"))
    }

    /// Store location for a configuration
    pub fn dir_for(config: &Config) -> Result<PathBuf> {
        match &config.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::default_dir(),
        }
    }

    /// Open or create the store a configuration points at
    pub fn open(config: &Config) -> Result<Self> {
        Self::open_at(&Self::dir_for(config)?)
    }

    /// Open the store at a specific directory
    pub fn open_at(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| StoreError::Io(format!("Failed to create store dir: {}", e)))?;

        let db_path = dir.join("store.db");
        let blobs_dir = dir.join("blobs");
        std::fs::create_dir_all(&blobs_dir)
            .map_err(|e| StoreError::Io(format!("Failed to create blobs dir: {}", e)))?;

        let conn = Connection::open(&db_path)?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Store schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            Self::nuke(&db_path, &blobs_dir)?;
            return Self::open_at(dir);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS resources (
                partition TEXT NOT NULL,
                cache_key TEXT NOT NULL,
                url TEXT NOT NULL,
                status INTEGER NOT NULL,
                status_text TEXT NOT NULL,
                headers TEXT NOT NULL,
                body BLOB,
                blob_path TEXT,
                stored_at INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL,
                PRIMARY KEY (partition, cache_key)
            );

            CREATE INDEX IF NOT EXISTS idx_partition ON resources(partition);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self {
            conn,
            root: dir.to_path_buf(),
            blobs_dir,
        })
    }

    /// Directory this store lives in
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Look up a stored response
    pub fn get(&self, partition: &str, key: &str) -> Result<Option<CachedResource>> {
        let row = self
            .conn
            .query_row(
                "SELECT url, status, status_text, headers, body, blob_path, stored_at
                 FROM resources WHERE partition = ?1 AND cache_key = ?2",
                params![partition, key],
                |r| {
                    Ok(RawRow {
                        url: r.get(0)?,
                        status: r.get(1)?,
                        status_text: r.get(2)?,
                        headers: r.get(3)?,
                        body: r.get(4)?,
                        blob_path: r.get(5)?,
                        stored_at: r.get(6)?,
                    })
                },
            )
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        let body = match (row.body, row.blob_path) {
            (Some(body), _) => body,
            (None, Some(blob_path)) => match std::fs::read(self.blobs_dir.join(&blob_path)) {
                Ok(data) => data,
                Err(e) => {
                    log::warn!("Failed to read blob {}: {}", blob_path, e);
                    // Drop the dangling row so the next request refetches
                    let _ = self.conn.execute(
                        "DELETE FROM resources WHERE partition = ?1 AND cache_key = ?2",
                        params![partition, key],
                    );
                    return Ok(None);
                }
            },
            (None, None) => {
                return Err(StoreError::Corrupt(format!("no body for {}", row.url)));
            }
        };

        let headers: Vec<(String, String)> = serde_json::from_str(&row.headers)
            .map_err(|e| StoreError::Corrupt(format!("headers for {}: {}", row.url, e)))?;

        Ok(Some(CachedResource {
            url: row.url,
            response: HttpResponse {
                status: row.status,
                status_text: row.status_text,
                headers,
                body,
            },
            stored_at: DateTime::from_timestamp(row.stored_at, 0).unwrap_or_default(),
        }))
    }

    /// Store a response, replacing any previous entry for the same key
    pub fn put(&self, partition: &str, key: &str, url: &str, response: &HttpResponse) -> Result<()> {
        self.insert(&self.conn, partition, key, url, response)
    }

    /// Store several GET responses atomically; `entries` are (url, response)
    pub fn put_all(&self, partition: &str, entries: &[(String, HttpResponse)]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (url, response) in entries {
            let key = resource_key("GET", url);
            self.insert(&tx, partition, &key, url, response)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn insert(
        &self,
        conn: &Connection,
        partition: &str,
        key: &str,
        url: &str,
        response: &HttpResponse,
    ) -> Result<()> {
        let now = Utc::now().timestamp();
        let headers = serde_json::to_string(&response.headers)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let size = response.body.len() as i64;

        if response.body.len() <= INLINE_THRESHOLD {
            self.remove_blob(partition, key);
            conn.execute(
                "INSERT OR REPLACE INTO resources
                 (partition, cache_key, url, status, status_text, headers, body, blob_path, stored_at, size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8, ?9)",
                params![
                    partition,
                    key,
                    url,
                    response.status,
                    response.status_text,
                    headers,
                    response.body,
                    now,
                    size
                ],
            )?;
        } else {
            let blob_path = self.write_blob(partition, key, &response.body)?;
            conn.execute(
                "INSERT OR REPLACE INTO resources
                 (partition, cache_key, url, status, status_text, headers, body, blob_path, stored_at, size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?8, ?9)",
                params![
                    partition,
                    key,
                    url,
                    response.status,
                    response.status_text,
                    headers,
                    blob_path,
                    now,
                    size
                ],
            )?;
        }
        Ok(())
    }

    /// Summaries of every entry in a partition, newest first
    pub fn list(&self, partition: &str) -> Result<Vec<EntrySummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, status, headers, size_bytes, stored_at FROM resources
             WHERE partition = ?1 ORDER BY stored_at DESC, url ASC",
        )?;

        let rows = stmt.query_map([partition], |r| {
            let url: String = r.get(0)?;
            let status: u16 = r.get(1)?;
            let headers: String = r.get(2)?;
            let size_bytes: i64 = r.get(3)?;
            let stored_at: i64 = r.get(4)?;
            Ok((url, status, headers, size_bytes, stored_at))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (url, status, headers, size_bytes, stored_at) = row?;
            let headers: Vec<(String, String)> = serde_json::from_str(&headers).unwrap_or_default();
            entries.push(EntrySummary {
                url,
                status,
                size_bytes: size_bytes as usize,
                stored_at,
                cache_time: header_value(&headers, CACHE_TIME_HEADER).map(str::to_string),
            });
        }
        Ok(entries)
    }

    /// Remove every entry in one partition
    pub fn clear_partition(&self, partition: &str) -> Result<ClearStats> {
        let blob_paths: Vec<String> = {
            let mut stmt = self.conn.prepare(
                "SELECT blob_path FROM resources WHERE partition = ?1 AND blob_path IS NOT NULL",
            )?;
            let rows = stmt.query_map([partition], |r| r.get(0))?;
            rows.collect::<std::result::Result<_, _>>()?
        };

        for blob_path in blob_paths {
            if let Err(e) = std::fs::remove_file(self.blobs_dir.join(&blob_path)) {
                log::warn!("Failed to remove blob {}: {}", blob_path, e);
            }
        }

        let removed = self
            .conn
            .execute("DELETE FROM resources WHERE partition = ?1", [partition])?;

        Ok(ClearStats {
            entries_removed: removed,
        })
    }

    /// Clear all entries in all partitions
    pub fn clear_all(&self) -> Result<ClearStats> {
        let removed = self.conn.execute("DELETE FROM resources", [])?;

        if self.blobs_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.blobs_dir) {
                log::warn!("Failed to clear blobs directory: {}", e);
            }
            std::fs::create_dir_all(&self.blobs_dir)
                .map_err(|e| StoreError::Io(format!("Failed to recreate blobs dir: {}", e)))?;
        }

        Ok(ClearStats {
            entries_removed: removed,
        })
    }

    /// Per-partition statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let mut stmt = self.conn.prepare(
            "SELECT partition, COUNT(*), COALESCE(SUM(size_bytes), 0), MIN(stored_at), MAX(stored_at)
             FROM resources GROUP BY partition ORDER BY partition",
        )?;

        let rows = stmt.query_map([], |r| {
            let entries: i64 = r.get(1)?;
            let size_bytes: i64 = r.get(2)?;
            Ok(PartitionStats {
                name: r.get(0)?,
                entries: entries as usize,
                size_bytes: size_bytes as usize,
                oldest_entry: r.get(3)?,
                newest_entry: r.get(4)?,
            })
        })?;

        Ok(StoreStats {
            partitions: rows.collect::<std::result::Result<_, _>>()?,
        })
    }

    /// Write a blob file, sharded by first 2 chars of its name
    fn write_blob(&self, partition: &str, key: &str, data: &[u8]) -> Result<String> {
        let name = blob_key(partition, key);
        let shard = &name[..2];
        let shard_dir = self.blobs_dir.join(shard);
        std::fs::create_dir_all(&shard_dir)
            .map_err(|e| StoreError::Io(format!("Failed to create shard dir: {}", e)))?;

        let filename = format!("{}.bin", name);
        let rel_path = format!("{}/{}", shard, filename);

        std::fs::write(shard_dir.join(&filename), data)
            .map_err(|e| StoreError::Io(format!("Failed to write blob: {}", e)))?;

        Ok(rel_path)
    }

    /// Remove the blob an entry may have spilled to earlier
    fn remove_blob(&self, partition: &str, key: &str) {
        let name = blob_key(partition, key);
        let path = self.blobs_dir.join(&name[..2]).join(format!("{}.bin", name));
        match std::fs::remove_file(&path) {
            Ok(()) => log::debug!("Removed superseded blob {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove blob {}: {}", path.display(), e),
        }
    }

    /// Nuke the store (delete DB and all blobs)
    fn nuke(db_path: &Path, blobs_dir: &Path) -> Result<()> {
        if db_path.exists() {
            std::fs::remove_file(db_path)
                .map_err(|e| StoreError::Io(format!("Failed to remove store DB: {}", e)))?;
        }
        if blobs_dir.exists() {
            std::fs::remove_dir_all(blobs_dir)
                .map_err(|e| StoreError::Io(format!("Failed to remove blobs dir: {}", e)))?;
        }
        Ok(())
    }
}

/// One row of `list`
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub url: String,
    pub status: u16,
    pub size_bytes: usize,
    pub stored_at: i64,
    /// Raw fetch-time stamp, if the entry carries one
    pub cache_time: Option<String>,
}

/// Statistics about a clear operation
#[derive(Debug, Serialize)]
pub struct ClearStats {
    pub entries_removed: usize,
}

/// Statistics for one partition
#[derive(Debug, Clone, Serialize)]
pub struct PartitionStats {
    pub name: String,
    pub entries: usize,
    pub size_bytes: usize,
    pub oldest_entry: Option<i64>,
    pub newest_entry: Option<i64>,
}

/// Statistics about store state
#[derive(Debug, Default, Serialize)]
pub struct StoreStats {
    pub partitions: Vec<PartitionStats>,
}

impl StoreStats {
    pub fn total_entries(&self) -> usize {
        self.partitions.iter().map(|p| p.entries).sum()
    }

    pub fn total_size_bytes(&self) -> usize {
        self.partitions.iter().map(|p| p.size_bytes).sum()
    }

    pub fn partition(&self, name: &str) -> Option<&PartitionStats> {
        self.partitions.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STATIC: &str = "nepali-news-v1";
    const API: &str = "news-api-v1";

    fn test_store() -> (ResourceStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ResourceStore::open_at(dir.path()).unwrap();
        (store, dir)
    }

    fn response(body: impl Into<Vec<u8>>) -> HttpResponse {
        let mut r = HttpResponse::new(200, "OK", body);
        r.headers = vec![("Content-Type".to_string(), "text/css".to_string())];
        r
    }

    #[test]
    fn test_put_get_inline() {
        let (store, _dir) = test_store();
        let url = "https://news.test/styles.css";
        let key = resource_key("GET", url);

        store.put(STATIC, &key, url, &response("body{}")).unwrap();

        let cached = store.get(STATIC, &key).unwrap().unwrap();
        assert_eq!(cached.url, url);
        assert_eq!(cached.response, response("body{}"));
    }

    #[test]
    fn test_put_get_blob() {
        let (store, dir) = test_store();
        let url = "https://news.test/app.js";
        let key = resource_key("GET", url);
        let data = vec![b'x'; 20_000]; // 20KB - will use blob

        store.put(STATIC, &key, url, &response(data.clone())).unwrap();

        let cached = store.get(STATIC, &key).unwrap().unwrap();
        assert_eq!(cached.response.body, data);
        assert!(dir.path().join("blobs").read_dir().unwrap().next().is_some());
    }

    #[test]
    fn test_binary_body_survives() {
        let (store, _dir) = test_store();
        let key = resource_key("GET", "https://news.test/logo.png");
        let data = vec![0x89, 0x50, 0x4e, 0x47, 0x00, 0xff, 0xfe];

        store
            .put(STATIC, &key, "https://news.test/logo.png", &response(data.clone()))
            .unwrap();

        assert_eq!(store.get(STATIC, &key).unwrap().unwrap().response.body, data);
    }

    #[test]
    fn test_partitions_are_isolated() {
        let (store, _dir) = test_store();
        let url = "https://news.test/";
        let key = resource_key("GET", url);

        store.put(STATIC, &key, url, &response("static")).unwrap();

        assert!(store.get(API, &key).unwrap().is_none());
        assert!(store.get(STATIC, &key).unwrap().is_some());
    }

    #[test]
    fn test_overwrite_replaces_entry() {
        let (store, _dir) = test_store();
        let url = "https://api.allorigins.win/raw?url=x";
        let key = resource_key("GET", url);

        store.put(API, &key, url, &response(vec![b'a'; 20_000])).unwrap();
        store.put(API, &key, url, &response("small")).unwrap();

        let cached = store.get(API, &key).unwrap().unwrap();
        assert_eq!(cached.response.body, b"small".to_vec());
        assert_eq!(store.stats().unwrap().total_entries(), 1);
    }

    #[test]
    fn test_missing_blob_reads_as_miss() {
        let (store, dir) = test_store();
        let url = "https://news.test/big.js";
        let key = resource_key("GET", url);
        store.put(STATIC, &key, url, &response(vec![b'y'; 20_000])).unwrap();

        std::fs::remove_dir_all(dir.path().join("blobs")).unwrap();

        assert!(store.get(STATIC, &key).unwrap().is_none());
        assert_eq!(store.stats().unwrap().total_entries(), 0);
    }

    #[test]
    fn test_put_all_is_keyed_by_get_identity() {
        let (store, _dir) = test_store();
        let entries = vec![
            ("https://news.test/".to_string(), response("<html>")),
            ("https://news.test/app.js".to_string(), response("js")),
        ];

        store.put_all(STATIC, &entries).unwrap();

        let key = resource_key("GET", "https://news.test/app.js");
        assert_eq!(store.get(STATIC, &key).unwrap().unwrap().response.body, b"js".to_vec());
        assert_eq!(store.stats().unwrap().total_entries(), 2);
    }

    #[test]
    fn test_clear_partition_leaves_other_partition() {
        let (store, _dir) = test_store();
        let url = "https://news.test/";
        let key = resource_key("GET", url);
        store.put(STATIC, &key, url, &response("s")).unwrap();
        store.put(API, &key, url, &response(vec![b'z'; 20_000])).unwrap();

        let stats = store.clear_partition(API).unwrap();
        assert_eq!(stats.entries_removed, 1);

        assert!(store.get(API, &key).unwrap().is_none());
        assert!(store.get(STATIC, &key).unwrap().is_some());
    }

    #[test]
    fn test_clear_all() {
        let (store, _dir) = test_store();
        store.put(STATIC, "k1", "https://a/1", &response("d1")).unwrap();
        store.put(API, "k2", "https://a/2", &response("d2")).unwrap();

        let stats = store.clear_all().unwrap();
        assert_eq!(stats.entries_removed, 2);

        assert!(store.get(STATIC, "k1").unwrap().is_none());
        assert!(store.get(API, "k2").unwrap().is_none());
    }

    #[test]
    fn test_stats_per_partition() {
        let (store, _dir) = test_store();
        store.put(STATIC, "k1", "https://a/1", &response("data1")).unwrap();
        store.put(STATIC, "k2", "https://a/2", &response("data2")).unwrap();
        store.put(API, "k3", "https://a/3", &response("d3")).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_entries(), 3);
        assert_eq!(stats.partition(STATIC).unwrap().entries, 2);
        assert_eq!(stats.partition(API).unwrap().size_bytes, 2);
        assert!(stats.total_size_bytes() > 0);
    }

    #[test]
    fn test_list_reports_cache_time() {
        let (store, _dir) = test_store();
        let stamped = response("x").with_header(CACHE_TIME_HEADER, "2024-05-01T10:00:00.000Z");
        store.put(API, "k1", "https://a/1", &stamped).unwrap();

        let entries = store.list(API).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://a/1");
        assert_eq!(entries[0].cache_time.as_deref(), Some("2024-05-01T10:00:00.000Z"));
    }

    #[test]
    fn test_schema_mismatch_rebuilds() {
        let dir = TempDir::new().unwrap();
        {
            let store = ResourceStore::open_at(dir.path()).unwrap();
            store.put(STATIC, "k1", "https://a/1", &response("d1")).unwrap();
            store.conn.pragma_update(None, "user_version", 99).unwrap();
        }

        let store = ResourceStore::open_at(dir.path()).unwrap();
        assert!(store.get(STATIC, "k1").unwrap().is_none());
    }
}
