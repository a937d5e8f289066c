//! Cache storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::traits::CacheKey;
use crate::http::{Method, Request, Response};

/// A stored response together with where and when it was stored.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  pub response: Response,
  /// Bucket the entry was found in
  pub bucket: String,
  pub cached_at: DateTime<Utc>,
}

/// Listing row for a cached entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  /// Request signature, e.g. `GET https://app.example/index.html`
  pub request: String,
  pub status: u16,
  pub response_type: String,
  pub size: usize,
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
///
/// Storage is a set of named buckets, each mapping a request key to one
/// response.
pub trait CacheStorage: Send + Sync {
  /// Create the bucket if it does not exist yet.
  fn open(&self, bucket: &str) -> Result<()>;

  fn has(&self, bucket: &str) -> Result<bool>;

  /// Bucket names in creation order.
  fn keys(&self) -> Result<Vec<String>>;

  /// Delete a bucket and everything in it. Returns whether it existed.
  fn delete(&self, bucket: &str) -> Result<bool>;

  /// Store all entries or none of them. Opens the bucket if needed and
  /// overwrites existing entries with the same key.
  fn put_all(&self, bucket: &str, entries: &[(&Request, &Response)]) -> Result<()>;

  fn put(&self, bucket: &str, request: &Request, response: &Response) -> Result<()> {
    self.put_all(bucket, &[(request, response)])
  }

  /// Look a request up across all buckets, oldest bucket first.
  fn match_any(&self, request: &Request) -> Result<Option<CachedResponse>>;

  /// Entries stored in a bucket, ordered by request.
  fn entries(&self, bucket: &str) -> Result<Vec<CacheEntry>>;
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) the storage database at `path`.
  pub fn open_file(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Storage that lives only as long as this value.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;

    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- Named buckets; rowid gives creation order
CREATE TABLE IF NOT EXISTS cache_buckets (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One response per request key per bucket
CREATE TABLE IF NOT EXISTS cache_entries (
    bucket TEXT NOT NULL,
    request_key TEXT NOT NULL,
    request TEXT NOT NULL,
    status INTEGER NOT NULL,
    response_type TEXT NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (bucket, request_key)
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_key ON cache_entries(request_key);
"#;

impl CacheStorage for SqliteStorage {
  fn open(&self, bucket: &str) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute(
        "INSERT OR IGNORE INTO cache_buckets (name) VALUES (?)",
        params![bucket],
      )
      .map_err(|e| eyre!("Failed to open cache {}: {}", bucket, e))?;

    Ok(())
  }

  fn has(&self, bucket: &str) -> Result<bool> {
    let conn = self.lock()?;

    let found: Option<i64> = conn
      .query_row(
        "SELECT 1 FROM cache_buckets WHERE name = ?",
        params![bucket],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up cache {}: {}", bucket, e))?;

    Ok(found.is_some())
  }

  fn keys(&self) -> Result<Vec<String>> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare("SELECT name FROM cache_buckets ORDER BY rowid")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list caches: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read cache name: {}", e))?;

    Ok(names)
  }

  fn delete(&self, bucket: &str) -> Result<bool> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute("DELETE FROM cache_entries WHERE bucket = ?", params![bucket])
      .map_err(|e| eyre!("Failed to delete entries of {}: {}", bucket, e))?;

    let removed = tx
      .execute("DELETE FROM cache_buckets WHERE name = ?", params![bucket])
      .map_err(|e| eyre!("Failed to delete cache {}: {}", bucket, e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(removed > 0)
  }

  fn put_all(&self, bucket: &str, entries: &[(&Request, &Response)]) -> Result<()> {
    if let Some((request, _)) = entries.iter().find(|(r, _)| r.method != Method::Get) {
      return Err(eyre!(
        "Cannot cache {}: request method '{}' is unsupported",
        request.url,
        request.method
      ));
    }

    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(
      "INSERT OR IGNORE INTO cache_buckets (name) VALUES (?)",
      params![bucket],
    )
    .map_err(|e| eyre!("Failed to open cache {}: {}", bucket, e))?;

    for (request, response) in entries {
      let headers = serde_json::to_string(&response.headers)
        .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

      tx.execute(
        "INSERT OR REPLACE INTO cache_entries
           (bucket, request_key, request, status, response_type, headers, body, cached_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))",
        params![
          bucket,
          request.cache_hash(),
          request.description(),
          response.status,
          response.response_type.as_str(),
          headers,
          response.body,
        ],
      )
      .map_err(|e| eyre!("Failed to store {}: {}", request.url, e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn match_any(&self, request: &Request) -> Result<Option<CachedResponse>> {
    let conn = self.lock()?;

    conn
      .query_row(
        "SELECT ce.bucket, ce.status, ce.response_type, ce.headers, ce.body, ce.cached_at
         FROM cache_entries ce
         INNER JOIN cache_buckets cb ON cb.name = ce.bucket
         WHERE ce.request_key = ?
         ORDER BY cb.rowid
         LIMIT 1",
        params![request.cache_hash()],
        read_row,
      )
      .optional()
      .map_err(|e| eyre!("Failed to query caches: {}", e))?
      .map(StoredRow::into_cached)
      .transpose()
  }

  fn entries(&self, bucket: &str) -> Result<Vec<CacheEntry>> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare(
        "SELECT request, status, response_type, length(body), cached_at FROM cache_entries
         WHERE bucket = ?
         ORDER BY request",
      )
      .map_err(|e| eyre!("Failed to prepare entry query: {}", e))?;

    let rows: Vec<(String, u16, String, i64, String)> = stmt
      .query_map(params![bucket], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
      })
      .map_err(|e| eyre!("Failed to query entries: {}", e))?
      .collect::<rusqlite::Result<_>>()
      .map_err(|e| eyre!("Failed to read entry: {}", e))?;

    rows
      .into_iter()
      .map(|(request, status, response_type, size, cached_at)| {
        Ok(CacheEntry {
          request,
          status,
          response_type,
          size: size.max(0) as usize,
          cached_at: parse_datetime(&cached_at)?,
        })
      })
      .collect()
  }
}

/// Raw columns of a matched entry, decoded outside the rusqlite closure.
struct StoredRow {
  bucket: String,
  status: u16,
  response_type: String,
  headers: String,
  body: Vec<u8>,
  cached_at: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRow> {
  Ok(StoredRow {
    bucket: row.get(0)?,
    status: row.get(1)?,
    response_type: row.get(2)?,
    headers: row.get(3)?,
    body: row.get(4)?,
    cached_at: row.get(5)?,
  })
}

impl StoredRow {
  fn into_cached(self) -> Result<CachedResponse> {
    let headers: BTreeMap<String, String> = serde_json::from_str(&self.headers)
      .map_err(|e| eyre!("Failed to deserialize headers: {}", e))?;

    Ok(CachedResponse {
      response: Response {
        status: self.status,
        response_type: self.response_type.parse()?,
        headers,
        body: self.body,
      },
      bucket: self.bucket,
      cached_at: parse_datetime(&self.cached_at)?,
    })
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
