//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::http::Request;

/// Anything that can address a cache entry.
pub trait CacheKey {
  /// Stable, fixed-length key used as the storage primary key
  fn cache_hash(&self) -> String;

  /// Human readable form stored next to the hash
  fn description(&self) -> String;
}

impl CacheKey for Request {
  fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.signature().as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    self.signature()
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from a direct cache hit.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }

  /// Create a new cache result for offline mode.
  pub fn fallback(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Fallback,
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fetched from the network
  Network,
  /// Exact match in cache storage
  Cache,
  /// Network failed, a cached stand-in was served instead
  Fallback,
}

impl std::fmt::Display for CacheSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      CacheSource::Network => write!(f, "network"),
      CacheSource::Cache => write!(f, "cache"),
      CacheSource::Fallback => write!(f, "fallback"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::http::Method;
  use url::Url;

  #[test]
  fn test_hash_is_stable_hex() {
    let request = Request::get(Url::parse("https://app.example/index.html").unwrap());
    let hash = request.cache_hash();
    assert_eq!(hash.len(), 64);
    assert_eq!(hash, request.clone().cache_hash());
  }

  #[test]
  fn test_hash_differs_by_method() {
    let url = Url::parse("https://app.example/api").unwrap();
    let get = Request::get(url.clone());
    let post = Request::get(url).with_method(Method::Post);
    assert_ne!(get.cache_hash(), post.cache_hash());
  }

  #[test]
  fn test_navigation_and_plain_get_share_a_key() {
    let url = Url::parse("https://app.example/").unwrap();
    assert_eq!(
      Request::navigate(url.clone()).cache_hash(),
      Request::get(url).cache_hash()
    );
  }
}
