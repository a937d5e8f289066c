//! Cache layer that orchestrates caching logic with network fetching.

use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use super::storage::CacheStorage;
use super::traits::CacheResult;
use crate::http::{Request, Response};
use crate::lifetime::Lifetimes;

/// Cache-first layer over one current bucket.
///
/// Lookups search every bucket; writes only ever go to the current one.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  /// Name of the current cache generation
  current: String,
}

impl<S: CacheStorage + 'static> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: Arc<S>, current: impl Into<String>) -> Self {
    Self {
      storage,
      current: current.into(),
    }
  }

  pub fn storage(&self) -> &S {
    &self.storage
  }

  pub fn current(&self) -> &str {
    &self.current
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. Check cache - any match is returned as-is, the network is not touched
  /// 2. On a miss, fetch from network
  /// 3. Cacheable responses are copied into the current bucket in the background
  /// 4. On network failure, serve `fallback` from cache if given and present
  pub async fn fetch<F, Fut>(
    &self,
    request: &Request,
    fallback: Option<&Url>,
    lifetimes: &Lifetimes,
    fetcher: F,
  ) -> Result<CacheResult<Response>>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Response>>,
  {
    // Check cache first
    if let Some(cached) = self.storage.match_any(request)? {
      debug!("Cache hit for {} in {}", request.url, cached.bucket);
      return Ok(CacheResult::from_cache(cached.response, cached.cached_at));
    }

    debug!("Cache miss for {}", request.url);
    match fetcher().await {
      Ok(response) => {
        if response.is_cacheable() {
          self.store_in_background(request, &response, lifetimes)?;
        }
        Ok(CacheResult::from_network(response))
      }
      Err(err) => {
        let Some(fallback) = fallback else {
          return Err(err);
        };

        // Network failed, serve the cached stand-in (offline mode)
        match self.storage.match_any(&Request::get(fallback.clone()))? {
          Some(cached) => {
            info!("Network failed for {}, serving {}", request.url, fallback);
            Ok(CacheResult::fallback(cached.response, cached.cached_at))
          }
          None => Err(err.wrap_err(format!("No cached fallback at {}", fallback))),
        }
      }
    }
  }

  /// Fetch every request and store all responses, or store nothing.
  ///
  /// Fails if any request errors or answers with a non-OK status. The current
  /// bucket only comes into existence once every response has arrived.
  pub async fn add_all<F, Fut>(&self, requests: &[Request], fetcher: F) -> Result<usize>
  where
    F: Fn(Request) -> Fut,
    Fut: Future<Output = Result<Response>>,
  {
    let responses =
      futures::future::try_join_all(requests.iter().cloned().map(|request| {
        let pending = fetcher(request.clone());
        async move {
          let response = pending.await?;
          if !response.ok() {
            return Err(eyre!(
              "Request for {} failed with status {}",
              request.url,
              response.status
            ));
          }
          Ok(response)
        }
      }))
      .await?;

    let entries: Vec<(&Request, &Response)> = requests.iter().zip(responses.iter()).collect();
    self.storage.put_all(&self.current, &entries)?;

    Ok(entries.len())
  }

  fn store_in_background(
    &self,
    request: &Request,
    response: &Response,
    lifetimes: &Lifetimes,
  ) -> Result<()> {
    let storage = Arc::clone(&self.storage);
    let bucket = self.current.clone();
    let request = request.clone();
    let copy = response.clone();

    lifetimes.wait_until_blocking(move || {
      storage.put(&bucket, &request, &copy).map_err(|e| {
        warn!("Failed to cache {}: {}", request.url, e);
        e
      })
    })
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      current: self.current.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheSource, SqliteStorage};
  use crate::http::stub::StubFetcher;
  use crate::http::{Fetcher, Method, ResponseType};

  fn url(path: &str) -> Url {
    Url::parse("https://app.example/").unwrap().join(path).unwrap()
  }

  fn layer() -> CacheLayer<SqliteStorage> {
    CacheLayer::new(Arc::new(SqliteStorage::open_in_memory().unwrap()), "v1")
  }

  #[tokio::test]
  async fn test_hit_never_touches_network() {
    let layer = layer();
    let lifetimes = Lifetimes::new();
    let request = Request::get(url("/app.js"));
    layer
      .storage()
      .put("v1", &request, &Response::new(200, "cached"))
      .unwrap();

    let fetcher = StubFetcher::new().with(request.url.as_str(), Response::new(200, "fresh"));
    let result = layer
      .fetch(&request, None, &lifetimes, || fetcher.fetch(&request))
      .await
      .unwrap();

    assert_eq!(result.source, CacheSource::Cache);
    assert_eq!(result.data.body, b"cached");
    assert_eq!(fetcher.calls(), 0);
  }

  #[tokio::test]
  async fn test_miss_populates_current_bucket() {
    let layer = layer();
    let lifetimes = Lifetimes::new();
    let request = Request::get(url("/css/styles.css"));
    let fetcher = StubFetcher::new().with(request.url.as_str(), Response::new(200, "body{}"));

    let first = layer
      .fetch(&request, None, &lifetimes, || fetcher.fetch(&request))
      .await
      .unwrap();
    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(lifetimes.settle().await.unwrap(), 0);

    let second = layer
      .fetch(&request, None, &lifetimes, || fetcher.fetch(&request))
      .await
      .unwrap();
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data.body, b"body{}");
    assert_eq!(fetcher.calls(), 1);
  }

  #[tokio::test]
  async fn test_uncacheable_responses_are_passed_through() {
    let layer = layer();
    let lifetimes = Lifetimes::new();
    let missing = Request::get(url("/missing"));
    let font = Request::get(Url::parse("https://fonts.example/css").unwrap());
    let fetcher = StubFetcher::new().with(
      font.url.as_str(),
      Response::new(200, "@font-face{}").with_type(ResponseType::Cors),
    );

    for request in [&missing, &font] {
      layer
        .fetch(request, None, &lifetimes, || fetcher.fetch(request))
        .await
        .unwrap();
    }
    lifetimes.settle().await.unwrap();

    assert!(layer.storage().match_any(&missing).unwrap().is_none());
    assert!(layer.storage().match_any(&font).unwrap().is_none());
  }

  #[tokio::test]
  async fn test_background_write_failure_does_not_fail_fetch() {
    let layer = layer();
    let lifetimes = Lifetimes::new();
    let request = Request::get(url("/api/submit")).with_method(Method::Post);
    let fetcher = StubFetcher::new().with(request.url.as_str(), Response::new(200, "done"));

    let result = layer
      .fetch(&request, None, &lifetimes, || fetcher.fetch(&request))
      .await
      .unwrap();

    assert_eq!(result.data.body, b"done");
    assert_eq!(lifetimes.settle().await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_network_failure_serves_fallback() {
    let layer = layer();
    let lifetimes = Lifetimes::new();
    let shell = url("/index.html");
    layer
      .storage()
      .put("v1", &Request::get(shell.clone()), &Response::new(200, "shell"))
      .unwrap();

    let fetcher = StubFetcher::new();
    fetcher.set_offline(true);
    let request = Request::navigate(url("/data/1"));

    let result = layer
      .fetch(&request, Some(&shell), &lifetimes, || fetcher.fetch(&request))
      .await
      .unwrap();
    assert_eq!(result.source, CacheSource::Fallback);
    assert_eq!(result.data.body, b"shell");
  }

  #[tokio::test]
  async fn test_network_failure_without_fallback_is_an_error() {
    let layer = layer();
    let lifetimes = Lifetimes::new();
    let fetcher = StubFetcher::new();
    fetcher.set_offline(true);
    let request = Request::get(url("/api/data"));

    let shell = url("/index.html");
    assert!(layer
      .fetch(&request, None, &lifetimes, || fetcher.fetch(&request))
      .await
      .is_err());
    // Fallback named but never cached
    assert!(layer
      .fetch(&request, Some(&shell), &lifetimes, || fetcher.fetch(&request))
      .await
      .is_err());
  }

  #[tokio::test]
  async fn test_add_all_stores_everything() {
    let layer = layer();
    let requests = vec![Request::get(url("/")), Request::get(url("/manifest.json"))];
    let fetcher = StubFetcher::new()
      .with(requests[0].url.as_str(), Response::new(200, "shell"))
      .with(requests[1].url.as_str(), Response::new(200, "{}"));

    let stored = layer
      .add_all(&requests, |request| {
        let fetcher = &fetcher;
        async move { fetcher.fetch(&request).await }
      })
      .await
      .unwrap();

    assert_eq!(stored, 2);
    assert_eq!(layer.storage().entries("v1").unwrap().len(), 2);
  }

  #[tokio::test]
  async fn test_add_all_stores_nothing_on_bad_status() {
    let layer = layer();
    let requests = vec![Request::get(url("/")), Request::get(url("/gone.png"))];
    let fetcher = StubFetcher::new().with(requests[0].url.as_str(), Response::new(200, "shell"));

    let result = layer
      .add_all(&requests, |request| {
        let fetcher = &fetcher;
        async move { fetcher.fetch(&request).await }
      })
      .await;

    assert!(result.is_err());
    assert!(layer.storage().entries("v1").unwrap().is_empty());
    assert!(!layer.storage().has("v1").unwrap());
  }
}
