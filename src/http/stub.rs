//! Canned-response fetcher for tests.

use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{Fetcher, Request, Response};

/// Serves registered responses by URL, 404 for anything else.
#[derive(Default)]
pub struct StubFetcher {
  responses: Mutex<HashMap<String, Response>>,
  calls: AtomicUsize,
  offline: AtomicBool,
}

impl StubFetcher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(self, url: &str, response: Response) -> Self {
    self.set(url, response);
    self
  }

  pub fn set(&self, url: &str, response: Response) {
    self
      .responses
      .lock()
      .unwrap()
      .insert(url.to_string(), response);
  }

  pub fn set_offline(&self, offline: bool) {
    self.offline.store(offline, Ordering::SeqCst);
  }

  /// Number of requests that reached the network
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl Fetcher for StubFetcher {
  fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response>> + Send {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let result = if self.offline.load(Ordering::SeqCst) {
      Err(eyre!("Failed to fetch {}: network unreachable", request.url))
    } else {
      Ok(
        self
          .responses
          .lock()
          .unwrap()
          .get(request.url.as_str())
          .cloned()
          .unwrap_or_else(|| Response::new(404, "not found")),
      )
    };
    async move { result }
  }
}
