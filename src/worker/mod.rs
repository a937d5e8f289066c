//! The service worker: cache lifecycle, fetch interception, push
//! notifications and notification clicks.
//!
//! One handler per lifecycle event. Handlers run to completion on the tokio
//! runtime; work that outlives a handler's answer is tracked in the worker's
//! [`Lifetimes`] and must be settled before the worker is dropped.

mod event;
mod fetch;
mod lifecycle;
mod push;
mod state;
#[cfg(test)]
mod testing;

use color_eyre::{eyre::eyre, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;
use url::Url;

use crate::cache::{CacheLayer, CacheStorage};
use crate::config::Config;
use crate::http::{resolve, Fetcher};
use crate::lifetime::Lifetimes;
use crate::notify::{Clients, Notifier};

pub use event::{EventOutcome, WorkerEvent};
pub use lifecycle::{ActivateReport, StartReport};
pub use push::ClickOutcome;
pub use state::WorkerState;

/// Everything the worker needs to know about the app it serves.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
  pub origin: Url,
  /// Name of the current cache bucket
  pub cache_version: String,
  pub precache: Vec<Url>,
  /// Served when a navigation cannot reach the network
  pub navigation_fallback: Url,
  /// Served when an image cannot reach the network
  pub image_fallback: Url,
  pub default_title: String,
  pub default_body: String,
  pub icon: String,
  pub badge: String,
}

impl WorkerSettings {
  pub fn from_config(config: &Config) -> Result<Self> {
    let origin = config.origin_url()?;

    let precache = config
      .precache
      .iter()
      .map(|path| resolve(&origin, path))
      .collect::<Result<Vec<_>>>()?;

    Ok(Self {
      navigation_fallback: resolve(&origin, &config.fallbacks.navigation)?,
      image_fallback: resolve(&origin, &config.fallbacks.image)?,
      cache_version: config.cache_version.clone(),
      precache,
      default_title: config.default_notification_title().to_string(),
      default_body: config.notifications.default_body.clone(),
      icon: config.notifications.icon.clone(),
      badge: config.notifications.badge.clone(),
      origin,
    })
  }
}

pub struct ServiceWorker<S: CacheStorage, F: Fetcher> {
  settings: WorkerSettings,
  cache: CacheLayer<S>,
  fetcher: Arc<F>,
  clients: Arc<dyn Clients>,
  notifier: Arc<dyn Notifier>,
  state: Mutex<WorkerState>,
  skip_waiting: AtomicBool,
  lifetimes: Lifetimes,
}

impl<S: CacheStorage + 'static, F: Fetcher> ServiceWorker<S, F> {
  pub fn new(
    settings: WorkerSettings,
    storage: Arc<S>,
    fetcher: Arc<F>,
    clients: Arc<dyn Clients>,
    notifier: Arc<dyn Notifier>,
  ) -> Self {
    let cache = CacheLayer::new(storage, settings.cache_version.clone());

    Self {
      settings,
      cache,
      fetcher,
      clients,
      notifier,
      state: Mutex::new(WorkerState::Parsed),
      skip_waiting: AtomicBool::new(false),
      lifetimes: Lifetimes::new(),
    }
  }

  pub fn settings(&self) -> &WorkerSettings {
    &self.settings
  }

  pub fn storage(&self) -> &S {
    self.cache.storage()
  }

  pub fn state(&self) -> Result<WorkerState> {
    self
      .state
      .lock()
      .map(|state| *state)
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Activate as soon as installation finishes instead of waiting for the
  /// previous worker's pages to close.
  pub fn skip_waiting(&self) {
    self.skip_waiting.store(true, Ordering::SeqCst);
  }

  pub fn is_waiting_skipped(&self) -> bool {
    self.skip_waiting.load(Ordering::SeqCst)
  }

  /// Wait for background work started by earlier events. Returns how many
  /// pieces of work failed.
  pub async fn settle(&self) -> Result<usize> {
    self.lifetimes.settle().await
  }

  fn transition(&self, next: WorkerState) -> Result<()> {
    let mut state = self
      .state
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    if !state.can_transition_to(next) {
      return Err(eyre!(
        "Invalid service worker state: cannot go from {} to {}",
        *state,
        next
      ));
    }

    debug!("Service worker {} -> {}", *state, next);
    *state = next;
    Ok(())
  }
}
