use color_eyre::{eyre::eyre, Result};
use tracing::{debug, info};

use super::{EventOutcome, ServiceWorker, WorkerEvent, WorkerState};
use crate::cache::CacheStorage;
use crate::http::{Fetcher, Request};

/// What activation did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivateReport {
  /// Stale buckets that were deleted
  pub evicted: Vec<String>,
  /// Windows taken over without a reload
  pub claimed: usize,
}

/// What [`ServiceWorker::start`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReport {
  /// Number of precached entries, if installation ran
  pub precached: Option<usize>,
  /// Present unless the worker is still waiting to activate
  pub activation: Option<ActivateReport>,
}

impl<S: CacheStorage + 'static, F: Fetcher> ServiceWorker<S, F> {
  /// Install event: precache the manifest into the current bucket.
  ///
  /// All entries are stored or none are. On failure the worker becomes
  /// redundant. On success it skips the waiting phase.
  pub async fn install(&self) -> Result<usize> {
    self.transition(WorkerState::Installing)?;
    info!("Installing service worker ({})", self.cache.current());

    self.transition(WorkerState::Caching)?;
    let requests: Vec<Request> = self
      .settings
      .precache
      .iter()
      .cloned()
      .map(Request::get)
      .collect();

    let fetcher = &self.fetcher;
    let stored = match self
      .cache
      .add_all(&requests, |request| async move { fetcher.fetch(&request).await })
      .await
    {
      Ok(stored) => stored,
      Err(e) => {
        self.transition(WorkerState::Redundant)?;
        return Err(e.wrap_err("Service worker installation failed"));
      }
    };
    info!("Cached {} resources", stored);

    self.transition(WorkerState::WaitingToActivate)?;
    self.skip_waiting();

    Ok(stored)
  }

  /// Activate event: delete every bucket but the current one, then take
  /// control of open windows.
  pub async fn activate(&self) -> Result<ActivateReport> {
    self.transition(WorkerState::Activating)?;
    info!("Activating service worker ({})", self.cache.current());

    self.transition(WorkerState::EvictingStale)?;
    let mut evicted = Vec::new();
    for name in self.storage().keys()? {
      if name != self.cache.current() {
        info!("Deleting stale cache {}", name);
        self.storage().delete(&name)?;
        evicted.push(name);
      }
    }

    self.transition(WorkerState::Active)?;
    let claimed = self.clients.claim(&self.settings.origin)?;
    debug!("Claimed {} windows", claimed);

    Ok(ActivateReport { evicted, claimed })
  }

  /// What registration does on page load.
  ///
  /// A worker whose bucket already exists was installed by an earlier run and
  /// goes straight to activation. Otherwise it installs first. Without
  /// `skip_waiting` activation only happens once no window is controlled.
  pub async fn start(&self) -> Result<StartReport> {
    let precached = if self.storage().has(self.cache.current())? {
      debug!("Cache {} present, skipping install", self.cache.current());
      None
    } else {
      match self.dispatch(WorkerEvent::Install).await? {
        EventOutcome::Installed(stored) => Some(stored),
        other => return Err(eyre!("Unexpected install outcome: {:?}", other)),
      }
    };

    let waiting = self.state()? == WorkerState::WaitingToActivate;
    if waiting && !self.is_waiting_skipped() && !self.clients.match_all(false)?.is_empty() {
      info!("Waiting for controlled windows to close before activating");
      return Ok(StartReport {
        precached,
        activation: None,
      });
    }

    let activation = self.activate().await?;
    Ok(StartReport {
      precached,
      activation: Some(activation),
    })
  }
}
