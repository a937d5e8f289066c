//! Worker wired to in-process doubles.

use std::sync::Arc;
use url::Url;

use super::{ServiceWorker, WorkerSettings};
use crate::cache::SqliteStorage;
use crate::config::Config;
use crate::http::stub::StubFetcher;
use crate::http::Response;
use crate::notify::{NotificationCenter, WindowRegistry};

pub const ORIGIN: &str = "https://app.example/";

pub struct Harness {
  pub worker: ServiceWorker<SqliteStorage, StubFetcher>,
  pub storage: Arc<SqliteStorage>,
  pub fetcher: Arc<StubFetcher>,
  pub clients: Arc<WindowRegistry>,
  pub notifier: Arc<NotificationCenter>,
}

pub fn url(path: &str) -> Url {
  Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

/// Small app: shell, script, one icon; version `v2`.
pub fn settings() -> WorkerSettings {
  let config = Config {
    app_name: "Test App".to_string(),
    origin: ORIGIN.to_string(),
    cache_version: "v2".to_string(),
    precache: vec![
      "/".to_string(),
      "/index.html".to_string(),
      "/js/app.js".to_string(),
      "/assets/icons/icon-512x512.png".to_string(),
    ],
    ..Config::default()
  };
  WorkerSettings::from_config(&config).unwrap()
}

/// A fetcher that can serve every precache entry.
pub fn online_fetcher(settings: &WorkerSettings) -> StubFetcher {
  let fetcher = StubFetcher::new();
  for url in &settings.precache {
    fetcher.set(url.as_str(), Response::new(200, format!("precached {}", url.path())));
  }
  fetcher
}

pub fn harness_with(fetcher: StubFetcher, clients: WindowRegistry) -> Harness {
  harness_on(
    Arc::new(SqliteStorage::open_in_memory().unwrap()),
    fetcher,
    clients,
  )
}

/// A fresh worker over existing storage, as a later run of the app sees it.
pub fn harness_on(storage: Arc<SqliteStorage>, fetcher: StubFetcher, clients: WindowRegistry) -> Harness {
  let fetcher = Arc::new(fetcher);
  let clients = Arc::new(clients);
  let notifier = Arc::new(NotificationCenter::new());

  let worker = ServiceWorker::new(
    settings(),
    storage.clone(),
    fetcher.clone(),
    clients.clone(),
    notifier.clone(),
  );

  Harness {
    worker,
    storage,
    fetcher,
    clients,
    notifier,
  }
}

pub fn harness() -> Harness {
  harness_with(online_fetcher(&settings()), WindowRegistry::new())
}
