//! Command-line subcommands and their handlers

use clap::Subcommand;
use color_eyre::{eyre::eyre, Result};
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::cache::{CacheResult, CacheStorage, SqliteStorage};
use crate::config::Config;
use crate::http::{resolve, Method, NetworkFetcher, Request, Response};
use crate::notify::{NotificationCenter, NotificationData, WindowRegistry};
use crate::page::{Document, InstallPromptEvent, InstallSession, PageController, PageEvent};
use crate::worker::{
  ClickOutcome, EventOutcome, ServiceWorker, StartReport, WorkerEvent, WorkerSettings,
};

type Worker = ServiceWorker<SqliteStorage, NetworkFetcher>;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Install the worker if its cache is missing, then activate it
  Install,
  /// Activate the worker and delete stale caches
  Activate,
  /// Send one request through the worker
  Fetch {
    /// Absolute URL or path relative to the origin
    url: String,
    /// Treat the request as a page navigation
    #[arg(long, conflicts_with = "image")]
    navigate: bool,
    /// Treat the request as an image load
    #[arg(long)]
    image: bool,
    #[arg(short, long, default_value = "GET")]
    method: String,
    /// Write the body here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
  /// Deliver a push message with an optional JSON payload
  Push { payload: Option<String> },
  /// Click a notification carrying `data`
  Click {
    /// Notification data as JSON, e.g. '{"url":"/data/2"}'
    #[arg(long)]
    data: Option<String>,
    /// URL of an already open window (repeatable)
    #[arg(long = "window")]
    windows: Vec<String>,
  },
  /// Print the shell page with the configured resources
  Render {
    /// Offer installation on these platforms, e.g. `web,play`
    #[arg(long, value_delimiter = ',')]
    install_prompt: Option<Vec<String>>,
    /// Signal that the app has been installed
    #[arg(long)]
    installed: bool,
  },
  /// List cache buckets and their entries
  Caches,
}

impl Command {
  pub async fn run(self, config: &Config) -> Result<()> {
    match self {
      Command::Install => {
        let worker = build_worker(config, WindowRegistry::new())?;
        let report = worker.start().await?;
        println!("{}", describe_start(&report));
        settle(&worker).await
      }
      Command::Activate => {
        let worker = build_worker(config, WindowRegistry::new())?;
        if let EventOutcome::Activated(report) = worker.dispatch(WorkerEvent::Activate).await? {
          for name in &report.evicted {
            println!("deleted {}", name);
          }
          println!("active ({})", worker.settings().cache_version);
        }
        settle(&worker).await
      }
      Command::Fetch {
        url,
        navigate,
        image,
        method,
        output,
      } => {
        let worker = build_worker(config, WindowRegistry::new())?;
        let request = build_request(&worker.settings().origin, &url, navigate, image, &method)?;
        worker.start().await?;

        let result = match worker.dispatch(WorkerEvent::Fetch(request)).await? {
          EventOutcome::Responded(result) => result,
          other => return Err(eyre!("Unexpected fetch outcome: {:?}", other)),
        };
        eprintln!("{}", describe_response(&result));

        match output {
          Some(path) => std::fs::write(&path, &result.data.body)
            .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?,
          None => std::io::stdout()
            .write_all(&result.data.body)
            .map_err(|e| eyre!("Failed to write response body: {}", e))?,
        }
        settle(&worker).await
      }
      Command::Push { payload } => {
        let worker = build_worker(config, WindowRegistry::new())?;
        let data = payload.map(String::into_bytes);
        if let EventOutcome::Pushed(Some(notification)) =
          worker.dispatch(WorkerEvent::Push(data)).await?
        {
          let json = serde_json::to_string_pretty(&notification)
            .map_err(|e| eyre!("Failed to serialize notification: {}", e))?;
          println!("{}", json);
        }
        settle(&worker).await
      }
      Command::Click { data, windows } => {
        let origin = config.origin_url()?;
        let windows = windows
          .iter()
          .map(|w| resolve(&origin, w))
          .collect::<Result<Vec<_>>>()?;
        let worker = build_worker(config, WindowRegistry::with_windows(windows))?;

        let outcome = click(&worker, data.as_deref()).await?;
        println!("{}", describe_click(&outcome));
        settle(&worker).await
      }
      Command::Render {
        install_prompt,
        installed,
      } => {
        let (html, install) = render(config, install_prompt, installed)?;
        println!("{}", html);
        eprintln!("install: {}", install);
        Ok(())
      }
      Command::Caches => {
        let storage = SqliteStorage::open_file(&config.database_path()?)?;
        print!("{}", describe_caches(&storage, &config.cache_version)?);
        Ok(())
      }
    }
  }
}

fn build_worker(config: &Config, clients: WindowRegistry) -> Result<Worker> {
  let settings = WorkerSettings::from_config(config)?;
  let storage = Arc::new(SqliteStorage::open_file(&config.database_path()?)?);
  let fetcher = Arc::new(NetworkFetcher::new(settings.origin.clone())?);

  Ok(ServiceWorker::new(
    settings,
    storage,
    fetcher,
    Arc::new(clients),
    Arc::new(NotificationCenter::new()),
  ))
}

/// Let background cache writes finish before the process exits.
async fn settle(worker: &Worker) -> Result<()> {
  let failed = worker.settle().await?;
  if failed > 0 {
    warn!("{} background tasks failed", failed);
  }
  Ok(())
}

fn build_request(origin: &Url, url: &str, navigate: bool, image: bool, method: &str) -> Result<Request> {
  let url = resolve(origin, url)?;
  let request = if navigate {
    Request::navigate(url)
  } else if image {
    Request::image(url)
  } else {
    Request::get(url)
  };

  Ok(request.with_method(method.parse::<Method>()?))
}

/// Show a notification carrying `data`, then click it.
async fn click(worker: &Worker, data: Option<&str>) -> Result<ClickOutcome> {
  let data: Option<NotificationData> = data
    .map(serde_json::from_str)
    .transpose()
    .map_err(|e| eyre!("Failed to parse notification data: {}", e))?;
  let payload = serde_json::json!({ "data": data }).to_string();

  let notification = match worker.dispatch(WorkerEvent::Push(Some(payload.into_bytes()))).await? {
    EventOutcome::Pushed(Some(notification)) => notification,
    other => return Err(eyre!("Unexpected push outcome: {:?}", other)),
  };
  info!("Clicking notification {}", notification.id);

  match worker.dispatch(WorkerEvent::NotificationClick(notification)).await? {
    EventOutcome::Clicked(outcome) => Ok(outcome),
    other => Err(eyre!("Unexpected click outcome: {:?}", other)),
  }
}

/// Load the shell page, deliver the install signals, and return the HTML
/// with the resulting install state.
fn render(
  config: &Config,
  install_prompt: Option<Vec<String>>,
  installed: bool,
) -> Result<(String, String)> {
  let mut document = Document::shell(&config.app_name);
  let mut controller = PageController::new(config.resources.clone());
  controller.handle(&mut document, PageEvent::DomContentLoaded)?;

  if let Some(platforms) = install_prompt {
    let prompt = InstallPromptEvent::new(platforms);
    controller.handle(&mut document, PageEvent::BeforeInstallPrompt(prompt))?;
  }
  if installed {
    controller.handle(&mut document, PageEvent::AppInstalled)?;
  }

  let install = describe_install(controller.session_mut());
  Ok((document.to_html(), install))
}

fn describe_install(session: &mut InstallSession) -> String {
  if session.is_installed() {
    return "installed".to_string();
  }
  if !session.can_prompt() {
    return "not offered".to_string();
  }

  match session.take_prompt() {
    Some(prompt) => format!(
      "available on {} (banner {})",
      prompt.platforms.join(", "),
      if prompt.default_prevented() { "deferred" } else { "shown" }
    ),
    None => "not offered".to_string(),
  }
}

fn describe_response(result: &CacheResult<Response>) -> String {
  let mut out = format!(
    "{} {}",
    result.data.status,
    result.data.response_type.as_str()
  );
  if let Some(content_type) = result.data.header("content-type") {
    out.push_str(&format!(" {}", content_type));
  }
  match result.cached_at {
    Some(at) => out.push_str(&format!(
      " ({}, cached {})",
      result.source,
      at.format("%Y-%m-%d %H:%M:%S")
    )),
    None => out.push_str(&format!(" ({})", result.source)),
  }
  out
}

fn describe_start(report: &StartReport) -> String {
  let mut out = match report.precached {
    Some(count) => format!("installed, {} resources cached", count),
    None => "already installed".to_string(),
  };
  match &report.activation {
    Some(activation) => out.push_str(&format!(
      "\nactive, {} stale caches deleted",
      activation.evicted.len()
    )),
    None => out.push_str("\nwaiting to activate"),
  }
  out
}

fn describe_click(outcome: &ClickOutcome) -> String {
  match outcome {
    ClickOutcome::Focused(window) => format!("focused {}", window.url),
    ClickOutcome::Opened(window) => format!("opened {}", window.url),
  }
}

fn describe_caches<S: CacheStorage>(storage: &S, current: &str) -> Result<String> {
  let mut out = String::new();
  for name in storage.keys()? {
    let entries = storage.entries(&name)?;
    let marker = if name == current { "*" } else { " " };
    out.push_str(&format!("{} {} ({} entries)\n", marker, name, entries.len()));
    for entry in entries {
      out.push_str(&format!(
        "    {} {} {} {}B {}\n",
        entry.status,
        entry.response_type,
        entry.request,
        entry.size,
        entry.cached_at.format("%Y-%m-%d %H:%M:%S")
      ));
    }
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheSource;
  use crate::http::{Destination, RequestMode, ResponseType};
  use crate::notify::WindowClient;
  use crate::worker::ActivateReport;

  fn origin() -> Url {
    Url::parse("https://app.example/").unwrap()
  }

  #[test]
  fn test_build_request_resolves_paths() {
    let request = build_request(&origin(), "/data/1", true, false, "get").unwrap();
    assert_eq!(request.url.as_str(), "https://app.example/data/1");
    assert_eq!(request.mode, RequestMode::Navigate);

    let request = build_request(&origin(), "https://cdn.example/a.png", false, true, "GET").unwrap();
    assert_eq!(request.destination, Destination::Image);
    assert_eq!(request.url.host_str(), Some("cdn.example"));
  }

  #[test]
  fn test_build_request_rejects_unknown_method() {
    assert!(build_request(&origin(), "/", false, false, "BREW").is_err());
  }

  #[test]
  fn test_render_lists_configured_resources() {
    let config = Config::default();
    let (html, install) = render(&config, None, false).unwrap();

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains(r#"href="./data/1""#));
    assert!(html.contains("<h3>Getting started</h3>"));
    assert!(!html.contains("Loading"));
    assert_eq!(install, "not offered");
  }

  #[test]
  fn test_render_defers_install_prompt() {
    let config = Config::default();
    let platforms = vec!["web".to_string(), "play".to_string()];

    let (_, install) = render(&config, Some(platforms), false).unwrap();

    assert_eq!(install, "available on web, play (banner deferred)");
  }

  #[test]
  fn test_render_after_install_drops_prompt() {
    let config = Config::default();
    let (_, install) = render(&config, Some(vec!["web".to_string()]), true).unwrap();
    assert_eq!(install, "installed");
  }

  #[test]
  fn test_describe_response_reports_source() {
    let fresh = CacheResult::from_network(
      Response::new(200, "{}").with_header("Content-Type", "application/json"),
    );
    assert_eq!(describe_response(&fresh), "200 basic application/json (network)");

    let at = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
      .unwrap()
      .and_hms_opt(12, 30, 0)
      .unwrap()
      .and_utc();
    let stale = CacheResult::fallback(Response::new(200, "").with_type(ResponseType::Cors), at);
    assert_eq!(stale.source, CacheSource::Fallback);
    assert_eq!(
      describe_response(&stale),
      "200 cors (fallback, cached 2024-05-01 12:30:00)"
    );
  }

  #[test]
  fn test_describe_caches_marks_current() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.open("v1").unwrap();
    storage
      .put("v2", &Request::get(origin()), &Response::new(200, "shell"))
      .unwrap();

    let listing = describe_caches(&storage, "v2").unwrap();
    let lines: Vec<&str> = listing.lines().collect();

    assert_eq!(lines[0], "  v1 (0 entries)");
    assert_eq!(lines[1], "* v2 (1 entries)");
    assert!(lines[2].starts_with("    200 basic GET https://app.example/ 5B 20"));
  }

  #[test]
  fn test_describe_start_and_click() {
    let report = StartReport {
      precached: None,
      activation: Some(ActivateReport {
        evicted: vec!["v1".to_string()],
        claimed: 0,
      }),
    };
    assert_eq!(
      describe_start(&report),
      "already installed\nactive, 1 stale caches deleted"
    );

    let window = WindowClient {
      id: 3,
      url: origin(),
      focused: true,
      controlled: true,
    };
    assert_eq!(
      describe_click(&ClickOutcome::Focused(window)),
      "focused https://app.example/"
    );
  }
}
