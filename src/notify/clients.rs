use color_eyre::{eyre::eyre, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use url::Url;

/// An open browsing context the worker can see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
  pub id: u64,
  pub url: Url,
  pub focused: bool,
  /// Whether the active worker controls this window
  pub controlled: bool,
}

/// The windows of the worker's origin.
pub trait Clients: Send + Sync {
  /// All windows, or only the controlled ones.
  fn match_all(&self, include_uncontrolled: bool) -> Result<Vec<WindowClient>>;

  /// Focus a window and return its updated state.
  fn focus(&self, id: u64) -> Result<WindowClient>;

  fn open_window(&self, url: &Url) -> Result<WindowClient>;

  /// Take control of every window on `origin` without a reload. Returns how
  /// many windows changed hands.
  fn claim(&self, origin: &Url) -> Result<usize>;
}

/// In-process window list.
#[derive(Default)]
pub struct WindowRegistry {
  windows: Mutex<Vec<WindowClient>>,
  next_id: AtomicU64,
}

impl WindowRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registry with one uncontrolled, unfocused window per URL.
  pub fn with_windows<I>(urls: I) -> Self
  where
    I: IntoIterator<Item = Url>,
  {
    let registry = Self::new();
    if let Ok(mut windows) = registry.windows.lock() {
      for url in urls {
        windows.push(WindowClient {
          id: registry.next_id(),
          url,
          focused: false,
          controlled: false,
        });
      }
    }
    registry
  }

  fn next_id(&self) -> u64 {
    self.next_id.fetch_add(1, Ordering::SeqCst) + 1
  }
}

impl Clients for WindowRegistry {
  fn match_all(&self, include_uncontrolled: bool) -> Result<Vec<WindowClient>> {
    let windows = self
      .windows
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    Ok(
      windows
        .iter()
        .filter(|w| include_uncontrolled || w.controlled)
        .cloned()
        .collect(),
    )
  }

  fn focus(&self, id: u64) -> Result<WindowClient> {
    let mut windows = self
      .windows
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    if !windows.iter().any(|w| w.id == id) {
      return Err(eyre!("No window with id {}", id));
    }

    let mut focused = None;
    for window in windows.iter_mut() {
      window.focused = window.id == id;
      if window.focused {
        focused = Some(window.clone());
      }
    }

    focused.ok_or_else(|| eyre!("No window with id {}", id))
  }

  fn open_window(&self, url: &Url) -> Result<WindowClient> {
    let mut windows = self
      .windows
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    for window in windows.iter_mut() {
      window.focused = false;
    }

    let window = WindowClient {
      id: self.next_id(),
      url: url.clone(),
      focused: true,
      controlled: true,
    };
    windows.push(window.clone());

    Ok(window)
  }

  fn claim(&self, origin: &Url) -> Result<usize> {
    let mut windows = self
      .windows
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut claimed = 0;
    for window in windows.iter_mut() {
      if !window.controlled && window.url.origin() == origin.origin() {
        window.controlled = true;
        claimed += 1;
      }
    }

    Ok(claimed)
  }
}
