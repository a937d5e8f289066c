use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use url::Url;

use crate::http::resolve;

/// JSON body of a push message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushPayload {
  pub title: Option<String>,
  pub body: Option<String>,
  pub data: Option<NotificationData>,
}

impl PushPayload {
  /// Parse a push body. Any JSON value other than an object or `null`
  /// carries no fields and yields an empty payload.
  pub fn from_slice(data: &[u8]) -> Result<Self> {
    let value: serde_json::Value =
      serde_json::from_slice(data).map_err(|e| eyre!("Failed to parse push payload: {}", e))?;

    match value {
      serde_json::Value::Object(_) => serde_json::from_value(value)
        .map_err(|e| eyre!("Failed to parse push payload: {}", e)),
      serde_json::Value::Null => Err(eyre!("Push payload is null")),
      _ => Ok(Self::default()),
    }
  }
}

/// Data attached to a notification and handed back on click
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
  pub url: Option<String>,
}

/// Display options of a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationOptions {
  pub body: String,
  pub icon: String,
  pub badge: String,
  pub data: Option<NotificationData>,
}

/// A notification shown by the worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
  pub id: u64,
  pub title: String,
  #[serde(flatten)]
  pub options: NotificationOptions,
}

impl Notification {
  /// Where a click on this notification should lead, resolved against `origin`.
  ///
  /// Defaults to the origin root when the notification carries no URL.
  pub fn target_url(&self, origin: &Url) -> Result<Url> {
    let path = self
      .options
      .data
      .as_ref()
      .and_then(|data| data.url.as_deref())
      .filter(|url| !url.is_empty())
      .unwrap_or("/");

    resolve(origin, path)
  }
}

/// Displays and dismisses notifications.
pub trait Notifier: Send + Sync {
  fn show(&self, title: &str, options: NotificationOptions) -> Result<Notification>;

  /// Dismiss a notification. Returns whether it was still showing.
  fn close(&self, id: u64) -> Result<bool>;
}

/// In-process notification tray.
#[derive(Default)]
pub struct NotificationCenter {
  showing: Mutex<Vec<Notification>>,
  next_id: AtomicU64,
}

impl NotificationCenter {
  pub fn new() -> Self {
    Self::default()
  }

  /// Notifications currently showing, oldest first
  #[cfg(test)]
  pub fn showing(&self) -> Result<Vec<Notification>> {
    Ok(
      self
        .showing
        .lock()
        .map_err(|e| eyre!("Lock poisoned: {}", e))?
        .clone(),
    )
  }
}

impl Notifier for NotificationCenter {
  fn show(&self, title: &str, options: NotificationOptions) -> Result<Notification> {
    let notification = Notification {
      id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
      title: title.to_string(),
      options,
    };

    self
      .showing
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?
      .push(notification.clone());

    Ok(notification)
  }

  fn close(&self, id: u64) -> Result<bool> {
    let mut showing = self
      .showing
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let before = showing.len();
    showing.retain(|n| n.id != id);
    Ok(showing.len() != before)
  }
}
