use color_eyre::Result;
use tracing::{debug, info};

use super::ServiceWorker;
use crate::cache::CacheStorage;
use crate::http::Fetcher;
use crate::notify::{Notification, NotificationOptions, PushPayload, WindowClient};

/// Where a notification click ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
  /// An open window already showed the target and was focused
  Focused(WindowClient),
  /// A new window was opened at the target
  Opened(WindowClient),
}

impl<S: CacheStorage + 'static, F: Fetcher> ServiceWorker<S, F> {
  /// Push event: show a notification built from the JSON payload.
  ///
  /// Returns `None` without showing anything when the push carried no data.
  pub async fn handle_push(&self, data: Option<&[u8]>) -> Result<Option<Notification>> {
    let Some(data) = data else {
      debug!("Push without payload, ignoring");
      return Ok(None);
    };

    let payload = PushPayload::from_slice(data)?;
    let title = non_empty(payload.title).unwrap_or_else(|| self.settings.default_title.clone());
    let options = NotificationOptions {
      body: non_empty(payload.body).unwrap_or_else(|| self.settings.default_body.clone()),
      icon: self.settings.icon.clone(),
      badge: self.settings.badge.clone(),
      data: payload.data,
    };

    let notification = self.notifier.show(&title, options)?;
    info!("Showing notification {}: {}", notification.id, notification.title);

    Ok(Some(notification))
  }

  /// Notification click: close it, then focus a window already showing the
  /// target URL or open a new one.
  pub async fn handle_notification_click(&self, notification: &Notification) -> Result<ClickOutcome> {
    self.notifier.close(notification.id)?;

    let target = notification.target_url(&self.settings.origin)?;
    let windows = self.clients.match_all(true)?;

    if let Some(window) = windows.iter().find(|w| w.url == target) {
      debug!("Focusing window {} at {}", window.id, target);
      return Ok(ClickOutcome::Focused(self.clients.focus(window.id)?));
    }

    info!("Opening window at {}", target);
    Ok(ClickOutcome::Opened(self.clients.open_window(&target)?))
  }
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.is_empty())
}
