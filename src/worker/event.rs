use color_eyre::Result;

use super::{ActivateReport, ClickOutcome, ServiceWorker};
use crate::cache::{CacheResult, CacheStorage};
use crate::http::{Fetcher, Request, Response};
use crate::notify::Notification;

/// Events the host delivers to the worker
#[derive(Debug, Clone)]
pub enum WorkerEvent {
  Install,
  Activate,
  Fetch(Request),
  /// Push message with its raw payload, if any
  Push(Option<Vec<u8>>),
  NotificationClick(Notification),
}

/// Result of handling one event
#[derive(Debug, Clone)]
pub enum EventOutcome {
  /// Number of precached entries
  Installed(usize),
  Activated(ActivateReport),
  Responded(CacheResult<Response>),
  Pushed(Option<Notification>),
  Clicked(ClickOutcome),
}

impl<S: CacheStorage + 'static, F: Fetcher> ServiceWorker<S, F> {
  /// Route an event to its handler.
  pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome> {
    match event {
      WorkerEvent::Install => self.install().await.map(EventOutcome::Installed),
      WorkerEvent::Activate => self.activate().await.map(EventOutcome::Activated),
      WorkerEvent::Fetch(request) => self
        .handle_fetch(&request)
        .await
        .map(EventOutcome::Responded),
      WorkerEvent::Push(data) => self
        .handle_push(data.as_deref())
        .await
        .map(EventOutcome::Pushed),
      WorkerEvent::NotificationClick(notification) => self
        .handle_notification_click(&notification)
        .await
        .map(EventOutcome::Clicked),
    }
  }
}
