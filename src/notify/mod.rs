//! Notifications and the window clients a click can land on.

mod clients;
mod notification;

pub use clients::{Clients, WindowClient, WindowRegistry};
pub use notification::{
  Notification, NotificationCenter, NotificationData, NotificationOptions, Notifier, PushPayload,
};
