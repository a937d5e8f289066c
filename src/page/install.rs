use tracing::info;

/// The platform's offer to install the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPromptEvent {
  /// Platforms the app can be installed on, e.g. `web`, `play`
  pub platforms: Vec<String>,
  default_prevented: bool,
}

impl InstallPromptEvent {
  pub fn new(platforms: Vec<String>) -> Self {
    Self {
      platforms,
      default_prevented: false,
    }
  }

  /// Stop the platform from showing its own install banner.
  pub fn prevent_default(&mut self) {
    self.default_prevented = true;
  }

  pub fn default_prevented(&self) -> bool {
    self.default_prevented
  }
}

/// Install state for one page session.
///
/// Holds the deferred install prompt until something asks for it.
#[derive(Debug, Default)]
pub struct InstallSession {
  deferred: Option<InstallPromptEvent>,
  installed: bool,
}

impl InstallSession {
  pub fn new() -> Self {
    Self::default()
  }

  /// Suppress the platform banner and keep the prompt for a later trigger.
  /// A newer prompt replaces an older one.
  pub fn defer(&mut self, mut event: InstallPromptEvent) {
    event.prevent_default();
    self.deferred = Some(event);
  }

  /// The app was installed; the deferred prompt can no longer be used.
  pub fn mark_installed(&mut self) {
    info!("App is already installed");
    self.deferred = None;
    self.installed = true;
  }

  pub fn can_prompt(&self) -> bool {
    self.deferred.is_some()
  }

  pub fn is_installed(&self) -> bool {
    self.installed
  }

  /// Hand the deferred prompt to whatever shows the install UI. A prompt can
  /// only be used once.
  pub fn take_prompt(&mut self) -> Option<InstallPromptEvent> {
    self.deferred.take()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defer_suppresses_default_and_retains() {
    let mut session = InstallSession::new();
    session.defer(InstallPromptEvent::new(vec!["web".to_string()]));

    assert!(session.can_prompt());
    let prompt = session.take_prompt().unwrap();
    assert!(prompt.default_prevented());
    assert_eq!(prompt.platforms, vec!["web"]);
    assert!(session.take_prompt().is_none());
  }

  #[test]
  fn test_installed_clears_prompt() {
    let mut session = InstallSession::new();
    session.defer(InstallPromptEvent::new(Vec::new()));
    session.mark_installed();

    assert!(!session.can_prompt());
    assert!(session.is_installed());
  }
}
