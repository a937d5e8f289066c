use color_eyre::{eyre::eyre, Result};
use tracing::debug;

use super::dom::{Document, Element};
use super::install::{InstallPromptEvent, InstallSession};
use super::Resource;

/// Selector of the element the resource list is rendered into
pub const RESOURCES_SELECTOR: &str = ".resources";

/// Platform signals the page reacts to
#[derive(Debug, Clone)]
pub enum PageEvent {
  /// The document finished parsing
  DomContentLoaded,
  /// The platform offers to install the app
  BeforeInstallPrompt(InstallPromptEvent),
  /// The app was installed
  AppInstalled,
}

/// Page-side half of the shell: renders the resource list and owns the
/// install session.
#[derive(Debug)]
pub struct PageController {
  resources: Vec<Resource>,
  session: InstallSession,
}

impl PageController {
  pub fn new(resources: Vec<Resource>) -> Self {
    Self {
      resources,
      session: InstallSession::new(),
    }
  }

  pub fn handle(&mut self, document: &mut Document, event: PageEvent) -> Result<()> {
    match event {
      PageEvent::DomContentLoaded => display_resources(document, &self.resources),
      PageEvent::BeforeInstallPrompt(prompt) => {
        self.session.defer(prompt);
        Ok(())
      }
      PageEvent::AppInstalled => {
        self.session.mark_installed();
        Ok(())
      }
    }
  }

  pub fn session_mut(&mut self) -> &mut InstallSession {
    &mut self.session
  }
}

/// Replace the contents of the resource container with one link per entry.
///
/// Each link opens in a new browsing context. Fails if the document has no
/// resource container.
pub fn display_resources(document: &mut Document, resources: &[Resource]) -> Result<()> {
  let container = document
    .query_selector_mut(RESOURCES_SELECTOR)
    .ok_or_else(|| eyre!("No element matches {}", RESOURCES_SELECTOR))?;

  // Drop the static placeholder items
  container.clear_children();

  for resource in resources {
    container.append_child(
      Element::new("a")
        .with_attr("href", &resource.url)
        .with_attr("target", "_blank")
        .with_class("resource-item")
        .with_child(Element::new("div").with_child(Element::new("h3").with_text(&resource.title))),
    );
  }

  debug!("Rendered {} resources", resources.len());
  Ok(())
}
