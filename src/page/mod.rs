//! Page controller: the script that runs in the shell page itself.

mod controller;
mod dom;
mod install;

use serde::Deserialize;

pub use controller::{PageController, PageEvent};
pub use dom::Document;
pub use install::{InstallPromptEvent, InstallSession};

/// A link shown on the start page
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Resource {
  pub title: String,
  pub url: String,
}
