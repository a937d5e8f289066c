//! Work that must finish after an event handler has already answered.
//!
//! A handler that returns before its side effects are done (the fetch handler
//! writing a response copy into the cache) registers that work here. The host
//! calls [`Lifetimes::settle`] before shutting the worker down; work still
//! pending when a `Lifetimes` is dropped is not waited for.

use color_eyre::{eyre::eyre, Result};
use std::sync::Mutex;
use tokio::task::JoinSet;
use tracing::warn;

#[derive(Default)]
pub struct Lifetimes {
  pending: Mutex<JoinSet<Result<()>>>,
}

impl Lifetimes {
  pub fn new() -> Self {
    Self::default()
  }

  /// Keep the worker alive until blocking `work`, such as a SQLite write,
  /// completes.
  pub fn wait_until_blocking<F>(&self, work: F) -> Result<()>
  where
    F: FnOnce() -> Result<()> + Send + 'static,
  {
    self
      .pending
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?
      .spawn_blocking(work);
    Ok(())
  }

  /// Wait for all registered work. Returns how many pieces of work failed;
  /// each failure is logged.
  pub async fn settle(&self) -> Result<usize> {
    let mut set = {
      let mut guard = self
        .pending
        .lock()
        .map_err(|e| eyre!("Lock poisoned: {}", e))?;
      std::mem::take(&mut *guard)
    };

    let mut failed = 0;
    while let Some(joined) = set.join_next().await {
      match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
          warn!("Extended work failed: {}", e);
          failed += 1;
        }
        Err(e) => {
          warn!("Extended work did not complete: {}", e);
          failed += 1;
        }
      }
    }

    Ok(failed)
  }
}
