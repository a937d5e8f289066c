use color_eyre::Result;
use tracing::debug;
use url::Url;

use super::ServiceWorker;
use crate::cache::{CacheResult, CacheStorage};
use crate::http::{Destination, Fetcher, Request, Response};

impl<S: CacheStorage + 'static, F: Fetcher> ServiceWorker<S, F> {
  /// Fetch event: cache-first, network second, cached stand-in on failure.
  ///
  /// A worker that is not active does not intercept; the request goes
  /// straight to the network.
  pub async fn handle_fetch(&self, request: &Request) -> Result<CacheResult<Response>> {
    if !self.state()?.can_intercept_fetch() {
      debug!("Worker not active, passing {} through", request.url);
      let response = self.fetcher.fetch(request).await?;
      return Ok(CacheResult::from_network(response));
    }

    self
      .cache
      .fetch(request, self.fallback_for(request), &self.lifetimes, || {
        self.fetcher.fetch(request)
      })
      .await
  }

  /// Offline stand-in: the shell page for navigations, the default icon for
  /// images, nothing otherwise.
  fn fallback_for(&self, request: &Request) -> Option<&Url> {
    if request.is_navigation() {
      Some(&self.settings.navigation_fallback)
    } else if request.destination == Destination::Image {
      Some(&self.settings.image_fallback)
    } else {
      None
    }
  }
}
