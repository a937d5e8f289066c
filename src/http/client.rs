use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use url::Url;

use super::types::{Request, RequestMode, Response, ResponseType};

/// Anything that can put a request on the wire.
///
/// An `Err` means the request never produced a response (DNS, connection,
/// TLS). HTTP error statuses come back as `Ok` responses.
pub trait Fetcher: Send + Sync {
  fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response>> + Send;
}

/// Network fetcher backed by reqwest
#[derive(Clone)]
pub struct NetworkFetcher {
  client: reqwest::Client,
  origin: Url,
}

impl NetworkFetcher {
  pub fn new(origin: Url) -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("pwa-shell/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, origin })
  }

  fn is_same_origin(&self, url: &Url) -> bool {
    url.origin() == self.origin.origin()
  }
}

impl Fetcher for NetworkFetcher {
  fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response>> + Send {
    let client = self.client.clone();
    let same_origin = self.is_same_origin(&request.url);
    let request = request.clone();

    async move {
      let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
        .map_err(|e| eyre!("Invalid method {}: {}", request.method, e))?;

      let response = client
        .request(method, request.url.clone())
        .send()
        .await
        .map_err(|e| eyre!("Failed to fetch {}: {}", request.url, e))?;

      // Cross-origin no-cors responses are opaque to the page
      if !same_origin && request.mode == RequestMode::NoCors {
        return Ok(Response::opaque());
      }

      let status = response.status().as_u16();
      let headers: Vec<(String, String)> = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
          value
            .to_str()
            .ok()
            .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

      let body = response
        .bytes()
        .await
        .map_err(|e| eyre!("Failed to read body of {}: {}", request.url, e))?
        .to_vec();

      let response_type = if same_origin {
        ResponseType::Basic
      } else {
        ResponseType::Cors
      };

      let mut response = Response::new(status, body).with_type(response_type);
      for (name, value) in headers {
        response = response.with_header(&name, value);
      }
      Ok(response)
    }
  }
}
