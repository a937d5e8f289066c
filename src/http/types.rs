use color_eyre::{eyre::eyre, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// HTTP request methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Head,
  Post,
  Put,
  Delete,
  Patch,
  Options,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Head => "HEAD",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
      Method::Patch => "PATCH",
      Method::Options => "OPTIONS",
    }
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Method {
  type Err = color_eyre::Report;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_uppercase().as_str() {
      "GET" => Ok(Method::Get),
      "HEAD" => Ok(Method::Head),
      "POST" => Ok(Method::Post),
      "PUT" => Ok(Method::Put),
      "DELETE" => Ok(Method::Delete),
      "PATCH" => Ok(Method::Patch),
      "OPTIONS" => Ok(Method::Options),
      other => Err(eyre!("Unsupported request method: {}", other)),
    }
  }
}

/// How the request crosses origins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
  /// Top-level page navigation
  Navigate,
  /// Subresource loads such as `<img>`, opaque when cross-origin
  NoCors,
  Cors,
}

/// What the requested resource will be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
  Document,
  Image,
  /// fetch() calls and anything without a more specific use
  Empty,
}

/// A request as seen by the fetch handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  pub url: Url,
  pub method: Method,
  pub mode: RequestMode,
  pub destination: Destination,
}

impl Request {
  /// Plain GET, the shape `fetch(url)` and `cache.addAll` produce.
  pub fn get(url: Url) -> Self {
    Self {
      url,
      method: Method::Get,
      mode: RequestMode::Cors,
      destination: Destination::Empty,
    }
  }

  /// A top-level navigation to `url`.
  pub fn navigate(url: Url) -> Self {
    Self {
      url,
      method: Method::Get,
      mode: RequestMode::Navigate,
      destination: Destination::Document,
    }
  }

  /// An `<img>` load, which the platform issues in no-cors mode.
  pub fn image(url: Url) -> Self {
    Self {
      url,
      method: Method::Get,
      mode: RequestMode::NoCors,
      destination: Destination::Image,
    }
  }

  pub fn with_method(mut self, method: Method) -> Self {
    self.method = method;
    self
  }

  pub fn is_navigation(&self) -> bool {
    self.mode == RequestMode::Navigate
  }

  /// Method plus URL with the fragment removed. Two requests with the same
  /// signature hit the same cache entry.
  pub fn signature(&self) -> String {
    let mut url = self.url.clone();
    url.set_fragment(None);
    format!("{} {}", self.method, url)
  }
}

/// Response tainting, following the fetch standard's response types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
  /// Same-origin response
  Basic,
  /// Cross-origin response readable by the page
  Cors,
  /// Cross-origin no-cors response: status 0, no headers, no body
  Opaque,
}

impl ResponseType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ResponseType::Basic => "basic",
      ResponseType::Cors => "cors",
      ResponseType::Opaque => "opaque",
    }
  }
}

impl fmt::Display for ResponseType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ResponseType {
  type Err = color_eyre::Report;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "basic" => Ok(ResponseType::Basic),
      "cors" => Ok(ResponseType::Cors),
      "opaque" => Ok(ResponseType::Opaque),
      other => Err(eyre!("Unknown response type: {}", other)),
    }
  }
}

/// A fully buffered response.
///
/// The body is owned bytes, so handing one copy to the caller and another to
/// the cache is a plain `clone()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  pub status: u16,
  pub response_type: ResponseType,
  /// Header names are stored lowercase
  pub headers: BTreeMap<String, String>,
  pub body: Vec<u8>,
}

impl Response {
  /// A same-origin response with the given status and body.
  pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      response_type: ResponseType::Basic,
      headers: BTreeMap::new(),
      body: body.into(),
    }
  }

  pub fn opaque() -> Self {
    Self {
      status: 0,
      response_type: ResponseType::Opaque,
      headers: BTreeMap::new(),
      body: Vec::new(),
    }
  }

  pub fn with_type(mut self, response_type: ResponseType) -> Self {
    self.response_type = response_type;
    self
  }

  pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
    self.headers.insert(name.to_ascii_lowercase(), value.into());
    self
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .get(&name.to_ascii_lowercase())
      .map(String::as_str)
  }

  /// Status in the 200-299 range
  pub fn ok(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Whether the fetch handler may store this response for later hits.
  pub fn is_cacheable(&self) -> bool {
    self.status == 200 && self.response_type == ResponseType::Basic
  }
}

/// Resolve a manifest path or URL against the worker origin.
pub fn resolve(origin: &Url, path: &str) -> Result<Url> {
  origin
    .join(path)
    .map_err(|e| eyre!("Invalid URL '{}' relative to {}: {}", path, origin, e))
}
