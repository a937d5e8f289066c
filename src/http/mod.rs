//! Requests, responses and the network seam the worker fetches through.

mod client;
#[cfg(test)]
pub mod stub;
mod types;

pub use client::{Fetcher, NetworkFetcher};
pub use types::{resolve, Destination, Method, Request, Response};
#[cfg(test)]
pub use types::{RequestMode, ResponseType};
