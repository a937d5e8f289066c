//! Versioned response cache for offline support.
//!
//! This module provides the cache storage the worker runs on:
//! - Named buckets, one of which is the current cache generation
//! - Entries keyed by request signature (method + URL), one response per key
//! - A cache-first layer that fills the current bucket from the network and
//!   serves cached stand-ins when the network is unreachable

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, SqliteStorage};
pub use traits::CacheResult;
#[cfg(test)]
pub use traits::CacheSource;
