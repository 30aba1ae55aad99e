//! Versioned response cache for offline support.
//!
//! This module provides the cache generations the worker serves from:
//! - Entries are request → response snapshots keyed by method + URL
//! - Every read and write goes to the single current generation
//! - Stale generations are removed wholesale on activation

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::SqliteStorage;
pub use traits::{CacheSource, CacheStore};
