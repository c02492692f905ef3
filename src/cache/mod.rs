//! Domain-aware caching layer.
//!
//! The cache manager knows the shape and validity rules of exchange rates,
//! time-zone snapshots, and preferences. Anything that fails validation is
//! purged rather than propagated.

mod manager;
mod validate;

pub use manager::{CacheManager, CacheStats};
pub use validate::{Validate, Validity};
