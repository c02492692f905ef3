//! Tiered persistent key-value store.
//!
//! No domain knowledge lives here: the store persists arbitrary timestamped
//! entries with expiry and hands back exactly what was written, or nothing
//! at all when an entry is expired or structurally damaged.

mod tiered;

pub use tiered::{CacheMetadata, TieredStore, Ttl, ENTRY_SCHEMA_VERSION};
