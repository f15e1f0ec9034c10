//! Generic caching layer for in-session data and local persistence.
//!
//! This module is agnostic of the user directory. It provides:
//! - A keyed in-memory query cache with get/set/subscribe
//! - Staleness tracking relative to the last network fetch
//! - Fetch generations so superseded responses are discarded
//! - Named mirror slots persisted to SQLite

mod layer;
mod storage;
mod traits;

pub use layer::QueryCache;
pub use storage::{MirrorStorage, NoopStorage, SqliteStorage, StoredSlot};
pub use traits::{CacheResult, CacheSource, Cacheable};
