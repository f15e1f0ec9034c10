//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Trait for entities that can be held in a cached collection.
///
/// Implementors must provide a key that is unique within the collection.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Unique identifier for this entity (e.g., a user id)
  fn cache_key(&self) -> &str;

  /// Entity type name used in log output (e.g., "user")
  fn entity_type() -> &'static str;
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was last confirmed by the network (if known)
  pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      fetched_at: Some(Utc::now()),
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T, fetched_at: Option<DateTime<Utc>>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      fetched_at,
    }
  }

  /// Create a new cache result for data served from the local mirror only.
  pub fn seeded(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Seed,
      fetched_at: None,
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from the in-memory cache, still inside the staleness window
  CacheFresh,
  /// Data seeded from the local mirror, never confirmed this session
  Seed,
}

impl CacheSource {
  pub fn label(&self) -> &'static str {
    match self {
      CacheSource::Network => "network",
      CacheSource::CacheFresh => "cache",
      CacheSource::Seed => "local mirror",
    }
  }
}
