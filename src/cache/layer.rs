//! In-memory query cache with staleness tracking and fetch generations.

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

/// A cached value and when it was last confirmed by the network.
#[derive(Debug, Clone)]
pub struct QueryEntry<T> {
  pub data: T,
  /// `None` while the value only comes from a local seed or local writes
  pub fetched_at: Option<DateTime<Utc>>,
}

/// Ticket handed out to an outstanding fetch.
///
/// Only the ticket with the latest generation for a key may settle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
  generation: u64,
}

impl FetchTicket {
  pub fn generation(&self) -> u64 {
    self.generation
  }
}

struct Slot<T> {
  entry: Option<QueryEntry<T>>,
  generation: u64,
  notify: watch::Sender<Option<T>>,
}

impl<T: Clone> Slot<T> {
  fn new() -> Self {
    let (notify, _) = watch::channel(None);
    Self {
      entry: None,
      generation: 0,
      notify,
    }
  }

  fn replace(&mut self, entry: QueryEntry<T>) {
    self.notify.send_replace(Some(entry.data.clone()));
    self.entry = Some(entry);
  }
}

/// Keyed in-memory cache holding the current value of each query.
///
/// The cache is an explicit object owned by whoever initializes it and
/// shared by cloning; clones see the same entries.
pub struct QueryCache<T> {
  slots: Arc<Mutex<HashMap<String, Slot<T>>>>,
  /// How long after a network fetch the value is considered fresh
  stale_time: Duration,
}

impl<T: Clone> QueryCache<T> {
  /// Create an empty cache with the default stale time of five minutes.
  pub fn new() -> Self {
    Self {
      slots: Arc::new(Mutex::new(HashMap::new())),
      stale_time: Duration::minutes(5),
    }
  }

  /// Set the stale time for cached data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Slot<T>>>> {
    self
      .slots
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Get the current entry for a key.
  pub fn get(&self, key: &str) -> Result<Option<QueryEntry<T>>> {
    let slots = self.lock()?;
    Ok(slots.get(key).and_then(|slot| slot.entry.clone()))
  }

  /// Get only the data for a key.
  pub fn data(&self, key: &str) -> Result<Option<T>> {
    Ok(self.get(key)?.map(|entry| entry.data))
  }

  /// Whether the key holds a value fetched within the stale time.
  pub fn is_fresh(&self, key: &str) -> Result<bool> {
    let fetched_at = self.get(key)?.and_then(|entry| entry.fetched_at);
    Ok(match fetched_at {
      Some(at) => Utc::now() - at <= self.stale_time,
      None => false,
    })
  }

  /// Populate an empty key with an initial value that has not been fetched.
  ///
  /// Returns `false` and leaves the cache untouched if the key already holds
  /// a value.
  pub fn seed(&self, key: &str, data: T) -> Result<bool> {
    let mut slots = self.lock()?;
    let slot = slots.entry(key.to_string()).or_insert_with(Slot::new);
    if slot.entry.is_some() {
      return Ok(false);
    }
    slot.replace(QueryEntry {
      data,
      fetched_at: None,
    });
    Ok(true)
  }

  /// Replace the value for a key, keeping its fetch timestamp.
  #[allow(dead_code)]
  pub fn set(&self, key: &str, data: T) -> Result<()> {
    self.update(key, |_| data).map(|_| ())
  }

  /// Read-modify-write the value for a key under the cache lock.
  ///
  /// The updater receives the current value (if any) and returns the new
  /// one, which is also returned to the caller.
  pub fn update<F>(&self, key: &str, updater: F) -> Result<T>
  where
    F: FnOnce(Option<&T>) -> T,
  {
    let mut slots = self.lock()?;
    let slot = slots.entry(key.to_string()).or_insert_with(Slot::new);
    let fetched_at = slot.entry.as_ref().and_then(|entry| entry.fetched_at);
    let data = updater(slot.entry.as_ref().map(|entry| &entry.data));
    slot.replace(QueryEntry {
      data: data.clone(),
      fetched_at,
    });
    Ok(data)
  }

  /// Register a new fetch for a key, superseding any fetch in flight.
  pub fn begin_fetch(&self, key: &str) -> Result<FetchTicket> {
    let mut slots = self.lock()?;
    let slot = slots.entry(key.to_string()).or_insert_with(Slot::new);
    slot.generation += 1;
    Ok(FetchTicket {
      generation: slot.generation,
    })
  }

  /// Apply a fetch result if its ticket is still the latest for the key.
  ///
  /// Returns `false` when the fetch was superseded and the value discarded.
  pub fn settle(&self, key: &str, ticket: FetchTicket, data: T) -> Result<bool> {
    let mut slots = self.lock()?;
    let slot = slots.entry(key.to_string()).or_insert_with(Slot::new);
    if slot.generation != ticket.generation {
      return Ok(false);
    }
    slot.replace(QueryEntry {
      data,
      fetched_at: Some(Utc::now()),
    });
    Ok(true)
  }

  /// Subscribe to value changes for a key.
  ///
  /// The receiver starts with the current value (or `None`).
  pub fn subscribe(&self, key: &str) -> Result<watch::Receiver<Option<T>>> {
    let mut slots = self.lock()?;
    let slot = slots.entry(key.to_string()).or_insert_with(Slot::new);
    Ok(slot.notify.subscribe())
  }

  /// Drop every entry. Outstanding tickets are invalidated as well.
  pub fn clear(&self) -> Result<()> {
    let mut slots = self.lock()?;
    for slot in slots.values_mut() {
      slot.entry = None;
      slot.generation += 1;
      slot.notify.send_replace(None);
    }
    Ok(())
  }
}

impl<T: Clone> Default for QueryCache<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Clone for QueryCache<T> {
  fn clone(&self) -> Self {
    Self {
      slots: Arc::clone(&self.slots),
      stale_time: self.stale_time,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_cache_has_no_data() {
    let cache: QueryCache<Vec<i32>> = QueryCache::new();
    assert!(cache.data("k").unwrap().is_none());
    assert!(!cache.is_fresh("k").unwrap());
  }

  #[test]
  fn test_seed_only_fills_empty_key() {
    let cache = QueryCache::new();
    assert!(cache.seed("k", vec![1]).unwrap());
    assert!(!cache.seed("k", vec![2]).unwrap());
    assert_eq!(cache.data("k").unwrap(), Some(vec![1]));
  }

  #[test]
  fn test_seeded_value_is_not_fresh() {
    let cache = QueryCache::new();
    cache.seed("k", vec![1]).unwrap();
    assert!(!cache.is_fresh("k").unwrap());
  }

  #[test]
  fn test_settled_value_is_fresh() {
    let cache = QueryCache::new();
    let ticket = cache.begin_fetch("k").unwrap();
    assert!(cache.settle("k", ticket, vec![1]).unwrap());
    assert!(cache.is_fresh("k").unwrap());
  }

  #[test]
  fn test_expired_value_is_not_fresh() {
    let cache = QueryCache::new().with_stale_time(Duration::seconds(-1));
    let ticket = cache.begin_fetch("k").unwrap();
    cache.settle("k", ticket, vec![1]).unwrap();
    assert!(!cache.is_fresh("k").unwrap());
  }

  #[test]
  fn test_superseded_ticket_is_discarded() {
    let cache = QueryCache::new();
    let old = cache.begin_fetch("k").unwrap();
    let new = cache.begin_fetch("k").unwrap();

    assert!(cache.settle("k", new, vec![2]).unwrap());
    assert!(!cache.settle("k", old, vec![1]).unwrap());
    assert_eq!(cache.data("k").unwrap(), Some(vec![2]));
  }

  #[test]
  fn test_update_keeps_fetch_timestamp() {
    let cache = QueryCache::new();
    let ticket = cache.begin_fetch("k").unwrap();
    cache.settle("k", ticket, vec![1]).unwrap();

    let updated = cache
      .update("k", |old| {
        let mut list = old.cloned().unwrap_or_default();
        list.push(2);
        list
      })
      .unwrap();

    assert_eq!(updated, vec![1, 2]);
    assert!(cache.is_fresh("k").unwrap());
  }

  #[test]
  fn test_clones_share_entries() {
    let cache = QueryCache::new();
    let other = cache.clone();
    cache.set("k", vec![7]).unwrap();
    assert_eq!(other.data("k").unwrap(), Some(vec![7]));
  }

  #[test]
  fn test_subscribe_sees_changes() {
    let cache = QueryCache::new();
    let mut rx = cache.subscribe("k").unwrap();
    assert!(rx.borrow_and_update().is_none());

    cache.set("k", vec![3]).unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), Some(vec![3]));
  }

  #[test]
  fn test_clear_invalidates_tickets() {
    let cache = QueryCache::new();
    let ticket = cache.begin_fetch("k").unwrap();
    cache.clear().unwrap();
    assert!(!cache.settle("k", ticket, vec![1]).unwrap());
    assert!(cache.data("k").unwrap().is_none());
  }
}
