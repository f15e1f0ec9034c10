//! Mirror storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Raw content of a mirror slot.
#[derive(Debug, Clone)]
pub struct StoredSlot {
  /// Serialized document, stored verbatim
  pub data: String,
  /// When the slot was last written
  pub written_at: DateTime<Utc>,
}

/// Trait for mirror storage backends.
///
/// A backend holds named slots of serialized text. Writes fully overwrite
/// the previous content of a slot.
pub trait MirrorStorage: Send + Sync {
  /// Read a slot, returning `None` if it has never been written.
  fn read_slot(&self, slot: &str) -> Result<Option<StoredSlot>>;

  /// Overwrite a slot with new content.
  fn write_slot(&self, slot: &str, data: &str) -> Result<()>;

  /// Remove a slot entirely.
  fn clear_slot(&self, slot: &str) -> Result<()>;

  /// Whether written slots can be read back.
  fn persists(&self) -> bool {
    true
  }
}

/// Storage implementation that doesn't persist anything.
/// Used when the local mirror is disabled - all operations are no-ops.
pub struct NoopStorage;

impl MirrorStorage for NoopStorage {
  fn read_slot(&self, _slot: &str) -> Result<Option<StoredSlot>> {
    Ok(None) // Always miss
  }

  fn write_slot(&self, _slot: &str, _data: &str) -> Result<()> {
    Ok(()) // Discard
  }

  fn clear_slot(&self, _slot: &str) -> Result<()> {
    Ok(())
  }

  fn persists(&self) -> bool {
    false
  }
}

/// SQLite-based mirror storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) the mirror database at the given path.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create mirror directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open mirror database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open a throwaway in-memory database.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("userdesk").join("mirror.db"))
  }

  /// Run database migrations for mirror tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(MIRROR_SCHEMA)
      .map_err(|e| eyre!("Failed to run mirror migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for mirror tables.
const MIRROR_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS mirror_slots (
    slot TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl MirrorStorage for SqliteStorage {
  fn read_slot(&self, slot: &str) -> Result<Option<StoredSlot>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(String, String)> = conn
      .query_row(
        "SELECT data, written_at FROM mirror_slots WHERE slot = ?",
        params![slot],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read mirror slot {}: {}", slot, e))?;

    match row {
      Some((data, written_at)) => Ok(Some(StoredSlot {
        data,
        written_at: parse_datetime(&written_at)?,
      })),
      None => Ok(None),
    }
  }

  fn write_slot(&self, slot: &str, data: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO mirror_slots (slot, data, written_at)
         VALUES (?, ?, datetime('now'))",
        params![slot, data],
      )
      .map_err(|e| eyre!("Failed to write mirror slot {}: {}", slot, e))?;

    Ok(())
  }

  fn clear_slot(&self, slot: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM mirror_slots WHERE slot = ?", params![slot])
      .map_err(|e| eyre!("Failed to clear mirror slot {}: {}", slot, e))?;

    Ok(())
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_slot_reads_none() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    assert!(storage.read_slot("users").unwrap().is_none());
  }

  #[test]
  fn test_write_overwrites_slot() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.write_slot("users", "first").unwrap();
    storage.write_slot("users", "second").unwrap();

    let slot = storage.read_slot("users").unwrap().unwrap();
    assert_eq!(slot.data, "second");
  }

  #[test]
  fn test_clear_slot() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.write_slot("users", "{}").unwrap();
    storage.clear_slot("users").unwrap();
    assert!(storage.read_slot("users").unwrap().is_none());
  }

  #[test]
  fn test_slots_are_independent() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.write_slot("users", "a").unwrap();
    storage.write_slot("other", "b").unwrap();

    assert_eq!(storage.read_slot("users").unwrap().unwrap().data, "a");
    assert_eq!(storage.read_slot("other").unwrap().unwrap().data, "b");
  }

  #[test]
  fn test_open_creates_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("mirror.db");

    let storage = SqliteStorage::open(&path).unwrap();
    storage.write_slot("users", "x").unwrap();
    drop(storage);

    let reopened = SqliteStorage::open(&path).unwrap();
    assert_eq!(reopened.read_slot("users").unwrap().unwrap().data, "x");
  }

  #[test]
  fn test_noop_storage_discards() {
    let storage = NoopStorage;
    storage.write_slot("users", "x").unwrap();
    assert!(storage.read_slot("users").unwrap().is_none());
    assert!(!storage.persists());
  }
}
