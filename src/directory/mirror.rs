//! Local mirror of the last user collection response.

use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;

use crate::cache::{MirrorStorage, StoredSlot};

use super::api_types::{Envelope, EnvelopeMeta};
use super::cache::USERS_SLOT;
use super::types::User;

/// Reads and writes the user `Envelope` in a single mirror slot.
#[derive(Clone)]
pub struct LocalMirror {
  storage: Arc<dyn MirrorStorage>,
}

impl LocalMirror {
  pub fn new(storage: Arc<dyn MirrorStorage>) -> Self {
    Self { storage }
  }

  /// Load the stored envelope.
  ///
  /// An empty slot and unparseable content both count as "nothing stored".
  pub fn load(&self) -> Result<Option<(Envelope, StoredSlot)>> {
    let Some(slot) = self.storage.read_slot(USERS_SLOT)? else {
      return Ok(None);
    };

    match serde_json::from_str::<Envelope>(&slot.data) {
      Ok(envelope) => Ok(Some((envelope, slot))),
      Err(e) => {
        tracing::warn!(error = %e, "Ignoring unparseable mirror content");
        Ok(None)
      }
    }
  }

  /// Users to seed the cache with, if the mirror holds any.
  pub fn seed(&self) -> Result<Option<Vec<User>>> {
    Ok(self.load()?.map(|(envelope, _)| envelope.into_users()))
  }

  /// Store a network response verbatim.
  pub fn write_envelope(&self, envelope: &Envelope) -> Result<()> {
    let json =
      serde_json::to_string(envelope).map_err(|e| eyre!("Failed to serialize envelope: {}", e))?;
    self.storage.write_slot(USERS_SLOT, &json)
  }

  /// Rewrite the stored envelope with a new user list.
  ///
  /// Metadata from the previous envelope is kept. Without a usable previous
  /// envelope, default metadata is written.
  pub fn write_through(&self, users: &[User]) -> Result<()> {
    if !self.storage.persists() {
      tracing::debug!(count = users.len(), "Mirror disabled, skipping write-through");
      return Ok(());
    }

    let meta = match self.load()? {
      Some((previous, _)) => previous.meta,
      None => {
        tracing::warn!("No stored envelope to take metadata from, using defaults");
        EnvelopeMeta::default()
      }
    };

    self.write_envelope(&Envelope::wrap(meta, users))
  }

  /// Forget the stored envelope.
  pub fn clear(&self) -> Result<()> {
    self.storage.clear_slot(USERS_SLOT)
  }
}
