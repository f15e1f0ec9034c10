//! Serde types matching the user service responses.
//!
//! The same `Envelope` shape is used on the wire and in the local mirror, so
//! the conversion between it and a flat user list lives here and nowhere else.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::types::User;

/// Status fields that accompany every collection response.
///
/// Unknown top-level keys are kept in `extra` so they survive a rewrite of
/// the mirror.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMeta {
  #[serde(default)]
  pub status: String,
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub business: bool,
  #[serde(default)]
  pub error: bool,
  #[serde(default)]
  pub transaction_id: String,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// A single `{ "user": ... }` entry, also the body of the single-user endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEntry {
  pub user: User,
}

/// Collection response: metadata plus the wrapped user list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
  #[serde(flatten)]
  pub meta: EnvelopeMeta,
  #[serde(default)]
  pub content: Vec<UserEntry>,
}

impl Envelope {
  /// Wrap a flat user list with the given metadata.
  pub fn wrap(meta: EnvelopeMeta, users: &[User]) -> Self {
    Self {
      meta,
      content: users
        .iter()
        .cloned()
        .map(|user| UserEntry { user })
        .collect(),
    }
  }

  /// Unwrap the user list, preserving order.
  pub fn into_users(self) -> Vec<User> {
    self.content.into_iter().map(|entry| entry.user).collect()
  }

  /// Borrowing variant of [`Envelope::into_users`].
  pub fn users(&self) -> Vec<User> {
    self.content.iter().map(|entry| entry.user.clone()).collect()
  }
}
