//! Caching glue for user directory types.

use crate::cache::Cacheable;

use super::types::User;

/// Query key of the user collection in the in-memory cache
pub const USERS_KEY: &str = "users";

/// Mirror slot holding the user collection envelope
pub const USERS_SLOT: &str = "users";

impl Cacheable for User {
  fn cache_key(&self) -> &str {
    &self.id
  }

  fn entity_type() -> &'static str {
    "user"
  }
}

/// Find a cached entity by key.
pub fn find_by_key<'a, T: Cacheable>(items: &'a [T], key: &str) -> Option<&'a T> {
  items.iter().find(|item| item.cache_key() == key)
}

/// Case-insensitive substring match on email only.
pub fn matches_email(user: &User, query: &str) -> bool {
  user.email.to_lowercase().contains(&query.to_lowercase())
}
