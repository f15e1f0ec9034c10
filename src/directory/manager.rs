//! User directory with an in-memory cache and a local mirror.
//!
//! Every read goes through the query cache. Writes are applied to the cache
//! first and then written through to the mirror; nothing is sent to the
//! user service. A cache change and its mirror write happen under one write
//! lock, so the mirror always holds the list the cache held last.

use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cache::{CacheResult, Cacheable, MirrorStorage, NoopStorage, QueryCache, SqliteStorage};
use crate::config::Config;

use super::cache::{find_by_key, matches_email, USERS_KEY};
use super::client::{UserSource, UsersClient};
use super::mirror::LocalMirror;
use super::types::{User, UserDraft};

/// A change to the cached user list.
#[derive(Debug, Clone)]
pub enum Mutation {
  /// Append a user
  Add(User),
  /// Replace the user with the same id, if present
  Update(User),
  /// Remove the user with this id, if present
  Delete(String),
}

impl Mutation {
  /// Produce the list that results from applying this change.
  fn apply(self, current: Option<&Vec<User>>) -> Vec<User> {
    let mut users = current.cloned().unwrap_or_default();

    match self {
      Mutation::Add(user) => users.push(user),
      Mutation::Update(user) => match users.iter_mut().find(|u| u.id == user.id) {
        Some(existing) => *existing = user,
        None => tracing::debug!(id = %user.id, "Update for unknown user ignored"),
      },
      Mutation::Delete(id) => {
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
          tracing::debug!(%id, "Delete for unknown user ignored");
        }
      }
    }

    users
  }
}

/// Synchronizes the user list between the service, the cache and the mirror.
#[derive(Clone)]
pub struct UserManager {
  source: Arc<dyn UserSource>,
  cache: QueryCache<Vec<User>>,
  mirror: LocalMirror,
  /// Serializes cache changes with their mirror writes
  writes: Arc<Mutex<()>>,
}

impl UserManager {
  /// Create a manager and seed its cache from the mirror.
  pub fn new(
    source: Arc<dyn UserSource>,
    cache: QueryCache<Vec<User>>,
    mirror: LocalMirror,
  ) -> Result<Self> {
    let manager = Self {
      source,
      cache,
      mirror,
      writes: Arc::new(Mutex::new(())),
    };

    if let Some(users) = manager.mirror.seed()? {
      tracing::debug!(count = users.len(), "Seeding user cache from mirror");
      manager.cache.seed(USERS_KEY, users)?;
    }

    Ok(manager)
  }

  /// Create a manager backed by the HTTP client and the configured mirror.
  pub fn from_config(config: &Config) -> Result<Self> {
    let source = Arc::new(UsersClient::new(config)?);

    let storage: Arc<dyn MirrorStorage> = if config.cache.persist {
      let path = config.mirror_path()?;
      tracing::debug!(path = %path.display(), "Opening mirror");
      Arc::new(SqliteStorage::open(&path)?)
    } else {
      Arc::new(NoopStorage)
    };

    let cache = QueryCache::new().with_stale_time(Duration::seconds(config.cache.stale_secs as i64));

    Self::new(source, cache, LocalMirror::new(storage))
  }

  fn lock_writes(&self) -> Result<MutexGuard<'_, ()>> {
    self
      .writes
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Current cached users, empty if nothing has been loaded.
  pub fn users(&self) -> Result<Vec<User>> {
    Ok(self.cache.data(USERS_KEY)?.unwrap_or_default())
  }

  /// Cached users without touching the network.
  pub fn cached_users(&self) -> Result<CacheResult<Vec<User>>> {
    let entry = self.cache.get(USERS_KEY)?;
    Ok(match entry {
      Some(entry) if entry.fetched_at.is_some() => {
        CacheResult::from_cache(entry.data, entry.fetched_at)
      }
      Some(entry) => CacheResult::seeded(entry.data),
      None => CacheResult::seeded(Vec::new()),
    })
  }

  /// Watch the cached user list.
  #[allow(dead_code)]
  pub fn subscribe(&self) -> Result<watch::Receiver<Option<Vec<User>>>> {
    self.cache.subscribe(USERS_KEY)
  }

  /// Fetch all users, serving the cache while it is fresh.
  pub async fn fetch_users(&self) -> Result<CacheResult<Vec<User>>> {
    if self.cache.is_fresh(USERS_KEY)? {
      return self.cached_users();
    }
    self.refresh().await
  }

  /// Fetch all users from the service and replace the cache and the mirror.
  ///
  /// A response that arrives after a newer fetch was started is dropped and
  /// the current cache content is returned instead.
  pub async fn refresh(&self) -> Result<CacheResult<Vec<User>>> {
    let ticket = self.cache.begin_fetch(USERS_KEY)?;
    tracing::debug!(generation = ticket.generation(), "Fetching users");

    let envelope = self.source.fetch_users().await.inspect_err(|e| {
      tracing::warn!(error = %e, "Failed to fetch users");
    })?;

    let users = envelope.users();
    {
      let _writes = self.lock_writes()?;
      if !self.cache.settle(USERS_KEY, ticket, users.clone())? {
        tracing::debug!(
          generation = ticket.generation(),
          "Discarding superseded user fetch"
        );
        return self.cached_users();
      }
      self.mirror.write_envelope(&envelope)?;
    }
    tracing::info!(count = users.len(), "Loaded users");

    Ok(CacheResult::from_network(users))
  }

  /// Start a refresh in the background.
  #[allow(dead_code)]
  pub fn spawn_refresh(&self) -> JoinHandle<Result<CacheResult<Vec<User>>>> {
    let manager = self.clone();
    tokio::spawn(async move { manager.refresh().await })
  }

  /// Get a user, from the cache if present, otherwise from the service.
  ///
  /// A user fetched from the service is not added to the cache.
  pub async fn get_user(&self, id: &str) -> Result<User> {
    if let Some(users) = self.cache.data(USERS_KEY)? {
      if let Some(user) = find_by_key(&users, id) {
        return Ok(user.clone());
      }
    }

    tracing::debug!(%id, "{} not cached, fetching", User::entity_type());
    self.source.fetch_user(id).await
  }

  /// Users whose email contains the query, ignoring case.
  pub fn search_users(&self, query: &str) -> Result<Vec<User>> {
    Ok(
      self
        .users()?
        .into_iter()
        .filter(|user| matches_email(user, query))
        .collect(),
    )
  }

  pub fn add_user(&self, user: User) -> Result<Vec<User>> {
    self.commit(Mutation::Add(user))
  }

  pub fn update_user(&self, user: User) -> Result<Vec<User>> {
    self.commit(Mutation::Update(user))
  }

  pub fn delete_user(&self, id: &str) -> Result<Vec<User>> {
    self.commit(Mutation::Delete(id.to_string()))
  }

  /// Create or update a user from a draft, depending on whether it has an id.
  pub fn save_user(&self, draft: UserDraft) -> Result<User> {
    let is_new = draft.id.is_none();
    let user = draft.into_user();

    if is_new {
      self.add_user(user.clone())?;
    } else {
      self.update_user(user.clone())?;
    }

    Ok(user)
  }

  /// Apply a change to the in-memory cache only.
  pub fn apply_local(&self, mutation: Mutation) -> Result<Vec<User>> {
    self
      .cache
      .update(USERS_KEY, |current| mutation.apply(current))
  }

  /// Persist a user list to the mirror.
  pub fn write_through(&self, users: &[User]) -> Result<()> {
    self.mirror.write_through(users)
  }

  fn commit(&self, mutation: Mutation) -> Result<Vec<User>> {
    let _writes = self.lock_writes()?;
    let users = self.apply_local(mutation)?;
    self.write_through(&users)?;
    Ok(users)
  }

  /// Mirror status: number of stored users and when they were written.
  pub fn mirror_status(&self) -> Result<Option<(usize, chrono::DateTime<chrono::Utc>)>> {
    Ok(
      self
        .mirror
        .load()?
        .map(|(envelope, slot)| (envelope.content.len(), slot.written_at)),
    )
  }

  /// Drop the mirror and the cached list.
  pub fn reset(&self) -> Result<()> {
    let _writes = self.lock_writes()?;
    self.mirror.clear()?;
    self.cache.clear()
  }
}
