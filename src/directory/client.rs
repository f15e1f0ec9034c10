use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;

use super::api_types::{Envelope, UserEntry};
use super::types::User;

/// Read access to the user service.
///
/// The HTTP client implements this; tests substitute an in-process source.
pub trait UserSource: Send + Sync {
  /// `GET /users/`
  fn fetch_users(&self) -> BoxFuture<'_, Result<Envelope>>;

  /// `GET /users/{id}/`
  fn fetch_user<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<User>>;
}

/// User service HTTP client
#[derive(Clone)]
pub struct UsersClient {
  http: reqwest::Client,
  /// `None` when no URL is configured; requests then fail
  base_url: Option<Url>,
}

impl UsersClient {
  pub fn new(config: &Config) -> Result<Self> {
    let base_url = config.api_base_url()?;

    let http = reqwest::Client::builder()
      .user_agent(concat!("userdesk/", env!("CARGO_PKG_VERSION")))
      .referer(true)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  /// Build an endpoint URL below the base URL, keeping any base path.
  fn endpoint(&self, segments: &[&str]) -> Result<Url> {
    let mut url = self.base_url.clone().ok_or_else(|| {
      eyre!("User service URL not set. Set api.base_url in the config or API_BASE_URL.")
    })?;
    let base = url.to_string();
    url
      .path_segments_mut()
      .map_err(|_| eyre!("Base URL cannot be a base: {}", base))?
      .pop_if_empty()
      .extend(segments)
      // Trailing slash, the service routes `/users/` and `/users/{id}/`
      .push("");
    Ok(url)
  }

  async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
    tracing::debug!(%url, "GET");

    let response = self
      .http
      .get(url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?;

    let status = response.status();
    if !status.is_success() {
      return Err(eyre!("Request to {} returned {}", url, status));
    }

    response
      .json::<T>()
      .await
      .map_err(|e| eyre!("Failed to parse response from {}: {}", url, e))
  }

  /// Get the full user collection
  pub async fn get_users(&self) -> Result<Envelope> {
    let url = self.endpoint(&["users"])?;
    self.get_json(url).await
  }

  /// Get a single user by id
  pub async fn get_user(&self, id: &str) -> Result<User> {
    let url = self.endpoint(&["users", id])?;
    let entry: UserEntry = self.get_json(url).await?;
    Ok(entry.user)
  }
}

impl UserSource for UsersClient {
  fn fetch_users(&self) -> BoxFuture<'_, Result<Envelope>> {
    Box::pin(self.get_users())
  }

  fn fetch_user<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<User>> {
    Box::pin(self.get_user(id))
  }
}
