//! Identity service client.
//!
//! Resolves a bearer token to the identity behind it. Results are cached in
//! memory for a short TTL so each request does not cost a round trip. Only
//! the identity is cached; roles are always read fresh from storage.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use opsdesk_core::UserId;

use crate::config::IdentityConfig;
use crate::models::Identity;

/// Errors that can occur when resolving a token.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The token was rejected: expired, revoked or malformed.
    #[error("invalid or expired token")]
    InvalidToken,

    /// HTTP request failed.
    #[error("identity request failed: {0}")]
    Request(String),

    /// Failed to parse response.
    #[error("identity response error: {0}")]
    Response(String),
}

/// Resolves bearer tokens to identities.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: &SecretString) -> Result<Identity, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    full_name: Option<String>,
}

impl From<UserResponse> for Identity {
    fn from(user: UserResponse) -> Self {
        Self {
            id: UserId::new(user.id),
            email: user.email,
            full_name: user.user_metadata.full_name,
        }
    }
}

/// HTTP client for the identity service.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: Client,
    user_url: Url,
    api_key: Option<SecretString>,
    cache: Cache<String, Identity>,
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("user_url", &self.inner.user_url.as_str())
            .field("api_key", &self.inner.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl IdentityClient {
    /// Create a new identity client.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Request` if the `user` endpoint URL cannot be
    /// built from the configured base.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let user_url = config
            .base_url
            .join("user")
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client: Client::new(),
                user_url,
                api_key: config.api_key.clone(),
                cache,
            }),
        })
    }

    async fn fetch(&self, token: &SecretString) -> Result<Identity, IdentityError> {
        let mut request = self
            .inner
            .client
            .get(self.inner.user_url.clone())
            .bearer_auth(token.expose_secret());
        if let Some(key) = &self.inner.api_key {
            request = request.header("apikey", key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(IdentityError::InvalidToken);
            }
            status => {
                warn!(%status, "Identity service returned an error");
                return Err(IdentityError::Response(format!("unexpected status {status}")));
            }
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Response(e.to_string()))?;

        Ok(user.into())
    }
}

#[async_trait]
impl IdentityProvider for IdentityClient {
    #[instrument(skip_all)]
    async fn resolve(&self, token: &SecretString) -> Result<Identity, IdentityError> {
        let key = token.expose_secret().to_owned();
        if let Some(identity) = self.inner.cache.get(&key).await {
            debug!(user_id = %identity.id, "Identity cache hit");
            return Ok(identity);
        }

        let identity = self.fetch(token).await?;
        debug!(user_id = %identity.id, "Identity resolved");
        self.inner.cache.insert(key, identity.clone()).await;
        Ok(identity)
    }
}
