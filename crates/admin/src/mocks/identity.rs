//! Fixed token table standing in for the identity service.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use crate::models::Identity;
use crate::services::identity::{IdentityError, IdentityProvider};

/// Identity provider that knows a fixed set of tokens.
#[derive(Clone, Default)]
pub struct StaticIdentityProvider {
    tokens: Arc<RwLock<HashMap<String, Identity>>>,
}

impl StaticIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as `identity` from now on.
    pub async fn insert(&self, token: &str, identity: Identity) {
        self.tokens.write().await.insert(token.to_owned(), identity);
    }

    /// Stop accepting `token`.
    pub async fn revoke(&self, token: &str) {
        self.tokens.write().await.remove(token);
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn resolve(&self, token: &SecretString) -> Result<Identity, IdentityError> {
        self.tokens
            .read()
            .await
            .get(token.expose_secret())
            .cloned()
            .ok_or(IdentityError::InvalidToken)
    }
}
