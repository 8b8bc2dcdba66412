//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::db::{AssetRepository, AssetStore, UserDirectory, UserProfileRepository};
use crate::services::{
    AccessResolver, AccountService, AccountServiceClient, AssetLifecycle, IdentityClient,
    IdentityError, IdentityProvider, UserAdministration,
};

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    identity: Arc<dyn IdentityProvider>,
    access: AccessResolver,
    assets: AssetLifecycle,
    users: UserAdministration,
    asset_store: Arc<dyn AssetStore>,
}

impl AppState {
    /// Build the production state: Postgres stores and HTTP clients.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if the identity client cannot be configured.
    pub fn new(config: &AdminConfig, pool: PgPool) -> Result<Self, IdentityError> {
        let identity = IdentityClient::new(&config.identity)?;
        let accounts = AccountServiceClient::new(&config.accounts);

        Ok(Self::from_parts(
            Arc::new(UserProfileRepository::new(pool.clone())),
            Arc::new(AssetRepository::new(pool)),
            Arc::new(identity),
            Arc::new(accounts),
        ))
    }

    /// Build state from explicit components.
    #[must_use]
    pub fn from_parts(
        user_store: Arc<dyn UserDirectory>,
        asset_store: Arc<dyn AssetStore>,
        identity: Arc<dyn IdentityProvider>,
        accounts: Arc<dyn AccountService>,
    ) -> Self {
        Self::with_lifecycle(
            user_store,
            Arc::clone(&asset_store),
            identity,
            accounts,
            AssetLifecycle::new(asset_store),
        )
    }

    /// Like [`Self::from_parts`], with a preconfigured lifecycle service
    /// (for example one with a pinned date).
    #[must_use]
    pub fn with_lifecycle(
        user_store: Arc<dyn UserDirectory>,
        asset_store: Arc<dyn AssetStore>,
        identity: Arc<dyn IdentityProvider>,
        accounts: Arc<dyn AccountService>,
        assets: AssetLifecycle,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                identity,
                access: AccessResolver::new(Arc::clone(&user_store)),
                assets,
                users: UserAdministration::new(user_store, accounts),
                asset_store,
            }),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    #[must_use]
    pub fn access(&self) -> &AccessResolver {
        &self.inner.access
    }

    #[must_use]
    pub fn assets(&self) -> &AssetLifecycle {
        &self.inner.assets
    }

    #[must_use]
    pub fn users(&self) -> &UserAdministration {
        &self.inner.users
    }

    /// Raw asset store, for readiness checks.
    #[must_use]
    pub fn asset_store(&self) -> &dyn AssetStore {
        self.inner.asset_store.as_ref()
    }
}
