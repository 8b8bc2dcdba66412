//! Account service fake that records every call.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use uuid::Uuid;

use opsdesk_core::{Email, Role, UserId};

use crate::services::accounts::{AccountService, AccountServiceError, NewAccount};

/// A call received by [`RecordingAccountService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountCall {
    Create {
        email: Email,
        full_name: String,
        role: Role,
        token: String,
    },
    Delete {
        user: UserId,
        token: String,
    },
    UpdatePassword {
        user: UserId,
        token: String,
    },
}

/// Account service that succeeds (or fails on demand) and records its calls.
#[derive(Clone, Default)]
pub struct RecordingAccountService {
    calls: Arc<Mutex<Vec<AccountCall>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl RecordingAccountService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `message`.
    pub async fn fail_with(&self, message: &str) {
        *self.failure.lock().await = Some(message.to_owned());
    }

    pub async fn calls(&self) -> Vec<AccountCall> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: AccountCall) -> Result<(), AccountServiceError> {
        if let Some(message) = self.failure.lock().await.clone() {
            return Err(AccountServiceError::Api(message));
        }
        self.calls.lock().await.push(call);
        Ok(())
    }
}

#[async_trait]
impl AccountService for RecordingAccountService {
    async fn create_user(
        &self,
        token: &SecretString,
        account: &NewAccount,
    ) -> Result<UserId, AccountServiceError> {
        self.record(AccountCall::Create {
            email: account.email.clone(),
            full_name: account.full_name.clone(),
            role: account.role,
            token: token.expose_secret().to_owned(),
        })
        .await?;
        Ok(UserId::new(Uuid::new_v4()))
    }

    async fn delete_user(
        &self,
        token: &SecretString,
        user: UserId,
    ) -> Result<(), AccountServiceError> {
        self.record(AccountCall::Delete {
            user,
            token: token.expose_secret().to_owned(),
        })
        .await
    }

    async fn update_password(
        &self,
        token: &SecretString,
        user: UserId,
        _new_password: &SecretString,
    ) -> Result<(), AccountServiceError> {
        self.record(AccountCall::UpdatePassword {
            user,
            token: token.expose_secret().to_owned(),
        })
        .await
    }
}
