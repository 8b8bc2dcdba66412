//! Client for the trusted account-management functions.
//!
//! Creating users, deleting users and resetting passwords need elevated
//! credentials that this process never holds. Each call is forwarded to the
//! account service over HTTPS with the caller's own bearer token, and the
//! service decides whether the caller is allowed.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};
use url::Url;
use uuid::Uuid;

use opsdesk_core::{Email, Role, UserId};

use crate::config::AccountServiceConfig;

/// Errors that can occur when calling the account service.
#[derive(Debug, Error)]
pub enum AccountServiceError {
    /// HTTP request failed.
    #[error("account service request failed: {0}")]
    Request(String),

    /// Failed to parse response.
    #[error("account service response error: {0}")]
    Response(String),

    /// The service rejected the call and said why.
    #[error("account service error: {0}")]
    Api(String),
}

/// Details for a new account.
#[derive(Clone)]
pub struct NewAccount {
    pub email: Email,
    pub password: SecretString,
    pub full_name: String,
    pub role: Role,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .finish()
    }
}

/// Privileged account operations.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Create an identity and return its id.
    async fn create_user(
        &self,
        token: &SecretString,
        account: &NewAccount,
    ) -> Result<UserId, AccountServiceError>;

    async fn delete_user(&self, token: &SecretString, user: UserId)
    -> Result<(), AccountServiceError>;

    async fn update_password(
        &self,
        token: &SecretString,
        user: UserId,
        new_password: &SecretString,
    ) -> Result<(), AccountServiceError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserBody<'a> {
    email: &'a str,
    password: &'a str,
    full_name: &'a str,
    role: Role,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserIdBody {
    user_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePasswordBody<'a> {
    user_id: Uuid,
    new_password: &'a str,
}

/// Body of a successful create. The id is returned either nested under
/// `user` or flat as `userId`.
#[derive(Debug, Deserialize)]
struct CreateUserResponse {
    #[serde(default)]
    user: Option<CreatedUser>,
    #[serde(default, rename = "userId")]
    user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct CreatedUser {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the account service.
#[derive(Clone)]
pub struct AccountServiceClient {
    inner: Arc<AccountServiceClientInner>,
}

struct AccountServiceClientInner {
    client: Client,
    base_url: Url,
}

impl std::fmt::Debug for AccountServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountServiceClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl AccountServiceClient {
    /// Create a new account service client.
    #[must_use]
    pub fn new(config: &AccountServiceConfig) -> Self {
        Self {
            inner: Arc::new(AccountServiceClientInner {
                client: Client::new(),
                base_url: config.base_url.clone(),
            }),
        }
    }

    /// POST `body` to the named function and return the raw success body.
    async fn call<B: Serialize + Sync>(
        &self,
        function: &str,
        token: &SecretString,
        body: &B,
    ) -> Result<String, AccountServiceError> {
        let url = self
            .inner
            .base_url
            .join(function)
            .map_err(|e| AccountServiceError::Request(e.to_string()))?;

        let response = self
            .inner
            .client
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| AccountServiceError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AccountServiceError::Response(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map_or_else(|_| format!("{function} returned {status}"), |b| b.error);
            error!(%status, function, error = %message, "Account service error");
            return Err(AccountServiceError::Api(message));
        }

        Ok(text)
    }
}

#[async_trait]
impl AccountService for AccountServiceClient {
    #[instrument(skip(self, token, account), fields(email = %account.email, role = %account.role))]
    async fn create_user(
        &self,
        token: &SecretString,
        account: &NewAccount,
    ) -> Result<UserId, AccountServiceError> {
        let body = CreateUserBody {
            email: account.email.as_str(),
            password: account.password.expose_secret(),
            full_name: &account.full_name,
            role: account.role,
        };
        let text = self.call("admin-create-user", token, &body).await?;

        let parsed: CreateUserResponse = serde_json::from_str(&text)
            .map_err(|e| AccountServiceError::Response(e.to_string()))?;
        let id = parsed
            .user
            .map(|u| u.id)
            .or(parsed.user_id)
            .ok_or_else(|| AccountServiceError::Response("missing user id".to_owned()))?;

        info!(user_id = %id, "Account created");
        Ok(UserId::new(id))
    }

    #[instrument(skip(self, token), fields(user_id = %user))]
    async fn delete_user(
        &self,
        token: &SecretString,
        user: UserId,
    ) -> Result<(), AccountServiceError> {
        let body = UserIdBody {
            user_id: user.as_uuid(),
        };
        self.call("admin-delete-user", token, &body).await?;
        info!("Account deleted");
        Ok(())
    }

    #[instrument(skip(self, token, new_password), fields(user_id = %user))]
    async fn update_password(
        &self,
        token: &SecretString,
        user: UserId,
        new_password: &SecretString,
    ) -> Result<(), AccountServiceError> {
        let body = UpdatePasswordBody {
            user_id: user.as_uuid(),
            new_password: new_password.expose_secret(),
        };
        self.call("admin-update-password", token, &body).await?;
        info!("Password reset");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_body_uses_camel_case() {
        let body = CreateUserBody {
            email: "minh@kba.vn",
            password: "s3cret!",
            full_name: "Minh Tran",
            role: Role::Accountant,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["fullName"], "Minh Tran");
        assert_eq!(json["role"], "accountant");
    }

    #[test]
    fn test_create_response_shapes() {
        let nested: CreateUserResponse =
            serde_json::from_str(r#"{"user":{"id":"4f1c2b8e-7d7a-4a53-9a51-3c1f6a8e2d10"}}"#)
                .unwrap();
        assert!(nested.user.is_some());

        let flat: CreateUserResponse =
            serde_json::from_str(r#"{"userId":"4f1c2b8e-7d7a-4a53-9a51-3c1f6a8e2d10"}"#).unwrap();
        assert!(flat.user_id.is_some());
    }

    #[test]
    fn test_new_account_debug_redacts_password() {
        let account = NewAccount {
            email: Email::parse("minh@kba.vn").unwrap(),
            password: SecretString::from("hunter22"),
            full_name: "Minh Tran".to_owned(),
            role: Role::User,
        };
        let debug = format!("{account:?}");
        assert!(!debug.contains("hunter22"));
        assert!(debug.contains("[REDACTED]"));
    }
}
