//! User administration.
//!
//! Listing and role changes are local. Creating users, deleting users and
//! resetting passwords are delegated to the account service with the acting
//! administrator's bearer token; the local profile is written only after the
//! delegated call succeeds. If that local write fails, the new account is
//! deleted again so no account is left without a profile.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info, instrument, warn};

use opsdesk_core::{Email, Role, Section, UserId};

use super::ServiceError;
use super::access::require_section;
use super::accounts::{AccountService, NewAccount};
use crate::db::{RepositoryError, UserDirectory};
use crate::models::{CreateUserRequest, CurrentUser, UpsertProfile, UserProfile};

/// Shortest password the account service accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

fn check_password(password: &SecretString) -> Result<(), ServiceError> {
    if password.expose_secret().chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// User administration operations. All require the `admin-users` section.
#[derive(Clone)]
pub struct UserAdministration {
    users: Arc<dyn UserDirectory>,
    accounts: Arc<dyn AccountService>,
}

impl UserAdministration {
    #[must_use]
    pub fn new(users: Arc<dyn UserDirectory>, accounts: Arc<dyn AccountService>) -> Self {
        Self { users, accounts }
    }

    /// All users, newest first.
    ///
    /// # Errors
    ///
    /// `Forbidden` or a storage failure.
    pub async fn list_users(&self, actor: &CurrentUser) -> Result<Vec<UserProfile>, ServiceError> {
        require_section(actor, Section::AdminUsers)?;
        Ok(self.users.list_profiles().await?)
    }

    /// # Errors
    ///
    /// `Forbidden`, or `NotFound` if the user has no profile.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id(), user_id = %user, role = %role))]
    pub async fn change_role(
        &self,
        actor: &CurrentUser,
        user: UserId,
        role: Role,
    ) -> Result<UserProfile, ServiceError> {
        require_section(actor, Section::AdminUsers)?;
        let profile = self.users.set_role(user, role).await.map_err(|e| match e {
            RepositoryError::NotFound => ServiceError::NotFound("user".to_owned()),
            other => other.into(),
        })?;
        info!("Role changed");
        Ok(profile)
    }

    /// Create an account through the account service, then store its profile.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `Validation` for a bad email, short password or empty name,
    /// `Upstream` if the account service refuses, or `Conflict` if the email is
    /// already on another profile.
    #[instrument(skip(self, actor, token, request), fields(actor_id = %actor.id(), role = %request.role))]
    pub async fn create_user(
        &self,
        actor: &CurrentUser,
        token: &SecretString,
        request: CreateUserRequest,
    ) -> Result<UserProfile, ServiceError> {
        require_section(actor, Section::AdminUsers)?;

        let email = Email::parse(&request.email)
            .map_err(|e| ServiceError::Validation(format!("email: {e}")))?;
        let password = SecretString::from(request.password);
        check_password(&password)?;
        let full_name = request.full_name.trim().to_owned();
        if full_name.is_empty() {
            return Err(ServiceError::Validation("full_name is required".to_owned()));
        }

        if let Some(existing) = self.users.get_profile_by_email(&email).await? {
            return Err(ServiceError::Conflict(format!(
                "email already belongs to user {}",
                existing.id
            )));
        }

        let account = NewAccount {
            email,
            password,
            full_name,
            role: request.role,
        };
        let id = self.accounts.create_user(token, &account).await?;

        let stored = self
            .users
            .upsert_profile(&UpsertProfile {
                id,
                email: account.email,
                full_name: account.full_name,
                role: account.role,
            })
            .await;
        let profile = match stored {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %id, error = %e, "Profile write failed, removing new account");
                if let Err(undo) = self.accounts.delete_user(token, id).await {
                    error!(
                        user_id = %id,
                        error = %undo,
                        "Account exists without a profile, remove it manually"
                    );
                }
                return Err(e.into());
            }
        };
        info!(user_id = %profile.id, "User created");
        Ok(profile)
    }

    /// Delete an account through the account service, then drop its profile.
    ///
    /// Administrators cannot delete themselves or another administrator; the
    /// target must be demoted first.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `NotPermitted`, `NotFound`, or `Upstream`.
    #[instrument(skip(self, actor, token), fields(actor_id = %actor.id(), user_id = %user))]
    pub async fn delete_user(
        &self,
        actor: &CurrentUser,
        token: &SecretString,
        user: UserId,
    ) -> Result<(), ServiceError> {
        require_section(actor, Section::AdminUsers)?;
        if user == actor.id() {
            return Err(ServiceError::NotPermitted(
                "you cannot delete your own account".to_owned(),
            ));
        }

        let profile = self
            .users
            .get_profile(user)
            .await?
            .ok_or_else(|| ServiceError::NotFound("user".to_owned()))?;
        if profile.role == Role::Admin {
            return Err(ServiceError::NotPermitted(
                "administrators cannot be deleted".to_owned(),
            ));
        }

        self.accounts.delete_user(token, user).await?;
        if let Err(e) = self.users.delete_profile(user).await {
            error!(
                user_id = %user,
                error = %e,
                "Account deleted but profile remains, remove it manually"
            );
            return Err(e.into());
        }
        info!("User deleted");
        Ok(())
    }

    /// Set a new password through the account service.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `Validation` for a short password, or `Upstream`.
    #[instrument(skip(self, actor, token, new_password), fields(actor_id = %actor.id(), user_id = %user))]
    pub async fn reset_password(
        &self,
        actor: &CurrentUser,
        token: &SecretString,
        user: UserId,
        new_password: SecretString,
    ) -> Result<(), ServiceError> {
        require_section(actor, Section::AdminUsers)?;
        check_password(&new_password)?;
        self.accounts
            .update_password(token, user, &new_password)
            .await?;
        info!("Password reset");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::mocks::{AccountCall, InMemoryUserDirectory, RecordingAccountService};
    use crate::models::Identity;

    const TOKEN: &str = "session-token-admin";

    fn actor(role: Role) -> CurrentUser {
        CurrentUser {
            identity: Identity {
                id: UserId::new(Uuid::new_v4()),
                email: Some("root@kba.vn".to_owned()),
                full_name: None,
            },
            role,
        }
    }

    fn token() -> SecretString {
        SecretString::from(TOKEN)
    }

    fn request(email: &str, role: Role) -> CreateUserRequest {
        CreateUserRequest {
            email: email.to_owned(),
            password: "pa55word".to_owned(),
            full_name: "Thu Pham".to_owned(),
            role,
        }
    }

    fn setup() -> (UserAdministration, InMemoryUserDirectory, RecordingAccountService) {
        let users = InMemoryUserDirectory::new();
        let accounts = RecordingAccountService::new();
        let service = UserAdministration::new(Arc::new(users.clone()), Arc::new(accounts.clone()));
        (service, users, accounts)
    }

    #[tokio::test]
    async fn test_create_user_delegates_then_stores_profile() {
        let (service, users, accounts) = setup();
        let admin = actor(Role::Admin);

        let profile = service
            .create_user(&admin, &token(), request("thu@kba.vn", Role::Accountant))
            .await
            .unwrap();
        assert_eq!(profile.role, Role::Accountant);
        assert_eq!(users.snapshot().await.len(), 1);

        let calls = accounts.calls().await;
        assert!(matches!(
            &calls[..],
            [AccountCall::Create { role: Role::Accountant, token, .. }] if token == TOKEN
        ));
    }

    #[tokio::test]
    async fn test_create_user_validation() {
        let (service, _, accounts) = setup();
        let admin = actor(Role::Admin);

        let mut short = request("thu@kba.vn", Role::User);
        short.password = "12345".to_owned();
        assert!(matches!(
            service.create_user(&admin, &token(), short).await.unwrap_err(),
            ServiceError::Validation(_)
        ));

        let bad_email = request("not-an-email", Role::User);
        assert!(matches!(
            service.create_user(&admin, &token(), bad_email).await.unwrap_err(),
            ServiceError::Validation(_)
        ));

        assert!(accounts.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_writes_nothing() {
        let (service, users, accounts) = setup();
        accounts.fail_with("A user with this email address has already been registered").await;

        let err = service
            .create_user(&actor(Role::Admin), &token(), request("thu@kba.vn", Role::User))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Upstream(_)));
        assert!(users.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_before_delegating() {
        let (service, users, accounts) = setup();
        let admin = actor(Role::Admin);

        service
            .create_user(&admin, &token(), request("thu@kba.vn", Role::User))
            .await
            .unwrap();
        let err = service
            .create_user(&admin, &token(), request("thu@kba.vn", Role::User))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let creates = accounts
            .calls()
            .await
            .into_iter()
            .filter(|c| matches!(c, AccountCall::Create { .. }))
            .count();
        assert_eq!(creates, 1);
        assert_eq!(users.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_profile_write_failure_removes_new_account() {
        let (service, users, accounts) = setup();
        users.set_read_only(true);

        let err = service
            .create_user(&actor(Role::Admin), &token(), request("thu@kba.vn", Role::User))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Repository(_)));

        let calls = accounts.calls().await;
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], AccountCall::Create { .. }));
        assert!(matches!(calls[1], AccountCall::Delete { .. }));
        assert!(users.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_profile_delete_failure_is_reported() {
        let (service, users, accounts) = setup();
        let admin = actor(Role::Admin);
        let staff = service
            .create_user(&admin, &token(), request("staff@kba.vn", Role::User))
            .await
            .unwrap();
        users.set_read_only(true);

        let err = service
            .delete_user(&admin, &token(), staff.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Repository(_)));
        assert!(
            accounts
                .calls()
                .await
                .contains(&AccountCall::Delete { user: staff.id, token: TOKEN.to_owned() })
        );
        assert_eq!(users.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_non_admin_is_forbidden() {
        let (service, _, _) = setup();
        for role in [Role::Accountant, Role::HrAdmin, Role::ProjectManager, Role::User] {
            let err = service.list_users(&actor(role)).await.unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden { .. }));
        }
    }

    #[tokio::test]
    async fn test_change_role_missing_user() {
        let (service, _, _) = setup();
        let err = service
            .change_role(&actor(Role::Admin), UserId::new(Uuid::new_v4()), Role::HrAdmin)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let (service, _, accounts) = setup();
        let admin = actor(Role::Admin);

        let err = service
            .delete_user(&admin, &token(), admin.id())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotPermitted(_)));

        let other_admin = service
            .create_user(&admin, &token(), request("boss@kba.vn", Role::Admin))
            .await
            .unwrap();
        let err = service
            .delete_user(&admin, &token(), other_admin.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotPermitted(_)));

        let staff = service
            .create_user(&admin, &token(), request("staff@kba.vn", Role::User))
            .await
            .unwrap();
        service.delete_user(&admin, &token(), staff.id).await.unwrap();

        let deletes = accounts
            .calls()
            .await
            .into_iter()
            .filter(|c| matches!(c, AccountCall::Delete { .. }))
            .count();
        assert_eq!(deletes, 1);
    }

    #[tokio::test]
    async fn test_reset_password_minimum_length() {
        let (service, _, accounts) = setup();
        let admin = actor(Role::Admin);
        let user = UserId::new(Uuid::new_v4());

        let err = service
            .reset_password(&admin, &token(), user, SecretString::from("abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        service
            .reset_password(&admin, &token(), user, SecretString::from("abcdef"))
            .await
            .unwrap();
        assert_eq!(
            accounts.calls().await,
            vec![AccountCall::UpdatePassword {
                user,
                token: TOKEN.to_owned()
            }]
        );
    }
}
