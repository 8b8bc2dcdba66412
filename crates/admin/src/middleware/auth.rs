//! Authentication extractors.
//!
//! Every `/api` handler takes [`RequireUser`] (or [`RequireAdmin`]). The bearer
//! token is resolved through the identity service and the role is read from
//! storage on each request.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use secrecy::SecretString;

use opsdesk_core::Section;

use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser { user, .. }: RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.role.label())
/// }
/// ```
pub struct RequireUser {
    pub user: CurrentUser,
    /// The caller's token, forwarded on delegated account operations.
    pub token: SecretString,
}

/// Extractor that additionally requires the `admin-users` section.
pub struct RequireAdmin(pub RequireUser);

/// Pull the token out of `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .map(|t| SecretString::from(t.to_owned()))
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_owned()))?;

        let identity = state.identity().resolve(&token).await?;
        set_sentry_user(&identity.id.to_string(), identity.email.as_deref());

        let user = state.access().current_user(identity).await;
        Ok(Self { user, token })
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = RequireUser::from_request_parts(parts, state).await?;
        if !auth.user.can(Section::AdminUsers) {
            return Err(AppError::Forbidden(format!(
                "role {} may not manage users",
                auth.user.role
            )));
        }
        Ok(Self(auth))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static("")));
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer  abc ")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
