//! Errors returned by the dashboard services.

use thiserror::Error;

use opsdesk_core::{Section, TransitionError};

use super::accounts::AccountServiceError;
use crate::db::RepositoryError;

/// Error from a service operation.
///
/// Each variant is a distinct rejection reason callers can branch on.
/// `Conflict` is safe to retry after re-reading current state.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The acting user's role does not grant the section.
    #[error("role {role} may not access {section}")]
    Forbidden {
        role: opsdesk_core::Role,
        section: Section,
    },

    /// An action the policy refuses regardless of role.
    #[error("not permitted: {0}")]
    NotPermitted(String),

    /// Referenced record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Lost a concurrent write or hit an existing open allocation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The record is not in a state that allows the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Storage failed.
    #[error(transparent)]
    Repository(RepositoryError),

    /// The delegated account service failed.
    #[error(transparent)]
    Upstream(#[from] AccountServiceError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::NotFound => Self::NotFound("record".to_owned()),
            other => Self::Repository(other),
        }
    }
}

impl From<TransitionError> for ServiceError {
    fn from(err: TransitionError) -> Self {
        if err.is_already_allocated() {
            Self::Conflict(err.to_string())
        } else {
            Self::InvalidState(err.to_string())
        }
    }
}
