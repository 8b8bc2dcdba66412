//! Asset lifecycle state machine.
//!
//! Every change of [`AssetStatus`] goes through [`AssetStatus::apply`], which
//! either yields the next status or a [`TransitionError`] naming the rejected
//! `(status, action)` pair. Storage layers then write the result with a
//! conditional update against the status that was read, so the table below is
//! the only place transitions are decided.
//!
//! ```text
//! in_stock ──allocate──▶ allocated ──return(good|fair)──────▶ in_stock
//!    ▲                       │
//!    │                       └──return(damaged|broken)──▶ under_maintenance
//!    │                                                         │ mark_ready
//!    └────────restock─────── ready_for_reallocation ◀──────────┘
//! any non-allocated status ──dispose──▶ disposed (terminal)
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{AllocationStatus, AssetStatus, ReturnCondition};

/// An event that may move an asset to a new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "condition")]
pub enum AssetAction {
    /// Hand the asset to a holder.
    Allocate,
    /// Take the asset back from its holder.
    Return(ReturnCondition),
    /// Put a stocked asset into general service.
    Activate,
    /// Take the asset out of service for repair.
    SendToMaintenance,
    /// Repair finished.
    MarkReady,
    /// Put the asset back on the shelf.
    Restock,
    /// Write the asset off.
    Dispose,
}

impl AssetAction {
    /// Short name for logs and error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Allocate => "allocate",
            Self::Return(_) => "return",
            Self::Activate => "activate",
            Self::SendToMaintenance => "send_to_maintenance",
            Self::MarkReady => "mark_ready",
            Self::Restock => "restock",
            Self::Dispose => "dispose",
        }
    }
}

/// A transition the state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {} an asset that is {from}", .action.name())]
pub struct TransitionError {
    /// Status the asset was in.
    pub from: AssetStatus,
    /// Action that was attempted.
    pub action: AssetAction,
}

impl TransitionError {
    /// The asset is already held by someone, so the rejection is a conflict
    /// with another allocation rather than a bad request.
    #[must_use]
    pub const fn is_already_allocated(&self) -> bool {
        matches!(self.action, AssetAction::Allocate) && matches!(self.from, AssetStatus::Allocated)
    }
}

impl AssetStatus {
    /// Apply `action` to this status.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when the action is not allowed from this
    /// status. Disposed assets reject every action.
    pub const fn apply(self, action: AssetAction) -> Result<Self, TransitionError> {
        use AssetStatus::{
            Active, Allocated, Disposed, InStock, ReadyForReallocation, UnderMaintenance,
        };

        let next = match (self, action) {
            (InStock | Active | ReadyForReallocation, AssetAction::Allocate) => Some(Allocated),
            (Allocated, AssetAction::Return(condition)) => {
                if condition.is_reusable() {
                    Some(InStock)
                } else {
                    Some(UnderMaintenance)
                }
            }
            (InStock | ReadyForReallocation, AssetAction::Activate) => Some(Active),
            (InStock | Active | ReadyForReallocation, AssetAction::SendToMaintenance) => {
                Some(UnderMaintenance)
            }
            (UnderMaintenance, AssetAction::MarkReady) => Some(ReadyForReallocation),
            (Active | ReadyForReallocation, AssetAction::Restock) => Some(InStock),
            (
                InStock | Active | UnderMaintenance | ReadyForReallocation,
                AssetAction::Dispose,
            ) => Some(Disposed),
            _ => None,
        };

        match next {
            Some(status) => Ok(status),
            None => Err(TransitionError { from: self, action }),
        }
    }

    /// Whether the asset can be handed to a new holder.
    #[must_use]
    pub const fn is_allocatable(self) -> bool {
        self.apply(AssetAction::Allocate).is_ok()
    }
}

/// Status of an allocation as it should be shown on `today`.
///
/// An open allocation whose expected return date is strictly before `today`
/// is overdue. Nothing else changes the stored status.
#[must_use]
pub fn effective_allocation_status(
    stored: AllocationStatus,
    expected_return_date: Option<NaiveDate>,
    today: NaiveDate,
) -> AllocationStatus {
    match stored {
        AllocationStatus::Returned => AllocationStatus::Returned,
        AllocationStatus::Active | AllocationStatus::Overdue => match expected_return_date {
            Some(expected) if expected < today => AllocationStatus::Overdue,
            _ => AllocationStatus::Active,
        },
    }
}
