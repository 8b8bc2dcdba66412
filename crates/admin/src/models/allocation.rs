//! Allocation records: an asset handed to a holder for a period.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use opsdesk_core::lifecycle::effective_allocation_status;
use opsdesk_core::{AllocationId, AllocationStatus, AssetId, ReturnCondition, UserId};

use super::asset::page;

/// An allocation (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub asset_id: AssetId,
    /// User holding the asset.
    pub holder_id: UserId,
    pub purpose: String,
    pub allocation_date: NaiveDate,
    pub expected_return_date: Option<NaiveDate>,
    pub actual_return_date: Option<NaiveDate>,
    /// Stored status: `active` or `returned`.
    pub status: AllocationStatus,
    pub return_condition: Option<ReturnCondition>,
    /// 0..=100, recorded on return.
    pub reusability_percentage: Option<i16>,
    pub allocated_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Allocation {
    /// Whether the allocation still holds its asset.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Status to display on `today`, with overdue derived from dates.
    #[must_use]
    pub fn effective_status(&self, today: NaiveDate) -> AllocationStatus {
        effective_allocation_status(self.status, self.expected_return_date, today)
    }

    #[must_use]
    pub fn into_view(self, today: NaiveDate) -> AllocationView {
        let effective_status = self.effective_status(today);
        AllocationView {
            allocation: self,
            effective_status,
        }
    }
}

/// An allocation as returned by read paths: stored and effective status.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationView {
    #[serde(flatten)]
    pub allocation: Allocation,
    pub effective_status: AllocationStatus,
}

/// Parameters for inserting an allocation row.
#[derive(Debug, Clone)]
pub struct NewAllocation {
    pub asset_id: AssetId,
    pub holder_id: UserId,
    pub purpose: String,
    pub allocation_date: NaiveDate,
    pub expected_return_date: Option<NaiveDate>,
    pub allocated_by: UserId,
}

/// Values recorded when closing an allocation.
#[derive(Debug, Clone, Copy)]
pub struct ReturnRecord {
    pub actual_return_date: NaiveDate,
    pub condition: ReturnCondition,
    pub reusability_percentage: i16,
}

/// Request body for allocating an asset.
#[derive(Debug, Clone, Deserialize)]
pub struct AllocateRequest {
    pub asset_id: AssetId,
    pub holder_id: UserId,
    pub purpose: String,
    /// Defaults to today.
    #[serde(default)]
    pub allocation_date: Option<NaiveDate>,
    #[serde(default)]
    pub expected_return_date: Option<NaiveDate>,
}

/// Request body for returning an allocation.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReturnRequest {
    /// Defaults to today.
    #[serde(default)]
    pub actual_return_date: Option<NaiveDate>,
    pub condition: ReturnCondition,
    pub reusability_percentage: u8,
}

/// Filters for listing allocations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllocationFilter {
    pub asset_id: Option<AssetId>,
    pub holder_id: Option<UserId>,
    /// Stored status.
    pub status: Option<AllocationStatus>,
    /// Only open allocations past their expected return date.
    #[serde(default, alias = "overdue")]
    pub overdue_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AllocationFilter {
    #[must_use]
    pub fn page(&self) -> (i64, i64) {
        page(self.limit, self.offset)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn allocation(status: AllocationStatus, expected: Option<NaiveDate>) -> Allocation {
        Allocation {
            id: AllocationId::new(1),
            asset_id: AssetId::new(7),
            holder_id: UserId::new(uuid::Uuid::nil()),
            purpose: "site survey".to_owned(),
            allocation_date: date(2026, 2, 1),
            expected_return_date: expected,
            actual_return_date: None,
            status,
            return_condition: None,
            reusability_percentage: None,
            allocated_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_view_carries_both_statuses() {
        let view = allocation(AllocationStatus::Active, Some(date(2026, 2, 10)))
            .into_view(date(2026, 3, 1));
        assert_eq!(view.allocation.status, AllocationStatus::Active);
        assert_eq!(view.effective_status, AllocationStatus::Overdue);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["effective_status"], "overdue");
    }

    #[test]
    fn test_legacy_overdue_row_is_open() {
        assert!(allocation(AllocationStatus::Overdue, None).is_open());
        assert!(!allocation(AllocationStatus::Returned, None).is_open());
    }
}
