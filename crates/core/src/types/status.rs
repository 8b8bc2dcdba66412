//! Status and classification enums for assets and allocations.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Implements `as_str`, `Display` and `FromStr` for a unit enum from a single
/// variant ↔ identifier table.
macro_rules! string_enum {
    ($name:ident, $err:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Stable identifier used on the wire and in storage.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", $err, ": {}"), s)),
                }
            }
        }
    };
}

/// Lifecycle status of a tracked asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "app.asset_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    /// In the warehouse, available.
    #[default]
    InStock,
    /// Commissioned into general use without a named holder.
    Active,
    /// Held by someone through an open allocation.
    Allocated,
    /// Out of service for repair.
    UnderMaintenance,
    /// Repaired and awaiting a new holder.
    ReadyForReallocation,
    /// Written off. Terminal.
    Disposed,
}

string_enum!(AssetStatus, "asset status", {
    InStock => "in_stock",
    Active => "active",
    Allocated => "allocated",
    UnderMaintenance => "under_maintenance",
    ReadyForReallocation => "ready_for_reallocation",
    Disposed => "disposed",
});

impl AssetStatus {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Disposed)
    }
}

/// Stored status of an allocation record.
///
/// Only `Active` and `Returned` are ever written. `Overdue` is derived at read
/// time (see [`crate::lifecycle::effective_allocation_status`]) and is accepted
/// on read so legacy rows that stored it remain usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "app.allocation_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    #[default]
    Active,
    Returned,
    Overdue,
}

string_enum!(AllocationStatus, "allocation status", {
    Active => "active",
    Returned => "returned",
    Overdue => "overdue",
});

impl AllocationStatus {
    /// An open allocation still holds its asset.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Active | Self::Overdue)
    }
}

/// Asset classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "app.asset_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    #[default]
    Equipment,
    Tools,
    Materials,
}

string_enum!(AssetType, "asset type", {
    Equipment => "equipment",
    Tools => "tools",
    Materials => "materials",
});

/// Accounting depreciation method recorded on the asset master data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "app.depreciation_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationMethod {
    #[default]
    StraightLine,
    DecliningBalance,
    UnitsOfProduction,
}

string_enum!(DepreciationMethod, "depreciation method", {
    StraightLine => "straight_line",
    DecliningBalance => "declining_balance",
    UnitsOfProduction => "units_of_production",
});

/// Condition of an asset as recorded when it is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "app.return_condition", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ReturnCondition {
    Good,
    Fair,
    Damaged,
    Broken,
}

string_enum!(ReturnCondition, "return condition", {
    Good => "good",
    Fair => "fair",
    Damaged => "damaged",
    Broken => "broken",
});

impl ReturnCondition {
    /// Whether the asset can go straight back to stock.
    #[must_use]
    pub const fn is_reusable(self) -> bool {
        matches!(self, Self::Good | Self::Fair)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_status_strings() {
        assert_eq!(AssetStatus::ReadyForReallocation.as_str(), "ready_for_reallocation");
        assert_eq!(
            "under_maintenance".parse::<AssetStatus>().unwrap(),
            AssetStatus::UnderMaintenance
        );
        assert_eq!(
            serde_json::to_string(&AssetStatus::InStock).unwrap(),
            "\"in_stock\""
        );
        assert!("lost".parse::<AssetStatus>().is_err());
    }

    #[test]
    fn test_default_asset_status_is_in_stock() {
        assert_eq!(AssetStatus::default(), AssetStatus::InStock);
        assert!(AssetStatus::Disposed.is_terminal());
        assert!(!AssetStatus::UnderMaintenance.is_terminal());
    }

    #[test]
    fn test_open_allocation_statuses() {
        assert!(AllocationStatus::Active.is_open());
        assert!(AllocationStatus::Overdue.is_open());
        assert!(!AllocationStatus::Returned.is_open());
    }

    #[test]
    fn test_return_condition_reusability() {
        assert!(ReturnCondition::Good.is_reusable());
        assert!(ReturnCondition::Fair.is_reusable());
        assert!(!ReturnCondition::Damaged.is_reusable());
        assert!(!ReturnCondition::Broken.is_reusable());
    }

    #[test]
    fn test_parse_error_message() {
        let err = "fuzzy".parse::<AssetType>().unwrap_err();
        assert_eq!(err, "invalid asset type: fuzzy");
    }
}
