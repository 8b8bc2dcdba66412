//! Asset master data types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use opsdesk_core::{AssetId, AssetStatus, AssetType, DepreciationMethod, UserId};

use super::allocation::AllocationView;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: i64 = 50;
/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: i64 = 200;

/// A tracked asset (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Asset {
    pub id: AssetId,
    /// Human-facing asset code, unique across the register.
    pub asset_code: String,
    pub sku: String,
    pub name: String,
    pub asset_type: AssetType,
    pub cost_center: Option<String>,
    pub cost_basis: Decimal,
    pub activation_date: Option<NaiveDate>,
    pub useful_life_months: Option<i32>,
    pub depreciation_method: DepreciationMethod,
    /// Current lifecycle status. Only changed through the state machine.
    pub status: AssetStatus,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable master data, used for both create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetInput {
    pub asset_code: String,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub asset_type: AssetType,
    #[serde(default)]
    pub cost_center: Option<String>,
    #[serde(default)]
    pub cost_basis: Decimal,
    #[serde(default)]
    pub activation_date: Option<NaiveDate>,
    #[serde(default)]
    pub useful_life_months: Option<i32>,
    #[serde(default)]
    pub depreciation_method: DepreciationMethod,
}

impl AssetInput {
    /// Trim text fields and check required values.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn normalized(mut self) -> Result<Self, String> {
        self.asset_code = self.asset_code.trim().to_owned();
        self.sku = self.sku.trim().to_owned();
        self.name = self.name.trim().to_owned();
        self.cost_center = self
            .cost_center
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());

        if self.asset_code.is_empty() {
            return Err("asset_code is required".to_owned());
        }
        if self.sku.is_empty() {
            return Err("sku is required".to_owned());
        }
        if self.name.is_empty() {
            return Err("name is required".to_owned());
        }
        if self.cost_basis.is_sign_negative() {
            return Err("cost_basis must not be negative".to_owned());
        }
        if self.useful_life_months.is_some_and(|m| m <= 0) {
            return Err("useful_life_months must be positive".to_owned());
        }
        Ok(self)
    }
}

/// Filters for listing assets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetFilter {
    pub status: Option<AssetStatus>,
    pub asset_type: Option<AssetType>,
    /// Case-insensitive match against code, SKU or name.
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AssetFilter {
    /// Search text as a SQL `ILIKE` pattern, if any.
    #[must_use]
    pub fn search_pattern(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", escape_like(q)))
    }

    #[must_use]
    pub fn page(&self) -> (i64, i64) {
        page(self.limit, self.offset)
    }
}

/// Clamp caller-supplied paging to `(limit, offset)`.
#[must_use]
pub fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// An asset together with its open allocation.
#[derive(Debug, Clone, Serialize)]
pub struct AssetDetail {
    #[serde(flatten)]
    pub asset: Asset,
    pub open_allocation: Option<AllocationView>,
}
