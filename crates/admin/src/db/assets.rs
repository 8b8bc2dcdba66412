//! Asset and allocation storage.
//!
//! Status changes are conditional writes: every update names the status it
//! expects to replace, and a row that no longer matches is reported as
//! [`RepositoryError::Conflict`]. Opening an allocation additionally relies on
//! the `asset_allocation_one_open_per_asset` partial unique index, so two
//! concurrent allocations of the same asset can never both commit.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use opsdesk_core::{
    AllocationId, AllocationStatus, AssetId, AssetStatus, AssetType, DepreciationMethod,
    ReturnCondition, UserId,
};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{
    Allocation, AllocationFilter, Asset, AssetFilter, AssetInput, NewAllocation, ReturnRecord,
};

/// Name of the partial unique index guarding open allocations.
pub const ONE_OPEN_ALLOCATION_INDEX: &str = "asset_allocation_one_open_per_asset";

/// Storage for assets and their allocations.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Insert an asset in `in_stock`. A duplicate asset code is a conflict.
    async fn create_asset(
        &self,
        input: &AssetInput,
        created_by: UserId,
    ) -> Result<Asset, RepositoryError>;

    /// Overwrite master data. Never touches status.
    async fn update_asset(&self, id: AssetId, input: &AssetInput)
    -> Result<Asset, RepositoryError>;

    async fn get_asset(&self, id: AssetId) -> Result<Option<Asset>, RepositoryError>;

    /// Assets matching `filter`, newest first.
    async fn list_assets(&self, filter: &AssetFilter) -> Result<Vec<Asset>, RepositoryError>;

    /// Move an asset from `expected` to `next`.
    ///
    /// Fails with `NotFound` if the asset does not exist and `Conflict` if its
    /// status is no longer `expected`.
    async fn transition_asset(
        &self,
        id: AssetId,
        expected: AssetStatus,
        next: AssetStatus,
    ) -> Result<Asset, RepositoryError>;

    /// Atomically move the asset from `expected` to `allocated` and insert an
    /// `active` allocation.
    async fn open_allocation(
        &self,
        new: &NewAllocation,
        expected: AssetStatus,
    ) -> Result<Allocation, RepositoryError>;

    /// Atomically mark an open allocation `returned` and move its asset from
    /// `allocated` to `asset_next`.
    async fn close_allocation(
        &self,
        id: AllocationId,
        record: &ReturnRecord,
        asset_next: AssetStatus,
    ) -> Result<Allocation, RepositoryError>;

    async fn get_allocation(&self, id: AllocationId)
    -> Result<Option<Allocation>, RepositoryError>;

    /// The open allocation of an asset, if any.
    async fn open_allocation_for_asset(
        &self,
        asset_id: AssetId,
    ) -> Result<Option<Allocation>, RepositoryError>;

    /// Allocations matching `filter`, newest allocation date first.
    /// `today` decides which open allocations count as overdue.
    async fn list_allocations(
        &self,
        filter: &AllocationFilter,
        today: NaiveDate,
    ) -> Result<Vec<Allocation>, RepositoryError>;
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AssetRow {
    id: i32,
    asset_code: String,
    sku: String,
    name: String,
    asset_type: AssetType,
    cost_center: Option<String>,
    cost_basis: Decimal,
    activation_date: Option<NaiveDate>,
    useful_life_months: Option<i32>,
    depreciation_method: DepreciationMethod,
    status: AssetStatus,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AssetRow> for Asset {
    fn from(row: AssetRow) -> Self {
        Self {
            id: AssetId::new(row.id),
            asset_code: row.asset_code,
            sku: row.sku,
            name: row.name,
            asset_type: row.asset_type,
            cost_center: row.cost_center,
            cost_basis: row.cost_basis,
            activation_date: row.activation_date,
            useful_life_months: row.useful_life_months,
            depreciation_method: row.depreciation_method,
            status: row.status,
            created_by: row.created_by.map(UserId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AllocationRow {
    id: i32,
    asset_id: i32,
    holder_id: Uuid,
    purpose: String,
    allocation_date: NaiveDate,
    expected_return_date: Option<NaiveDate>,
    actual_return_date: Option<NaiveDate>,
    status: AllocationStatus,
    return_condition: Option<ReturnCondition>,
    reusability_percentage: Option<i16>,
    allocated_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AllocationRow> for Allocation {
    type Error = RepositoryError;

    fn try_from(row: AllocationRow) -> Result<Self, Self::Error> {
        if let Some(pct) = row.reusability_percentage
            && !(0..=100).contains(&pct)
        {
            return Err(RepositoryError::DataCorruption(format!(
                "reusability percentage {pct} out of range for allocation {}",
                row.id
            )));
        }

        Ok(Self {
            id: AllocationId::new(row.id),
            asset_id: AssetId::new(row.asset_id),
            holder_id: UserId::new(row.holder_id),
            purpose: row.purpose,
            allocation_date: row.allocation_date,
            expected_return_date: row.expected_return_date,
            actual_return_date: row.actual_return_date,
            status: row.status,
            return_condition: row.return_condition,
            reusability_percentage: row.reusability_percentage,
            allocated_by: row.allocated_by.map(UserId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const ASSET_COLUMNS: &str = "id, asset_code, sku, name, asset_type, cost_center, cost_basis, \
    activation_date, useful_life_months, depreciation_method, status, created_by, \
    created_at, updated_at";

const ALLOCATION_COLUMNS: &str = "id, asset_id, holder_id, purpose, allocation_date, \
    expected_return_date, actual_return_date, status, return_condition, \
    reusability_percentage, allocated_by, created_at, updated_at";

/// Stored statuses that still hold the asset.
const OPEN_STATUSES: &str = "('active', 'overdue')";

// =============================================================================
// Repository
// =============================================================================

/// `PostgreSQL` implementation of [`AssetStore`].
#[derive(Clone)]
pub struct AssetRepository {
    pool: PgPool,
}

impl AssetRepository {
    /// Create a new asset repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Compare-and-swap on asset status inside an open connection or transaction.
async fn swap_asset_status(
    conn: &mut PgConnection,
    id: AssetId,
    expected: AssetStatus,
    next: AssetStatus,
) -> Result<Asset, RepositoryError> {
    let row = sqlx::query_as::<_, AssetRow>(&format!(
        r"
        UPDATE app.asset
        SET status = $3, updated_at = NOW()
        WHERE id = $1 AND status = $2
        RETURNING {ASSET_COLUMNS}
        "
    ))
    .bind(id)
    .bind(expected)
    .bind(next)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(row) = row {
        return Ok(row.into());
    }

    let current =
        sqlx::query_scalar::<_, AssetStatus>("SELECT status FROM app.asset WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    match current {
        None => Err(RepositoryError::NotFound),
        Some(current) => Err(RepositoryError::Conflict(format!(
            "asset {id} is {current}, expected {expected}"
        ))),
    }
}

#[async_trait]
impl AssetStore for AssetRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_asset(
        &self,
        input: &AssetInput,
        created_by: UserId,
    ) -> Result<Asset, RepositoryError> {
        let row = sqlx::query_as::<_, AssetRow>(&format!(
            r"
            INSERT INTO app.asset (
                asset_code, sku, name, asset_type, cost_center, cost_basis,
                activation_date, useful_life_months, depreciation_method, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ASSET_COLUMNS}
            "
        ))
        .bind(&input.asset_code)
        .bind(&input.sku)
        .bind(&input.name)
        .bind(input.asset_type)
        .bind(&input.cost_center)
        .bind(input.cost_basis)
        .bind(input.activation_date)
        .bind(input.useful_life_months)
        .bind(input.depreciation_method)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "asset code already exists"))?;

        Ok(row.into())
    }

    async fn update_asset(
        &self,
        id: AssetId,
        input: &AssetInput,
    ) -> Result<Asset, RepositoryError> {
        let row = sqlx::query_as::<_, AssetRow>(&format!(
            r"
            UPDATE app.asset
            SET asset_code = $2, sku = $3, name = $4, asset_type = $5,
                cost_center = $6, cost_basis = $7, activation_date = $8,
                useful_life_months = $9, depreciation_method = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ASSET_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.asset_code)
        .bind(&input.sku)
        .bind(&input.name)
        .bind(input.asset_type)
        .bind(&input.cost_center)
        .bind(input.cost_basis)
        .bind(input.activation_date)
        .bind(input.useful_life_months)
        .bind(input.depreciation_method)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "asset code already exists"))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn get_asset(&self, id: AssetId) -> Result<Option<Asset>, RepositoryError> {
        let row = sqlx::query_as::<_, AssetRow>(&format!(
            "SELECT {ASSET_COLUMNS} FROM app.asset WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_assets(&self, filter: &AssetFilter) -> Result<Vec<Asset>, RepositoryError> {
        let (limit, offset) = filter.page();
        let rows = sqlx::query_as::<_, AssetRow>(&format!(
            r"
            SELECT {ASSET_COLUMNS}
            FROM app.asset
            WHERE ($1::app.asset_status IS NULL OR status = $1)
              AND ($2::app.asset_type IS NULL OR asset_type = $2)
              AND ($3::text IS NULL
                   OR asset_code ILIKE $3 OR sku ILIKE $3 OR name ILIKE $3)
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "
        ))
        .bind(filter.status)
        .bind(filter.asset_type)
        .bind(filter.search_pattern())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn transition_asset(
        &self,
        id: AssetId,
        expected: AssetStatus,
        next: AssetStatus,
    ) -> Result<Asset, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        swap_asset_status(&mut conn, id, expected, next).await
    }

    async fn open_allocation(
        &self,
        new: &NewAllocation,
        expected: AssetStatus,
    ) -> Result<Allocation, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        swap_asset_status(&mut tx, new.asset_id, expected, AssetStatus::Allocated).await?;

        let row = sqlx::query_as::<_, AllocationRow>(&format!(
            r"
            INSERT INTO app.asset_allocation (
                asset_id, holder_id, purpose, allocation_date,
                expected_return_date, status, allocated_by
            )
            VALUES ($1, $2, $3, $4, $5, 'active', $6)
            RETURNING {ALLOCATION_COLUMNS}
            "
        ))
        .bind(new.asset_id)
        .bind(new.holder_id)
        .bind(&new.purpose)
        .bind(new.allocation_date)
        .bind(new.expected_return_date)
        .bind(new.allocated_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some(ONE_OPEN_ALLOCATION_INDEX)
            {
                return RepositoryError::Conflict(format!(
                    "asset {} already has an open allocation",
                    new.asset_id
                ));
            }
            RepositoryError::Database(e)
        })?;

        tx.commit().await?;
        row.try_into()
    }

    async fn close_allocation(
        &self,
        id: AllocationId,
        record: &ReturnRecord,
        asset_next: AssetStatus,
    ) -> Result<Allocation, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, AllocationRow>(&format!(
            r"
            UPDATE app.asset_allocation
            SET status = 'returned',
                actual_return_date = $2,
                return_condition = $3,
                reusability_percentage = $4,
                updated_at = NOW()
            WHERE id = $1 AND status IN {OPEN_STATUSES}
            RETURNING {ALLOCATION_COLUMNS}
            "
        ))
        .bind(id)
        .bind(record.actual_return_date)
        .bind(record.condition)
        .bind(record.reusability_percentage)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            let exists = sqlx::query_scalar::<_, i32>(
                "SELECT id FROM app.asset_allocation WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
            return Err(match exists {
                None => RepositoryError::NotFound,
                Some(_) => RepositoryError::Conflict(format!("allocation {id} is not open")),
            });
        };

        let allocation = Allocation::try_from(row)?;
        swap_asset_status(
            &mut tx,
            allocation.asset_id,
            AssetStatus::Allocated,
            asset_next,
        )
        .await?;

        tx.commit().await?;
        Ok(allocation)
    }

    async fn get_allocation(
        &self,
        id: AllocationId,
    ) -> Result<Option<Allocation>, RepositoryError> {
        let row = sqlx::query_as::<_, AllocationRow>(&format!(
            "SELECT {ALLOCATION_COLUMNS} FROM app.asset_allocation WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn open_allocation_for_asset(
        &self,
        asset_id: AssetId,
    ) -> Result<Option<Allocation>, RepositoryError> {
        let row = sqlx::query_as::<_, AllocationRow>(&format!(
            r"
            SELECT {ALLOCATION_COLUMNS}
            FROM app.asset_allocation
            WHERE asset_id = $1 AND status IN {OPEN_STATUSES}
            "
        ))
        .bind(asset_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_allocations(
        &self,
        filter: &AllocationFilter,
        today: NaiveDate,
    ) -> Result<Vec<Allocation>, RepositoryError> {
        let (limit, offset) = filter.page();
        let rows = sqlx::query_as::<_, AllocationRow>(&format!(
            r"
            SELECT {ALLOCATION_COLUMNS}
            FROM app.asset_allocation
            WHERE ($1::int IS NULL OR asset_id = $1)
              AND ($2::uuid IS NULL OR holder_id = $2)
              AND ($3::app.allocation_status IS NULL OR status = $3)
              AND (NOT $4 OR (status IN {OPEN_STATUSES} AND expected_return_date < $5))
            ORDER BY allocation_date DESC, id DESC
            LIMIT $6 OFFSET $7
            "
        ))
        .bind(filter.asset_id)
        .bind(filter.holder_id)
        .bind(filter.status)
        .bind(filter.overdue_only)
        .bind(today)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
