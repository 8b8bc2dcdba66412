//! In-memory [`AssetStore`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;

use opsdesk_core::{AllocationId, AllocationStatus, AssetId, AssetStatus, UserId};

use crate::db::{AssetStore, RepositoryError};
use crate::models::{
    Allocation, AllocationFilter, Asset, AssetFilter, AssetInput, NewAllocation, ReturnRecord,
};

#[derive(Default)]
struct State {
    assets: BTreeMap<AssetId, Asset>,
    allocations: BTreeMap<AllocationId, Allocation>,
    next_asset_id: i32,
    next_allocation_id: i32,
}

impl State {
    fn swap_status(
        &mut self,
        id: AssetId,
        expected: AssetStatus,
        next: AssetStatus,
    ) -> Result<Asset, RepositoryError> {
        let asset = self.assets.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if asset.status != expected {
            return Err(RepositoryError::Conflict(format!(
                "asset {id} is {}, expected {expected}",
                asset.status
            )));
        }
        asset.status = next;
        asset.updated_at = Utc::now();
        Ok(asset.clone())
    }

    fn has_open_allocation(&self, asset_id: AssetId) -> bool {
        self.allocations
            .values()
            .any(|a| a.asset_id == asset_id && a.is_open())
    }
}

/// Asset store backed by ordered maps behind a single mutex.
#[derive(Clone, Default)]
pub struct InMemoryAssetStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryAssetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an allocation row as-is, bypassing all checks.
    ///
    /// Lets tests reproduce legacy data such as a stored `overdue` status.
    pub async fn insert_allocation_raw(&self, allocation: Allocation) {
        let mut state = self.state.lock().await;
        state.next_allocation_id = state.next_allocation_id.max(allocation.id.as_i32());
        state.allocations.insert(allocation.id, allocation);
    }

    /// Number of open allocations for an asset.
    pub async fn open_allocation_count(&self, asset_id: AssetId) -> usize {
        let state = self.state.lock().await;
        state
            .allocations
            .values()
            .filter(|a| a.asset_id == asset_id && a.is_open())
            .count()
    }
}

fn matches_search(asset: &Asset, q: &str) -> bool {
    let q = q.to_lowercase();
    [&asset.asset_code, &asset.sku, &asset.name]
        .into_iter()
        .any(|field| field.to_lowercase().contains(&q))
}

#[async_trait]
impl AssetStore for InMemoryAssetStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn create_asset(
        &self,
        input: &AssetInput,
        created_by: UserId,
    ) -> Result<Asset, RepositoryError> {
        let mut state = self.state.lock().await;
        if state
            .assets
            .values()
            .any(|a| a.asset_code == input.asset_code)
        {
            return Err(RepositoryError::Conflict(
                "asset code already exists".to_owned(),
            ));
        }

        state.next_asset_id += 1;
        let now = Utc::now();
        let asset = Asset {
            id: AssetId::new(state.next_asset_id),
            asset_code: input.asset_code.clone(),
            sku: input.sku.clone(),
            name: input.name.clone(),
            asset_type: input.asset_type,
            cost_center: input.cost_center.clone(),
            cost_basis: input.cost_basis,
            activation_date: input.activation_date,
            useful_life_months: input.useful_life_months,
            depreciation_method: input.depreciation_method,
            status: AssetStatus::InStock,
            created_by: Some(created_by),
            created_at: now,
            updated_at: now,
        };
        state.assets.insert(asset.id, asset.clone());
        Ok(asset)
    }

    async fn update_asset(
        &self,
        id: AssetId,
        input: &AssetInput,
    ) -> Result<Asset, RepositoryError> {
        let mut state = self.state.lock().await;
        if state
            .assets
            .values()
            .any(|a| a.id != id && a.asset_code == input.asset_code)
        {
            return Err(RepositoryError::Conflict(
                "asset code already exists".to_owned(),
            ));
        }

        let asset = state.assets.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        asset.asset_code.clone_from(&input.asset_code);
        asset.sku.clone_from(&input.sku);
        asset.name.clone_from(&input.name);
        asset.asset_type = input.asset_type;
        asset.cost_center.clone_from(&input.cost_center);
        asset.cost_basis = input.cost_basis;
        asset.activation_date = input.activation_date;
        asset.useful_life_months = input.useful_life_months;
        asset.depreciation_method = input.depreciation_method;
        asset.updated_at = Utc::now();
        Ok(asset.clone())
    }

    async fn get_asset(&self, id: AssetId) -> Result<Option<Asset>, RepositoryError> {
        Ok(self.state.lock().await.assets.get(&id).cloned())
    }

    async fn list_assets(&self, filter: &AssetFilter) -> Result<Vec<Asset>, RepositoryError> {
        let (limit, offset) = filter.page();
        let q = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
        let state = self.state.lock().await;

        Ok(state
            .assets
            .values()
            .rev()
            .filter(|a| filter.status.is_none_or(|s| a.status == s))
            .filter(|a| filter.asset_type.is_none_or(|t| a.asset_type == t))
            .filter(|a| q.is_none_or(|q| matches_search(a, q)))
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn transition_asset(
        &self,
        id: AssetId,
        expected: AssetStatus,
        next: AssetStatus,
    ) -> Result<Asset, RepositoryError> {
        self.state.lock().await.swap_status(id, expected, next)
    }

    async fn open_allocation(
        &self,
        new: &NewAllocation,
        expected: AssetStatus,
    ) -> Result<Allocation, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.has_open_allocation(new.asset_id) {
            return Err(RepositoryError::Conflict(format!(
                "asset {} already has an open allocation",
                new.asset_id
            )));
        }
        state.swap_status(new.asset_id, expected, AssetStatus::Allocated)?;

        state.next_allocation_id += 1;
        let now = Utc::now();
        let allocation = Allocation {
            id: AllocationId::new(state.next_allocation_id),
            asset_id: new.asset_id,
            holder_id: new.holder_id,
            purpose: new.purpose.clone(),
            allocation_date: new.allocation_date,
            expected_return_date: new.expected_return_date,
            actual_return_date: None,
            status: AllocationStatus::Active,
            return_condition: None,
            reusability_percentage: None,
            allocated_by: Some(new.allocated_by),
            created_at: now,
            updated_at: now,
        };
        state.allocations.insert(allocation.id, allocation.clone());
        Ok(allocation)
    }

    async fn close_allocation(
        &self,
        id: AllocationId,
        record: &ReturnRecord,
        asset_next: AssetStatus,
    ) -> Result<Allocation, RepositoryError> {
        let mut state = self.state.lock().await;
        let allocation = state
            .allocations
            .get(&id)
            .ok_or(RepositoryError::NotFound)?;
        if !allocation.is_open() {
            return Err(RepositoryError::Conflict(format!(
                "allocation {id} is not open"
            )));
        }
        let asset_id = allocation.asset_id;

        // Asset first so a failed swap leaves the allocation untouched.
        state.swap_status(asset_id, AssetStatus::Allocated, asset_next)?;

        let allocation = state
            .allocations
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        allocation.status = AllocationStatus::Returned;
        allocation.actual_return_date = Some(record.actual_return_date);
        allocation.return_condition = Some(record.condition);
        allocation.reusability_percentage = Some(record.reusability_percentage);
        allocation.updated_at = Utc::now();
        Ok(allocation.clone())
    }

    async fn get_allocation(
        &self,
        id: AllocationId,
    ) -> Result<Option<Allocation>, RepositoryError> {
        Ok(self.state.lock().await.allocations.get(&id).cloned())
    }

    async fn open_allocation_for_asset(
        &self,
        asset_id: AssetId,
    ) -> Result<Option<Allocation>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .allocations
            .values()
            .find(|a| a.asset_id == asset_id && a.is_open())
            .cloned())
    }

    async fn list_allocations(
        &self,
        filter: &AllocationFilter,
        today: NaiveDate,
    ) -> Result<Vec<Allocation>, RepositoryError> {
        let (limit, offset) = filter.page();
        let state = self.state.lock().await;

        let mut rows: Vec<_> = state
            .allocations
            .values()
            .filter(|a| filter.asset_id.is_none_or(|id| a.asset_id == id))
            .filter(|a| filter.holder_id.is_none_or(|id| a.holder_id == id))
            .filter(|a| filter.status.is_none_or(|s| a.status == s))
            .filter(|a| !filter.overdue_only || a.effective_status(today) == AllocationStatus::Overdue)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.allocation_date
                .cmp(&a.allocation_date)
                .then(b.id.cmp(&a.id))
        });

        Ok(rows
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }
}
