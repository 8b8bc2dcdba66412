//! Asset register and allocation lifecycle.
//!
//! Every operation takes the acting user and checks the `inventory` section
//! before touching storage. Status changes are decided by
//! [`AssetStatus::apply`] and written with a conditional update against the
//! status that was read, so a concurrent change surfaces as
//! [`ServiceError::Conflict`] instead of being overwritten.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};

use opsdesk_core::{AllocationId, AssetAction, AssetId, AssetStatus, Section};

use super::ServiceError;
use super::access::require_section;
use crate::db::AssetStore;
use crate::models::{
    AllocateRequest, AllocationFilter, AllocationView, Asset, AssetDetail, AssetFilter,
    AssetInput, CurrentUser, NewAllocation, ReturnRecord, ReturnRequest,
};

/// Asset and allocation operations.
#[derive(Clone)]
pub struct AssetLifecycle {
    store: Arc<dyn AssetStore>,
    fixed_today: Option<NaiveDate>,
}

impl AssetLifecycle {
    #[must_use]
    pub fn new(store: Arc<dyn AssetStore>) -> Self {
        Self {
            store,
            fixed_today: None,
        }
    }

    /// Pin "today" for date defaults and overdue derivation.
    #[must_use]
    pub const fn with_today(mut self, today: NaiveDate) -> Self {
        self.fixed_today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.fixed_today
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    // =========================================================================
    // Master data
    // =========================================================================

    /// Register a new asset in `in_stock`.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `Validation`, or `Conflict` for a duplicate asset code.
    #[instrument(skip(self, actor, input), fields(user_id = %actor.id()))]
    pub async fn create_asset(
        &self,
        actor: &CurrentUser,
        input: AssetInput,
    ) -> Result<Asset, ServiceError> {
        require_section(actor, Section::Inventory)?;
        let input = input.normalized().map_err(ServiceError::Validation)?;

        let asset = self.store.create_asset(&input, actor.id()).await?;
        info!(asset_id = %asset.id, asset_code = %asset.asset_code, "Asset created");
        Ok(asset)
    }

    /// Edit master data. Status is left alone.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `Validation`, `NotFound`, or `Conflict` for a duplicate
    /// asset code.
    #[instrument(skip(self, actor, input), fields(user_id = %actor.id()))]
    pub async fn update_asset(
        &self,
        actor: &CurrentUser,
        id: AssetId,
        input: AssetInput,
    ) -> Result<Asset, ServiceError> {
        require_section(actor, Section::Inventory)?;
        let input = input.normalized().map_err(ServiceError::Validation)?;

        self.store
            .update_asset(id, &input)
            .await
            .map_err(|e| not_found_as(e, "asset"))
    }

    /// Fetch an asset with its open allocation.
    ///
    /// # Errors
    ///
    /// `Forbidden` or `NotFound`.
    pub async fn get_asset(
        &self,
        actor: &CurrentUser,
        id: AssetId,
    ) -> Result<AssetDetail, ServiceError> {
        require_section(actor, Section::Inventory)?;
        let asset = self
            .store
            .get_asset(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("asset".to_owned()))?;
        let today = self.today();
        let open_allocation = self
            .store
            .open_allocation_for_asset(id)
            .await?
            .map(|a| a.into_view(today));

        Ok(AssetDetail {
            asset,
            open_allocation,
        })
    }

    /// # Errors
    ///
    /// `Forbidden` or a storage failure.
    pub async fn list_assets(
        &self,
        actor: &CurrentUser,
        filter: &AssetFilter,
    ) -> Result<Vec<Asset>, ServiceError> {
        require_section(actor, Section::Inventory)?;
        Ok(self.store.list_assets(filter).await?)
    }

    /// Apply an operator action (activate, maintenance, restock, dispose).
    ///
    /// Allocation and return create or close allocation records and must go
    /// through [`Self::allocate`] and [`Self::return_asset`].
    ///
    /// # Errors
    ///
    /// `Forbidden`, `Validation` for allocate/return, `NotFound`,
    /// `InvalidState` if the state machine rejects the action, or `Conflict`
    /// if the status changed concurrently.
    #[instrument(skip(self, actor), fields(user_id = %actor.id(), action = action.name()))]
    pub async fn transition(
        &self,
        actor: &CurrentUser,
        id: AssetId,
        action: AssetAction,
    ) -> Result<Asset, ServiceError> {
        require_section(actor, Section::Inventory)?;
        if matches!(action, AssetAction::Allocate | AssetAction::Return(_)) {
            return Err(ServiceError::Validation(format!(
                "{} is recorded through allocations",
                action.name()
            )));
        }

        let asset = self
            .store
            .get_asset(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("asset".to_owned()))?;
        let next = asset.status.apply(action)?;

        let asset = self
            .store
            .transition_asset(id, asset.status, next)
            .await
            .map_err(|e| not_found_as(e, "asset"))?;
        info!(asset_id = %id, status = %asset.status, "Asset status changed");
        Ok(asset)
    }

    // =========================================================================
    // Allocations
    // =========================================================================

    /// Hand an asset to a holder.
    ///
    /// # Errors
    ///
    /// - `Forbidden` without the inventory section
    /// - `Validation` for an empty purpose or a return date before the
    ///   allocation date
    /// - `NotFound` if the asset does not exist
    /// - `Conflict` if the asset already has an open allocation, including one
    ///   opened concurrently
    /// - `InvalidState` if the asset's status does not allow allocation
    #[instrument(
        skip(self, actor, request),
        fields(user_id = %actor.id(), asset_id = %request.asset_id, holder_id = %request.holder_id)
    )]
    pub async fn allocate(
        &self,
        actor: &CurrentUser,
        request: AllocateRequest,
    ) -> Result<AllocationView, ServiceError> {
        require_section(actor, Section::Inventory)?;

        let purpose = request.purpose.trim().to_owned();
        if purpose.is_empty() {
            return Err(ServiceError::Validation("purpose is required".to_owned()));
        }
        let today = self.today();
        let allocation_date = request.allocation_date.unwrap_or(today);
        if let Some(expected) = request.expected_return_date
            && expected < allocation_date
        {
            return Err(ServiceError::Validation(
                "expected_return_date is before allocation_date".to_owned(),
            ));
        }

        let asset = self
            .store
            .get_asset(request.asset_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("asset".to_owned()))?;
        if let Some(open) = self.store.open_allocation_for_asset(asset.id).await? {
            return Err(ServiceError::Conflict(format!(
                "asset {} already has open allocation {}",
                asset.id, open.id
            )));
        }
        asset.status.apply(AssetAction::Allocate)?;

        let new = NewAllocation {
            asset_id: asset.id,
            holder_id: request.holder_id,
            purpose,
            allocation_date,
            expected_return_date: request.expected_return_date,
            allocated_by: actor.id(),
        };
        let allocation = self
            .store
            .open_allocation(&new, asset.status)
            .await
            .map_err(|e| not_found_as(e, "asset"))?;

        info!(allocation_id = %allocation.id, "Asset allocated");
        Ok(allocation.into_view(today))
    }

    /// Close an open allocation and move its asset on.
    ///
    /// Good or fair condition puts the asset back in stock; damaged or broken
    /// sends it to maintenance.
    ///
    /// # Errors
    ///
    /// - `Forbidden` without the inventory section
    /// - `Validation` for a percentage above 100 or a return date before the
    ///   allocation date
    /// - `NotFound` if the allocation does not exist
    /// - `InvalidState` if the allocation is not open
    /// - `Conflict` if the allocation or asset changed concurrently
    #[instrument(skip(self, actor, request), fields(user_id = %actor.id(), allocation_id = %id))]
    pub async fn return_asset(
        &self,
        actor: &CurrentUser,
        id: AllocationId,
        request: ReturnRequest,
    ) -> Result<AllocationView, ServiceError> {
        require_section(actor, Section::Inventory)?;
        if request.reusability_percentage > 100 {
            return Err(ServiceError::Validation(
                "reusability_percentage must be between 0 and 100".to_owned(),
            ));
        }

        let allocation = self
            .store
            .get_allocation(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("allocation".to_owned()))?;
        if !allocation.is_open() {
            return Err(ServiceError::InvalidState(format!(
                "allocation {id} is {}",
                allocation.status
            )));
        }

        let today = self.today();
        let actual_return_date = request.actual_return_date.unwrap_or(today);
        if actual_return_date < allocation.allocation_date {
            return Err(ServiceError::Validation(
                "actual_return_date is before allocation_date".to_owned(),
            ));
        }

        // The asset is not re-read; the store's conditional write checks it.
        let next = AssetStatus::Allocated.apply(AssetAction::Return(request.condition))?;
        let record = ReturnRecord {
            actual_return_date,
            condition: request.condition,
            reusability_percentage: i16::from(request.reusability_percentage),
        };
        let allocation = self
            .store
            .close_allocation(id, &record, next)
            .await
            .map_err(|e| not_found_as(e, "allocation"))?;

        info!(
            asset_id = %allocation.asset_id,
            condition = %request.condition,
            asset_status = %next,
            "Asset returned"
        );
        Ok(allocation.into_view(today))
    }

    /// # Errors
    ///
    /// `Forbidden` or a storage failure.
    pub async fn list_allocations(
        &self,
        actor: &CurrentUser,
        filter: &AllocationFilter,
    ) -> Result<Vec<AllocationView>, ServiceError> {
        require_section(actor, Section::Inventory)?;
        let today = self.today();
        let rows = self.store.list_allocations(filter, today).await?;
        Ok(rows.into_iter().map(|a| a.into_view(today)).collect())
    }
}

fn not_found_as(err: crate::db::RepositoryError, what: &str) -> ServiceError {
    match err {
        crate::db::RepositoryError::NotFound => ServiceError::NotFound(what.to_owned()),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use opsdesk_core::{
        AllocationStatus, AssetType, DepreciationMethod, ReturnCondition, Role, UserId,
    };

    use super::*;
    use crate::mocks::InMemoryAssetStore;
    use crate::models::{Allocation, Identity};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn actor(role: Role) -> CurrentUser {
        CurrentUser {
            identity: Identity {
                id: UserId::new(Uuid::new_v4()),
                email: None,
                full_name: None,
            },
            role,
        }
    }

    fn input(code: &str) -> AssetInput {
        AssetInput {
            asset_code: code.to_owned(),
            sku: "LAP-14".to_owned(),
            name: "Laptop 14\"".to_owned(),
            asset_type: AssetType::Equipment,
            cost_center: Some("IT".to_owned()),
            cost_basis: Decimal::new(2_450_000, 2),
            activation_date: None,
            useful_life_months: Some(36),
            depreciation_method: DepreciationMethod::StraightLine,
        }
    }

    fn allocate_request(asset_id: AssetId) -> AllocateRequest {
        AllocateRequest {
            asset_id,
            holder_id: UserId::new(Uuid::new_v4()),
            purpose: "Field audit".to_owned(),
            allocation_date: None,
            expected_return_date: Some(date(2026, 3, 20)),
        }
    }

    fn returning(condition: ReturnCondition) -> ReturnRequest {
        ReturnRequest {
            actual_return_date: None,
            condition,
            reusability_percentage: 80,
        }
    }

    async fn setup() -> (AssetLifecycle, InMemoryAssetStore, CurrentUser, Asset) {
        let store = InMemoryAssetStore::new();
        let service =
            AssetLifecycle::new(Arc::new(store.clone())).with_today(date(2026, 3, 10));
        let pm = actor(Role::ProjectManager);
        let asset = service.create_asset(&pm, input("EQ-0001")).await.unwrap();
        (service, store, pm, asset)
    }

    #[tokio::test]
    async fn test_create_asset_starts_in_stock() {
        let (_, _, _, asset) = setup().await;
        assert_eq!(asset.status, AssetStatus::InStock);
        assert_eq!(asset.asset_code, "EQ-0001");
    }

    #[tokio::test]
    async fn test_stale_status_write_is_conflict() {
        let (service, store, pm, asset) = setup().await;

        // Another operator activates the asset after our read
        service
            .transition(&pm, asset.id, AssetAction::Activate)
            .await
            .unwrap();

        let err = store
            .transition_asset(asset.id, AssetStatus::InStock, AssetStatus::UnderMaintenance)
            .await
            .unwrap_err();
        assert!(matches!(
            ServiceError::from(err),
            ServiceError::Conflict(_)
        ));
        let current = store.get_asset(asset.id).await.unwrap().unwrap();
        assert_eq!(current.status, AssetStatus::Active);
    }

    #[tokio::test]
    async fn test_update_to_existing_code_is_conflict() {
        let (service, store, pm, first) = setup().await;
        let second = service.create_asset(&pm, input("EQ-0002")).await.unwrap();

        let err = service
            .update_asset(&pm, second.id, input(&first.asset_code))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        let unchanged = store.get_asset(second.id).await.unwrap().unwrap();
        assert_eq!(unchanged.asset_code, "EQ-0002");
    }

    #[tokio::test]
    async fn test_duplicate_asset_code_is_conflict() {
        let (service, _, pm, _) = setup().await;
        let err = service
            .create_asset(&pm, input("EQ-0001"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_roles_without_inventory_are_forbidden() {
        let (service, _, _, asset) = setup().await;
        for role in [Role::HrAdmin, Role::User] {
            let err = service
                .allocate(&actor(role), allocate_request(asset.id))
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden { .. }));
        }
        let accountant = actor(Role::Accountant);
        assert!(service.get_asset(&accountant, asset.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_allocate_sets_active_and_allocated() {
        let (service, store, pm, asset) = setup().await;
        let view = service
            .allocate(&pm, allocate_request(asset.id))
            .await
            .unwrap();

        assert_eq!(view.allocation.status, AllocationStatus::Active);
        assert_eq!(view.effective_status, AllocationStatus::Active);
        assert_eq!(view.allocation.allocation_date, date(2026, 3, 10));
        assert_eq!(view.allocation.allocated_by, Some(pm.id()));

        let asset = store.get_asset(asset.id).await.unwrap().unwrap();
        assert_eq!(asset.status, AssetStatus::Allocated);
    }

    #[tokio::test]
    async fn test_second_allocation_is_conflict() {
        let (service, store, pm, asset) = setup().await;
        service
            .allocate(&pm, allocate_request(asset.id))
            .await
            .unwrap();
        let err = service
            .allocate(&pm, allocate_request(asset.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(store.open_allocation_count(asset.id).await, 1);
    }

    #[tokio::test]
    async fn test_allocate_missing_asset_is_not_found() {
        let (service, _, pm, _) = setup().await;
        let err = service
            .allocate(&pm, allocate_request(AssetId::new(999)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_allocate_under_maintenance_is_invalid_state() {
        let (service, _, pm, asset) = setup().await;
        service
            .transition(&pm, asset.id, AssetAction::SendToMaintenance)
            .await
            .unwrap();
        let err = service
            .allocate(&pm, allocate_request(asset.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_allocate_validates_input() {
        let (service, _, pm, asset) = setup().await;

        let mut blank = allocate_request(asset.id);
        blank.purpose = "   ".to_owned();
        assert!(matches!(
            service.allocate(&pm, blank).await.unwrap_err(),
            ServiceError::Validation(_)
        ));

        let mut backwards = allocate_request(asset.id);
        backwards.allocation_date = Some(date(2026, 3, 10));
        backwards.expected_return_date = Some(date(2026, 3, 9));
        assert!(matches!(
            service.allocate(&pm, backwards).await.unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_return_good_goes_back_to_stock() {
        let (service, store, pm, asset) = setup().await;
        let view = service
            .allocate(&pm, allocate_request(asset.id))
            .await
            .unwrap();

        let returned = service
            .return_asset(&pm, view.allocation.id, returning(ReturnCondition::Good))
            .await
            .unwrap();
        assert_eq!(returned.allocation.status, AllocationStatus::Returned);
        assert_eq!(returned.allocation.actual_return_date, Some(date(2026, 3, 10)));
        assert_eq!(returned.allocation.reusability_percentage, Some(80));

        let asset = store.get_asset(asset.id).await.unwrap().unwrap();
        assert_eq!(asset.status, AssetStatus::InStock);
        assert_eq!(store.open_allocation_count(asset.id).await, 0);
    }

    #[tokio::test]
    async fn test_return_damaged_goes_to_maintenance() {
        let (service, store, pm, asset) = setup().await;
        let view = service
            .allocate(&pm, allocate_request(asset.id))
            .await
            .unwrap();
        service
            .return_asset(&pm, view.allocation.id, returning(ReturnCondition::Damaged))
            .await
            .unwrap();

        let asset = store.get_asset(asset.id).await.unwrap().unwrap();
        assert_eq!(asset.status, AssetStatus::UnderMaintenance);
    }

    #[tokio::test]
    async fn test_return_twice_is_invalid_state() {
        let (service, _, pm, asset) = setup().await;
        let view = service
            .allocate(&pm, allocate_request(asset.id))
            .await
            .unwrap();
        service
            .return_asset(&pm, view.allocation.id, returning(ReturnCondition::Fair))
            .await
            .unwrap();
        let err = service
            .return_asset(&pm, view.allocation.id, returning(ReturnCondition::Fair))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_return_validates_percentage_and_date() {
        let (service, _, pm, asset) = setup().await;
        let view = service
            .allocate(&pm, allocate_request(asset.id))
            .await
            .unwrap();

        let mut too_high = returning(ReturnCondition::Good);
        too_high.reusability_percentage = 101;
        assert!(matches!(
            service
                .return_asset(&pm, view.allocation.id, too_high)
                .await
                .unwrap_err(),
            ServiceError::Validation(_)
        ));

        let mut early = returning(ReturnCondition::Good);
        early.actual_return_date = Some(date(2026, 3, 1));
        assert!(matches!(
            service
                .return_asset(&pm, view.allocation.id, early)
                .await
                .unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_transition_rejects_allocation_actions() {
        let (service, _, pm, asset) = setup().await;
        let err = service
            .transition(&pm, asset.id, AssetAction::Allocate)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_maintenance_cycle_and_disposal() {
        let (service, _, pm, asset) = setup().await;
        for action in [
            AssetAction::SendToMaintenance,
            AssetAction::MarkReady,
            AssetAction::Restock,
            AssetAction::Dispose,
        ] {
            service.transition(&pm, asset.id, action).await.unwrap();
        }
        let err = service
            .transition(&pm, asset.id, AssetAction::Activate)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_overdue_is_derived_on_read() {
        let (service, _, pm, asset) = setup().await;
        let mut request = allocate_request(asset.id);
        request.allocation_date = Some(date(2026, 2, 1));
        request.expected_return_date = Some(date(2026, 3, 1));
        service.allocate(&pm, request).await.unwrap();

        let detail = service.get_asset(&pm, asset.id).await.unwrap();
        let open = detail.open_allocation.unwrap();
        assert_eq!(open.allocation.status, AllocationStatus::Active);
        assert_eq!(open.effective_status, AllocationStatus::Overdue);

        let overdue = service
            .list_allocations(
                &pm,
                &AllocationFilter {
                    overdue_only: true,
                    ..AllocationFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(overdue.len(), 1);
    }

    #[tokio::test]
    async fn test_legacy_overdue_row_blocks_allocation_and_can_be_returned() {
        let (service, store, pm, asset) = setup().await;
        store
            .transition_asset(asset.id, AssetStatus::InStock, AssetStatus::Allocated)
            .await
            .unwrap();
        store
            .insert_allocation_raw(Allocation {
                id: AllocationId::new(41),
                asset_id: asset.id,
                holder_id: UserId::new(Uuid::new_v4()),
                purpose: "Imported".to_owned(),
                allocation_date: date(2025, 12, 1),
                expected_return_date: Some(date(2026, 1, 15)),
                actual_return_date: None,
                status: AllocationStatus::Overdue,
                return_condition: None,
                reusability_percentage: None,
                allocated_by: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await;

        let err = service
            .allocate(&pm, allocate_request(asset.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let returned = service
            .return_asset(&pm, AllocationId::new(41), returning(ReturnCondition::Good))
            .await
            .unwrap();
        assert_eq!(returned.allocation.status, AllocationStatus::Returned);
    }
}
