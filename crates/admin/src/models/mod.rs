//! Domain models for the dashboard service.

pub mod allocation;
pub mod asset;
pub mod user;

pub use allocation::{
    AllocateRequest, Allocation, AllocationFilter, AllocationView, NewAllocation, ReturnRecord,
    ReturnRequest,
};
pub use asset::{Asset, AssetDetail, AssetFilter, AssetInput};
pub use user::{
    ChangeRoleRequest, CreateUserRequest, CurrentUser, Identity, NavItem, ResetPasswordRequest,
    UpsertProfile, UserProfile,
};
