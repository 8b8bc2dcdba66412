//! In-memory implementations of the storage traits and service clients.
//!
//! These do not need a database or network. The asset store keeps all state
//! behind one mutex, so conditional writes behave like the `PostgreSQL`
//! implementation: a lost compare-and-swap is a `Conflict`, and two racing
//! allocations of the same asset cannot both succeed.

mod accounts;
mod assets;
mod identity;
mod users;

pub use accounts::{AccountCall, RecordingAccountService};
pub use assets::InMemoryAssetStore;
pub use identity::StaticIdentityProvider;
pub use users::InMemoryUserDirectory;
