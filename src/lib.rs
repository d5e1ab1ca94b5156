//! OceanStor Inventory
//!
//! Inventory caching and provisioning layer over the management API of an
//! OceanStor converged storage array.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          OceanStorSession                            │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  ┌────────────────────┐  ┌──────────────────┐  ┌──────────────────┐  │
//! │  │  Inventory Cache   │  │     Fileset      │  │    Snapshot      │  │
//! │  │  + Resolver        │  │   Provisioner    │  │    Manager       │  │
//! │  └─────────┬──────────┘  └────────┬─────────┘  └────────┬─────────┘  │
//! │            └──────────────────────┼─────────────────────┘            │
//! ├───────────────────────────────────┼──────────────────────────────────┤
//! │        ArrayApi         QuotaManager        LocalPathResolver        │
//! │     (RestClient)       (RestClient)        (host-provided)           │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`inventory`]: Cached listings and name resolution
//! - [`provision`]: Fileset creation with default quotas
//! - [`snapshot`]: Idempotent namespace and filesystem snapshots
//! - [`client`]: REST transport for the array
//! - [`domain`]: Inventory records and port traits
//! - [`config`]: Session configuration
//! - [`error`]: Error types and handling

pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod inventory;
pub mod provision;
pub mod session;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use client::RestClient;

pub use config::{ApiConfig, QuotaDefaults, SessionConfig};

pub use domain::model::{
    dtree_name, Account, CompositeId, Fileset, Namespace, Snapshot, StoragePool,
};

pub use domain::ports::{
    ApiReply, ArrayApi, Endpoint, LocalPathInfo, LocalPathResolver, Query, QuotaLimits,
    QuotaManager,
};

pub use error::{Error, ErrorAction, Result};

pub use inventory::{AccountSelector, CacheCell, InventoryCache, TwoLevelIndex};

pub use provision::{FilesetKind, FilesetProvisioned};

pub use session::OceanStorSession;

pub use snapshot::{SnapshotCreation, SnapshotDeletion};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
