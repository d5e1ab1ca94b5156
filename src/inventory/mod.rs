//! Inventory Cache and Resolver
//!
//! Turns the array's flat listings into the indexes below and resolves
//! user-facing names (accounts, pools, namespaces, filesets) to array ids.
//!
//! ```text
//! accounts      name        -> Account
//! storage_pools name        -> StoragePool
//! namespaces    account id  -> namespace name -> Namespace
//! buckets       account id  -> namespace name -> Namespace   (object namespaces)
//! filesystems   namespace name              -> Namespace     (all other namespaces)
//! filesets      filesystem name -> dtree id -> Fileset
//! ```
//!
//! Caches are filled on first use and afterwards only change when a listing is
//! called with `update = true` or a cell is overwritten directly. Writes done
//! through this crate (snapshots, filesets) never invalidate them.

pub mod cache;
pub mod index;
pub mod resolver;

pub use index::{CacheCell, TwoLevelIndex};
pub use resolver::AccountSelector;

use crate::domain::model::{Account, Fileset, Namespace, StoragePool};
use indexmap::IndexMap;

/// Active accounts by name
pub type AccountIndex = IndexMap<String, Account>;
/// Storage pools by name
pub type PoolIndex = IndexMap<String, StoragePool>;
/// Namespaces (or buckets) by account id, then by name
pub type NamespaceIndex = TwoLevelIndex<Namespace>;
/// Non-bucket namespaces by name, across all accounts
pub type FilesystemIndex = IndexMap<String, Namespace>;
/// Dtrees by filesystem name, then by composite dtree id
pub type FilesetIndex = TwoLevelIndex<Fileset>;

/// Per-session cache set
#[derive(Debug, Default)]
pub struct InventoryCache {
    pub accounts: CacheCell<AccountIndex>,
    pub storage_pools: CacheCell<PoolIndex>,
    pub namespaces: CacheCell<NamespaceIndex>,
    pub buckets: CacheCell<NamespaceIndex>,
    pub filesystems: CacheCell<FilesystemIndex>,
    pub filesets: CacheCell<FilesetIndex>,
}

impl InventoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}
