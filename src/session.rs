//! Session object
//!
//! Owns the collaborators and the cache set. Inventory, provisioning and
//! snapshot operations are implemented on it in their own modules.

use crate::config::SessionConfig;
use crate::domain::ports::{ArrayApiRef, LocalPathResolverRef, QuotaManagerRef};
use crate::error::{Error, Result};
use crate::inventory::InventoryCache;
use tokio::sync::OnceCell;

/// One logical connection to an OceanStor array
pub struct OceanStorSession {
    pub(crate) api: ArrayApiRef,
    pub(crate) config: SessionConfig,
    pub(crate) quota: Option<QuotaManagerRef>,
    pub(crate) paths: Option<LocalPathResolverRef>,
    pub(crate) cache: InventoryCache,
    /// Outcome of the object-storage support check, asked once per session
    pub(crate) object_support: OnceCell<bool>,
}

impl OceanStorSession {
    /// Create a session with empty caches
    pub fn new(api: ArrayApiRef, config: SessionConfig) -> Self {
        Self {
            api,
            config,
            quota: None,
            paths: None,
            cache: InventoryCache::new(),
            object_support: OnceCell::new(),
        }
    }

    /// Attach the quota primitives used by `make_fileset`
    pub fn with_quota_manager(mut self, quota: QuotaManagerRef) -> Self {
        self.quota = Some(quota);
        self
    }

    /// Attach the local path resolver used by `make_fileset`
    pub fn with_path_resolver(mut self, paths: LocalPathResolverRef) -> Self {
        self.paths = Some(paths);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The cache set; cells may be overwritten directly
    pub fn cache(&self) -> &InventoryCache {
        &self.cache
    }

    pub(crate) fn quota_manager(&self) -> Result<&QuotaManagerRef> {
        self.quota
            .as_ref()
            .ok_or_else(|| Error::Configuration("no quota manager attached to session".into()))
    }

    pub(crate) fn path_resolver(&self) -> Result<&LocalPathResolverRef> {
        self.paths.as_ref().ok_or_else(|| {
            Error::Configuration("no local path resolver attached to session".into())
        })
    }
}

impl std::fmt::Debug for OceanStorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OceanStorSession")
            .field("url", &self.config.api.url)
            .field("account", &self.config.api.account)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
