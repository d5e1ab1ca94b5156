//! Domain Ports - Boundaries to the array and the local host
//!
//! The inventory, provisioning and snapshot code only talks to the outside
//! world through these traits. The REST adapter in [`crate::client`] is the
//! production implementation; tests plug in fixture-backed fakes.

use crate::domain::model::CompositeId;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Endpoints
// =============================================================================

/// Management API endpoints used by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Accounts,
    StoragePools,
    Namespaces,
    NamespaceSnapshots,
    Dtrees,
    FileSnapshots,
    Quota,
    ObjectSupport,
    BucketExists,
}

impl Endpoint {
    /// Path relative to the array's base URL
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Accounts => "api/v2/account/accounts",
            Endpoint::StoragePools => "api/v2/data_service/storagepool",
            Endpoint::Namespaces => "api/v2/converged_service/namespaces",
            Endpoint::NamespaceSnapshots => "api/v2/converged_service/snapshots",
            Endpoint::Dtrees => "api/v2/file_service/dtrees",
            Endpoint::FileSnapshots => "api/v2/file_service/snapshots",
            Endpoint::Quota => "api/v2/file_service/fs_quota",
            Endpoint::ObjectSupport => "dfv/service/obsOSC/supportAPI",
            Endpoint::BucketExists => "dfv/service/obsOSC/bucket_exists",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

// =============================================================================
// Query Parameters
// =============================================================================

/// Ordered query-string parameters for GET and DELETE calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(Vec<(String, String)>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain `key=value` parameter
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.push((key.into(), value.to_string()));
        self
    }

    /// Add the array's JSON filter parameter: `filter=[{...}]`
    pub fn filter(self, condition: Value) -> Self {
        let encoded = Value::Array(vec![condition]).to_string();
        self.param("filter", encoded)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The single condition object of a `filter` parameter, if any
    pub fn filter_condition(&self) -> Option<Value> {
        let raw = self.get("filter")?;
        match serde_json::from_str::<Value>(raw).ok()? {
            Value::Array(mut conditions) if !conditions.is_empty() => Some(conditions.remove(0)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// =============================================================================
// Replies
// =============================================================================

/// `(status, payload)` pair returned by every management call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    /// 0 on success
    pub status: i64,
    pub description: String,
    /// Full response body
    pub payload: Value,
}

impl ApiReply {
    pub fn ok(payload: Value) -> Self {
        Self {
            status: 0,
            description: String::new(),
            payload,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }

    /// Escalate a non-zero status as [`Error::Remote`]
    pub fn ensure_success(self, endpoint: Endpoint) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Remote {
                endpoint: endpoint.to_string(),
                status: self.status,
                description: self.description,
            })
        }
    }

    /// The `data` member of the payload, `null` when absent
    pub fn data(&self) -> &Value {
        self.payload.get("data").unwrap_or(&Value::Null)
    }

    /// Decode a named member of the payload
    pub fn decode<T: DeserializeOwned>(&self, endpoint: Endpoint, member: &str) -> Result<T> {
        let value = self.payload.get(member).cloned().ok_or_else(|| Error::InvalidPayload {
            endpoint: endpoint.to_string(),
            reason: format!("missing member '{}'", member),
        })?;
        serde_json::from_value(value).map_err(|e| Error::InvalidPayload {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn decode_data<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T> {
        self.decode(endpoint, "data")
    }
}

// =============================================================================
// Array API Port
// =============================================================================

/// Port for the array's management API
///
/// Implementations own the transport: session handling, timeouts and
/// retries. A non-zero `status` is returned as data, not as an error, so the
/// caller decides how to escalate it.
#[async_trait]
pub trait ArrayApi: Send + Sync {
    async fn get(&self, endpoint: Endpoint, query: Query) -> Result<ApiReply>;

    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<ApiReply>;

    async fn delete(&self, endpoint: Endpoint, query: Query) -> Result<ApiReply>;
}

// =============================================================================
// Quota Port
// =============================================================================

/// Soft and hard limits for blocks and inodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    pub block_soft: u64,
    pub block_hard: u64,
    pub inode_soft: u64,
    pub inode_hard: u64,
}

/// Port for the quota primitives of the array
///
/// Quotas hang off a dtree, addressed by its composite id as the array
/// reported it on creation.
#[async_trait]
pub trait QuotaManager: Send + Sync {
    /// Directory quota on the dtree itself
    async fn set_fileset_quota(&self, dtree: &CompositeId, limits: QuotaLimits) -> Result<()>;

    /// Per-user quota inside `dtree`; `who` is a user name or `"*"` for everyone
    async fn set_user_quota(
        &self,
        who: &str,
        dtree: &CompositeId,
        limits: QuotaLimits,
    ) -> Result<()>;

    /// Grace period for user quotas inside `dtree`
    async fn set_user_grace(&self, dtree: &CompositeId, grace: Duration, who: &str)
        -> Result<()>;
}

// =============================================================================
// Local Path Port
// =============================================================================

/// Where a local path lives on the array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPathInfo {
    pub filesystem_id: u64,
    /// 0 when no dtree sits at exactly this path
    pub dtree_id: u64,
    pub device_name: Option<String>,
    /// Parent directory relative to the filesystem root
    pub parent_dir: String,
}

impl LocalPathInfo {
    pub fn has_dtree(&self) -> bool {
        self.dtree_id != 0
    }
}

/// Port mapping mount-point paths to filesystem and dtree identifiers
#[async_trait]
pub trait LocalPathResolver: Send + Sync {
    async fn identify_local_path(&self, path: &str) -> Result<LocalPathInfo>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ArrayApiRef = Arc<dyn ArrayApi>;
pub type QuotaManagerRef = Arc<dyn QuotaManager>;
pub type LocalPathResolverRef = Arc<dyn LocalPathResolver>;
