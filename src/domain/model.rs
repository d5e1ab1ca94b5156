//! Inventory records as returned by the array's management API

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Composite IDs
// =============================================================================

/// Two-part identifier used by the array for dtrees and snapshots
///
/// Rendered as `object@sequence`, e.g. `10@4097` for dtree 4097 of
/// filesystem 10, or `128849018880@34585` for a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompositeId {
    pub object: String,
    pub sequence: String,
}

impl CompositeId {
    pub fn new(object: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            sequence: sequence.into(),
        }
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.object, self.sequence)
    }
}

impl FromStr for CompositeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('@') {
            Some((object, sequence)) if !object.is_empty() && !sequence.is_empty() => {
                Ok(Self::new(object, sequence))
            }
            _ => Err(format!("malformed composite id: {:?}", s)),
        }
    }
}

impl TryFrom<String> for CompositeId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CompositeId> for String {
    fn from(id: CompositeId) -> Self {
        id.to_string()
    }
}

// =============================================================================
// Accounts and Pools
// =============================================================================

/// Tenant account on the array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub canonical_user_id: String,
    /// Unix seconds, as reported by the array
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub encrypt_option: String,
}

impl Account {
    pub const STATUS_ACTIVE: &'static str = "Active";

    pub fn is_active(&self) -> bool {
        self.status == Self::STATUS_ACTIVE
    }
}

/// Storage pool backing namespaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoragePool {
    #[serde(rename = "storagePoolId")]
    pub id: u64,
    #[serde(rename = "storagePoolName")]
    pub name: String,
}

// =============================================================================
// Namespaces, Filesets and Snapshots
// =============================================================================

/// Converged namespace: either a filesystem or an object bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: u64,
    pub name: String,
    pub storage_pool_id: u64,
    pub account_id: String,
}

/// Dtree inside a filesystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fileset {
    /// `filesystem_id@dtree_id`
    pub id: CompositeId,
    pub name: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub owner: String,
    /// Not part of the listing, filled in by a per-dtree lookup
    #[serde(default)]
    pub parent_dir: Option<String>,
}

/// Name under which a fileset is stored as a dtree
///
/// User filesets are addressed as `vsc<digits>` but the dtree carries only the
/// digits; every other name is used verbatim.
pub fn dtree_name(fileset: &str) -> &str {
    match fileset.strip_prefix("vsc") {
        Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => digits,
        _ => fileset,
    }
}

/// Snapshot record from either the namespace or the filesystem endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: CompositeId,
    pub name: String,
    #[serde(default)]
    pub namespace_id: Option<u64>,
    #[serde(default)]
    pub file_system_id: Option<u64>,
    #[serde(default)]
    pub dtree_id: Option<CompositeId>,
    #[serde(default)]
    pub dtree_name: Option<String>,
}
