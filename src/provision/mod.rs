//! Fileset Provisioner
//!
//! Creates dtrees for local paths and applies the default quota policy.

pub mod fileset;
pub mod quota;

use crate::domain::model::CompositeId;
use crate::domain::ports::QuotaLimits;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Role of a new fileset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilesetKind {
    /// Personal directory; gets the user quota only
    User,
    /// Project/VO root; gets a fileset quota on top of the user quota
    Project,
}

impl std::fmt::Display for FilesetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilesetKind::User => write!(f, "user"),
            FilesetKind::Project => write!(f, "project"),
        }
    }
}

impl std::str::FromStr for FilesetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(FilesetKind::User),
            "project" | "vo" => Ok(FilesetKind::Project),
            other => Err(format!("unknown fileset kind: {}", other)),
        }
    }
}

/// What `make_fileset` did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesetProvisioned {
    /// Local path of the new fileset
    pub path: String,
    /// Dtree name
    pub name: String,
    pub kind: FilesetKind,
    pub filesystem_id: u64,
    /// Composite id reported by the array; quotas are attached to it
    pub dtree_id: CompositeId,
    /// Quota set on the dtree, project filesets only
    pub fileset_quota: Option<QuotaLimits>,
    /// Quota set for `"*"`
    pub user_quota: QuotaLimits,
    pub user_grace: Duration,
}
