//! Snapshot Manager
//!
//! Snapshots live behind two endpoint families with the same semantics:
//! converged namespaces (keyed by namespace id) and filesystems (keyed by
//! filesystem id, or by dtree id for a single fileset).
//!
//! Create and delete are idempotent. An unknown target is an error
//! ([`crate::Error::NotFound`]); a snapshot that is already in the desired
//! state is reported through the result enums below, without any remote
//! mutation.

pub mod manager;

use serde::{Deserialize, Serialize};

/// Outcome of a snapshot creation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotCreation {
    /// The array was asked to create the snapshot
    Created,
    /// A snapshot with that name already existed; nothing was sent
    AlreadyPresent,
}

impl SnapshotCreation {
    /// Whether a remote mutation happened
    pub fn performed(&self) -> bool {
        matches!(self, SnapshotCreation::Created)
    }
}

impl From<SnapshotCreation> for bool {
    fn from(outcome: SnapshotCreation) -> Self {
        outcome.performed()
    }
}

impl std::fmt::Display for SnapshotCreation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotCreation::Created => write!(f, "created"),
            SnapshotCreation::AlreadyPresent => write!(f, "already present"),
        }
    }
}

/// Outcome of a snapshot deletion request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotDeletion {
    /// The array was asked to delete the snapshot
    Deleted,
    /// No snapshot with that name existed; nothing was sent
    AlreadyAbsent,
}

impl SnapshotDeletion {
    /// Whether a remote mutation happened
    pub fn performed(&self) -> bool {
        matches!(self, SnapshotDeletion::Deleted)
    }
}

impl From<SnapshotDeletion> for bool {
    fn from(outcome: SnapshotDeletion) -> Self {
        outcome.performed()
    }
}

impl std::fmt::Display for SnapshotDeletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotDeletion::Deleted => write!(f, "deleted"),
            SnapshotDeletion::AlreadyAbsent => write!(f, "already absent"),
        }
    }
}
