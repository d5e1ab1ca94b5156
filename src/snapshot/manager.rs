//! Namespace and filesystem snapshot operations

use super::{SnapshotCreation, SnapshotDeletion};
use crate::domain::model::{CompositeId, Snapshot};
use crate::domain::ports::{Endpoint, Query};
use crate::error::{Error, Result};
use crate::session::OceanStorSession;
use serde_json::{json, Value};
use tracing::{debug, info};

// =============================================================================
// Filesystem Snapshot Targets
// =============================================================================

/// What a filesystem-level snapshot hangs off
#[derive(Debug, Clone, PartialEq, Eq)]
enum FileSnapshotTarget {
    Filesystem { id: u64 },
    Dtree { id: CompositeId, name: String },
}

impl FileSnapshotTarget {
    fn list_query(&self) -> Query {
        match self {
            FileSnapshotTarget::Filesystem { id } => {
                Query::new().filter(json!({ "file_system_id": id }))
            }
            FileSnapshotTarget::Dtree { id, .. } => {
                Query::new().filter(json!({ "dtree_id": id.to_string() }))
            }
        }
    }

    fn create_body(&self, snapshot_name: &str) -> Value {
        match self {
            FileSnapshotTarget::Filesystem { id } => json!({
                "file_system_id": id,
                "name": snapshot_name,
            }),
            FileSnapshotTarget::Dtree { id, .. } => json!({
                "dtree_id": id.to_string(),
                "name": snapshot_name,
            }),
        }
    }

    /// Name as stored on the array; dtree snapshots carry the dtree name as prefix
    fn qualified_name(&self, name: &str) -> String {
        match self {
            FileSnapshotTarget::Filesystem { .. } => name.to_string(),
            FileSnapshotTarget::Dtree { name: dtree, .. } => format!("{}_{}", dtree, name),
        }
    }
}

impl std::fmt::Display for FileSnapshotTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileSnapshotTarget::Filesystem { id } => write!(f, "filesystem {}", id),
            FileSnapshotTarget::Dtree { id, name } => write!(f, "dtree {} ({})", name, id),
        }
    }
}

impl OceanStorSession {
    // =========================================================================
    // Namespace Level
    // =========================================================================

    /// Snapshot names of a namespace, in listing order
    pub async fn list_namespace_snapshots(&self, namespace: &str) -> Result<Vec<String>> {
        let namespace = self.get_namespace_info(namespace).await?;
        let snapshots = self.namespace_snapshots(namespace.id).await?;
        Ok(snapshots.into_iter().map(|s| s.name).collect())
    }

    /// Create a namespace snapshot unless one with that name exists
    pub async fn create_namespace_snapshot(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SnapshotCreation> {
        let target = self.get_namespace_info(namespace).await?;
        let existing = self.namespace_snapshots(target.id).await?;
        if existing.iter().any(|s| s.name == name) {
            info!("Snapshot {} already exists in namespace {}", name, namespace);
            return Ok(SnapshotCreation::AlreadyPresent);
        }

        let body = json!({ "namespace_id": target.id, "name": name });
        self.api
            .post(Endpoint::NamespaceSnapshots, body)
            .await?
            .ensure_success(Endpoint::NamespaceSnapshots)?;

        info!("Created snapshot {} of namespace {}", name, namespace);
        Ok(SnapshotCreation::Created)
    }

    /// Delete a namespace snapshot if it exists
    pub async fn delete_namespace_snapshot(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SnapshotDeletion> {
        let target = self.get_namespace_info(namespace).await?;
        let existing = self.namespace_snapshots(target.id).await?;
        let Some(snapshot) = existing.into_iter().find(|s| s.name == name) else {
            info!("Snapshot {} not found in namespace {}", name, namespace);
            return Ok(SnapshotDeletion::AlreadyAbsent);
        };

        self.api
            .delete(Endpoint::NamespaceSnapshots, Query::new().param("id", &snapshot.id))
            .await?
            .ensure_success(Endpoint::NamespaceSnapshots)?;

        info!("Deleted snapshot {} ({}) of namespace {}", name, snapshot.id, namespace);
        Ok(SnapshotDeletion::Deleted)
    }

    async fn namespace_snapshots(&self, namespace_id: u64) -> Result<Vec<Snapshot>> {
        let query = Query::new().filter(json!({ "namespace_id": namespace_id }));
        let reply = self
            .api
            .get(Endpoint::NamespaceSnapshots, query)
            .await?
            .ensure_success(Endpoint::NamespaceSnapshots)?;
        reply.decode_data(Endpoint::NamespaceSnapshots)
    }

    // =========================================================================
    // Filesystem / Fileset Level
    // =========================================================================

    /// Snapshot names of a filesystem, or of one of its filesets
    pub async fn list_filesystem_snapshots(
        &self,
        filesystem: &str,
        fileset: Option<&str>,
    ) -> Result<Vec<String>> {
        let target = self.resolve_snapshot_target(filesystem, fileset).await?;
        let snapshots = self.file_snapshots(&target).await?;
        Ok(snapshots.into_iter().map(|s| s.name).collect())
    }

    /// Create a snapshot of a filesystem, or of each listed fileset
    ///
    /// With filesets, every target is resolved before anything is created and
    /// the snapshot is named `<dtree>_<name>` per fileset. The result is
    /// `Created` when at least one snapshot was created.
    pub async fn create_filesystem_snapshot(
        &self,
        filesystem: &str,
        name: &str,
        filesets: &[&str],
    ) -> Result<SnapshotCreation> {
        let targets = if filesets.is_empty() {
            vec![self.resolve_snapshot_target(filesystem, None).await?]
        } else {
            self.get_filesystem_info(filesystem).await?;
            let mut targets = Vec::with_capacity(filesets.len());
            for fileset in filesets {
                targets.push(self.resolve_dtree_target(filesystem, fileset).await?);
            }
            targets
        };

        let mut outcome = SnapshotCreation::AlreadyPresent;
        for target in &targets {
            let snapshot_name = target.qualified_name(name);
            let existing = self.file_snapshots(target).await?;
            if existing.iter().any(|s| s.name == snapshot_name) {
                info!("Snapshot {} already exists on {}", snapshot_name, target);
                continue;
            }

            self.api
                .post(Endpoint::FileSnapshots, target.create_body(&snapshot_name))
                .await?
                .ensure_success(Endpoint::FileSnapshots)?;
            info!("Created snapshot {} on {}", snapshot_name, target);
            outcome = SnapshotCreation::Created;
        }
        Ok(outcome)
    }

    /// Delete a snapshot of a filesystem, or of one of its filesets
    pub async fn delete_filesystem_snapshot(
        &self,
        filesystem: &str,
        name: &str,
        fileset: Option<&str>,
    ) -> Result<SnapshotDeletion> {
        let target = self.resolve_snapshot_target(filesystem, fileset).await?;
        let snapshot_name = target.qualified_name(name);
        let existing = self.file_snapshots(&target).await?;
        let Some(snapshot) = existing.into_iter().find(|s| s.name == snapshot_name) else {
            info!("Snapshot {} not found on {}", snapshot_name, target);
            return Ok(SnapshotDeletion::AlreadyAbsent);
        };

        self.api
            .delete(Endpoint::FileSnapshots, Query::new().param("id", &snapshot.id))
            .await?
            .ensure_success(Endpoint::FileSnapshots)?;

        info!("Deleted snapshot {} ({}) on {}", snapshot_name, snapshot.id, target);
        Ok(SnapshotDeletion::Deleted)
    }

    async fn resolve_snapshot_target(
        &self,
        filesystem: &str,
        fileset: Option<&str>,
    ) -> Result<FileSnapshotTarget> {
        let fs = self.get_filesystem_info(filesystem).await?;
        match fileset {
            None => Ok(FileSnapshotTarget::Filesystem { id: fs.id }),
            Some(fileset) => self.resolve_dtree_target(filesystem, fileset).await,
        }
    }

    /// Dtree target inside an already resolved filesystem
    async fn resolve_dtree_target(
        &self,
        filesystem: &str,
        fileset: &str,
    ) -> Result<FileSnapshotTarget> {
        let dtree = self
            .find_dtree(filesystem, fileset)
            .await?
            .ok_or_else(|| Error::not_found("Fileset", format!("{}/{}", filesystem, fileset)))?;
        debug!("Fileset {} resolved to dtree {}", fileset, dtree.id);
        Ok(FileSnapshotTarget::Dtree {
            id: dtree.id,
            name: dtree.name,
        })
    }

    async fn file_snapshots(&self, target: &FileSnapshotTarget) -> Result<Vec<Snapshot>> {
        let reply = self
            .api
            .get(Endpoint::FileSnapshots, target.list_query())
            .await?
            .ensure_success(Endpoint::FileSnapshots)?;
        reply.decode_data(Endpoint::FileSnapshots)
    }
}
