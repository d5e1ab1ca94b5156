//! `make_fileset`
//!
//! Steps run strictly in order and stop at the first failure without undoing
//! earlier ones: dtree creation, fileset quota (projects only), user quota,
//! user grace period.

use super::quota::{project_limits, user_limits, USER_GRACE_PERIOD};
use super::{FilesetKind, FilesetProvisioned};
use crate::domain::model::CompositeId;
use crate::domain::ports::Endpoint;
use crate::error::{Error, Result};
use crate::session::OceanStorSession;
use serde_json::json;
use std::path::Path;
use tracing::{debug, info};

/// Quota subject covering every user
const ALL_USERS: &str = "*";

impl OceanStorSession {
    /// Create a fileset at `local_path` and apply the default quotas
    ///
    /// Fails with `AlreadyExists` when a dtree already occupies the path, in
    /// which case nothing is sent to the array.
    pub async fn make_fileset(
        &self,
        local_path: &str,
        kind: FilesetKind,
    ) -> Result<FilesetProvisioned> {
        let quota = self.quota_manager()?;
        let location = self.path_resolver()?.identify_local_path(local_path).await?;
        debug!("Local path {} resolved to {:?}", local_path, location);

        if location.has_dtree() {
            return Err(Error::AlreadyExists {
                kind: "Fileset".into(),
                name: local_path.to_string(),
            });
        }

        let name = Path::new(local_path)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Configuration(format!("no fileset name in path {}", local_path)))?
            .to_string();

        let mut body = json!({
            "file_system_id": location.filesystem_id,
            "name": name,
            "parent_dir": location.parent_dir,
        });
        if let Some(device) = &location.device_name {
            body["file_system_name"] = json!(device);
        }
        let reply = self
            .api
            .post(Endpoint::Dtrees, body)
            .await?
            .ensure_success(Endpoint::Dtrees)?;
        let dtree_id = reply
            .data()
            .get("id")
            .and_then(|id| id.as_str())
            .and_then(|id| id.parse::<CompositeId>().ok())
            .ok_or_else(|| Error::InvalidPayload {
                endpoint: Endpoint::Dtrees.to_string(),
                reason: format!("no dtree id for created fileset {}", name),
            })?;
        info!(
            "Created {} fileset {} ({}) in {} (filesystem {})",
            kind, name, dtree_id, location.parent_dir, location.filesystem_id
        );

        let defaults = &self.config.quota;
        let fileset_quota = match kind {
            FilesetKind::Project => {
                let limits = project_limits(defaults);
                quota.set_fileset_quota(&dtree_id, limits).await?;
                info!("Set fileset quota on {}: {:?}", local_path, limits);
                Some(limits)
            }
            FilesetKind::User => None,
        };

        let user_quota = user_limits(defaults);
        quota.set_user_quota(ALL_USERS, &dtree_id, user_quota).await?;
        info!("Set default user quota on {}: {:?}", local_path, user_quota);

        quota.set_user_grace(&dtree_id, USER_GRACE_PERIOD, ALL_USERS).await?;
        debug!("Set user grace on {} to {:?}", local_path, USER_GRACE_PERIOD);

        Ok(FilesetProvisioned {
            path: local_path.to_string(),
            name,
            kind,
            filesystem_id: location.filesystem_id,
            dtree_id,
            fileset_quota,
            user_quota,
            user_grace: USER_GRACE_PERIOD,
        })
    }
}
