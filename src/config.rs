//! Session configuration
//!
//! Loaded from YAML. The quota section feeds fileset provisioning; the API
//! section feeds the REST transport.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default quotas applied by `make_fileset`, in the units of the quota API
/// (KiB for blocks)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaDefaults {
    /// Hard block limit per user
    pub user_block: u64,
    /// Hard inode limit per user
    pub user_inode: u64,
    /// Hard block limit of a project fileset
    pub project_block: u64,
    /// Hard inode limit of a project fileset
    pub project_inode: u64,
}

impl Default for QuotaDefaults {
    fn default() -> Self {
        Self {
            user_block: 50 * 1024 * 1024,
            user_inode: 100_000,
            project_block: 1024 * 1024 * 1024,
            project_inode: 10_000_000,
        }
    }
}

/// Connection settings for the management API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://oceanstor.example.org:8088`
    pub url: String,
    /// Account the session operates in
    pub account: String,
    pub username: String,
    /// Pre-established session token
    pub token: Option<String>,
    pub timeout_secs: u64,
    /// Retries for transient transport failures
    pub max_retries: u32,
    pub verify_tls: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: "https://localhost:8088".to_string(),
            account: "system".to_string(),
            username: "admin".to_string(),
            token: None,
            timeout_secs: 30,
            max_retries: 3,
            verify_tls: true,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Everything a session needs besides its collaborators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub quota: QuotaDefaults,
}

impl SessionConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: SessionConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.url.is_empty() {
            return Err(Error::Configuration("api.url must not be empty".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(Error::Configuration("api.timeout_secs must be positive".into()));
        }
        let quota = &self.quota;
        if quota.user_block == 0 || quota.user_inode == 0 {
            return Err(Error::Configuration("user quotas must be positive".into()));
        }
        if quota.project_block == 0 || quota.project_inode == 0 {
            return Err(Error::Configuration("project quotas must be positive".into()));
        }
        Ok(())
    }
}
