//! Account and Namespace Resolver
//!
//! Resolves user-facing names to array ids and classifies namespaces as
//! filesystems or object buckets.

use crate::domain::model::{Account, Namespace};
use crate::domain::ports::{Endpoint, Query};
use crate::error::{Error, Result};
use crate::session::OceanStorSession;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Value of `supportAPI` that enables bucket classification
const OBJECT_SUPPORT_COMPATIBLE: &str = "COMPATIBLE";

// =============================================================================
// Account Selector
// =============================================================================

/// Which accounts an operation applies to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AccountSelector {
    /// Every active account
    #[default]
    All,
    /// The named accounts; unknown names are dropped during resolution
    Names(Vec<String>),
}

impl AccountSelector {
    /// `None`, `""` and `"all"` select every account, anything else one name
    pub fn parse(spec: Option<&str>) -> Self {
        match spec {
            None | Some("") | Some("all") => AccountSelector::All,
            Some(name) => AccountSelector::Names(vec![name.to_string()]),
        }
    }
}

impl From<&str> for AccountSelector {
    fn from(spec: &str) -> Self {
        Self::parse(Some(spec))
    }
}

impl From<Option<&str>> for AccountSelector {
    fn from(spec: Option<&str>) -> Self {
        Self::parse(spec)
    }
}

impl From<Vec<String>> for AccountSelector {
    fn from(names: Vec<String>) -> Self {
        if names.is_empty() {
            AccountSelector::All
        } else {
            AccountSelector::Names(names)
        }
    }
}

impl From<&[&str]> for AccountSelector {
    fn from(names: &[&str]) -> Self {
        names.iter().map(|n| n.to_string()).collect::<Vec<_>>().into()
    }
}

// =============================================================================
// Lookup Payloads
// =============================================================================

#[derive(Debug, Deserialize)]
struct ObjectSupport {
    #[serde(rename = "supportAPI", default)]
    support_api: String,
}

#[derive(Debug, Deserialize)]
struct BucketExists {
    #[serde(default)]
    bucket_exists: bool,
}

// =============================================================================
// Resolver
// =============================================================================

impl OceanStorSession {
    /// Active accounts as `(name, id)` pairs, in listing order
    ///
    /// Always queries the array.
    pub async fn list_active_accounts(&self) -> Result<Vec<(String, String)>> {
        let accounts = self.fetch_active_accounts().await?;
        Ok(accounts.into_iter().map(|a| (a.name, a.id)).collect())
    }

    /// Resolve an account selection to account ids
    ///
    /// Names that do not match an active account are dropped silently; callers
    /// needing strict validation compare the lengths themselves.
    pub async fn validate_accounts(&self, selector: &AccountSelector) -> Result<Vec<String>> {
        self.resolve_account_ids(selector, false).await
    }

    pub(crate) async fn resolve_account_ids(
        &self,
        selector: &AccountSelector,
        update: bool,
    ) -> Result<Vec<String>> {
        let accounts = self.list_accounts(update).await?;
        match selector {
            AccountSelector::All => Ok(accounts.values().map(|a| a.id.clone()).collect()),
            AccountSelector::Names(names) => Ok(names
                .iter()
                .filter_map(|name| match accounts.get(name) {
                    Some(account) => Some(account.id.clone()),
                    None => {
                        debug!("Dropping unknown account '{}'", name);
                        None
                    }
                })
                .collect()),
        }
    }

    pub(crate) async fn resolve_pool_id(&self, pool: &str) -> Result<u64> {
        self.list_storage_pools(false)
            .await?
            .get(pool)
            .map(|p| p.id)
            .ok_or_else(|| Error::not_found("Storage pool", pool))
    }

    /// Account record by name, straight from the array
    pub async fn get_account_info(&self, name: &str) -> Result<Account> {
        let query = Query::new().filter(json!({ "name": name }));
        let reply = self
            .api
            .get(Endpoint::Accounts, query)
            .await?
            .ensure_success(Endpoint::Accounts)?;
        let matches: Vec<Account> = reply.decode_data(Endpoint::Accounts)?;
        exactly_one(matches, "Account", name)
    }

    /// Namespace record by name, straight from the array
    pub async fn get_namespace_info(&self, name: &str) -> Result<Namespace> {
        let query = Query::new().filter(json!({ "name": name }));
        let reply = self
            .api
            .get(Endpoint::Namespaces, query)
            .await?
            .ensure_success(Endpoint::Namespaces)?;
        let matches: Vec<Namespace> = reply.decode_data(Endpoint::Namespaces)?;
        exactly_one(matches, "Namespace", name)
    }

    /// Namespace record by name, provided it is not an object bucket
    pub async fn get_filesystem_info(&self, name: &str) -> Result<Namespace> {
        let namespace = self.get_namespace_info(name).await?;
        if self.check_bucket(&namespace).await? {
            return Err(Error::not_found("Filesystem", name));
        }
        Ok(namespace)
    }

    /// Whether the named namespace is exposed as an object bucket
    pub async fn is_bucket(&self, namespace: &str) -> Result<bool> {
        let namespace = self.get_namespace_info(namespace).await?;
        self.check_bucket(&namespace).await
    }

    /// Whether the array's object service speaks the compatible API
    pub async fn object_storage_compatible(&self) -> Result<bool> {
        self.object_support
            .get_or_try_init(|| async {
                let reply = self
                    .api
                    .get(Endpoint::ObjectSupport, Query::new())
                    .await?
                    .ensure_success(Endpoint::ObjectSupport)?;
                let support: ObjectSupport = reply.decode_data(Endpoint::ObjectSupport)?;
                debug!("Object storage support: {}", support.support_api);
                Ok::<_, Error>(support.support_api == OBJECT_SUPPORT_COMPATIBLE)
            })
            .await
            .copied()
    }

    /// Bucket test for an already resolved namespace
    pub(crate) async fn check_bucket(&self, namespace: &Namespace) -> Result<bool> {
        if !self.object_storage_compatible().await? {
            return Ok(false);
        }
        let reply = self
            .api
            .post(Endpoint::BucketExists, json!({ "name": namespace.name }))
            .await?
            .ensure_success(Endpoint::BucketExists)?;
        let answer: BucketExists = reply.decode_data(Endpoint::BucketExists)?;
        Ok(answer.bucket_exists)
    }

    pub(crate) async fn fetch_active_accounts(&self) -> Result<Vec<Account>> {
        let reply = self
            .api
            .get(Endpoint::Accounts, Query::new())
            .await?
            .ensure_success(Endpoint::Accounts)?;
        let accounts: Vec<Account> = reply.decode_data(Endpoint::Accounts)?;
        Ok(accounts.into_iter().filter(Account::is_active).collect())
    }
}

/// The single record of a name-filtered query
fn exactly_one<T>(mut matches: Vec<T>, kind: &str, name: &str) -> Result<T> {
    if matches.len() == 1 {
        Ok(matches.remove(0))
    } else {
        debug!("{} lookup for '{}' matched {} records", kind, name, matches.len());
        Err(Error::not_found(kind, name))
    }
}
