//! Cached listings
//!
//! Every `list_*` call returns the current cache generation, refreshing it
//! first when `update` is set or when the cache has never been filled.
//! Filters are applied to the returned view, never to what is stored, so a
//! filtered call leaves the full generation in place for the next caller.

use super::index::{replace_pair, CacheCell};
use super::{
    AccountIndex, AccountSelector, FilesetIndex, FilesystemIndex, NamespaceIndex, PoolIndex,
};
use crate::domain::model::{dtree_name, Fileset, Namespace, StoragePool};
use crate::domain::ports::{Endpoint, Query};
use crate::error::{Error, Result};
use crate::session::OceanStorSession;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use tracing::{debug, info};

/// Store a freshly built generation
///
/// With `update` it replaces the current one; otherwise it only fills an
/// empty cell, so a generation put there in the meantime wins.
fn install<T: Clone>(cell: &CacheCell<T>, value: T, update: bool) -> T {
    if update {
        cell.replace(value.clone());
        value
    } else {
        cell.fill_if_empty(value)
    }
}

#[derive(Debug, Deserialize)]
struct DtreeDetail {
    #[serde(default)]
    parent_dir: Option<String>,
}

impl OceanStorSession {
    // =========================================================================
    // Accounts and Pools
    // =========================================================================

    /// Active accounts by name
    pub async fn list_accounts(&self, update: bool) -> Result<AccountIndex> {
        if let Some(cached) = self.cache.accounts.get().filter(|_| !update) {
            return Ok(cached);
        }

        let index: AccountIndex = self
            .fetch_active_accounts()
            .await?
            .into_iter()
            .map(|account| (account.name.clone(), account))
            .collect();

        info!("Refreshed account cache: {} active accounts", index.len());
        Ok(install(&self.cache.accounts, index, update))
    }

    /// Storage pools by name
    pub async fn list_storage_pools(&self, update: bool) -> Result<PoolIndex> {
        if let Some(cached) = self.cache.storage_pools.get().filter(|_| !update) {
            return Ok(cached);
        }

        let reply = self
            .api
            .get(Endpoint::StoragePools, Query::new())
            .await?
            .ensure_success(Endpoint::StoragePools)?;
        let pools: Vec<StoragePool> = reply.decode(Endpoint::StoragePools, "storagePools")?;
        let index: PoolIndex = pools.into_iter().map(|p| (p.name.clone(), p)).collect();

        info!("Refreshed storage pool cache: {} pools", index.len());
        Ok(install(&self.cache.storage_pools, index, update))
    }

    // =========================================================================
    // Namespaces
    // =========================================================================

    /// Namespaces by account id, then by name
    ///
    /// Every selected account has a partition, empty when it owns nothing.
    pub async fn list_namespaces(
        &self,
        accounts: &AccountSelector,
        pool: Option<&str>,
        update: bool,
    ) -> Result<NamespaceIndex> {
        let index = match self.cache.namespaces.get() {
            Some(cached) if !update => cached,
            _ => self.refresh_namespaces(update).await?,
        };
        self.account_pool_view(index, accounts, pool).await
    }

    async fn refresh_namespaces(&self, update: bool) -> Result<NamespaceIndex> {
        let account_ids = self.resolve_account_ids(&AccountSelector::All, update).await?;

        let reply = self
            .api
            .get(Endpoint::Namespaces, Query::new())
            .await?
            .ensure_success(Endpoint::Namespaces)?;
        let namespaces: Vec<Namespace> = reply.decode_data(Endpoint::Namespaces)?;

        let mut index = NamespaceIndex::with_partitions(account_ids);
        for namespace in namespaces {
            index.insert(namespace.account_id.clone(), namespace.name.clone(), namespace);
        }

        info!(
            "Refreshed namespace cache: {} namespaces in {} accounts",
            index.entry_count(),
            index.len()
        );
        Ok(install(&self.cache.namespaces, index, update))
    }

    /// Restrict an account-partitioned index to the selected accounts and pool
    async fn account_pool_view(
        &self,
        index: NamespaceIndex,
        accounts: &AccountSelector,
        pool: Option<&str>,
    ) -> Result<NamespaceIndex> {
        let view = match accounts {
            AccountSelector::All => index,
            selector => index.select(&self.resolve_account_ids(selector, false).await?),
        };
        match pool {
            Some(pool) => {
                let pool_id = self.resolve_pool_id(pool).await?;
                Ok(view.filter_records(|ns| ns.storage_pool_id == pool_id))
            }
            None => Ok(view),
        }
    }

    // =========================================================================
    // Buckets and Filesystems
    // =========================================================================

    /// Object buckets by account id, then by name
    pub async fn list_buckets(
        &self,
        accounts: &AccountSelector,
        pool: Option<&str>,
        update: bool,
    ) -> Result<NamespaceIndex> {
        let index = match self.cache.buckets.get() {
            Some(cached) if !update => cached,
            _ => self.refresh_classification(update).await?.0,
        };
        self.account_pool_view(index, accounts, pool).await
    }

    /// Filesystems (namespaces that are not buckets) by name
    ///
    /// `devices` restricts the view to those names; empty means all.
    pub async fn list_filesystems(
        &self,
        devices: &[&str],
        pool: Option<&str>,
        update: bool,
    ) -> Result<FilesystemIndex> {
        let index = match self.cache.filesystems.get() {
            Some(cached) if !update => cached,
            _ => self.refresh_classification(update).await?.1,
        };

        let pool_id = match pool {
            Some(pool) => Some(self.resolve_pool_id(pool).await?),
            None => None,
        };

        Ok(index
            .into_iter()
            .filter(|(name, _)| devices.is_empty() || devices.contains(&name.as_str()))
            .filter(|(_, fs)| pool_id.map_or(true, |id| fs.storage_pool_id == id))
            .collect())
    }

    /// Split the namespace cache into buckets and filesystems
    ///
    /// With `update` both caches are replaced together so they stay disjoint.
    /// Without it only an empty cache is filled; a generation already in
    /// place, including one overwritten by the caller, is kept.
    async fn refresh_classification(
        &self,
        update: bool,
    ) -> Result<(NamespaceIndex, FilesystemIndex)> {
        let namespaces = self
            .list_namespaces(&AccountSelector::All, None, update)
            .await?;

        let mut buckets = NamespaceIndex::with_partitions(namespaces.keys().cloned());
        let mut filesystems = FilesystemIndex::new();
        for (account_id, partition) in namespaces.iter() {
            for namespace in partition.values() {
                if self.check_bucket(namespace).await? {
                    buckets.insert(account_id.clone(), namespace.name.clone(), namespace.clone());
                } else {
                    filesystems.insert(namespace.name.clone(), namespace.clone());
                }
            }
        }

        info!(
            "Classified {} namespaces: {} buckets, {} filesystems",
            namespaces.entry_count(),
            buckets.entry_count(),
            filesystems.len()
        );
        if update {
            replace_pair(
                &self.cache.buckets,
                buckets.clone(),
                &self.cache.filesystems,
                filesystems.clone(),
            );
            return Ok((buckets, filesystems));
        }
        Ok((
            self.cache.buckets.fill_if_empty(buckets),
            self.cache.filesystems.fill_if_empty(filesystems),
        ))
    }

    // =========================================================================
    // Filesets
    // =========================================================================

    /// Dtrees by filesystem name, then by composite dtree id
    ///
    /// `devices` and `filesetnames` narrow the view (empty means all); every
    /// selected filesystem has a partition even when nothing matches.
    /// Fileset names of the form `vsc<digits>` match the dtree `<digits>`.
    pub async fn list_filesets(
        &self,
        devices: &[&str],
        filesetnames: &[&str],
        pool: Option<&str>,
        update: bool,
    ) -> Result<FilesetIndex> {
        let index = match self.cache.filesets.get() {
            Some(cached) if !update => cached,
            _ => self.refresh_filesets(update).await?,
        };

        let selected: Vec<String> = match (devices.is_empty(), pool) {
            (true, None) => index.keys().cloned().collect(),
            (true, Some(_)) => self.list_filesystems(&[], pool, false).await?.into_keys().collect(),
            (false, None) => devices.iter().map(|d| d.to_string()).collect(),
            (false, Some(_)) => {
                let in_pool = self.list_filesystems(devices, pool, false).await?;
                devices
                    .iter()
                    .filter(|d| in_pool.contains_key(**d))
                    .map(|d| d.to_string())
                    .collect()
            }
        };

        let view = index.select(&selected);
        if filesetnames.is_empty() {
            return Ok(view);
        }
        let wanted: HashSet<&str> = filesetnames.iter().map(|n| dtree_name(n)).collect();
        Ok(view.filter_records(|fileset| wanted.contains(fileset.name.as_str())))
    }

    async fn refresh_filesets(&self, update: bool) -> Result<FilesetIndex> {
        let filesystems = self.list_filesystems(&[], None, update).await?;

        let mut index = FilesetIndex::with_partitions(filesystems.keys().cloned());
        for name in filesystems.keys() {
            for fileset in self.fetch_dtrees(name).await? {
                index.insert(name.clone(), fileset.id.to_string(), fileset);
            }
        }

        info!(
            "Refreshed fileset cache: {} dtrees in {} filesystems",
            index.entry_count(),
            index.len()
        );
        Ok(install(&self.cache.filesets, index, update))
    }

    /// Fileset by name inside a filesystem, straight from the array
    ///
    /// `Ok(None)` when the filesystem exists but holds no such dtree.
    pub async fn get_fileset_info(
        &self,
        filesystem: &str,
        fileset: &str,
    ) -> Result<Option<Fileset>> {
        self.get_filesystem_info(filesystem).await?;

        match self.find_dtree(filesystem, fileset).await? {
            Some(mut dtree) => {
                dtree.parent_dir = self.dtree_parent_dir(&dtree).await?;
                Ok(Some(dtree))
            }
            None => Ok(None),
        }
    }

    /// Dtree listing entry for a fileset of an already resolved filesystem
    ///
    /// Queried by name; more than one match is reported as `NotFound`.
    pub(crate) async fn find_dtree(
        &self,
        filesystem: &str,
        fileset: &str,
    ) -> Result<Option<Fileset>> {
        let wanted = dtree_name(fileset);
        let mut found: Vec<Fileset> = self
            .list_dtrees(filesystem, Some(wanted))
            .await?
            .into_iter()
            .filter(|dtree| dtree.name == wanted)
            .collect();
        match found.len() {
            0 => {
                debug!("No fileset '{}' in filesystem '{}'", fileset, filesystem);
                Ok(None)
            }
            1 => Ok(found.pop()),
            n => {
                debug!("Fileset '{}' matched {} dtrees in '{}'", fileset, n, filesystem);
                Err(Error::not_found("Fileset", format!("{}/{}", filesystem, fileset)))
            }
        }
    }

    /// Dtrees of a filesystem with their parent directories filled in
    async fn fetch_dtrees(&self, filesystem: &str) -> Result<Vec<Fileset>> {
        let mut dtrees = self.list_dtrees(filesystem, None).await?;
        for dtree in dtrees.iter_mut() {
            dtree.parent_dir = self.dtree_parent_dir(dtree).await?;
        }
        Ok(dtrees)
    }

    async fn list_dtrees(&self, filesystem: &str, name: Option<&str>) -> Result<Vec<Fileset>> {
        let mut query = Query::new().param("file_system_name", filesystem);
        if let Some(name) = name {
            query = query.filter(json!({ "name": name }));
        }
        let reply = self
            .api
            .get(Endpoint::Dtrees, query)
            .await?
            .ensure_success(Endpoint::Dtrees)?;
        reply.decode_data(Endpoint::Dtrees)
    }

    async fn dtree_parent_dir(&self, dtree: &Fileset) -> Result<Option<String>> {
        let query = Query::new().param("id", &dtree.id);
        let reply = self
            .api
            .get(Endpoint::Dtrees, query)
            .await?
            .ensure_success(Endpoint::Dtrees)?;
        let detail: DtreeDetail = reply.decode_data(Endpoint::Dtrees)?;
        Ok(detail.parent_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::CompositeId;
    use crate::inventory::TwoLevelIndex;
    use crate::testing::{fixture_session, session_over, Method, MockArray};
    use assert_matches::assert_matches;
    use std::sync::Arc;

    fn keys<V>(index: &TwoLevelIndex<V>) -> Vec<String> {
        index.keys().cloned().collect()
    }

    fn names<V>(index: &TwoLevelIndex<V>, outer: &str) -> Vec<String> {
        index
            .partition(outer)
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn namespace(id: u64, name: &str, account_id: &str) -> Namespace {
        Namespace {
            id,
            name: name.into(),
            storage_pool_id: 0,
            account_id: account_id.into(),
        }
    }

    #[tokio::test]
    async fn test_list_namespaces() {
        let (session, _) = fixture_session();
        let all = session
            .list_namespaces(&AccountSelector::All, None, false)
            .await
            .unwrap();
        assert_eq!(keys(&all), vec!["0", "0000000001", "0000000002"]);
        assert!(names(&all, "0").is_empty());
        assert_eq!(names(&all, "0000000001"), vec!["object"]);
        assert_eq!(names(&all, "0000000002"), vec!["test", "data"]);
        assert_eq!(all.get("0000000002", "test").unwrap().id, 10);

        let test = session
            .list_namespaces(&AccountSelector::from("test"), None, false)
            .await
            .unwrap();
        assert_eq!(keys(&test), vec!["0000000001"]);
        assert_eq!(names(&test, "0000000001"), vec!["object"]);

        // a filtered call does not shrink what is cached
        let again = session
            .list_namespaces(&AccountSelector::All, None, false)
            .await
            .unwrap();
        assert_eq!(again, all);
    }

    #[tokio::test]
    async fn test_list_namespaces_by_pool() {
        let (session, _) = fixture_session();
        let in_pool = session
            .list_namespaces(&AccountSelector::All, Some("StoragePool0"), false)
            .await
            .unwrap();
        assert_eq!(in_pool.entry_count(), 3);

        assert_matches!(
            session
                .list_namespaces(&AccountSelector::All, Some("nonexistent"), false)
                .await,
            Err(Error::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn test_outdated_cache_is_served_until_update() {
        let (session, mock) = fixture_session();
        let mut outdated = NamespaceIndex::with_partitions(["0000000002"]);
        outdated.insert("0000000002", "old", namespace(99, "old", "0000000002"));
        session.cache().namespaces.replace(outdated.clone());

        let served = session
            .list_namespaces(&AccountSelector::All, None, false)
            .await
            .unwrap();
        assert_eq!(served, outdated);
        assert_eq!(mock.count(Method::Get, Endpoint::Namespaces), 0);

        let fresh = session
            .list_namespaces(&AccountSelector::All, None, true)
            .await
            .unwrap();
        assert_eq!(names(&fresh, "0000000002"), vec!["test", "data"]);
        assert_eq!(session.cache().namespaces.get(), Some(fresh));
    }

    #[tokio::test]
    async fn test_buckets_and_filesystems_are_disjoint() {
        let (session, _) = fixture_session();
        let buckets = session
            .list_buckets(&AccountSelector::All, None, false)
            .await
            .unwrap();
        assert_eq!(keys(&buckets), vec!["0", "0000000001", "0000000002"]);
        assert_eq!(names(&buckets, "0000000001"), vec!["object"]);
        assert!(names(&buckets, "0000000002").is_empty());

        let filesystems = session.list_filesystems(&[], None, false).await.unwrap();
        assert_eq!(
            filesystems.keys().cloned().collect::<Vec<_>>(),
            vec!["test", "data"]
        );

        let only_data = session.list_filesystems(&["data"], None, false).await.unwrap();
        assert_eq!(only_data.keys().cloned().collect::<Vec<_>>(), vec!["data"]);

        let oceanstor = session
            .list_buckets(&AccountSelector::from("oceanstor_account"), None, false)
            .await
            .unwrap();
        assert_eq!(keys(&oceanstor), vec!["0000000002"]);
        assert_eq!(oceanstor.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_list_filesets() {
        let (session, _) = fixture_session();
        let all = session.list_filesets(&[], &[], None, false).await.unwrap();
        assert_eq!(keys(&all), vec!["test", "data"]);
        assert_eq!(names(&all, "test"), vec!["10@4097", "10@4098", "10@40963"]);
        assert!(names(&all, "data").is_empty());

        let dttest = all.get("test", "10@4097").unwrap();
        assert_eq!(dttest.id, CompositeId::new("10", "4097"));
        assert_eq!(dttest.name, "dttest");
        assert_eq!(dttest.parent_dir.as_deref(), Some("/test"));

        let vsc = session
            .list_filesets(&["test"], &["vsc100"], None, false)
            .await
            .unwrap();
        assert_eq!(keys(&vsc), vec!["test"]);
        assert_eq!(names(&vsc, "test"), vec!["10@40963"]);

        let none = session
            .list_filesets(&["test"], &["nonexistent"], None, false)
            .await
            .unwrap();
        assert_eq!(keys(&none), vec!["test"]);
        assert!(names(&none, "test").is_empty());
    }

    #[tokio::test]
    async fn test_populated_cache_makes_no_calls() {
        let (session, mock) = fixture_session();
        let first = session.list_filesets(&[], &[], None, false).await.unwrap();
        session.list_storage_pools(false).await.unwrap();
        mock.reset_calls();

        assert_eq!(session.list_filesets(&[], &[], None, false).await.unwrap(), first);
        session
            .list_namespaces(&AccountSelector::from("test"), None, false)
            .await
            .unwrap();
        session
            .list_buckets(&AccountSelector::All, Some("StoragePool0"), false)
            .await
            .unwrap();
        assert!(mock.calls().is_empty());

        session.list_filesets(&[], &[], None, true).await.unwrap();
        assert_eq!(mock.count(Method::Get, Endpoint::Namespaces), 1);
    }

    #[tokio::test]
    async fn test_list_storage_pools() {
        let (session, _) = fixture_session();
        let pools = session.list_storage_pools(false).await.unwrap();
        assert_eq!(
            pools.get("StoragePool0"),
            Some(&StoragePool {
                id: 0,
                name: "StoragePool0".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_list_accounts() {
        let (session, _) = fixture_session();
        let accounts = session.list_accounts(false).await.unwrap();
        assert_eq!(
            accounts.keys().cloned().collect::<Vec<_>>(),
            vec!["system", "test", "oceanstor_account"]
        );
        assert_eq!(accounts["test"].id, "0000000001");
    }

    #[tokio::test]
    async fn test_get_fileset_info() {
        let (session, _) = fixture_session();
        let fileset = session.get_fileset_info("test", "dttest").await.unwrap().unwrap();
        assert_eq!(fileset.id, CompositeId::new("10", "4097"));
        assert_eq!(fileset.parent_dir.as_deref(), Some("/test"));

        let vsc = session.get_fileset_info("test", "vsc100").await.unwrap().unwrap();
        assert_eq!(vsc.name, "100");

        assert_eq!(session.get_fileset_info("test", "nonexistent").await.unwrap(), None);
        assert_matches!(
            session.get_fileset_info("nonexistent", "dttest").await,
            Err(Error::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn test_outdated_pools_served_until_update() {
        let (session, mock) = fixture_session();
        let mut outdated = PoolIndex::new();
        outdated.insert(
            "OldPool".into(),
            StoragePool {
                id: 7,
                name: "OldPool".into(),
            },
        );
        session.cache().storage_pools.replace(outdated.clone());

        assert_eq!(session.list_storage_pools(false).await.unwrap(), outdated);
        assert_eq!(mock.count(Method::Get, Endpoint::StoragePools), 0);

        let fresh = session.list_storage_pools(true).await.unwrap();
        assert_eq!(fresh.keys().cloned().collect::<Vec<_>>(), vec!["StoragePool0"]);
        assert_eq!(session.cache().storage_pools.get(), Some(fresh));
    }

    #[tokio::test]
    async fn test_outdated_buckets_survive_filesystem_fill() {
        let (session, _) = fixture_session();
        let mut outdated = NamespaceIndex::with_partitions(["0000000002"]);
        outdated.insert("0000000002", "outdated", namespace(99, "outdated", "0000000002"));
        session.cache().buckets.replace(outdated.clone());

        let filesystems = session.list_filesystems(&[], None, false).await.unwrap();
        assert_eq!(
            filesystems.keys().cloned().collect::<Vec<_>>(),
            vec!["test", "data"]
        );
        let buckets = session
            .list_buckets(&AccountSelector::All, None, false)
            .await
            .unwrap();
        assert_eq!(buckets, outdated);

        let fresh = session
            .list_buckets(&AccountSelector::All, None, true)
            .await
            .unwrap();
        assert_eq!(names(&fresh, "0000000001"), vec!["object"]);
        assert!(names(&fresh, "0000000002").is_empty());
        assert_eq!(session.cache().buckets.get(), Some(fresh));
    }

    #[tokio::test]
    async fn test_outdated_filesystems_survive_bucket_fill() {
        let (session, _) = fixture_session();
        let mut outdated = FilesystemIndex::new();
        outdated.insert("outdated".into(), namespace(99, "outdated", "0000000002"));
        session.cache().filesystems.replace(outdated.clone());

        let buckets = session
            .list_buckets(&AccountSelector::All, None, false)
            .await
            .unwrap();
        assert_eq!(names(&buckets, "0000000001"), vec!["object"]);
        assert_eq!(session.list_filesystems(&[], None, false).await.unwrap(), outdated);

        let fresh = session.list_filesystems(&[], None, true).await.unwrap();
        assert_eq!(fresh.keys().cloned().collect::<Vec<_>>(), vec!["test", "data"]);
        assert_eq!(session.cache().filesystems.get(), Some(fresh));
        let cached_buckets = session.cache().buckets.get().unwrap();
        assert_eq!(names(&cached_buckets, "0000000001"), vec!["object"]);
    }

    #[tokio::test]
    async fn test_outdated_filesets_served_until_update() {
        let (session, mock) = fixture_session();
        let outdated = FilesetIndex::with_partitions(["test"]);
        session.cache().filesets.replace(outdated.clone());

        let served = session
            .list_filesets(&["test"], &["dttest"], None, false)
            .await
            .unwrap();
        assert_eq!(served, outdated);
        assert_eq!(keys(&served), vec!["test"]);
        assert!(names(&served, "test").is_empty());
        assert_eq!(mock.count(Method::Get, Endpoint::Dtrees), 0);

        let fresh = session
            .list_filesets(&["test"], &["dttest"], None, true)
            .await
            .unwrap();
        assert_eq!(names(&fresh, "test"), vec!["10@4097"]);
        let cached = session.cache().filesets.get().unwrap();
        assert_eq!(keys(&cached), vec!["test", "data"]);
        assert_eq!(names(&cached, "test"), vec!["10@4097", "10@4098", "10@40963"]);
    }

    #[tokio::test]
    async fn test_get_fileset_info_rejects_duplicate_names() {
        let mock = MockArray::new().with_dtree("10@4100", "dttest");
        let (session, mock) = session_over(Arc::new(mock));
        assert_matches!(
            session.get_fileset_info("test", "dttest").await,
            Err(Error::NotFound { .. })
        );

        let call = mock.last(Method::Get, Endpoint::Dtrees).unwrap();
        assert_eq!(call.query.get("file_system_name"), Some("test"));
        assert_eq!(call.query.filter_condition(), Some(json!({ "name": "dttest" })));
    }
}
