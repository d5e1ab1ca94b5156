//! Test doubles for the ports
//!
//! `MockArray` serves a small fixed inventory: three accounts, one pool,
//! namespaces `test` (10), `data` (11) and `object` (20, a bucket), three
//! dtrees in `test`, and a few snapshots. Every call is recorded.

use crate::config::{QuotaDefaults, SessionConfig};
use crate::domain::model::CompositeId;
use crate::domain::ports::{
    ApiReply, ArrayApi, Endpoint, LocalPathInfo, LocalPathResolver, Query, QuotaLimits,
    QuotaManager,
};
use crate::error::Result;
use crate::session::OceanStorSession;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub endpoint: Endpoint,
    pub query: Query,
    pub body: Option<Value>,
}

// =============================================================================
// Fixture Inventory
// =============================================================================

fn accounts() -> Vec<Value> {
    vec![
        json!({
            "canonical_user_id": "11111111111111111111111111111111",
            "create_time": "1672531200",
            "encrypt_option": "0",
            "id": "0",
            "name": "system",
            "status": "Active",
        }),
        json!({
            "canonical_user_id": "00000000000000000000000000000001",
            "create_time": "1675209600",
            "encrypt_option": "0",
            "id": "0000000001",
            "name": "test",
            "status": "Active",
        }),
        json!({
            "canonical_user_id": "00000000000000000000000000000002",
            "create_time": "1675209600",
            "encrypt_option": "0",
            "id": "0000000002",
            "name": "oceanstor_account",
            "status": "Active",
        }),
        json!({
            "canonical_user_id": "00000000000000000000000000000003",
            "create_time": "1675209600",
            "encrypt_option": "0",
            "id": "0000000003",
            "name": "retired",
            "status": "Frozen",
        }),
    ]
}

fn namespaces() -> Vec<Value> {
    vec![
        json!({"id": 10, "name": "test", "storage_pool_id": 0, "account_id": "0000000002"}),
        json!({"id": 11, "name": "data", "storage_pool_id": 0, "account_id": "0000000002"}),
        json!({"id": 20, "name": "object", "storage_pool_id": 0, "account_id": "0000000001"}),
    ]
}

fn namespace_snapshots() -> Vec<Value> {
    vec![
        json!({
            "description": "",
            "dtree_id": "10@0",
            "dtree_name": "",
            "id": "128849018880@34585",
            "name": "SNAP_TEST_01",
            "namespace_id": 10,
            "namespace_name": "test",
            "snap_type": 1,
            "status": 1,
        }),
        json!({
            "description": "",
            "dtree_id": "10@0",
            "dtree_name": "",
            "id": "128849018880@34590",
            "name": "SNAP_TEST_02",
            "namespace_id": 10,
            "namespace_name": "test",
            "snap_type": 1,
            "status": 1,
        }),
        json!({
            "description": "",
            "dtree_id": "20@0",
            "dtree_name": "",
            "id": "287762808832@1332",
            "name": "SNAP_OBJ_01",
            "namespace_id": 20,
            "namespace_name": "object",
            "snap_type": 1,
            "status": 1,
        }),
    ]
}

fn dtrees() -> Vec<Value> {
    vec![
        json!({"group": "", "id": "10@4097", "name": "dttest", "owner": ""}),
        json!({"group": "", "id": "10@4098", "name": "dttest2", "owner": ""}),
        json!({"group": "", "id": "10@40963", "name": "100", "owner": ""}),
    ]
}

fn file_snapshots() -> Vec<Value> {
    vec![
        json!({
            "dtree_id": "10@0",
            "dtree_name": "",
            "file_system_id": 10,
            "file_system_name": "test",
            "id": "128849018880@34585",
            "name": "SNAP_TEST_01",
        }),
        json!({
            "dtree_id": "10@0",
            "dtree_name": "",
            "file_system_id": 10,
            "file_system_name": "test",
            "id": "128849018880@34590",
            "name": "SNAP_TEST_02",
        }),
        json!({
            "dtree_id": "10@4097",
            "dtree_name": "dttest",
            "file_system_id": 10,
            "file_system_name": "test",
            "id": "128849022977@1073776411",
            "name": "dttest_SNAP_TEST_01",
        }),
        json!({
            "dtree_id": "10@4097",
            "dtree_name": "dttest",
            "file_system_id": 10,
            "file_system_name": "test",
            "id": "128849022977@1073776413",
            "name": "dttest_SNAP_TEST_03",
        }),
    ]
}

/// Records whose `key` equals the filter condition's `key`, or all without one
fn filtered(records: Vec<Value>, query: &Query, keys: &[&str]) -> Vec<Value> {
    let Some(condition) = query.filter_condition() else {
        return records;
    };
    records
        .into_iter()
        .filter(|record| {
            keys.iter().all(|key| match condition.get(*key) {
                Some(wanted) => record.get(*key) == Some(wanted),
                None => true,
            })
        })
        .collect()
}

fn data(records: Vec<Value>) -> ApiReply {
    ApiReply::ok(json!({ "data": records, "result": { "code": 0, "description": "" } }))
}

// =============================================================================
// Mock Array
// =============================================================================

/// Fixture-backed [`ArrayApi`]
pub struct MockArray {
    object_support: String,
    extra_dtrees: Vec<Value>,
    created_dtree_id: Value,
    failures: Mutex<HashMap<(Method, Endpoint), i64>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockArray {
    pub fn new() -> Self {
        Self {
            object_support: "COMPATIBLE".to_string(),
            extra_dtrees: Vec::new(),
            created_dtree_id: json!("10@4099"),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_object_support(mut self, support: &str) -> Self {
        self.object_support = support.to_string();
        self
    }

    /// Add a dtree to filesystem `test`
    pub fn with_dtree(mut self, id: &str, name: &str) -> Self {
        self.extra_dtrees
            .push(json!({ "group": "", "id": id, "name": name, "owner": "" }));
        self
    }

    /// Id reported for every created dtree
    pub fn with_created_dtree_id(mut self, id: Value) -> Self {
        self.created_dtree_id = id;
        self
    }

    pub fn failing(self, method: Method, endpoint: Endpoint, status: i64) -> Self {
        self.fail(method, endpoint, status);
        self
    }

    /// Answer every later `method` call on `endpoint` with `status`
    pub fn fail(&self, method: Method, endpoint: Endpoint, status: i64) {
        self.failures.lock().insert((method, endpoint), status);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, method: Method, endpoint: Endpoint) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method && c.endpoint == endpoint)
            .count()
    }

    pub fn last(&self, method: Method, endpoint: Endpoint) -> Option<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|c| c.method == method && c.endpoint == endpoint)
            .cloned()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(
        &self,
        method: Method,
        endpoint: Endpoint,
        query: Query,
        body: Option<Value>,
    ) -> Option<ApiReply> {
        self.calls.lock().push(RecordedCall {
            method,
            endpoint,
            query,
            body,
        });
        self.failures
            .lock()
            .get(&(method, endpoint))
            .map(|status| ApiReply {
                status: *status,
                description: "injected failure".to_string(),
                payload: json!({}),
            })
    }

    fn answer_get(&self, endpoint: Endpoint, query: &Query) -> ApiReply {
        match endpoint {
            Endpoint::Accounts => data(filtered(accounts(), query, &["name"])),
            Endpoint::StoragePools => ApiReply::ok(json!({
                "storagePools": [{ "storagePoolId": 0, "storagePoolName": "StoragePool0" }],
                "result": 0,
            })),
            Endpoint::Namespaces => data(filtered(namespaces(), query, &["name", "account_id"])),
            Endpoint::NamespaceSnapshots => {
                data(filtered(namespace_snapshots(), query, &["namespace_id"]))
            }
            Endpoint::Dtrees => {
                if query.get("id").is_some() {
                    ApiReply::ok(json!({ "data": { "parent_dir": "/test" } }))
                } else if query.get("file_system_name") == Some("test") {
                    let mut records = dtrees();
                    records.extend(self.extra_dtrees.iter().cloned());
                    data(filtered(records, query, &["name"]))
                } else {
                    data(Vec::new())
                }
            }
            Endpoint::FileSnapshots => {
                let is_dtree_query = query
                    .filter_condition()
                    .map_or(false, |c| c.get("dtree_id").is_some());
                let records = filtered(file_snapshots(), query, &["file_system_id", "dtree_id"]);
                // filesystem listings only show snapshots of the root dtree
                let on_root =
                    |s: &Value| s["dtree_id"].as_str().map_or(false, |d| d.ends_with("@0"));
                data(records
                    .into_iter()
                    .filter(|s| is_dtree_query || on_root(s))
                    .collect())
            }
            Endpoint::ObjectSupport => ApiReply::ok(json!({
                "data": { "supportAPI": self.object_support },
                "result": 0,
            })),
            Endpoint::Quota | Endpoint::BucketExists => data(Vec::new()),
        }
    }

    fn answer_post(&self, endpoint: Endpoint, body: &Value) -> ApiReply {
        match endpoint {
            Endpoint::BucketExists => {
                let id = namespaces()
                    .into_iter()
                    .find(|ns| ns.get("name") == body.get("name"))
                    .and_then(|ns| ns["id"].as_u64());
                match id {
                    // namespaces from id 20 up are buckets
                    Some(id) => ApiReply::ok(json!({ "data": { "bucket_exists": id >= 20 } })),
                    None => ApiReply {
                        status: 1,
                        description: "no such namespace".to_string(),
                        payload: json!({ "data": {} }),
                    },
                }
            }
            Endpoint::Dtrees => {
                ApiReply::ok(json!({ "data": { "id": self.created_dtree_id.clone() } }))
            }
            Endpoint::NamespaceSnapshots => {
                ApiReply::ok(json!({ "data": { "id": "287762808832@1335" } }))
            }
            Endpoint::FileSnapshots => {
                ApiReply::ok(json!({ "data": { "id": "128849018880@34595" } }))
            }
            _ => ApiReply::ok(json!({ "data": {} })),
        }
    }
}

#[async_trait]
impl ArrayApi for MockArray {
    async fn get(&self, endpoint: Endpoint, query: Query) -> Result<ApiReply> {
        if let Some(failure) = self.record(Method::Get, endpoint, query.clone(), None) {
            return Ok(failure);
        }
        Ok(self.answer_get(endpoint, &query))
    }

    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<ApiReply> {
        let recorded = self.record(Method::Post, endpoint, Query::new(), Some(body.clone()));
        if let Some(failure) = recorded {
            return Ok(failure);
        }
        Ok(self.answer_post(endpoint, &body))
    }

    async fn delete(&self, endpoint: Endpoint, query: Query) -> Result<ApiReply> {
        if let Some(failure) = self.record(Method::Delete, endpoint, query, None) {
            return Ok(failure);
        }
        Ok(ApiReply::ok(json!({ "data": {} })))
    }
}

// =============================================================================
// Quota and Path Doubles
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaCall {
    Fileset {
        dtree: CompositeId,
        limits: QuotaLimits,
    },
    User {
        who: String,
        dtree: CompositeId,
        limits: QuotaLimits,
    },
    Grace {
        dtree: CompositeId,
        grace: Duration,
        who: String,
    },
}

/// [`QuotaManager`] that only records what it was asked
#[derive(Debug, Default)]
pub struct RecordingQuota {
    calls: Mutex<Vec<QuotaCall>>,
}

impl RecordingQuota {
    pub fn calls(&self) -> Vec<QuotaCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl QuotaManager for RecordingQuota {
    async fn set_fileset_quota(&self, dtree: &CompositeId, limits: QuotaLimits) -> Result<()> {
        self.calls.lock().push(QuotaCall::Fileset {
            dtree: dtree.clone(),
            limits,
        });
        Ok(())
    }

    async fn set_user_quota(
        &self,
        who: &str,
        dtree: &CompositeId,
        limits: QuotaLimits,
    ) -> Result<()> {
        self.calls.lock().push(QuotaCall::User {
            who: who.to_string(),
            dtree: dtree.clone(),
            limits,
        });
        Ok(())
    }

    async fn set_user_grace(&self, dtree: &CompositeId, grace: Duration, who: &str) -> Result<()> {
        self.calls.lock().push(QuotaCall::Grace {
            dtree: dtree.clone(),
            grace,
            who: who.to_string(),
        });
        Ok(())
    }
}

/// [`LocalPathResolver`] answering the same location for every path
pub struct StaticPathResolver(pub LocalPathInfo);

#[async_trait]
impl LocalPathResolver for StaticPathResolver {
    async fn identify_local_path(&self, _path: &str) -> Result<LocalPathInfo> {
        Ok(self.0.clone())
    }
}

// =============================================================================
// Sessions
// =============================================================================

pub fn fixture_config() -> SessionConfig {
    SessionConfig {
        quota: QuotaDefaults {
            user_block: 128,
            user_inode: 1024,
            project_block: 256,
            project_inode: 2048,
        },
        ..SessionConfig::default()
    }
}

pub fn session_over(mock: Arc<MockArray>) -> (OceanStorSession, Arc<MockArray>) {
    let session = OceanStorSession::new(mock.clone(), fixture_config());
    (session, mock)
}

/// Session over a fresh [`MockArray`]
pub fn fixture_session() -> (OceanStorSession, Arc<MockArray>) {
    session_over(Arc::new(MockArray::new()))
}
