//! REST client for the OceanStor management API
//!
//! Every reply carries a `result` member, either a bare code or an object
//! `{ "code": ..., "description": ... }`; it is lifted into [`ApiReply`] so
//! callers decide how to escalate non-zero codes. Transport failures and
//! server errors are retried with exponential backoff.
//!
//! The client expects a pre-established session token.

use crate::config::ApiConfig;
use crate::domain::model::CompositeId;
use crate::domain::ports::{ApiReply, ArrayApi, Endpoint, Query, QuotaLimits, QuotaManager};
use crate::error::{Error, Result};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

const AUTH_HEADER: &str = "X-Auth-Token";

/// Quota types of the `fs_quota` endpoint
const QUOTA_TYPE_DIRECTORY: u8 = 1;
const QUOTA_TYPE_USER: u8 = 2;
/// Owner type for user quotas
const OWNER_TYPE_USER: u8 = 1;
/// Object type of a dtree as a quota parent
const PARENT_TYPE_DTREE: u32 = 16445;

pub struct RestClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    max_retries: u32,
    max_elapsed: Duration,
}

impl RestClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(Error::Configuration("api.url must not be empty".into()));
        }
        let http = Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            max_retries: config.max_retries,
            max_elapsed: config.timeout() * (config.max_retries + 1),
        })
    }

    /// Full URL for an endpoint, with the query string encoded
    pub fn url(&self, endpoint: Endpoint, query: &Query) -> String {
        let mut url = format!("{}/{}", self.base_url, endpoint.path());
        if !query.is_empty() {
            let pairs: Vec<String> = query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            url.push('?');
            url.push_str(&pairs.join("&"));
        }
        url
    }

    async fn send(
        &self,
        method: Method,
        endpoint: Endpoint,
        query: &Query,
        body: Option<&Value>,
    ) -> Result<ApiReply> {
        let url = self.url(endpoint, query);
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(250))
            .with_max_elapsed_time(Some(self.max_elapsed))
            .build();

        let attempts = AtomicU32::new(0);
        let (url, method, attempts) = (&url, &method, &attempts);
        backoff::future::retry(policy, move || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            debug!("{} {} (attempt {})", method, url, attempt + 1);
            match self.send_once(method.clone(), url, endpoint, body).await {
                Ok(reply) => Ok(reply),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    warn!("Transient failure on {}: {}, retrying", endpoint, e);
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        endpoint: Endpoint,
        body: Option<&Value>,
    ) -> Result<ApiReply> {
        let mut request = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.header(AUTH_HEADER, token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if status.is_server_error() {
            return Err(Error::Remote {
                endpoint: endpoint.to_string(),
                status: i64::from(status.as_u16()),
                description: text,
            });
        }

        let payload: Value = if text.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&text)?
        };
        Ok(reply_from_payload(payload, status.as_u16()))
    }

    async fn post_quota(&self, body: Value) -> Result<()> {
        self.post(Endpoint::Quota, body)
            .await?
            .ensure_success(Endpoint::Quota)?;
        Ok(())
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

/// Lift the `result` member of a reply body into an [`ApiReply`]
fn reply_from_payload(payload: Value, http_status: u16) -> ApiReply {
    let (status, description) = match payload.get("result") {
        Some(Value::Object(result)) => (
            result.get("code").map_or(-1, result_code),
            result
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ),
        Some(code) => (result_code(code), String::new()),
        None if (200..300).contains(&http_status) => (0, String::new()),
        None => (i64::from(http_status), format!("HTTP status {}", http_status)),
    };
    ApiReply {
        status,
        description,
        payload,
    }
}

/// Result codes arrive as numbers or numeric strings
fn result_code(code: &Value) -> i64 {
    match code {
        Value::Number(n) => n.as_i64().unwrap_or(-1),
        Value::String(s) => s.parse().unwrap_or(-1),
        _ => -1,
    }
}

/// Quota parent and type; the parent is the dtree as `filesystem@dtree`
fn quota_target(dtree: &CompositeId, quota_type: u8) -> Value {
    json!({
        "parent_type": PARENT_TYPE_DTREE,
        "parent_id": dtree.to_string(),
        "quota_type": quota_type,
    })
}

fn user_target(dtree: &CompositeId, who: &str) -> Value {
    merge(
        quota_target(dtree, QUOTA_TYPE_USER),
        json!({ "usr_grp_owner_name": who, "usr_grp_type": OWNER_TYPE_USER }),
    )
}

fn fileset_quota_body(dtree: &CompositeId, limits: &QuotaLimits) -> Value {
    merge(quota_target(dtree, QUOTA_TYPE_DIRECTORY), limits_body(limits))
}

fn user_quota_body(who: &str, dtree: &CompositeId, limits: &QuotaLimits) -> Value {
    merge(user_target(dtree, who), limits_body(limits))
}

fn user_grace_body(dtree: &CompositeId, grace: Duration, who: &str) -> Value {
    merge(user_target(dtree, who), json!({ "soft_grace_time": grace.as_secs() }))
}

fn limits_body(limits: &QuotaLimits) -> Value {
    json!({
        "space_hard_quota": limits.block_hard,
        "space_soft_quota": limits.block_soft,
        "file_hard_quota": limits.inode_hard,
        "file_soft_quota": limits.inode_soft,
    })
}

fn merge(mut base: Value, extra: Value) -> Value {
    if let (Some(base), Value::Object(extra)) = (base.as_object_mut(), extra) {
        base.extend(extra);
    }
    base
}

#[async_trait]
impl ArrayApi for RestClient {
    async fn get(&self, endpoint: Endpoint, query: Query) -> Result<ApiReply> {
        self.send(Method::GET, endpoint, &query, None).await
    }

    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<ApiReply> {
        self.send(Method::POST, endpoint, &Query::new(), Some(&body)).await
    }

    async fn delete(&self, endpoint: Endpoint, query: Query) -> Result<ApiReply> {
        self.send(Method::DELETE, endpoint, &query, None).await
    }
}

#[async_trait]
impl QuotaManager for RestClient {
    async fn set_fileset_quota(&self, dtree: &CompositeId, limits: QuotaLimits) -> Result<()> {
        self.post_quota(fileset_quota_body(dtree, &limits)).await?;
        info!("Fileset quota on dtree {} set to {:?}", dtree, limits);
        Ok(())
    }

    async fn set_user_quota(
        &self,
        who: &str,
        dtree: &CompositeId,
        limits: QuotaLimits,
    ) -> Result<()> {
        self.post_quota(user_quota_body(who, dtree, &limits)).await?;
        info!("User quota for {} on dtree {} set to {:?}", who, dtree, limits);
        Ok(())
    }

    async fn set_user_grace(&self, dtree: &CompositeId, grace: Duration, who: &str) -> Result<()> {
        self.post_quota(user_grace_body(dtree, grace, who)).await?;
        info!("User grace for {} on dtree {} set to {}s", who, dtree, grace.as_secs());
        Ok(())
    }
}
