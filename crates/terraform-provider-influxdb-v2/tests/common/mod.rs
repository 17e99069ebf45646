//! In-memory InfluxDB double shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::DateTime;
use influxdb2_client::{
    Authorization, AuthorizationStatus, AuthorizationsApi, Bucket, BucketType, BucketsApi,
    ClientError, InfluxClient, Ready,
};
use influxdb_v2_provider::{Connector, InfluxProvider, ResolvedConfig};
use influxdb2_provider_framework::{Context, ProviderServer};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub const URL: &str = "http://influx.test:8086";
pub const TOKEN: &str = "test-token";
pub const CREATED_AT: &str = "2024-03-01T10:00:00Z";

#[derive(Default)]
pub struct FakeState {
    next_id: u64,
    pub buckets: BTreeMap<String, Bucket>,
    pub authorizations: BTreeMap<String, Authorization>,
    /// Status returned by `/ready`; `None` simulates a malformed answer
    pub ready_status: Option<String>,
    /// Fail every call with this HTTP status
    pub fail_status: Option<u16>,
    /// Fail only the create calls
    pub fail_creates: bool,
    /// Omit tokens from authorization listings
    pub hide_listed_tokens: bool,
    /// Never answer
    pub hang: bool,
    pub calls: Vec<String>,
}

#[derive(Clone)]
pub struct FakeInflux {
    url: String,
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeInflux {
    pub fn new() -> Self {
        let state = FakeState {
            ready_status: Some("ready".to_string()),
            ..Default::default()
        };
        Self {
            url: URL.to_string(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn set(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }

    /// Record the call and decide whether it fails
    async fn enter(&self, call: &str) -> Result<(), ClientError> {
        let (hang, fail) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call.to_string());
            let fail = match state.fail_status {
                None if state.fail_creates && call.starts_with("create_") => Some(500),
                fail => fail,
            };
            (state.hang, fail)
        };
        if hang {
            std::future::pending::<()>().await;
        }
        match fail {
            Some(status) => Err(ClientError::Api {
                status,
                code: "internal error".to_string(),
                message: "injected failure".to_string(),
            }),
            None => Ok(()),
        }
    }

    fn next_id(state: &mut FakeState) -> String {
        state.next_id += 1;
        format!("{:016x}", 0x0a1b_2c3d_0000_0000u64 + state.next_id)
    }
}

fn not_found(what: &str) -> ClientError {
    ClientError::Api {
        status: 404,
        code: "not found".to_string(),
        message: format!("{} not found", what),
    }
}

#[async_trait]
impl InfluxClient for FakeInflux {
    fn server_url(&self) -> &str {
        &self.url
    }

    async fn ready(&self) -> influxdb2_client::Result<Ready> {
        self.enter("ready").await?;
        let status = self.state.lock().unwrap().ready_status.clone();
        Ok(Ready {
            status,
            started: DateTime::parse_from_rfc3339(CREATED_AT).ok(),
            up: Some("1h0m0s".to_string()),
        })
    }

    fn buckets_api(&self) -> &dyn BucketsApi {
        self
    }

    fn authorizations_api(&self) -> &dyn AuthorizationsApi {
        self
    }
}

#[async_trait]
impl BucketsApi for FakeInflux {
    async fn create_bucket(&self, bucket: &Bucket) -> influxdb2_client::Result<Bucket> {
        self.enter("create_bucket").await?;
        let mut state = self.state.lock().unwrap();
        let id = Self::next_id(&mut state);
        let created_at = DateTime::parse_from_rfc3339(CREATED_AT).ok();

        let mut stored = bucket.clone();
        stored.id = Some(id.clone());
        stored.bucket_type = Some(BucketType::User);
        // the server omits empty optional strings
        stored.description = bucket.description.clone().filter(|d| !d.is_empty());
        stored.rp = bucket.rp.clone().filter(|rp| !rp.is_empty());
        stored.created_at = created_at;
        stored.updated_at = created_at;
        for rule in &mut stored.retention_rules {
            rule.rule_type.get_or_insert_with(|| "expire".to_string());
            rule.shard_group_duration_seconds = Some(604_800);
        }

        state.buckets.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_bucket_by_id(&self, id: &str) -> influxdb2_client::Result<Bucket> {
        self.enter("find_bucket_by_id").await?;
        let state = self.state.lock().unwrap();
        state.buckets.get(id).cloned().ok_or_else(|| not_found("bucket"))
    }

    async fn update_bucket(&self, bucket: &Bucket) -> influxdb2_client::Result<Bucket> {
        self.enter("update_bucket").await?;
        let mut state = self.state.lock().unwrap();
        let id = bucket.id.clone().unwrap_or_default();
        let stored = state.buckets.get_mut(&id).ok_or_else(|| not_found("bucket"))?;
        stored.name = bucket.name.clone();
        stored.description = bucket.description.clone().filter(|d| !d.is_empty());
        stored.rp = bucket.rp.clone().filter(|rp| !rp.is_empty());
        stored.retention_rules = bucket.retention_rules.clone();
        stored.updated_at = DateTime::parse_from_rfc3339("2024-03-02T10:00:00Z").ok();
        Ok(stored.clone())
    }

    async fn delete_bucket_with_id(&self, id: &str) -> influxdb2_client::Result<()> {
        self.enter("delete_bucket_with_id").await?;
        let mut state = self.state.lock().unwrap();
        state
            .buckets
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("bucket"))
    }
}

#[async_trait]
impl AuthorizationsApi for FakeInflux {
    async fn create_authorization(
        &self,
        authorization: &Authorization,
    ) -> influxdb2_client::Result<Authorization> {
        self.enter("create_authorization").await?;
        let mut state = self.state.lock().unwrap();
        let id = Self::next_id(&mut state);

        let mut stored = authorization.clone();
        stored.id = Some(id.clone());
        stored.token = Some(format!("token-{}", id));
        stored.user_id = Some("user0001".to_string());
        stored.status.get_or_insert(AuthorizationStatus::Active);

        state.authorizations.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_authorizations_by_org_id(
        &self,
        org_id: &str,
    ) -> influxdb2_client::Result<Vec<Authorization>> {
        self.enter("find_authorizations_by_org_id").await?;
        let state = self.state.lock().unwrap();
        Ok(state
            .authorizations
            .values()
            .filter(|a| org_id.is_empty() || a.org_id.as_deref() == Some(org_id))
            .cloned()
            .map(|mut a| {
                if state.hide_listed_tokens {
                    a.token = None;
                }
                a
            })
            .collect())
    }

    async fn update_authorization_status(
        &self,
        id: &str,
        status: AuthorizationStatus,
    ) -> influxdb2_client::Result<Authorization> {
        self.enter("update_authorization_status").await?;
        let mut state = self.state.lock().unwrap();
        let stored = state
            .authorizations
            .get_mut(id)
            .ok_or_else(|| not_found("authorization"))?;
        stored.status = Some(status);
        Ok(stored.clone())
    }

    async fn delete_authorization(&self, id: &str) -> influxdb2_client::Result<()> {
        self.enter("delete_authorization").await?;
        let mut state = self.state.lock().unwrap();
        state
            .authorizations
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("authorization"))
    }
}

pub fn connector(fake: &FakeInflux) -> Connector {
    let fake = fake.clone();
    Arc::new(
        move |config: &ResolvedConfig| -> influxdb2_client::Result<Arc<dyn InfluxClient>> {
            assert_eq!(config.token, TOKEN);
            Ok(Arc::new(fake.clone()))
        },
    )
}

pub fn unconfigured_server(fake: &FakeInflux) -> ProviderServer<InfluxProvider> {
    ProviderServer::new(InfluxProvider::with_connector(connector(fake))).unwrap()
}

pub async fn configured_server(fake: &FakeInflux) -> ProviderServer<InfluxProvider> {
    let mut server = unconfigured_server(fake);
    server
        .configure(&Context::new(), json!({"url": URL, "token": TOKEN}))
        .await
        .unwrap();
    server
}
