//! Client traits
//!
//! The provider only depends on these traits, so any implementation of the
//! InfluxDB v2 API (the HTTP client in this crate, or an in-memory double in
//! tests) can be injected.

use crate::domain::{Authorization, AuthorizationStatus, Bucket, Ready};
use crate::error::Result;
use async_trait::async_trait;

/// Handle to one InfluxDB v2 server
#[async_trait]
pub trait InfluxClient: Send + Sync {
    /// Base URL of the server, without trailing slash
    fn server_url(&self) -> &str;

    /// Probe `GET /ready`
    async fn ready(&self) -> Result<Ready>;

    fn buckets_api(&self) -> &dyn BucketsApi;

    fn authorizations_api(&self) -> &dyn AuthorizationsApi;
}

#[async_trait]
pub trait BucketsApi: Send + Sync {
    async fn create_bucket(&self, bucket: &Bucket) -> Result<Bucket>;

    async fn find_bucket_by_id(&self, id: &str) -> Result<Bucket>;

    /// Update name, description, retention rules and rp of `bucket.id`
    async fn update_bucket(&self, bucket: &Bucket) -> Result<Bucket>;

    async fn delete_bucket_with_id(&self, id: &str) -> Result<()>;
}

#[async_trait]
pub trait AuthorizationsApi: Send + Sync {
    async fn create_authorization(&self, authorization: &Authorization) -> Result<Authorization>;

    /// List authorizations of an organization. An empty `org_id` lists all
    /// authorizations visible to the token.
    async fn find_authorizations_by_org_id(&self, org_id: &str) -> Result<Vec<Authorization>>;

    async fn update_authorization_status(
        &self,
        id: &str,
        status: AuthorizationStatus,
    ) -> Result<Authorization>;

    async fn delete_authorization(&self, id: &str) -> Result<()>;
}
