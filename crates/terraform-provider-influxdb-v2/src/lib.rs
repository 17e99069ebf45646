//! InfluxDB v2 provider
//!
//! Declarative management of InfluxDB v2 entities:
//!
//! - **`influxdb-v2_bucket`**: buckets with retention rules
//! - **`influxdb-v2_authorization`**: API tokens and their permissions
//! - **`influxdb-v2_ready`** (data source): server readiness
//!
//! The provider is configured with a server URL and token (falling back to
//! `INFLUXDB_V2_URL` / `INFLUXDB_V2_TOKEN`) and hands one shared
//! [`InfluxClient`](influxdb2_client::InfluxClient) to every resource.

pub mod authorization;
pub mod bucket;
pub mod config;
pub mod error;
pub mod provider;
pub mod ready;

pub use authorization::{
    AuthorizationModel, AuthorizationResource, PermissionModel, PermissionResourceModel,
};
pub use bucket::{BucketModel, BucketResource, RetentionRuleModel};
pub use config::{ProviderConfig, ResolvedConfig};
pub use error::{ProviderError, Result};
pub use provider::{Connector, InfluxProvider, TYPE_NAME};
pub use ready::{ReadyDataSource, ReadyModel};

use chrono::{DateTime, FixedOffset, SecondsFormat};
use influxdb2_provider_framework::{FrameworkError, ProviderServer};

/// Registry serving the InfluxDB v2 provider over HTTP
pub fn server() -> std::result::Result<ProviderServer<InfluxProvider>, FrameworkError> {
    ProviderServer::new(InfluxProvider::new())
}

/// RFC 3339 rendering used for every timestamp kept in state
pub(crate) fn timestamp(at: &DateTime<FixedOffset>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
