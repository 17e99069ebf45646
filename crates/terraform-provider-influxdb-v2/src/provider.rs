//! InfluxDB v2 provider implementation

use crate::authorization::AuthorizationResource;
use crate::bucket::BucketResource;
use crate::config::{ProviderConfig, ResolvedConfig};
use crate::error::{ProviderError, remote};
use crate::ready::ReadyDataSource;
use async_trait::async_trait;
use influxdb2_client::{ClientOptions, HttpClient, InfluxClient};
use influxdb2_provider_framework::{
    AttributePath, Context, DataSourceFactory, Diagnostic, Diagnostics, Provider,
    ResourceFactory, Schema,
};
use std::sync::Arc;

pub const TYPE_NAME: &str = "influxdb-v2";

/// Builds the client used by every resource once the configuration is
/// resolved
pub type Connector =
    Arc<dyn Fn(&ResolvedConfig) -> influxdb2_client::Result<Arc<dyn InfluxClient>> + Send + Sync>;

pub struct InfluxProvider {
    version: String,
    connector: Connector,
}

impl InfluxProvider {
    pub fn new() -> Self {
        Self::with_client_options(ClientOptions::default())
    }

    /// HTTP client built with `options` once configured
    pub fn with_client_options(options: ClientOptions) -> Self {
        Self::with_connector(Arc::new(
            move |config: &ResolvedConfig| -> influxdb2_client::Result<Arc<dyn InfluxClient>> {
                let client =
                    HttpClient::with_options(&config.url, config.token.clone(), options.clone())?;
                Ok(Arc::new(client))
            },
        ))
    }

    pub fn with_connector(connector: Connector) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            connector,
        }
    }
}

impl Default for InfluxProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for InfluxProvider {
    type Config = ProviderConfig;
    type Data = Arc<dyn InfluxClient>;

    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn schema(&self) -> Schema {
        ProviderConfig::schema()
    }

    async fn configure(
        &self,
        ctx: &Context,
        config: ProviderConfig,
    ) -> Result<Arc<dyn InfluxClient>, Diagnostics> {
        let resolved = config.resolve().map_err(|e| {
            Diagnostics::from(
                Diagnostic::error("Missing InfluxDB Token", e.to_string())
                    .with_attribute(AttributePath::root("token")),
            )
        })?;

        tracing::debug!(url = %resolved.url, "Configuring InfluxDB client");

        let client = (self.connector)(&resolved).map_err(|e| {
            Diagnostics::from(
                Diagnostic::error("Unable to Create InfluxDB Client", e.to_string())
                    .with_attribute(AttributePath::root("url")),
            )
        })?;

        let ready = remote(ctx, client.ready())
            .await
            .map_err(|e| e.report("Unable to Connect to InfluxDB", "error pinging server"))?;

        if ready.status.is_none() {
            return Err(ProviderError::MissingField("readiness status")
                .report("Unable to Connect to InfluxDB", "error pinging server"));
        }

        tracing::info!(url = %resolved.url, status = ?ready.status, "Connected to InfluxDB");
        Ok(client)
    }

    fn resources(&self) -> Vec<ResourceFactory<Arc<dyn InfluxClient>>> {
        vec![BucketResource::factory, AuthorizationResource::factory]
    }

    fn data_sources(&self) -> Vec<DataSourceFactory<Arc<dyn InfluxClient>>> {
        vec![ReadyDataSource::factory]
    }
}
