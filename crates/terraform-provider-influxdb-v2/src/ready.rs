//! `influxdb-v2_ready` data source

use crate::error::remote;
use crate::timestamp;
use async_trait::async_trait;
use influxdb2_client::InfluxClient;
use influxdb2_provider_framework::{
    Attribute, Context, DataSource, Diagnostics, DynamicDataSource, FrameworkError, Schema,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadyModel {
    pub id: Option<String>,
    pub url: Option<String>,
    pub ready: Option<bool>,
    pub status: Option<String>,
    pub started: Option<String>,
}

#[derive(Default)]
pub struct ReadyDataSource {
    client: Option<Arc<dyn InfluxClient>>,
}

impl ReadyDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory() -> Box<dyn DynamicDataSource<Arc<dyn InfluxClient>>> {
        Box::new(Self::new())
    }
}

#[async_trait]
impl DataSource for ReadyDataSource {
    type Data = Arc<dyn InfluxClient>;
    type Model = ReadyModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_ready", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::new("Checks the status of the InfluxDB server.")
            .with_attribute("id", Attribute::computed_string("The server URL."))
            .with_attribute("url", Attribute::computed_string("The server URL."))
            .with_attribute(
                "ready",
                Attribute::computed_bool("Whether the server answered the readiness probe."),
            )
            .with_attribute(
                "status",
                Attribute::computed_string("Status reported by the server."),
            )
            .with_attribute(
                "started",
                Attribute::computed_string("Server start time (RFC 3339)."),
            )
    }

    fn configure(&mut self, client: Arc<dyn InfluxClient>) {
        self.client = Some(client);
    }

    async fn read(
        &self,
        ctx: &Context,
        _config: ReadyModel,
    ) -> Result<ReadyModel, Diagnostics> {
        let client = self.client.as_deref().ok_or(FrameworkError::NotConfigured)?;
        let url = client.server_url().to_string();

        let ready = remote(ctx, client.ready()).await.map_err(|e| {
            e.report(
                "Error Checking Server Status",
                &format!("Could not check status of {}", url),
            )
        })?;

        tracing::debug!(url = %url, status = ?ready.status, "Server ready");

        Ok(ReadyModel {
            id: Some(url.clone()),
            url: Some(url),
            ready: Some(true),
            status: Some(ready.status.unwrap_or_else(|| "unknown".to_string())),
            started: Some(ready.started.as_ref().map(timestamp).unwrap_or_default()),
        })
    }
}
