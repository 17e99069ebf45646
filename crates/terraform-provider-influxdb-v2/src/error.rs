//! InfluxDB v2 provider error types

use influxdb2_client::ClientError;
use influxdb2_provider_framework::{Context, Diagnostic, Diagnostics, FrameworkError};
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(
        "no InfluxDB token configured. Set the `token` attribute or the INFLUXDB_V2_TOKEN environment variable"
    )]
    MissingToken,

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Interrupted(#[from] FrameworkError),

    #[error("{0}")]
    Conversion(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("server returned no {0}")]
    MissingField(&'static str),
}

impl ProviderError {
    /// Report this error as a single error diagnostic.
    ///
    /// Interruptions keep the framework's own title so cancelled operations
    /// read the same for every resource.
    pub fn report(&self, summary: &str, context: &str) -> Diagnostics {
        match self {
            ProviderError::Interrupted(err) => Diagnostic::from(err.clone()).into(),
            _ => Diagnostic::error(summary, format!("{}: {}", context, self)).into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Run one client call under the operation context
pub(crate) async fn remote<T, F>(ctx: &Context, call: F) -> Result<T>
where
    F: Future<Output = influxdb2_client::Result<T>>,
{
    Ok(ctx.run(call).await??)
}
