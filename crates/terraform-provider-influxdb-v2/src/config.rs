//! Provider configuration
//!
//! Each setting is resolved from the configuration block first, then from the
//! environment. Empty strings count as unset.

use crate::error::{ProviderError, Result};
use influxdb2_provider_framework::{Attribute, Schema};
use serde::Deserialize;
use std::fmt;

pub const URL_ENV: &str = "INFLUXDB_V2_URL";
pub const TOKEN_ENV: &str = "INFLUXDB_V2_TOKEN";
pub const DEFAULT_URL: &str = "http://localhost:8086";

/// Provider configuration block as written by the user
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub url: Option<String>,
    pub token: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Effective settings after environment fallback
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub url: String,
    pub token: String,
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl ProviderConfig {
    pub fn schema() -> Schema {
        Schema::new("Interact with InfluxDB v2.")
            .with_attribute(
                "url",
                Attribute::optional_string(format!(
                    "The InfluxDB server URL. Defaults to the {} environment variable, then {}.",
                    URL_ENV, DEFAULT_URL
                )),
            )
            .with_attribute(
                "token",
                Attribute::optional_string(format!(
                    "The InfluxDB API token. Defaults to the {} environment variable.",
                    TOKEN_ENV
                ))
                .sensitive(),
            )
    }

    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let url = non_empty(self.url.clone())
            .or_else(|| env_value(URL_ENV))
            .unwrap_or_else(|| DEFAULT_URL.to_string());

        let token = non_empty(self.token.clone())
            .or_else(|| env_value(TOKEN_ENV))
            .ok_or(ProviderError::MissingToken)?;

        Ok(ResolvedConfig { url, token })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn env_value(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok())
}
