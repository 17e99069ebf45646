//! InfluxDB v2 HTTP client
//!
//! Direct REST implementation of the handful of endpoints the provider needs.
//! Uses `Authorization: Token <token>` authentication.

use crate::api::{AuthorizationsApi, BucketsApi, InfluxClient};
use crate::domain::{
    ApiErrorBody, Authorization, AuthorizationStatus, AuthorizationStatusRequest, Authorizations,
    Bucket, PatchBucketRequest, Ready,
};
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;

const BUCKETS_PATH: &str = "/api/v2/buckets";
const AUTHORIZATIONS_PATH: &str = "/api/v2/authorizations";
const READY_PATH: &str = "/ready";

/// Options for building an [`HttpClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: format!("influxdb2-client-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// InfluxDB v2 client over HTTP
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    server_url: String,
    token: String,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("server_url", &self.server_url)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a client with default options
    pub fn new(server_url: &str, token: impl Into<String>) -> Result<Self> {
        Self::with_options(server_url, token, ClientOptions::default())
    }

    pub fn with_options(
        server_url: &str,
        token: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self> {
        let parsed = reqwest::Url::parse(server_url).map_err(|e| ClientError::InvalidUrl {
            url: server_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl {
                url: server_url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent)
            .build()?;

        Ok(Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header(
            reqwest::header::AUTHORIZATION,
            format!("Token {}", self.token),
        )
    }

    /// Send a request and decode a JSON body from a 2xx answer
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        Ok(serde_json::from_slice(&body)?)
    }

    /// Send a request whose 2xx answer carries no body of interest
    async fn send_empty(&self, request: reqwest::RequestBuilder) -> Result<()> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.bytes().await?;
            return Err(api_error(status, &body));
        }

        Ok(())
    }
}

/// Build an `Api` error from the server's error document, falling back to the
/// raw body or the canonical reason when the document is missing
fn api_error(status: reqwest::StatusCode, body: &[u8]) -> ClientError {
    let parsed: Option<ApiErrorBody> = serde_json::from_slice(body).ok();
    let fallback_code = status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_lowercase();

    let (code, message) = match parsed {
        Some(doc) => (
            doc.code.unwrap_or(fallback_code),
            doc.message.unwrap_or_default(),
        ),
        None => (
            fallback_code,
            String::from_utf8_lossy(body).trim().to_string(),
        ),
    };

    ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}

fn require_id<'a>(id: Option<&'a str>, what: &str) -> Result<&'a str> {
    match id {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(ClientError::InvalidRequest(format!("{} id is required", what))),
    }
}

#[async_trait]
impl InfluxClient for HttpClient {
    fn server_url(&self) -> &str {
        &self.server_url
    }

    async fn ready(&self) -> Result<Ready> {
        let url = self.endpoint(READY_PATH);
        tracing::debug!("GET {}", url);
        self.send(self.http.get(&url)).await
    }

    fn buckets_api(&self) -> &dyn BucketsApi {
        self
    }

    fn authorizations_api(&self) -> &dyn AuthorizationsApi {
        self
    }
}

#[async_trait]
impl BucketsApi for HttpClient {
    async fn create_bucket(&self, bucket: &Bucket) -> Result<Bucket> {
        let url = self.endpoint(BUCKETS_PATH);
        tracing::debug!("POST {} name={}", url, bucket.name);
        self.send(self.authorized(self.http.post(&url)).json(bucket))
            .await
    }

    async fn find_bucket_by_id(&self, id: &str) -> Result<Bucket> {
        let id = require_id(Some(id), "bucket")?;
        let url = format!("{}/{}", self.endpoint(BUCKETS_PATH), id);
        tracing::debug!("GET {}", url);
        self.send(self.authorized(self.http.get(&url))).await
    }

    async fn update_bucket(&self, bucket: &Bucket) -> Result<Bucket> {
        let id = require_id(bucket.id.as_deref(), "bucket")?;
        let url = format!("{}/{}", self.endpoint(BUCKETS_PATH), id);
        tracing::debug!("PATCH {}", url);
        self.send(
            self.authorized(self.http.patch(&url))
                .json(&PatchBucketRequest::from(bucket)),
        )
        .await
    }

    async fn delete_bucket_with_id(&self, id: &str) -> Result<()> {
        let id = require_id(Some(id), "bucket")?;
        let url = format!("{}/{}", self.endpoint(BUCKETS_PATH), id);
        tracing::debug!("DELETE {}", url);
        self.send_empty(self.authorized(self.http.delete(&url)))
            .await
    }
}

#[async_trait]
impl AuthorizationsApi for HttpClient {
    async fn create_authorization(&self, authorization: &Authorization) -> Result<Authorization> {
        let url = self.endpoint(AUTHORIZATIONS_PATH);
        tracing::debug!(
            "POST {} permissions={}",
            url,
            authorization.permissions.len()
        );
        self.send(self.authorized(self.http.post(&url)).json(authorization))
            .await
    }

    async fn find_authorizations_by_org_id(&self, org_id: &str) -> Result<Vec<Authorization>> {
        let url = self.endpoint(AUTHORIZATIONS_PATH);
        let mut request = self.authorized(self.http.get(&url));
        if !org_id.is_empty() {
            request = request.query(&[("orgID", org_id)]);
        }
        tracing::debug!("GET {} orgID={}", url, org_id);

        let list: Authorizations = self.send(request).await?;
        Ok(list.authorizations)
    }

    async fn update_authorization_status(
        &self,
        id: &str,
        status: AuthorizationStatus,
    ) -> Result<Authorization> {
        let id = require_id(Some(id), "authorization")?;
        let url = format!("{}/{}", self.endpoint(AUTHORIZATIONS_PATH), id);
        tracing::debug!("PATCH {} status={}", url, status);
        self.send(
            self.authorized(self.http.patch(&url))
                .json(&AuthorizationStatusRequest { status }),
        )
        .await
    }

    async fn delete_authorization(&self, id: &str) -> Result<()> {
        let id = require_id(Some(id), "authorization")?;
        let url = format!("{}/{}", self.endpoint(AUTHORIZATIONS_PATH), id);
        tracing::debug!("DELETE {}", url);
        self.send_empty(self.authorized(self.http.delete(&url)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_url_trailing_slash_removed() {
        let client = HttpClient::new("http://localhost:8086/", "token").unwrap();
        assert_eq!(client.server_url(), "http://localhost:8086");
        assert_eq!(
            client.endpoint(BUCKETS_PATH),
            "http://localhost:8086/api/v2/buckets"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = HttpClient::new("http://localhost:8086", "secret-token").unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("http://localhost:8086"));
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(matches!(
            HttpClient::new("not a url", "token"),
            Err(ClientError::InvalidUrl { .. })
        ));
        assert!(matches!(
            HttpClient::new("ftp://influx:8086", "token"),
            Err(ClientError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_api_error_from_influx_body() {
        let err = api_error(
            reqwest::StatusCode::NOT_FOUND,
            br#"{"code":"not found","message":"bucket not found"}"#,
        );
        assert_eq!(err.to_string(), "not found: bucket not found");
        assert!(matches!(err, ClientError::Api { status: 404, .. }));
    }

    #[test]
    fn test_api_error_without_body() {
        let err = api_error(reqwest::StatusCode::BAD_GATEWAY, b"upstream down");
        assert_eq!(err.to_string(), "bad gateway: upstream down");
        assert!(matches!(err, ClientError::Api { status: 502, .. }));
    }

    #[test]
    fn test_requests_require_id() {
        assert!(require_id(None, "bucket").is_err());
        assert!(require_id(Some(""), "bucket").is_err());
        assert_eq!(require_id(Some("b1"), "bucket").unwrap(), "b1");
    }
}
