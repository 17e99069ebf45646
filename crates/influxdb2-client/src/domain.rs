//! Wire types of the InfluxDB v2 HTTP API
//!
//! Field names follow the JSON documents the server exchanges
//! (`orgID`, `everySeconds`, ...). Optional fields are omitted when unset so
//! that create and update bodies only carry what the caller provided.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `GET /ready` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ready {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<FixedOffset>>,

    /// Uptime as reported by the server (Go duration string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<String>,
}

/// Bucket type reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketType {
    User,
    System,
}

impl fmt::Display for BucketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketType::User => write!(f, "user"),
            BucketType::System => write!(f, "system"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionRule {
    /// Rule type; the server only knows `expire`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<String>,

    /// Duration in seconds for how long data is kept. 0 means infinite.
    pub every_seconds: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_group_duration_seconds: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub bucket_type: Option<BucketType>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "orgID", default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp: Option<String>,

    #[serde(default)]
    pub retention_rules: Vec<RetentionRule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<FixedOffset>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<FixedOffset>>,
}

/// Body of `PATCH /api/v2/buckets/{id}`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PatchBucketRequest<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rp: Option<&'a str>,
    pub retention_rules: &'a [RetentionRule],
}

impl<'a> From<&'a Bucket> for PatchBucketRequest<'a> {
    fn from(bucket: &'a Bucket) -> Self {
        Self {
            name: &bucket.name,
            description: bucket.description.as_deref(),
            rp: bucket.rp.as_deref(),
            retention_rules: &bucket.retention_rules,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    #[default]
    Active,
    Inactive,
}

impl fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorizationStatus::Active => write!(f, "active"),
            AuthorizationStatus::Inactive => write!(f, "inactive"),
        }
    }
}

impl FromStr for AuthorizationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AuthorizationStatus::Active),
            "inactive" => Ok(AuthorizationStatus::Inactive),
            other => Err(format!(
                "unknown authorization status '{}', expected 'active' or 'inactive'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction {
    Read,
    Write,
}

impl fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionAction::Read => write!(f, "read"),
            PermissionAction::Write => write!(f, "write"),
        }
    }
}

impl FromStr for PermissionAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(PermissionAction::Read),
            "write" => Ok(PermissionAction::Write),
            other => Err(format!(
                "unknown permission action '{}', expected 'read' or 'write'",
                other
            )),
        }
    }
}

/// Target of a permission (`buckets`, `dashboards`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionResource {
    #[serde(rename = "type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "orgID", default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub action: PermissionAction,
    pub resource: PermissionResource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Issued secret; only returned by the create call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AuthorizationStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "orgID", default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,

    #[serde(rename = "userID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default)]
    pub permissions: Vec<Permission>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<FixedOffset>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<FixedOffset>>,
}

/// `GET /api/v2/authorizations` envelope
#[derive(Debug, Deserialize)]
pub(crate) struct Authorizations {
    #[serde(default)]
    pub authorizations: Vec<Authorization>,
}

/// Body of `PATCH /api/v2/authorizations/{id}`
#[derive(Debug, Serialize)]
pub(crate) struct AuthorizationStatusRequest {
    pub status: AuthorizationStatus,
}

/// Error document returned by the server on non-2xx responses
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
