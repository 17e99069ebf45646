//! InfluxDB v2 client
//!
//! A small REST client covering the endpoints the InfluxDB v2 provider
//! manages: server readiness, buckets and authorizations.
//!
//! The operations are exposed through the [`InfluxClient`], [`BucketsApi`]
//! and [`AuthorizationsApi`] traits; [`HttpClient`] is the implementation
//! talking to a real server.
//!
//! # Example
//!
//! ```ignore
//! use influxdb2_client::{HttpClient, InfluxClient};
//!
//! let client = HttpClient::new("http://localhost:8086", "my-token")?;
//! let ready = client.ready().await?;
//! println!("{:?}", ready.status);
//!
//! let bucket = client.buckets_api().find_bucket_by_id("0a1b2c3d4e5f6071").await?;
//! ```

pub mod api;
pub mod client;
pub mod domain;
pub mod error;

pub use api::{AuthorizationsApi, BucketsApi, InfluxClient};
pub use client::{ClientOptions, HttpClient};
pub use domain::{
    Authorization, AuthorizationStatus, Bucket, BucketType, Permission, PermissionAction,
    PermissionResource, Ready, RetentionRule,
};
pub use error::{ClientError, Result};
