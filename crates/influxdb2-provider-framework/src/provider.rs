//! Provider, resource and data source traits
//!
//! Implementations work with typed models. The `Dynamic*` traits are the
//! object-safe JSON boundary the [`ProviderServer`](crate::ProviderServer)
//! dispatches through; they are implemented for every typed implementation.

use crate::context::Context;
use crate::diagnostics::Diagnostics;
use crate::error::FrameworkError;
use crate::schema::Schema;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// Builds one unconfigured resource instance
pub type ResourceFactory<D> = fn() -> Box<dyn DynamicResource<D>>;

/// Builds one unconfigured data source instance
pub type DataSourceFactory<D> = fn() -> Box<dyn DynamicDataSource<D>>;

/// Provider abstraction
///
/// `Data` is whatever the provider hands to its resources and data sources
/// once configured (typically a shared API client).
#[async_trait]
pub trait Provider: Send + Sync {
    type Config: DeserializeOwned + Send;
    type Data: Clone + Send + Sync + 'static;

    /// Prefix of every resource and data source type name
    fn type_name(&self) -> &str;

    fn version(&self) -> &str;

    fn schema(&self) -> Schema;

    /// Resolve the configuration and build the shared data
    async fn configure(&self, ctx: &Context, config: Self::Config)
    -> Result<Self::Data, Diagnostics>;

    fn resources(&self) -> Vec<ResourceFactory<Self::Data>>;

    fn data_sources(&self) -> Vec<DataSourceFactory<Self::Data>>;
}

/// Managed resource
#[async_trait]
pub trait Resource: Send + Sync {
    type Data: Send + Sync;
    type Model: Serialize + DeserializeOwned + Send + Sync;

    /// Full type name for the given provider type name
    fn metadata(&self, provider_type_name: &str) -> String;

    fn schema(&self) -> Schema;

    fn configure(&mut self, data: Self::Data);

    async fn create(&self, ctx: &Context, plan: Self::Model) -> Result<Self::Model, Diagnostics>;

    async fn read(&self, ctx: &Context, state: Self::Model) -> Result<Self::Model, Diagnostics>;

    async fn update(
        &self,
        ctx: &Context,
        plan: Self::Model,
        prior: Self::Model,
    ) -> Result<Self::Model, Diagnostics>;

    async fn delete(&self, ctx: &Context, state: Self::Model) -> Result<(), Diagnostics>;

    /// Initial state for importing `id`; it is completed by a read.
    /// Defaults to passing the identifier through as the `id` attribute.
    fn import_state(&self, id: &str) -> Result<Value, Diagnostics> {
        Ok(json!({ "id": id }))
    }
}

/// Read-only data source
#[async_trait]
pub trait DataSource: Send + Sync {
    type Data: Send + Sync;
    type Model: Serialize + DeserializeOwned + Send + Sync;

    fn metadata(&self, provider_type_name: &str) -> String;

    fn schema(&self) -> Schema;

    fn configure(&mut self, data: Self::Data);

    async fn read(&self, ctx: &Context, config: Self::Model) -> Result<Self::Model, Diagnostics>;
}

/// Object-safe view of a [`Resource`] working on JSON objects
#[async_trait]
pub trait DynamicResource<D>: Send + Sync {
    fn metadata(&self, provider_type_name: &str) -> String;

    fn schema(&self) -> Schema;

    fn configure(&mut self, data: D);

    async fn create(&self, ctx: &Context, planned: Value) -> Result<Value, Diagnostics>;

    async fn read(&self, ctx: &Context, state: Value) -> Result<Value, Diagnostics>;

    async fn update(&self, ctx: &Context, planned: Value, prior: Value)
    -> Result<Value, Diagnostics>;

    async fn delete(&self, ctx: &Context, state: Value) -> Result<(), Diagnostics>;

    fn import_state(&self, id: &str) -> Result<Value, Diagnostics>;
}

/// Object-safe view of a [`DataSource`]
#[async_trait]
pub trait DynamicDataSource<D>: Send + Sync {
    fn metadata(&self, provider_type_name: &str) -> String;

    fn schema(&self) -> Schema;

    fn configure(&mut self, data: D);

    async fn read(&self, ctx: &Context, config: Value) -> Result<Value, Diagnostics>;
}

/// Decode a JSON object into a typed model
pub fn decode<M: DeserializeOwned>(value: Value, target: &str) -> Result<M, Diagnostics> {
    serde_json::from_value(value).map_err(|e| {
        FrameworkError::TypeMismatch {
            target: target.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Encode a typed model into a JSON object
pub fn encode<M: Serialize>(model: &M, target: &str) -> Result<Value, Diagnostics> {
    serde_json::to_value(model).map_err(|e| {
        FrameworkError::TypeMismatch {
            target: target.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

#[async_trait]
impl<R> DynamicResource<R::Data> for R
where
    R: Resource,
    R::Data: 'static,
{
    fn metadata(&self, provider_type_name: &str) -> String {
        Resource::metadata(self, provider_type_name)
    }

    fn schema(&self) -> Schema {
        Resource::schema(self)
    }

    fn configure(&mut self, data: R::Data) {
        Resource::configure(self, data)
    }

    async fn create(&self, ctx: &Context, planned: Value) -> Result<Value, Diagnostics> {
        let plan = decode(planned, "planned state")?;
        let state = Resource::create(self, ctx, plan).await?;
        encode(&state, "new state")
    }

    async fn read(&self, ctx: &Context, state: Value) -> Result<Value, Diagnostics> {
        let prior = decode(state, "prior state")?;
        let state = Resource::read(self, ctx, prior).await?;
        encode(&state, "new state")
    }

    async fn update(
        &self,
        ctx: &Context,
        planned: Value,
        prior: Value,
    ) -> Result<Value, Diagnostics> {
        let plan = decode(planned, "planned state")?;
        let prior = decode(prior, "prior state")?;
        let state = Resource::update(self, ctx, plan, prior).await?;
        encode(&state, "new state")
    }

    async fn delete(&self, ctx: &Context, state: Value) -> Result<(), Diagnostics> {
        let state = decode(state, "prior state")?;
        Resource::delete(self, ctx, state).await
    }

    fn import_state(&self, id: &str) -> Result<Value, Diagnostics> {
        Resource::import_state(self, id)
    }
}

#[async_trait]
impl<S> DynamicDataSource<S::Data> for S
where
    S: DataSource,
    S::Data: 'static,
{
    fn metadata(&self, provider_type_name: &str) -> String {
        DataSource::metadata(self, provider_type_name)
    }

    fn schema(&self) -> Schema {
        DataSource::schema(self)
    }

    fn configure(&mut self, data: S::Data) {
        DataSource::configure(self, data)
    }

    async fn read(&self, ctx: &Context, config: Value) -> Result<Value, Diagnostics> {
        let config = decode(config, "data source configuration")?;
        let state = DataSource::read(self, ctx, config).await?;
        encode(&state, "data source state")
    }
}
