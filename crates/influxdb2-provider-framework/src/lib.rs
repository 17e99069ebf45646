//! Provider framework for the InfluxDB v2 provider
//!
//! A small plugin layer in the shape of a Terraform provider: schemas with
//! plan modifiers, plan computation, typed resource/data source traits and a
//! registry that dispatches host requests to them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                ProviderServer<P>                 │
//! │   configure / plan / apply / read / import       │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │  plan + schema │ │  registry of  │
//! │  (validation,  │ │ Dynamic* impls│
//! │   defaults)    │ │  by type name │
//! └───────────────┘ └───────┬───────┘
//!                           │
//!                   ┌───────▼───────┐
//!                   │ typed Resource │
//!                   │ / DataSource   │
//!                   └───────────────┘
//! ```

pub mod context;
pub mod diagnostics;
pub mod error;
pub mod plan;
pub mod provider;
pub mod schema;
pub mod server;

// Re-exports
pub use context::Context;
pub use diagnostics::{AttributePath, Diagnostic, Diagnostics, PathStep, Severity};
pub use error::{FrameworkError, Result};
pub use plan::{ActionType, PlannedChange, normalize, plan_resource_change, validate_config, values_equal};
pub use provider::{
    DataSource, DataSourceFactory, DynamicDataSource, DynamicResource, Provider, Resource,
    ResourceFactory, decode, encode,
};
pub use schema::{
    Attribute, AttributeKind, AttributeMode, NestedObject, PlanModifier, Schema, Validator,
};
pub use server::{AppliedChange, ProviderSchemas, ProviderServer};
