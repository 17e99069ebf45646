//! Provider server: registry and dispatch
//!
//! Holds one instance of every resource and data source the provider
//! registers, keyed by full type name, and routes host requests to them.

use crate::context::Context;
use crate::diagnostics::Diagnostics;
use crate::error::{FrameworkError, Result};
use crate::plan::{self, ActionType, PlannedChange};
use crate::provider::{DynamicDataSource, DynamicResource, Provider, decode};
use crate::schema::Schema;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Every schema the provider exposes
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSchemas {
    pub provider: Schema,
    pub resource_schemas: BTreeMap<String, Schema>,
    pub data_source_schemas: BTreeMap<String, Schema>,
}

/// Outcome of applying a planned change.
///
/// `new_state` is what exists remotely once apply returns, even when it
/// failed: a replacement whose create fails after the delete succeeded
/// leaves `None` here alongside the error.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedChange {
    pub new_state: Option<Value>,
    pub diagnostics: Diagnostics,
}

impl AppliedChange {
    fn succeeded(new_state: Option<Value>) -> Self {
        Self {
            new_state,
            diagnostics: Diagnostics::new(),
        }
    }

    fn failed(new_state: Option<Value>, diagnostics: Diagnostics) -> Self {
        Self {
            new_state,
            diagnostics,
        }
    }

    /// `result` is the remote outcome; `fallback` the state kept when it failed
    fn settle(
        result: std::result::Result<Option<Value>, Diagnostics>,
        fallback: Option<Value>,
    ) -> Self {
        match result {
            Ok(new_state) => Self::succeeded(new_state),
            Err(diags) => Self::failed(fallback, diags),
        }
    }

    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }

    /// The new state, or the diagnostics when an error was collected
    pub fn into_result(self) -> std::result::Result<Option<Value>, Diagnostics> {
        self.diagnostics.into_result(self.new_state)
    }
}

pub struct ProviderServer<P: Provider> {
    provider: P,
    resources: BTreeMap<String, Box<dyn DynamicResource<P::Data>>>,
    data_sources: BTreeMap<String, Box<dyn DynamicDataSource<P::Data>>>,
    configured: bool,
}

impl<P: Provider> ProviderServer<P> {
    /// Instantiate every registered resource and data source
    pub fn new(provider: P) -> Result<Self> {
        let type_name = provider.type_name().to_string();

        let mut resources = BTreeMap::new();
        for factory in provider.resources() {
            let resource = factory();
            let name = resource.metadata(&type_name);
            if resources.insert(name.clone(), resource).is_some() {
                return Err(FrameworkError::DuplicateTypeName(name));
            }
        }

        let mut data_sources = BTreeMap::new();
        for factory in provider.data_sources() {
            let data_source = factory();
            let name = data_source.metadata(&type_name);
            if data_sources.insert(name.clone(), data_source).is_some() {
                return Err(FrameworkError::DuplicateTypeName(name));
            }
        }

        tracing::debug!(
            provider = %type_name,
            resources = resources.len(),
            data_sources = data_sources.len(),
            "Provider registered"
        );

        Ok(Self {
            provider,
            resources,
            data_sources,
            configured: false,
        })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn resource_types(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    pub fn data_source_types(&self) -> Vec<&str> {
        self.data_sources.keys().map(String::as_str).collect()
    }

    pub fn schemas(&self) -> ProviderSchemas {
        ProviderSchemas {
            provider: self.provider.schema(),
            resource_schemas: self
                .resources
                .iter()
                .map(|(name, r)| (name.clone(), r.schema()))
                .collect(),
            data_source_schemas: self
                .data_sources
                .iter()
                .map(|(name, d)| (name.clone(), d.schema()))
                .collect(),
        }
    }

    /// Validate and resolve the provider configuration, then hand the
    /// resulting data to every resource and data source.
    pub async fn configure(&mut self, ctx: &Context, config: Value) -> std::result::Result<(), Diagnostics> {
        plan::validate_config(&self.provider.schema(), &config).into_result(())?;
        let config: P::Config = decode(config, "provider configuration")?;

        let data = self.provider.configure(ctx, config).await?;

        for resource in self.resources.values_mut() {
            resource.configure(data.clone());
        }
        for data_source in self.data_sources.values_mut() {
            data_source.configure(data.clone());
        }
        self.configured = true;

        tracing::info!(provider = %self.provider.type_name(), "Provider configured");
        Ok(())
    }

    fn resource(&self, type_name: &str) -> Result<&dyn DynamicResource<P::Data>> {
        self.resources
            .get(type_name)
            .map(|r| r.as_ref())
            .ok_or_else(|| FrameworkError::UnknownResourceType(type_name.to_string()))
    }

    fn configured_resource(&self, type_name: &str) -> Result<&dyn DynamicResource<P::Data>> {
        let resource = self.resource(type_name)?;
        if !self.configured {
            return Err(FrameworkError::NotConfigured);
        }
        Ok(resource)
    }

    fn configured_data_source(&self, type_name: &str) -> Result<&dyn DynamicDataSource<P::Data>> {
        let data_source = self
            .data_sources
            .get(type_name)
            .map(|d| d.as_ref())
            .ok_or_else(|| FrameworkError::UnknownDataSourceType(type_name.to_string()))?;
        if !self.configured {
            return Err(FrameworkError::NotConfigured);
        }
        Ok(data_source)
    }

    /// Plan the change from `prior` to `config`; no remote call is made
    pub fn plan_resource_change(
        &self,
        type_name: &str,
        prior: Option<&Value>,
        config: Option<&Value>,
    ) -> std::result::Result<PlannedChange, Diagnostics> {
        let resource = self.resource(type_name)?;
        let change = plan::plan_resource_change(&resource.schema(), prior, config)?;
        tracing::debug!(resource_type = %type_name, action = %change.action, "Planned change");
        Ok(change)
    }

    /// Carry out a planned change.
    ///
    /// A failed create leaves no state, a failed update or delete keeps the
    /// prior state.
    pub async fn apply_resource_change(
        &self,
        ctx: &Context,
        type_name: &str,
        prior: Option<Value>,
        change: &PlannedChange,
    ) -> AppliedChange {
        let resource = match self.configured_resource(type_name) {
            Ok(resource) => resource,
            Err(err) => return AppliedChange::failed(prior, err.into()),
        };
        tracing::debug!(resource_type = %type_name, action = %change.action, "Applying change");

        match change.action {
            ActionType::NoOp => AppliedChange::succeeded(prior),
            ActionType::Create => {
                let result = match planned_state(change) {
                    Ok(planned) => resource.create(ctx, planned).await.map(Some),
                    Err(diags) => Err(diags),
                };
                AppliedChange::settle(result, None)
            }
            ActionType::Update => {
                let result = match (planned_state(change), prior_state(&prior, change.action)) {
                    (Ok(planned), Ok(prior)) => resource.update(ctx, planned, prior).await.map(Some),
                    (Err(diags), _) | (_, Err(diags)) => Err(diags),
                };
                AppliedChange::settle(result, prior)
            }
            ActionType::Replace => {
                let (planned, prior_value) =
                    match (planned_state(change), prior_state(&prior, change.action)) {
                        (Ok(planned), Ok(prior)) => (planned, prior),
                        (Err(diags), _) | (_, Err(diags)) => {
                            return AppliedChange::failed(prior, diags);
                        }
                    };
                if let Err(diags) = resource.delete(ctx, prior_value).await {
                    return AppliedChange::failed(prior, diags);
                }

                match resource.create(ctx, planned).await {
                    Ok(state) => AppliedChange::succeeded(Some(state)),
                    Err(create_diags) => {
                        tracing::warn!(resource_type = %type_name, "Replacement failed after delete");
                        let mut diags = Diagnostics::new();
                        diags.add_warning(
                            "Resource Deleted Before Replacement Failed",
                            format!(
                                "the previous {} was deleted and has been removed from state",
                                type_name
                            ),
                        );
                        diags.extend(create_diags);
                        AppliedChange::failed(None, diags)
                    }
                }
            }
            ActionType::Delete => {
                let result = match prior_state(&prior, change.action) {
                    Ok(prior) => resource.delete(ctx, prior).await.map(|()| None),
                    Err(diags) => Err(diags),
                };
                AppliedChange::settle(result, prior)
            }
        }
    }

    /// Refresh a resource state from the remote system
    pub async fn read_resource(
        &self,
        ctx: &Context,
        type_name: &str,
        state: Value,
    ) -> std::result::Result<Value, Diagnostics> {
        let resource = self.configured_resource(type_name)?;
        resource.read(ctx, state).await
    }

    /// Import an existing remote entity by identifier
    pub async fn import_resource_state(
        &self,
        ctx: &Context,
        type_name: &str,
        id: &str,
    ) -> std::result::Result<Value, Diagnostics> {
        let resource = self.configured_resource(type_name)?;
        let initial = resource.import_state(id)?;
        tracing::debug!(resource_type = %type_name, id = %id, "Importing resource");
        resource.read(ctx, initial).await
    }

    pub async fn read_data_source(
        &self,
        ctx: &Context,
        type_name: &str,
        config: Value,
    ) -> std::result::Result<Value, Diagnostics> {
        let data_source = self.configured_data_source(type_name)?;
        plan::validate_config(&data_source.schema(), &config).into_result(())?;
        data_source.read(ctx, config).await
    }
}

fn planned_state(change: &PlannedChange) -> std::result::Result<Value, Diagnostics> {
    change.planned_state.clone().ok_or_else(|| {
        let mut diags = Diagnostics::new();
        diags.add_error(
            "Invalid Plan",
            format!("a {} plan must carry a planned state", change.action),
        );
        diags
    })
}

fn prior_state(prior: &Option<Value>, action: ActionType) -> std::result::Result<Value, Diagnostics> {
    prior.clone().ok_or_else(|| {
        let mut diags = Diagnostics::new();
        diags.add_error(
            "Invalid Plan",
            format!("a {} plan requires a prior state", action),
        );
        diags
    })
}
