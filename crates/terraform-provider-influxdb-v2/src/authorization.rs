//! `influxdb-v2_authorization` resource
//!
//! The server has no get-by-id endpoint for authorizations; reads list the
//! organization's authorizations and search for the ID. Only `status` can be
//! changed in place.

use crate::error::{ProviderError, Result, remote};
use async_trait::async_trait;
use influxdb2_client::{
    Authorization, AuthorizationStatus, InfluxClient, Permission, PermissionAction,
    PermissionResource,
};
use influxdb2_provider_framework::{
    Attribute, Context, Diagnostics, DynamicResource, FrameworkError, NestedObject, Resource,
    Schema,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationModel {
    pub id: Option<String>,
    pub org_id: String,
    pub description: String,
    pub status: String,
    pub permissions: BTreeSet<PermissionModel>,
    pub user_id: Option<String>,
    pub user_org_id: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionModel {
    pub action: String,
    pub resource: BTreeSet<PermissionResourceModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionResourceModel {
    pub id: String,
    pub org: String,
    pub org_id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
}

impl AuthorizationModel {
    fn status(&self) -> Result<AuthorizationStatus> {
        self.status.parse().map_err(ProviderError::Conversion)
    }

    /// One remote permission per (permission, resource) pair
    fn permissions_to_remote(&self) -> Result<Vec<Permission>> {
        let mut permissions = Vec::new();
        for permission in &self.permissions {
            let action: PermissionAction =
                permission.action.parse().map_err(ProviderError::Conversion)?;
            for resource in &permission.resource {
                permissions.push(Permission {
                    action,
                    resource: PermissionResource {
                        resource_type: resource.resource_type.clone(),
                        id: Some(resource.id.clone()),
                        name: None,
                        org_id: Some(resource.org_id.clone()),
                        org: Some(resource.org.clone()).filter(|org| !org.is_empty()),
                    },
                });
            }
        }
        Ok(permissions)
    }

    /// Refresh the fields the server reports; permissions and description
    /// stay as planned
    fn refresh(&mut self, authorization: Authorization) {
        if let Some(status) = authorization.status {
            self.status = status.to_string();
        }
        if let Some(user_id) = authorization.user_id {
            self.user_id = Some(user_id);
        }
        if let Some(org_id) = authorization.org_id {
            if self.org_id.is_empty() {
                self.org_id = org_id.clone();
            }
            self.user_org_id = Some(org_id);
        }
        if let Some(token) = authorization.token {
            self.token = Some(token);
        }
    }
}

#[derive(Default)]
pub struct AuthorizationResource {
    client: Option<Arc<dyn InfluxClient>>,
}

impl AuthorizationResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory() -> Box<dyn DynamicResource<Arc<dyn InfluxClient>>> {
        Box::new(Self::new())
    }

    fn client(&self) -> std::result::Result<&dyn InfluxClient, FrameworkError> {
        self.client.as_deref().ok_or(FrameworkError::NotConfigured)
    }

    async fn read_authorization(&self, ctx: &Context, model: &mut AuthorizationModel) -> Result<()> {
        let client = self.client()?;
        let id = model.id.clone().unwrap_or_default();

        let authorizations = remote(
            ctx,
            client
                .authorizations_api()
                .find_authorizations_by_org_id(&model.org_id),
        )
        .await?;

        let found = authorizations
            .into_iter()
            .find(|a| a.id.as_deref() == Some(id.as_str()))
            .ok_or_else(|| ProviderError::NotFound("authorization".to_string()))?;

        model.refresh(found);
        Ok(())
    }
}

#[async_trait]
impl Resource for AuthorizationResource {
    type Data = Arc<dyn InfluxClient>;
    type Model = AuthorizationModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_authorization", provider_type_name)
    }

    fn schema(&self) -> Schema {
        let resource = NestedObject::new()
            .with_attribute("id", Attribute::required_string("Resource ID."))
            .with_attribute(
                "org",
                Attribute::optional_string("Organization name.").with_default(json!("")),
            )
            .with_attribute("org_id", Attribute::required_string("Organization ID."))
            .with_attribute(
                "type",
                Attribute::required_string("Resource type (e.g., 'buckets', 'dashboards')."),
            );

        let permission = NestedObject::new()
            .with_attribute(
                "action",
                Attribute::required_string("Permission action (e.g., 'read', 'write')."),
            )
            .with_attribute(
                "resource",
                Attribute::required_set(resource, "Resources the permission applies to."),
            );

        Schema::new("Manages an InfluxDB v2 authorization (API token).")
            .with_attribute(
                "id",
                Attribute::computed_string("The ID of the authorization.").use_state_for_unknown(),
            )
            .with_attribute(
                "org_id",
                Attribute::required_string("The organization ID.").requires_replace(),
            )
            .with_attribute(
                "description",
                Attribute::optional_string("The description of the authorization.")
                    .with_default(json!(""))
                    .requires_replace(),
            )
            .with_attribute(
                "status",
                Attribute::optional_string(
                    "Status of the authorization. Valid values are 'active' or 'inactive'.",
                )
                .with_default(json!("active"))
                .one_of(&["active", "inactive"]),
            )
            .with_attribute(
                "permissions",
                Attribute::required_set(permission, "List of permissions for the authorization.")
                    .requires_replace(),
            )
            .with_attribute(
                "user_id",
                Attribute::computed_string("The user ID associated with the authorization.")
                    .use_state_for_unknown(),
            )
            .with_attribute(
                "user_org_id",
                Attribute::computed_string("The organization ID of the user.")
                    .use_state_for_unknown(),
            )
            .with_attribute(
                "token",
                Attribute::computed_string(
                    "The authorization token. This is sensitive and should be stored securely.",
                )
                .sensitive()
                .use_state_for_unknown(),
            )
    }

    fn configure(&mut self, client: Arc<dyn InfluxClient>) {
        self.client = Some(client);
    }

    async fn create(
        &self,
        ctx: &Context,
        mut plan: AuthorizationModel,
    ) -> std::result::Result<AuthorizationModel, Diagnostics> {
        let client = self.client()?;
        let permissions = plan.permissions_to_remote().map_err(|e| {
            e.report("Error Converting Permissions", "Could not convert permissions")
        })?;
        let status = plan.status().map_err(|e| {
            e.report("Error Converting Status", "Could not convert authorization status")
        })?;

        tracing::debug!(permissions_count = permissions.len(), "Creating authorization");

        let request = Authorization {
            org_id: Some(plan.org_id.clone()),
            description: Some(plan.description.clone()),
            status: Some(status),
            permissions,
            ..Default::default()
        };

        let created = remote(ctx, client.authorizations_api().create_authorization(&request))
            .await
            .and_then(|created| match created.id.clone() {
                Some(id) => Ok((id, created)),
                None => Err(ProviderError::MissingField("authorization ID")),
            })
            .map_err(|e| {
                e.report(
                    "Error Creating Authorization",
                    "Could not create authorization",
                )
            })?;

        let (id, created) = created;
        plan.id = Some(id);
        plan.token = created.token;
        plan.user_id = created.user_id;
        plan.user_org_id = created.org_id;

        tracing::trace!(id = ?plan.id, "Created authorization");
        Ok(plan)
    }

    async fn read(
        &self,
        ctx: &Context,
        mut state: AuthorizationModel,
    ) -> std::result::Result<AuthorizationModel, Diagnostics> {
        self.read_authorization(ctx, &mut state)
            .await
            .map_err(|e| {
                e.report(
                    "Error Reading Authorization",
                    &format!(
                        "Could not read authorization ID {}",
                        state.id.as_deref().unwrap_or_default()
                    ),
                )
            })?;
        Ok(state)
    }

    async fn update(
        &self,
        ctx: &Context,
        mut plan: AuthorizationModel,
        prior: AuthorizationModel,
    ) -> std::result::Result<AuthorizationModel, Diagnostics> {
        let client = self.client()?;
        let status = plan.status().map_err(|e| {
            e.report("Error Converting Status", "Could not convert authorization status")
        })?;
        if plan.id.is_none() {
            plan.id = prior.id;
        }
        if plan.token.is_none() {
            plan.token = prior.token;
        }
        let id = plan.id.clone().unwrap_or_default();

        tracing::debug!(id = %id, status = %status, "Updating authorization status");

        remote(
            ctx,
            client
                .authorizations_api()
                .update_authorization_status(&id, status),
        )
        .await
        .map_err(|e| {
            e.report(
                "Error Updating Authorization",
                "Could not update authorization status",
            )
        })?;

        self.read_authorization(ctx, &mut plan).await.map_err(|e| {
            e.report(
                "Error Reading Authorization After Update",
                "Could not read authorization after update",
            )
        })?;

        Ok(plan)
    }

    async fn delete(
        &self,
        ctx: &Context,
        state: AuthorizationModel,
    ) -> std::result::Result<(), Diagnostics> {
        let client = self.client()?;
        let id = state.id.unwrap_or_default();

        tracing::debug!(id = %id, "Deleting authorization");

        remote(ctx, client.authorizations_api().delete_authorization(&id))
            .await
            .map_err(|e| {
                e.report(
                    "Error Deleting Authorization",
                    "Could not delete authorization",
                )
            })?;

        tracing::trace!(id = %id, "Deleted authorization");
        Ok(())
    }
}
