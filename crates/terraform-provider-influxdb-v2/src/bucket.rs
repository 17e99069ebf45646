//! `influxdb-v2_bucket` resource

use crate::error::{ProviderError, Result, remote};
use crate::timestamp;
use async_trait::async_trait;
use influxdb2_client::{Bucket, InfluxClient, RetentionRule};
use influxdb2_provider_framework::{
    Attribute, Context, Diagnostics, DynamicResource, FrameworkError, NestedObject, Resource,
    Schema,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

const DEFAULT_RULE_TYPE: &str = "expire";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketModel {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub org_id: String,
    pub retention_rules: BTreeSet<RetentionRuleModel>,
    pub rp: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    #[serde(rename = "type")]
    pub bucket_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionRuleModel {
    pub every_seconds: i64,
    #[serde(rename = "type")]
    pub rule_type: String,
}

impl BucketModel {
    fn retention_rules_to_remote(&self) -> Result<Vec<RetentionRule>> {
        self.retention_rules
            .iter()
            .map(|rule| {
                if rule.every_seconds < 0 {
                    return Err(ProviderError::Conversion(format!(
                        "every_seconds must not be negative, got {}",
                        rule.every_seconds
                    )));
                }
                if rule.rule_type.is_empty() {
                    return Err(ProviderError::Conversion(
                        "retention rule type must not be empty".to_string(),
                    ));
                }
                Ok(RetentionRule {
                    rule_type: Some(rule.rule_type.clone()),
                    every_seconds: rule.every_seconds,
                    shard_group_duration_seconds: None,
                })
            })
            .collect()
    }

    fn to_remote(&self, retention_rules: Vec<RetentionRule>) -> Bucket {
        Bucket {
            id: self.id.clone(),
            name: self.name.clone(),
            description: Some(self.description.clone()),
            org_id: Some(self.org_id.clone()),
            rp: Some(self.rp.clone()),
            retention_rules,
            ..Default::default()
        }
    }

    /// Overwrite every field with the server's view of the bucket
    fn refresh(&mut self, bucket: Bucket) {
        self.name = bucket.name;
        self.description = bucket.description.unwrap_or_default();
        if let Some(org_id) = bucket.org_id {
            self.org_id = org_id;
        }
        self.rp = bucket.rp.unwrap_or_default();
        if let Some(created_at) = bucket.created_at {
            self.created_at = Some(timestamp(&created_at));
        }
        if let Some(updated_at) = bucket.updated_at {
            self.updated_at = Some(timestamp(&updated_at));
        }
        if let Some(bucket_type) = bucket.bucket_type {
            self.bucket_type = Some(bucket_type.to_string());
        }
        self.retention_rules = bucket
            .retention_rules
            .into_iter()
            .map(|rule| RetentionRuleModel {
                every_seconds: rule.every_seconds,
                rule_type: rule
                    .rule_type
                    .unwrap_or_else(|| DEFAULT_RULE_TYPE.to_string()),
            })
            .collect();
    }
}

#[derive(Default)]
pub struct BucketResource {
    client: Option<Arc<dyn InfluxClient>>,
}

impl BucketResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory() -> Box<dyn DynamicResource<Arc<dyn InfluxClient>>> {
        Box::new(Self::new())
    }

    fn client(&self) -> std::result::Result<&dyn InfluxClient, FrameworkError> {
        self.client.as_deref().ok_or(FrameworkError::NotConfigured)
    }

    async fn read_bucket(&self, ctx: &Context, model: &mut BucketModel) -> Result<()> {
        let client = self.client()?;
        let id = model.id.clone().unwrap_or_default();
        let bucket = remote(ctx, client.buckets_api().find_bucket_by_id(&id)).await?;
        model.refresh(bucket);
        Ok(())
    }
}

#[async_trait]
impl Resource for BucketResource {
    type Data = Arc<dyn InfluxClient>;
    type Model = BucketModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_bucket", provider_type_name)
    }

    fn schema(&self) -> Schema {
        let retention_rule = NestedObject::new()
            .with_attribute(
                "every_seconds",
                Attribute::required_int64(
                    "Duration in seconds for how long data will be kept in the database. 0 means infinite.",
                )
                .use_state_for_unknown(),
            )
            .with_attribute(
                "type",
                Attribute::optional_string("Retention rule type. Only 'expire' is supported.")
                    .with_default(json!(DEFAULT_RULE_TYPE)),
            );

        Schema::new("Manages an InfluxDB v2 bucket.")
            .with_attribute(
                "id",
                Attribute::computed_string("The ID of the bucket.").use_state_for_unknown(),
            )
            .with_attribute("name", Attribute::required_string("The name of the bucket."))
            .with_attribute(
                "description",
                Attribute::optional_string("The description of the bucket.")
                    .with_default(json!("")),
            )
            .with_attribute(
                "org_id",
                Attribute::required_string("The organization ID.").requires_replace(),
            )
            .with_attribute(
                "retention_rules",
                Attribute::required_set(retention_rule, "Retention rules for the bucket."),
            )
            .with_attribute(
                "rp",
                Attribute::optional_string("The retention policy name.").with_default(json!("")),
            )
            .with_attribute(
                "created_at",
                Attribute::computed_string("Bucket creation date.").use_state_for_unknown(),
            )
            .with_attribute(
                "updated_at",
                Attribute::computed_string("Last bucket update date."),
            )
            .with_attribute(
                "type",
                Attribute::computed_string("The bucket type.").use_state_for_unknown(),
            )
    }

    fn configure(&mut self, client: Arc<dyn InfluxClient>) {
        self.client = Some(client);
    }

    async fn create(
        &self,
        ctx: &Context,
        mut plan: BucketModel,
    ) -> std::result::Result<BucketModel, Diagnostics> {
        let client = self.client()?;
        let retention_rules = plan.retention_rules_to_remote().map_err(|e| {
            e.report("Error Converting Retention Rules", "Could not convert retention rules")
        })?;

        tracing::debug!(name = %plan.name, "Creating bucket");

        let created = remote(
            ctx,
            client
                .buckets_api()
                .create_bucket(&plan.to_remote(retention_rules)),
        )
        .await
        .and_then(|bucket| bucket.id.ok_or(ProviderError::MissingField("bucket ID")))
        .map_err(|e| {
            e.report(
                "Error Creating Bucket",
                "Could not create bucket, unexpected error",
            )
        })?;

        plan.id = Some(created);
        self.read_bucket(ctx, &mut plan).await.map_err(|e| {
            e.report(
                "Error Reading Bucket After Creation",
                "Could not read bucket after creation",
            )
        })?;

        tracing::trace!(id = ?plan.id, "Created bucket");
        Ok(plan)
    }

    async fn read(
        &self,
        ctx: &Context,
        mut state: BucketModel,
    ) -> std::result::Result<BucketModel, Diagnostics> {
        self.read_bucket(ctx, &mut state).await.map_err(|e| {
            e.report(
                "Error Reading Bucket",
                &format!(
                    "Could not read bucket ID {}",
                    state.id.as_deref().unwrap_or_default()
                ),
            )
        })?;
        Ok(state)
    }

    async fn update(
        &self,
        ctx: &Context,
        mut plan: BucketModel,
        prior: BucketModel,
    ) -> std::result::Result<BucketModel, Diagnostics> {
        let client = self.client()?;
        let retention_rules = plan.retention_rules_to_remote().map_err(|e| {
            e.report("Error Converting Retention Rules", "Could not convert retention rules")
        })?;
        if plan.id.is_none() {
            plan.id = prior.id;
        }

        tracing::debug!(id = ?plan.id, "Updating bucket");

        remote(
            ctx,
            client
                .buckets_api()
                .update_bucket(&plan.to_remote(retention_rules)),
        )
        .await
        .map_err(|e| {
            e.report(
                "Error Updating Bucket",
                "Could not update bucket, unexpected error",
            )
        })?;

        self.read_bucket(ctx, &mut plan).await.map_err(|e| {
            e.report(
                "Error Reading Bucket After Update",
                "Could not read bucket after update",
            )
        })?;

        Ok(plan)
    }

    async fn delete(&self, ctx: &Context, state: BucketModel) -> std::result::Result<(), Diagnostics> {
        let client = self.client()?;
        let id = state.id.unwrap_or_default();

        tracing::debug!(id = %id, "Deleting bucket");

        remote(ctx, client.buckets_api().delete_bucket_with_id(&id))
            .await
            .map_err(|e| {
                e.report(
                    "Error Deleting Bucket",
                    "Could not delete bucket, unexpected error",
                )
            })?;

        tracing::trace!(id = %id, "Deleted bucket");
        Ok(())
    }
}
