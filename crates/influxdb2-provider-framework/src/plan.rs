//! Plan computation for managed resources
//!
//! Turns a resource configuration plus its prior state into a planned state
//! and the action needed to reach it:
//!
//! 1. the configuration is validated against the schema (all problems are
//!    collected before returning),
//! 2. static defaults are materialized, recursively into set elements,
//! 3. computed attributes the configuration leaves open become unknown
//!    (`null`) unless they keep their prior value,
//! 4. the planned state is compared with the prior state; a difference on a
//!    `RequiresReplace` attribute means replacement, any other difference an
//!    in-place update.

use crate::diagnostics::{AttributePath, Diagnostics};
use crate::schema::{Attribute, AttributeKind, AttributeMode, PlanModifier, Schema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Type of action needed to reach the planned state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource in place
    Update,
    /// Delete the existing resource, then create it again
    Replace,
    /// Delete a resource
    Delete,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Replace => write!(f, "replace"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Result of planning one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedChange {
    pub action: ActionType,

    /// State the resource should have after apply; `None` for deletion
    pub planned_state: Option<Value>,

    /// Attributes whose change forces replacement
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires_replace: Vec<AttributePath>,
}

impl PlannedChange {
    pub fn has_changes(&self) -> bool {
        self.action != ActionType::NoOp
    }
}

/// Plan a resource change.
///
/// `config` is `None` when the resource was removed from the configuration;
/// `prior` is `None` when it does not exist yet.
pub fn plan_resource_change(
    schema: &Schema,
    prior: Option<&Value>,
    config: Option<&Value>,
) -> Result<PlannedChange, Diagnostics> {
    let Some(config) = config else {
        let action = if prior.is_some() {
            ActionType::Delete
        } else {
            ActionType::NoOp
        };
        return Ok(PlannedChange {
            action,
            planned_state: None,
            requires_replace: Vec::new(),
        });
    };

    validate_config(schema, config).into_result(())?;

    let prior_object = prior.and_then(Value::as_object);
    let Some(prior_object) = prior_object else {
        return Ok(PlannedChange {
            action: ActionType::Create,
            planned_state: Some(materialize(&schema.attributes, config, None)),
            requires_replace: Vec::new(),
        });
    };

    let planned = materialize(&schema.attributes, config, Some(prior_object));
    let mut requires_replace = Vec::new();
    let mut changed = false;

    for (name, attribute) in &schema.attributes {
        if !attribute.mode.is_configurable() {
            continue;
        }
        let before = prior_object.get(name).unwrap_or(&Value::Null);
        let after = planned.get(name).unwrap_or(&Value::Null);
        if values_equal(before, after) {
            continue;
        }
        if attribute.has_modifier(PlanModifier::RequiresReplace) {
            requires_replace.push(AttributePath::root(name.clone()));
        } else {
            changed = true;
        }
    }

    if !requires_replace.is_empty() {
        tracing::debug!(
            "replacement required by {}",
            requires_replace
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        // The replacement is a new remote entity: nothing computed carries over
        return Ok(PlannedChange {
            action: ActionType::Replace,
            planned_state: Some(materialize(&schema.attributes, config, None)),
            requires_replace,
        });
    }

    if changed {
        Ok(PlannedChange {
            action: ActionType::Update,
            planned_state: Some(planned),
            requires_replace,
        })
    } else {
        Ok(PlannedChange {
            action: ActionType::NoOp,
            planned_state: prior.cloned(),
            requires_replace,
        })
    }
}

/// Validate a configuration object, collecting every problem found
pub fn validate_config(schema: &Schema, config: &Value) -> Diagnostics {
    let mut diags = Diagnostics::new();
    validate_object(&schema.attributes, config, &AttributePath::default(), &mut diags);
    diags
}

fn child_path(parent: &AttributePath, name: &str) -> AttributePath {
    if parent.is_empty() {
        AttributePath::root(name)
    } else {
        parent.attribute(name)
    }
}

fn validate_object(
    attributes: &BTreeMap<String, Attribute>,
    value: &Value,
    path: &AttributePath,
    diags: &mut Diagnostics,
) {
    let Some(object) = value.as_object() else {
        diags.push(
            crate::diagnostics::Diagnostic::error(
                "Incorrect Attribute Value Type",
                format!("expected an object, got: {}", value),
            )
            .with_attribute(path.clone()),
        );
        return;
    };

    for key in object.keys() {
        if !attributes.contains_key(key) {
            diags.add_attribute_error(
                child_path(path, key),
                "Unsupported Argument",
                format!("an argument named \"{}\" is not expected here", key),
            );
        }
    }

    for (name, attribute) in attributes {
        let attribute_path = child_path(path, name);
        let value = object.get(name).unwrap_or(&Value::Null);

        if value.is_null() {
            if attribute.mode == AttributeMode::Required {
                diags.add_attribute_error(
                    attribute_path,
                    "Missing Required Argument",
                    format!("the argument \"{}\" is required, but no definition was found", name),
                );
            }
            continue;
        }

        if !attribute.mode.is_configurable() {
            diags.add_attribute_error(
                attribute_path,
                "Invalid Configuration for Read-Only Attribute",
                format!("\"{}\" is computed by the provider and cannot be set", name),
            );
            continue;
        }

        if !attribute.kind_matches(value) {
            diags.add_attribute_error(
                attribute_path,
                "Incorrect Attribute Value Type",
                format!("expected {}, got: {}", attribute.kind.name(), value),
            );
            continue;
        }

        for validator in &attribute.validators {
            if let Some(detail) = validator.check(value) {
                diags.add_attribute_error(
                    attribute_path.clone(),
                    "Invalid Attribute Value",
                    detail,
                );
            }
        }

        if let (AttributeKind::Set { nested }, Some(elements)) = (&attribute.kind, value.as_array())
        {
            for (index, element) in elements.iter().enumerate() {
                validate_object(
                    &nested.attributes,
                    element,
                    &attribute_path.index(index),
                    diags,
                );
            }
        }
    }
}

/// Build the planned object for a (validated) configuration
fn materialize(
    attributes: &BTreeMap<String, Attribute>,
    config: &Value,
    prior: Option<&Map<String, Value>>,
) -> Value {
    let mut planned = Map::new();

    for (name, attribute) in attributes {
        let configured = config.get(name).filter(|v| !v.is_null());

        let value = match (configured, &attribute.kind) {
            (Some(Value::Array(elements)), AttributeKind::Set { nested }) => {
                let mut members: Vec<Value> = Vec::with_capacity(elements.len());
                for element in elements {
                    let member = materialize(&nested.attributes, element, None);
                    if !members.iter().any(|m| values_equal(m, &member)) {
                        members.push(member);
                    }
                }
                Value::Array(members)
            }
            (Some(value), _) => value.clone(),
            (None, _) => {
                if let Some(default) = &attribute.default {
                    default.clone()
                } else if attribute.mode.is_computed()
                    && attribute.has_modifier(PlanModifier::UseStateForUnknown)
                {
                    prior
                        .and_then(|p| p.get(name))
                        .cloned()
                        .unwrap_or(Value::Null)
                } else {
                    Value::Null
                }
            }
        };

        planned.insert(name.clone(), value);
    }

    Value::Object(planned)
}

/// Structural equality where every array is compared as an unordered set
pub fn values_equal(a: &Value, b: &Value) -> bool {
    normalize(a) == normalize(b)
}

/// Canonical form of a value: arrays sorted by their serialized elements,
/// repeated elements collapsed
pub fn normalize(value: &Value) -> Value {
    match value {
        Value::Array(elements) => {
            let mut normalized: Vec<Value> = elements.iter().map(normalize).collect();
            normalized.sort_by_cached_key(|v| v.to_string());
            normalized.dedup();
            Value::Array(normalized)
        }
        Value::Object(object) => Value::Object(
            object
                .iter()
                .map(|(k, v)| (k.clone(), normalize(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
