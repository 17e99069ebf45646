//! Schema description for providers, resources and data sources

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Schema of a provider configuration block, a resource or a data source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub version: i64,
    pub description: String,
    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            version: 0,
            description: description.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }
}

/// Attributes of each element of a nested set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NestedObject {
    pub attributes: BTreeMap<String, Attribute>,
}

impl NestedObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeKind {
    String,
    Int64,
    Bool,
    /// Unordered collection of objects
    Set { nested: NestedObject },
}

impl AttributeKind {
    pub fn name(&self) -> &'static str {
        match self {
            AttributeKind::String => "string",
            AttributeKind::Int64 => "number",
            AttributeKind::Bool => "bool",
            AttributeKind::Set { .. } => "set of objects",
        }
    }
}

/// Who supplies the attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeMode {
    Required,
    Optional,
    /// Set by the provider only
    Computed,
    /// Configurable, otherwise filled by a default or the provider
    OptionalComputed,
}

impl AttributeMode {
    pub fn is_computed(self) -> bool {
        matches!(self, AttributeMode::Computed | AttributeMode::OptionalComputed)
    }

    pub fn is_configurable(self) -> bool {
        !matches!(self, AttributeMode::Computed)
    }
}

/// Plan-time behaviour of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanModifier {
    /// Keep the prior state value instead of marking the attribute unknown
    UseStateForUnknown,
    /// A change destroys and recreates the resource
    RequiresReplace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    OneOf(Vec<String>),
}

impl Validator {
    /// Error detail when `value` is rejected
    pub fn check(&self, value: &Value) -> Option<String> {
        match self {
            Validator::OneOf(allowed) => {
                let s = value.as_str()?;
                if allowed.iter().any(|a| a == s) {
                    None
                } else {
                    Some(format!(
                        "value must be one of: {}, got: \"{}\"",
                        allowed
                            .iter()
                            .map(|a| format!("\"{}\"", a))
                            .collect::<Vec<_>>()
                            .join(", "),
                        s
                    ))
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    #[serde(flatten)]
    pub kind: AttributeKind,
    pub mode: AttributeMode,
    pub description: String,
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub plan_modifiers: Vec<PlanModifier>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
}

impl Attribute {
    pub fn new(kind: AttributeKind, mode: AttributeMode, description: impl Into<String>) -> Self {
        Self {
            kind,
            mode,
            description: description.into(),
            sensitive: false,
            default: None,
            plan_modifiers: Vec::new(),
            validators: Vec::new(),
        }
    }

    pub fn required_string(description: impl Into<String>) -> Self {
        Self::new(AttributeKind::String, AttributeMode::Required, description)
    }

    pub fn optional_string(description: impl Into<String>) -> Self {
        Self::new(AttributeKind::String, AttributeMode::Optional, description)
    }

    pub fn computed_string(description: impl Into<String>) -> Self {
        Self::new(AttributeKind::String, AttributeMode::Computed, description)
    }

    pub fn required_int64(description: impl Into<String>) -> Self {
        Self::new(AttributeKind::Int64, AttributeMode::Required, description)
    }

    pub fn computed_bool(description: impl Into<String>) -> Self {
        Self::new(AttributeKind::Bool, AttributeMode::Computed, description)
    }

    pub fn required_set(nested: NestedObject, description: impl Into<String>) -> Self {
        Self::new(
            AttributeKind::Set { nested },
            AttributeMode::Required,
            description,
        )
    }

    /// Static default applied at plan time; makes the attribute optional+computed
    pub fn with_default(mut self, default: Value) -> Self {
        self.mode = AttributeMode::OptionalComputed;
        self.default = Some(default);
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn requires_replace(mut self) -> Self {
        self.plan_modifiers.push(PlanModifier::RequiresReplace);
        self
    }

    pub fn use_state_for_unknown(mut self) -> Self {
        self.plan_modifiers.push(PlanModifier::UseStateForUnknown);
        self
    }

    pub fn one_of(mut self, allowed: &[&str]) -> Self {
        self.validators.push(Validator::OneOf(
            allowed.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    pub fn has_modifier(&self, modifier: PlanModifier) -> bool {
        self.plan_modifiers.contains(&modifier)
    }

    /// Whether `value` (non-null) has the JSON shape of this attribute's kind
    pub fn kind_matches(&self, value: &Value) -> bool {
        match &self.kind {
            AttributeKind::String => value.is_string(),
            AttributeKind::Int64 => value.is_i64(),
            AttributeKind::Bool => value.is_boolean(),
            AttributeKind::Set { .. } => value.is_array(),
        }
    }
}
