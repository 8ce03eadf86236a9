//! Template document model

use crate::error::{ArmError, Result};
use radius_providers::Properties;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A parsed ARM deployment template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentTemplate {
    #[serde(rename = "$schema", default)]
    pub schema: String,

    #[serde(default)]
    pub content_version: String,

    #[serde(default)]
    pub api_profile: String,

    /// Parameter declarations, name → `{type, defaultValue, ...}`
    #[serde(default)]
    pub parameters: Properties,

    /// Variables in document order, possibly holding expressions
    #[serde(default)]
    pub variables: Properties,

    #[serde(default)]
    pub functions: Vec<Value>,

    /// Provider imports, symbolic name → provider
    #[serde(default)]
    pub imports: BTreeMap<String, ImportSpec>,

    #[serde(default)]
    pub resources: Vec<Properties>,

    /// Outputs, name → `{type, value}`
    #[serde(default)]
    pub outputs: Properties,
}

impl DeploymentTemplate {
    /// Parse a template from its JSON text
    pub fn parse(template: &str) -> Result<Self> {
        Ok(serde_json::from_str(template)?)
    }

    /// Declaration of a template parameter
    pub fn parameter(&self, name: &str) -> Option<&Properties> {
        self.parameters.get(name).and_then(Value::as_object)
    }
}

/// Parse a template from its JSON text
pub fn parse(template: &str) -> Result<DeploymentTemplate> {
    DeploymentTemplate::parse(template)
}

/// An entry of the template's `imports` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSpec {
    pub provider: String,

    #[serde(default)]
    pub version: String,
}

/// Resource group a deployment targets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceGroup {
    pub name: String,

    /// Value returned by `resourceGroup()`, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
}

impl ResourceGroup {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: None,
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = Some(properties);
        self
    }
}

/// Evaluation context for a template
#[derive(Debug, Clone, Default)]
pub struct TemplateOptions {
    pub subscription_id: String,
    pub resource_group: ResourceGroup,

    /// Caller-supplied parameters, name → `{"value": ...}`
    pub parameters: Properties,

    /// Resolve each resource's `properties` during extraction instead of
    /// leaving it for the deployment pass
    pub evaluate_properties_node: bool,
}

impl TemplateOptions {
    pub fn new(subscription_id: impl Into<String>, resource_group: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: ResourceGroup::named(resource_group),
            ..Default::default()
        }
    }

    pub fn with_parameters(mut self, parameters: Properties) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set a single parameter value
    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        let mut entry = Properties::new();
        entry.insert("value".to_string(), value);
        self.parameters.insert(name.into(), Value::Object(entry));
        self
    }
}

/// A resource extracted from a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,

    #[serde(rename = "type")]
    pub resource_type: String,

    pub api_version: String,

    /// `/`-separated hierarchical name
    pub name: String,

    pub depends_on: Vec<String>,

    /// Provider payload: every field except name, type, apiVersion,
    /// dependsOn and import
    pub body: Properties,

    /// Provider selected through an explicit import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<String>,
}

impl Resource {
    /// Deserialize the body into a typed value
    pub fn convert<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.body.clone())).map_err(|e| {
            ArmError::validation(format!(
                "failed to convert resource {} to {}: {}",
                self.id,
                std::any::type_name::<T>(),
                e
            ))
        })
    }

    /// Application name, resource name and resource type of a Radius resource
    ///
    /// A Radius resource is named `radius/<application>[/<resource>]`; the
    /// type is the last segment of the resource type.
    pub fn radius_parts(&self) -> RadiusParts<'_> {
        let names: Vec<&str> = self.name.split('/').collect();
        if names.len() < 2 {
            return RadiusParts::default();
        }

        RadiusParts {
            application: names[1],
            resource: names.get(2).copied().unwrap_or_default(),
            resource_type: self.resource_type.rsplit('/').next().unwrap_or_default(),
        }
    }
}

/// Components of a Radius resource name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadiusParts<'a> {
    pub application: &'a str,
    pub resource: &'a str,
    pub resource_type: &'a str,
}
