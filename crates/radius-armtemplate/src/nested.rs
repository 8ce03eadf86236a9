//! Nested deployments
//!
//! `Microsoft.Resources/deployments` resources carry a whole template in
//! `properties.template`. This provider deploys it with the same providers
//! as the outer deployment and reports its outputs back as the resource's
//! `properties.outputs`.

use crate::deploy::DeploymentDriver;
use crate::template::{DeploymentTemplate, ResourceGroup, TemplateOptions};
use async_trait::async_trait;
use radius_providers::registry::DEPLOYMENT;
use radius_providers::{Properties, Provider, ProviderError, ProviderRegistry, ResourceId, Result};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Provider for the `deployment` identity
#[derive(Debug, Clone)]
pub struct NestedDeploymentProvider {
    /// Providers available to nested templates, this one excluded
    registry: ProviderRegistry,
    resource_group: Option<ResourceGroup>,
    cancel: CancellationToken,
}

impl NestedDeploymentProvider {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            resource_group: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Resource group data for `resourceGroup()` inside nested templates
    /// targeting the same group
    pub fn with_resource_group(mut self, resource_group: ResourceGroup) -> Self {
        self.resource_group = Some(resource_group);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Registry for a nested deployment: the same providers plus this one,
    /// so deployments can nest further
    fn inner_registry(&self) -> ProviderRegistry {
        self.registry
            .clone()
            .with(DEPLOYMENT, std::sync::Arc::new(self.clone()))
    }

    fn scope(&self, id: &ResourceId, properties: &Properties, body: &Properties) -> TemplateOptions {
        let subscription_id = body
            .get("subscriptionId")
            .and_then(Value::as_str)
            .unwrap_or(&id.subscription_id)
            .to_string();
        let resource_group = body
            .get("resourceGroup")
            .and_then(Value::as_str)
            .unwrap_or(&id.resource_group)
            .to_string();

        let resource_group = match &self.resource_group {
            Some(known) if known.name == resource_group => known.clone(),
            _ => ResourceGroup::named(resource_group),
        };

        let parameters = properties
            .get("parameters")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        TemplateOptions {
            subscription_id,
            resource_group,
            parameters,
            evaluate_properties_node: false,
        }
    }
}

#[async_trait]
impl Provider for NestedDeploymentProvider {
    fn name(&self) -> &str {
        DEPLOYMENT
    }

    fn display_name(&self) -> &str {
        "Nested deployments"
    }

    async fn get_deployed_resource(&self, id: &str, _api_version: &str) -> Result<Properties> {
        Err(ProviderError::ResourceNotFound(id.to_string()))
    }

    #[tracing::instrument(skip(self, body))]
    async fn deploy_resource(
        &self,
        id: &str,
        api_version: &str,
        body: Properties,
    ) -> Result<Properties> {
        let resource_id = ResourceId::parse(id)?;

        let properties = body
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                ProviderError::OperationFailed(format!("deployment {} has no properties", id))
            })?;

        if properties.contains_key("templateLink") {
            return Err(ProviderError::OperationFailed(format!(
                "deployment {} uses templateLink, only inline templates are supported",
                id
            )));
        }

        let template = properties.get("template").cloned().ok_or_else(|| {
            ProviderError::OperationFailed(format!("deployment {} has no template", id))
        })?;
        let template: DeploymentTemplate = serde_json::from_value(template)?;

        let options = self.scope(&resource_id, properties, &body);
        tracing::info!(
            "Deploying nested template {} into {}",
            resource_id.name(),
            options.resource_group.name
        );

        let driver = DeploymentDriver::new(self.inner_registry())
            .with_cancellation(self.cancel.child_token());
        let result = driver
            .deploy_template(template, options)
            .await
            .map_err(|e| ProviderError::OperationFailed(e.to_string()))?;

        let output = json!({
            "id": id,
            "name": resource_id.name(),
            "type": resource_id.resource_type(),
            "apiVersion": api_version,
            "properties": {
                "provisioningState": "Succeeded",
                "outputs": result.outputs,
                "outputResources": result
                    .resources
                    .iter()
                    .map(|r| json!({"id": r.id}))
                    .collect::<Vec<_>>(),
            },
        });

        match output {
            Value::Object(map) => Ok(map),
            _ => Ok(Properties::new()),
        }
    }

    async fn invoke_custom_action(
        &self,
        id: &str,
        _api_version: &str,
        action: &str,
        _body: Option<Value>,
    ) -> Result<Value> {
        Err(ProviderError::UnsupportedAction {
            id: id.to_string(),
            action: action.to_string(),
        })
    }
}
