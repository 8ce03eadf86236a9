//! Deployment driver
//!
//! Second phase of a deployment. Resources extracted by
//! [`extract_skeleton`](crate::extract_skeleton) are deployed one at a time
//! in dependency order; each resource's body is evaluated only once every
//! resource before it has been deployed, so `reference()` sees their output.
//!
//! A failure stops the deployment. Resources deployed before the failure
//! are left in place.

use crate::error::{ArmError, Result};
use crate::eval::{DeploymentEvaluator, HostRequest, Step};
use crate::extract::extract_skeleton;
use crate::template::{DeploymentTemplate, Resource, TemplateOptions};
use radius_providers::{Properties, ProviderError, ProviderRegistry, ResourceId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub(crate) const DEPLOYMENTS_TYPE: &str = "Microsoft.Resources/deployments";

/// Progress of a deployment, one event per resource transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentEvent {
    Started {
        id: String,
        resource_type: String,
        name: String,
    },
    Succeeded {
        id: String,
        resource_type: String,
        name: String,
        provider: String,
    },
    Failed {
        id: String,
        resource_type: String,
        name: String,
        error: String,
    },
}

impl DeploymentEvent {
    pub fn id(&self) -> &str {
        match self {
            DeploymentEvent::Started { id, .. }
            | DeploymentEvent::Succeeded { id, .. }
            | DeploymentEvent::Failed { id, .. } => id,
        }
    }
}

/// A resource as it was handed to, and returned by, its provider
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedResource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub provider: String,
    /// Fully evaluated body sent to the provider
    pub body: Properties,
    /// What the provider returned
    pub output: Properties,
}

/// A resolved template output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentOutput {
    #[serde(rename = "type")]
    pub output_type: String,
    pub value: Value,
}

/// Result of a successful deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeploymentResult {
    /// Deployed resources, in deployment order
    pub resources: Vec<DeployedResource>,
    pub outputs: BTreeMap<String, DeploymentOutput>,
}

impl DeploymentResult {
    /// IDs of the deployed resources, in deployment order
    pub fn ids(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.id.as_str()).collect()
    }
}

/// Deploys templates against a set of providers
#[derive(Debug, Clone)]
pub struct DeploymentDriver {
    registry: ProviderRegistry,
    cancel: CancellationToken,
    events: Option<mpsc::Sender<DeploymentEvent>>,
}

impl DeploymentDriver {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            cancel: CancellationToken::new(),
            events: None,
        }
    }

    /// Stop issuing provider calls once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Report progress on `events`
    pub fn with_events(mut self, events: mpsc::Sender<DeploymentEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Parse and deploy a template given as JSON text
    pub async fn deploy(&self, template: &str, options: TemplateOptions) -> Result<DeploymentResult> {
        let template = DeploymentTemplate::parse(template)?;
        self.deploy_template(template, options).await
    }

    /// Deploy a parsed template: extraction, then resolution and deployment
    pub async fn deploy_template(
        &self,
        template: DeploymentTemplate,
        options: TemplateOptions,
    ) -> Result<DeploymentResult> {
        let resources = extract_skeleton(&template, &options)?;
        tracing::debug!("Deployment order: {} resources", resources.len());
        self.resolve_and_deploy(template, options, resources).await
    }

    /// Deploy already extracted and ordered resources
    pub async fn resolve_and_deploy(
        &self,
        template: DeploymentTemplate,
        options: TemplateOptions,
        resources: Vec<Resource>,
    ) -> Result<DeploymentResult> {
        let mut evaluator = DeploymentEvaluator::new(template, options);
        let mut result = DeploymentResult::default();

        for resource in &resources {
            match self.deploy_resource(&mut evaluator, resource).await {
                Ok(deployed) => {
                    self.emit(DeploymentEvent::Succeeded {
                        id: deployed.id.clone(),
                        resource_type: deployed.resource_type.clone(),
                        name: deployed.name.clone(),
                        provider: deployed.provider.clone(),
                    })
                    .await;
                    result.resources.push(deployed);
                }
                Err(err) => {
                    tracing::error!("Deployment of {} failed: {}", resource.id, err);
                    self.emit(DeploymentEvent::Failed {
                        id: resource.id.clone(),
                        resource_type: resource.resource_type.clone(),
                        name: resource.name.clone(),
                        error: err.to_string(),
                    })
                    .await;
                    return Err(err);
                }
            }
        }

        result.outputs = self.resolve_outputs(&mut evaluator).await?;
        Ok(result)
    }

    #[tracing::instrument(skip(self, evaluator, resource), fields(id = %resource.id))]
    async fn deploy_resource(
        &self,
        evaluator: &mut DeploymentEvaluator,
        resource: &Resource,
    ) -> Result<DeployedResource> {
        self.check_cancelled()?;
        self.emit(DeploymentEvent::Started {
            id: resource.id.clone(),
            resource_type: resource.resource_type.clone(),
            name: resource.name.clone(),
        })
        .await;

        let body = self.resolve_body(evaluator, resource).await?;

        let provider = self
            .registry
            .route(
                resource.import.as_deref(),
                &resource.api_version,
                &resource.resource_type,
            )
            .map_err(ArmError::ProviderRouting)?;

        self.check_cancelled()?;
        tracing::info!(
            "Deploying {} '{}' with provider {}",
            resource.resource_type,
            resource.name,
            provider.name()
        );

        let output = provider
            .deploy_resource(&resource.id, &resource.api_version, body.clone())
            .await
            .map_err(|e| ArmError::provider(&resource.resource_type, &resource.name, e))?;

        evaluator.record_deployed(resource.id.clone(), output.clone());

        Ok(DeployedResource {
            id: resource.id.clone(),
            resource_type: resource.resource_type.clone(),
            name: resource.name.clone(),
            provider: provider.name().to_string(),
            body,
            output,
        })
    }

    /// Evaluate a resource body now that its dependencies are deployed
    ///
    /// The template of a nested deployment with inner expression scope is
    /// passed through untouched; it is evaluated by the nested deployment.
    async fn resolve_body(
        &self,
        evaluator: &mut DeploymentEvaluator,
        resource: &Resource,
    ) -> Result<Properties> {
        let mut body = resource.body.clone();
        let inner_template = if resource.resource_type == DEPLOYMENTS_TYPE && has_inner_scope(&body) {
            body.get_mut("properties")
                .and_then(Value::as_object_mut)
                .and_then(|properties| properties.remove("template"))
        } else {
            None
        };

        let Value::Object(mut body) = self.resolve(evaluator, &Value::Object(body)).await? else {
            return Err(ArmError::evaluation(format!(
                "body of {} did not evaluate to an object",
                resource.id
            )));
        };

        if let Some(template) = inner_template
            && let Some(Value::Object(properties)) = body.get_mut("properties")
        {
            properties.insert("template".to_string(), template);
        }

        Ok(body)
    }

    /// Evaluate `value`, answering host requests through the providers
    async fn resolve(&self, evaluator: &mut DeploymentEvaluator, value: &Value) -> Result<Value> {
        loop {
            match evaluator.try_evaluate(value)? {
                Step::Done(value) => return Ok(value),
                Step::Needs(request) => {
                    let answer = self.answer(&request).await?;
                    evaluator.provide(&request, answer);
                }
            }
        }
    }

    async fn answer(&self, request: &HostRequest) -> Result<Value> {
        let target = ResourceId::parse(request.id()).map_err(|e| ArmError::validation(e.to_string()))?;
        let resource_type = target.resource_type();

        let provider = self
            .registry
            .route(None, request.api_version(), &resource_type)
            .map_err(ArmError::ProviderRouting)?;

        self.check_cancelled()?;
        tracing::debug!("Asking provider {} about {}", provider.name(), target);

        let answer = match request {
            HostRequest::GetDeployedResource { id, api_version } => provider
                .get_deployed_resource(id, api_version)
                .await
                .map(Value::Object),
            HostRequest::CustomAction {
                id,
                api_version,
                action,
                body,
            } => {
                provider
                    .invoke_custom_action(id, api_version, action, body.clone())
                    .await
            }
        };

        answer.map_err(|e| match e {
            ProviderError::ResourceNotFound(_) => request.unanswered(),
            other => ArmError::provider(resource_type.as_str(), target.name(), other),
        })
    }

    async fn resolve_outputs(
        &self,
        evaluator: &mut DeploymentEvaluator,
    ) -> Result<BTreeMap<String, DeploymentOutput>> {
        let outputs = evaluator.template().outputs.clone();
        let mut resolved = BTreeMap::new();

        for (name, output) in &outputs {
            let output_type = output
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            let value = output.get("value").ok_or_else(|| {
                ArmError::validation(format!("output '{}' does not contain a value", name))
            })?;

            let value = self.resolve(evaluator, value).await?;
            resolved.insert(name.clone(), DeploymentOutput { output_type, value });
        }

        Ok(resolved)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            tracing::warn!("Deployment cancelled");
            return Err(ArmError::Cancelled);
        }
        Ok(())
    }

    async fn emit(&self, event: DeploymentEvent) {
        if let Some(events) = &self.events
            && events.send(event).await.is_err()
        {
            tracing::trace!("Deployment event receiver dropped");
        }
    }
}

fn has_inner_scope(body: &Properties) -> bool {
    body.get("properties")
        .and_then(|p| p.get("expressionEvaluationOptions"))
        .and_then(|o| o.get("scope"))
        .and_then(Value::as_str)
        .is_some_and(|scope| scope.eq_ignore_ascii_case("inner"))
}
