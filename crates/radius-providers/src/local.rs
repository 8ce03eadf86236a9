//! File-backed provider
//!
//! Records deployed resources in the local state store instead of calling a
//! cloud API. Used by `rad deploy` for every identity that has no real
//! backend configured.

use crate::error::{ProviderError, Result};
use crate::id::ResourceId;
use crate::provider::{Properties, Provider};
use crate::state::{ResourceState, ResourceStatus, StateManager};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::Path;
use tokio::sync::Mutex;

const LIST_ACTION: &str = "list";
const LIST_SECRETS_ACTION: &str = "listSecrets";

pub struct LocalProvider {
    name: String,
    state: StateManager,
    // serializes read-modify-write cycles within this process
    write: Mutex<()>,
}

impl LocalProvider {
    pub fn new(name: impl Into<String>, state_dir: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            state: StateManager::new(state_dir),
            write: Mutex::new(()),
        }
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    fn to_output(resource: &ResourceState) -> Properties {
        let mut properties = resource.properties.clone();
        properties.insert(
            "provisioningState".to_string(),
            Value::String(resource.status.provisioning_state().to_string()),
        );

        let output = json!({
            "id": resource.id,
            "type": resource.resource_type,
            "apiVersion": resource.api_version,
            "properties": properties,
        });

        match output {
            Value::Object(map) => map,
            _ => Properties::new(),
        }
    }
}

#[async_trait]
impl Provider for LocalProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        "Local state"
    }

    async fn get_deployed_resource(&self, id: &str, _api_version: &str) -> Result<Properties> {
        let id = ResourceId::parse(id)?;
        let state = self.state.load().await?;

        state
            .get(&id.id)
            .map(Self::to_output)
            .ok_or_else(|| ProviderError::ResourceNotFound(id.id.clone()))
    }

    #[tracing::instrument(skip(self, body), fields(provider = %self.name))]
    async fn deploy_resource(
        &self,
        id: &str,
        api_version: &str,
        body: Properties,
    ) -> Result<Properties> {
        let id = ResourceId::parse(id)?;

        let properties = match body.get("properties") {
            None | Some(Value::Null) => Properties::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                return Err(ProviderError::OperationFailed(format!(
                    "properties of {} must be an object, got {}",
                    id, other
                )));
            }
        };

        let _guard = self.write.lock().await;
        let lock = self.state.acquire_lock().await?;

        let mut state = self.state.load().await?;
        let resource = ResourceState::new(id.id.clone(), id.resource_type(), api_version)
            .with_status(ResourceStatus::Succeeded)
            .with_properties(properties);
        let output = Self::to_output(&resource);
        state.upsert(resource);
        self.state.save(&state).await?;

        lock.release().await?;

        tracing::debug!("Stored {} in local state", id);
        Ok(output)
    }

    async fn invoke_custom_action(
        &self,
        id: &str,
        _api_version: &str,
        action: &str,
        _body: Option<Value>,
    ) -> Result<Value> {
        let id = ResourceId::parse(id)?;
        let state = self.state.load().await?;

        match action {
            LIST_ACTION => {
                let prefix = format!("{}/", id.id);
                let value: Vec<Value> = state
                    .resources
                    .values()
                    .filter(|r| r.id.starts_with(&prefix))
                    .map(|r| Value::Object(Self::to_output(r)))
                    .collect();
                Ok(json!({ "value": value }))
            }
            LIST_SECRETS_ACTION => {
                let resource = state
                    .get(&id.id)
                    .ok_or_else(|| ProviderError::ResourceNotFound(id.id.clone()))?;
                Ok(resource
                    .properties
                    .get("secrets")
                    .cloned()
                    .unwrap_or_else(|| json!({})))
            }
            _ => Err(ProviderError::UnsupportedAction {
                id: id.id,
                action: action.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const APP: &str = "/subscriptions/s1/resourceGroups/r1/providers/Microsoft.CustomProviders/resourceProviders/radius/Applications/app";

    fn body(value: Value) -> Properties {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_deploy_then_get() {
        let temp_dir = tempdir().unwrap();
        let provider = LocalProvider::new("radius", temp_dir.path());

        let output = provider
            .deploy_resource(
                APP,
                "2018-09-01-preview",
                body(json!({"properties": {"port": 80}})),
            )
            .await
            .unwrap();

        assert_eq!(output["id"], json!(APP));
        assert_eq!(
            output["type"],
            json!("Microsoft.CustomProviders/resourceProviders/Applications")
        );
        assert_eq!(output["properties"]["port"], json!(80));
        assert_eq!(output["properties"]["provisioningState"], json!("Succeeded"));

        let fetched = provider
            .get_deployed_resource(APP, "2018-09-01-preview")
            .await
            .unwrap();
        assert_eq!(fetched, output);
    }

    #[tokio::test]
    async fn test_redeploy_converges() {
        let temp_dir = tempdir().unwrap();
        let provider = LocalProvider::new("radius", temp_dir.path());
        let payload = body(json!({"properties": {"port": 80}}));

        let first = provider
            .deploy_resource(APP, "v1", payload.clone())
            .await
            .unwrap();
        let second = provider.deploy_resource(APP, "v1", payload).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.state().load().await.unwrap().resources.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_resource() {
        let temp_dir = tempdir().unwrap();
        let provider = LocalProvider::new("radius", temp_dir.path());

        let err = provider.get_deployed_resource(APP, "v1").await.unwrap_err();
        assert!(matches!(err, ProviderError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_properties_rejected() {
        let temp_dir = tempdir().unwrap();
        let provider = LocalProvider::new("radius", temp_dir.path());

        let err = provider
            .deploy_resource(APP, "v1", body(json!({"properties": "nope"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::OperationFailed(_)));
    }

    #[tokio::test]
    async fn test_custom_actions() {
        let temp_dir = tempdir().unwrap();
        let provider = LocalProvider::new("radius", temp_dir.path());
        let child = format!("{}/Components/db", APP);

        provider
            .deploy_resource(
                &child,
                "v1",
                body(json!({"properties": {"secrets": {"password": "p"}}})),
            )
            .await
            .unwrap();

        let listed = provider
            .invoke_custom_action(APP, "v1", "list", None)
            .await
            .unwrap();
        assert_eq!(listed["value"].as_array().unwrap().len(), 1);

        let secrets = provider
            .invoke_custom_action(&child, "v1", "listSecrets", None)
            .await
            .unwrap();
        assert_eq!(secrets, json!({"password": "p"}));

        let err = provider
            .invoke_custom_action(&child, "v1", "listKeys", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedAction { .. }));
    }
}
