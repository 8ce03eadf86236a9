//! Deployment provider trait definition

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// JSON object exchanged with providers
pub type Properties = serde_json::Map<String, Value>;

/// Deployment provider abstraction trait
///
/// Azure, Kubernetes, nested deployments and the Radius resource provider all
/// implement this trait. Returned objects nest the provider's view of the
/// resource under a `properties` key so that `reference()` can traverse it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Returns the provider name (e.g., "az", "kubernetes")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Read a resource that already exists
    async fn get_deployed_resource(&self, id: &str, api_version: &str) -> Result<Properties>;

    /// Create or update a resource
    ///
    /// Repeated calls with the same fully-resolved body for the same ID
    /// converge on the same resource.
    async fn deploy_resource(&self, id: &str, api_version: &str, body: Properties)
    -> Result<Properties>;

    /// Invoke a `list*`-style action on a resource
    async fn invoke_custom_action(
        &self,
        id: &str,
        api_version: &str,
        action: &str,
        body: Option<Value>,
    ) -> Result<Value>;
}
