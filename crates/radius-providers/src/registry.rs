//! Provider registry and resource router

use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub const AZURE: &str = "az";
pub const KUBERNETES: &str = "kubernetes";
pub const DEPLOYMENT: &str = "deployment";
pub const RADIUS: &str = "radius";

const DEPLOYMENTS_TYPE: &str = "Microsoft.Resources/deployments";
const KUBERNETES_PREFIX: &str = "kubernetes.";
const RADIUS_PREFIX: &str = "Microsoft.CustomProviders/resourceProviders";

/// Which provider a resource is dispatched to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderIdentity {
    Azure,
    Kubernetes,
    Deployment,
    Radius,
    /// Explicit symbolic import from the template
    Import(String),
}

impl ProviderIdentity {
    /// Registry key for this identity
    pub fn key(&self) -> &str {
        match self {
            ProviderIdentity::Azure => AZURE,
            ProviderIdentity::Kubernetes => KUBERNETES,
            ProviderIdentity::Deployment => DEPLOYMENT,
            ProviderIdentity::Radius => RADIUS,
            ProviderIdentity::Import(name) => name,
        }
    }
}

impl fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Pick the provider identity for a resource
///
/// An explicit import always wins, then the resource type decides.
pub fn resolve_identity(import: Option<&str>, resource_type: &str) -> ProviderIdentity {
    match import {
        Some(name) if !name.is_empty() => ProviderIdentity::Import(name.to_string()),
        _ if resource_type == DEPLOYMENTS_TYPE => ProviderIdentity::Deployment,
        _ if resource_type.starts_with(KUBERNETES_PREFIX) => ProviderIdentity::Kubernetes,
        _ if resource_type.starts_with(RADIUS_PREFIX) => ProviderIdentity::Radius,
        _ => ProviderIdentity::Azure,
    }
}

/// Providers available to a deployment, keyed by identity
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration
    pub fn with(mut self, key: impl Into<String>, provider: Arc<dyn Provider>) -> Self {
        self.register(key, provider);
        self
    }

    pub fn register(&mut self, key: impl Into<String>, provider: Arc<dyn Provider>) {
        let key = key.into();
        tracing::debug!("Registered provider '{}' ({})", key, provider.display_name());
        self.providers.insert(key, provider);
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.providers.contains_key(key)
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Find the provider for a resource
    ///
    /// `api_version` is carried for providers that select behaviour by
    /// version; routing itself only looks at the import and the type.
    pub fn route(
        &self,
        import: Option<&str>,
        api_version: &str,
        resource_type: &str,
    ) -> Result<Arc<dyn Provider>> {
        let identity = resolve_identity(import, resource_type);
        tracing::trace!(
            "Routing {}@{} to provider '{}'",
            resource_type,
            api_version,
            identity
        );

        self.get(identity.key()).ok_or_else(|| match identity {
            ProviderIdentity::Import(name) => ProviderError::ImportNotFound(name),
            other => ProviderError::NotRegistered(other.key().to_string()),
        })
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingProvider;

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new()
            .with(AZURE, Arc::new(RecordingProvider::new(AZURE)))
            .with(KUBERNETES, Arc::new(RecordingProvider::new(KUBERNETES)))
            .with(DEPLOYMENT, Arc::new(RecordingProvider::new(DEPLOYMENT)))
            .with(RADIUS, Arc::new(RecordingProvider::new(RADIUS)))
            .with("myimport", Arc::new(RecordingProvider::new("myimport")))
    }

    #[test]
    fn test_resolve_identity() {
        let cases = [
            (None, "kubernetes.apps/Deployment", ProviderIdentity::Kubernetes),
            (None, "Microsoft.Resources/deployments", ProviderIdentity::Deployment),
            (
                None,
                "Microsoft.CustomProviders/resourceProviders/Applications",
                ProviderIdentity::Radius,
            ),
            (None, "Microsoft.Storage/storageAccounts", ProviderIdentity::Azure),
            (Some(""), "Microsoft.Storage/storageAccounts", ProviderIdentity::Azure),
            (
                Some("myimport"),
                "kubernetes.apps/Deployment",
                ProviderIdentity::Import("myimport".to_string()),
            ),
        ];

        for (import, resource_type, expected) in cases {
            assert_eq!(resolve_identity(import, resource_type), expected, "{resource_type}");
        }
    }

    #[test]
    fn test_route_by_type() {
        let registry = registry();

        let provider = registry.route(None, "v1", "kubernetes.apps/Deployment").unwrap();
        assert_eq!(provider.name(), KUBERNETES);

        let provider = registry
            .route(None, "2020-06-01", "Microsoft.Resources/deployments")
            .unwrap();
        assert_eq!(provider.name(), DEPLOYMENT);

        let provider = registry
            .route(None, "2021-01-01", "Microsoft.Storage/storageAccounts")
            .unwrap();
        assert_eq!(provider.name(), AZURE);
    }

    #[test]
    fn test_route_import_wins() {
        let registry = registry();
        let provider = registry
            .route(Some("myimport"), "v1", "Microsoft.Resources/deployments")
            .unwrap();
        assert_eq!(provider.name(), "myimport");
    }

    #[test]
    fn test_route_missing_import() {
        let registry = registry();
        let err = registry
            .route(Some("other"), "v1", "kubernetes.apps/Deployment")
            .err()
            .unwrap();
        assert!(err.is_routing());
        assert_eq!(err.to_string(), "could not find a provider matching import other");
    }

    #[test]
    fn test_route_missing_provider() {
        let registry = ProviderRegistry::new();
        let err = registry
            .route(None, "v1", "kubernetes.apps/Deployment")
            .err()
            .unwrap();
        assert!(err.is_routing());
        assert_eq!(err.to_string(), "could not find a provider supporting kubernetes");
    }

    #[test]
    fn test_keys_sorted() {
        assert_eq!(
            registry().keys(),
            vec!["az", "deployment", "kubernetes", "myimport", "radius"]
        );
    }
}
