//! Radius Deployment Providers
//!
//! This crate provides the provider abstraction used by the ARM template
//! deployment engine. Every resource in a template is dispatched to exactly
//! one provider, chosen by the router from the resource type (or from an
//! explicit provider import).
//!
//! # Provider identities
//!
//! - **az**: Azure Resource Manager (default)
//! - **kubernetes**: `kubernetes.*` resource types
//! - **deployment**: nested `Microsoft.Resources/deployments`
//! - **radius**: `Microsoft.CustomProviders/resourceProviders` resources
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │               radius-armtemplate                 │
//! │            (DeploymentDriver::deploy)            │
//! └─────────────────┬───────────────────────────────┘
//!                   │ route(import, apiVersion, type)
//! ┌─────────────────▼───────────────────────────────┐
//! │                radius-providers                  │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  ProviderRegistry + router                │   │
//! │  │  trait Provider { ... }                   │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ Resource IDs │  │ LocalProvider│            │
//! │  └──────────────┘  └──────────────┘            │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod id;
pub mod local;
pub mod provider;
pub mod registry;
pub mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-exports
pub use error::{ProviderError, Result};
pub use id::{ResourceId, ResourceType, make_id};
pub use local::LocalProvider;
pub use provider::{Properties, Provider};
pub use registry::{ProviderIdentity, ProviderRegistry, resolve_identity};
pub use state::{
    DEFAULT_STATE_DIR, DeploymentState, ResourceState, ResourceStatus, StateLock, StateManager,
};
