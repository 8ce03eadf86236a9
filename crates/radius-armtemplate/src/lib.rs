//! ARM template deployment engine
//!
//! Evaluates ARM deployment templates (as produced by the Bicep compiler)
//! and deploys their resources through [`radius_providers`].
//!
//! A deployment runs in two phases:
//!
//! 1. [`extract_skeleton`] computes every resource's ID, type, API version
//!    and dependencies and orders the resources. Resource `properties` are
//!    left unevaluated, since they may refer to resources that do not exist
//!    yet.
//! 2. [`DeploymentDriver::resolve_and_deploy`] walks the ordered resources,
//!    evaluates each body against what has been deployed so far and hands it
//!    to the provider chosen by the registry.
//!
//! ```no_run
//! # async fn run(registry: radius_providers::ProviderRegistry) -> radius_armtemplate::Result<()> {
//! use radius_armtemplate::{DeploymentDriver, TemplateOptions};
//!
//! let template = std::fs::read_to_string("app.json").unwrap_or_default();
//! let options = TemplateOptions::new("my-subscription", "my-resource-group");
//!
//! let result = DeploymentDriver::new(registry).deploy(&template, options).await?;
//! for id in result.ids() {
//!     println!("deployed {id}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod deploy;
pub mod error;
pub mod eval;
pub mod extract;
pub mod nested;
pub mod order;
pub mod template;
mod walker;

// Re-exports
pub use deploy::{
    DeployedResource, DeploymentDriver, DeploymentEvent, DeploymentOutput, DeploymentResult,
};
pub use error::{ArmError, ErrorKind, Result};
pub use eval::{DeploymentEvaluator, HostRequest, Mode, Step};
pub use extract::{eval, extract_skeleton};
pub use nested::NestedDeploymentProvider;
pub use order::order_resources;
pub use template::{
    DeploymentTemplate, ImportSpec, RadiusParts, Resource, ResourceGroup, TemplateOptions, parse,
};
