//! Workspace configuration for the `rad` CLI
//!
//! A workspace file names the subscription and resource group templates are
//! deployed into, and where local deployment state is kept:
//!
//! ```yaml
//! subscriptionId: 00000000-0000-0000-0000-000000000000
//! resourceGroup: my-app
//! stateDir: .radius
//! ```

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a config file directly
pub const CONFIG_PATH_ENV: &str = "RAD_CONFIG_PATH";

const CANDIDATES: [&str; 2] = ["rad.local.yaml", "rad.yaml"];
const WORKSPACE_DIR: &str = ".rad";

pub const DEFAULT_SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000000";
pub const DEFAULT_RESOURCE_GROUP: &str = "default";
pub const DEFAULT_STATE_DIR: &str = ".radius";

/// Settings of a Radius workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceConfig {
    pub subscription_id: String,
    pub resource_group: String,
    /// Local deployment state, relative paths resolve against the
    /// current directory
    pub state_dir: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            subscription_id: DEFAULT_SUBSCRIPTION_ID.to_string(),
            resource_group: DEFAULT_RESOURCE_GROUP.to_string(),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
        }
    }
}

impl WorkspaceConfig {
    /// Apply command line overrides on top of the file values
    pub fn with_overrides(
        mut self,
        subscription_id: Option<String>,
        resource_group: Option<String>,
        state_dir: Option<PathBuf>,
    ) -> Self {
        if let Some(subscription_id) = subscription_id {
            self.subscription_id = subscription_id;
        }
        if let Some(resource_group) = resource_group {
            self.resource_group = resource_group;
        }
        if let Some(state_dir) = state_dir {
            self.state_dir = state_dir;
        }
        self
    }
}

/// Radius config directory (`~/.config/radius`), created if missing
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("radius");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Find the workspace config file
///
/// Search order:
/// 1. `RAD_CONFIG_PATH`
/// 2. current directory: `rad.local.yaml`, `rad.yaml`
/// 3. `./.rad/`, same order
/// 4. `~/.config/radius/rad.yaml`
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} points at missing file {}", CONFIG_PATH_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let workspace_dir = current_dir.join(WORKSPACE_DIR);
    if workspace_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = workspace_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("radius").join("rad.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Load a workspace config file
pub fn load_config(path: &Path) -> Result<WorkspaceConfig> {
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(WorkspaceConfig::default());
    }

    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the discovered workspace config, or the defaults when there is none
pub fn load_workspace_config() -> Result<WorkspaceConfig> {
    match find_config_file() {
        Ok(path) => {
            tracing::debug!("Using workspace config {}", path.display());
            load_config(&path)
        }
        Err(ConfigError::ConfigFileNotFound) => {
            tracing::debug!("No workspace config found, using defaults");
            Ok(WorkspaceConfig::default())
        }
        Err(e) => Err(e),
    }
}
