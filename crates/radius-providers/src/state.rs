//! State management for locally deployed resources
//!
//! Manages the `state.json` file (by default under `.radius/`) which records
//! every resource deployed through the [`LocalProvider`](crate::LocalProvider).

use crate::error::{ProviderError, Result};
use crate::provider::Properties;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const STATE_VERSION: u32 = 1;
pub const DEFAULT_STATE_DIR: &str = ".radius";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";

/// All resources known to the local state store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Resources indexed by resource ID
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for DeploymentState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl DeploymentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a resource, keeping its original creation time
    pub fn upsert(&mut self, mut state: ResourceState) {
        if let Some(existing) = self.resources.get(&state.id) {
            state.created_at = existing.created_at;
        }
        self.resources.insert(state.id.clone(), state);
        self.updated_at = Utc::now();
    }

    /// Remove a resource
    pub fn remove(&mut self, id: &str) -> Option<ResourceState> {
        let result = self.resources.remove(id);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    pub fn get(&self, id: &str) -> Option<&ResourceState> {
        self.resources.get(id)
    }

    /// Resources whose type starts with `prefix`
    pub fn by_type_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = &'a ResourceState> + 'a {
        self.resources
            .values()
            .filter(move |r| r.resource_type.starts_with(prefix))
    }
}

/// State of a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Fully-qualified resource ID
    pub id: String,

    /// Resource type
    pub resource_type: String,

    pub api_version: String,

    /// Current status
    pub status: ResourceStatus,

    /// Resolved `properties` as deployed
    #[serde(default)]
    pub properties: Properties,

    /// When the resource was created
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(
        id: impl Into<String>,
        resource_type: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            api_version: api_version.into(),
            status: ResourceStatus::Unknown,
            properties: Properties::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn get_property<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.properties
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Provisioning status of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Deployment is in progress
    Provisioning,
    /// Resource was deployed
    Succeeded,
    /// Last deployment attempt failed
    Failed,
    /// Status is unknown
    Unknown,
}

impl ResourceStatus {
    /// ARM `provisioningState` value
    pub fn provisioning_state(&self) -> &'static str {
        match self {
            ResourceStatus::Provisioning => "Provisioning",
            ResourceStatus::Succeeded => "Succeeded",
            ResourceStatus::Failed => "Failed",
            ResourceStatus::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Provisioning => write!(f, "provisioning"),
            ResourceStatus::Succeeded => write!(f, "succeeded"),
            ResourceStatus::Failed => write!(f, "failed"),
            ResourceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// State manager for reading/writing state files
#[derive(Debug, Clone)]
pub struct StateManager {
    /// Directory holding state, backup and lock files
    state_dir: PathBuf,
}

impl StateManager {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            state_dir: state_dir.as_ref().to_path_buf(),
        }
    }

    /// State manager for `<project_root>/.radius`
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        Self::new(project_root.as_ref().join(DEFAULT_STATE_DIR))
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Get the state file path
    pub fn state_path(&self) -> PathBuf {
        self.state_dir.join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir.join(STATE_BACKUP)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir.join(LOCK_FILE)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        if !self.state_dir.exists() {
            fs::create_dir_all(&self.state_dir).await?;
            tracing::debug!("Created state directory: {}", self.state_dir.display());
        }
        Ok(())
    }

    /// Load the current state
    #[tracing::instrument(skip(self), fields(path = %self.state_path().display()))]
    pub async fn load(&self) -> Result<DeploymentState> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(DeploymentState::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: DeploymentState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(ProviderError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} resources", state.resources.len());
        Ok(state)
    }

    /// Save the state, keeping the previous file as a backup
    #[tracing::instrument(skip(self, state), fields(path = %self.state_path().display()))]
    pub async fn save(&self, state: &DeploymentState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} resources", state.resources.len());
        Ok(())
    }

    /// Acquire a lock for exclusive access
    ///
    /// The lock file is created with `create_new`, so only one caller can
    /// win. A lock older than an hour is taken over once.
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();
        let lock_info = LockInfo::current();

        match create_lock_file(&lock_path, &lock_info).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let held = read_lock_info(&lock_path).await?;
                match held {
                    Some(held) if held.is_stale() => {
                        tracing::warn!("Removing stale lock from {}", held.holder);
                    }
                    Some(held) => {
                        return Err(ProviderError::LockError(format!(
                            "State is locked by {} since {}",
                            held.holder, held.acquired_at
                        )));
                    }
                    // created but not written yet
                    None => {
                        return Err(ProviderError::LockError(
                            "State is being locked by another process".to_string(),
                        ));
                    }
                }

                match fs::remove_file(&lock_path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }

                create_lock_file(&lock_path, &lock_info)
                    .await
                    .map_err(|e| match e.kind() {
                        io::ErrorKind::AlreadyExists => ProviderError::LockError(
                            "State lock was taken by another process".to_string(),
                        ),
                        _ => e.into(),
                    })?;
            }
            Err(e) => return Err(e.into()),
        }

        tracing::debug!("Acquired state lock");
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }
}

/// Create the lock file, failing with `AlreadyExists` if it is present
async fn create_lock_file(path: &Path, info: &LockInfo) -> io::Result<()> {
    let content = serde_json::to_string_pretty(info).map_err(io::Error::other)?;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await
}

/// Lock holder, or `None` while the file is still empty or half written
async fn read_lock_info(path: &Path) -> Result<Option<LockInfo>> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(serde_json::from_str(&content).ok()),
        // released between our create attempt and this read
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Some(LockInfo::released())),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    acquired_at: DateTime<Utc>,
}

impl LockInfo {
    fn current() -> Self {
        Self {
            holder: format!(
                "{}:{}",
                std::env::var("HOSTNAME")
                    .or_else(|_| std::env::var("HOST"))
                    .unwrap_or_else(|_| "unknown".to_string()),
                std::process::id()
            ),
            acquired_at: Utc::now(),
        }
    }

    /// Placeholder for a lock file that vanished, always stale
    fn released() -> Self {
        Self {
            holder: "nobody".to_string(),
            acquired_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    /// Locks older than an hour are considered abandoned
    fn is_stale(&self) -> bool {
        Utc::now().signed_duration_since(self.acquired_at).num_hours() >= 1
    }
}

/// RAII guard for state lock
#[derive(Debug)]
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    /// Release the lock
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("Released state lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
