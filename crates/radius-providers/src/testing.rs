//! In-memory provider fake for tests

use crate::error::{ProviderError, Result};
use crate::provider::{Properties, Provider};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A call observed by a [`RecordingProvider`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Get {
        id: String,
        api_version: String,
    },
    Deploy {
        id: String,
        api_version: String,
        body: Properties,
    },
    Action {
        id: String,
        api_version: String,
        action: String,
        body: Option<Value>,
    },
}

impl Call {
    pub fn id(&self) -> &str {
        match self {
            Call::Get { id, .. } | Call::Deploy { id, .. } | Call::Action { id, .. } => id,
        }
    }
}

/// Call log that several providers can share to observe global call order
pub type CallLog = Arc<Mutex<Vec<(String, Call)>>>;

#[derive(Default)]
struct Canned {
    responses: HashMap<String, Value>,
    existing: HashMap<String, Value>,
    actions: HashMap<(String, String), Value>,
    failures: HashMap<String, String>,
}

/// Provider that records every call and answers from canned data
///
/// Without a canned response, `deploy_resource` echoes
/// `{"id": id, "properties": body.properties}`.
pub struct RecordingProvider {
    name: String,
    log: CallLog,
    canned: Mutex<Canned>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RecordingProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            log: CallLog::default(),
            canned: Mutex::new(Canned::default()),
        }
    }

    /// Record into a log shared with other providers
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Response returned when `id` is deployed
    pub fn with_response(self, id: impl Into<String>, response: Value) -> Self {
        lock(&self.canned).responses.insert(id.into(), response);
        self
    }

    /// Resource visible to `get_deployed_resource`
    pub fn with_existing(self, id: impl Into<String>, resource: Value) -> Self {
        lock(&self.canned).existing.insert(id.into(), resource);
        self
    }

    /// Response for a custom action on `id`
    pub fn with_action(
        self,
        id: impl Into<String>,
        action: impl Into<String>,
        response: Value,
    ) -> Self {
        lock(&self.canned)
            .actions
            .insert((id.into(), action.into()), response);
        self
    }

    /// Make every call touching `id` fail
    pub fn failing_on(self, id: impl Into<String>, message: impl Into<String>) -> Self {
        lock(&self.canned).failures.insert(id.into(), message.into());
        self
    }

    pub fn log(&self) -> CallLog {
        Arc::clone(&self.log)
    }

    /// Calls made to this provider, in order
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.log)
            .iter()
            .filter(|(provider, _)| provider == &self.name)
            .map(|(_, call)| call.clone())
            .collect()
    }

    /// IDs passed to `deploy_resource`, in order
    pub fn deployed_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Deploy { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Body passed to the last `deploy_resource` for `id`
    pub fn deployed_body(&self, id: &str) -> Option<Properties> {
        self.calls().into_iter().rev().find_map(|call| match call {
            Call::Deploy { id: called, body, .. } if called == id => Some(body),
            _ => None,
        })
    }

    fn record(&self, call: Call) -> Result<()> {
        let failure = lock(&self.canned).failures.get(call.id()).cloned();
        lock(&self.log).push((self.name.clone(), call));

        match failure {
            Some(message) => Err(ProviderError::OperationFailed(message)),
            None => Ok(()),
        }
    }
}

fn into_object(value: Value) -> Properties {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Properties::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

#[async_trait]
impl Provider for RecordingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        "Recording provider"
    }

    async fn get_deployed_resource(&self, id: &str, api_version: &str) -> Result<Properties> {
        self.record(Call::Get {
            id: id.to_string(),
            api_version: api_version.to_string(),
        })?;

        lock(&self.canned)
            .existing
            .get(id)
            .cloned()
            .map(into_object)
            .ok_or_else(|| ProviderError::ResourceNotFound(id.to_string()))
    }

    async fn deploy_resource(
        &self,
        id: &str,
        api_version: &str,
        body: Properties,
    ) -> Result<Properties> {
        self.record(Call::Deploy {
            id: id.to_string(),
            api_version: api_version.to_string(),
            body: body.clone(),
        })?;

        let canned = lock(&self.canned).responses.get(id).cloned();
        Ok(match canned {
            Some(response) => into_object(response),
            None => into_object(json!({
                "id": id,
                "properties": body.get("properties").cloned().unwrap_or_else(|| json!({})),
            })),
        })
    }

    async fn invoke_custom_action(
        &self,
        id: &str,
        api_version: &str,
        action: &str,
        body: Option<Value>,
    ) -> Result<Value> {
        self.record(Call::Action {
            id: id.to_string(),
            api_version: api_version.to_string(),
            action: action.to_string(),
            body,
        })?;

        lock(&self.canned)
            .actions
            .get(&(id.to_string(), action.to_string()))
            .cloned()
            .ok_or_else(|| ProviderError::UnsupportedAction {
                id: id.to_string(),
                action: action.to_string(),
            })
    }
}
