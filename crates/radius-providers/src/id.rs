//! Azure-style resource IDs
//!
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}[/{childType}/{childName}]...`
//!
//! The same [`make_id`] is used by the `resourceId()` template function and
//! by resource extraction, so both always agree byte for byte.

use crate::error::{ProviderError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One `type/name` step of a resource ID
///
/// The first step's `resource_type` includes the namespace
/// (`Microsoft.CustomProviders/resourceProviders`), nested steps carry only
/// the child type (`Applications`). An empty name denotes a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    pub resource_type: String,
    pub name: String,
}

impl ResourceType {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

/// Build a fully-qualified resource ID
pub fn make_id(
    subscription_id: &str,
    resource_group: &str,
    head: &ResourceType,
    tail: &[ResourceType],
) -> String {
    let mut id = format!(
        "/subscriptions/{}/resourceGroups/{}/providers",
        subscription_id, resource_group
    );

    for segment in std::iter::once(head).chain(tail) {
        id.push('/');
        id.push_str(&segment.resource_type);
        if !segment.name.is_empty() {
            id.push('/');
            id.push_str(&segment.name);
        }
    }

    id
}

/// A parsed resource ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceId {
    /// Normalized ID string
    pub id: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub types: Vec<ResourceType>,
}

impl ResourceId {
    /// Parse and normalize a resource ID
    ///
    /// A missing leading `/`, a single trailing `/` and the casing of the
    /// `subscriptions` keyword are tolerated.
    pub fn parse(id: &str) -> Result<Self> {
        let invalid = |reason: &str| ProviderError::InvalidResourceId {
            id: id.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = id.strip_prefix('/').unwrap_or(id);
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(invalid("id is empty"));
        }

        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("id contains an empty segment"));
        }

        if segments.len() < 7 {
            return Err(invalid("id is too short"));
        }

        let keywords = [(0, "subscriptions"), (2, "resourceGroups"), (4, "providers")];
        for (index, keyword) in keywords {
            if !segments[index].eq_ignore_ascii_case(keyword) {
                return Err(invalid(&format!("expected '{}' segment", keyword)));
            }
        }

        let namespace = segments[5];
        let rest = &segments[6..];

        let mut types = Vec::with_capacity(rest.len().div_ceil(2));
        for (i, pair) in rest.chunks(2).enumerate() {
            let resource_type = if i == 0 {
                format!("{}/{}", namespace, pair[0])
            } else {
                pair[0].to_string()
            };
            let name = pair.get(1).copied().unwrap_or_default();
            types.push(ResourceType::new(resource_type, name));
        }

        let subscription_id = segments[1].to_string();
        let resource_group = segments[3].to_string();
        let id = make_id(&subscription_id, &resource_group, &types[0], &types[1..]);

        Ok(Self {
            id,
            subscription_id,
            resource_group,
            types,
        })
    }

    /// Full resource type, e.g. `Microsoft.CustomProviders/resourceProviders/Applications`
    pub fn resource_type(&self) -> String {
        self.types
            .iter()
            .map(|t| t.resource_type.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Name of the last segment
    pub fn name(&self) -> &str {
        self.types.last().map(|t| t.name.as_str()).unwrap_or_default()
    }

    /// True when the ID addresses a collection rather than a single resource
    pub fn is_collection(&self) -> bool {
        self.types.last().is_some_and(|t| t.name.is_empty())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
