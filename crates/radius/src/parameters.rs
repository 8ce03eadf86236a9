//! Template parameter loading

use anyhow::Context;
use radius_providers::Properties;
use serde_json::Value;
use std::path::Path;

/// Parameters from an optional file plus `NAME=VALUE` overrides
///
/// Every entry comes out in ARM form, `{"value": ...}`.
pub fn load(file: Option<&Path>, overrides: &[String]) -> anyhow::Result<Properties> {
    let mut parameters = match file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read parameter file {}", path.display()))?;
            let document: Value = serde_json::from_str(&content)
                .with_context(|| format!("failed to parse parameter file {}", path.display()))?;
            from_document(document)?
        }
        None => Properties::new(),
    };

    for pair in overrides {
        let (name, value) = parse_override(pair)?;
        parameters.insert(name, wrap(value));
    }

    Ok(parameters)
}

/// Accept a full parameter document or the bare `parameters` map
fn from_document(document: Value) -> anyhow::Result<Properties> {
    let Value::Object(mut document) = document else {
        anyhow::bail!("parameter file must contain a JSON object");
    };

    let is_full_document = document.contains_key("$schema")
        || document.contains_key("contentVersion")
        || (document.len() == 1
            && document
                .get("parameters")
                .and_then(Value::as_object)
                .is_some_and(|p| !p.contains_key("value")));

    let entries = if is_full_document {
        match document.remove("parameters") {
            Some(Value::Object(entries)) => entries,
            Some(_) => anyhow::bail!("'parameters' in parameter file must be an object"),
            None => Properties::new(),
        }
    } else {
        document
    };

    Ok(entries
        .into_iter()
        .map(|(name, value)| (name, wrap(value)))
        .collect())
}

/// Wrap a plain value as `{"value": ...}` unless it already is a parameter entry
fn wrap(value: Value) -> Value {
    match value {
        Value::Object(entry) if entry.contains_key("value") || entry.contains_key("reference") => {
            Value::Object(entry)
        }
        other => serde_json::json!({ "value": other }),
    }
}

/// `name=value`; the value is JSON when it parses as JSON, a string otherwise
fn parse_override(pair: &str) -> anyhow::Result<(String, Value)> {
    let (name, raw) = pair
        .split_once('=')
        .filter(|(name, _)| !name.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("invalid parameter '{}', expected NAME=VALUE", pair))?;

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.trim().to_string(), value))
}
