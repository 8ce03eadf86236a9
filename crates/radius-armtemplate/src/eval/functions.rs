//! Built-in template functions

use super::{DeploymentEvaluator, Eval, HostRequest, Interrupt, Mode};
use crate::error::{ArmError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use serde_json::{Value, json};
use sha1::{Digest, Sha1};
use std::sync::LazyLock;
use uuid::Uuid;

/// `{n}` in `format()` strings
static FORMAT_PLACEHOLDER: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\{(\d+)\}"));

impl DeploymentEvaluator {
    pub(crate) fn call_function(&mut self, name: &str, args: Vec<Value>) -> Eval<Value> {
        if name.starts_with("list") {
            return self.custom_action(name, args);
        }

        match name {
            "base64" => {
                exactly(name, &args, 1)?;
                Ok(Value::String(STANDARD.encode(display_string(&args[0]))))
            }
            "base64ToString" => {
                exactly(name, &args, 1)?;
                Ok(Value::String(decode_base64(&display_string(&args[0]))?))
            }
            "concat" => {
                at_least(name, &args, 1)?;
                Ok(concat(args)?)
            }
            "createObject" => Ok(create_object(args)?),
            "format" => {
                at_least(name, &args, 1)?;
                let format = string_arg(name, &args, 0)?;
                Ok(Value::String(evaluate_format(format, &args[1..])?))
            }
            "guid" => {
                at_least(name, &args, 1)?;
                Ok(Value::String(guid(name, &args)?))
            }
            "parameters" => {
                exactly(name, &args, 1)?;
                let parameter = string_arg(name, &args, 0)?.to_string();
                self.parameter(&parameter)
            }
            "reference" => self.reference(name, args),
            "resourceGroup" => {
                exactly(name, &args, 0)?;
                self.options
                    .resource_group
                    .properties
                    .clone()
                    .map(Value::Object)
                    .ok_or_else(|| {
                        ArmError::evaluation(
                            "no resource group data found, is the azure provider enabled?",
                        )
                        .into()
                    })
            }
            "resourceId" => {
                at_least(name, &args, 2)?;
                let resource_type = string_arg(name, &args, 0)?;
                let names = (1..args.len())
                    .map(|i| string_arg(name, &args, i))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::String(self.resource_id(resource_type, &names)?))
            }
            "string" => {
                exactly(name, &args, 1)?;
                Ok(Value::String(display_string(&args[0])))
            }
            "subscription" => {
                exactly(name, &args, 0)?;
                let id = &self.options.subscription_id;
                Ok(json!({
                    "id": format!("/subscriptions/{}", id),
                    "subscriptionId": id,
                }))
            }
            "variables" => {
                exactly(name, &args, 1)?;
                let variable = string_arg(name, &args, 0)?.to_string();
                self.variable(&variable)
            }
            _ => Err(ArmError::evaluation(format!("unsupported function '{}'", name)).into()),
        }
    }

    fn custom_action(&mut self, name: &str, args: Vec<Value>) -> Eval<Value> {
        at_least(name, &args, 2)?;
        let id = string_arg(name, &args, 0)?.to_string();
        let api_version = string_arg(name, &args, 1)?.to_string();
        let body = args.get(2).cloned();

        let request = HostRequest::CustomAction {
            id,
            api_version,
            action: name.to_string(),
            body,
        };

        if self.mode == Mode::Deferred {
            return Err(request.unanswered().into());
        }

        match self.answers.get(&request.key()) {
            Some(answer) => Ok(answer.clone()),
            None => Err(Interrupt::Pending(request)),
        }
    }

    /// `reference(id)` or `reference(id, apiVersion, 'full')`
    ///
    /// Always returns the `properties` of the resource.
    fn reference(&mut self, name: &str, args: Vec<Value>) -> Eval<Value> {
        let api_version = match args.len() {
            1 => String::new(),
            3 => string_arg(name, &args, 1)?.to_string(),
            _ => {
                return Err(ArmError::evaluation(format!(
                    "exactly 1 or 3 arguments are required for {}",
                    name
                ))
                .into());
            }
        };
        let id = string_arg(name, &args, 0)?.to_string();

        if let Some(deployed) = self.deployed.get(&id) {
            return match deployed.get("properties") {
                Some(Value::Object(properties)) => Ok(Value::Object(properties.clone())),
                _ => Err(ArmError::evaluation(format!(
                    "value did not contain property 'properties', was: {}",
                    Value::Object(deployed.clone())
                ))
                .into()),
            };
        }

        let request = HostRequest::GetDeployedResource { id, api_version };
        if self.mode == Mode::Deferred {
            return Err(request.unanswered().into());
        }

        match self.answers.get(&request.key()) {
            Some(Value::Object(existing)) => Ok(existing
                .get("properties")
                .cloned()
                .unwrap_or_else(|| Value::Object(existing.clone()))),
            Some(other) => Ok(other.clone()),
            None => Err(Interrupt::Pending(request)),
        }
    }

    /// Caller value first, then the template's default
    fn parameter(&mut self, name: &str) -> Eval<Value> {
        if let Some(supplied) = self.options.parameters.get(name) {
            return supplied.get("value").cloned().ok_or_else(|| {
                ArmError::validation(format!("parameter {:?} has no value", name)).into()
            });
        }

        let default = match self.template.parameter(name) {
            Some(declaration) => declaration.get("defaultValue").cloned().ok_or_else(|| {
                ArmError::validation(format!("parameter {:?} has no default value", name))
            })?,
            None => {
                return Err(ArmError::validation(format!(
                    "parameter {:?} is not defined by the template",
                    name
                ))
                .into());
            }
        };

        // defaults may be expressions, e.g. "[resourceGroup().location]"
        self.walk(&default, false)
    }

    /// Variables are resolved on first use and memoised
    fn variable(&mut self, name: &str) -> Eval<Value> {
        if let Some(value) = self.variables.get(name) {
            return Ok(value.clone());
        }

        if self.resolving.iter().any(|v| v == name) {
            let mut chain = self.resolving.clone();
            chain.push(name.to_string());
            return Err(ArmError::validation(format!(
                "variable '{}' depends on itself: {}",
                name,
                chain.join(" -> ")
            ))
            .into());
        }

        let raw = self
            .template
            .variables
            .get(name)
            .cloned()
            .ok_or_else(|| ArmError::validation(format!("no variable matches: {}", name)))?;

        self.resolving.push(name.to_string());
        let result = self.walk(&raw, false);
        self.resolving.pop();

        let value = result?;
        self.variables.insert(name.to_string(), value.clone());
        Ok(value)
    }
}

fn arity_error(name: &str, qualifier: &str, count: usize) -> ArmError {
    let noun = if count == 1 { "argument is" } else { "arguments are" };
    ArmError::evaluation(format!(
        "{} {} {} required for {}",
        qualifier, count, noun, name
    ))
}

fn exactly(name: &str, args: &[Value], count: usize) -> Result<()> {
    if args.len() != count {
        return Err(arity_error(name, "exactly", count));
    }
    Ok(())
}

fn at_least(name: &str, args: &[Value], count: usize) -> Result<()> {
    if args.len() < count {
        return Err(arity_error(name, "at least", count));
    }
    Ok(())
}

fn string_arg<'a>(name: &str, args: &'a [Value], index: usize) -> Result<&'a str> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(ArmError::evaluation(format!(
            "argument {} of {} must be a string, was: {}",
            index, name, other
        ))),
        None => Err(ArmError::evaluation(format!(
            "argument {} of {} is missing",
            index, name
        ))),
    }
}

/// Strings as-is, anything else as compact JSON
pub(crate) fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Replace `{n}` placeholders with the n-th value
fn evaluate_format(format: &str, values: &[Value]) -> Result<String> {
    let mut output = String::with_capacity(format.len());
    let mut last = 0;

    let placeholder = FORMAT_PLACEHOLDER
        .as_ref()
        .map_err(|e| ArmError::evaluation(format!("invalid format pattern: {}", e)))?;

    for captures in placeholder.captures_iter(format) {
        let Some(whole) = captures.get(0) else {
            continue;
        };

        let value = captures[1]
            .parse::<usize>()
            .ok()
            .and_then(|index| values.get(index))
            .ok_or_else(|| {
                ArmError::evaluation(format!(
                    "format placeholder {} has no matching argument ({} given)",
                    whole.as_str(),
                    values.len()
                ))
            })?;

        output.push_str(&format[last..whole.start()]);
        output.push_str(&display_string(value));
        last = whole.end();
    }

    output.push_str(&format[last..]);
    Ok(output)
}

fn create_object(args: Vec<Value>) -> Result<Value> {
    if args.len() % 2 != 0 {
        return Err(ArmError::evaluation(
            "an even number of arguments is required for createObject",
        ));
    }

    let mut object = serde_json::Map::new();
    let mut args = args.into_iter();
    while let (Some(key), Some(value)) = (args.next(), args.next()) {
        let Value::String(key) = key else {
            return Err(ArmError::evaluation(format!(
                "key must be a string, was: {}",
                key
            )));
        };
        object.insert(key, value);
    }

    Ok(Value::Object(object))
}

/// Name-based UUID of the SHA-1 digest of the concatenated arguments
fn guid(name: &str, args: &[Value]) -> Result<String> {
    let mut hasher = Sha1::new();
    for index in 0..args.len() {
        hasher.update(string_arg(name, args, index)?.as_bytes());
    }
    let digest = hasher.finalize();

    Ok(Uuid::new_v5(&Uuid::nil(), &digest).to_string())
}

fn decode_base64(encoded: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| ArmError::evaluation(format!("invalid base64 value '{}': {}", encoded, e)))?;

    String::from_utf8(bytes)
        .map_err(|e| ArmError::evaluation(format!("decoded base64 is not UTF-8: {}", e)))
}

/// Arrays are joined into one array, anything else into one string
fn concat(args: Vec<Value>) -> Result<Value> {
    if args.first().is_some_and(Value::is_array) {
        let mut joined = Vec::new();
        for arg in args {
            match arg {
                Value::Array(items) => joined.extend(items),
                other => {
                    return Err(ArmError::evaluation(format!(
                        "concat cannot mix arrays and {}",
                        other
                    )));
                }
            }
        }
        return Ok(Value::Array(joined));
    }

    let mut joined = String::new();
    for arg in &args {
        if arg.is_array() {
            return Err(ArmError::evaluation("concat cannot mix strings and arrays"));
        }
        joined.push_str(&display_string(arg));
    }
    Ok(Value::String(joined))
}
