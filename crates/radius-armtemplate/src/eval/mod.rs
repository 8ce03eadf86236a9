//! Expression evaluator
//!
//! [`DeploymentEvaluator`] reduces expression syntax trees to JSON values
//! against one deployment's state: parameters, variables and the outputs of
//! resources deployed so far.
//!
//! Evaluation itself is synchronous. When an expression needs something only
//! a provider can answer (a resource that was not deployed by this template,
//! or a `list*` action), evaluation stops with a [`HostRequest`]. The caller
//! performs the call, hands the answer back through
//! [`DeploymentEvaluator::provide`] and evaluates again.

mod functions;

use crate::error::{ArmError, Result};
use crate::template::{DeploymentTemplate, TemplateOptions};
use radius_armexpr::{Accessor, ExprError, Expression, PropertyAccess};
use radius_providers::{Properties, ResourceType, make_id};
use serde_json::Value;
use std::collections::HashMap;

/// How far evaluation may go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Extraction pass: property access is rejected and nothing may be
    /// fetched from a provider
    Deferred,
    /// Deployment pass: everything is evaluated
    Resolve,
}

/// A provider call needed to finish an evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum HostRequest {
    GetDeployedResource {
        id: String,
        api_version: String,
    },
    CustomAction {
        id: String,
        api_version: String,
        action: String,
        body: Option<Value>,
    },
}

impl HostRequest {
    /// ID of the resource the request is about
    pub fn id(&self) -> &str {
        match self {
            HostRequest::GetDeployedResource { id, .. } | HostRequest::CustomAction { id, .. } => id,
        }
    }

    pub fn api_version(&self) -> &str {
        match self {
            HostRequest::GetDeployedResource { api_version, .. }
            | HostRequest::CustomAction { api_version, .. } => api_version,
        }
    }

    fn key(&self) -> String {
        match self {
            HostRequest::GetDeployedResource { id, .. } => format!("get:{}", id),
            HostRequest::CustomAction {
                id,
                api_version,
                action,
                body,
            } => format!(
                "action:{}:{}:{}:{}",
                id,
                api_version,
                action,
                body.as_ref().map(Value::to_string).unwrap_or_default()
            ),
        }
    }

    /// Error reported when nobody can answer this request
    pub fn unanswered(&self) -> ArmError {
        match self {
            HostRequest::GetDeployedResource { id, .. } => {
                ArmError::evaluation(format!("no resource matches id: {}", id))
            }
            HostRequest::CustomAction { .. } => {
                ArmError::evaluation("custom actions are not supported by this host")
            }
        }
    }
}

/// Outcome of an evaluation that may need a provider call
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    Done(T),
    Needs(HostRequest),
}

/// Why evaluation stopped early
#[derive(Debug)]
pub(crate) enum Interrupt {
    Error(ArmError),
    Pending(HostRequest),
}

impl From<ArmError> for Interrupt {
    fn from(err: ArmError) -> Self {
        Interrupt::Error(err)
    }
}

impl From<ExprError> for Interrupt {
    fn from(err: ExprError) -> Self {
        Interrupt::Error(err.into())
    }
}

pub(crate) type Eval<T> = std::result::Result<T, Interrupt>;

/// Evaluation state for one deployment
///
/// Not meant to be shared between deployments; create one per template run.
#[derive(Debug)]
pub struct DeploymentEvaluator {
    template: DeploymentTemplate,
    options: TemplateOptions,
    mode: Mode,

    /// Provider output of every resource deployed so far, by ID
    deployed: HashMap<String, Properties>,

    /// Answers to host requests
    answers: HashMap<String, Value>,

    /// Memoised variable values
    variables: HashMap<String, Value>,

    /// Variables currently being resolved, outermost first
    resolving: Vec<String>,
}

impl DeploymentEvaluator {
    pub fn new(template: DeploymentTemplate, options: TemplateOptions) -> Self {
        Self {
            template,
            options,
            mode: Mode::Resolve,
            deployed: HashMap::new(),
            answers: HashMap::new(),
            variables: HashMap::new(),
            resolving: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn template(&self) -> &DeploymentTemplate {
        &self.template
    }

    pub fn options(&self) -> &TemplateOptions {
        &self.options
    }

    /// Record a resource's provider output for later `reference()` calls
    pub fn record_deployed(&mut self, id: impl Into<String>, output: Properties) {
        self.deployed.insert(id.into(), output);
    }

    pub fn deployed(&self, id: &str) -> Option<&Properties> {
        self.deployed.get(id)
    }

    /// Answer a [`HostRequest`] returned by [`Self::try_evaluate`]
    pub fn provide(&mut self, request: &HostRequest, response: Value) {
        self.answers.insert(request.key(), response);
    }

    /// Evaluate every expression in `value`
    pub fn try_evaluate(&mut self, value: &Value) -> Result<Step<Value>> {
        match self.walk(value, false) {
            Ok(value) => Ok(Step::Done(value)),
            Err(Interrupt::Pending(request)) => Ok(Step::Needs(request)),
            Err(Interrupt::Error(err)) => Err(err),
        }
    }

    /// Evaluate every expression in `value` without provider access
    pub fn evaluate(&mut self, value: &Value) -> Result<Value> {
        match self.try_evaluate(value)? {
            Step::Done(value) => Ok(value),
            Step::Needs(request) => Err(request.unanswered()),
        }
    }

    /// Evaluate a single string, which may or may not be an expression
    pub fn evaluate_str(&mut self, text: &str) -> Result<Value> {
        self.evaluate(&Value::String(text.to_string()))
    }

    /// Fully-qualified ID for a resource type and its names
    ///
    /// `resource_type` has one more `/`-separated segment than there are
    /// names: the first two segments form the namespace-qualified head type.
    pub fn resource_id(&self, resource_type: &str, names: &[&str]) -> Result<String> {
        let segments: Vec<&str> = resource_type.split('/').collect();
        if names.is_empty() || segments.len() - 1 != names.len() {
            return Err(ArmError::validation(
                "invalid arguments: wrong number of names",
            ));
        }

        let head = ResourceType::new(format!("{}/{}", segments[0], segments[1]), names[0]);
        let tail: Vec<ResourceType> = segments[2..]
            .iter()
            .zip(&names[1..])
            .map(|(segment, name)| ResourceType::new(*segment, *name))
            .collect();

        Ok(make_id(
            &self.options.subscription_id,
            &self.options.resource_group.name,
            &head,
            &tail,
        ))
    }

    pub(crate) fn visit(&mut self, expression: &Expression) -> Eval<Value> {
        match expression {
            Expression::StringLiteral(node) => Ok(Value::String(node.value())),
            Expression::NumberLiteral(node) => Ok(Value::from(node.value)),
            Expression::FunctionCall(node) => {
                let mut args = Vec::with_capacity(node.args.len());
                for arg in &node.args {
                    args.push(self.visit(arg)?);
                }
                self.call_function(&node.identifier.text, args)
            }
            Expression::PropertyAccess(node) => self.visit_property_access(node),
        }
    }

    fn visit_property_access(&mut self, node: &PropertyAccess) -> Eval<Value> {
        if self.mode == Mode::Deferred {
            return Err(ArmError::evaluation("property access is not supported").into());
        }

        let base = self.visit(&node.base)?;
        if base.is_null() {
            return Err(ArmError::evaluation("value to access is null").into());
        }

        match &node.accessor {
            Accessor::Member(identifier) => member(&base, &identifier.text),
            Accessor::Index(index) => match (&base, self.visit(index)?) {
                (Value::Array(items), Value::Number(n)) => n
                    .as_u64()
                    .and_then(|i| items.get(i as usize))
                    .cloned()
                    .ok_or_else(|| {
                        ArmError::evaluation(format!(
                            "index {} is out of range for an array of length {}",
                            n,
                            items.len()
                        ))
                        .into()
                    }),
                (Value::Object(_), Value::String(key)) => member(&base, &key),
                (_, key) => Err(ArmError::evaluation(format!(
                    "value to access should be a map or an array indexed by {}, was: {}",
                    key, base
                ))
                .into()),
            },
        }
    }
}

fn member(base: &Value, key: &str) -> Eval<Value> {
    let Value::Object(map) = base else {
        return Err(ArmError::evaluation(format!(
            "value to access should be a map, was: {}",
            base
        ))
        .into());
    };

    map.get(key).cloned().ok_or_else(|| {
        ArmError::evaluation(format!(
            "value did not contain property '{}', was: {}",
            key, base
        ))
        .into()
    })
}
