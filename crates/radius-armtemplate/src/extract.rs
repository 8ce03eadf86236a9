//! Resource extraction
//!
//! First phase of a deployment: every template resource is turned into a
//! [`Resource`] with its ID and dependencies computed, while its `properties`
//! stay unevaluated until the resources it refers to have been deployed.

use crate::error::{ArmError, Result};
use crate::eval::{DeploymentEvaluator, Interrupt, Mode};
use crate::order::order_resources;
use crate::template::{DeploymentTemplate, Resource, TemplateOptions};
use radius_providers::Properties;
use serde_json::Value;
use std::collections::HashMap;

const NAME: &str = "name";
const TYPE: &str = "type";
const API_VERSION: &str = "apiVersion";
const DEPENDS_ON: &str = "dependsOn";
const IMPORT: &str = "import";
const PROPERTIES: &str = "properties";

/// Extract and order every resource of a template
pub fn extract_skeleton(
    template: &DeploymentTemplate,
    options: &TemplateOptions,
) -> Result<Vec<Resource>> {
    let mut evaluator =
        DeploymentEvaluator::new(template.clone(), options.clone()).with_mode(Mode::Deferred);

    let mut resources = HashMap::with_capacity(template.resources.len());
    for entry in &template.resources {
        let resource = evaluator.extract_resource(entry)?;
        tracing::debug!("Extracted {} ({})", resource.id, resource.resource_type);

        if let Some(existing) = resources.insert(resource.id.clone(), resource) {
            return Err(ArmError::validation(format!(
                "resource id {} is declared more than once",
                existing.id
            )));
        }
    }

    order_resources(resources)
}

/// Extract and order every resource of a template given as JSON text
pub fn eval(template: &str, options: &TemplateOptions) -> Result<Vec<Resource>> {
    let template = DeploymentTemplate::parse(template)?;
    extract_skeleton(&template, options)
}

impl DeploymentEvaluator {
    /// Turn one raw template resource into a [`Resource`]
    ///
    /// Runs in the evaluator's current mode; `properties` is left as written
    /// unless `evaluate_properties_node` is set.
    pub fn extract_resource(&mut self, input: &Properties) -> Result<Resource> {
        let evaluate_properties = self.options().evaluate_properties_node;

        let mut evaluated = Properties::with_capacity(input.len());
        for (key, value) in input {
            let preserve = !evaluate_properties && key == PROPERTIES;
            let value = match self.walk(value, preserve) {
                Ok(value) => value,
                Err(Interrupt::Error(err)) => return Err(err),
                Err(Interrupt::Pending(request)) => return Err(request.unanswered()),
            };
            evaluated.insert(key.clone(), value);
        }

        let name = required_string(&evaluated, NAME, "a name")?;
        let declared_type = required_string(&evaluated, TYPE, "a type")?;

        let (resource_type, api_version) = match evaluated.get(API_VERSION) {
            Some(Value::String(api_version)) => (declared_type.clone(), api_version.clone()),
            // kubernetes.core/Service@v1 carries its version in the type
            _ => match declared_type.split_once('@') {
                Some((resource_type, api_version)) => {
                    (resource_type.to_string(), api_version.to_string())
                }
                None => {
                    return Err(ArmError::validation(format!(
                        "resource {} does not contain an apiVersion",
                        name
                    )));
                }
            },
        };

        let depends_on = match evaluated.get(DEPENDS_ON) {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(id) => Ok(id.clone()),
                    _ => Err(ArmError::validation("dependsOn is the wrong type")),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(ArmError::validation("dependsOn is the wrong type")),
        };

        let import = self.import_for(&evaluated);

        let names: Vec<&str> = name.split('/').collect();
        let id = self.resource_id(&resource_type, &names)?;

        let mut body = input.clone();
        for key in [NAME, TYPE, API_VERSION, DEPENDS_ON, IMPORT] {
            body.remove(key);
        }

        Ok(Resource {
            id,
            resource_type,
            api_version,
            name,
            depends_on,
            body,
            import,
        })
    }

    /// Registry name selected by a resource's `import: {provider: <symbol>}`
    ///
    /// A symbol declared in the template's `imports` resolves to that
    /// import's provider; any other symbol names a provider directly.
    fn import_for(&self, evaluated: &Properties) -> Option<String> {
        let symbol = evaluated
            .get(IMPORT)?
            .get("provider")?
            .as_str()
            .filter(|s| !s.is_empty())?;

        Some(match self.template().imports.get(symbol) {
            Some(import) if !import.provider.is_empty() => import.provider.clone(),
            _ => symbol.to_string(),
        })
    }
}

fn required_string(evaluated: &Properties, key: &str, what: &str) -> Result<String> {
    match evaluated.get(key) {
        Some(Value::String(value)) => Ok(value.clone()),
        _ => Err(ArmError::validation(format!(
            "resource does not contain {}",
            what
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn options() -> TemplateOptions {
        TemplateOptions::new("sub", "rg")
    }

    fn template(resources: Value) -> DeploymentTemplate {
        serde_json::from_value(json!({ "resources": resources })).unwrap()
    }

    fn extract(entry: Value) -> Result<Resource> {
        let template = DeploymentTemplate::default();
        let mut evaluator = DeploymentEvaluator::new(template, options()).with_mode(Mode::Deferred);
        evaluator.extract_resource(entry.as_object().unwrap())
    }

    #[test]
    fn test_extract_resource() {
        let resource = extract(json!({
            "type": "Microsoft.CustomProviders/resourceProviders/Applications/Components",
            "name": "[format('{0}/{1}/{2}', 'radius', 'app', 'backend')]",
            "apiVersion": "2018-09-01-preview",
            "dependsOn": ["/some/id"],
            "kind": "radius.dev/Container@v1alpha1",
            "properties": {"uses": "[reference('x').y]"}
        }))
        .unwrap();

        assert_eq!(
            resource.id,
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.CustomProviders/resourceProviders/radius/Applications/app/Components/backend"
        );
        assert_eq!(resource.name, "radius/app/backend");
        assert_eq!(resource.api_version, "2018-09-01-preview");
        assert_eq!(resource.depends_on, vec!["/some/id"]);
        assert_eq!(
            Value::Object(resource.body),
            json!({
                "kind": "radius.dev/Container@v1alpha1",
                "properties": {"uses": "[reference('x').y]"}
            })
        );
        assert!(resource.import.is_none());
    }

    #[test]
    fn test_extract_missing_fields() {
        let err = extract(json!({"type": "Foo/bar", "apiVersion": "v1"})).unwrap_err();
        assert_eq!(err.to_string(), "resource does not contain a name");

        let err = extract(json!({"name": "x", "apiVersion": "v1"})).unwrap_err();
        assert_eq!(err.to_string(), "resource does not contain a type");

        let err = extract(json!({"name": "x", "type": "Foo/bar"})).unwrap_err();
        assert_eq!(err.to_string(), "resource x does not contain an apiVersion");

        let err = extract(json!({"name": 3, "type": "Foo/bar", "apiVersion": "v1"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_extract_depends_on_wrong_type() {
        let err = extract(json!({
            "name": "x", "type": "Foo/bar", "apiVersion": "v1", "dependsOn": "nope"
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "dependsOn is the wrong type");

        let err = extract(json!({
            "name": "x", "type": "Foo/bar", "apiVersion": "v1", "dependsOn": [1]
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "dependsOn is the wrong type");
    }

    #[test]
    fn test_extract_api_version_from_type() {
        let resource = extract(json!({
            "name": "web",
            "type": "kubernetes.core/Service@v1",
            "import": {"provider": "kubernetes"},
            "spec": {}
        }))
        .unwrap();

        assert_eq!(resource.resource_type, "kubernetes.core/Service");
        assert_eq!(resource.api_version, "v1");
        assert_eq!(resource.import.as_deref(), Some("kubernetes"));
        assert!(!resource.body.contains_key("import"));
        assert!(resource.body.contains_key("spec"));
    }

    #[test]
    fn test_extract_declared_import() {
        let template: DeploymentTemplate = serde_json::from_value(json!({
            "imports": {"k8s": {"provider": "kubernetes", "version": "1.0"}}
        }))
        .unwrap();
        let mut evaluator = DeploymentEvaluator::new(template, options()).with_mode(Mode::Deferred);

        let entry = json!({
            "name": "web",
            "type": "kubernetes.core/Service@v1",
            "import": {"provider": "k8s"}
        });
        let resource = evaluator.extract_resource(entry.as_object().unwrap()).unwrap();
        assert_eq!(resource.import.as_deref(), Some("kubernetes"));
    }

    #[test]
    fn test_extract_id_matches_resource_id_function() {
        let template = template(json!([{
            "type": "Foo/bar/baz",
            "name": "a/b",
            "apiVersion": "v1"
        }]));
        let resources = extract_skeleton(&template, &options()).unwrap();

        let mut evaluator = DeploymentEvaluator::new(template, options());
        let expected = evaluator
            .evaluate_str("[resourceId('Foo/bar/baz', 'a', 'b')]")
            .unwrap();
        assert_eq!(json!(resources[0].id), expected);
    }

    #[test]
    fn test_extract_deferred_properties() {
        let template = template(json!([{
            "type": "Foo/bar",
            "name": "a",
            "apiVersion": "v1",
            "properties": {"x": "[reference('missing').y]"}
        }]));

        // properties are left alone during extraction
        let resources = extract_skeleton(&template, &options()).unwrap();
        assert_eq!(resources[0].body["properties"]["x"], json!("[reference('missing').y]"));

        // evaluating them eagerly hits the deferred-mode boundary
        let options = TemplateOptions {
            evaluate_properties_node: true,
            ..options()
        };
        let err = extract_skeleton(&template, &options).unwrap_err();
        assert_eq!(err.to_string(), "property access is not supported");
    }

    #[test]
    fn test_extract_duplicate_ids() {
        let template = template(json!([
            {"type": "Foo/bar", "name": "a", "apiVersion": "v1"},
            {"type": "Foo/bar", "name": "a", "apiVersion": "v2"}
        ]));
        let err = extract_skeleton(&template, &options()).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_eval_orders_resources() {
        let template = r#"{
            "resources": [
                {
                    "type": "Foo/bar",
                    "name": "b",
                    "apiVersion": "v1",
                    "dependsOn": ["[resourceId('Foo/bar', 'c')]"]
                },
                {"type": "Foo/bar", "name": "c", "apiVersion": "v1"},
                {"type": "Foo/bar", "name": "a", "apiVersion": "v1"}
            ]
        }"#;

        let names: Vec<String> = eval(template, &options())
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_eval_invalid_json() {
        let err = eval("{", &options()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
