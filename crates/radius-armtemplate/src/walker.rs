//! Document walker
//!
//! Applies the evaluator to every string in a JSON value: leaves and map
//! keys alike. A preserved subtree is copied through untouched so its
//! expressions can be evaluated later.

use crate::error::ArmError;
use crate::eval::{DeploymentEvaluator, Eval};
use radius_armexpr::{is_standard_arm_expression, parse, unescape_literal};
use serde_json::{Map, Value};

impl DeploymentEvaluator {
    pub(crate) fn walk(&mut self, value: &Value, preserve: bool) -> Eval<Value> {
        match value {
            Value::String(text) => self.walk_string(text, preserve),
            Value::Array(items) => {
                let mut walked = Vec::with_capacity(items.len());
                for item in items {
                    walked.push(self.walk(item, preserve)?);
                }
                Ok(Value::Array(walked))
            }
            Value::Object(map) => self.walk_map(map, preserve).map(Value::Object),
            // null, bool and number never hold expressions
            other => Ok(other.clone()),
        }
    }

    fn walk_map(&mut self, map: &Map<String, Value>, preserve: bool) -> Eval<Map<String, Value>> {
        let mut walked = Map::with_capacity(map.len());

        for (key, value) in map {
            let key = match self.walk_string(key, preserve)? {
                Value::String(key) => key,
                other => {
                    return Err(ArmError::evaluation(format!(
                        "map key must evaluate to a string, was: {}",
                        other
                    ))
                    .into());
                }
            };

            walked.insert(key, self.walk(value, preserve)?);
        }

        Ok(walked)
    }

    fn walk_string(&mut self, text: &str, preserve: bool) -> Eval<Value> {
        if preserve {
            return Ok(Value::String(text.to_string()));
        }

        if !is_standard_arm_expression(text) {
            return Ok(Value::String(unescape_literal(text).to_string()));
        }

        let tree = parse(text)?;
        self.visit(&tree.expression)
    }
}

#[cfg(test)]
mod tests {
    use crate::eval::{DeploymentEvaluator, Mode};
    use crate::template::{DeploymentTemplate, TemplateOptions};
    use serde_json::json;

    fn evaluator() -> DeploymentEvaluator {
        let template = DeploymentTemplate {
            variables: json!({"key": "name", "app": "frontend"})
                .as_object()
                .cloned()
                .unwrap(),
            ..Default::default()
        };
        DeploymentEvaluator::new(template, TemplateOptions::new("sub", "rg"))
    }

    #[test]
    fn test_walk_nested_values() {
        let mut evaluator = evaluator();
        let input = json!({
            "plain": "value",
            "count": 3,
            "enabled": true,
            "nothing": null,
            "list": ["[variables('app')]", "x", 1],
            "nested": {"inner": "[format('{0}-{1}', 'a', 'b')]"}
        });

        let output = evaluator.evaluate(&input).unwrap();
        assert_eq!(
            output,
            json!({
                "plain": "value",
                "count": 3,
                "enabled": true,
                "nothing": null,
                "list": ["frontend", "x", 1],
                "nested": {"inner": "a-b"}
            })
        );
    }

    #[test]
    fn test_walk_evaluates_keys() {
        let mut evaluator = evaluator();
        let output = evaluator
            .evaluate(&json!({"[variables('key')]": "v"}))
            .unwrap();
        assert_eq!(output, json!({"name": "v"}));
    }

    #[test]
    fn test_walk_rejects_non_string_key() {
        let mut evaluator = evaluator();
        let err = evaluator
            .evaluate(&json!({"[createObject('a', 'b')]": "v"}))
            .unwrap_err();
        assert!(err.to_string().starts_with("map key must evaluate to a string"));
    }

    #[test]
    fn test_walk_preserved_subtree() {
        let mut evaluator = evaluator().with_mode(Mode::Deferred);
        let input = json!({"[variables('key')]": "[reference('x').y]"});

        let output = evaluator.walk(&input, true).ok().unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_walk_escaped_literal() {
        let mut evaluator = evaluator();
        let output = evaluator.evaluate(&json!("[[not an expression]")).unwrap();
        assert_eq!(output, json!("[not an expression]"));
    }

    #[test]
    fn test_walk_propagates_parse_errors() {
        let mut evaluator = evaluator();
        let err = evaluator.evaluate(&json!({"a": ["[format('x']"]})).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Parse);
    }
}
