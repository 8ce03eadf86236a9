//! Dependency ordering
//!
//! Resources are visited in lexicographic ID order and each one is placed
//! after everything it depends on. The result is deterministic for a given
//! set of resources regardless of how they were collected.

use crate::error::{ArmError, Result};
use crate::template::Resource;
use std::collections::{HashMap, HashSet};

/// Order resources so that each one follows all of its `depends_on` targets
pub fn order_resources(resources: HashMap<String, Resource>) -> Result<Vec<Resource>> {
    let mut ids: Vec<&String> = resources.keys().collect();
    ids.sort();

    let mut orderer = Orderer {
        resources: &resources,
        ordered: Vec::with_capacity(resources.len()),
        members: HashSet::new(),
        visiting: Vec::new(),
    };

    for id in ids {
        orderer.ensure_present(id)?;
    }

    let order = orderer.ordered;
    let mut resources = resources;
    Ok(order
        .into_iter()
        .filter_map(|id| resources.remove(&id))
        .collect())
}

struct Orderer<'a> {
    resources: &'a HashMap<String, Resource>,
    ordered: Vec<String>,
    members: HashSet<&'a str>,
    /// Current depth-first path
    visiting: Vec<&'a str>,
}

impl<'a> Orderer<'a> {
    fn ensure_present(&mut self, id: &str) -> Result<()> {
        let resources = self.resources;
        let resource = resources
            .get(id)
            .ok_or_else(|| ArmError::validation(format!("could not find resource with id: {}", id)))?;
        let id = resource.id.as_str();

        if self.members.contains(id) {
            return Ok(());
        }

        if let Some(start) = self.visiting.iter().position(|v| *v == id) {
            let mut cycle: Vec<String> = self.visiting[start..]
                .iter()
                .map(|v| v.to_string())
                .collect();
            cycle.push(id.to_string());
            return Err(ArmError::CyclicDependency(cycle));
        }

        self.visiting.push(id);
        for dependency in &resource.depends_on {
            self.ensure_present(dependency)?;
        }
        self.visiting.pop();

        self.members.insert(id);
        self.ordered.push(id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radius_providers::Properties;

    fn resource(id: &str, depends_on: &[&str]) -> Resource {
        Resource {
            id: id.to_string(),
            resource_type: "Foo/bar".to_string(),
            api_version: "v1".to_string(),
            name: id.to_string(),
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
            body: Properties::new(),
            import: None,
        }
    }

    fn set(resources: Vec<Resource>) -> HashMap<String, Resource> {
        resources.into_iter().map(|r| (r.id.clone(), r)).collect()
    }

    fn ids(ordered: &[Resource]) -> Vec<&str> {
        ordered.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_order_without_dependencies_is_sorted() {
        let ordered = order_resources(set(vec![
            resource("c", &[]),
            resource("a", &[]),
            resource("b", &[]),
        ]))
        .unwrap();
        assert_eq!(ids(&ordered), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_order_exact_sequence() {
        let ordered = order_resources(set(vec![
            resource("a", &["d"]),
            resource("b", &[]),
            resource("c", &["b", "a"]),
            resource("d", &["e"]),
            resource("e", &[]),
        ]))
        .unwrap();
        assert_eq!(ids(&ordered), vec!["e", "d", "a", "b", "c"]);
    }

    #[test]
    fn test_order_dependencies_first() {
        let resources = vec![
            resource("app", &[]),
            resource("db", &["app"]),
            resource("backend", &["app", "db"]),
            resource("frontend", &["app", "backend"]),
        ];
        let expected: HashMap<String, Vec<String>> = resources
            .iter()
            .map(|r| (r.id.clone(), r.depends_on.clone()))
            .collect();

        let ordered = order_resources(set(resources)).unwrap();
        let position: HashMap<&str, usize> = ordered
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.as_str(), i))
            .collect();

        for (id, depends_on) in &expected {
            for dependency in depends_on {
                assert!(position[id.as_str()] > position[dependency.as_str()]);
            }
        }
    }

    #[test]
    fn test_order_is_deterministic() {
        let build = || {
            set(vec![
                resource("z", &["m"]),
                resource("m", &[]),
                resource("a", &["z"]),
                resource("q", &[]),
            ])
        };

        let first = ids(&order_resources(build()).unwrap())
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        for _ in 0..10 {
            let again = order_resources(build()).unwrap();
            assert_eq!(ids(&again), first);
        }
        assert_eq!(first, vec!["m", "z", "a", "q"]);
    }

    #[test]
    fn test_order_missing_dependency() {
        let err = order_resources(set(vec![resource("a", &["missing"])])).unwrap_err();
        assert_eq!(err.to_string(), "could not find resource with id: missing");
    }

    #[test]
    fn test_order_detects_cycles() {
        let err = order_resources(set(vec![
            resource("a", &["b"]),
            resource("b", &["c"]),
            resource("c", &["a"]),
        ]))
        .unwrap_err();

        match err {
            ArmError::CyclicDependency(cycle) => assert_eq!(cycle, vec!["a", "b", "c", "a"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_order_self_dependency() {
        let err = order_resources(set(vec![resource("a", &["a"])])).unwrap_err();
        assert!(matches!(err, ArmError::CyclicDependency(_)));
    }
}
