//! Resource graph insertion and inspection.
//!
//! Insertion enforces the structural invariants up front: ids are unique,
//! dependencies and reference targets must be declared before the node that
//! names them. Since no edge can point forward, every graph built through
//! these methods stays acyclic after wiring.

use super::error::SynthError;
use super::types::{AttrValue, CrossReference, ResourceGraph, ResourceSpec};
use tracing::debug;

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Rejects duplicate ids and dependencies on undeclared nodes.
    pub fn add(&mut self, spec: ResourceSpec) -> Result<(), SynthError> {
        if self.nodes.contains_key(&spec.id) {
            return Err(SynthError::DuplicateId(spec.id));
        }
        for dep in &spec.depends_on {
            if !self.nodes.contains_key(dep) {
                return Err(SynthError::UnknownDependency {
                    id: spec.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        debug!(id = %spec.id, kind = %spec.kind, deps = spec.depends_on.len(), "node declared");
        self.nodes.insert(spec.id.clone(), spec);
        Ok(())
    }

    /// Declare that `from.attribute` is filled by `to.to_attribute`.
    ///
    /// Both nodes must already exist; the slot on `from` is marked pending
    /// until wiring substitutes the value.
    pub fn reference(
        &mut self,
        from: &str,
        attribute: &str,
        to: &str,
        to_attribute: &str,
    ) -> Result<(), SynthError> {
        self.declare(CrossReference {
            from_id: from.to_string(),
            attribute: attribute.to_string(),
            to_id: to.to_string(),
            to_attribute: to_attribute.to_string(),
            template: None,
        })
    }

    /// Like [`ResourceGraph::reference`], rendering the value into `template`
    /// at its `{{value}}` placeholder.
    pub fn reference_with(
        &mut self,
        from: &str,
        attribute: &str,
        to: &str,
        to_attribute: &str,
        template: &str,
    ) -> Result<(), SynthError> {
        self.declare(CrossReference {
            from_id: from.to_string(),
            attribute: attribute.to_string(),
            to_id: to.to_string(),
            to_attribute: to_attribute.to_string(),
            template: Some(template.to_string()),
        })
    }

    fn declare(&mut self, xref: CrossReference) -> Result<(), SynthError> {
        let Some(to_index) = self.nodes.get_index_of(&xref.to_id) else {
            return Err(SynthError::DanglingReference {
                from: xref.from_id,
                attribute: xref.attribute,
                to: xref.to_id,
            });
        };
        let Some(from_index) = self.nodes.get_index_of(&xref.from_id) else {
            return Err(SynthError::DanglingReference {
                from: xref.from_id.clone(),
                attribute: xref.attribute,
                to: xref.from_id,
            });
        };
        // Wiring turns the reference into a from -> to edge
        if to_index >= from_index {
            return Err(SynthError::ForwardReference {
                from: xref.from_id,
                attribute: xref.attribute,
                to: xref.to_id,
            });
        }
        if !self.nodes[to_index]
            .kind
            .exports()
            .iter()
            .any(|a| *a == xref.to_attribute)
        {
            return Err(SynthError::UnknownAttribute {
                node: xref.to_id,
                attribute: xref.to_attribute,
            });
        }
        self.nodes[from_index]
            .config
            .insert(xref.attribute.clone(), AttrValue::Pending);
        self.references.push(xref);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ResourceSpec> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ResourceSpec> {
        self.nodes.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in declaration order.
    pub fn ids(&self) -> Vec<&str> {
        self.nodes.keys().map(String::as_str).collect()
    }

    /// `(node, attribute)` pairs still waiting on wiring.
    pub fn pending_slots(&self) -> Vec<(String, String)> {
        self.nodes
            .values()
            .flat_map(|n| {
                n.config
                    .iter()
                    .filter(|(_, v)| v.is_pending())
                    .map(|(k, _)| (n.id.clone(), k.clone()))
            })
            .collect()
    }

    /// Whether `target` is reachable from `start` through dependency edges.
    pub fn depends_transitively(&self, start: &str, target: &str) -> bool {
        let mut stack: Vec<&str> = match self.nodes.get(start) {
            Some(n) => n.depends_on.iter().map(String::as_str).collect(),
            None => return false,
        };
        let mut seen = std::collections::HashSet::new();
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(n) = self.nodes.get(id) {
                stack.extend(n.depends_on.iter().map(String::as_str));
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ResourceKind;

    fn role() -> ResourceSpec {
        ResourceSpec::new("Role", ResourceKind::Role).with("assumed_by", "lambda.amazonaws.com")
    }

    #[test]
    fn test_add_and_get() {
        let mut g = ResourceGraph::new();
        g.add(role()).unwrap();
        assert_eq!(g.len(), 1);
        assert_eq!(g.get("Role").unwrap().kind, ResourceKind::Role);
        assert!(g.get("Nope").is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut g = ResourceGraph::new();
        g.add(role()).unwrap();
        assert_eq!(
            g.add(role()).unwrap_err(),
            SynthError::DuplicateId("Role".to_string())
        );
    }

    #[test]
    fn test_forward_dependency_rejected() {
        let mut g = ResourceGraph::new();
        let f = ResourceSpec::new("Fn", ResourceKind::Function).after("Role");
        assert!(matches!(
            g.add(f),
            Err(SynthError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn test_reference_marks_pending() {
        let mut g = ResourceGraph::new();
        g.add(role()).unwrap();
        g.add(ResourceSpec::new("Fn", ResourceKind::Function).after("Role"))
            .unwrap();
        g.reference("Fn", "role", "Role", "arn").unwrap();
        assert!(g.get("Fn").unwrap().config["role"].is_pending());
        assert_eq!(
            g.pending_slots(),
            vec![("Fn".to_string(), "role".to_string())]
        );
        assert_eq!(g.references.len(), 1);
    }

    #[test]
    fn test_reference_to_missing_node() {
        let mut g = ResourceGraph::new();
        g.add(ResourceSpec::new("Fn", ResourceKind::Function)).unwrap();
        let err = g.reference("Fn", "role", "Role", "arn").unwrap_err();
        assert!(matches!(err, SynthError::DanglingReference { .. }));
        assert!(g.references.is_empty());
    }

    #[test]
    fn test_reference_unexported_attribute() {
        let mut g = ResourceGraph::new();
        g.add(role()).unwrap();
        g.add(ResourceSpec::new("Fn", ResourceKind::Function)).unwrap();
        let err = g.reference("Fn", "role", "Role", "assumed_by").unwrap_err();
        assert_eq!(
            err,
            SynthError::UnknownAttribute {
                node: "Role".to_string(),
                attribute: "assumed_by".to_string()
            }
        );
    }

    #[test]
    fn test_reference_to_later_node_rejected() {
        let mut g = ResourceGraph::new();
        g.add(role()).unwrap();
        g.add(ResourceSpec::new("Fn", ResourceKind::Function).after("Role"))
            .unwrap();
        let err = g.reference("Role", "policy_target", "Fn", "arn").unwrap_err();
        assert_eq!(
            err,
            SynthError::ForwardReference {
                from: "Role".to_string(),
                attribute: "policy_target".to_string(),
                to: "Fn".to_string(),
            }
        );
        assert!(g.references.is_empty());
        assert!(g.pending_slots().is_empty());
    }

    #[test]
    fn test_self_reference_rejected() {
        let mut g = ResourceGraph::new();
        g.add(role()).unwrap();
        assert!(matches!(
            g.reference("Role", "own_arn", "Role", "arn"),
            Err(SynthError::ForwardReference { .. })
        ));
    }

    #[test]
    fn test_reference_from_missing_consumer() {
        let mut g = ResourceGraph::new();
        g.add(role()).unwrap();
        assert!(matches!(
            g.reference("Ghost", "role", "Role", "arn"),
            Err(SynthError::DanglingReference { .. })
        ));
    }

    #[test]
    fn test_depends_transitively() {
        let mut g = ResourceGraph::new();
        g.add(ResourceSpec::new("a", ResourceKind::Role)).unwrap();
        g.add(ResourceSpec::new("b", ResourceKind::Function).after("a"))
            .unwrap();
        g.add(ResourceSpec::new("c", ResourceKind::Api).after("b"))
            .unwrap();
        assert!(g.depends_transitively("c", "a"));
        assert!(!g.depends_transitively("a", "c"));
        assert!(!g.depends_transitively("ghost", "a"));
    }
}
