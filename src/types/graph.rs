//! The resource graph: resources keyed by id, in construction order.

use std::collections::HashSet;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::CodegenError;

use super::resource::Resource;
use super::template::Template;

/// Identifier of a resource within the graph, e.g. `cloud_connector`.
pub type ResourceId = String;

/// Resources in the order they were added. Emission follows this order.
///
/// Ids and names are unique, and every policy statement grants at least one
/// action. References always point at resources added earlier, so the graph
/// has no cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceGraph {
    resources: Vec<(ResourceId, Resource)>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        ResourceGraph::default()
    }

    pub fn insert(
        &mut self,
        id: impl Into<ResourceId>,
        resource: impl Into<Resource>,
    ) -> Result<(), CodegenError> {
        let id = id.into();
        let resource = resource.into();

        resource.check(&id)?;
        if self.get(&id).is_some() {
            return Err(CodegenError::DuplicateResource(id));
        }
        if self.iter().any(|(_, r)| r.name() == resource.name()) {
            return Err(CodegenError::DuplicateResourceName(
                resource.name().to_string(),
            ));
        }

        self.resources.push((id, resource));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, resource)| resource)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.resources
            .iter()
            .map(|(id, resource)| (id.as_str(), resource))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// A copy with `f` applied to every template of every resource, in graph
    /// order. Ids and names are untouched, so the copy keeps its invariants.
    pub fn map_templates<E>(
        &self,
        f: &mut dyn FnMut(&Template) -> Result<Template, E>,
    ) -> Result<Self, E> {
        let mut resources = Vec::with_capacity(self.resources.len());
        for (id, resource) in &self.resources {
            resources.push((id.clone(), resource.map_templates(&mut *f)?));
        }
        Ok(ResourceGraph { resources })
    }

    /// Distinct resource names, handy for asserting uniqueness.
    pub fn names(&self) -> HashSet<&str> {
        self.resources.iter().map(|(_, r)| r.name()).collect()
    }
}

impl Serialize for ResourceGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.resources.len()))?;
        for (id, resource) in &self.resources {
            map.serialize_entry(id, resource)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Action, IamRole, PolicyStatement, Principal, Service, SsmParameter, StatementGroups,
    };

    fn parameter(name: &str) -> SsmParameter {
        SsmParameter::new(name, "test", "value")
    }

    #[test]
    fn test_graph_keeps_insertion_order() {
        let mut graph = ResourceGraph::new();
        graph.insert("zeta", parameter("/z")).unwrap();
        graph.insert("alpha", parameter("/a")).unwrap();
        assert_eq!(graph.ids().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_graph_rejects_duplicate_id() {
        let mut graph = ResourceGraph::new();
        graph.insert("param", parameter("/a")).unwrap();
        let err = graph.insert("param", parameter("/b")).unwrap_err();
        assert!(matches!(err, CodegenError::DuplicateResource(id) if id == "param"));
    }

    #[test]
    fn test_graph_rejects_role_without_actions() {
        let trust = PolicyStatement::allow(Action::new(Service::Sts, "AssumeRole"))
            .with_principal(Principal::service("events.amazonaws.com"));
        let role = IamRole::new("Reader", "reads", trust).with_statements(
            StatementGroups::new().group("ReadEbs", vec![PolicyStatement::allow(Vec::<Action>::new()).on("*")]),
        );

        let mut graph = ResourceGraph::new();
        let err = graph.insert("reader", role).unwrap_err();
        assert!(matches!(err, CodegenError::EmptyActions(at) if at == "reader/ReadEbs"));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_graph_rejects_duplicate_name() {
        let mut graph = ResourceGraph::new();
        graph.insert("first", parameter("/a")).unwrap();
        let err = graph.insert("second", parameter("/a")).unwrap_err();
        assert!(matches!(err, CodegenError::DuplicateResourceName(name) if name == "/a"));
        assert_eq!(graph.len(), 1);
    }
}
