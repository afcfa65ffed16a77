//! Insertion-ordered map of capability group name to its statements.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::statement::PolicyStatement;
use super::template::Template;

/// Capability groups of one role, e.g. `WriteEc2` or `ReadS3`.
///
/// Order is the order groups were added, and it is the order they are
/// rendered in. Name uniqueness is not checked here; combining groups goes
/// through [`crate::merge`], which rejects collisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementGroups {
    entries: Vec<(String, Vec<PolicyStatement>)>,
}

impl StatementGroups {
    pub fn new() -> Self {
        StatementGroups::default()
    }

    /// Append a group, returning the updated value.
    pub fn group(mut self, name: impl Into<String>, statements: Vec<PolicyStatement>) -> Self {
        self.push(name, statements);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, statements: Vec<PolicyStatement>) {
        self.entries.push((name.into(), statements));
    }

    pub fn get(&self, name: &str) -> Option<&[PolicyStatement]> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, statements)| statements.as_slice())
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Vec<PolicyStatement>> {
        self.entries
            .iter_mut()
            .find(|(key, _)| key == name)
            .map(|(_, statements)| statements)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PolicyStatement])> {
        self.entries
            .iter()
            .map(|(name, statements)| (name.as_str(), statements.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn map_templates<E>(
        &self,
        f: &mut dyn FnMut(&Template) -> Result<Template, E>,
    ) -> Result<Self, E> {
        let mut entries = Vec::with_capacity(self.entries.len());
        for (name, statements) in &self.entries {
            let statements = statements
                .iter()
                .map(|statement| statement.map_templates(&mut *f))
                .collect::<Result<Vec<_>, E>>()?;
            entries.push((name.clone(), statements));
        }
        Ok(StatementGroups { entries })
    }
}

impl IntoIterator for StatementGroups {
    type Item = (String, Vec<PolicyStatement>);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for StatementGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, statements) in &self.entries {
            map.serialize_entry(name, statements)?;
        }
        map.end()
    }
}
