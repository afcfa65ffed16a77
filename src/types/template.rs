//! String values of policies and parameters.
//!
//! Placeholders only ever come from text we write ourselves. Values taken
//! from the caller (the external id, a name with its prefix) are kept apart
//! so that nothing in them is read as a placeholder.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::reference::Reference;

/// A policy or parameter string.
///
/// Both forms serialize as the plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Template {
    /// Builder text; `{{...}}` placeholders are rewritten per backend.
    Pattern(String),
    /// Emitted as is, apart from the backend's escaping.
    Literal(String),
}

impl Template {
    pub fn literal(value: impl Into<String>) -> Self {
        Template::Literal(value.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Template::Pattern(text) | Template::Literal(text) => text,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Template::Literal(_))
    }
}

impl Display for Template {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Template {
    fn from(value: &str) -> Self {
        Template::Pattern(value.to_string())
    }
}

impl From<String> for Template {
    fn from(value: String) -> Self {
        Template::Pattern(value)
    }
}

impl From<&Reference> for Template {
    fn from(reference: &Reference) -> Self {
        Template::Pattern(reference.to_string())
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Template::Pattern)
    }
}
