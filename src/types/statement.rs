//! Policy statements and the versioned document envelope around them.

use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display};

use crate::error::CodegenError;

use super::action::Action;
use super::condition::Condition;
use super::principal::Principal;
use super::template::Template;

/// The only IAM policy language version we emit.
pub const POLICY_VERSION: &str = "2012-10-17";

/// A value IAM accepts either on its own or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(v) => std::slice::from_ref(v).iter(),
            OneOrMany::Many(v) => v.iter(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> OneOrMany<T> {
    /// Apply `f` to every value, keeping the one-or-many shape.
    pub fn try_map<U, E>(&self, mut f: impl FnMut(&T) -> Result<U, E>) -> Result<OneOrMany<U>, E> {
        Ok(match self {
            OneOrMany::One(v) => OneOrMany::One(f(v)?),
            OneOrMany::Many(v) => OneOrMany::Many(v.iter().map(f).collect::<Result<_, _>>()?),
        })
    }
}

impl From<&str> for OneOrMany<Template> {
    fn from(value: &str) -> Self {
        OneOrMany::One(value.into())
    }
}

impl From<String> for OneOrMany<Template> {
    fn from(value: String) -> Self {
        OneOrMany::One(value.into())
    }
}

impl From<Template> for OneOrMany<Template> {
    fn from(value: Template) -> Self {
        OneOrMany::One(value)
    }
}

impl From<Vec<String>> for OneOrMany<Template> {
    fn from(value: Vec<String>) -> Self {
        OneOrMany::Many(value.into_iter().map(Template::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for OneOrMany<Template> {
    fn from(value: [&str; N]) -> Self {
        OneOrMany::Many(value.iter().map(|s| Template::from(*s)).collect())
    }
}

impl From<Action> for OneOrMany<Action> {
    fn from(value: Action) -> Self {
        OneOrMany::One(value)
    }
}

impl From<Vec<Action>> for OneOrMany<Action> {
    fn from(value: Vec<Action>) -> Self {
        OneOrMany::Many(value)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display,
)]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

/// One IAM policy statement.
///
/// `Effect` is always present in serialized output; it defaults to `Allow`.
/// IAM rejects a statement without actions, so [`PolicyStatement::check`]
/// and deserialization both refuse an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(default)]
    pub effect: Effect,
    #[serde(deserialize_with = "non_empty_actions")]
    pub action: OneOrMany<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<OneOrMany<Template>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl PolicyStatement {
    pub fn allow(action: impl Into<OneOrMany<Action>>) -> Self {
        PolicyStatement {
            sid: None,
            effect: Effect::Allow,
            action: action.into(),
            principal: None,
            resource: None,
            condition: None,
        }
    }

    pub fn deny(mut self) -> Self {
        self.effect = Effect::Deny;
        self
    }

    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn on(mut self, resource: impl Into<OneOrMany<Template>>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Fails when the statement grants no action. `context` names where the
    /// statement sits, for the error message.
    pub fn check(&self, context: &str) -> Result<(), CodegenError> {
        if self.action.is_empty() {
            return Err(CodegenError::EmptyActions(context.to_string()));
        }
        Ok(())
    }

    /// A copy with `f` applied to every resource, principal and condition
    /// value.
    pub fn map_templates<E>(
        &self,
        f: &mut dyn FnMut(&Template) -> Result<Template, E>,
    ) -> Result<Self, E> {
        Ok(PolicyStatement {
            sid: self.sid.clone(),
            effect: self.effect,
            action: self.action.clone(),
            principal: self
                .principal
                .as_ref()
                .map(|principal| principal.map_templates(&mut *f))
                .transpose()?,
            resource: self
                .resource
                .as_ref()
                .map(|resource| resource.try_map(&mut *f))
                .transpose()?,
            condition: self
                .condition
                .as_ref()
                .map(|condition| condition.map_templates(&mut *f))
                .transpose()?,
        })
    }
}

fn non_empty_actions<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<OneOrMany<Action>, D::Error> {
    let actions = OneOrMany::<Action>::deserialize(deserializer)?;
    if actions.is_empty() {
        return Err(serde::de::Error::custom("a statement needs at least one action"));
    }
    Ok(actions)
}

/// `{ "Version": "2012-10-17", "Statement": [...] }`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument<'a> {
    version: &'static str,
    statement: &'a [PolicyStatement],
}

impl<'a> PolicyDocument<'a> {
    pub fn new(statements: &'a [PolicyStatement]) -> Self {
        PolicyDocument {
            version: POLICY_VERSION,
            statement: statements,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, CodegenError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
