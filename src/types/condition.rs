//! Policy condition blocks and the tag-based helpers built on them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use super::statement::OneOrMany;
use super::template::Template;

/// Tags that carry meaning in Elastio policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display)]
pub enum KnownTag {
    /// Customers put this on their resources (KMS keys, first of all) to
    /// grant Elastio access to them.
    #[strum(serialize = "elastio:authorize")]
    ElastioAuthorize,

    /// Set on every resource deployed by Elastio.
    #[strum(serialize = "elastio:resource")]
    ElastioResource,

    /// Set by AWS Backup on resources created by a restore test job.
    #[strum(serialize = "awsbackup-restore-test")]
    AwsBackupRestoreTest,
}

/// `{ operator: { key: value(s) } }`, sorted so rendering is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Condition(BTreeMap<String, BTreeMap<String, OneOrMany<Template>>>);

impl Condition {
    pub fn new() -> Self {
        Condition::default()
    }

    pub fn with(
        mut self,
        operator: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<OneOrMany<Template>>,
    ) -> Self {
        self.0
            .entry(operator.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    pub fn string_equals(key: impl Into<String>, value: impl Into<OneOrMany<Template>>) -> Self {
        Condition::new().with("StringEquals", key, value)
    }

    pub fn string_like(key: impl Into<String>, value: impl Into<OneOrMany<Template>>) -> Self {
        Condition::new().with("StringLike", key, value)
    }

    /// The resource carries `tag`, whatever its value.
    pub fn has_resource_tag(tag: KnownTag) -> Self {
        Condition::has_tag("aws:ResourceTag", tag)
    }

    /// The request sets `tag`, whatever its value.
    pub fn has_request_tag(tag: KnownTag) -> Self {
        Condition::has_tag("aws:RequestTag", tag)
    }

    fn has_tag(kind: &str, tag: KnownTag) -> Self {
        Condition::string_like(format!("{kind}/{tag}"), "*")
    }

    /// Union of both blocks; keys of `other` win under the same operator.
    pub fn merge(mut self, other: Condition) -> Self {
        for (operator, entries) in other.0 {
            self.0.entry(operator).or_default().extend(entries);
        }
        self
    }

    pub fn get(&self, operator: &str, key: &str) -> Option<&OneOrMany<Template>> {
        self.0.get(operator).and_then(|entries| entries.get(key))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A copy with `f` applied to every value. Operators and keys are ours
    /// and stay as they are.
    pub fn map_templates<E>(
        &self,
        f: &mut dyn FnMut(&Template) -> Result<Template, E>,
    ) -> Result<Self, E> {
        let mut mapped = Condition::new();
        for (operator, entries) in &self.0 {
            for (key, value) in entries {
                mapped = mapped.with(operator.as_str(), key.as_str(), value.try_map(&mut *f)?);
            }
        }
        Ok(mapped)
    }
}
