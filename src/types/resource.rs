//! Backend-agnostic resources of the graph.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::CodegenError;

use super::statement::PolicyStatement;
use super::statement_groups::StatementGroups;
use super::template::Template;

/// Resource type names, as they appear in placeholders.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
)]
pub enum ResourceKind {
    #[strum(serialize = "aws_iam_role")]
    #[serde(rename = "aws_iam_role")]
    IamRole,
    #[strum(serialize = "aws_ssm_parameter")]
    #[serde(rename = "aws_ssm_parameter")]
    SsmParameter,
}

impl ResourceKind {
    /// Attributes other resources may reference once this one is deployed.
    pub fn attributes(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::IamRole => &["arn", "name"],
            ResourceKind::SsmParameter => &["name", "value"],
        }
    }
}

/// An IAM role with its trust policy and inline capability groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IamRole {
    pub name: String,
    pub description: String,
    pub assume_role_policy: PolicyStatement,
    pub statements: StatementGroups,
}

impl IamRole {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        assume_role_policy: PolicyStatement,
    ) -> Self {
        IamRole {
            name: name.into(),
            description: description.into(),
            assume_role_policy,
            statements: StatementGroups::new(),
        }
    }

    pub fn with_statements(mut self, statements: StatementGroups) -> Self {
        self.statements = statements;
        self
    }

    /// Every statement of the role grants at least one action.
    pub fn check(&self, id: &str) -> Result<(), CodegenError> {
        self.assume_role_policy.check(&format!("{id} trust policy"))?;
        for (group, statements) in self.statements.iter() {
            for statement in statements {
                statement.check(&format!("{id}/{group}"))?;
            }
        }
        Ok(())
    }

    pub fn map_templates<E>(
        &self,
        f: &mut dyn FnMut(&Template) -> Result<Template, E>,
    ) -> Result<Self, E> {
        Ok(IamRole {
            name: self.name.clone(),
            description: self.description.clone(),
            assume_role_policy: self.assume_role_policy.map_templates(&mut *f)?,
            statements: self.statements.map_templates(&mut *f)?,
        })
    }
}

/// A plain string entry in the parameter store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SsmParameter {
    pub name: String,
    pub description: String,
    pub value: Template,
}

impl SsmParameter {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        value: impl Into<Template>,
    ) -> Self {
        SsmParameter {
            name: name.into(),
            description: description.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Resource {
    #[serde(rename = "aws_iam_role")]
    IamRole(IamRole),
    #[serde(rename = "aws_ssm_parameter")]
    SsmParameter(SsmParameter),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::IamRole(_) => ResourceKind::IamRole,
            Resource::SsmParameter(_) => ResourceKind::SsmParameter,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Resource::IamRole(role) => &role.name,
            Resource::SsmParameter(parameter) => &parameter.name,
        }
    }

    pub fn as_role(&self) -> Option<&IamRole> {
        match self {
            Resource::IamRole(role) => Some(role),
            Resource::SsmParameter(_) => None,
        }
    }

    pub fn check(&self, id: &str) -> Result<(), CodegenError> {
        match self {
            Resource::IamRole(role) => role.check(id),
            Resource::SsmParameter(_) => Ok(()),
        }
    }

    pub fn map_templates<E>(
        &self,
        f: &mut dyn FnMut(&Template) -> Result<Template, E>,
    ) -> Result<Self, E> {
        Ok(match self {
            Resource::IamRole(role) => Resource::IamRole(role.map_templates(&mut *f)?),
            Resource::SsmParameter(parameter) => Resource::SsmParameter(SsmParameter {
                value: f(&parameter.value)?,
                ..parameter.clone()
            }),
        })
    }
}

impl From<IamRole> for Resource {
    fn from(role: IamRole) -> Self {
        Resource::IamRole(role)
    }
}

impl From<SsmParameter> for Resource {
    fn from(parameter: SsmParameter) -> Self {
        Resource::SsmParameter(parameter)
    }
}
