//! Symbolic cross-resource references embedded in policy strings.
//!
//! Canonical forms:
//! - `{{account_id}}`: the id of the account the code is deployed to
//! - `{{<resourceType>.<resourceId>.<attribute>}}`: an attribute of another
//!   resource in the graph, e.g. `{{aws_iam_role.asset_region_stack_deployer.arn}}`
//!
//! Placeholders are written by the graph builder and rewritten by the
//! resolver into each backend's interpolation syntax.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CodegenError;

use super::resource::ResourceKind;

/// The reserved symbol for the deploying account id.
pub const ACCOUNT_ID: &str = "account_id";

static ATTRIBUTE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z][a-z0-9_]*)\.([A-Za-z][A-Za-z0-9_]*)\.([a-z][a-z_]*)$")
        .expect("attribute path pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reference {
    AccountId,
    Attribute {
        resource_type: String,
        resource_id: String,
        attribute: String,
    },
}

impl Reference {
    pub fn attribute(
        kind: ResourceKind,
        resource_id: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Reference::Attribute {
            resource_type: kind.as_ref().to_string(),
            resource_id: resource_id.into(),
            attribute: attribute.into(),
        }
    }

    /// The ARN of the resource `resource_id` once it's deployed.
    pub fn arn(kind: ResourceKind, resource_id: impl Into<String>) -> Self {
        Reference::attribute(kind, resource_id, "arn")
    }

    /// The symbol-table key, i.e. the placeholder body without braces.
    pub fn key(&self) -> String {
        match self {
            Reference::AccountId => ACCOUNT_ID.to_string(),
            Reference::Attribute {
                resource_type,
                resource_id,
                attribute,
            } => format!("{resource_type}.{resource_id}.{attribute}"),
        }
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{{{{{}}}}}", self.key())
    }
}

/// Parses a placeholder body, with or without the surrounding braces.
impl FromStr for Reference {
    type Err = CodegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix("{{")
            .and_then(|rest| rest.strip_suffix("}}"))
            .unwrap_or(s)
            .trim();

        if body == ACCOUNT_ID {
            return Ok(Reference::AccountId);
        }

        let caps = ATTRIBUTE_PATH.captures(body).ok_or_else(|| {
            CodegenError::MalformedReference(format!(
                "'{s}' (expected format: account_id or resourceType.resourceId.attribute)"
            ))
        })?;

        Ok(Reference::Attribute {
            resource_type: caps[1].to_string(),
            resource_id: caps[2].to_string(),
            attribute: caps[3].to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn test_account_id_display() {
        assert_eq!(Reference::AccountId.to_string(), "{{account_id}}");
    }

    #[test]
    fn test_arn_display() {
        let reference = Reference::arn(ResourceKind::IamRole, "inventory_event_target");
        assert_eq!(
            reference.to_string(),
            "{{aws_iam_role.inventory_event_target.arn}}"
        );
        assert_eq!(reference.key(), "aws_iam_role.inventory_event_target.arn");
    }

    #[parameterized(
        account_id = { "account_id" },
        account_id_braced = { "{{account_id}}" },
        role_arn = { "aws_iam_role.cloud_connector.arn" },
        role_arn_braced = { "{{aws_iam_role.cloud_connector.arn}}" },
        parameter_value = { "aws_ssm_parameter.stack_name.value" },
    )]
    fn test_reference_parse_roundtrip(input: &str) {
        let reference = Reference::from_str(input).unwrap();
        assert_eq!(reference.key(), input.trim_start_matches("{{").trim_end_matches("}}"));
    }

    #[parameterized(
        empty = { "" },
        two_parts = { "aws_iam_role.arn" },
        four_parts = { "aws_iam_role.x.arn.extra" },
        spaces = { "aws iam role.x.arn" },
        interpolation = { "${local.account_id}" },
    )]
    fn test_reference_parse_rejects(input: &str) {
        assert!(matches!(
            Reference::from_str(input),
            Err(CodegenError::MalformedReference(_))
        ));
    }
}
