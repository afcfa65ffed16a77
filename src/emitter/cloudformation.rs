//! CloudFormation (YAML) rendering.
//!
//! Policy documents are JSON block scalars under `!Sub`, so the `${...}`
//! expressions produced by reference resolution are substituted at deploy
//! time. Plain text in those documents is written as `${!` so `Fn::Sub`
//! leaves it alone. `Fn::ForEach` can't carry a per-item document that needs
//! `Fn::Sub`, so each statement group becomes its own `AWS::IAM::RolePolicy`.

use std::collections::HashSet;

use itertools::Itertools;
use tracing::warn;

use crate::error::CodegenError;
use crate::params::{BackendKind, Params};
use crate::types::{IamRole, PolicyDocument, Resource, ResourceGraph, ResourceKind, SsmParameter};

use super::{Backend, indent_block, quote, to_json};

/// Version reported in the template outputs.
pub const TEMPLATE_VERSION: &str = "0.35.13";

const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Renders `template.yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudFormation;

/// Logical id of the resource `id`: `cloud_connector` becomes
/// `CloudConnector`. Only ASCII alphanumerics survive.
pub fn logical_id(id: &str) -> String {
    id.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn policy_logical_id(role_id: &str, group: &str) -> String {
    format!("{}{}Policy", logical_id(role_id), logical_id(group))
}

fn tag_list(params: &Params) -> String {
    params
        .tags()
        .iter()
        .map(|(key, value)| format!("        - Key: {}\n          Value: {}", quote(key), quote(value)))
        .join("\n")
}

fn policy_block(document: &PolicyDocument<'_>) -> Result<String, CodegenError> {
    Ok(indent_block(&to_json(document)?, 8))
}

impl Backend for CloudFormation {
    fn kind(&self) -> BackendKind {
        BackendKind::CloudFormation
    }

    fn file_name(&self) -> &'static str {
        "template.yaml"
    }

    fn account_id_symbol(&self) -> String {
        "${AWS::AccountId}".to_string()
    }

    /// `name` is what `!Ref` returns for both roles and parameters; any
    /// other attribute goes through `GetAtt`.
    fn attribute_symbol(&self, _kind: ResourceKind, id: &str, attribute: &str) -> String {
        let logical = logical_id(id);
        match attribute {
            "name" => format!("${{{logical}}}"),
            other => format!("${{{logical}.{}}}", logical_id(other)),
        }
    }

    fn escape(&self, literal: &str) -> String {
        literal.replace("${", "${!")
    }

    /// Logical ids share one namespace, and distinct resource ids or group
    /// names may map to the same one.
    fn check(&self, graph: &ResourceGraph) -> Result<(), CodegenError> {
        let mut seen = HashSet::new();
        for (id, resource) in graph.iter() {
            let mut ids = vec![logical_id(id)];
            if let Resource::IamRole(role) = resource {
                ids.extend(role.statements.names().map(|group| policy_logical_id(id, group)));
            }
            for logical in ids {
                if logical.is_empty() {
                    return Err(CodegenError::InvalidFormat(format!(
                        "resource id '{id}' has no alphanumeric characters"
                    )));
                }
                if !seen.insert(logical.clone()) {
                    warn!(event = "Emit", phase = "LogicalId", duplicate = logical.as_str());
                    return Err(CodegenError::DuplicateLogicalId(logical));
                }
            }
        }
        Ok(())
    }

    fn preamble(&self, _params: &Params) -> Result<Option<String>, CodegenError> {
        Ok(Some(format!(
            "AWSTemplateFormatVersion: \"{TEMPLATE_FORMAT_VERSION}\"\n\
             Description: \"Elastio Asset Account\"\n\
             Resources:"
        )))
    }

    fn role(&self, id: &str, role: &IamRole, params: &Params) -> Result<String, CodegenError> {
        let trust = policy_block(&PolicyDocument::new(std::slice::from_ref(
            &role.assume_role_policy,
        )))?;

        let mut lines = vec![
            format!("  {}:", logical_id(id)),
            "    Type: AWS::IAM::Role".to_string(),
            "    Properties:".to_string(),
            format!("      RoleName: {}", quote(&role.name)),
            format!("      Description: {}", quote(&role.description)),
        ];
        if let Some(boundary) = params.permission_boundary() {
            lines.push(format!("      PermissionsBoundary: {}", quote(boundary)));
        }
        if !params.managed_policies().is_empty() {
            lines.push("      ManagedPolicyArns:".to_string());
            lines.extend(
                params
                    .managed_policies()
                    .iter()
                    .map(|arn| format!("        - {}", quote(arn))),
            );
        }
        lines.push("      Tags:".to_string());
        lines.push(tag_list(params));
        lines.push("      AssumeRolePolicyDocument: !Sub |".to_string());
        lines.push(trust);

        Ok(lines.join("\n"))
    }

    fn role_policies(&self, id: &str, role: &IamRole) -> Result<String, CodegenError> {
        let role_id = logical_id(id);
        let mut blocks = Vec::with_capacity(role.statements.len());

        for (group, statements) in role.statements.iter() {
            blocks.push(format!(
                "  {}:\n    \
                 Type: AWS::IAM::RolePolicy\n    \
                 Properties:\n      \
                 RoleName: !Ref {role_id}\n      \
                 PolicyName: {}\n      \
                 PolicyDocument: !Sub |\n{}",
                policy_logical_id(id, group),
                quote(group),
                policy_block(&PolicyDocument::new(statements))?
            ));
        }

        Ok(blocks.join("\n\n"))
    }

    fn parameter(
        &self,
        id: &str,
        parameter: &SsmParameter,
        params: &Params,
    ) -> Result<String, CodegenError> {
        let tags = params
            .tags()
            .iter()
            .map(|(key, value)| format!("        {}: {}", quote(key), quote(value)))
            .join("\n");

        Ok([
            format!("  {}:", logical_id(id)),
            "    Type: AWS::SSM::Parameter".to_string(),
            "    Properties:".to_string(),
            format!("      Name: {}", quote(&parameter.name)),
            format!("      Description: {}", quote(&parameter.description)),
            "      Type: String".to_string(),
            format!("      Value: !Sub {}", quote(parameter.value.as_str())),
            "      Tags:".to_string(),
            tags,
        ]
        .join("\n"))
    }

    fn account_id(&self) -> String {
        format!(
            "Outputs:\n  \
             AccountId:\n    \
             Value: !Ref AWS::AccountId\n  \
             CfnTemplateVersion:\n    \
             Value: \"{TEMPLATE_VERSION}\""
        )
    }
}
