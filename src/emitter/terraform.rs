//! Terraform (HCL) rendering.
//!
//! Every string lands in an HCL string literal, where `${` and `%{` open a
//! template sequence. Plain text doubles the sigil to stay literal.

use std::collections::BTreeMap;

use crate::error::CodegenError;
use crate::params::{BackendKind, Params};
use crate::types::{IamRole, POLICY_VERSION, PolicyDocument, ResourceKind, SsmParameter};

use super::{Backend, indent_tail, quote, to_json};

/// Renders `main.tf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Terraform;

impl Terraform {
    /// `value` as an HCL string literal with no interpolation.
    fn string(&self, value: &str) -> String {
        quote(&self.escape(value))
    }
}

impl Backend for Terraform {
    fn kind(&self) -> BackendKind {
        BackendKind::Terraform
    }

    fn file_name(&self) -> &'static str {
        "main.tf"
    }

    fn account_id_symbol(&self) -> String {
        "${local.account_id}".to_string()
    }

    fn attribute_symbol(&self, kind: ResourceKind, id: &str, attribute: &str) -> String {
        format!("${{{kind}.{id}.{attribute}}}")
    }

    fn escape(&self, literal: &str) -> String {
        literal.replace("${", "$${").replace("%{", "%%{")
    }

    fn preamble(&self, params: &Params) -> Result<Option<String>, CodegenError> {
        let tags: BTreeMap<String, String> = params
            .tags()
            .iter()
            .map(|(key, value)| (self.escape(key), self.escape(value)))
            .collect();
        let tags = to_json(&tags)?;
        Ok(Some(format!(
            "locals {{\n  tags = {}\n}}",
            indent_tail(&tags, 2)
        )))
    }

    fn role(&self, id: &str, role: &IamRole, params: &Params) -> Result<String, CodegenError> {
        let trust = to_json(&PolicyDocument::new(std::slice::from_ref(
            &role.assume_role_policy,
        )))?;

        let mut lines = vec![
            format!("resource \"aws_iam_role\" \"{id}\" {{"),
            format!("  name = {}", self.string(&role.name)),
            format!("  description = {}", self.string(&role.description)),
            "  tags = local.tags".to_string(),
        ];
        if let Some(boundary) = params.permission_boundary() {
            lines.push(format!("  permissions_boundary = {}", self.string(boundary)));
        }
        lines.push(format!(
            "  assume_role_policy = jsonencode({})",
            indent_tail(&trust, 2)
        ));
        lines.push("}".to_string());

        Ok(lines.join("\n"))
    }

    fn managed_policies(
        &self,
        id: &str,
        policies: &[String],
    ) -> Result<Option<String>, CodegenError> {
        let policies: Vec<String> = policies.iter().map(|arn| self.escape(arn)).collect();
        Ok(Some(format!(
            "resource \"aws_iam_role_policy_attachment\" \"{id}\" {{\n  \
             for_each = toset({})\n  \
             role = aws_iam_role.{id}.name\n  \
             policy_arn = each.value\n\
             }}",
            indent_tail(&to_json(&policies)?, 2)
        )))
    }

    fn role_policies(&self, id: &str, role: &IamRole) -> Result<String, CodegenError> {
        Ok(format!(
            "resource \"aws_iam_role_policy\" \"{id}\" {{\n  \
             for_each = {}\n  \
             role = aws_iam_role.{id}.name\n  \
             name = each.key\n  \
             policy = jsonencode({{\n    \
             Version = \"{POLICY_VERSION}\"\n    \
             Statement = each.value\n  \
             }})\n\
             }}",
            indent_tail(&to_json(&role.statements)?, 2)
        ))
    }

    fn parameter(
        &self,
        id: &str,
        parameter: &SsmParameter,
        _params: &Params,
    ) -> Result<String, CodegenError> {
        Ok([
            format!("resource \"aws_ssm_parameter\" \"{id}\" {{"),
            format!("  name = {}", self.string(&parameter.name)),
            format!("  description = {}", self.string(&parameter.description)),
            "  type = \"String\"".to_string(),
            format!("  value = {}", quote(parameter.value.as_str())),
            "  tags = local.tags".to_string(),
            "}".to_string(),
        ]
        .join("\n"))
    }

    fn account_id(&self) -> String {
        "data \"aws_caller_identity\" \"current\" {}\n\n\
         locals {\n  \
         account_id = data.aws_caller_identity.current.account_id\n\
         }"
        .to_string()
    }
}
