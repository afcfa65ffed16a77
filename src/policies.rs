//! Standalone managed policies that customers attach themselves.
//!
//! The registry is a fixed list known at compile time. Names are the policy
//! names customers see.

use serde::Serialize;

use crate::catalog::allow_kms;
use crate::error::CodegenError;
use crate::types::{Condition, KnownTag, PolicyDocument, PolicyStatement, actions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub description: &'static str,
    pub statements: Vec<PolicyStatement>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Definition<'a> {
    description: &'a str,
    policy_document: PolicyDocument<'a>,
}

impl Policy {
    pub fn document(&self) -> PolicyDocument<'_> {
        PolicyDocument::new(&self.statements)
    }

    /// `{ "Description": ..., "PolicyDocument": { "Version", "Statement" } }`
    pub fn definition_json(&self) -> Result<String, CodegenError> {
        for (index, statement) in self.statements.iter().enumerate() {
            statement.check(&format!("statement {index}"))?;
        }
        Ok(serde_json::to_string_pretty(&Definition {
            description: self.description,
            policy_document: self.document(),
        })?)
    }
}

/// Every standalone policy, in publication order.
pub fn registry() -> Vec<(&'static str, Policy)> {
    vec![
        ("ElastioAssetAccountDeployer", asset_account_deployer()),
        ("ElastioAwsBackupEc2Scan", aws_backup_ec2_scan()),
    ]
}

/// Look up a policy by name.
pub fn get(name: &str) -> Option<Policy> {
    registry()
        .into_iter()
        .find(|(policy_name, _)| *policy_name == name)
        .map(|(_, policy)| policy)
}

/// Meant for the StackSet execution role that deploys the asset account
/// stack.
fn asset_account_deployer() -> Policy {
    let elastio_roles = "arn:*:iam::*:role/*Elastio*";

    Policy {
        description: "Permissions required to deploy the Elastio Asset Account stack",
        statements: vec![
            PolicyStatement::allow(actions![
                Lambda: ["*"],
                Cloudformation: ["*"],
                Logs: ["*"],
                Ssm: ["*"],
                Kms: ["*"],
            ])
            .on("*"),
            PolicyStatement::allow(actions![Iam: [
                "GetRole",
                "GetRolePolicy",
                "ListAttachedRolePolicies",
                "ListRolePolicies",
                "ListRoles",
                "ListPolicyVersions",
                "ListRoleTags",
                "ListPolicyTags",
            ]])
            .with_sid("ElastioIamRead")
            .on("*"),
            PolicyStatement::allow(actions![Iam: ["CreateRole", "CreatePolicy"]])
                .with_sid("ElastioIamCreate")
                .on("*")
                .with_condition(Condition::has_request_tag(KnownTag::ElastioResource)),
            PolicyStatement::allow(actions![Iam: [
                // Roles
                "UpdateRole",
                "UpdateAssumeRolePolicy",
                "UpdateRoleDescription",
                "PutRolePolicy",
                "DeleteRolePolicy",
                "PutRolePermissionsBoundary",
                "DeleteRolePermissionsBoundary",
                "AttachRolePolicy",
                "DetachRolePolicy",
                "TagRole",
                "UntagRole",
                // Managed policies
                "CreatePolicyVersion",
                "DeletePolicyVersion",
                "GetPolicy",
                "GetPolicyVersion",
                "SetDefaultPolicyVersion",
                "TagPolicy",
                "UntagPolicy",
            ]])
            .with_sid("ElastioIamUpdate")
            .on("*")
            .with_condition(Condition::has_resource_tag(KnownTag::ElastioResource)),
            // Matched by name: a tag condition on an already deleted resource
            // yields AccessDenied, which leaves the stack in DELETE_FAILED.
            PolicyStatement::allow(actions![Iam: ["DeleteRole", "DeletePolicy"]])
                .with_sid("ElastioIamDelete")
                .on([elastio_roles, "arn:*:iam::*:policy/*Elastio*"]),
            // PassRole doesn't support tag conditions
            PolicyStatement::allow(actions![Iam: ["PassRole"]])
                .with_sid("ElastioIamPassRole")
                .on([elastio_roles]),
        ],
    }
}

fn aws_backup_ec2_scan() -> Policy {
    let mut kms = allow_kms().with_sid("KmsAccess");
    // Only keys customers opted in; Elastio-owned keys aren't involved here.
    kms.condition = Some(Condition::has_resource_tag(KnownTag::ElastioAuthorize));

    Policy {
        description: "Allows Elastio to scan AWS Backup recovery points.",
        statements: vec![
            PolicyStatement::allow(actions![Backup: [
                "ListBackupVaults",
                "DescribeBackupVault",
                "ListRecoveryPointsByResource",
                "DescribeRecoveryPoint",
                "ListRecoveryPointsByBackupVault",
                "GetRecoveryPointRestoreMetadata",
                "ListTags",
                "ListProtectedResources",
                "ListProtectedResourcesByBackupVault",
            ]])
            .with_sid("ReadBackupInventory")
            .on("*"),
            PolicyStatement::allow(actions![
                Ec2: [
                    "DescribeVolumeStatus",
                    "DescribeVolumes",
                    "DescribeSnapshots",
                    "DescribeSnapshotAttribute",
                    "DescribeTags",
                ],
                Ebs: ["ListSnapshotBlocks", "ListChangedBlocks"],
            ])
            .with_sid("ReadEbsInventory")
            .on("*"),
            PolicyStatement::allow(actions![Ebs: ["GetSnapshotBlock"]])
                .with_sid("ReadEbsSnapshotsData")
                .on("*"),
            PolicyStatement::allow(actions![
                Ec2: ["DescribeInstances", "DescribeImages", "DescribeHosts"],
                Ssm: ["DescribeInstanceInformation"],
            ])
            .with_sid("ReadEc2Inventory")
            .on("*"),
            // createVolumePermission for sharing snapshots with the connector
            PolicyStatement::allow(actions![Ec2: ["ModifySnapshotAttribute"]])
                .with_sid("ShareEbsSnapshot")
                .on("*")
                .with_condition(Condition::string_like("ec2:Add/userId", "*")),
            kms,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::collections::HashSet;

    #[test]
    fn test_registry_names() {
        let names: Vec<&str> = registry().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["ElastioAssetAccountDeployer", "ElastioAwsBackupEc2Scan"]);
    }

    #[test]
    fn test_get_unknown_policy() {
        assert!(get("ElastioSomethingElse").is_none());
        assert!(get("ElastioAwsBackupEc2Scan").is_some());
    }

    #[test]
    fn test_sids_are_unique() {
        for (name, policy) in registry() {
            let sids: Vec<&str> = policy.statements.iter().filter_map(|s| s.sid.as_deref()).collect();
            let unique: HashSet<&str> = sids.iter().copied().collect();
            assert_eq!(sids.len(), unique.len(), "duplicate sid in {name}");
        }
    }

    #[test]
    fn test_definition_json_applies_default_effect() {
        let policy = get("ElastioAssetAccountDeployer").unwrap();
        let definition: Value = serde_json::from_str(&policy.definition_json().unwrap()).unwrap();

        assert_eq!(
            definition["Description"],
            json!("Permissions required to deploy the Elastio Asset Account stack")
        );
        assert_eq!(definition["PolicyDocument"]["Version"], json!("2012-10-17"));

        let statements = definition["PolicyDocument"]["Statement"].as_array().unwrap();
        assert!(statements.iter().all(|s| s["Effect"] == json!("Allow")));
        assert_eq!(
            statements[0]["Action"],
            json!(["lambda:*", "cloudformation:*", "logs:*", "ssm:*", "kms:*"])
        );
        assert_eq!(
            statements[2]["Condition"],
            json!({"StringLike": {"aws:RequestTag/elastio:resource": "*"}})
        );
    }

    #[test]
    fn test_definition_json_rejects_statement_without_actions() {
        let policy = Policy {
            description: "broken",
            statements: vec![PolicyStatement::allow(Vec::<crate::types::Action>::new()).on("*")],
        };
        assert!(matches!(
            policy.definition_json(),
            Err(CodegenError::EmptyActions(at)) if at == "statement 0"
        ));
    }

    #[test]
    fn test_backup_scan_kms_requires_authorize_tag_only() {
        let policy = get("ElastioAwsBackupEc2Scan").unwrap();
        let kms = policy
            .statements
            .iter()
            .find(|s| s.sid.as_deref() == Some("KmsAccess"))
            .unwrap();
        assert_eq!(
            serde_json::to_value(kms.condition.as_ref().unwrap()).unwrap(),
            json!({"StringLike": {"aws:ResourceTag/elastio:authorize": "*"}})
        );
    }
}
