//! Static permission tables shared between Elastio roles.
//!
//! The tables are plain values handed to the graph builder, never globals,
//! so building a graph stays a function of its explicit inputs.

use crate::types::{Action, Condition, KnownTag, PolicyStatement, StatementGroups, actions};

/// Read-only catalogs the graph builder draws from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    /// Inventory reads shared by the tenant, the connector and the asset
    /// account roles, one group per service.
    pub inventory: StatementGroups,
    /// KMS access for customer-managed keys that opted in via tags.
    pub kms: PolicyStatement,
}

impl Catalog {
    pub fn standard() -> Self {
        Catalog {
            inventory: inventory(),
            kms: allow_kms(),
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::standard()
    }
}

fn read_all(actions: Vec<Action>) -> Vec<PolicyStatement> {
    vec![PolicyStatement::allow(actions).on("*")]
}

/// Inventory reads, grouped per service. Every action must be read-only.
pub fn inventory() -> StatementGroups {
    StatementGroups::new()
        .group(
            "ReadBackupInventory",
            read_all(actions![Backup: [
                // Vaults
                "ListBackupVaults",
                "DescribeBackupVault",
                // Recovery points
                "ListRecoveryPointsByResource",
                "DescribeRecoveryPoint",
                "ListRecoveryPointsByBackupVault",
                "GetRecoveryPointRestoreMetadata",
                "ListTags",
                "ListProtectedResources",
                "ListProtectedResourcesByBackupVault",
            ]]),
        )
        .group(
            "ReadEfsInventory",
            read_all(actions![Elasticfilesystem: [
                "DescribeFileSystems",
                "ListTagsForResource",
                "DescribeTags",
            ]]),
        )
        .group(
            "ReadFsxInventory",
            read_all(actions![Fsx: [
                "DescribeVolumes",
                "DescribeBackups",
                "DescribeFileSystems",
                "DescribeStorageVirtualMachines",
                "ListTagsForResource",
            ]]),
        )
        .group(
            "ReadEbsInventory",
            read_all(actions![
                Ec2: [
                    "DescribeVolumeStatus",
                    "DescribeVolumes",
                    "DescribeSnapshots",
                    "DescribeSnapshotAttribute",
                    "DescribeTags",
                ],
                // Cost estimation
                Ebs: ["ListSnapshotBlocks", "ListChangedBlocks"],
            ]),
        )
        .group(
            "ReadEc2Inventory",
            read_all(actions![
                Ec2: ["DescribeInstances", "DescribeImages", "DescribeHosts"],
                Ssm: ["DescribeInstanceInformation"],
            ]),
        )
        .group(
            "ReadVpcInventory",
            // Network config troubleshooting
            read_all(actions![Ec2: [
                "DescribeAvailabilityZones",
                "DescribeSecurityGroups",
                "DescribeSubnets",
                "DescribeVpcs",
                "DescribeRouteTables",
                "DescribeNatGateways",
                "DescribeVpcEndpoints",
            ]]),
        )
        .group(
            "ReadS3Inventory",
            read_all(actions![S3: [
                "ListAllMyBuckets",
                "GetBucketLocation",
                "GetBucketTagging",
                "GetBucketObjectLockConfiguration",
                "GetBucketAcl",
                "GetBucketVersioning",
                "GetBucketPolicy",
                "GetBucketLogging",
                "ListBucket",
            ]]),
        )
        .group(
            "ReadAccountsInventory",
            read_all(actions![Iam: ["ListAccountAliases"], Ec2: ["DescribeRegions"]]),
        )
        .group("ReadKmsInventory", read_all(actions![Kms: ["DescribeKey"]]))
        .group(
            "ReadCloudformationInventory",
            // Stack version discovery, and stack status checks in the
            // cross-account scenario.
            read_all(actions![Cloudformation: [
                "DescribeStacks",
                "DescribeStackSet",
                "ListStacks",
            ]]),
        )
        .group(
            "ReadBatchInventory",
            read_all(actions![Batch: [
                "DescribeComputeEnvironments",
                "DescribeJobDefinitions",
                "DescribeJobQueues",
                "DescribeJobs",
                "DescribeSchedulingPolicies",
                "GetJobQueueSnapshot",
                "ListJobs",
                "ListSchedulingPolicies",
                "ListTagsForResource",
            ]]),
        )
        .group(
            "ReadDrsInventory",
            read_all(actions![Drs: [
                "DescribeRecoverySnapshots",
                "DescribeSourceServers",
                "ListTagsForResource",
            ]]),
        )
}

/// KMS actions needed to use a customer-managed key.
///
/// Customers opt their keys in with the `elastio:authorize` tag; the key
/// policy must also delegate access to IAM policies of the account. Keys
/// Elastio deployed itself carry `elastio:resource`.
pub fn allow_kms() -> PolicyStatement {
    PolicyStatement::allow(actions![Kms: [
        // Re-encrypting volumes encrypted with the key
        "ReEncryptFrom",
        "ReEncryptTo",
        "CreateGrant",
        "Encrypt",
        // Called by ebs.amazonaws.com on our behalf for some volumes
        "DescribeKey",
        // WithoutPlaintext is needed when a volume is created from an
        // unencrypted snapshot under a default EBS encryption key.
        "GenerateDataKey",
        "GenerateDataKeyWithoutPlaintext",
        // Reading S3 objects encrypted with the key
        "Decrypt",
    ]])
    .on("*")
    .with_condition(
        Condition::has_resource_tag(KnownTag::ElastioAuthorize)
            .merge(Condition::has_resource_tag(KnownTag::ElastioResource)),
    )
}
