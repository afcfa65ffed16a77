//! Builds the backend-agnostic resource graph of the asset account.

use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::error::CodegenError;
use crate::merge::merge;
use crate::params::Params;
use crate::types::{
    Action, Condition, IamRole, KnownTag, Principal, PolicyStatement, Reference, ResourceGraph,
    OneOrMany, ResourceKind, Service, StatementGroups, Template, actions,
};

pub const INVENTORY_EVENT_TARGET: &str = "inventory_event_target";
pub const ASSET_REGION_STACK_DEPLOYER: &str = "asset_region_stack_deployer";
pub const CLOUD_CONNECTOR: &str = "cloud_connector";

/// Role in the connector account allowed to assume [`CLOUD_CONNECTOR`].
pub const CLOUD_CONNECTOR_BASTION: &str = "ElastioCloudConnectorBastion";

const ELASTIO_STACKS: &str = "arn:aws:cloudformation:*:{{account_id}}:stack/elastio-*/*";

/// Build the resource graph for `params`.
///
/// Roles are inserted so that every placeholder refers to a role added
/// before it. Values taken from `params` go into policies as
/// [`Template::Literal`]. Identical inputs always produce an identical graph.
pub fn build(params: &Params, catalog: &Catalog) -> Result<ResourceGraph, CodegenError> {
    let mut graph = ResourceGraph::new();

    graph.insert(INVENTORY_EVENT_TARGET, inventory_event_target(params))?;
    graph.insert(ASSET_REGION_STACK_DEPLOYER, asset_region_stack_deployer(params))?;
    graph.insert(CLOUD_CONNECTOR, cloud_connector(params, catalog)?)?;

    info!(
        event = "Build",
        phase = "Done",
        resources = graph.len(),
        backend = params.backend_kind().as_ref()
    );
    Ok(graph)
}

fn assumed_by_service(service: &str) -> PolicyStatement {
    PolicyStatement::allow(Action::new(Service::Sts, "AssumeRole"))
        .with_principal(Principal::service(service))
}

fn inventory_event_target(params: &Params) -> IamRole {
    IamRole::new(
        params.iam_name("ElastioInventoryEventTarget"),
        "Role assumed by EventBridge to send events to the Elastio Connector",
        assumed_by_service("events.amazonaws.com"),
    )
    .with_statements(StatementGroups::new().group(
        "SendEventsToConnectorAccount",
        vec![
            PolicyStatement::allow(actions![Events: ["PutEvents"]]).on(OneOrMany::Many(vec![
                Template::literal(format!(
                    "arn:aws:events:*:{}:event-bus/elastio-*",
                    params.connector_account_id()
                )),
            ])),
        ],
    ))
}

fn asset_region_stack_deployer(params: &Params) -> IamRole {
    let event_target = Reference::arn(ResourceKind::IamRole, INVENTORY_EVENT_TARGET);

    IamRole::new(
        params.iam_name("ElastioAssetRegionStackDeployer"),
        "Used by Cloudformation to deploy region-level stack",
        assumed_by_service("cloudformation.amazonaws.com"),
    )
    .with_statements(StatementGroups::new().group(
        "ManageElastioEventBridgeRules",
        vec![
            PolicyStatement::allow(actions![Events: [
                "DescribeRule",
                "ListTargetsByRule",
                "ListTagsForResource",
                "PutRule",
                "PutTargets",
                "RemoveTargets",
                "DeleteRule",
                "EnableRule",
                "DisableRule",
            ]])
            .on(["arn:aws:events:*:{{account_id}}:rule/elastio-*"]),
            // Lets the deployer assign the event target role to rule targets
            PolicyStatement::allow(actions![Iam: ["PassRole"]]).on(Template::from(&event_target)),
        ],
    ))
}

fn cloud_connector(params: &Params, catalog: &Catalog) -> Result<IamRole, CodegenError> {
    let bastion = format!(
        "arn:aws:iam::{}:role/{}",
        params.connector_account_id(),
        params.iam_name(CLOUD_CONNECTOR_BASTION)
    );
    let trust = PolicyStatement::allow(actions![Sts: ["AssumeRole"]])
        .with_principal(Principal::aws(Template::literal(bastion)))
        .with_condition(Condition::string_equals(
            "sts:ExternalId",
            Template::literal(params.connector_role_external_id()),
        ));

    let statements = merge([catalog.inventory.clone(), connector_groups(params, catalog)])?;
    debug!(
        event = "Build",
        phase = "CloudConnector",
        groups = statements.len()
    );

    Ok(IamRole::new(
        params.iam_name("ElastioCloudConnector"),
        "Allows Elastio Cloud Connector to access the assets in this account",
        trust,
    )
    .with_statements(statements))
}

/// Capabilities the connector needs on top of the shared inventory reads.
fn connector_groups(params: &Params, catalog: &Catalog) -> StatementGroups {
    let stack_deployer = Reference::arn(ResourceKind::IamRole, ASSET_REGION_STACK_DEPLOYER);
    let any_create_action = || Condition::string_like("ec2:CreateAction", "*");

    StatementGroups::new()
        .group(
            "WriteEc2",
            vec![
                // Snapshots are created here and copied to the connector account
                PolicyStatement::allow(actions![Ec2: [
                    "CreateSnapshot",
                    "CreateSnapshots",
                    "CopySnapshot",
                ]])
                .on(["*"]),
                PolicyStatement::allow(actions![Ec2: [
                    "DeleteSnapshot",
                    // AWS Backup restore tests
                    "StopInstances",
                    "TerminateInstances",
                    // Extra tags on Elastio resources, e.g. scan verdicts on snapshots
                    "CreateTags",
                    "DeleteTags",
                ]])
                .on(["*"])
                .with_condition(Condition::has_resource_tag(KnownTag::ElastioResource)),
                // createVolumePermission for the connector account. The
                // `ec2:Attribute` keys are absent from the request context.
                PolicyStatement::allow(actions![Ec2: ["ModifySnapshotAttribute"]])
                    .on(["*"])
                    .with_condition(Condition::string_equals(
                        "ec2:Add/userId",
                        Template::literal(params.connector_account_id()),
                    )),
                // Temporary instances and volumes of AWS Backup restore tests
                PolicyStatement::allow(actions![Ec2: [
                    "ModifyInstanceAttribute",
                    "CreateTags",
                    "DeleteTags",
                ]])
                .on(["*"])
                .with_condition(Condition::has_resource_tag(KnownTag::AwsBackupRestoreTest)),
                // Tags at creation time
                PolicyStatement::allow(actions![Ec2: ["CreateTags"]])
                    .on(["arn:aws:ec2:*:*:volume/*", "arn:aws:ec2:*::snapshot/*"])
                    .with_condition(any_create_action()),
                PolicyStatement::allow(actions![Ssm: ["SendCommand"]]).on([
                    "arn:aws:ssm:*:*:document/AWSEC2-CreateVssSnapshot",
                    "arn:aws:ec2:*:*:instance/*",
                ]),
                PolicyStatement::allow(actions![Ssm: [
                    "GetConnectionStatus",
                    "GetCommandInvocation",
                    "ListCommands",
                ]])
                .on(["*"]),
            ],
        )
        .group(
            "ReadEbs",
            vec![
                PolicyStatement::allow(actions![Ebs: ["ListSnapshotBlocks", "GetSnapshotBlock"]])
                    .on(["*"]),
            ],
        )
        .group(
            "ReadSsm",
            // App-consistent (VSS) snapshots of Windows instances
            vec![
                PolicyStatement::allow(actions![Ssm: ["GetParameters", "GetParameter"]]).on([
                    "arn:aws:ssm:*:{{account_id}}:parameter/elastio/*",
                    "arn:aws:ssm:*::parameter/aws/*",
                ]),
            ],
        )
        .group(
            "ReadIam",
            vec![
                PolicyStatement::allow(actions![Iam: [
                    "GetInstanceProfile",
                    "SimulatePrincipalPolicy",
                ]])
                .on(["*"]),
            ],
        )
        .group(
            "WriteCloudformation",
            vec![
                PolicyStatement::allow(actions![Cloudformation: ["CreateStack", "UpdateStack"]])
                    .on([ELASTIO_STACKS])
                    .with_condition(Condition::string_equals(
                        "cloudformation:RoleArn",
                        Template::from(&stack_deployer),
                    )),
                // CreateStack/UpdateStack on behalf of the stack deployer
                PolicyStatement::allow(actions![Iam: ["PassRole"]])
                    .on(OneOrMany::Many(vec![Template::from(&stack_deployer)])),
                PolicyStatement::allow(actions![Cloudformation: ["TagResource"]])
                    .on([ELASTIO_STACKS])
                    .with_condition(any_create_action()),
                PolicyStatement::allow(actions![Cloudformation: [
                    // Removal of the asset region stack
                    "DeleteStack",
                    "TagResource",
                    "UntagResource",
                ]])
                .on([ELASTIO_STACKS])
                .with_condition(Condition::has_resource_tag(KnownTag::ElastioResource)),
            ],
        )
        .group(
            "ReadS3",
            vec![
                PolicyStatement::allow(actions![S3: [
                    // Used by the scan job
                    "ListBucket",
                    "GetObjectVersion",
                    "GetObject",
                    "GetBucketTagging",
                    // Left over from native backups and restores, kept for debugging
                    "GetReplicationConfiguration",
                    "GetMetricsConfiguration",
                    "GetLifecycleConfiguration",
                    "GetInventoryConfiguration",
                    "GetIntelligentTieringConfiguration",
                    "GetEncryptionConfiguration",
                    "GetBucketWebsite",
                    "GetBucketVersioning",
                    "GetBucketRequestPayment",
                    "GetBucketPublicAccessBlock",
                    "GetBucketPolicy",
                    "GetBucketOwnershipControls",
                    "GetBucketObjectLockConfiguration",
                    "GetBucketNotification",
                    "GetBucketLogging",
                    "GetBucketLocation",
                    "GetBucketAcl",
                    "GetAnalyticsConfiguration",
                    "GetAccelerateConfiguration",
                ]])
                .on(["*"]),
            ],
        )
        .group(
            "ReadSqs",
            // S3 changelog queue
            vec![
                PolicyStatement::allow(actions![Sqs: ["ReceiveMessage", "DeleteMessage"]])
                    .on(["*"])
                    .with_condition(Condition::has_resource_tag(KnownTag::ElastioResource)),
            ],
        )
        .group(
            "ReadDrs",
            vec![
                PolicyStatement::allow(actions![Drs: [
                    "DescribeRecoverySnapshots",
                    "DescribeSourceServers",
                    "ListTagsForResource",
                ]])
                .on(["*"]),
            ],
        )
        // ModifySnapshotAttribute on encrypted snapshots
        .group("ReadKms", vec![catalog.kms.clone()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CommonParams;
    use crate::types::Resource;
    use serde_json::json;

    fn params(prefix: &str, suffix: &str) -> Params {
        let mut common = CommonParams::new("123456789012", "external-id");
        common.iam_resource_names_prefix = prefix.to_string();
        common.iam_resource_names_suffix = suffix.to_string();
        Params::terraform(common)
    }

    fn role<'a>(graph: &'a ResourceGraph, id: &str) -> &'a IamRole {
        graph.get(id).and_then(Resource::as_role).unwrap()
    }

    #[test]
    fn test_build_order() {
        let graph = build(&params("", ""), &Catalog::standard()).unwrap();
        assert_eq!(
            graph.ids().collect::<Vec<_>>(),
            vec![INVENTORY_EVENT_TARGET, ASSET_REGION_STACK_DEPLOYER, CLOUD_CONNECTOR]
        );
        assert_eq!(graph.names().len(), graph.len());
    }

    #[test]
    fn test_cloud_connector_trust_policy() {
        let graph = build(&params("", ""), &Catalog::standard()).unwrap();
        let trust = serde_json::to_value(&role(&graph, CLOUD_CONNECTOR).assume_role_policy).unwrap();
        assert_eq!(
            trust,
            json!({
                "Effect": "Allow",
                "Action": ["sts:AssumeRole"],
                "Principal": {
                    "AWS": "arn:aws:iam::123456789012:role/ElastioCloudConnectorBastion"
                },
                "Condition": {
                    "StringEquals": { "sts:ExternalId": "external-id" }
                }
            })
        );
    }

    #[test]
    fn test_prefix_and_suffix_apply_to_roles_and_bastion() {
        let graph = build(&params("Acme", "Dev"), &Catalog::standard()).unwrap();
        let connector = role(&graph, CLOUD_CONNECTOR);
        assert_eq!(connector.name, "AcmeElastioCloudConnectorDev");
        assert_eq!(
            connector
                .assume_role_policy
                .principal
                .as_ref()
                .unwrap()
                .values(),
            vec!["arn:aws:iam::123456789012:role/AcmeElastioCloudConnectorBastionDev"]
        );
        assert_eq!(
            role(&graph, INVENTORY_EVENT_TARGET).name,
            "AcmeElastioInventoryEventTargetDev"
        );
    }

    #[test]
    fn test_cloud_connector_groups_are_the_union_of_sources() {
        let catalog = Catalog::standard();
        let graph = build(&params("", ""), &catalog).unwrap();
        let names: Vec<&str> = role(&graph, CLOUD_CONNECTOR).statements.names().collect();

        let mut expected: Vec<&str> = catalog.inventory.names().collect();
        expected.extend([
            "WriteEc2",
            "ReadEbs",
            "ReadSsm",
            "ReadIam",
            "WriteCloudformation",
            "ReadS3",
            "ReadSqs",
            "ReadDrs",
            "ReadKms",
        ]);
        assert_eq!(names, expected);
    }

    #[test]
    fn test_catalog_collision_fails_build() {
        let mut catalog = Catalog::standard();
        catalog.inventory.push(
            "WriteEc2",
            vec![PolicyStatement::allow(Action::new(Service::Ec2, "DescribeTags")).on("*")],
        );
        let err = build(&params("", ""), &catalog).unwrap_err();
        assert!(matches!(err, CodegenError::DuplicateStatementGroup { key } if key == "WriteEc2"));
    }

    #[test]
    fn test_references_point_backwards() {
        let graph = build(&params("", ""), &Catalog::standard()).unwrap();
        let deployer = serde_json::to_string(role(&graph, ASSET_REGION_STACK_DEPLOYER)).unwrap();
        assert!(deployer.contains("{{aws_iam_role.inventory_event_target.arn}}"));
        assert!(deployer.contains("{{account_id}}"));

        let connector = serde_json::to_string(role(&graph, CLOUD_CONNECTOR)).unwrap();
        assert!(connector.contains("{{aws_iam_role.asset_region_stack_deployer.arn}}"));
    }

    #[test]
    fn test_connector_account_id_substituted_at_build_time() {
        let graph = build(&params("", ""), &Catalog::standard()).unwrap();
        let target = serde_json::to_string(role(&graph, INVENTORY_EVENT_TARGET)).unwrap();
        assert!(target.contains("arn:aws:events:*:123456789012:event-bus/elastio-*"));
    }

    #[test]
    fn test_caller_values_are_literals() {
        let mut common = CommonParams::new("123456789012", "ab{{cd");
        common.iam_resource_names_prefix = "{{account_id}}".to_string();
        let graph = build(&Params::terraform(common), &Catalog::standard()).unwrap();
        let trust = &role(&graph, CLOUD_CONNECTOR).assume_role_policy;

        assert_eq!(
            trust.condition.as_ref().unwrap().get("StringEquals", "sts:ExternalId"),
            Some(&OneOrMany::One(Template::literal("ab{{cd")))
        );
        match trust.principal.as_ref().unwrap() {
            Principal::Aws(OneOrMany::One(bastion)) => {
                assert!(bastion.is_literal());
                assert!(bastion.as_str().ends_with(":role/{{account_id}}ElastioCloudConnectorBastion"));
            }
            other => panic!("Expected one AWS principal, got {other:?}"),
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let catalog = Catalog::standard();
        let first = build(&params("a", "b"), &catalog).unwrap();
        let second = build(&params("a", "b"), &catalog).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
