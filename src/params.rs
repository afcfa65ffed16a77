//! Generation parameters: schema, validation and the immutable record.
//!
//! Raw parameters are camelCase JSON. They are checked against a JSON Schema
//! built per backend. Every violation becomes one [`FieldError`], so the caller
//! sees all offending fields at once. Only a document that passes is
//! deserialized into [`Params`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{debug, info};

use crate::error::{CodegenError, FieldError, ValidationErrors};
use crate::types::KnownTag;

const ACCOUNT_ID_PATTERN: &str = r"^\d{12}$";
const IAM_POLICY_ARN_PATTERN: &str = r"^arn:aws:iam::[^:]*:policy/.*";

/// The value every Elastio-owned resource carries under `elastio:resource`.
pub const RESOURCE_MARKER_VALUE: &str = "true";

/// Which deployment tool the code is generated for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Terraform,
    CloudFormation,
}

/// Parameters shared by every backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonParams {
    /// Account of the Elastio Connector that scans assets in this account.
    pub connector_account_id: String,
    /// Secret the connector presents when assuming the access role.
    pub connector_role_external_id: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub iam_resource_names_prefix: String,
    #[serde(default)]
    pub iam_resource_names_suffix: String,
    /// Managed policies attached to every Elastio role.
    #[serde(default)]
    pub global_managed_policies: Vec<String>,
    /// Permission boundary set on every Elastio role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_permission_boundary: Option<String>,
}

impl CommonParams {
    pub fn new(
        connector_account_id: impl Into<String>,
        connector_role_external_id: impl Into<String>,
    ) -> Self {
        CommonParams {
            connector_account_id: connector_account_id.into(),
            connector_role_external_id: connector_role_external_id.into(),
            tags: BTreeMap::new(),
            iam_resource_names_prefix: String::new(),
            iam_resource_names_suffix: String::new(),
            global_managed_policies: Vec::new(),
            global_permission_boundary: None,
        }
    }
}

/// Parameters only the CloudFormation backend accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudFormationOptions {
    #[serde(default)]
    pub disable_deployment_notification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_notification_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_notification_sns_topic_arn: Option<String>,
    #[serde(default)]
    pub encrypt_with_cmk: bool,
    #[serde(default)]
    pub lambda_tracing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "orchestrator", rename_all = "lowercase")]
pub enum BackendParams {
    Terraform,
    CloudFormation(CloudFormationOptions),
}

impl BackendParams {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendParams::Terraform => BackendKind::Terraform,
            BackendParams::CloudFormation(_) => BackendKind::CloudFormation,
        }
    }
}

/// A validated parameter record. It is never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Params {
    #[serde(flatten)]
    common: CommonParams,
    backend: BackendParams,
}

#[derive(Deserialize)]
struct CloudFormationRaw {
    #[serde(flatten)]
    common: CommonParams,
    #[serde(flatten)]
    options: CloudFormationOptions,
}

impl Params {
    pub fn new(common: CommonParams, backend: BackendParams) -> Self {
        Params { common, backend }
    }

    pub fn terraform(common: CommonParams) -> Self {
        Params::new(common, BackendParams::Terraform)
    }

    pub fn cloudformation(common: CommonParams, options: CloudFormationOptions) -> Self {
        Params::new(common, BackendParams::CloudFormation(options))
    }

    /// Validate `raw` for `backend`, reporting every offending field.
    pub fn validate(raw: &Value, backend: BackendKind) -> Result<Self, CodegenError> {
        let schema = schema(backend);
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| CodegenError::InvalidSchema(e.to_string()))?;

        let mut errors = ValidationErrors::default();
        for error in validator.iter_errors(raw) {
            errors.push(FieldError::new(
                error.instance_path().to_string(),
                error.to_string(),
            ));
        }

        if !errors.is_empty() {
            info!(
                event = "Validate",
                phase = "Rejected",
                backend = backend.as_ref(),
                errors = errors.0.len()
            );
            return Err(errors.into());
        }

        let params = match backend {
            BackendKind::Terraform => {
                Params::terraform(serde_json::from_value(raw.clone()).map_err(into_field_error)?)
            }
            BackendKind::CloudFormation => {
                let parsed: CloudFormationRaw =
                    serde_json::from_value(raw.clone()).map_err(into_field_error)?;
                Params::cloudformation(parsed.common, parsed.options)
            }
        };

        debug!(
            event = "Validate",
            phase = "Accepted",
            backend = backend.as_ref(),
            connector_account_id = params.common.connector_account_id.as_str()
        );
        Ok(params)
    }

    pub fn common(&self) -> &CommonParams {
        &self.common
    }

    pub fn backend(&self) -> &BackendParams {
        &self.backend
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn connector_account_id(&self) -> &str {
        &self.common.connector_account_id
    }

    pub fn connector_role_external_id(&self) -> &str {
        &self.common.connector_role_external_id
    }

    /// Apply the configured IAM name prefix and suffix to `name`.
    pub fn iam_name(&self, name: &str) -> String {
        format!(
            "{}{}{}",
            self.common.iam_resource_names_prefix, name, self.common.iam_resource_names_suffix
        )
    }

    /// User tags plus the ownership marker. The marker always wins.
    pub fn tags(&self) -> BTreeMap<String, String> {
        let mut tags = self.common.tags.clone();
        tags.insert(
            KnownTag::ElastioResource.to_string(),
            RESOURCE_MARKER_VALUE.to_string(),
        );
        tags
    }

    pub fn managed_policies(&self) -> &[String] {
        &self.common.global_managed_policies
    }

    pub fn permission_boundary(&self) -> Option<&str> {
        self.common.global_permission_boundary.as_deref()
    }
}

fn into_field_error(err: serde_json::Error) -> CodegenError {
    ValidationErrors(vec![FieldError::new("", err.to_string())]).into()
}

/// JSON Schema of the raw parameters accepted for `backend`.
pub fn schema(backend: BackendKind) -> Value {
    let mut properties = json!({
        "connectorAccountId": {
            "title": "Cloud connector AWS account ID",
            "description": "The ID of the Elastio Connector's account that should scan assets in this account. It will be trusted to assume the role in this account to read the assets and create snapshots.",
            "type": "string",
            "pattern": ACCOUNT_ID_PATTERN
        },
        "connectorRoleExternalId": {
            "title": "Connector IAM role external ID",
            "description": "The secret token generated specifically for this account that authenticates the source Elastio Connector to assume the ElastioCloudConnector role in this account",
            "type": "string"
        },
        "tags": {
            "title": "Tags",
            "description": "Tags to add to all resources deployed by this stack.",
            "type": "object",
            "additionalProperties": { "type": "string" }
        },
        "iamResourceNamesPrefix": {
            "title": "IAM resource names prefix",
            "description": "Add a custom prefix to names of all IAM resources deployed by this stack",
            "type": "string"
        },
        "iamResourceNamesSuffix": {
            "title": "IAM resource names suffix",
            "description": "Add a custom suffix to names of all IAM resources deployed by this stack",
            "type": "string"
        },
        "globalManagedPolicies": {
            "title": "Global IAM managed policies ARNs",
            "description": "IAM managed policies ARNs to attach to all Elastio IAM roles",
            "type": "array",
            "items": { "type": "string", "pattern": IAM_POLICY_ARN_PATTERN },
            "uniqueItems": true
        },
        "globalPermissionBoundary": {
            "title": "Global IAM permission boundary policy ARN",
            "description": "The ARN of the IAM managed policy to use as a permission boundary for all Elastio IAM roles",
            "type": "string",
            "pattern": IAM_POLICY_ARN_PATTERN
        }
    });

    if backend == BackendKind::CloudFormation {
        let extra = json!({
            "disableDeploymentNotification": {
                "title": "Deployment Notification",
                "description": "Send a deployment notification to the Elastio Connector account.",
                "type": "boolean"
            },
            "deploymentNotificationToken": {
                "title": "Deployment notification token",
                "description": "Token sent to the SNS topic to authenticate the deployment notification.",
                "type": "string"
            },
            "deploymentNotificationSnsTopicArn": {
                "title": "Deployment notification SNS topic ARN",
                "description": "ARN of the Elastio tenant SNS topic where to publish a notification about a completed stack deployment.",
                "type": "string"
            },
            "encryptWithCmk": {
                "title": "Encrypt data with customer-managed KMS keys",
                "type": "boolean"
            },
            "lambdaTracing": {
                "title": "Enable AWS X-Ray tracing for Lambda functions",
                "description": "This increases the cost of the stack. Enable only if needed",
                "type": "boolean"
            }
        });
        if let (Some(props), Value::Object(extra)) = (properties.as_object_mut(), extra) {
            props.extend(extra);
        }
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": format!("Params specific to {} orchestrator", backend),
        "type": "object",
        "properties": properties,
        "required": ["connectorAccountId", "connectorRoleExternalId"],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use yare::parameterized;

    fn minimal() -> Value {
        json!({
            "connectorAccountId": "123456789012",
            "connectorRoleExternalId": "external-id"
        })
    }

    fn invalid_fields(raw: &Value, backend: BackendKind) -> BTreeSet<String> {
        match Params::validate(raw, backend) {
            Err(CodegenError::Validation(errors)) => errors.fields().map(String::from).collect(),
            other => panic!("Expected a validation error, got {other:?}"),
        }
    }

    #[parameterized(
        terraform = { BackendKind::Terraform },
        cloudformation = { BackendKind::CloudFormation },
    )]
    fn test_minimal_params_get_defaults(backend: BackendKind) {
        let params = Params::validate(&minimal(), backend).unwrap();
        assert_eq!(params.backend_kind(), backend);
        assert_eq!(params.connector_account_id(), "123456789012");
        assert_eq!(params.connector_role_external_id(), "external-id");
        assert!(params.common().tags.is_empty());
        assert!(params.managed_policies().is_empty());
        assert_eq!(params.permission_boundary(), None);
        assert_eq!(params.iam_name("ElastioCloudConnector"), "ElastioCloudConnector");
    }

    #[test]
    fn test_cloudformation_options() {
        let mut raw = minimal();
        raw["encryptWithCmk"] = json!(true);
        raw["deploymentNotificationSnsTopicArn"] = json!("arn:aws:sns:us-east-1:123456789012:x");
        let params = Params::validate(&raw, BackendKind::CloudFormation).unwrap();
        match params.backend() {
            BackendParams::CloudFormation(options) => {
                assert!(options.encrypt_with_cmk);
                assert!(!options.lambda_tracing);
                assert_eq!(
                    options.deployment_notification_sns_topic_arn.as_deref(),
                    Some("arn:aws:sns:us-east-1:123456789012:x")
                );
            }
            other => panic!("Expected CloudFormation params, got {other:?}"),
        }
    }

    #[test]
    fn test_terraform_rejects_cloudformation_only_field() {
        let mut raw = minimal();
        raw["lambdaTracing"] = json!(true);
        assert!(Params::validate(&raw, BackendKind::Terraform).is_err());
    }

    #[test]
    fn test_every_offending_field_is_reported() {
        let raw = json!({
            "connectorAccountId": "1234",
            "connectorRoleExternalId": 42,
            "tags": { "env": 1 },
            "globalPermissionBoundary": "arn:aws:iam::123456789012:role/NotAPolicy"
        });
        let fields = invalid_fields(&raw, BackendKind::Terraform);
        for expected in [
            "/connectorAccountId",
            "/connectorRoleExternalId",
            "/tags/env",
            "/globalPermissionBoundary",
        ] {
            assert!(fields.contains(expected), "{expected} missing from {fields:?}");
        }
    }

    #[test]
    fn test_missing_required_fields() {
        let fields = invalid_fields(&json!({}), BackendKind::Terraform);
        assert!(fields.contains("(root)"));
    }

    #[test]
    fn test_duplicate_managed_policies_rejected() {
        let mut raw = minimal();
        raw["globalManagedPolicies"] = json!([
            "arn:aws:iam::aws:policy/ReadOnlyAccess",
            "arn:aws:iam::aws:policy/ReadOnlyAccess"
        ]);
        let fields = invalid_fields(&raw, BackendKind::Terraform);
        assert!(fields.contains("/globalManagedPolicies"));
    }

    #[parameterized(
        too_short = { "12345678901" },
        too_long = { "1234567890123" },
        letters = { "12345678901a" },
    )]
    fn test_connector_account_id_must_be_twelve_digits(account_id: &str) {
        let mut raw = minimal();
        raw["connectorAccountId"] = json!(account_id);
        let fields = invalid_fields(&raw, BackendKind::CloudFormation);
        assert_eq!(fields, BTreeSet::from(["/connectorAccountId".to_string()]));
    }

    #[test]
    fn test_marker_tag_always_present() {
        let mut raw = minimal();
        raw["tags"] = json!({ "env": "prod", "elastio:resource": "false" });
        let params = Params::validate(&raw, BackendKind::Terraform).unwrap();
        let tags = params.tags();
        assert_eq!(tags.get("elastio:resource").map(String::as_str), Some("true"));
        assert_eq!(tags.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn test_iam_name_prefix_and_suffix() {
        let mut common = CommonParams::new("123456789012", "x");
        common.iam_resource_names_prefix = "Acme".to_string();
        common.iam_resource_names_suffix = "-dev".to_string();
        let params = Params::terraform(common);
        assert_eq!(params.iam_name("ElastioCloudConnector"), "AcmeElastioCloudConnector-dev");
    }
}
