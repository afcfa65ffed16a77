//! AWS service prefixes that may appear in policy actions.
//!
//! An action naming a service that is not listed here fails to parse.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// The services Elastio roles are granted actions for.
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
pub enum Service {
    Backup,
    Batch,
    Cloudformation,
    Drs,
    Ebs,
    Ec2,
    Elasticfilesystem,
    Events,
    Fsx,
    Iam,
    Kms,
    Lambda,
    Logs,
    S3,
    Sqs,
    Ssm,
    Sts,
}
