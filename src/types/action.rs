//! IAM actions, e.g. `ec2:CreateSnapshot` or `lambda:*`.

use std::borrow::Cow;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::IntoEnumIterator;

use crate::error::CodegenError;

use super::service::Service;

const READ_ONLY_PREFIXES: [&str; 3] = ["List", "Get", "Describe"];

/// A single action, typed by its service prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Action {
    service: Service,
    name: Cow<'static, str>,
}

impl Action {
    pub fn new(service: Service, name: impl Into<Cow<'static, str>>) -> Self {
        Action {
            service,
            name: name.into(),
        }
    }

    /// `service:*`
    pub fn all(service: Service) -> Self {
        Action::new(service, "*")
    }

    pub fn service(&self) -> Service {
        self.service
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_wildcard(&self) -> bool {
        self.name.contains('*')
    }

    /// Whether the action only reads state (`List*`, `Get*`, `Describe*`).
    pub fn is_read_only(&self) -> bool {
        !self.is_wildcard()
            && READ_ONLY_PREFIXES
                .iter()
                .any(|prefix| self.name.starts_with(prefix))
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.service, self.name)
    }
}

impl FromStr for Action {
    type Err = CodegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (service, name) = s.split_once(':').ok_or_else(|| {
            CodegenError::InvalidFormat(format!(
                "Failed to parse action '{s}' (expected format: service:ActionName)"
            ))
        })?;
        let service = Service::from_str(service).map_err(|_| {
            CodegenError::InvalidFormat(format!(
                "Unknown service '{service}' in action '{s}' (known: {})",
                Service::iter().join(", ")
            ))
        })?;
        if name.is_empty() {
            return Err(CodegenError::InvalidFormat(format!(
                "Missing action name in '{s}'"
            )));
        }
        Ok(Action::new(service, name.to_string()))
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Build a `Vec<Action>` from per-service name lists:
///
/// ```ignore
/// actions![Ec2: ["DescribeInstances"], Ssm: ["DescribeInstanceInformation"]]
/// ```
macro_rules! actions {
    ($($service:ident : [$($name:literal),* $(,)?]),* $(,)?) => {
        vec![$($($crate::types::Action::new($crate::types::Service::$service, $name)),*),*]
    };
}

pub(crate) use actions;
