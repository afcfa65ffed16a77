//! Principals allowed to assume a role, in IAM JSON shape.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::statement::OneOrMany;
use super::template::Template;

/// A policy principal: `"*"` or one of the keyed forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Any,
    Aws(OneOrMany<Template>),
    Service(OneOrMany<Template>),
    Federated(OneOrMany<Template>),
}

impl Principal {
    pub fn aws(arn: impl Into<OneOrMany<Template>>) -> Self {
        Principal::Aws(arn.into())
    }

    pub fn service(service: impl Into<OneOrMany<Template>>) -> Self {
        Principal::Service(service.into())
    }

    /// Every principal value, in declaration order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Principal::Any => vec!["*"],
            Principal::Aws(v) | Principal::Service(v) | Principal::Federated(v) => {
                v.iter().map(Template::as_str).collect()
            }
        }
    }

    pub fn map_templates<E>(
        &self,
        f: &mut dyn FnMut(&Template) -> Result<Template, E>,
    ) -> Result<Self, E> {
        Ok(match self {
            Principal::Any => Principal::Any,
            Principal::Aws(v) => Principal::Aws(v.try_map(&mut *f)?),
            Principal::Service(v) => Principal::Service(v.try_map(&mut *f)?),
            Principal::Federated(v) => Principal::Federated(v.try_map(&mut *f)?),
        })
    }
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (key, values) = match self {
            Principal::Any => return serializer.serialize_str("*"),
            Principal::Aws(v) => ("AWS", v),
            Principal::Service(v) => ("Service", v),
            Principal::Federated(v) => ("Federated", v),
        };
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(key, values)?;
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PrincipalRepr {
    Star(String),
    Keyed(BTreeMap<String, OneOrMany<Template>>),
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        match PrincipalRepr::deserialize(deserializer)? {
            PrincipalRepr::Star(s) if s == "*" => Ok(Principal::Any),
            PrincipalRepr::Star(s) => Err(D::Error::custom(format!(
                "expected \"*\" or a keyed principal, found '{s}'"
            ))),
            PrincipalRepr::Keyed(map) => {
                let mut entries = map.into_iter();
                match (entries.next(), entries.next()) {
                    (Some((key, value)), None) => match key.as_str() {
                        "AWS" => Ok(Principal::Aws(value)),
                        "Service" => Ok(Principal::Service(value)),
                        "Federated" => Ok(Principal::Federated(value)),
                        other => Err(D::Error::custom(format!(
                            "unknown principal kind '{other}'"
                        ))),
                    },
                    _ => Err(D::Error::custom("principal must have exactly one key")),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yare::parameterized;

    #[parameterized(
        any = { Principal::Any, json!("*") },
        aws = { Principal::aws("arn:aws:iam::123456789012:root"), json!({"AWS": "arn:aws:iam::123456789012:root"}) },
        service = { Principal::service("events.amazonaws.com"), json!({"Service": "events.amazonaws.com"}) },
        federated_many = {
            Principal::Federated(vec!["a".to_string(), "b".to_string()].into()),
            json!({"Federated": ["a", "b"]})
        },
    )]
    fn test_principal_json_shape(principal: Principal, expected: serde_json::Value) {
        let value = serde_json::to_value(&principal).unwrap();
        assert_eq!(value, expected);
        let back: Principal = serde_json::from_value(value).unwrap();
        assert_eq!(back, principal);
    }

    #[test]
    fn test_principal_rejects_unknown_kind() {
        let result: Result<Principal, _> = serde_json::from_value(json!({"CanonicalUser": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_principal_values() {
        assert_eq!(Principal::Any.values(), vec!["*"]);
        assert_eq!(
            Principal::service("cloudformation.amazonaws.com").values(),
            vec!["cloudformation.amazonaws.com"]
        );
    }
}
