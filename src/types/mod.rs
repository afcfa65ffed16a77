//! Data model of the resource graph.
//!
//! Canonical string forms:
//! - Action: `service:ActionName` or `service:*`
//! - Principal: `"*"` or `{ "AWS" | "Service" | "Federated": value(s) }`
//! - Reference: `{{account_id}}` or `{{resourceType.resourceId.attribute}}`,
//!   only inside a [`Template::Pattern`]

mod action;
mod condition;
mod graph;
mod principal;
mod reference;
mod resource;
mod service;
mod statement;
mod statement_groups;
mod template;

pub use action::Action;
pub(crate) use action::actions;
pub use condition::{Condition, KnownTag};
pub use graph::{ResourceGraph, ResourceId};
pub use principal::Principal;
pub use reference::{ACCOUNT_ID, Reference};
pub use resource::{IamRole, Resource, ResourceKind, SsmParameter};
pub use service::Service;
pub use statement::{Effect, OneOrMany, POLICY_VERSION, PolicyDocument, PolicyStatement};
pub use statement_groups::StatementGroups;
pub use template::Template;
