//! Rendering of a resource graph into deployment-tool source text.
//!
//! Both targets share one algorithm, [`Emitter::render`]. A [`Backend`]
//! only describes its own syntax: how a role, its policy groups and a
//! parameter are declared, how a reference is interpolated and how plain
//! text is kept from being interpolated.

mod cloudformation;
mod terraform;

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::CodegenError;
use crate::formatter::Formatter;
use crate::params::{BackendKind, Params};
use crate::resolver::{SymbolTable, resolve_graph};
use crate::types::{IamRole, Reference, Resource, ResourceGraph, ResourceKind, SsmParameter};

pub use cloudformation::CloudFormation;
pub use terraform::Terraform;

/// The syntax of one deployment tool.
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Name of the single file this backend produces.
    fn file_name(&self) -> &'static str;

    /// Expression for the id of the account the code is deployed to.
    fn account_id_symbol(&self) -> String;

    /// Expression for `attribute` of the resource `id`.
    fn attribute_symbol(&self, kind: ResourceKind, id: &str, attribute: &str) -> String;

    /// `literal` as it must be written where this tool interpolates
    /// expressions, so that it reads back unchanged.
    fn escape(&self, literal: &str) -> String;

    /// Rejects graphs this backend can't declare unambiguously.
    fn check(&self, _graph: &ResourceGraph) -> Result<(), CodegenError> {
        Ok(())
    }

    /// Text placed before every resource, if any.
    fn preamble(&self, params: &Params) -> Result<Option<String>, CodegenError>;

    fn role(&self, id: &str, role: &IamRole, params: &Params) -> Result<String, CodegenError>;

    /// Managed policy attachments declared next to the role, for backends
    /// that can't express them as a role property.
    fn managed_policies(&self, _id: &str, _policies: &[String]) -> Result<Option<String>, CodegenError> {
        Ok(None)
    }

    /// One named inline policy per statement group of `role`. Only called
    /// when the role has at least one group.
    fn role_policies(&self, id: &str, role: &IamRole) -> Result<String, CodegenError>;

    fn parameter(
        &self,
        id: &str,
        parameter: &SsmParameter,
        params: &Params,
    ) -> Result<String, CodegenError>;

    /// Trailing block that exposes the deploying account's id.
    fn account_id(&self) -> String;

    fn separator(&self) -> &'static str {
        "\n\n"
    }
}

/// Files produced by one generation run, keyed by relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Project {
    pub files: BTreeMap<String, String>,
}

impl Project {
    pub fn single(path: impl Into<String>, text: impl Into<String>) -> Self {
        Project {
            files: BTreeMap::from([(path.into(), text.into())]),
        }
    }

    pub fn file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }
}

/// Renders graphs with one backend.
#[derive(Debug, Clone, Default)]
pub struct Emitter<B> {
    backend: B,
}

impl<B: Backend> Emitter<B> {
    pub fn new(backend: B) -> Self {
        Emitter { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Every reference the graph can satisfy, in this backend's syntax.
    pub fn symbols(&self, graph: &ResourceGraph) -> SymbolTable {
        let mut symbols =
            SymbolTable::new().with(&Reference::AccountId, self.backend.account_id_symbol());

        for (id, resource) in graph.iter() {
            let kind = resource.kind();
            for attribute in kind.attributes() {
                symbols.insert(
                    &Reference::attribute(kind, id, *attribute),
                    self.backend.attribute_symbol(kind, id, attribute),
                );
            }
        }
        symbols
    }

    /// Render `graph` to text, before formatting.
    ///
    /// Placeholders are resolved field by field before anything is declared,
    /// so parameter text is never read as a placeholder. Resources are
    /// visited in graph order, so the output is byte-for-byte stable for a
    /// fixed graph and parameter record.
    pub fn render(&self, graph: &ResourceGraph, params: &Params) -> Result<String, CodegenError> {
        let backend = &self.backend;
        backend.check(graph)?;
        let symbols = self.symbols(graph);
        let graph = resolve_graph(graph, &symbols, &|text: &str| backend.escape(text))?;

        let mut parts = Vec::with_capacity(graph.len() * 2 + 2);
        parts.extend(backend.preamble(params)?);

        for (id, resource) in graph.iter() {
            match resource {
                Resource::IamRole(role) => {
                    parts.push(backend.role(id, role, params)?);
                    if !params.managed_policies().is_empty() {
                        parts.extend(backend.managed_policies(id, params.managed_policies())?);
                    }
                    if role.statements.is_empty() {
                        debug!(
                            event = "Emit",
                            phase = "NoStatements",
                            backend = backend.kind().as_ref(),
                            resource = id
                        );
                        continue;
                    }
                    parts.push(backend.role_policies(id, role)?);
                }
                Resource::SsmParameter(parameter) => {
                    parts.push(backend.parameter(id, parameter, params)?);
                }
            }
        }

        parts.push(backend.account_id());

        Ok(parts.join(backend.separator()))
    }

    /// Render and format `graph` into this backend's project.
    pub async fn emit(
        &self,
        graph: &ResourceGraph,
        params: &Params,
        formatter: &dyn Formatter,
    ) -> Result<Project, CodegenError> {
        let raw = self.render(graph, params)?;
        let formatted = formatter.format(&raw).await?;

        info!(
            event = "Emit",
            phase = "Done",
            backend = self.backend.kind().as_ref(),
            file = self.backend.file_name(),
            bytes = formatted.len()
        );
        Ok(Project::single(self.backend.file_name(), formatted))
    }
}

/// `value` as a double-quoted string literal. The JSON form is also valid
/// in HCL and in YAML flow scalars.
pub(crate) fn quote(value: &str) -> String {
    Value::from(value).to_string()
}

/// Pretty JSON of `value`.
pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CodegenError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Indent every line of `text` but the first by `width` spaces, for values
/// that continue the line they start on.
pub(crate) fn indent_tail(text: &str, width: usize) -> String {
    let pad = format!("\n{}", " ".repeat(width));
    text.lines().join(&pad)
}

/// Indent every line of `text` by `width` spaces, for block scalars.
pub(crate) fn indent_block(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines().map(|line| format!("{pad}{line}")).join("\n")
}
