//! Rewrites `{{...}}` placeholders into backend interpolation expressions.
//!
//! Resolution runs in two phases. First a backend builds a [`SymbolTable`]
//! from the finished graph. Then every template of the graph is resolved on
//! its own: a [`Template::Pattern`] gets one left-to-right pass, a
//! [`Template::Literal`] is never scanned. Substituted text is not scanned
//! again, so an expression can't be substituted twice or match part of a
//! token. Text around the placeholders is escaped for the backend, so
//! nothing but the substituted expressions is interpolated.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::CodegenError;
use crate::types::{ACCOUNT_ID, Reference, ResourceGraph, Template};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Placeholder body (`account_id`, `aws_iam_role.x.arn`) to the backend
/// expression it stands for (`${local.account_id}`, `${X.Arn}`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: BTreeMap<String, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn insert(&mut self, reference: &Reference, expression: impl Into<String>) {
        self.symbols.insert(reference.key(), expression.into());
    }

    pub fn with(mut self, reference: &Reference, expression: impl Into<String>) -> Self {
        self.insert(reference, expression);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.symbols.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Resolve one template into backend text.
///
/// `{{account_id}}` is looked up first; any other body must be a
/// `type.id.attribute` path. A body with no symbol is a graph/backend
/// mismatch and fails. `escape` is applied to everything that isn't a
/// substituted expression, and the result is a [`Template::Literal`].
pub fn resolve(
    template: &Template,
    symbols: &SymbolTable,
    escape: &dyn Fn(&str) -> String,
) -> Result<Template, CodegenError> {
    let text = match template {
        Template::Literal(text) => return Ok(Template::Literal(escape(text.as_str()))),
        Template::Pattern(text) => text.as_str(),
    };

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&escape(&rest[..start]));
        let after = &rest[start + OPEN.len()..];
        let end = after.find(CLOSE).ok_or_else(|| {
            CodegenError::MalformedReference(format!(
                "unterminated placeholder near '{}'",
                excerpt(&rest[start..])
            ))
        })?;

        out.push_str(lookup(&after[..end], symbols)?);
        rest = &after[end + CLOSE.len()..];
    }
    out.push_str(&escape(rest));

    Ok(Template::Literal(out))
}

/// Resolve every template in `graph`, returning a graph of literals.
pub fn resolve_graph(
    graph: &ResourceGraph,
    symbols: &SymbolTable,
    escape: &dyn Fn(&str) -> String,
) -> Result<ResourceGraph, CodegenError> {
    let mut patterns = 0usize;
    let resolved = graph.map_templates(&mut |template: &Template| {
        if !template.is_literal() {
            patterns += 1;
        }
        resolve(template, symbols, escape)
    })?;

    debug!(event = "Resolve", phase = "Done", patterns = patterns);
    Ok(resolved)
}

fn lookup<'a>(body: &str, symbols: &'a SymbolTable) -> Result<&'a str, CodegenError> {
    let key = if body == ACCOUNT_ID {
        ACCOUNT_ID.to_string()
    } else {
        body.parse::<Reference>()?.key()
    };

    symbols.get(&key).ok_or_else(|| {
        warn!(event = "Resolve", phase = "Lookup", missing = key.as_str());
        CodegenError::UnresolvedReference(format!("{OPEN}{body}{CLOSE}"))
    })
}

fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(40) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Action, Condition, IamRole, PolicyStatement, Principal, ResourceKind, Service,
        SsmParameter, StatementGroups,
    };
    use yare::parameterized;

    fn terraform_symbols() -> SymbolTable {
        SymbolTable::new()
            .with(&Reference::AccountId, "${local.account_id}")
            .with(
                &Reference::arn(ResourceKind::IamRole, "deployer"),
                "${aws_iam_role.deployer.arn}",
            )
    }

    fn verbatim(text: &str) -> String {
        text.to_string()
    }

    fn dollar_escape(text: &str) -> String {
        text.replace("${", "$${")
    }

    fn resolve_str(input: &str) -> Result<String, CodegenError> {
        resolve(&Template::from(input), &terraform_symbols(), &verbatim).map(|t| t.to_string())
    }

    #[test]
    fn test_resolve_account_id() {
        let table = SymbolTable::new().with(&Reference::AccountId, "${local.account_id}");
        let resolved = resolve(&"{{account_id}}".into(), &table, &verbatim).unwrap();
        insta::assert_snapshot!(resolved, @"${local.account_id}");
        assert!(resolved.is_literal());
    }

    #[parameterized(
        no_placeholders = { "plain text", "plain text" },
        account_in_arn = {
            "arn:aws:ssm:*:{{account_id}}:parameter/elastio/*",
            "arn:aws:ssm:*:${local.account_id}:parameter/elastio/*"
        },
        role_arn = {
            "{{aws_iam_role.deployer.arn}}",
            "${aws_iam_role.deployer.arn}"
        },
        several = {
            "{{account_id}}/{{aws_iam_role.deployer.arn}}/{{account_id}}",
            "${local.account_id}/${aws_iam_role.deployer.arn}/${local.account_id}"
        },
        single_braces_untouched = { "{ \"a\": {} }", "{ \"a\": {} }" },
    )]
    fn test_resolve(input: &str, expected: &str) {
        assert_eq!(resolve_str(input).unwrap(), expected);
    }

    #[test]
    fn test_resolve_unknown_reference() {
        let err = resolve_str("{{aws_iam_role.missing.arn}}").unwrap_err();
        match err {
            CodegenError::UnresolvedReference(placeholder) => {
                assert_eq!(placeholder, "{{aws_iam_role.missing.arn}}")
            }
            other => panic!("Expected UnresolvedReference, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_account_id_without_symbol() {
        let err = resolve(&"{{account_id}}".into(), &SymbolTable::new(), &verbatim).unwrap_err();
        assert!(matches!(err, CodegenError::UnresolvedReference(_)));
    }

    #[parameterized(
        unterminated = { "arn:{{account_id" },
        bad_shape = { "{{not a reference}}" },
        empty = { "{{}}" },
    )]
    fn test_resolve_malformed(input: &str) {
        assert!(matches!(
            resolve_str(input),
            Err(CodegenError::MalformedReference(_))
        ));
    }

    #[test]
    fn test_resolve_does_not_rescan_substituted_text() {
        let table = SymbolTable::new().with(&Reference::AccountId, "{{account_id}}");
        let resolved = resolve(&"{{account_id}}".into(), &table, &verbatim).unwrap();
        assert_eq!(resolved.as_str(), "{{account_id}}");
    }

    #[parameterized(
        braces = { "ab{{cd" },
        placeholder_shape = { "{{account_id}}" },
        closing_only = { "x}}" },
    )]
    fn test_literals_are_never_scanned(value: &str) {
        let resolved = resolve(&Template::literal(value), &terraform_symbols(), &verbatim).unwrap();
        assert_eq!(resolved.as_str(), value);
    }

    #[test]
    fn test_escape_skips_substituted_expressions() {
        let pattern = Template::from("${x}:{{account_id}}");
        let resolved = resolve(&pattern, &terraform_symbols(), &dollar_escape).unwrap();
        assert_eq!(resolved.as_str(), "$${x}:${local.account_id}");

        let literal = resolve(&Template::literal("s3cr${et}"), &terraform_symbols(), &dollar_escape)
            .unwrap();
        assert_eq!(literal.as_str(), "s3cr$${et}");
    }

    #[test]
    fn test_resolve_graph_keeps_caller_values() {
        let trust = PolicyStatement::allow(Action::new(Service::Sts, "AssumeRole"))
            .with_principal(Principal::aws(Template::literal("arn:aws:iam::1:role/{{x}}")))
            .with_condition(Condition::string_equals(
                "sts:ExternalId",
                Template::literal("{{account_id}}"),
            ));
        let role = IamRole::new("Deployer", "deploys", trust).with_statements(
            StatementGroups::new().group(
                "ReadSsm",
                vec![PolicyStatement::allow(Action::new(Service::Ssm, "GetParameter"))
                    .on("arn:aws:ssm:*:{{account_id}}:parameter/elastio/*")],
            ),
        );
        let mut graph = ResourceGraph::new();
        graph.insert("deployer", role).unwrap();
        graph
            .insert("arn", SsmParameter::new("/elastio/arn", "arn", "{{aws_iam_role.deployer.arn}}"))
            .unwrap();

        let resolved = resolve_graph(&graph, &terraform_symbols(), &verbatim).unwrap();
        let text = serde_json::to_string(&resolved).unwrap();
        assert!(text.contains(r#""sts:ExternalId":"{{account_id}}""#));
        assert!(text.contains(r#""AWS":"arn:aws:iam::1:role/{{x}}""#));
        assert!(text.contains("arn:aws:ssm:*:${local.account_id}:parameter/elastio/*"));
        assert!(text.contains(r#""value":"${aws_iam_role.deployer.arn}""#));
    }
}
