//! End-to-end runs of the whole pipeline.

use serde_json::{Value, json};

use crate::builder::CLOUD_CONNECTOR;
use crate::formatter::Passthrough;
use crate::params::BackendKind;
use crate::{CodegenError, Generator, Params, Project};


fn raw_params() -> Value {
    json!({
        "connectorAccountId": "123456789012",
        "connectorRoleExternalId": "external-id",
        "tags": { "team": "platform" }
    })
}

async fn generate(backend: BackendKind) -> Result<Project, CodegenError> {
    Generator::standard()
        .generate(&raw_params(), backend, &Passthrough)
        .await
}

fn main_file(project: &Project, backend: BackendKind) -> String {
    let name = match backend {
        BackendKind::Terraform => "main.tf",
        BackendKind::CloudFormation => "template.yaml",
    };
    project
        .file(name)
        .unwrap_or_else(|| panic!("{name} missing from {:?}", project.files.keys()))
        .to_string()
}

/// Group names of the primary role, straight from the graph.
fn connector_groups(backend: BackendKind) -> Vec<String> {
    let params = Params::validate(&raw_params(), backend).unwrap();
    let graph = Generator::standard().build(&params).unwrap();
    graph
        .get(CLOUD_CONNECTOR)
        .and_then(|r| r.as_role())
        .unwrap()
        .statements
        .names()
        .map(String::from)
        .collect()
}
