use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::builder;
use crate::catalog::Catalog;
use crate::emitter::{CloudFormation, Emitter, Project, Terraform};
use crate::error::CodegenError;
use crate::formatter::Formatter;
use crate::params::{BackendKind, Params};
use crate::types::ResourceGraph;

/// The main generator handle. Cloneable and thread-safe.
///
/// Runs share nothing but the read-only catalog, so one generator can serve
/// any number of concurrent runs.
#[derive(Debug, Clone)]
pub struct Generator {
    catalog: Arc<Catalog>,
}

impl Default for Generator {
    fn default() -> Self {
        Generator::standard()
    }
}

impl Generator {
    pub fn new(catalog: Catalog) -> Self {
        Generator {
            catalog: Arc::new(catalog),
        }
    }

    /// A generator over the standard Elastio permission catalog.
    pub fn standard() -> Self {
        Generator::new(Catalog::standard())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn build(&self, params: &Params) -> Result<ResourceGraph, CodegenError> {
        builder::build(params, &self.catalog)
    }

    /// Build and render `params` for its backend, without formatting.
    pub fn render(&self, params: &Params) -> Result<String, CodegenError> {
        let graph = self.build(params)?;
        match params.backend_kind() {
            BackendKind::Terraform => Emitter::new(Terraform).render(&graph, params),
            BackendKind::CloudFormation => Emitter::new(CloudFormation).render(&graph, params),
        }
    }

    /// Validate `raw`, then build, emit and format the project for `backend`.
    pub async fn generate(
        &self,
        raw: &Value,
        backend: BackendKind,
        formatter: &dyn Formatter,
    ) -> Result<Project, CodegenError> {
        debug!(
            event = "Generate",
            phase = "Start",
            backend = backend.as_ref()
        );

        let params = Params::validate(raw, backend)?;
        let graph = self.build(&params)?;

        let project = match backend {
            BackendKind::Terraform => {
                Emitter::new(Terraform)
                    .emit(&graph, &params, formatter)
                    .await?
            }
            BackendKind::CloudFormation => {
                Emitter::new(CloudFormation)
                    .emit(&graph, &params, formatter)
                    .await?
            }
        };

        info!(
            event = "Generate",
            phase = "Done",
            backend = backend.as_ref(),
            files = project.files.len()
        );
        Ok(project)
    }
}

/// Generate the project for `backend` from raw parameters, using the
/// standard catalog.
pub async fn generate(
    raw: &Value,
    backend: BackendKind,
    formatter: &dyn Formatter,
) -> Result<Project, CodegenError> {
    Generator::standard().generate(raw, backend, formatter).await
}
