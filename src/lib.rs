// src/lib.rs
pub use emitter::{Backend, CloudFormation, Emitter, Project, Terraform};
pub use error::{CodegenError, FieldError, ValidationErrors};
pub use formatter::{CommandFormatter, Formatter, Passthrough};
pub use generator::{Generator, generate};
pub use params::{BackendKind, BackendParams, CloudFormationOptions, CommonParams, Params};
pub use resolver::{SymbolTable, resolve, resolve_graph};

pub mod builder;
pub mod catalog;
pub mod emitter;
mod error;
mod formatter;
mod generator;
pub mod merge;
pub mod params;
pub mod policies;
pub mod resolver;
pub mod types;

#[cfg(test)]
mod tests;
