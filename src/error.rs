use std::fmt::{Display, Formatter, Result as FmtResult};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Serialize, Deserialize)]
pub enum CodegenError {
    #[error("invalid parameters: {0}")]
    Validation(ValidationErrors),

    #[error("duplicate policy statements at `{key}`")]
    DuplicateStatementGroup { key: String },

    #[error("duplicate resource id: {0}")]
    DuplicateResource(String),

    #[error("duplicate resource name: {0}")]
    DuplicateResourceName(String),

    #[error("duplicate logical id in template: {0}")]
    DuplicateLogicalId(String),

    #[error("policy statement without actions in {0}")]
    EmptyActions(String),

    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    #[error("malformed reference: {0}")]
    MalformedReference(String),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("invalid parameter schema: {0}")]
    InvalidSchema(String),

    #[error("formatter error: {0}")]
    Formatter(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CodegenError {
    fn from(err: serde_json::Error) -> Self {
        CodegenError::Serialization(err.to_string())
    }
}

impl From<ValidationErrors> for CodegenError {
    fn from(errors: ValidationErrors) -> Self {
        CodegenError::Validation(errors)
    }
}

/// A single offending field in the raw parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// JSON pointer of the field, `(root)` for document-level problems.
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        let path = path.into();
        FieldError {
            path: if path.is_empty() {
                "(root)".to_string()
            } else {
                path
            },
            message: message.into(),
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every field-level problem found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.path.as_str())
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0.iter().join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_empty_path_is_root() {
        let err = FieldError::new("", "must be an object");
        assert_eq!(err.path, "(root)");
        assert_eq!(err.to_string(), "(root): must be an object");
    }

    #[test]
    fn test_validation_errors_display_lists_every_field() {
        let errors = ValidationErrors(vec![
            FieldError::new("/connectorAccountId", "does not match pattern"),
            FieldError::new("/tags/env", "is not a string"),
        ]);
        let err = CodegenError::from(errors);
        assert_eq!(
            err.to_string(),
            "invalid parameters: /connectorAccountId: does not match pattern; /tags/env: is not a string"
        );
    }

    #[test]
    fn test_duplicate_group_names_key() {
        let err = CodegenError::DuplicateStatementGroup {
            key: "ReadInventory".to_string(),
        };
        assert!(err.to_string().contains("ReadInventory"));
    }
}
