//! Schema validation port.
//!
//! The toolchain compiles each tool's parameter schema once at
//! registration and validates the raw argument map on every call.

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("invalid schema: {0}")]
    Compile(String),

    #[error("{0}")]
    Invalid(String),
}

/// A compiled schema.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, value: &Value) -> Result<(), SchemaError>;
}

/// Compiles raw JSON Schema documents.
pub trait SchemaCompiler: Send + Sync {
    fn compile(&self, schema: &Value) -> Result<Box<dyn SchemaValidator>, SchemaError>;
}
