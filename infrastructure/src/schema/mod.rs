//! JSON Schema validation backed by the `jsonschema` crate.

use agentctx_application::{SchemaCompiler, SchemaError, SchemaValidator};
use serde_json::Value;

/// Compiles tool parameter schemas with `jsonschema::validator_for`
/// (draft detected from `$schema`, latest otherwise).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaCompiler;

impl SchemaCompiler for JsonSchemaCompiler {
    fn compile(&self, schema: &Value) -> Result<Box<dyn SchemaValidator>, SchemaError> {
        let validator = jsonschema::validator_for(schema)
            .map_err(|e| SchemaError::Compile(e.to_string()))?;
        Ok(Box::new(JsonSchemaValidator { validator }))
    }
}

/// A compiled schema.
pub struct JsonSchemaValidator {
    validator: jsonschema::Validator,
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(value)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{}: {}", path, e)
                }
            })
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Invalid(errors.join("; ")))
        }
    }
}
