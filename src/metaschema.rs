//! Meta-schema validation of candidate schema documents
//!
//! The broker only supports a subset of JSON Schema. Before an event type
//! schema is registered or evolved, the document is validated against the
//! meta-schema (the schema of schemas), which whitelists the supported
//! keywords and rejects everything else, references and unsupported
//! composition included. Violations are reported as data, never as errors:
//! a syntactically valid document always yields a (possibly empty) list of
//! diagnostics.

use include_dir::{include_dir, Dir};
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EvolutionError, Result};

static EMBEDDED_SCHEMAS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/schemas");

const META_SCHEMA_FILE: &str = "metaschema.json";

/// One meta-schema violation in a candidate schema document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaIncompatibility {
    /// JSON pointer to the offending node, rooted at `#`
    pub json_pointer: String,
    /// Human-readable description of the violation
    pub message: String,
}

impl SchemaIncompatibility {
    pub fn new(json_pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            json_pointer: json_pointer.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaIncompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.json_pointer, self.message)
    }
}

/// Validator holding the compiled meta-schema
pub struct MetaSchemaValidator {
    compiled: JSONSchema,
}

impl MetaSchemaValidator {
    /// Build the validator from the meta-schema bundled into the binary
    pub fn embedded() -> Result<Self> {
        let raw = EMBEDDED_SCHEMAS
            .get_file(META_SCHEMA_FILE)
            .and_then(|file| file.contents_utf8())
            .ok_or_else(|| {
                EvolutionError::MetaSchema(format!(
                    "embedded meta-schema '{}' is missing",
                    META_SCHEMA_FILE
                ))
            })?;
        let document: Value = serde_json::from_str(raw)?;
        Self::from_document(&document)
    }

    /// Build the validator from a meta-schema document
    pub fn from_document(document: &Value) -> Result<Self> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(document)
            .map_err(|err| EvolutionError::MetaSchema(err.to_string()))?;
        Ok(Self { compiled })
    }

    /// Build the validator from a meta-schema file on disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let document: Value = serde_json::from_str(&raw)?;
        Self::from_document(&document)
    }

    /// Validate a candidate schema document against the meta-schema.
    ///
    /// Returns one diagnostic per terminal violation, each pointing at the
    /// node that uses an unsupported construct; an empty list means the
    /// document is fully within the supported subset.
    pub fn collect_incompatibilities(&self, schema: &Value) -> Vec<SchemaIncompatibility> {
        match self.compiled.validate(schema) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|error| {
                    SchemaIncompatibility::new(format!("#{}", error.instance_path), error.to_string())
                })
                .collect(),
        }
    }

    /// Whether a candidate schema document is fully within the supported subset
    pub fn is_supported(&self, schema: &Value) -> bool {
        self.compiled.is_valid(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> MetaSchemaValidator {
        MetaSchemaValidator::embedded().unwrap()
    }

    #[test]
    fn test_embedded_meta_schema_compiles() {
        assert!(MetaSchemaValidator::embedded().is_ok());
    }

    #[test]
    fn test_supported_schema_has_no_incompatibilities() {
        let schema = json!({
            "type": "object",
            "title": "order",
            "properties": {
                "order_number": {"type": "string"},
                "items": {
                    "type": "array",
                    "items": {"type": "object", "properties": {"sku": {"type": "string"}}}
                }
            },
            "required": ["order_number"],
            "additionalProperties": false
        });
        let incompatibilities = validator().collect_incompatibilities(&schema);
        assert!(incompatibilities.is_empty(), "{:?}", incompatibilities);
        assert!(validator().is_supported(&schema));
    }

    #[test]
    fn test_forbidden_keyword_at_root_points_at_root() {
        let schema = json!({"type": "object", "not": {"type": "string"}});
        let incompatibilities = validator().collect_incompatibilities(&schema);
        assert!(!incompatibilities.is_empty());
        assert!(incompatibilities.iter().any(|i| i.json_pointer == "#"));
    }

    #[test]
    fn test_forbidden_keyword_in_nested_schema_points_at_node() {
        let schema = json!({
            "type": "object",
            "properties": {
                "foo": {"patternProperties": {"^x": {"type": "string"}}}
            }
        });
        let incompatibilities = validator().collect_incompatibilities(&schema);
        assert!(!incompatibilities.is_empty());
        assert!(
            incompatibilities
                .iter()
                .any(|i| i.json_pointer == "#/properties/foo"),
            "{:?}",
            incompatibilities
        );
    }

    #[test]
    fn test_references_are_rejected() {
        let schema = json!({
            "type": "object",
            "properties": {"foo": {"$ref": "#/definitions/foo"}}
        });
        let incompatibilities = validator().collect_incompatibilities(&schema);
        assert!(!incompatibilities.is_empty());
    }

    #[test]
    fn test_malformed_keyword_value_is_reported_as_data() {
        let schema = json!({"type": "object", "required": "order_number"});
        let incompatibilities = validator().collect_incompatibilities(&schema);
        assert!(!incompatibilities.is_empty());
        assert!(incompatibilities.iter().any(|i| i.json_pointer == "#/required"));
    }

    #[test]
    fn test_non_object_document_is_reported_as_data() {
        let incompatibilities = validator().collect_incompatibilities(&json!(42));
        assert_eq!(incompatibilities.len(), 1);
        assert_eq!(incompatibilities[0].json_pointer, "#");
    }

    #[test]
    fn test_display_includes_pointer_and_message() {
        let incompatibility = SchemaIncompatibility::new("#/properties/foo", "unsupported");
        assert_eq!(incompatibility.to_string(), "#/properties/foo: unsupported");
    }
}
