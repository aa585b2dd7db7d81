//! Error types for schema evolution

use thiserror::Error;

use crate::change::SchemaChange;

/// Result type for schema evolution operations
pub type Result<T> = std::result::Result<T, EvolutionError>;

/// Schema evolution errors
#[derive(Error, Debug)]
pub enum EvolutionError {
    /// One or more evolution constraints rejected the proposed definition
    #[error("{}", .reasons.join("; "))]
    Incompatible { reasons: Vec<String> },

    /// A category change outside the single sanctioned migration
    #[error("Category change is allowed only from 'undefined' to 'business'; the proposed event type must declare the 'metadata_enrichment' strategy")]
    CategoryChangeForbidden,

    /// Structural changes that break the declared compatibility contract
    #[error("Invalid schema: {}", render_changes(.changes))]
    BreakingChanges { changes: Vec<SchemaChange> },

    #[error("Invalid event type name: {0}")]
    InvalidName(String),

    #[error("Meta-schema error: {0}")]
    MetaSchema(String),

    #[error("Invalid schema document: {0}")]
    SchemaJson(#[from] serde_json::Error),

    #[error("Invalid version: {0}")]
    Version(#[from] semver::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn render_changes(changes: &[SchemaChange]) -> String {
    changes
        .iter()
        .map(|change| format!("{}: {}", change.path, change.change_type.message()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeType;

    #[test]
    fn test_incompatible_joins_reasons() {
        let err = EvolutionError::Incompatible {
            reasons: vec![
                "changing event type name is not allowed".to_string(),
                "changing category is not allowed".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "changing event type name is not allowed; changing category is not allowed"
        );
    }

    #[test]
    fn test_breaking_changes_lists_paths_and_messages() {
        let err = EvolutionError::BreakingChanges {
            changes: vec![
                SchemaChange::new(ChangeType::PropertyRemoved, "#/properties/foo"),
                SchemaChange::new(ChangeType::TypeChanged, "#/properties/bar"),
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("Invalid schema: #/properties/foo: "));
        assert!(text.contains(", #/properties/bar: "));
    }
}
