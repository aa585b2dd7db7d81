//! Structural change taxonomy and severity classification
//!
//! Every structural delta the differ can report is one of the closed set of
//! [`ChangeType`] variants. The severity of a change depends on the event
//! type's compatibility mode: forward-only contracts tolerate consumer-facing
//! loosening that compatible contracts must reject. All matches over
//! [`ChangeType`] are exhaustive so that adding a variant forces a severity
//! and catalog decision at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::event_type::CompatibilityMode;
use crate::version::ChangeLevel;

/// Kinds of structural change between two JSON Schema documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    DescriptionChanged,
    TitleChanged,
    PropertiesAdded,
    IdChanged,
    SchemaRemoved,
    TypeChanged,
    NumberOfItemsChanged,
    PropertyRemoved,
    DependencyArrayChanged,
    DependencySchemaChanged,
    DependencySchemaRemoved,
    CompositionMethodChanged,
    AttributeValueChanged,
    EnumArrayChanged,
    SubSchemaChanged,
    RequiredArrayChanged,
    RequiredArrayExtended,
    AdditionalPropertiesChanged,
    AdditionalItemsChanged,
}

impl ChangeType {
    /// Severity of this change under the given compatibility mode.
    ///
    /// Extending the required array and loosening `additionalProperties` or
    /// `additionalItems` only affect consumers, so forward-only contracts
    /// accept them as minor.
    pub fn level(self, mode: CompatibilityMode) -> ChangeLevel {
        match self {
            ChangeType::DescriptionChanged | ChangeType::TitleChanged => ChangeLevel::Patch,
            ChangeType::PropertiesAdded => ChangeLevel::Minor,
            ChangeType::RequiredArrayExtended
            | ChangeType::AdditionalPropertiesChanged
            | ChangeType::AdditionalItemsChanged => match mode {
                CompatibilityMode::Forward => ChangeLevel::Minor,
                CompatibilityMode::Compatible | CompatibilityMode::None => ChangeLevel::Major,
            },
            ChangeType::IdChanged
            | ChangeType::SchemaRemoved
            | ChangeType::TypeChanged
            | ChangeType::NumberOfItemsChanged
            | ChangeType::PropertyRemoved
            | ChangeType::DependencyArrayChanged
            | ChangeType::DependencySchemaChanged
            | ChangeType::DependencySchemaRemoved
            | ChangeType::CompositionMethodChanged
            | ChangeType::AttributeValueChanged
            | ChangeType::EnumArrayChanged
            | ChangeType::SubSchemaChanged
            | ChangeType::RequiredArrayChanged => ChangeLevel::Major,
        }
    }

    /// Whether this change breaks the given compatibility contract
    pub fn is_breaking(self, mode: CompatibilityMode) -> bool {
        self.level(mode) == ChangeLevel::Major
    }

    /// Human-readable message used when reporting this change to clients
    pub fn message(self) -> &'static str {
        match self {
            ChangeType::DescriptionChanged => "description changed",
            ChangeType::TitleChanged => "title changed",
            ChangeType::PropertiesAdded => "new properties added",
            ChangeType::IdChanged => "schema id cannot change",
            ChangeType::SchemaRemoved => "schema cannot be removed",
            ChangeType::TypeChanged => "schema types must be the same",
            ChangeType::NumberOfItemsChanged => "the number of schema items cannot change",
            ChangeType::PropertyRemoved => "schema properties cannot be removed",
            ChangeType::DependencyArrayChanged => "schema dependencies array cannot change",
            ChangeType::DependencySchemaChanged => "schema dependencies cannot change",
            ChangeType::DependencySchemaRemoved => "dependency schema cannot be removed",
            ChangeType::CompositionMethodChanged => "schema composition method changed",
            ChangeType::AttributeValueChanged => "change to attribute value not allowed",
            ChangeType::EnumArrayChanged => "enum array changed",
            ChangeType::SubSchemaChanged => "sub schema changed",
            ChangeType::RequiredArrayChanged => "required array changed",
            ChangeType::RequiredArrayExtended => "required array extended",
            ChangeType::AdditionalPropertiesChanged => "change to additionalProperties not allowed",
            ChangeType::AdditionalItemsChanged => "change to additionalItems not allowed",
        }
    }
}

/// One structural delta between two schema documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaChange {
    /// What kind of change occurred
    pub change_type: ChangeType,
    /// JSON pointer to the changed node, rooted at `#`
    pub path: String,
}

impl SchemaChange {
    pub fn new(change_type: ChangeType, path: impl Into<String>) -> Self {
        Self {
            change_type,
            path: path.into(),
        }
    }
}

impl fmt::Display for SchemaChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.change_type.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosmetic_changes_are_patch_under_every_mode() {
        for mode in [
            CompatibilityMode::None,
            CompatibilityMode::Forward,
            CompatibilityMode::Compatible,
        ] {
            assert_eq!(ChangeType::DescriptionChanged.level(mode), ChangeLevel::Patch);
            assert_eq!(ChangeType::TitleChanged.level(mode), ChangeLevel::Patch);
            assert_eq!(ChangeType::PropertiesAdded.level(mode), ChangeLevel::Minor);
        }
    }

    #[test]
    fn test_forward_mode_downgrades_consumer_facing_changes() {
        for change in [
            ChangeType::RequiredArrayExtended,
            ChangeType::AdditionalPropertiesChanged,
            ChangeType::AdditionalItemsChanged,
        ] {
            assert_eq!(change.level(CompatibilityMode::Forward), ChangeLevel::Minor);
            assert_eq!(change.level(CompatibilityMode::Compatible), ChangeLevel::Major);
            assert_eq!(change.level(CompatibilityMode::None), ChangeLevel::Major);
        }
    }

    #[test]
    fn test_structural_removals_are_always_major() {
        for mode in [
            CompatibilityMode::None,
            CompatibilityMode::Forward,
            CompatibilityMode::Compatible,
        ] {
            assert_eq!(ChangeType::PropertyRemoved.level(mode), ChangeLevel::Major);
            assert_eq!(ChangeType::TypeChanged.level(mode), ChangeLevel::Major);
            assert_eq!(ChangeType::SchemaRemoved.level(mode), ChangeLevel::Major);
        }
    }

    #[test]
    fn test_is_breaking_follows_level() {
        assert!(ChangeType::PropertyRemoved.is_breaking(CompatibilityMode::Compatible));
        assert!(!ChangeType::RequiredArrayExtended.is_breaking(CompatibilityMode::Forward));
        assert!(!ChangeType::DescriptionChanged.is_breaking(CompatibilityMode::Compatible));
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let value = serde_json::to_value(ChangeType::RequiredArrayExtended).unwrap();
        assert_eq!(value, serde_json::json!("required_array_extended"));
    }

    #[test]
    fn test_change_display_includes_path_and_message() {
        let change = SchemaChange::new(ChangeType::EnumArrayChanged, "#/properties/status/enum");
        assert_eq!(
            change.to_string(),
            "#/properties/status/enum: enum array changed"
        );
    }
}
