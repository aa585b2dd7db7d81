//! End-to-end tests for the schema evolution pipeline
//!
//! Each test drives the public service API the way a registry endpoint
//! would: a registered event type plus a proposed definition in, an evolved
//! event type or a structured rejection out.

use chrono::Utc;
use serde_json::json;

use freshet_schemas::{
    Category, ChangeType, CompatibilityMode, EnrichmentStrategy, EventType, EventTypeBase,
    EventTypeName, EvolutionConfig, EvolutionError, Fingerprint, SchemaBase,
    SchemaEvolutionService, SchemaVersion,
};

fn service() -> SchemaEvolutionService {
    SchemaEvolutionService::new().unwrap()
}

fn registered(mode: CompatibilityMode, schema: &str) -> EventType {
    let base = EventTypeBase::new(
        EventTypeName::new("order.created").unwrap(),
        Category::Undefined,
        mode,
        SchemaBase::json_schema(schema),
    );
    EventType::create(base, Utc::now())
}

fn propose(original: &EventType, schema: &str) -> EventTypeBase {
    let mut base = original.as_base();
    base.schema = SchemaBase::json_schema(schema);
    base
}

fn version(text: &str) -> SchemaVersion {
    SchemaVersion::parse(text).unwrap()
}

// =============================================================================
// Version Arithmetic
// =============================================================================

#[test]
fn test_identical_definition_keeps_snapshot() {
    let schema = r#"{"type":"object","properties":{"foo":{"type":"string"}}}"#;
    let original = registered(CompatibilityMode::Forward, schema);
    let proposed = propose(&original, schema);

    let evolved = service().evolve(&original, &proposed).unwrap();

    assert_eq!(evolved.schema, original.schema);
    assert_eq!(evolved.schema.version, version("1.0.0"));
    assert_eq!(evolved.created_at, original.created_at);
    assert!(evolved.updated_at >= original.updated_at);
}

#[test]
fn test_formatting_change_bumps_patch() {
    let original = registered(CompatibilityMode::Forward, r#"{"type":"object"}"#);
    let proposed_text = r#"{ "type": "object" }"#;
    let proposed = propose(&original, proposed_text);

    let evolved = service().evolve(&original, &proposed).unwrap();

    assert_eq!(evolved.schema.version, version("1.0.1"));
    assert_eq!(evolved.schema.schema, proposed_text);
    assert_eq!(
        evolved.schema.fingerprint(),
        Fingerprint::of_text(proposed_text)
    );
}

#[test]
fn test_added_property_bumps_minor() {
    let original = registered(
        CompatibilityMode::Forward,
        r#"{"type":"object","properties":{"foo":{"type":"string"}}}"#,
    );
    let proposed = propose(
        &original,
        r#"{"type":"object","properties":{"foo":{"type":"string"},"bar":{"type":"number"}}}"#,
    );

    let evolved = service().evolve(&original, &proposed).unwrap();

    assert_eq!(evolved.schema.version, version("1.1.0"));
}

#[test]
fn test_none_mode_accepts_breaking_changes_with_major_bump() {
    let original = registered(
        CompatibilityMode::None,
        r#"{"type":"object","properties":{"foo":{"type":"string"}}}"#,
    );
    let proposed = propose(&original, r#"{"type":"object","properties":{}}"#);

    let evolved = service().evolve(&original, &proposed).unwrap();

    assert_eq!(evolved.schema.version, version("2.0.0"));
}

#[test]
fn test_version_chain_across_evolutions() {
    let svc = service();
    let original = registered(CompatibilityMode::Forward, r#"{"type":"object"}"#);

    let formatted = svc
        .evolve(&original, &propose(&original, r#"{ "type": "object" }"#))
        .unwrap();
    assert_eq!(formatted.schema.version, version("1.0.1"));

    let extended = svc
        .evolve(
            &formatted,
            &propose(
                &formatted,
                r#"{"type":"object","properties":{"foo":{"type":"string"}}}"#,
            ),
        )
        .unwrap();
    assert_eq!(extended.schema.version, version("1.1.0"));

    let unchanged = svc
        .evolve(&extended, &extended.as_base())
        .unwrap();
    assert_eq!(unchanged.schema.version, version("1.1.0"));
    assert_eq!(unchanged.schema, extended.schema);

    assert_eq!(unchanged.created_at, original.created_at);
}

#[test]
fn test_owning_application_follows_proposed() {
    let original = registered(CompatibilityMode::Forward, r#"{"type":"object"}"#);
    let mut proposed = original.as_base();
    proposed.owning_application = Some("team-checkout".to_string());

    let evolved = service().evolve(&original, &proposed).unwrap();

    assert_eq!(evolved.owning_application.as_deref(), Some("team-checkout"));
}

// =============================================================================
// Compatibility Gates
// =============================================================================

#[test]
fn test_removed_property_rejected_under_forward() {
    let original = registered(
        CompatibilityMode::Forward,
        r#"{"type":"object","properties":{"foo":{"type":"string"}}}"#,
    );
    let proposed = propose(&original, r#"{"type":"object","properties":{}}"#);

    let err = service().evolve(&original, &proposed).unwrap_err();
    match err {
        EvolutionError::BreakingChanges { changes } => {
            assert_eq!(changes.len(), 1);
            assert_eq!(changes[0].change_type, ChangeType::PropertyRemoved);
            assert_eq!(changes[0].path, "#/properties/foo");
        }
        other => panic!("Expected BreakingChanges, got {:?}", other),
    }
}

#[test]
fn test_rejection_lists_only_breaking_changes() {
    let original = registered(
        CompatibilityMode::Forward,
        r#"{"type":"object","title":"Order","properties":{"foo":{"type":"string"}}}"#,
    );
    // Renames the title (patch) and changes a property type (major)
    let proposed = propose(
        &original,
        r#"{"type":"object","title":"Orders","properties":{"foo":{"type":"number"}}}"#,
    );

    let err = service().evolve(&original, &proposed).unwrap_err();
    let text = err.to_string();
    assert!(text.starts_with("Invalid schema: "), "{}", text);
    assert!(text.contains("#/properties/foo"), "{}", text);
    match err {
        EvolutionError::BreakingChanges { changes } => {
            assert_eq!(changes.len(), 1);
            assert_eq!(changes[0].change_type, ChangeType::TypeChanged);
        }
        other => panic!("Expected BreakingChanges, got {:?}", other),
    }
}

#[test]
fn test_required_extension_minor_under_forward() {
    let original = registered(
        CompatibilityMode::Forward,
        r#"{"type":"object","properties":{"a":{"type":"string"}},"required":["a"]}"#,
    );
    let proposed = propose(
        &original,
        r#"{"type":"object","properties":{"a":{"type":"string"},"b":{"type":"string"}},"required":["a","b"]}"#,
    );

    let evolved = service().evolve(&original, &proposed).unwrap();

    assert_eq!(evolved.schema.version, version("1.1.0"));
}

#[test]
fn test_required_extension_rejected_under_compatible() {
    let original = registered(
        CompatibilityMode::Compatible,
        r#"{"type":"object","properties":{"a":{"type":"string"}},"required":["a"]}"#,
    );
    let proposed = propose(
        &original,
        r#"{"type":"object","properties":{"a":{"type":"string"}},"required":["a","b"]}"#,
    );

    let err = service().evolve(&original, &proposed).unwrap_err();
    match err {
        EvolutionError::BreakingChanges { changes } => {
            assert_eq!(changes.len(), 1);
            assert_eq!(changes[0].change_type, ChangeType::RequiredArrayExtended);
        }
        other => panic!("Expected BreakingChanges, got {:?}", other),
    }
}

#[test]
fn test_additional_properties_narrowing_minor_under_forward() {
    let original = registered(CompatibilityMode::Forward, r#"{"type":"object"}"#);
    let proposed = propose(
        &original,
        r#"{"type":"object","additionalProperties":false}"#,
    );

    let evolved = service().evolve(&original, &proposed).unwrap();

    assert_eq!(evolved.schema.version, version("1.1.0"));
}

#[test]
fn test_malformed_proposed_schema_is_an_error() {
    let original = registered(CompatibilityMode::Forward, r#"{"type":"object"}"#);
    let proposed = propose(&original, "not a schema");

    let err = service().evolve(&original, &proposed).unwrap_err();
    assert!(matches!(err, EvolutionError::SchemaJson(_)));
}

// =============================================================================
// Constraint Rules
// =============================================================================

#[test]
fn test_name_change_rejected() {
    let original = registered(CompatibilityMode::Forward, r#"{"type":"object"}"#);
    let mut proposed = original.as_base();
    proposed.name = EventTypeName::new("order.updated").unwrap();

    let err = service().evolve(&original, &proposed).unwrap_err();
    assert_eq!(err.to_string(), "changing event type name is not allowed");
}

#[test]
fn test_mode_loosening_rejected() {
    let original = registered(CompatibilityMode::Compatible, r#"{"type":"object"}"#);
    let mut proposed = original.as_base();
    proposed.compatibility_mode = CompatibilityMode::Forward;

    let err = service().evolve(&original, &proposed).unwrap_err();
    assert_eq!(
        err.to_string(),
        "changing compatibility_mode is only allowed from 'forward' to 'compatible'"
    );
}

#[test]
fn test_multiple_constraint_firings_reported_together() {
    let original = registered(CompatibilityMode::Forward, r#"{"type":"object"}"#);
    let mut proposed = original.as_base();
    proposed.name = EventTypeName::new("order.updated").unwrap();
    proposed.enrichment_strategies = vec![EnrichmentStrategy::MetadataEnrichment];

    let err = service().evolve(&original, &proposed).unwrap_err();
    assert_eq!(
        err.to_string(),
        "changing event type name is not allowed; changing enrichment_strategies is not allowed"
    );
}

// =============================================================================
// Mode Migration (forward -> compatible)
// =============================================================================

#[test]
fn test_mode_upgrade_with_benign_changes() {
    let original = registered(CompatibilityMode::Forward, r#"{"type":"object"}"#);
    let mut proposed = propose(
        &original,
        r#"{"type":"object","properties":{"foo":{"type":"string"}}}"#,
    );
    proposed.compatibility_mode = CompatibilityMode::Compatible;

    let evolved = service().evolve(&original, &proposed).unwrap();

    assert_eq!(evolved.compatibility_mode, CompatibilityMode::Compatible);
    assert_eq!(evolved.schema.version, version("1.1.0"));
}

#[test]
fn test_mode_upgrade_with_breaking_changes_rejected() {
    let original = registered(
        CompatibilityMode::Forward,
        r#"{"type":"object","properties":{"foo":{"type":"string"}}}"#,
    );
    let mut proposed = propose(&original, r#"{"type":"object","properties":{}}"#);
    proposed.compatibility_mode = CompatibilityMode::Compatible;

    let err = service().evolve(&original, &proposed).unwrap_err();
    match err {
        EvolutionError::BreakingChanges { changes } => {
            assert_eq!(changes.len(), 1);
            assert_eq!(changes[0].change_type, ChangeType::PropertyRemoved);
        }
        other => panic!("Expected BreakingChanges, got {:?}", other),
    }
}

// =============================================================================
// Category Migration (undefined -> business)
// =============================================================================

#[test]
fn test_undefined_to_business_migration() {
    let original = registered(CompatibilityMode::Forward, r#"{"type":"object"}"#);
    let mut proposed = original.as_base();
    proposed.category = Category::Business;
    proposed.enrichment_strategies = vec![EnrichmentStrategy::MetadataEnrichment];

    let evolved = service().evolve(&original, &proposed).unwrap();

    assert_eq!(evolved.category, Category::Business);
    assert_eq!(
        evolved.enrichment_strategies,
        vec![EnrichmentStrategy::MetadataEnrichment]
    );
    // Identical schema text, so the snapshot is untouched
    assert_eq!(evolved.schema.version, version("1.0.0"));
}

#[test]
fn test_category_migration_requires_enrichment() {
    let original = registered(CompatibilityMode::Forward, r#"{"type":"object"}"#);
    let mut proposed = original.as_base();
    proposed.category = Category::Business;

    let err = service().evolve(&original, &proposed).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Category change is allowed only from 'undefined' to 'business'; the proposed event type must declare the 'metadata_enrichment' strategy"
    );
}

#[test]
fn test_category_migration_to_data_rejected() {
    let original = registered(CompatibilityMode::Forward, r#"{"type":"object"}"#);
    let mut proposed = original.as_base();
    proposed.category = Category::Data;
    proposed.enrichment_strategies = vec![EnrichmentStrategy::MetadataEnrichment];

    let err = service().evolve(&original, &proposed).unwrap_err();
    assert!(matches!(err, EvolutionError::CategoryChangeForbidden));
}

#[test]
fn test_category_migration_rejects_compatible_mode() {
    let original = registered(CompatibilityMode::Forward, r#"{"type":"object"}"#);
    let mut proposed = original.as_base();
    proposed.category = Category::Business;
    proposed.enrichment_strategies = vec![EnrichmentStrategy::MetadataEnrichment];
    proposed.compatibility_mode = CompatibilityMode::Compatible;

    let err = service().evolve(&original, &proposed).unwrap_err();
    assert!(matches!(err, EvolutionError::CategoryChangeForbidden));
}

// =============================================================================
// Meta-Schema Validation
// =============================================================================

#[test]
fn test_supported_schema_passes_meta_schema() {
    let document = json!({
        "type": "object",
        "title": "order",
        "properties": {
            "order_number": {"type": "string"},
            "status": {"type": "string", "enum": ["placed", "shipped"]}
        },
        "required": ["order_number"],
        "additionalProperties": false
    });
    assert!(service().collect_incompatibilities(&document).is_empty());
}

#[test]
fn test_unsupported_construct_reported_with_pointer() {
    let document = json!({
        "type": "object",
        "properties": {
            "foo": {"$ref": "#/definitions/foo"}
        }
    });
    let incompatibilities = service().collect_incompatibilities(&document);
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
fn test_meta_schema_override_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("permit-all.json");
    std::fs::write(&path, "{}").unwrap();

    let mut config = EvolutionConfig::default();
    config.metaschema.path = Some(path);

    let overridden = SchemaEvolutionService::from_config(&config).unwrap();
    let document = json!({"patternProperties": {"^x": {"type": "string"}}});

    assert!(overridden.collect_incompatibilities(&document).is_empty());
    assert!(!service().collect_incompatibilities(&document).is_empty());
}
