//! Schema evolution orchestration
//!
//! [`SchemaEvolutionService`] is the public contract of the crate: given a
//! registered event type and a proposed definition, it either returns the
//! next event type value with a correctly bumped schema version or rejects
//! the transition with a structured reason. Each call is a pure decision over
//! its inputs; the service holds only immutable collaborators and can be
//! shared freely across threads.

use chrono::Utc;
use serde_json::Value;

use crate::change::{ChangeType, SchemaChange};
use crate::config::EvolutionConfig;
use crate::constraints::{
    default_constraints, EvolutionConstraint, EvolutionIncompatibility, IncompatibilityKind,
};
use crate::diff::{SchemaDiff, SchemaDiffer};
use crate::error::{EvolutionError, Result};
use crate::event_type::{
    Category, CompatibilityMode, EnrichmentStrategy, EventType, EventTypeBase, EventTypeSchema,
};
use crate::fingerprint::Fingerprint;
use crate::metaschema::{MetaSchemaValidator, SchemaIncompatibility};
use crate::version::ChangeLevel;

/// Changes a forward-compatible event type may carry while tightening its
/// contract to compatible
const FORWARD_TO_COMPATIBLE_ALLOWED_CHANGES: &[ChangeType] = &[
    ChangeType::DescriptionChanged,
    ChangeType::TitleChanged,
    ChangeType::PropertiesAdded,
    ChangeType::RequiredArrayExtended,
    ChangeType::AdditionalPropertiesChanged,
    ChangeType::AdditionalItemsChanged,
];

/// Decides whether schema transitions are legal and computes version bumps
pub struct SchemaEvolutionService {
    meta_schema: MetaSchemaValidator,
    constraints: Vec<Box<dyn EvolutionConstraint>>,
    differ: Box<dyn SchemaDiffer>,
}

impl SchemaEvolutionService {
    /// Service with the embedded meta-schema, standard constraints and the
    /// bundled differ
    pub fn new() -> Result<Self> {
        Ok(Self::with_components(
            MetaSchemaValidator::embedded()?,
            default_constraints(),
            Box::new(SchemaDiff),
        ))
    }

    /// Service configured from file/environment settings
    pub fn from_config(config: &EvolutionConfig) -> Result<Self> {
        let meta_schema = match config.metaschema_path() {
            Some(path) => MetaSchemaValidator::from_file(&path)?,
            None => MetaSchemaValidator::embedded()?,
        };
        Ok(Self::with_components(
            meta_schema,
            default_constraints(),
            Box::new(SchemaDiff),
        ))
    }

    /// Service with explicit collaborators
    pub fn with_components(
        meta_schema: MetaSchemaValidator,
        constraints: Vec<Box<dyn EvolutionConstraint>>,
        differ: Box<dyn SchemaDiffer>,
    ) -> Self {
        Self {
            meta_schema,
            constraints,
            differ,
        }
    }

    /// Validate a candidate schema document against the broker meta-schema
    pub fn collect_incompatibilities(&self, schema: &Value) -> Vec<SchemaIncompatibility> {
        self.meta_schema.collect_incompatibilities(schema)
    }

    /// Decide whether `proposed` is a legal evolution of `original` and, if
    /// so, produce the next event type value.
    ///
    /// The original is never mutated; on success the result carries the
    /// proposed definition, the original registration time, a fresh update
    /// time and either the untouched original schema snapshot (when nothing
    /// changed) or a new snapshot at the bumped version.
    pub fn evolve(&self, original: &EventType, proposed: &EventTypeBase) -> Result<EventType> {
        self.check_constraints(original, proposed)?;

        let original_document = original.schema.document()?;
        let proposed_document = proposed.schema.document()?;
        let changes = self
            .differ
            .collect_changes(&original_document, &proposed_document);

        let level = semantic_of_change(
            &original.schema.schema,
            &proposed.schema.schema,
            &changes,
            original.compatibility_mode,
        );

        if is_forward_to_compatible_upgrade(original, proposed) {
            validate_mode_migration(&changes)?;
        } else if original.compatibility_mode != CompatibilityMode::None {
            validate_compatible_changes(original.compatibility_mode, &changes, level)?;
        }

        let fingerprint = Fingerprint::of_text(&proposed.schema.schema);
        tracing::debug!(
            event_type = %original.name,
            level = %level,
            changes = changes.len(),
            fingerprint = %fingerprint.short(),
            "schema evolution accepted"
        );
        Ok(self.bump_version(original, proposed, level))
    }

    fn check_constraints(&self, original: &EventType, proposed: &EventTypeBase) -> Result<()> {
        let incompatibilities: Vec<EvolutionIncompatibility> = self
            .constraints
            .iter()
            .filter_map(|constraint| constraint.validate(original, proposed))
            .collect();
        if incompatibilities.is_empty() {
            return Ok(());
        }

        let category_changed = incompatibilities
            .iter()
            .any(|i| i.kind() == IncompatibilityKind::Category);
        if category_changed {
            if category_migration_waived(&incompatibilities, original, proposed) {
                tracing::debug!(
                    event_type = %original.name,
                    "category incompatibility waived for undefined to business migration"
                );
                return Ok(());
            }
            tracing::debug!(event_type = %original.name, "rejected category change");
            return Err(EvolutionError::CategoryChangeForbidden);
        }

        tracing::debug!(
            event_type = %original.name,
            firings = incompatibilities.len(),
            "rejected by evolution constraints"
        );
        Err(EvolutionError::Incompatible {
            reasons: incompatibilities
                .into_iter()
                .map(EvolutionIncompatibility::into_reason)
                .collect(),
        })
    }

    fn bump_version(
        &self,
        original: &EventType,
        proposed: &EventTypeBase,
        level: ChangeLevel,
    ) -> EventType {
        let now = Utc::now();
        let schema = if level == ChangeLevel::NoChanges {
            original.schema.clone()
        } else {
            let version = original.schema.version.bump(level);
            EventTypeSchema::new(proposed.schema.clone(), version, now)
        };
        EventType::from_base(proposed.clone(), schema, original.created_at, now)
    }
}

/// The single sanctioned constraint waiver: an undefined event type may move
/// into the business category when it declares metadata enrichment and does
/// not claim compatible mode. Only the category firing, plus the enrichment
/// firing that migration entails, may be present.
fn category_migration_waived(
    incompatibilities: &[EvolutionIncompatibility],
    original: &EventType,
    proposed: &EventTypeBase,
) -> bool {
    let metadata_changed = incompatibilities
        .iter()
        .any(|i| i.kind() == IncompatibilityKind::Metadata);
    let expected_firings = 1 + usize::from(metadata_changed);

    incompatibilities.len() == expected_firings
        && original.category == Category::Undefined
        && proposed.category == Category::Business
        && proposed
            .enrichment_strategies
            .contains(&EnrichmentStrategy::MetadataEnrichment)
        && proposed.compatibility_mode != CompatibilityMode::Compatible
}

fn is_forward_to_compatible_upgrade(original: &EventType, proposed: &EventTypeBase) -> bool {
    original.compatibility_mode == CompatibilityMode::Forward
        && proposed.compatibility_mode == CompatibilityMode::Compatible
}

/// Severity of the whole transition under the original compatibility mode.
///
/// A textual edit with no structural changes still warrants a patch bump so
/// the stored schema text follows what clients submitted.
fn semantic_of_change(
    original_text: &str,
    proposed_text: &str,
    changes: &[SchemaChange],
    mode: CompatibilityMode,
) -> ChangeLevel {
    if changes.is_empty() && original_text != proposed_text {
        return ChangeLevel::Patch;
    }
    changes
        .iter()
        .map(|change| change.change_type.level(mode))
        .fold(ChangeLevel::NoChanges, ChangeLevel::most_severe)
}

/// Tightening forward to compatible is only sound when every change since
/// registration-time semantics is consumer-safe
fn validate_mode_migration(changes: &[SchemaChange]) -> Result<()> {
    let forbidden: Vec<SchemaChange> = changes
        .iter()
        .filter(|change| !FORWARD_TO_COMPATIBLE_ALLOWED_CHANGES.contains(&change.change_type))
        .cloned()
        .collect();
    if forbidden.is_empty() {
        Ok(())
    } else {
        Err(EvolutionError::BreakingChanges { changes: forbidden })
    }
}

fn validate_compatible_changes(
    mode: CompatibilityMode,
    changes: &[SchemaChange],
    level: ChangeLevel,
) -> Result<()> {
    let guarded = mode == CompatibilityMode::Compatible || mode == CompatibilityMode::Forward;
    if guarded && level == ChangeLevel::Major {
        let breaking: Vec<SchemaChange> = changes
            .iter()
            .filter(|change| change.change_type.level(mode) == ChangeLevel::Major)
            .cloned()
            .collect();
        return Err(EvolutionError::BreakingChanges { changes: breaking });
    }
    Ok(())
}
