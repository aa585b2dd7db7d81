//! Evolution constraints on event type definitions
//!
//! Constraints guard the parts of an event type that structural schema
//! diffing cannot see: identity, category, compatibility mode, enrichment.
//! Each rule is independent and pure; the evolution service runs all of them
//! and collects every firing, so a client sees the full list of problems at
//! once rather than one per request.

use serde::{Deserialize, Serialize};

use crate::event_type::{CompatibilityMode, EventType, EventTypeBase};

/// Which categorical rule produced an incompatibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompatibilityKind {
    /// A rule with no special handling
    General,
    /// The category rule; waivable for the one sanctioned migration
    Category,
    /// The enrichment rule; may accompany a waived category change
    Metadata,
}

/// A categorical incompatibility between two event type definitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionIncompatibility {
    kind: IncompatibilityKind,
    reason: String,
}

impl EvolutionIncompatibility {
    pub fn general(reason: impl Into<String>) -> Self {
        Self {
            kind: IncompatibilityKind::General,
            reason: reason.into(),
        }
    }

    pub fn category(reason: impl Into<String>) -> Self {
        Self {
            kind: IncompatibilityKind::Category,
            reason: reason.into(),
        }
    }

    pub fn metadata(reason: impl Into<String>) -> Self {
        Self {
            kind: IncompatibilityKind::Metadata,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> IncompatibilityKind {
        self.kind
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn into_reason(self) -> String {
        self.reason
    }
}

/// One rule checked when an event type definition is updated.
///
/// Implementations inspect the registered event type and the proposed
/// definition; `None` means the rule is satisfied.
pub trait EvolutionConstraint: Send + Sync {
    fn validate(
        &self,
        original: &EventType,
        proposed: &EventTypeBase,
    ) -> Option<EvolutionIncompatibility>;
}

/// Event type names are immutable
pub struct NameChangeConstraint;

impl EvolutionConstraint for NameChangeConstraint {
    fn validate(
        &self,
        original: &EventType,
        proposed: &EventTypeBase,
    ) -> Option<EvolutionIncompatibility> {
        if original.name != proposed.name {
            Some(EvolutionIncompatibility::general(
                "changing event type name is not allowed",
            ))
        } else {
            None
        }
    }
}

/// Categories are immutable; the evolution service may waive this firing for
/// the single sanctioned migration
pub struct CategoryChangeConstraint;

impl EvolutionConstraint for CategoryChangeConstraint {
    fn validate(
        &self,
        original: &EventType,
        proposed: &EventTypeBase,
    ) -> Option<EvolutionIncompatibility> {
        if original.category != proposed.category {
            Some(EvolutionIncompatibility::category(
                "changing category is not allowed",
            ))
        } else {
            None
        }
    }
}

/// The compatibility contract may only ever tighten from forward to compatible
pub struct CompatibilityModeChangeConstraint;

impl EvolutionConstraint for CompatibilityModeChangeConstraint {
    fn validate(
        &self,
        original: &EventType,
        proposed: &EventTypeBase,
    ) -> Option<EvolutionIncompatibility> {
        if original.compatibility_mode == proposed.compatibility_mode {
            return None;
        }
        let tightening = original.compatibility_mode == CompatibilityMode::Forward
            && proposed.compatibility_mode == CompatibilityMode::Compatible;
        if tightening {
            None
        } else {
            Some(EvolutionIncompatibility::general(
                "changing compatibility_mode is only allowed from 'forward' to 'compatible'",
            ))
        }
    }
}

/// Enrichment strategies are fixed at registration time
pub struct EnrichmentStrategyConstraint;

impl EvolutionConstraint for EnrichmentStrategyConstraint {
    fn validate(
        &self,
        original: &EventType,
        proposed: &EventTypeBase,
    ) -> Option<EvolutionIncompatibility> {
        if original.enrichment_strategies != proposed.enrichment_strategies {
            Some(EvolutionIncompatibility::metadata(
                "changing enrichment_strategies is not allowed",
            ))
        } else {
            None
        }
    }
}

/// The standard rule set applied to every evolution
pub fn default_constraints() -> Vec<Box<dyn EvolutionConstraint>> {
    vec![
        Box::new(NameChangeConstraint),
        Box::new(CategoryChangeConstraint),
        Box::new(CompatibilityModeChangeConstraint),
        Box::new(EnrichmentStrategyConstraint),
    ]
}
