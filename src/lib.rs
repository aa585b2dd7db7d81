//! Freshet Schema Governance
//!
//! The schema-evolution core of the Freshet event broker: decides whether a
//! proposed change to an event type's JSON Schema is legal under the type's
//! declared compatibility contract and, if legal, computes the next semantic
//! version.
//!
//! ## Features
//!
//! - **Structural Diffing**: typed, path-tagged change lists between schema documents
//! - **Mode-Aware Severity**: the same change can be breaking or benign depending on the contract
//! - **Constraint Rules**: categorical checks beyond the schema (identity, category, enrichment)
//! - **Meta-Schema Validation**: candidate schemas are held to the broker's supported subset
//! - **Semantic Versioning**: accepted evolutions bump major/minor/patch deterministically
//!
//! ## Architecture
//!
//! ```text
//! evolve(original, proposed)
//! ├── constraints   name / category / mode / enrichment rules
//! ├── diff          original schema vs proposed schema -> [SchemaChange]
//! ├── classify      change x compatibility mode -> level, folded to most severe
//! ├── gate          forward->compatible allow-list, major-change rejection
//! └── bump          new EventTypeSchema at the bumped version (or snapshot reuse)
//! ```

pub mod change;
pub mod config;
pub mod constraints;
pub mod diff;
pub mod error;
pub mod event_type;
pub mod evolution;
pub mod fingerprint;
pub mod metaschema;
pub mod version;

pub use change::{ChangeType, SchemaChange};
pub use config::EvolutionConfig;
pub use constraints::{
    default_constraints, EvolutionConstraint, EvolutionIncompatibility, IncompatibilityKind,
};
pub use diff::{SchemaDiff, SchemaDiffer};
pub use error::{EvolutionError, Result};
pub use event_type::{
    Category, CompatibilityMode, EnrichmentStrategy, EventType, EventTypeBase, EventTypeName,
    EventTypeSchema, SchemaBase, SchemaType,
};
pub use evolution::SchemaEvolutionService;
pub use fingerprint::Fingerprint;
pub use metaschema::{MetaSchemaValidator, SchemaIncompatibility};
pub use version::{ChangeLevel, SchemaVersion};
