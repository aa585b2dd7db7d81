//! Event type definitions and schema snapshots
//!
//! An [`EventType`] is the broker-side contract for a topic: a validated
//! name, governance policies (category, compatibility mode, enrichment
//! strategies) and the current versioned schema snapshot. Change requests
//! arrive as an [`EventTypeBase`], the same definition without version or
//! timestamps; the evolution service turns an accepted base into the next
//! [`EventType`] value.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::error::{EvolutionError, Result};
use crate::fingerprint::Fingerprint;
use crate::version::SchemaVersion;

static NAME_REGEX: OnceLock<Regex> = OnceLock::new();

fn name_regex() -> &'static Regex {
    NAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z][-0-9a-zA-Z_]*(\.[0-9a-zA-Z][-0-9a-zA-Z_]*)*$").unwrap()
    })
}

/// Validated event type name.
///
/// Names are dot-separated segments of word characters and dashes, starting
/// with a letter, e.g. `order.ORDER_RECEIVED` or `shop.updated-items`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventTypeName(String);

impl EventTypeName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name_regex().is_match(&name) {
            Ok(Self(name))
        } else {
            Err(EvolutionError::InvalidName(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EventTypeName {
    type Error = EvolutionError;

    fn try_from(name: String) -> Result<Self> {
        Self::new(name)
    }
}

impl From<EventTypeName> for String {
    fn from(name: EventTypeName) -> Self {
        name.0
    }
}

impl fmt::Display for EventTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category of an event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Free-form events with no enforced envelope
    Undefined,
    /// Business process events, enriched with broker metadata
    Business,
    /// Data change events (create/update/delete/snapshot)
    Data,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Undefined => "undefined",
            Category::Business => "business",
            Category::Data => "data",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Undefined
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compatibility contract governing schema evolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompatibilityMode {
    /// No structural enforcement
    None,
    /// Producers stay compatible; consumer-facing loosening allowed
    Forward,
    /// Strictest contract; no breaking change is ever accepted
    Compatible,
}

impl CompatibilityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompatibilityMode::None => "none",
            CompatibilityMode::Forward => "forward",
            CompatibilityMode::Compatible => "compatible",
        }
    }
}

impl Default for CompatibilityMode {
    fn default() -> Self {
        CompatibilityMode::Forward
    }
}

impl fmt::Display for CompatibilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Enrichment applied to events during publishing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStrategy {
    /// Inject broker metadata (eid, occurred_at, ...) into each event
    MetadataEnrichment,
}

/// Format of the schema document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaType {
    /// JSON Schema definitions
    JsonSchema,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::JsonSchema => "json_schema",
        }
    }
}

/// An unversioned schema document, as submitted by clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaBase {
    /// Format of the document
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    /// The schema document text
    pub schema: String,
}

impl SchemaBase {
    /// Create a JSON Schema definition from document text
    pub fn json_schema(schema: impl Into<String>) -> Self {
        Self {
            schema_type: SchemaType::JsonSchema,
            schema: schema.into(),
        }
    }

    /// Parse the schema text into a JSON document
    pub fn document(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.schema)?)
    }
}

/// A versioned schema snapshot owned by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeSchema {
    /// Format of the document
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    /// The schema document text
    pub schema: String,
    /// Version of this snapshot
    pub version: SchemaVersion,
    /// When this snapshot was created
    pub created_at: DateTime<Utc>,
}

impl EventTypeSchema {
    /// Create a snapshot from a submitted definition
    pub fn new(base: SchemaBase, version: SchemaVersion, created_at: DateTime<Utc>) -> Self {
        Self {
            schema_type: base.schema_type,
            schema: base.schema,
            version,
            created_at,
        }
    }

    /// The unversioned view of this snapshot
    pub fn to_base(&self) -> SchemaBase {
        SchemaBase {
            schema_type: self.schema_type,
            schema: self.schema.clone(),
        }
    }

    /// Parse the schema text into a JSON document
    pub fn document(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.schema)?)
    }

    /// Fingerprint of the raw schema text
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_text(&self.schema)
    }
}

/// A proposed event type definition, before versioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeBase {
    /// Unique name of the event type
    pub name: EventTypeName,
    /// Application owning this event type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owning_application: Option<String>,
    /// Category of the event type
    #[serde(default)]
    pub category: Category,
    /// Enrichments applied during publishing
    #[serde(default)]
    pub enrichment_strategies: Vec<EnrichmentStrategy>,
    /// Evolution contract for the schema
    #[serde(default)]
    pub compatibility_mode: CompatibilityMode,
    /// The schema definition
    pub schema: SchemaBase,
}

impl EventTypeBase {
    /// Create a definition with the given policies
    pub fn new(
        name: EventTypeName,
        category: Category,
        compatibility_mode: CompatibilityMode,
        schema: SchemaBase,
    ) -> Self {
        Self {
            name,
            owning_application: None,
            category,
            enrichment_strategies: Vec::new(),
            compatibility_mode,
            schema,
        }
    }
}

/// A registered event type with its current schema snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventType {
    /// Unique name of the event type
    pub name: EventTypeName,
    /// Application owning this event type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owning_application: Option<String>,
    /// Category of the event type
    #[serde(default)]
    pub category: Category,
    /// Enrichments applied during publishing
    #[serde(default)]
    pub enrichment_strategies: Vec<EnrichmentStrategy>,
    /// Evolution contract for the schema
    #[serde(default)]
    pub compatibility_mode: CompatibilityMode,
    /// Current schema snapshot
    pub schema: EventTypeSchema,
    /// When the event type was first registered
    pub created_at: DateTime<Utc>,
    /// When the event type was last updated
    pub updated_at: DateTime<Utc>,
}

impl EventType {
    /// Register a new event type at the initial schema version
    pub fn create(base: EventTypeBase, now: DateTime<Utc>) -> Self {
        let schema = EventTypeSchema::new(base.schema.clone(), SchemaVersion::initial(), now);
        Self::from_base(base, schema, now, now)
    }

    /// Assemble an event type from an accepted definition and a versioned
    /// snapshot. The definition's unversioned schema is superseded by the
    /// snapshot.
    pub fn from_base(
        base: EventTypeBase,
        schema: EventTypeSchema,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: base.name,
            owning_application: base.owning_application,
            category: base.category,
            enrichment_strategies: base.enrichment_strategies,
            compatibility_mode: base.compatibility_mode,
            schema,
            created_at,
            updated_at,
        }
    }

    /// The definition view of this event type (no version or timestamps)
    pub fn as_base(&self) -> EventTypeBase {
        EventTypeBase {
            name: self.name.clone(),
            owning_application: self.owning_application.clone(),
            category: self.category,
            enrichment_strategies: self.enrichment_strategies.clone(),
            compatibility_mode: self.compatibility_mode,
            schema: self.schema.to_base(),
        }
    }
}
