//! Structural diffing of JSON Schema documents
//!
//! [`SchemaDiff`] walks two parsed schema documents in lockstep and reports
//! every structural delta as a typed [`SchemaChange`] with a JSON pointer to
//! the changed node. The walk is policy-free: it only states what changed,
//! never whether the change is acceptable. Severity is resolved separately
//! against the event type's compatibility mode.
//!
//! Node-level kinds (`TypeChanged`, `IdChanged`, removals) are reported at
//! the schema node's own path; keyword-level kinds are reported under the
//! keyword's path segment (`#/required`, `#/enum`, ...). Equal subtrees are
//! pruned without descent, so identical documents produce an empty list.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::change::{ChangeType, SchemaChange};

/// The structural differ consumed by the evolution service.
///
/// Implementations must be deterministic and total: any two syntactically
/// valid documents yield a defined change list, in a stable order.
pub trait SchemaDiffer: Send + Sync {
    fn collect_changes(&self, original: &Value, proposed: &Value) -> Vec<SchemaChange>;
}

/// Bundled differ covering the broker's supported JSON Schema subset
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaDiff;

impl SchemaDiffer for SchemaDiff {
    fn collect_changes(&self, original: &Value, proposed: &Value) -> Vec<SchemaChange> {
        let mut state = DiffState::new();
        diff_schema(original, proposed, &mut state);
        state.changes
    }
}

/// Scalar validation keywords compared by value equality
const SCALAR_ATTRIBUTES: &[&str] = &[
    "default",
    "exclusiveMaximum",
    "exclusiveMinimum",
    "format",
    "maxItems",
    "maxLength",
    "maxProperties",
    "maximum",
    "minItems",
    "minLength",
    "minProperties",
    "minimum",
    "multipleOf",
    "pattern",
    "uniqueItems",
];

const COMPOSITION_KEYWORDS: &[&str] = &["allOf", "anyOf", "oneOf"];

/// Absent `additionalProperties`/`additionalItems` means "permit everything"
static PERMIT_ALL: Value = Value::Bool(true);

struct DiffState {
    path: Vec<String>,
    changes: Vec<SchemaChange>,
}

impl DiffState {
    fn new() -> Self {
        Self {
            path: Vec::new(),
            changes: Vec::new(),
        }
    }

    fn add(&mut self, change_type: ChangeType) {
        let path = self.json_pointer();
        self.changes.push(SchemaChange::new(change_type, path));
    }

    fn json_pointer(&self) -> String {
        if self.path.is_empty() {
            "#".to_string()
        } else {
            format!("#/{}", self.path.join("/"))
        }
    }

    fn descend<F>(&mut self, segment: &str, f: F)
    where
        F: FnOnce(&mut Self),
    {
        self.path.push(segment.to_string());
        f(self);
        self.path.pop();
    }
}

fn diff_schema(original: &Value, proposed: &Value, state: &mut DiffState) {
    if original == proposed {
        return;
    }
    match (original, proposed) {
        (Value::Object(original), Value::Object(proposed)) => {
            diff_objects(original, proposed, state)
        }
        // Boolean schemas and malformed nodes: any shape change is a type change
        _ => state.add(ChangeType::TypeChanged),
    }
}

fn diff_objects(original: &Map<String, Value>, proposed: &Map<String, Value>, state: &mut DiffState) {
    if original.get("$ref") != proposed.get("$ref") {
        // A retargeted reference changes the whole subtree; nothing below is comparable
        state.descend("$ref", |s| s.add(ChangeType::SubSchemaChanged));
        return;
    }
    if id_of(original) != id_of(proposed) {
        state.add(ChangeType::IdChanged);
    }
    if original.get("type") != proposed.get("type") {
        // Different type class; deeper keyword comparison is meaningless
        state.add(ChangeType::TypeChanged);
        return;
    }

    diff_string_keyword(original, proposed, "title", ChangeType::TitleChanged, state);
    diff_string_keyword(
        original,
        proposed,
        "description",
        ChangeType::DescriptionChanged,
        state,
    );
    diff_scalar_attributes(original, proposed, state);
    diff_enum(original, proposed, state);
    diff_composition(original, proposed, state);
    diff_properties(original, proposed, state);
    diff_required(original, proposed, state);
    diff_additional(
        original,
        proposed,
        "additionalProperties",
        ChangeType::AdditionalPropertiesChanged,
        state,
    );
    diff_additional(
        original,
        proposed,
        "additionalItems",
        ChangeType::AdditionalItemsChanged,
        state,
    );
    diff_items(original, proposed, state);
    diff_dependencies(original, proposed, state);
}

fn id_of<'a>(schema: &'a Map<String, Value>) -> Option<&'a Value> {
    schema.get("$id").or_else(|| schema.get("id"))
}

fn diff_string_keyword(
    original: &Map<String, Value>,
    proposed: &Map<String, Value>,
    keyword: &str,
    change_type: ChangeType,
    state: &mut DiffState,
) {
    if original.get(keyword) != proposed.get(keyword) {
        state.descend(keyword, |s| s.add(change_type));
    }
}

fn diff_scalar_attributes(
    original: &Map<String, Value>,
    proposed: &Map<String, Value>,
    state: &mut DiffState,
) {
    for keyword in SCALAR_ATTRIBUTES {
        if original.get(*keyword) != proposed.get(*keyword) {
            state.descend(keyword, |s| s.add(ChangeType::AttributeValueChanged));
        }
    }
}

fn diff_enum(original: &Map<String, Value>, proposed: &Map<String, Value>, state: &mut DiffState) {
    let original_enum = original.get("enum");
    let proposed_enum = proposed.get("enum");
    match (original_enum, proposed_enum) {
        (None, None) => {}
        (Some(a), Some(b)) => {
            if enum_changed(a, b) {
                state.descend("enum", |s| s.add(ChangeType::EnumArrayChanged));
            }
        }
        _ => state.descend("enum", |s| s.add(ChangeType::EnumArrayChanged)),
    }
}

/// Enum arrays are compared as sets; reordering variants is not a change
fn enum_changed(original: &Value, proposed: &Value) -> bool {
    match (original.as_array(), proposed.as_array()) {
        (Some(a), Some(b)) => {
            let a: BTreeSet<String> = a.iter().map(|v| v.to_string()).collect();
            let b: BTreeSet<String> = b.iter().map(|v| v.to_string()).collect();
            a != b
        }
        _ => original != proposed,
    }
}

fn diff_composition(
    original: &Map<String, Value>,
    proposed: &Map<String, Value>,
    state: &mut DiffState,
) {
    let original_methods: Vec<&str> = COMPOSITION_KEYWORDS
        .iter()
        .copied()
        .filter(|kw| original.contains_key(*kw))
        .collect();
    let proposed_methods: Vec<&str> = COMPOSITION_KEYWORDS
        .iter()
        .copied()
        .filter(|kw| proposed.contains_key(*kw))
        .collect();
    if original_methods != proposed_methods {
        state.add(ChangeType::CompositionMethodChanged);
        return;
    }

    for keyword in original_methods {
        let original_branches = original.get(keyword).and_then(Value::as_array);
        let proposed_branches = proposed.get(keyword).and_then(Value::as_array);
        match (original_branches, proposed_branches) {
            (Some(a), Some(b)) => {
                if a.len() != b.len() {
                    state.descend(keyword, |s| s.add(ChangeType::SubSchemaChanged));
                } else {
                    state.descend(keyword, |state| {
                        for (index, (a_branch, b_branch)) in a.iter().zip(b).enumerate() {
                            state.descend(&index.to_string(), |s| {
                                diff_schema(a_branch, b_branch, s)
                            });
                        }
                    });
                }
            }
            _ => {
                if original.get(keyword) != proposed.get(keyword) {
                    state.descend(keyword, |s| s.add(ChangeType::SubSchemaChanged));
                }
            }
        }
    }
}

fn diff_properties(
    original: &Map<String, Value>,
    proposed: &Map<String, Value>,
    state: &mut DiffState,
) {
    let empty = Map::new();
    let original_props = original
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let proposed_props = proposed
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    if original_props.is_empty() && proposed_props.is_empty() {
        return;
    }

    state.descend("properties", |state| {
        for (key, original_schema) in original_props {
            match proposed_props.get(key) {
                Some(proposed_schema) => state.descend(key, |s| {
                    diff_schema(original_schema, proposed_schema, s)
                }),
                None => state.descend(key, |s| s.add(ChangeType::PropertyRemoved)),
            }
        }
        for key in proposed_props.keys() {
            if !original_props.contains_key(key) {
                state.descend(key, |s| s.add(ChangeType::PropertiesAdded));
            }
        }
    });
}

fn diff_required(
    original: &Map<String, Value>,
    proposed: &Map<String, Value>,
    state: &mut DiffState,
) {
    let original_required = string_set(original.get("required"));
    let proposed_required = string_set(proposed.get("required"));
    if original_required == proposed_required {
        return;
    }
    let change = if proposed_required.is_superset(&original_required) {
        ChangeType::RequiredArrayExtended
    } else {
        ChangeType::RequiredArrayChanged
    };
    state.descend("required", |s| s.add(change));
}

fn string_set(value: Option<&Value>) -> BTreeSet<String> {
    value
        .and_then(Value::as_array)
        .map(|array| {
            array
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn diff_additional(
    original: &Map<String, Value>,
    proposed: &Map<String, Value>,
    keyword: &str,
    change_type: ChangeType,
    state: &mut DiffState,
) {
    let original_value = original.get(keyword).unwrap_or(&PERMIT_ALL);
    let proposed_value = proposed.get(keyword).unwrap_or(&PERMIT_ALL);
    if original_value == proposed_value {
        return;
    }
    match (original_value, proposed_value) {
        (Value::Object(a), Value::Object(b)) => {
            state.descend(keyword, |s| diff_objects(a, b, s));
        }
        _ => state.descend(keyword, |s| s.add(change_type)),
    }
}

fn diff_items(original: &Map<String, Value>, proposed: &Map<String, Value>, state: &mut DiffState) {
    let original_items = original.get("items");
    let proposed_items = proposed.get("items");
    if original_items == proposed_items {
        return;
    }
    state.descend("items", |state| match (original_items, proposed_items) {
        (Some(Value::Array(a)), Some(Value::Array(b))) => {
            if a.len() != b.len() {
                state.add(ChangeType::NumberOfItemsChanged);
            } else {
                for (index, (a_item, b_item)) in a.iter().zip(b).enumerate() {
                    state.descend(&index.to_string(), |s| diff_schema(a_item, b_item, s));
                }
            }
        }
        (Some(a @ Value::Object(_)), Some(b @ Value::Object(_))) => diff_schema(a, b, state),
        (Some(_), None) => state.add(ChangeType::SchemaRemoved),
        (None, Some(_)) => state.add(ChangeType::SubSchemaChanged),
        // Tuple form swapped with single-schema form
        _ => state.add(ChangeType::NumberOfItemsChanged),
    });
}

fn diff_dependencies(
    original: &Map<String, Value>,
    proposed: &Map<String, Value>,
    state: &mut DiffState,
) {
    let empty = Map::new();
    let original_deps = original
        .get("dependencies")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let proposed_deps = proposed
        .get("dependencies")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    if original_deps.is_empty() && proposed_deps.is_empty() {
        return;
    }

    state.descend("dependencies", |state| {
        for (key, original_dep) in original_deps {
            match proposed_deps.get(key) {
                Some(proposed_dep) => {
                    state.descend(key, |s| diff_dependency(original_dep, proposed_dep, s))
                }
                None => {
                    let change = if original_dep.is_array() {
                        ChangeType::DependencyArrayChanged
                    } else {
                        ChangeType::DependencySchemaRemoved
                    };
                    state.descend(key, |s| s.add(change));
                }
            }
        }
        for (key, proposed_dep) in proposed_deps {
            if !original_deps.contains_key(key) {
                let change = if proposed_dep.is_array() {
                    ChangeType::DependencyArrayChanged
                } else {
                    ChangeType::DependencySchemaChanged
                };
                state.descend(key, |s| s.add(change));
            }
        }
    });
}

fn diff_dependency(original: &Value, proposed: &Value, state: &mut DiffState) {
    if original == proposed {
        return;
    }
    match (original, proposed) {
        (Value::Array(_), Value::Array(_)) => {
            // Property dependencies are order-insensitive name sets
            if string_set(Some(original)) != string_set(Some(proposed)) {
                state.add(ChangeType::DependencyArrayChanged);
            }
        }
        (Value::Object(a), Value::Object(b)) => diff_objects(a, b, state),
        _ => state.add(ChangeType::DependencySchemaChanged),
    }
}
