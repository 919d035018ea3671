//! Record canonicalization: unique id, full text and index text

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use crate::types::CanonicalEntry;

/// Read access to a record from an external source
pub trait Record {
    /// Non-empty, trimmed string form of a field
    fn field(&self, name: &str) -> Option<String>;

    /// Lossless serialization of the whole record
    fn to_full_text(&self) -> String;
}

impl Record for Map<String, Value> {
    fn field(&self, name: &str) -> Option<String> {
        self.get(name).and_then(value_text)
    }

    fn to_full_text(&self) -> String {
        // BTreeMap for sorted keys regardless of serde_json's map backing
        let sorted: BTreeMap<&String, &Value> = self.iter().collect();
        serde_json::to_string_pretty(&sorted).unwrap_or_default()
    }
}

impl Record for Value {
    fn field(&self, name: &str) -> Option<String> {
        match self {
            Value::Object(map) => map.field(name),
            _ => None,
        }
    }

    fn to_full_text(&self) -> String {
        match self {
            Value::Object(map) => map.to_full_text(),
            other => serde_json::to_string_pretty(other).unwrap_or_default(),
        }
    }
}

impl Record for HashMap<String, String> {
    fn field(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| non_blank(v))
    }

    fn to_full_text(&self) -> String {
        let sorted: BTreeMap<&String, &String> = self.iter().collect();
        serde_json::to_string_pretty(&sorted).unwrap_or_default()
    }
}

impl Record for BTreeMap<String, String> {
    fn field(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| non_blank(v))
    }

    fn to_full_text(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => non_blank(s),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => {
            let compact = value.to_string();
            match compact.as_str() {
                "[]" | "{}" => None,
                _ => Some(compact),
            }
        }
    }
}

/// A labelled group of candidate fields; the first non-empty one is used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldGroup {
    pub label: &'static str,
    pub fields: &'static [&'static str],
}

/// Ordered field lists driving id and index-text derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSchema {
    /// Candidate id fields, in priority order
    pub id_fields: &'static [&'static str],
    /// Prefix for synthesized ids
    pub id_prefix: &'static str,
    /// Index-text groups, in output order
    pub groups: &'static [FieldGroup],
}

const PROCUREMENT_ID_FIELDS: &[&str] = &[
    "codigo_de_secop",
    "numero_del_proceso",
    "referencia_del_contrato",
    "id_contrato",
];

const PROCUREMENT_GROUPS: &[FieldGroup] = &[
    FieldGroup {
        label: "Departamento",
        fields: &["departamento", "departamento_entidad", "departamento_ejecucion"],
    },
    FieldGroup {
        label: "Descripción",
        fields: &["descripcion_del_proceso"],
    },
    FieldGroup {
        label: "Objeto",
        fields: &[
            "objeto_del_contrato",
            "objeto_a_contratar",
            "detalle_del_objeto_a_contratar",
        ],
    },
    FieldGroup {
        label: "Entidad",
        fields: &["nombre_entidad"],
    },
];

impl Default for CanonicalSchema {
    fn default() -> Self {
        Self {
            id_fields: PROCUREMENT_ID_FIELDS,
            id_prefix: "SEC",
            groups: PROCUREMENT_GROUPS,
        }
    }
}

/// Derives canonical entries from records
#[derive(Debug, Clone, Default)]
pub struct Canonicalizer {
    schema: CanonicalSchema,
}

impl Canonicalizer {
    pub fn new(schema: CanonicalSchema) -> Self {
        Self { schema }
    }

    /// Build the canonical entry; `fallback_index` names the record when no id field is set
    pub fn derive<R: Record + ?Sized>(&self, record: &R, fallback_index: usize) -> CanonicalEntry {
        CanonicalEntry {
            unique_id: self.unique_id(record, fallback_index),
            full_text: record.to_full_text(),
            index_text: self.index_text(record),
        }
    }

    pub fn unique_id<R: Record + ?Sized>(&self, record: &R, fallback_index: usize) -> String {
        self.schema
            .id_fields
            .iter()
            .find_map(|name| record.field(name))
            .unwrap_or_else(|| format!("{}-{:06}", self.schema.id_prefix, fallback_index))
    }

    pub fn index_text<R: Record + ?Sized>(&self, record: &R) -> String {
        self.schema
            .groups
            .iter()
            .filter_map(|group| {
                group
                    .fields
                    .iter()
                    .find_map(|name| record.field(name))
                    .map(|value| format!("{}: {}", group.label, value))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
