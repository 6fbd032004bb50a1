// Copyright 2025 The OntoCore Authors.

//! The uniform entity value of the object store
//!
//! Domain data is inherently cyclic (an assembly usage references both its
//! assembly and its component), so a [`Thing`] never holds references to
//! other Things: object-valued fields store the referent's oid as a string,
//! with the empty string as the null reference. Polymorphism is dispatched
//! on the class tag through the schema registry.

use crate::kb::PrimitiveType;
use crate::registry::{FieldType, Schema};
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Produce the canonical UTC ISO-8601 timestamp string for "now"
pub fn dtstamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Normalize a datetime string to canonical UTC ISO-8601 form.
///
/// Timezone-naive historical stamps are taken to be UTC. Unparseable input
/// is returned unchanged so string ordering still behaves sensibly for
/// same-producer data.
pub fn normalize_datetime(raw: &str) -> String {
    if raw.is_empty() || raw == "0" {
        return raw.to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Micros, true);
    }
    // timezone-naive: treat as UTC
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return naive
            .and_utc()
            .to_rfc3339_opts(SecondsFormat::Micros, true);
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive
            .and_utc()
            .to_rfc3339_opts(SecondsFormat::Micros, true);
    }
    raw.to_string()
}

/// A dynamically typed entity keyed by an opaque string oid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    /// Opaque identifier; immutable for the Thing's lifetime
    pub oid: String,
    /// Class tag, resolved against the schema registry
    pub cname: String,
    /// Field values in schema order; object-valued fields hold referent oids
    pub fields: IndexMap<String, Value>,
}

impl Thing {
    /// Create a new Thing of the given class with a generated oid and
    /// current timestamps.
    pub fn new(cname: &str) -> Self {
        let now = dtstamp();
        let mut thing = Self {
            oid: Uuid::new_v4().to_string(),
            cname: cname.to_string(),
            fields: IndexMap::new(),
        };
        thing
            .fields
            .insert("oid".to_string(), Value::String(thing.oid.clone()));
        thing
            .fields
            .insert("create_datetime".to_string(), Value::String(now.clone()));
        thing
            .fields
            .insert("mod_datetime".to_string(), Value::String(now));
        thing
    }

    /// Create a Thing with a caller-supplied oid
    pub fn with_oid(cname: &str, oid: &str) -> Self {
        let mut thing = Self::new(cname);
        thing.oid = oid.to_string();
        thing
            .fields
            .insert("oid".to_string(), Value::String(oid.to_string()));
        thing
    }

    /// Get a raw field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Get a field as a string slice, empty when absent or non-string
    pub fn get_str(&self, field: &str) -> &str {
        self.fields
            .get(field)
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }

    /// Get an object-valued field's referent oid, `None` for the null
    /// reference (empty string) or an absent field.
    pub fn get_ref(&self, field: &str) -> Option<&str> {
        let oid = self.get_str(field);
        if oid.is_empty() {
            None
        } else {
            Some(oid)
        }
    }

    /// Get a field as f64, zero when absent
    pub fn get_f64(&self, field: &str) -> f64 {
        self.fields
            .get(field)
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }

    /// Get a field as i64, zero when absent
    pub fn get_i64(&self, field: &str) -> i64 {
        self.fields
            .get(field)
            .and_then(|v| v.as_i64())
            .unwrap_or(0)
    }

    /// Get a field as bool, false when absent
    pub fn get_bool(&self, field: &str) -> bool {
        self.fields
            .get(field)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Set a raw field value, keeping `oid` in sync
    pub fn set(&mut self, field: &str, value: Value) {
        if field == "oid" {
            if let Some(oid) = value.as_str() {
                self.oid = oid.to_string();
            }
        }
        self.fields.insert(field.to_string(), value);
    }

    /// Set an object-valued field to the referent's oid; `None` stores the
    /// null reference.
    pub fn set_ref(&mut self, field: &str, oid: Option<&str>) {
        self.set(
            field,
            Value::String(oid.unwrap_or_default().to_string()),
        );
    }

    /// The Thing's `id` field, empty when unset
    pub fn id(&self) -> &str {
        self.get_str("id")
    }

    /// The Thing's `name` field, empty when unset
    pub fn name(&self) -> &str {
        self.get_str("name")
    }

    /// The Thing's `mod_datetime` field
    pub fn mod_datetime(&self) -> &str {
        self.get_str("mod_datetime")
    }

    /// Stamp `mod_datetime` (and `modifier`, when given) with current time
    pub fn touch(&mut self, modifier_oid: Option<&str>) {
        self.set("mod_datetime", Value::String(dtstamp()));
        if let Some(oid) = modifier_oid {
            self.set_ref("modifier", Some(oid));
        }
    }

    /// Coerce and set a field value per its schema descriptor.
    ///
    /// Inverse fields are never stored. Unknown fields are ignored. String
    /// fields are truncated to their max length; datetimes are normalized;
    /// null becomes the type null.
    pub fn set_per_schema(&mut self, schema: &Schema, field: &str, value: Value) {
        let Some(fd) = schema.field(field) else {
            return;
        };
        if fd.is_inverse {
            return;
        }
        let coerced = match fd.field_type {
            FieldType::Object => match value {
                Value::String(oid) => Value::String(oid),
                Value::Null => Value::String(String::new()),
                _ => return,
            },
            FieldType::Primitive(prim) => coerce(value, prim, fd.max_length),
        };
        self.set(field, coerced);
    }

    /// Populate every absent schema field with its type null so the record
    /// is dense.
    pub fn densify(&mut self, schema: &Schema) {
        for name in &schema.field_names {
            let fd = schema.field(name).expect("field in schema");
            if fd.is_inverse {
                continue;
            }
            if !self.fields.contains_key(name) {
                let null = match fd.field_type {
                    FieldType::Object => Value::String(String::new()),
                    FieldType::Primitive(p) => p.null_value(),
                };
                self.fields.insert(name.clone(), null);
            }
        }
        // order the record by the schema's field order
        let mut ordered = IndexMap::new();
        for name in &schema.field_names {
            if let Some(v) = self.fields.shift_remove(name) {
                ordered.insert(name.clone(), v);
            }
        }
        for (name, v) in self.fields.drain(..) {
            ordered.insert(name, v);
        }
        self.fields = ordered;
    }
}

/// Coerce a JSON value to a primitive field type
pub fn coerce(value: Value, prim: PrimitiveType, max_len: usize) -> Value {
    match prim {
        PrimitiveType::Str => {
            let mut s = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            if s.chars().count() > max_len {
                s = s.chars().take(max_len).collect();
            }
            Value::String(s)
        }
        PrimitiveType::Bool => match value {
            Value::Bool(b) => Value::Bool(b),
            Value::String(s) => Value::Bool(s == "true" || s == "True" || s == "1"),
            Value::Number(n) => Value::Bool(n.as_f64().unwrap_or(0.0) != 0.0),
            _ => Value::Bool(false),
        },
        PrimitiveType::Int | PrimitiveType::Long => match value {
            Value::Number(n) => Value::from(n.as_i64().unwrap_or_else(|| {
                n.as_f64().map(|f| f as i64).unwrap_or(0)
            })),
            Value::String(s) => Value::from(
                s.parse::<i64>()
                    .or_else(|_| s.parse::<f64>().map(|f| f as i64))
                    .unwrap_or(0),
            ),
            Value::Bool(b) => Value::from(if b { 1 } else { 0 }),
            _ => Value::from(0),
        },
        PrimitiveType::Float => match value {
            Value::Number(n) => Value::from(n.as_f64().unwrap_or(0.0)),
            Value::String(s) => Value::from(s.parse::<f64>().unwrap_or(0.0)),
            Value::Bool(b) => Value::from(if b { 1.0 } else { 0.0 }),
            _ => Value::from(0.0),
        },
        PrimitiveType::Bytes => match value {
            Value::String(s) => Value::String(s),
            _ => Value::String(String::new()),
        },
        PrimitiveType::Date | PrimitiveType::Time => match value {
            Value::String(s) => Value::String(s),
            _ => Value::String("0".to_string()),
        },
        PrimitiveType::DateTime => match value {
            Value::String(s) => Value::String(normalize_datetime(&s)),
            _ => Value::String("0".to_string()),
        },
    }
}
