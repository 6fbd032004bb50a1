// Copyright 2025 The OntoCore Authors.

//! JSON file I/O with the canonical on-disk form: UTF-8, indent 4,
//! object keys sorted.

use crate::errors::PersistenceError;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Recursively sort all object keys of a JSON value
pub fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = serde_json::Map::new();
            for (k, v) in entries {
                out.insert(k, sorted(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

/// Render a serializable value as indent-4, key-sorted JSON text
pub fn to_canonical_string<T: Serialize>(value: &T) -> Result<String, PersistenceError> {
    let raw = serde_json::to_value(value).map_err(|e| PersistenceError::WriteFailed {
        file: String::new(),
        reason: e.to_string(),
    })?;
    let sorted_value = sorted(raw);
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    sorted_value
        .serialize(&mut ser)
        .map_err(|e| PersistenceError::WriteFailed {
            file: String::new(),
            reason: e.to_string(),
        })?;
    String::from_utf8(buf).map_err(|e| PersistenceError::WriteFailed {
        file: String::new(),
        reason: e.to_string(),
    })
}

/// Write a serializable value to a file in canonical form
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let text = to_canonical_string(value).map_err(|e| match e {
        PersistenceError::WriteFailed { reason, .. } => PersistenceError::WriteFailed {
            file: file.clone(),
            reason,
        },
        other => other,
    })?;
    fs::write(path, text).map_err(|e| PersistenceError::WriteFailed {
        file,
        reason: e.to_string(),
    })
}

/// Read a JSON value from a file
pub fn read_json(path: &Path) -> Result<Value, PersistenceError> {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let text = fs::read_to_string(path).map_err(|e| PersistenceError::ReadFailed {
        file: file.clone(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| PersistenceError::ReadFailed {
        file,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sorted_keys() {
        let value = json!({"b": 1, "a": {"z": 2, "y": [ {"q": 3, "p": 4} ]}});
        let text = to_canonical_string(&value).unwrap();
        let a_pos = text.find("\"a\"").unwrap();
        let b_pos = text.find("\"b\"").unwrap();
        assert!(a_pos < b_pos);
        let p_pos = text.find("\"p\"").unwrap();
        let q_pos = text.find("\"q\"").unwrap();
        assert!(p_pos < q_pos);
    }

    #[test]
    fn test_indent_is_four_spaces() {
        let text = to_canonical_string(&json!({"a": 1})).unwrap();
        assert!(text.contains("\n    \"a\": 1"));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        let value = json!({"k": [1, 2, 3], "s": "text"});
        write_json(&path, &value).unwrap();
        let back = read_json(&path).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_json(Path::new("/nonexistent/nope.json")).unwrap_err();
        assert!(matches!(err, PersistenceError::ReadFailed { .. }));
    }

    #[test]
    fn test_read_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ nope").unwrap();
        let err = read_json(&path).unwrap_err();
        assert!(matches!(err, PersistenceError::ReadFailed { .. }));
    }
}
