// Copyright 2025 The OntoCore Authors.

//! Validation of user-supplied identifiers and names

use std::collections::BTreeMap;

/// Characters allowed in an `id`
fn id_char_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/')
}

/// Characters never allowed in a `name`
const NAME_DISALLOWED: &[char] = &['<', '>'];

/// Expected format of a parameter definition id
pub const PID_FORMAT_HELP: &str =
    "letters and numbers separated by a single underscore, e.g. \"X_y\", \"Angle_32\", \"XXX_Range\"";

/// True if the string is a well-formed parameter definition id: one or
/// two alphanumeric groups joined by a single underscore.
pub fn valid_parameter_id(id: &str) -> bool {
    let parts: Vec<&str> = id.split('_').collect();
    if parts.is_empty() || parts.len() > 2 {
        return false;
    }
    parts
        .iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Validate a field map for a class: required fields present, id and name
/// well-formed, id (or id+version) unique against the given pairs.
/// Returns field-name to message; empty means valid.
pub fn validate_fields(
    cname: &str,
    fields: &BTreeMap<String, String>,
    required: &[&str],
    existing_idvs: &[(String, String)],
) -> BTreeMap<String, String> {
    let mut msgs = BTreeMap::new();
    if let Some(id_value) = fields.get("id").filter(|v| !v.is_empty()) {
        let invalid: Vec<char> = id_value.chars().filter(|c| !id_char_allowed(*c)).collect();
        if id_value.contains(' ') {
            msgs.insert("id".to_string(), "cannot contain spaces".to_string());
        } else if !invalid.is_empty() {
            msgs.insert(
                "id".to_string(),
                format!(
                    "contains invalid characters: {}",
                    invalid
                        .iter()
                        .map(|c| format!("\"{c}\""))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            );
        }
        if let Some(version) = fields.get("version") {
            if existing_idvs
                .iter()
                .any(|(i, v)| i == id_value && v == version)
            {
                msgs.insert(
                    "id+version".to_string(),
                    format!("{cname} with id + version \"{id_value}.v.{version}\" exists"),
                );
            }
        } else if existing_idvs.iter().any(|(i, _)| i == id_value) {
            msgs.insert(
                "id".to_string(),
                format!("{cname} with id \"{id_value}\" exists"),
            );
        }
        if cname == "ParameterDefinition" && !valid_parameter_id(id_value) {
            msgs.insert("parameter id".to_string(), PID_FORMAT_HELP.to_string());
        }
    }
    if let Some(name_value) = fields.get("name") {
        let invalid: Vec<char> = name_value
            .chars()
            .filter(|c| NAME_DISALLOWED.contains(c))
            .collect();
        if !invalid.is_empty() {
            msgs.insert(
                "name".to_string(),
                format!(
                    "contains invalid characters: {}",
                    invalid
                        .iter()
                        .map(|c| format!("\"{c}\""))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            );
        }
    }
    // version and url may always be blank
    for field in required {
        if *field == "version" || *field == "url" {
            continue;
        }
        if fields.get(*field).map(|v| v.is_empty()).unwrap_or(true) {
            msgs.insert(field.to_string(), "is required".to_string());
        }
    }
    msgs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parameter_id_pattern() {
        assert!(valid_parameter_id("m"));
        assert!(valid_parameter_id("R_D"));
        assert!(valid_parameter_id("Angle_32"));
        assert!(!valid_parameter_id("a_b_c"));
        assert!(!valid_parameter_id("_leading"));
        assert!(!valid_parameter_id("trailing_"));
        assert!(!valid_parameter_id("has space"));
        assert!(!valid_parameter_id(""));
    }

    #[test]
    fn test_id_character_rules() {
        let msgs = validate_fields(
            "HardwareProduct",
            &fields(&[("id", "HW 1")]),
            &[],
            &[],
        );
        assert!(msgs.get("id").unwrap().contains("spaces"));
        let msgs = validate_fields(
            "HardwareProduct",
            &fields(&[("id", "HW<1>")]),
            &[],
            &[],
        );
        assert!(msgs.get("id").unwrap().contains("invalid characters"));
        let msgs = validate_fields(
            "HardwareProduct",
            &fields(&[("id", "HW-1.a/b_c")]),
            &[],
            &[],
        );
        assert!(msgs.is_empty());
    }

    #[test]
    fn test_duplicate_id_and_version() {
        let existing = vec![("HW-1".to_string(), "2".to_string())];
        let msgs = validate_fields(
            "HardwareProduct",
            &fields(&[("id", "HW-1"), ("version", "2")]),
            &[],
            &existing,
        );
        assert!(msgs.contains_key("id+version"));
        // a different version of the same id is fine
        let msgs = validate_fields(
            "HardwareProduct",
            &fields(&[("id", "HW-1"), ("version", "3")]),
            &[],
            &existing,
        );
        assert!(msgs.is_empty());
        // without a version field, the bare id must be unique
        let msgs = validate_fields("Project", &fields(&[("id", "HW-1")]), &[], &existing);
        assert!(msgs.contains_key("id"));
    }

    #[test]
    fn test_required_fields() {
        let msgs = validate_fields(
            "HardwareProduct",
            &fields(&[("name", "Widget")]),
            &["name", "description", "version"],
            &[],
        );
        assert_eq!(msgs.get("description").unwrap(), "is required");
        // version is exempt even when listed
        assert!(!msgs.contains_key("version"));
    }

    #[test]
    fn test_name_rules() {
        let msgs = validate_fields(
            "HardwareProduct",
            &fields(&[("name", "A <b> C")]),
            &[],
            &[],
        );
        assert!(msgs.contains_key("name"));
    }
}
