// Copyright 2025 The OntoCore Authors.

//! Schema-version migration of serialized records
//!
//! A per-version transform table maps a source schema version to a
//! function over serialized records; migrations run before
//! deserialization and are idempotent, so already-migrated data passes
//! through unchanged.

use crate::errors::MigrationError;
use crate::serializers::SerializedRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// The schema version of this release
pub const SCHEMA_VERSION: &str = "2.0.0";

/// Semantic schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Patch version
    pub patch: u32,
}

impl SchemaVersion {
    /// Create a new schema version
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse from a string such as "2.0.0"
    pub fn parse(s: &str) -> Result<Self, MigrationError> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(MigrationError::InvalidVersion(s.to_string()));
        }
        let parse_part = |p: &str| {
            p.parse::<u32>()
                .map_err(|_| MigrationError::InvalidVersion(s.to_string()))
        };
        Ok(Self {
            major: parse_part(parts[0])?,
            minor: parse_part(parts[1])?,
            patch: parse_part(parts[2])?,
        })
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
    }
}

type TransformFn = fn(&mut Vec<SerializedRecord>);

/// The migration steps, in version order. Each step's transform brings
/// data written by any earlier version up to that step's version.
const MIGRATIONS: &[(&str, TransformFn)] = &[("2.0.0", to_2_0_0)];

/// Migrate serialized records written at `source_version` up to the
/// current schema version. Applying this to already-migrated data is the
/// identity.
pub fn migrate(
    records: &mut Vec<SerializedRecord>,
    source_version: &str,
) -> Result<(), MigrationError> {
    let source = SchemaVersion::parse(source_version)?;
    for (version, transform) in MIGRATIONS {
        let step = SchemaVersion::parse(version).expect("migration table version");
        if source < step {
            info!(from = %source, to = %step, "migrating serialized records");
            transform(records);
        }
    }
    Ok(())
}

/// 2.0.0: composite activities are no longer expressed with assembly
/// component usages. A usage record whose assembly is an Activity (or
/// Mission) becomes an ActCompRel record: `assembly` becomes
/// `composite_activity`, `component` becomes `sub_activity`, and
/// `reference_designator` becomes `sub_activity_role`.
fn to_2_0_0(records: &mut Vec<SerializedRecord>) {
    let activity_oids: Vec<String> = records
        .iter()
        .filter(|r| {
            matches!(
                r.get("_cname").and_then(|v| v.as_str()),
                Some("Activity") | Some("Mission")
            )
        })
        .filter_map(|r| r.get("oid").and_then(|v| v.as_str()).map(String::from))
        .collect();
    for record in records.iter_mut() {
        let is_acu = record.get("_cname").and_then(|v| v.as_str()) == Some("Acu");
        if !is_acu {
            continue;
        }
        let assembly = record
            .get("assembly")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        if !activity_oids.contains(&assembly) {
            continue;
        }
        record.insert("_cname".to_string(), Value::String("ActCompRel".to_string()));
        let component = record.remove("component").unwrap_or(Value::Null);
        let ref_des = record
            .remove("reference_designator")
            .unwrap_or(Value::Null);
        record.remove("assembly");
        record.insert("composite_activity".to_string(), Value::String(assembly));
        record.insert("sub_activity".to_string(), component);
        record.insert("sub_activity_role".to_string(), ref_des);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn record(cname: &str, oid: &str) -> SerializedRecord {
        let mut m = Map::new();
        m.insert("_cname".to_string(), json!(cname));
        m.insert("oid".to_string(), json!(oid));
        m
    }

    #[test]
    fn test_version_parse_and_order() {
        let v = SchemaVersion::parse("2.0.0").unwrap();
        assert_eq!(v, SchemaVersion::new(2, 0, 0));
        assert_eq!(v.to_string(), "2.0.0");
        assert!(SchemaVersion::parse("1.5.0").unwrap() < v);
        assert!(SchemaVersion::parse("2.0.1").unwrap() > v);
        assert!(SchemaVersion::parse("2.0").is_err());
        assert!(SchemaVersion::parse("a.b.c").is_err());
    }

    #[test]
    fn test_activity_acu_becomes_act_comp_rel() {
        let mut act = record("Activity", "act-1");
        act.insert("name".to_string(), json!("Cruise"));
        let mut acu = record("Acu", "acu-1");
        acu.insert("assembly".to_string(), json!("act-1"));
        acu.insert("component".to_string(), json!("act-2"));
        acu.insert("reference_designator".to_string(), json!("phase-1"));
        let mut records = vec![act, acu];
        migrate(&mut records, "1.5.0").unwrap();
        let migrated = &records[1];
        assert_eq!(migrated.get("_cname").unwrap(), &json!("ActCompRel"));
        assert_eq!(migrated.get("composite_activity").unwrap(), &json!("act-1"));
        assert_eq!(migrated.get("sub_activity").unwrap(), &json!("act-2"));
        assert_eq!(migrated.get("sub_activity_role").unwrap(), &json!("phase-1"));
        assert!(migrated.get("assembly").is_none());
        assert!(migrated.get("component").is_none());
    }

    #[test]
    fn test_product_acus_untouched() {
        let mut product = record("HardwareProduct", "hw-1");
        product.insert("name".to_string(), json!("SC"));
        let mut acu = record("Acu", "acu-1");
        acu.insert("assembly".to_string(), json!("hw-1"));
        acu.insert("component".to_string(), json!("hw-2"));
        let mut records = vec![product, acu];
        migrate(&mut records, "1.5.0").unwrap();
        assert_eq!(records[1].get("_cname").unwrap(), &json!("Acu"));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut act = record("Activity", "act-1");
        act.insert("name".to_string(), json!("Cruise"));
        let mut acu = record("Acu", "acu-1");
        acu.insert("assembly".to_string(), json!("act-1"));
        acu.insert("component".to_string(), json!("act-2"));
        let mut records = vec![act, acu];
        migrate(&mut records, "1.5.0").unwrap();
        let once = records.clone();
        migrate(&mut records, "1.5.0").unwrap();
        assert_eq!(records, once);
    }

    #[test]
    fn test_current_version_is_identity() {
        let mut acu = record("Acu", "acu-1");
        acu.insert("assembly".to_string(), json!("act-1"));
        let mut records = vec![record("Activity", "act-1"), acu];
        let before = records.clone();
        migrate(&mut records, SCHEMA_VERSION).unwrap();
        assert_eq!(records, before);
    }
}
