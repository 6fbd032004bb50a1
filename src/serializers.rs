// Copyright 2025 The OntoCore Authors.

//! Canonical serialization and deserialization of Things
//!
//! A serialized record carries the class tag `_cname`, every stored field
//! (object-valued fields as referent oids, inverse fields omitted), and
//! `parameters` / `data_elements` sub-dictionaries holding the engine's
//! cache entries. Serializing a seed set closes over the structural
//! relationships (usages pull in their endpoints, products their ports and
//! internal flows, requirements their computable forms). Deserialization
//! applies records in a fixed topological order with last-writer-wins
//! timestamp skipping.

use crate::core::Core;
use crate::errors::{CoreResult, SerializationError};
use crate::parametrics::{Comp, SystemUsage};
use crate::thing::{normalize_datetime, Thing};
use serde_json::{Map, Value};
use tracing::debug;

/// One serialized object: field names to values, plus `_cname`,
/// `parameters`, and `data_elements`.
pub type SerializedRecord = Map<String, Value>;

/// Order in which classes deserialize, so relationship targets exist
/// before their referents. Classes not listed load last.
pub const DESERIALIZATION_ORDER: &[&str] = &[
    "Relation",
    "Discipline",
    "Role",
    "Organization",
    "Project",
    "Person",
    "RoleAssignment",
    "DataElementDefinition",
    "ParameterDefinition",
    "ParameterRelation",
    "PortType",
    "PortTemplate",
    "ProductType",
    "ActivityType",
    "Product",
    "Template",
    "HardwareProduct",
    "SoftwareProduct",
    "DigitalProduct",
    "Activity",
    "Mission",
    "ActCompRel",
    "Acu",
    "ProjectSystemUsage",
    "Model",
    "Port",
    "Flow",
    "Representation",
    "RepresentationFile",
    "Requirement",
];

/// Serialize a set of seed objects plus their structural closure.
///
/// With `include_components`, products additionally pull in their direct
/// component usages and components. Reference-data objects are excluded
/// unless `include_refdata`.
pub fn serialize(
    core: &Core,
    seed_oids: &[String],
    include_components: bool,
    include_refdata: bool,
) -> Vec<SerializedRecord> {
    let mut worklist: Vec<String> = seed_oids.to_vec();
    let mut out: Vec<SerializedRecord> = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    while let Some(oid) = worklist.pop() {
        if seen.contains(&oid) {
            continue;
        }
        seen.push(oid.clone());
        let Some(thing) = core.store.get(&oid) else {
            continue;
        };
        out.push(record_of(core, thing));
        match thing.cname.as_str() {
            // usages always include their endpoints
            "Acu" => {
                for field in ["assembly", "component"] {
                    if let Some(target) = thing.get_ref(field) {
                        worklist.push(target.to_string());
                    }
                }
            }
            "ProjectSystemUsage" => {
                if let Some(system) = thing.get_ref("system") {
                    worklist.push(system.to_string());
                }
            }
            "RoleAssignment" => {
                for field in ["assigned_role", "assigned_to", "role_assignment_context"] {
                    if let Some(target) = thing.get_ref(field) {
                        worklist.push(target.to_string());
                    }
                }
            }
            "Requirement" => {
                if let Some(rel_oid) = thing.get_ref("computable_form") {
                    worklist.push(rel_oid.to_string());
                    worklist.extend(core.store.referencing(
                        &core.registry,
                        rel_oid,
                        "ParameterRelation",
                        "referenced_relation",
                    ));
                }
            }
            _ => {}
        }
        if core.registry.is_subclass(&thing.cname, "Product") {
            // white-box view: ports and internal flows travel with the
            // product
            worklist.extend(
                core.store
                    .referencing(&core.registry, &oid, "Port", "of_product"),
            );
            worklist.extend(
                core.store
                    .referencing(&core.registry, &oid, "Flow", "flow_context"),
            );
            if include_components {
                if let Some(rows) = core.engine.componentz.get(&oid) {
                    for row in rows {
                        worklist.push(row.usage_oid.clone());
                        worklist.push(row.oid.clone());
                    }
                }
            }
        }
    }
    if !include_refdata {
        let ref_oids = crate::refdata::ref_oids();
        out.retain(|record| {
            record
                .get("oid")
                .and_then(|v| v.as_str())
                .map(|oid| !ref_oids.contains(oid))
                .unwrap_or(true)
        });
    }
    out
}

/// Build the serialized record of one Thing
fn record_of(core: &Core, thing: &Thing) -> SerializedRecord {
    let mut record = Map::new();
    record.insert("_cname".to_string(), Value::String(thing.cname.clone()));
    for (field, value) in &thing.fields {
        record.insert(field.clone(), value.clone());
    }
    if core.registry.is_subclass(&thing.cname, "Modelable") {
        let parms: Map<String, Value> = core
            .engine
            .parameterz
            .get(&thing.oid)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        record.insert("parameters".to_string(), Value::Object(parms));
        let des: Map<String, Value> = core
            .engine
            .data_elementz
            .get(&thing.oid)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        record.insert("data_elements".to_string(), Value::Object(des));
    }
    record
}

/// Deserialize serialized records into the store.
///
/// Records are applied class by class in [`DESERIALIZATION_ORDER`]. A
/// record whose stored copy has a later `mod_datetime` is skipped unless
/// `force_update`. Usage records missing either endpoint are skipped.
/// Unknown class tags are an error. Returns the oids applied.
pub fn deserialize(
    core: &mut Core,
    records: Vec<SerializedRecord>,
    include_refdata: bool,
    force_no_recompute: bool,
    force_update: bool,
) -> CoreResult<Vec<String>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }
    let ref_oids = crate::refdata::ref_oids();
    let mut valid: Vec<SerializedRecord> = Vec::new();
    for record in records {
        let Some(oid) = record.get("oid").and_then(|v| v.as_str()) else {
            debug!("record without oid skipped");
            continue;
        };
        let cname = record
            .get("_cname")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if !core.registry.schemas.contains_key(cname) {
            return Err(SerializationError::UnknownClass(cname.to_string()).into());
        }
        if !include_refdata && ref_oids.contains(oid) {
            continue;
        }
        valid.push(record);
    }
    debug!(count = valid.len(), "deserializing records");
    // group by class, then apply groups in topological order
    let mut groups: Vec<(String, Vec<SerializedRecord>)> = Vec::new();
    for cname in DESERIALIZATION_ORDER {
        groups.push((cname.to_string(), Vec::new()));
    }
    let mut others: Vec<SerializedRecord> = Vec::new();
    for record in valid {
        let cname = record.get("_cname").and_then(|v| v.as_str()).unwrap();
        match groups.iter_mut().find(|(g, _)| g == cname) {
            Some((_, bucket)) => bucket.push(record),
            None => others.push(record),
        }
    }
    groups.push(("other".to_string(), others));
    let mut applied: Vec<String> = Vec::new();
    let mut recompute_required = false;
    for (_, bucket) in groups {
        for mut record in bucket {
            let cname = record
                .get("_cname")
                .and_then(|v| v.as_str())
                .unwrap()
                .to_string();
            let oid = record
                .get("oid")
                .and_then(|v| v.as_str())
                .unwrap()
                .to_string();
            // usage records need both endpoints present
            match cname.as_str() {
                "Acu" => {
                    let assembly = record.get("assembly").and_then(|v| v.as_str()).unwrap_or("");
                    let component = record
                        .get("component")
                        .and_then(|v| v.as_str())
                        .unwrap_or("");
                    if !core.store.contains(assembly) || !core.store.contains(component) {
                        debug!(oid = %oid, "usage endpoints missing, record skipped");
                        continue;
                    }
                    // opportunistic index update, pending a full refresh
                    core.engine.append_component(
                        assembly,
                        Comp {
                            oid: component.to_string(),
                            usage_oid: oid.clone(),
                            quantity: record
                                .get("quantity")
                                .and_then(|v| v.as_i64())
                                .unwrap_or(1),
                            reference_designator: record
                                .get("reference_designator")
                                .and_then(|v| v.as_str())
                                .unwrap_or("")
                                .to_string(),
                        },
                    );
                }
                "ProjectSystemUsage" => {
                    let project = record.get("project").and_then(|v| v.as_str()).unwrap_or("");
                    let system = record.get("system").and_then(|v| v.as_str()).unwrap_or("");
                    if !core.store.contains(project) || !core.store.contains(system) {
                        debug!(oid = %oid, "usage endpoints missing, record skipped");
                        continue;
                    }
                    core.engine.append_system(
                        project,
                        SystemUsage {
                            oid: system.to_string(),
                            usage_oid: oid.clone(),
                            system_role: record
                                .get("system_role")
                                .and_then(|v| v.as_str())
                                .unwrap_or("system")
                                .to_string(),
                        },
                    );
                }
                _ => {}
            }
            let parameters = record
                .remove("parameters")
                .and_then(|v| v.as_object().cloned());
            let data_elements = record
                .remove("data_elements")
                .and_then(|v| v.as_object().cloned());
            let Some(thing) = thing_from_record(core, &cname, &oid, record, force_update) else {
                continue;
            };
            if core.save_without_recompute(vec![thing])? {
                recompute_required = true;
            }
            if let Some(parms) = parameters {
                core.engine.deserialize_parms(&oid, &parms);
            }
            if let Some(des) = data_elements {
                core.engine.deserialize_des(&oid, &des);
            }
            applied.push(oid);
        }
    }
    if recompute_required && !force_no_recompute {
        core.recompute();
    }
    Ok(applied)
}

/// Build the Thing a record applies to: the stored Thing updated with the
/// record's fields, or a fresh Thing. `None` when the stored copy is
/// newer (last-writer-wins by timestamp).
fn thing_from_record(
    core: &Core,
    cname: &str,
    oid: &str,
    record: SerializedRecord,
    force_update: bool,
) -> Option<Thing> {
    let schema = core.registry.schemas.get(cname)?;
    let mut thing = match core.store.get(oid) {
        Some(existing) => {
            let incoming = record
                .get("mod_datetime")
                .and_then(|v| v.as_str())
                .map(normalize_datetime)
                .unwrap_or_default();
            let stored = normalize_datetime(existing.mod_datetime());
            if !force_update && !stored.is_empty() && stored >= incoming {
                debug!(oid = %oid, "stored copy is newer, record skipped");
                return None;
            }
            existing.clone()
        }
        None => Thing::with_oid(cname, oid),
    };
    for (field, value) in record {
        if field == "_cname" {
            continue;
        }
        thing.set_per_schema(schema, &field, value);
    }
    Some(thing)
}
