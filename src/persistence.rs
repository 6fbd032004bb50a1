// Copyright 2025 The OntoCore Authors.

//! Snapshot persistence: caches and object state as JSON files
//!
//! State is snapshotted to a home directory, one JSON file per cache,
//! each indent-4 with sorted keys. Saving writes the home directory
//! first, then mirrors into a backup directory named by calendar day
//! (one backup per day, last write wins). Writes are best-effort: a
//! failed file is logged and aggregated, and the remaining files are
//! still written. On load, a missing file is a clean no-op and a
//! malformed one reports `Fail`.

use crate::core::Core;
use crate::errors::PersistenceError;
use crate::jsonio;
use crate::parametrics::Allocation;
use crate::thing::Thing;
use chrono::Utc;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Result of loading one snapshot file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// File present and applied
    Success,
    /// File absent; nothing to do
    NotFound,
    /// File present but unreadable or undecodable
    Fail,
}

/// The snapshot file names, in save order
pub const SNAPSHOT_FILES: &[&str] = &[
    "matrix.json",
    "parameters.json",
    "data_elements.json",
    "parm_defs.json",
    "de_defs.json",
    "parms_by_dims.json",
    "components.json",
    "systems.json",
    "rqt_allocs.json",
    "allocs.json",
    "mode_defs.json",
    "diagrams.json",
    "user_roles.json",
];

/// Load statuses keyed by snapshot file name
pub type LoadReport = IndexMap<String, LoadStatus>;

/// Save every cache to the home directory, then mirror into the dated
/// backup directory. Returns the write failures (best-effort: one failed
/// file does not abort the rest).
pub fn save_caches(core: &Core, home: &Path) -> Vec<PersistenceError> {
    info!(dir = %home.display(), "saving caches");
    let mut failures = write_all(core, home);
    let backup_dir = home
        .join("backup")
        .join(Utc::now().format("%Y-%m-%d").to_string());
    if let Err(e) = fs::create_dir_all(&backup_dir) {
        warn!(error = %e, "could not create backup directory");
        failures.push(PersistenceError::WriteFailed {
            file: backup_dir.to_string_lossy().into_owned(),
            reason: e.to_string(),
        });
        return failures;
    }
    failures.extend(write_all(core, &backup_dir));
    for failure in &failures {
        warn!(error = %failure, "snapshot write failed");
    }
    failures
}

fn write_all(core: &Core, dir: &Path) -> Vec<PersistenceError> {
    let mut failures = Vec::new();
    let mut write = |file: &str, value: Value| {
        if let Err(e) = jsonio::write_json(&dir.join(file), &value) {
            failures.push(e);
        } else {
            debug!(file = %file, "written");
        }
    };
    write("matrix.json", matrix_value(core));
    write(
        "parameters.json",
        serde_json::to_value(&core.engine.parameterz).unwrap_or_default(),
    );
    write(
        "data_elements.json",
        serde_json::to_value(&core.engine.data_elementz).unwrap_or_default(),
    );
    write(
        "parm_defs.json",
        serde_json::to_value(&core.engine.parm_defz).unwrap_or_default(),
    );
    write(
        "de_defs.json",
        serde_json::to_value(&core.engine.de_defz).unwrap_or_default(),
    );
    write(
        "parms_by_dims.json",
        serde_json::to_value(&core.engine.parmz_by_dimz).unwrap_or_default(),
    );
    write(
        "components.json",
        serde_json::to_value(&core.engine.componentz).unwrap_or_default(),
    );
    write(
        "systems.json",
        serde_json::to_value(&core.engine.systemz).unwrap_or_default(),
    );
    let rqt_allocs: Map<String, Value> = core
        .engine
        .rqt_allocz
        .iter()
        .map(|(oid, alloc)| (oid.clone(), alloc.to_row()))
        .collect();
    write("rqt_allocs.json", Value::Object(rqt_allocs));
    write(
        "allocs.json",
        serde_json::to_value(&core.engine.allocz).unwrap_or_default(),
    );
    write(
        "mode_defs.json",
        serde_json::to_value(&core.engine.mode_defz).unwrap_or_default(),
    );
    write(
        "diagrams.json",
        serde_json::to_value(&core.diagramz).unwrap_or_default(),
    );
    write(
        "user_roles.json",
        serde_json::to_value(&core.user_raz).unwrap_or_default(),
    );
    failures
}

/// The matrix snapshot: every Thing as `{_cname, field: value, ...}`
fn matrix_value(core: &Core) -> Value {
    let mut out = Map::new();
    for thing in core.store.iter() {
        let mut record = Map::new();
        record.insert("_cname".to_string(), Value::String(thing.cname.clone()));
        for (field, value) in &thing.fields {
            record.insert(field.clone(), value.clone());
        }
        out.insert(thing.oid.clone(), Value::Object(record));
    }
    Value::Object(out)
}

/// Load all snapshot files from a home directory into the core, in
/// dependency order: definitions before values, the matrix before the
/// indices. Returns a per-file status report.
pub fn load_caches(core: &mut Core, home: &Path) -> LoadReport {
    info!(dir = %home.display(), "loading caches");
    let mut report = LoadReport::new();
    let load = |file: &str| -> (LoadStatus, Option<Value>) {
        let path = home.join(file);
        if !path.exists() {
            debug!(file = %file, "not found");
            return (LoadStatus::NotFound, None);
        }
        match jsonio::read_json(&path) {
            Ok(value) => (LoadStatus::Success, Some(value)),
            Err(e) => {
                warn!(file = %file, error = %e, "snapshot read failed");
                (LoadStatus::Fail, None)
            }
        }
    };
    // definition caches first: value deserialization consults them
    let (status, value) = load("parm_defs.json");
    if let Some(value) = value {
        if let Ok(defs) = serde_json::from_value(value) {
            core.engine.parm_defz = defs;
        }
    }
    report.insert("parm_defs.json".to_string(), status);
    let (status, value) = load("de_defs.json");
    if let Some(value) = value {
        if let Ok(defs) = serde_json::from_value(value) {
            core.engine.de_defz = defs;
        }
    }
    report.insert("de_defs.json".to_string(), status);
    let (status, value) = load("parms_by_dims.json");
    if let Some(value) = value {
        if let Ok(map) = serde_json::from_value(value) {
            core.engine.parmz_by_dimz = map;
        }
    }
    report.insert("parms_by_dims.json".to_string(), status);
    // the object matrix
    let (status, value) = load("matrix.json");
    let status = match (status, value) {
        (LoadStatus::Success, Some(Value::Object(records))) => {
            let count = records.len();
            for (oid, record) in records {
                if let Some(thing) = thing_from_matrix(core, &oid, record) {
                    core.store.upsert(thing);
                }
            }
            debug!(count, "matrix loaded");
            LoadStatus::Success
        }
        (LoadStatus::Success, _) => LoadStatus::Fail,
        (status, _) => status,
    };
    report.insert("matrix.json".to_string(), status);
    // parameter and data element values, migrating the old dict shape
    let (status, value) = load("parameters.json");
    if let Some(Value::Object(by_oid)) = value {
        for (oid, parms) in by_oid {
            if let Value::Object(parms) = parms {
                core.engine.deserialize_parms(&oid, &parms);
            }
        }
    }
    report.insert("parameters.json".to_string(), status);
    let (status, value) = load("data_elements.json");
    if let Some(Value::Object(by_oid)) = value {
        for (oid, des) in by_oid {
            if let Value::Object(des) = des {
                core.engine.deserialize_des(&oid, &des);
            }
        }
    }
    report.insert("data_elements.json".to_string(), status);
    // assembly, system, and allocation indices
    let (status, value) = load("components.json");
    if let Some(value) = value {
        if let Ok(map) = serde_json::from_value(value) {
            core.engine.componentz = map;
        }
    }
    report.insert("components.json".to_string(), status);
    let (status, value) = load("systems.json");
    if let Some(value) = value {
        if let Ok(map) = serde_json::from_value(value) {
            core.engine.systemz = map;
        }
    }
    report.insert("systems.json".to_string(), status);
    let (status, value) = load("rqt_allocs.json");
    if let Some(Value::Object(rows)) = value {
        for (oid, row) in rows {
            if let Some(alloc) = Allocation::from_row(&row) {
                core.engine.rqt_allocz.insert(oid, alloc);
            }
        }
    }
    report.insert("rqt_allocs.json".to_string(), status);
    let (status, value) = load("allocs.json");
    if let Some(value) = value {
        if let Ok(map) = serde_json::from_value(value) {
            core.engine.allocz = map;
        }
    }
    report.insert("allocs.json".to_string(), status);
    let (status, value) = load("mode_defs.json");
    if let Some(value) = value {
        if let Ok(map) = serde_json::from_value(value) {
            core.engine.mode_defz = map;
        }
    }
    report.insert("mode_defs.json".to_string(), status);
    let (status, value) = load("diagrams.json");
    if let Some(value) = value {
        if let Ok(map) = serde_json::from_value(value) {
            core.diagramz = map;
        }
    }
    report.insert("diagrams.json".to_string(), status);
    let (status, value) = load("user_roles.json");
    if let Some(value) = value {
        if let Ok(raz) = serde_json::from_value(value) {
            core.user_raz = raz;
        }
    }
    report.insert("user_roles.json".to_string(), status);
    report
}

fn thing_from_matrix(core: &Core, oid: &str, record: Value) -> Option<Thing> {
    let Value::Object(mut record) = record else {
        return None;
    };
    let cname = record
        .remove("_cname")
        .and_then(|v| v.as_str().map(String::from))?;
    let schema = core.registry.schemas.get(&cname)?;
    let mut thing = Thing::with_oid(&cname, oid);
    for (field, value) in record {
        thing.set_per_schema(schema, &field, value);
    }
    thing.densify(schema);
    Some(thing)
}
