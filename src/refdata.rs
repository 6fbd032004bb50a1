// Copyright 2025 The OntoCore Authors.

//! Embedded reference data
//!
//! A fixed, vendor-supplied set of objects present in every installation:
//! the platform root organization, the admin user, roles, parameter and
//! data-element definitions, parameter contexts, product types, and
//! disciplines. Reference data is created at first startup and refreshed
//! when its embedded `mod_datetime` is newer than the stored copy;
//! deprecated oids are removed at startup. Reference objects are never
//! modifiable by users.

use serde_json::{json, Map, Value};
use std::collections::HashSet;

/// oid of the platform root organization
pub const ROOT_ORG_OID: &str = "mbe:ROOT";

/// oid of the admin user
pub const ADMIN_OID: &str = "mbe:admin";

/// oid of the placeholder product for to-be-determined components
pub const TBD_OID: &str = "mbe:TBD";

/// oid of the shared sandbox project
pub const SANDBOX_OID: &str = "mbe:SANDBOX";

/// oid of the Administrator role
pub const ADMIN_ROLE_OID: &str = "mbe:Role.Administrator";

/// Timestamp of this reference data release; bumping it triggers a refresh
/// of stored copies at startup.
pub const REF_DATA_DATETIME: &str = "2025-06-01T00:00:00Z";

/// A serialized reference record
pub type Record = Map<String, Value>;

fn rec(cname: &str, oid: &str, id: &str, name: &str) -> Record {
    let mut m = Map::new();
    m.insert("_cname".to_string(), json!(cname));
    m.insert("oid".to_string(), json!(oid));
    m.insert("id".to_string(), json!(id));
    m.insert("id_ns".to_string(), json!("mbe"));
    m.insert("name".to_string(), json!(name));
    m.insert("create_datetime".to_string(), json!(REF_DATA_DATETIME));
    m.insert("mod_datetime".to_string(), json!(REF_DATA_DATETIME));
    m
}

fn with(mut m: Record, key: &str, value: Value) -> Record {
    m.insert(key.to_string(), value);
    m
}

/// Initial reference data: organizations, persons, roles, and the global
/// admin role assignment. Loaded before everything else because other
/// objects refer to them.
pub fn initial() -> Vec<Record> {
    let mut records = vec![
        with(
            rec("Organization", ROOT_ORG_OID, "ROOT", "Platform Root Organization"),
            "public",
            json!(true),
        ),
        with(
            with(
                rec("Person", ADMIN_OID, "admin", "Administrator"),
                "org",
                json!(ROOT_ORG_OID),
            ),
            "last_name",
            json!("Administrator"),
        ),
        with(
            rec("Project", SANDBOX_OID, "SANDBOX", "Sandbox"),
            "public",
            json!(true),
        ),
        with(
            with(
                rec("HardwareProduct", TBD_OID, "TBD", "To Be Determined"),
                "public",
                json!(true),
            ),
            "owner",
            json!(ROOT_ORG_OID),
        ),
    ];
    for (role_id, role_name) in [
        ("Administrator", "Administrator"),
        ("lead_engineer", "Lead Engineer"),
        ("systems_engineer", "Systems Engineer"),
        ("discipline_engineer", "Discipline Engineer"),
        ("observer", "Observer"),
    ] {
        records.push(with(
            rec(
                "Role",
                &format!("mbe:Role.{role_id}"),
                role_id,
                role_name,
            ),
            "public",
            json!(true),
        ));
    }
    // the distinguished global-admin assignment: no context
    records.push(with(
        with(
            with(
                rec(
                    "RoleAssignment",
                    "mbe:RA.global-admin",
                    "Administrator-admin",
                    "Administrator: admin",
                ),
                "assigned_role",
                json!(ADMIN_ROLE_OID),
            ),
            "assigned_to",
            json!(ADMIN_OID),
        ),
        "role_assignment_context",
        json!(""),
    ));
    records
}

/// Parameter definitions and contexts
pub fn parameter_definitions_and_contexts() -> Vec<Record> {
    let mut records = Vec::new();
    let defs: &[(&str, &str, &str, &str)] = &[
        ("m", "Mass", "mass", "Mass of the product."),
        ("P", "Power", "power", "Power consumption of the product."),
        ("R_D", "Data Rate", "bitrate", "Data rate generated by the product."),
        ("Cost", "Cost", "money", "Cost of the product."),
        ("height", "Height", "length", "Height of the product envelope."),
        ("width", "Width", "length", "Width of the product envelope."),
        ("depth", "Depth", "length", "Depth of the product envelope."),
        ("duration", "Duration", "time", "Duration of the activity."),
        ("t_start", "Start Time", "time", "Start time of the activity."),
        ("t_end", "End Time", "time", "End time of the activity."),
        ("T", "Temperature", "temperature", "Temperature of the product."),
        ("f_downlink", "Downlink Frequency", "frequency", "Downlink carrier frequency."),
        ("f_uplink", "Uplink Frequency", "frequency", "Uplink carrier frequency."),
        ("Gain_antenna", "Antenna Gain", "decibels-isotropic", "Gain of the antenna."),
    ];
    for (id, name, dims, desc) in defs {
        records.push(with(
            with(
                with(
                    with(
                        rec(
                            "ParameterDefinition",
                            &crate::names::parameter_definition_oid(id),
                            id,
                            name,
                        ),
                        "dimensions",
                        json!(dims),
                    ),
                    "range_datatype",
                    json!("float"),
                ),
                "description",
                json!(desc),
            ),
            "public",
            json!(true),
        ));
    }
    // contexts; `computed` marks values derived by the engine
    let contexts: &[(&str, &str, &str, bool, &str, &str)] = &[
        // (id, abbreviation, context_type, computed, dims override, description)
        ("CBE", "CBE", "descriptive", true, "", "Current best estimate."),
        ("MEV", "MEV", "descriptive", true, "", "Maximum expected value."),
        ("Margin", "Margin", "descriptive", true, "percent", "Margin against the allocated constraint."),
        ("Ctgcy", "Ctgcy", "descriptive", false, "percent", "Contingency fraction."),
        ("NTE", "NTE", "descriptive", false, "", "Not-to-exceed value."),
        ("Nominal", "Nom", "modal", false, "", "Nominal operating level."),
        ("peak", "peak", "modal", false, "", "Peak operating level."),
        ("standby", "stby", "modal", false, "", "Standby level."),
        ("survival", "surv", "modal", false, "", "Survival level."),
        ("operational_max", "op max", "limit", false, "", "Maximum operational value."),
        ("operational_min", "op min", "limit", false, "", "Minimum operational value."),
        ("survival_max", "surv max", "limit", false, "", "Maximum survival value."),
        ("survival_min", "surv min", "limit", false, "", "Minimum survival value."),
    ];
    for (id, abbr, ctype, computed, dims, desc) in contexts {
        let mut m = rec(
            "ParameterContext",
            &crate::names::parameter_context_oid(id),
            id,
            id,
        );
        m = with(m, "abbreviation", json!(abbr));
        m = with(m, "context_type", json!(ctype));
        m = with(m, "computed", json!(computed));
        m = with(m, "description", json!(desc));
        m = with(m, "public", json!(true));
        if !dims.is_empty() {
            m = with(m, "context_dimensions", json!(dims));
        }
        records.push(m);
    }
    records
}

/// Data element definitions
pub fn data_element_definitions() -> Vec<Record> {
    let defs: &[(&str, &str, &str, &str)] = &[
        ("Vendor", "Vendor", "str", "Vendor of the product."),
        ("TRL", "TRL", "int", "Technology readiness level."),
        ("reference_missions", "Reference Missions", "str", "Missions the product has flown on."),
        ("directionality", "Directionality", "str", "Port directionality."),
    ];
    defs.iter()
        .map(|(id, name, dtype, desc)| {
            with(
                with(
                    with(
                        rec(
                            "DataElementDefinition",
                            &crate::names::data_element_definition_oid(id),
                            id,
                            name,
                        ),
                        "range_datatype",
                        json!(dtype),
                    ),
                    "description",
                    json!(desc),
                ),
                "public",
                json!(true),
            )
        })
        .collect()
}

/// Core reference data: product types, disciplines, and their associations
pub fn core() -> Vec<Record> {
    let mut records = Vec::new();
    let product_types: &[(&str, &str)] = &[
        ("spacecraft", "SC"),
        ("instrument", "INST"),
        ("antenna", "ANT"),
        ("battery", "BATT"),
        ("computer", "CDH"),
        ("thruster", "THR"),
        ("solar_array", "SA"),
        ("transponder", "XPDR"),
        ("heater", "HTR"),
        ("heat_pipe", "HP"),
        ("structure", "STR"),
    ];
    for (id, abbr) in product_types {
        records.push(with(
            with(
                with(
                    rec(
                        "ProductType",
                        &format!("mbe:ProductType.{id}"),
                        id,
                        &crate::names::to_external_name(&title_case(id)),
                    ),
                    "abbreviation",
                    json!(abbr),
                ),
                "owner",
                json!(ROOT_ORG_OID),
            ),
            "public",
            json!(true),
        ));
    }
    let disciplines: &[(&str, &[&str])] = &[
        ("systems_engineering", &["spacecraft", "instrument", "structure"]),
        ("power", &["battery", "solar_array", "heater"]),
        ("communications", &["antenna", "transponder"]),
        ("propulsion", &["thruster"]),
        ("thermal", &["heater", "heat_pipe"]),
        ("avionics", &["computer"]),
    ];
    for (discipline_id, pt_ids) in disciplines {
        records.push(with(
            rec(
                "Discipline",
                &format!("mbe:Discipline.{discipline_id}"),
                discipline_id,
                &title_case(discipline_id),
            ),
            "public",
            json!(true),
        ));
        for pt_id in *pt_ids {
            records.push(with(
                with(
                    rec(
                        "DisciplineProductType",
                        &format!("mbe:DPT.{discipline_id}.{pt_id}"),
                        &format!("{discipline_id}-{pt_id}"),
                        &format!("{discipline_id}: {pt_id}"),
                    ),
                    "used_in_discipline",
                    json!(format!("mbe:Discipline.{discipline_id}")),
                ),
                "relevant_product_type",
                json!(format!("mbe:ProductType.{pt_id}")),
            ));
        }
    }
    // discipline_engineer covers every discipline; the managers cover
    // systems engineering
    for (role_id, discipline_ids) in [
        ("discipline_engineer", disciplines.iter().map(|(d, _)| *d).collect::<Vec<_>>()),
        ("lead_engineer", vec!["systems_engineering"]),
        ("systems_engineer", vec!["systems_engineering"]),
    ] {
        for discipline_id in discipline_ids {
            records.push(with(
                with(
                    rec(
                        "DisciplineRole",
                        &format!("mbe:DR.{discipline_id}.{role_id}"),
                        &format!("{discipline_id}-{role_id}"),
                        &format!("{discipline_id}: {role_id}"),
                    ),
                    "related_to_discipline",
                    json!(format!("mbe:Discipline.{discipline_id}")),
                ),
                "related_role",
                json!(format!("mbe:Role.{role_id}")),
            ));
        }
    }
    records
}

fn title_case(id: &str) -> String {
    id.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("")
}

/// oids of reference data removed from current releases; deleted at startup
pub fn deprecated() -> Vec<String> {
    vec![
        // superseded by the operational/survival limit contexts
        "mbe:ParameterDefinition.P_peak".to_string(),
        "mbe:ParameterDefinition.T_operational".to_string(),
    ]
}

/// All reference records in load order
pub fn all() -> Vec<Record> {
    let mut records = initial();
    records.extend(parameter_definitions_and_contexts());
    records.extend(data_element_definitions());
    records.extend(core());
    records
}

/// oids of all reference data objects
pub fn ref_oids() -> HashSet<String> {
    all()
        .iter()
        .filter_map(|r| r.get("oid").and_then(|v| v.as_str()).map(String::from))
        .collect()
}
