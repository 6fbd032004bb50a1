// Copyright 2025 The OntoCore Authors.

//! Parameter and data-element definition caches
//!
//! `parm_defz` holds one entry per parameter id: the base variables (from
//! ParameterDefinition Things) plus the Cartesian product of variables and
//! ParameterContexts, each context entry inheriting its `computed` flag
//! from the context. `de_defz` holds data element definitions. Both are
//! derivable from reference data and Things of the definition classes and
//! are rebuilt at startup.

use super::{parameter_id, parameter_name, ParametricEngine};
use crate::thing::{dtstamp, Thing};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cached definition of one parameter id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParmDef {
    /// Display name, including the context abbreviation
    pub name: String,
    /// Base variable (`m`, `P`, ...)
    pub variable: String,
    /// Context id, `None` for the base variable entry
    pub context: Option<String>,
    /// Kind of context (descriptive, modal, ...)
    pub context_type: Option<String>,
    /// Description
    pub description: String,
    /// Physical dimension
    pub dimensions: String,
    /// Datatype of the value
    pub range_datatype: String,
    /// True if values are computed rather than set
    pub computed: bool,
    /// Timestamp of the definition
    pub mod_datetime: String,
}

/// Cached definition of one data element id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeDef {
    /// Display name
    pub name: String,
    /// Column-header label
    #[serde(default)]
    pub label: String,
    /// Description
    pub description: String,
    /// Datatype of the value
    pub range_datatype: String,
    /// Timestamp of the definition
    pub mod_datetime: String,
}

impl ParametricEngine {
    /// Rebuild `parm_defz` from ParameterDefinition and ParameterContext
    /// Things: one entry per variable plus one per (variable, context).
    pub fn create_parm_defz(&mut self, defs: &[&Thing], contexts: &[&Thing]) {
        for pd in defs {
            self.update_parm_defz(pd);
        }
        for pd in defs {
            for c in contexts {
                self.add_context_parm_def(pd, c);
            }
        }
        debug!(entries = self.parm_defz.len(), "parm_defz cache rebuilt");
    }

    /// Add or update the base-variable entry for a ParameterDefinition
    pub fn update_parm_defz(&mut self, pd: &Thing) {
        let id = pd.id().to_string();
        self.parm_defz.insert(
            id.clone(),
            ParmDef {
                name: pd.name().to_string(),
                variable: id,
                context: None,
                context_type: None,
                description: pd.get_str("description").to_string(),
                dimensions: pd.get_str("dimensions").to_string(),
                range_datatype: datatype_or_float(pd.get_str("range_datatype")),
                computed: false,
                mod_datetime: dtstamp(),
            },
        );
        self.update_parmz_by_dimz(pd);
    }

    /// Add the `(variable, context)` entry for a context over a definition
    pub fn add_context_parm_def(&mut self, pd: &Thing, context: &Thing) {
        let variable = pd.id().to_string();
        let cid = context.id().to_string();
        let abbr = context.get_str("abbreviation");
        let abbr = if abbr.is_empty() { cid.as_str() } else { abbr };
        let dims = context.get_str("context_dimensions");
        let dims = if dims.is_empty() {
            pd.get_str("dimensions")
        } else {
            dims
        };
        let dtype = context.get_str("context_datatype");
        let dtype = if dtype.is_empty() {
            pd.get_str("range_datatype")
        } else {
            dtype
        };
        let description = {
            let base = pd.get_str("description");
            let ctx = context.get_str("description");
            if ctx.is_empty() {
                base.to_string()
            } else {
                format!("{base} [{ctx}]")
            }
        };
        self.parm_defz.insert(
            parameter_id(&variable, &cid),
            ParmDef {
                name: parameter_name(pd.name(), abbr),
                variable,
                context: Some(cid),
                context_type: Some(context.get_str("context_type").to_string()),
                description,
                dimensions: dims.to_string(),
                range_datatype: datatype_or_float(dtype),
                computed: context.get_bool("computed"),
                mod_datetime: dtstamp(),
            },
        );
    }

    /// Refresh `parmz_by_dimz` for a ParameterDefinition
    pub fn update_parmz_by_dimz(&mut self, pd: &Thing) {
        let dim = pd.get_str("dimensions").to_string();
        let id = pd.id().to_string();
        let ids = self.parmz_by_dimz.entry(dim).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    /// Rebuild `de_defz` from DataElementDefinition Things
    pub fn create_de_defz(&mut self, defs: &[&Thing]) {
        for ded in defs {
            self.update_de_defz(ded);
        }
        debug!(entries = self.de_defz.len(), "de_defz cache rebuilt");
    }

    /// Add or update the entry for a DataElementDefinition
    pub fn update_de_defz(&mut self, ded: &Thing) {
        self.de_defz.insert(
            ded.id().to_string(),
            DeDef {
                name: ded.name().to_string(),
                label: ded.get_str("label").to_string(),
                description: ded.get_str("description").to_string(),
                range_datatype: {
                    let dt = ded.get_str("range_datatype");
                    if dt.is_empty() {
                        "str".to_string()
                    } else {
                        dt.to_string()
                    }
                },
                mod_datetime: dtstamp(),
            },
        );
    }
}

fn datatype_or_float(dt: &str) -> String {
    if dt.is_empty() {
        "float".to_string()
    } else {
        dt.to_string()
    }
}
