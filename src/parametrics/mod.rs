// Copyright 2025 The OntoCore Authors.

//! The parametric engine
//!
//! Owns the parameter and data-element value caches, the definition
//! caches, the assembly and system indices, the requirement-allocation
//! index, and the power-mode tables. Every value in `parameterz` is stored
//! in SI base units; conversion happens only at the [`UnitService`]
//! boundary. The engine is single-writer: the owning [`Core`] serializes
//! all mutation.
//!
//! [`Core`]: crate::core::Core

mod allocs;
mod components;
mod defs;
mod modes;
mod rollups;
mod values;

pub use allocs::{Allocation, Constraint, RequirementView, UsageView};
pub use components::{Comp, SystemUsage};
pub use defs::{DeDef, ParmDef};
pub use modes::ModeDefinition;
pub use rollups::RequirementMargin;

use crate::config::NumericFormat;
use crate::events::{EventSink, NullSink};
use crate::units::{StandardUnits, UnitService};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;

/// The parametric computation engine and its caches
pub struct ParametricEngine {
    /// Parameter definitions keyed by parameter id (`variable[context]`)
    pub parm_defz: IndexMap<String, ParmDef>,
    /// Data element definitions keyed by data element id
    pub de_defz: IndexMap<String, DeDef>,
    /// Parameter ids grouped by dimension
    pub parmz_by_dimz: IndexMap<String, Vec<String>>,
    /// Parameter values: oid -> parameter id -> value in SI base units
    pub parameterz: IndexMap<String, IndexMap<String, Value>>,
    /// Data element values: oid -> data element id -> typed value
    pub data_elementz: IndexMap<String, IndexMap<String, Value>>,
    /// Assembly structure: assembly oid -> ordered component rows
    pub componentz: IndexMap<String, Vec<Comp>>,
    /// Project systems: project oid -> ordered system rows
    pub systemz: IndexMap<String, Vec<SystemUsage>>,
    /// Requirement allocations keyed by requirement oid
    pub rqt_allocz: IndexMap<String, Allocation>,
    /// Converse lookup: usage oid -> allocated requirement oids
    pub allocz: IndexMap<String, Vec<String>>,
    /// Power mode tables keyed by project oid
    pub mode_defz: IndexMap<String, ModeDefinition>,
    /// Configured default values by parameter id
    pub p_defaults: HashMap<String, f64>,
    /// Configured default values by data element id
    pub de_defaults: HashMap<String, Value>,
    /// Significant digits for rollup rounding
    pub precision: usize,
    /// Numeric display format for string getters
    pub numeric_format: NumericFormat,
    pub(crate) units: Box<dyn UnitService>,
    pub(crate) sink: Box<dyn EventSink>,
}

impl Default for ParametricEngine {
    fn default() -> Self {
        Self::new(Box::new(StandardUnits::default()), Box::new(NullSink))
    }
}

impl ParametricEngine {
    /// Create an engine with the given unit service and event sink
    pub fn new(units: Box<dyn UnitService>, sink: Box<dyn EventSink>) -> Self {
        Self {
            parm_defz: IndexMap::new(),
            de_defz: IndexMap::new(),
            parmz_by_dimz: IndexMap::new(),
            parameterz: IndexMap::new(),
            data_elementz: IndexMap::new(),
            componentz: IndexMap::new(),
            systemz: IndexMap::new(),
            rqt_allocz: IndexMap::new(),
            allocz: IndexMap::new(),
            mode_defz: IndexMap::new(),
            p_defaults: HashMap::new(),
            de_defaults: HashMap::new(),
            precision: 4,
            numeric_format: NumericFormat::default(),
            units,
            sink,
        }
    }

    /// Access the unit service
    pub fn units(&self) -> &dyn UnitService {
        self.units.as_ref()
    }

    /// Replace the event sink, returning the previous one
    pub fn set_sink(&mut self, sink: Box<dyn EventSink>) -> Box<dyn EventSink> {
        std::mem::replace(&mut self.sink, sink)
    }

    /// Round to `self.precision` significant digits
    pub fn round(&self, x: f64) -> f64 {
        round_to(x, self.precision)
    }
}

/// Round a number to `n` significant digits
pub fn round_to(x: f64, n: usize) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    let digits = (n as i32 - 1) - x.abs().log10().floor() as i32;
    let factor = 10f64.powi(digits);
    (x * factor).round() / factor
}

/// Compose a parameter id from a variable and a context id
pub fn parameter_id(variable: &str, context_id: &str) -> String {
    if context_id.is_empty() {
        variable.to_string()
    } else {
        format!("{variable}[{context_id}]")
    }
}

/// Split a parameter id into its variable and context id
pub fn split_pid(pid: &str) -> (String, String) {
    match pid.split_once('[') {
        Some((variable, rest)) if rest.ends_with(']') => (
            variable.to_string(),
            rest[..rest.len() - 1].to_string(),
        ),
        _ => (pid.to_string(), String::new()),
    }
}

/// Split a parameter id, mapping the CBE context to the "Nominal" power
/// level name used in mode tables.
pub fn variable_and_modal_context(pid: &str) -> (String, String) {
    let (variable, context) = split_pid(pid);
    if context == "CBE" {
        (variable, "Nominal".to_string())
    } else {
        (variable, context)
    }
}

/// Compose a parameter name from a variable name and context abbreviation
pub fn parameter_name(variable_name: &str, context_abbr: &str) -> String {
    if context_abbr.is_empty() {
        variable_name.to_string()
    } else {
        format!("{variable_name} [{context_abbr}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.0, 4), 0.0);
        assert_eq!(round_to(1234.5678, 4), 1235.0);
        assert_eq!(round_to(0.0012345, 3), 0.00123);
        assert_eq!(round_to(-9876.0, 2), -9900.0);
        assert_eq!(round_to(13.0, 4), 13.0);
    }

    #[test]
    fn test_parameter_id_round_trip() {
        assert_eq!(parameter_id("m", "CBE"), "m[CBE]");
        assert_eq!(parameter_id("m", ""), "m");
        assert_eq!(split_pid("m[CBE]"), ("m".to_string(), "CBE".to_string()));
        assert_eq!(split_pid("m"), ("m".to_string(), String::new()));
        assert_eq!(
            split_pid("T[operational_max]"),
            ("T".to_string(), "operational_max".to_string())
        );
    }

    #[test]
    fn test_modal_context_mapping() {
        assert_eq!(
            variable_and_modal_context("P[CBE]"),
            ("P".to_string(), "Nominal".to_string())
        );
        assert_eq!(
            variable_and_modal_context("P[standby]"),
            ("P".to_string(), "standby".to_string())
        );
    }

    #[test]
    fn test_parameter_name() {
        assert_eq!(parameter_name("Mass", "CBE"), "Mass [CBE]");
        assert_eq!(parameter_name("Mass", ""), "Mass");
    }
}
