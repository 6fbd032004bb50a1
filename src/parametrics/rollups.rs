// Copyright 2025 The OntoCore Authors.

//! Recursive assembly rollups: CBE, MEV, contingency, and margins
//!
//! Rollups recurse over the `componentz` index, never over object
//! references. A branch that revisits an oid already on the recursion path
//! is short-circuited and contributes its stored leaf value, so a cyclic
//! subgraph cannot diverge.

use super::{parameter_id, round_to, ParametricEngine};
use serde_json::Value;
use tracing::debug;

/// Contingency applied when a leaf node has none set
const DEFAULT_CONTINGENCY: f64 = 0.25;

/// Result of a requirement margin computation.
///
/// When the margin cannot be computed, `margin` is `None` and `note`
/// explains why; the other fields carry whatever was resolvable.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementMargin {
    /// oid of the usage the requirement is allocated to
    pub usage_oid: Option<String>,
    /// Constrained parameter id
    pub pid: Option<String>,
    /// Not-to-exceed value, in the constraint's units
    pub nte: Option<f64>,
    /// Units of the not-to-exceed value
    pub nte_units: Option<String>,
    /// Computed margin fraction
    pub margin: Option<f64>,
    /// Explanation when the margin is undefined
    pub note: String,
}

impl ParametricEngine {
    /// Total assembly value of a linearly additive parameter: the
    /// recursively summed, quantity-weighted values of the parameter over
    /// the assembly's components, rounded; or the stored value when the
    /// assembly has no components.
    pub fn compute_assembly_parameter(&mut self, oid: &str, pid: &str) -> f64 {
        let mut path = Vec::new();
        self.assembly_value(oid, pid, &mut path)
    }

    fn assembly_value(&mut self, oid: &str, pid: &str, path: &mut Vec<String>) -> f64 {
        if path.iter().any(|p| p == oid) {
            debug!(oid = %oid, pid = %pid, "cycle detected, using stored leaf value");
            return self.stored_leaf_value(oid, pid);
        }
        let rows = match self.componentz.get(oid) {
            Some(rows) if !rows.is_empty() => rows.clone(),
            _ => return self.stored_leaf_value(oid, pid),
        };
        path.push(oid.to_string());
        let mut sum = 0.0;
        for row in &rows {
            sum += self.assembly_value(&row.oid, pid, path) * row.quantity as f64;
        }
        path.pop();
        self.round(sum)
    }

    /// The stored value of a parameter at a node, falling back to the base
    /// variable when a context parameter has never been assigned.
    fn stored_leaf_value(&self, oid: &str, pid: &str) -> f64 {
        if let Some(v) = self
            .parameterz
            .get(oid)
            .and_then(|parms| parms.get(pid))
            .and_then(|v| v.as_f64())
        {
            return v;
        }
        let (variable, context) = super::split_pid(pid);
        if context.is_empty() {
            0.0
        } else {
            self.get_pval_f64(oid, &variable)
        }
    }

    /// Maximum expected value of a variable at a node: the recursive sum
    /// of component MEVs when the node has components (also refreshing the
    /// node's contingency), or `CBE x (1 + Ctgcy)` at a leaf, with the
    /// contingency defaulting to 25% when unset.
    pub fn compute_mev(&mut self, oid: &str, variable: &str) -> f64 {
        let mut path = Vec::new();
        self.mev_value(oid, variable, &mut path)
    }

    fn mev_value(&mut self, oid: &str, variable: &str, path: &mut Vec<String>) -> f64 {
        let mev_pid = parameter_id(variable, "MEV");
        if path.iter().any(|p| p == oid) {
            debug!(oid = %oid, variable = %variable, "cycle detected, using stored MEV");
            return self.stored_leaf_value(oid, &mev_pid);
        }
        let cbe_pid = parameter_id(variable, "CBE");
        let ctgcy_pid = parameter_id(variable, "Ctgcy");
        let rows = match self.componentz.get(oid) {
            Some(rows) if !rows.is_empty() => rows.clone(),
            _ => {
                // leaf: MEV = CBE x (1 + Ctgcy)
                let mut ctgcy = self.get_pval_f64(oid, &ctgcy_pid);
                if ctgcy != 0.0 {
                    ctgcy = round_to(ctgcy, 3);
                } else {
                    ctgcy = DEFAULT_CONTINGENCY;
                    self.insert_pval(oid, &ctgcy_pid, Value::from(ctgcy));
                }
                let cbe = self.stored_leaf_value(oid, &cbe_pid);
                return self.round(cbe * (1.0 + ctgcy));
            }
        };
        path.push(oid.to_string());
        let mut sum = 0.0;
        for row in &rows {
            sum += self.mev_value(&row.oid, variable, path) * row.quantity as f64;
        }
        path.pop();
        let mev = self.round(sum);
        let cbe = self.get_pval_f64(oid, &cbe_pid);
        if cbe > 0.0 {
            let ctgcy = round_to((mev - cbe) / cbe, 3);
            self.insert_pval(oid, &ctgcy_pid, Value::from(ctgcy));
        }
        mev
    }

    /// Compute and cache the value of one computed parameter; returns the
    /// cached value for non-computed parameters.
    pub fn compute_pval(&mut self, oid: &str, variable: &str, context: &str) -> f64 {
        let pid = parameter_id(variable, context);
        let computed = self
            .parm_defz
            .get(&pid)
            .map(|d| d.computed)
            .unwrap_or(false);
        if !computed {
            return self.get_pval_f64(oid, &pid);
        }
        let val = match context {
            "CBE" => self.compute_assembly_parameter(oid, &pid),
            "MEV" => self.compute_mev(oid, variable),
            // margins are refreshed by the margin pass of recompute
            "Margin" => return self.get_pval_f64(oid, &pid),
            // any other computed context rolls up like an assembly value
            _ => self.compute_assembly_parameter(oid, &pid),
        };
        self.insert_pval(oid, &pid, Value::from(val));
        val
    }

    /// Margin of the first `maximum` requirement constraining a variable
    /// at a usage: `(NTE - MEV) / NTE` with the NTE converted to SI base
    /// units. `None` (undefined) when no such requirement exists, the
    /// constraint is not a maximum, or the MEV is zero.
    pub fn compute_margin(&mut self, usage_oid: &str, variable: &str) -> Option<f64> {
        let rqt_oids = self.constraining_requirements(usage_oid, variable);
        let rqt_oid = rqt_oids.first()?;
        let result = self.compute_requirement_margin(rqt_oid);
        result.margin
    }

    /// Full margin computation for one requirement
    pub fn compute_requirement_margin(&mut self, rqt_oid: &str) -> RequirementMargin {
        let Some(alloc) = self.rqt_allocz.get(rqt_oid).cloned() else {
            return RequirementMargin {
                usage_oid: None,
                pid: None,
                nte: None,
                nte_units: None,
                margin: None,
                note: format!("Requirement {rqt_oid} is not allocated."),
            };
        };
        let Some(pid) = alloc.pid.clone() else {
            return RequirementMargin {
                usage_oid: None,
                pid: None,
                nte: None,
                nte_units: None,
                margin: None,
                note: format!("Requirement {rqt_oid} is not a performance requirement."),
            };
        };
        let Some(constraint) = alloc.constraint.clone() else {
            return RequirementMargin {
                usage_oid: None,
                pid: Some(pid),
                nte: None,
                nte_units: None,
                margin: None,
                note: format!("Requirement {rqt_oid} has no constraint."),
            };
        };
        if constraint.constraint_type != "maximum" {
            // other constraint types are treated as functional for now
            return RequirementMargin {
                usage_oid: None,
                pid: Some(pid),
                nte: None,
                nte_units: None,
                margin: None,
                note: format!(
                    "Constraint type {:?} is not \"maximum\"; margin undefined.",
                    constraint.constraint_type
                ),
            };
        }
        let nte = constraint.max;
        let nte_units = constraint.units.clone();
        let nte_si = match self.units.to_si(nte, &nte_units) {
            Ok(v) => v,
            Err(_) => {
                return RequirementMargin {
                    usage_oid: None,
                    pid: Some(pid),
                    nte: Some(nte),
                    nte_units: Some(nte_units),
                    margin: None,
                    note: "Could not convert NTE units to base units.".to_string(),
                }
            }
        };
        if alloc.obj_oid.is_empty() {
            return RequirementMargin {
                usage_oid: None,
                pid: Some(pid),
                nte: Some(nte),
                nte_units: Some(nte_units),
                margin: None,
                note: "Requirement is not allocated to a usage with an object.".to_string(),
            };
        }
        if alloc.obj_oid == crate::refdata::TBD_OID {
            return RequirementMargin {
                usage_oid: Some(alloc.usage_oid),
                pid: Some(pid),
                nte: Some(nte),
                nte_units: Some(nte_units),
                margin: None,
                note: "Margin cannot be computed for an unknown or TBD object.".to_string(),
            };
        }
        let mev = self.compute_mev(&alloc.obj_oid, &pid);
        self.insert_pval(
            &alloc.obj_oid,
            &parameter_id(&pid, "MEV"),
            Value::from(mev),
        );
        if mev == 0.0 {
            return RequirementMargin {
                usage_oid: Some(alloc.usage_oid),
                pid: Some(pid.clone()),
                nte: Some(nte),
                nte_units: Some(nte_units),
                margin: None,
                note: format!("MEV value for {pid} is 0; cannot compute margin."),
            };
        }
        let margin = self.round((nte_si - mev) / nte_si);
        RequirementMargin {
            usage_oid: Some(alloc.usage_oid),
            pid: Some(pid),
            nte: Some(nte),
            nte_units: Some(nte_units),
            margin: Some(margin),
            note: String::new(),
        }
    }

    /// Recompute all computed parameters for the configured contexts and
    /// variables over the given hardware oids, then refresh all
    /// requirement margins. Derived caches reflect the latest saves after
    /// this returns.
    pub fn recompute(&mut self, hw_oids: &[String], contexts: &[String], variables: &[String]) {
        for context in contexts {
            for variable in variables {
                for oid in hw_oids {
                    self.compute_pval(oid, variable, context);
                }
            }
        }
        // clear previously computed margins and NTEs: requirements may
        // have been deleted or re-allocated
        let mut stale: Vec<(String, String)> = Vec::new();
        for (oid, parms) in &self.parameterz {
            for pid in parms.keys() {
                if pid.ends_with("[Margin]") || pid.ends_with("[NTE]") {
                    stale.push((oid.clone(), pid.clone()));
                }
            }
        }
        for (oid, pid) in stale {
            let mut emptied = false;
            if let Some(parms) = self.parameterz.get_mut(&oid) {
                parms.shift_remove(&pid);
                emptied = parms.is_empty();
            }
            if emptied {
                self.parameterz.shift_remove(&oid);
            }
        }
        // margins for all allocated performance requirements
        let rqt_oids: Vec<String> = self.rqt_allocz.keys().cloned().collect();
        for rqt_oid in rqt_oids {
            let result = self.compute_requirement_margin(&rqt_oid);
            let (Some(usage_oid), Some(pid)) = (result.usage_oid.clone(), result.pid.clone())
            else {
                continue;
            };
            if let Some(margin) = result.margin {
                self.insert_pval(&usage_oid, &parameter_id(&pid, "Margin"), Value::from(margin));
            }
            if let (Some(nte), Some(units)) = (result.nte, result.nte_units.as_deref()) {
                let nte_si = self.units.to_si(nte, units).unwrap_or(nte);
                self.insert_pval(&usage_oid, &parameter_id(&pid, "NTE"), Value::from(nte_si));
            }
        }
        self.sink.on_parameters_recomputed();
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Comp, Constraint, ParmDef, RequirementView, UsageView};
    use super::*;
    use crate::thing::dtstamp;
    use serde_json::json;

    fn def(pid: &str, dims: &str, computed: bool) -> (String, ParmDef) {
        let (variable, context) = super::super::split_pid(pid);
        (
            pid.to_string(),
            ParmDef {
                name: pid.to_string(),
                variable,
                context: if context.is_empty() {
                    None
                } else {
                    Some(context)
                },
                context_type: None,
                description: String::new(),
                dimensions: dims.to_string(),
                range_datatype: "float".to_string(),
                computed,
                mod_datetime: dtstamp(),
            },
        )
    }

    fn engine() -> ParametricEngine {
        let mut e = ParametricEngine::default();
        for (pid, parm_def) in [
            def("m", "mass", false),
            def("m[CBE]", "mass", true),
            def("m[MEV]", "mass", true),
            def("m[Ctgcy]", "", false),
            def("m[Margin]", "percent", true),
            def("m[NTE]", "mass", false),
            def("P", "power", false),
            def("P[CBE]", "power", true),
            def("P[MEV]", "power", true),
            def("P[Ctgcy]", "", false),
        ] {
            e.parm_defz.insert(pid, parm_def);
        }
        e
    }

    fn comp(oid: &str, usage: &str, quantity: i64) -> Comp {
        Comp {
            oid: oid.to_string(),
            usage_oid: usage.to_string(),
            quantity,
            reference_designator: String::new(),
        }
    }

    #[test]
    fn test_two_component_rollup() {
        let mut e = engine();
        e.insert_pval("sc", "m[CBE]", json!(0.0));
        e.insert_pval("a", "m[CBE]", json!(100.0));
        e.insert_pval("b", "m[CBE]", json!(50.0));
        e.refresh_componentz("sc", vec![comp("a", "u1", 1), comp("b", "u2", 2)]);
        let total = e.compute_assembly_parameter("sc", "m[CBE]");
        assert_eq!(total, 200.0);
    }

    #[test]
    fn test_rollup_linearity_nested() {
        let mut e = engine();
        e.insert_pval("a1", "m[CBE]", json!(3.0));
        e.insert_pval("a2", "m[CBE]", json!(4.0));
        e.insert_pval("b", "m[CBE]", json!(50.0));
        e.refresh_componentz("sc", vec![comp("a", "u1", 2), comp("b", "u2", 1)]);
        e.refresh_componentz("a", vec![comp("a1", "u3", 1), comp("a2", "u4", 3)]);
        // a = 3 + 4*3 = 15; sc = 2*15 + 50 = 80
        assert_eq!(e.compute_assembly_parameter("sc", "m[CBE]"), 80.0);
    }

    #[test]
    fn test_leaf_falls_back_to_base_variable() {
        let mut e = engine();
        e.insert_pval("part", "m", json!(7.0));
        assert_eq!(e.compute_assembly_parameter("part", "m[CBE]"), 7.0);
    }

    #[test]
    fn test_mev_leaf_identity() {
        let mut e = engine();
        e.insert_pval("p", "m[CBE]", json!(10.0));
        e.insert_pval("p", "m[Ctgcy]", json!(0.3));
        assert_eq!(e.compute_mev("p", "m"), 13.0);
    }

    #[test]
    fn test_mev_default_contingency() {
        let mut e = engine();
        e.insert_pval("p", "m[CBE]", json!(10.0));
        assert_eq!(e.compute_mev("p", "m"), 12.5);
        // the default is written back to the leaf
        assert_eq!(e.get_pval_f64("p", "m[Ctgcy]"), 0.25);
    }

    #[test]
    fn test_mev_assembly_sets_contingency() {
        let mut e = engine();
        e.insert_pval("sc", "m[CBE]", json!(100.0));
        e.insert_pval("a", "m[CBE]", json!(100.0));
        e.insert_pval("a", "m[Ctgcy]", json!(0.2));
        e.refresh_componentz("sc", vec![comp("a", "u1", 1)]);
        let mev = e.compute_mev("sc", "m");
        assert_eq!(mev, 120.0);
        // Ctgcy(sc) = (120 - 100) / 100
        assert_eq!(e.get_pval_f64("sc", "m[Ctgcy]"), 0.2);
    }

    #[test]
    fn test_cycle_short_circuits() {
        let mut e = engine();
        e.insert_pval("x", "m[CBE]", json!(5.0));
        e.insert_pval("y", "m[CBE]", json!(3.0));
        e.refresh_componentz("x", vec![comp("y", "u1", 1)]);
        e.refresh_componentz("y", vec![comp("x", "u2", 1)]);
        // x rolls up y, whose branch back to x contributes x's stored value
        let val = e.compute_assembly_parameter("x", "m[CBE]");
        assert_eq!(val, 5.0);
        // termination is the property under test for MEV
        let _ = e.compute_mev("x", "m");
    }

    fn allocate(e: &mut ParametricEngine, rqt: &str, usage: &str, obj: &str, max: f64) {
        e.refresh_allocation(&RequirementView {
            oid: rqt.to_string(),
            rqt_type: "performance".to_string(),
            allocated_to: Some(UsageView::System {
                usage_oid: usage.to_string(),
                system_oid: obj.to_string(),
                role: "spacecraft".to_string(),
            }),
            correlated_pid: Some("m".to_string()),
            constraint: Constraint {
                units: "kg".to_string(),
                max,
                constraint_type: "maximum".to_string(),
                ..Constraint::default()
            },
        });
    }

    #[test]
    fn test_requirement_margin() {
        let mut e = engine();
        // leaf system with MEV = 4000: CBE 3200, ctgcy 0.25
        e.insert_pval("sc", "m[CBE]", json!(3200.0));
        e.insert_pval("sc", "m[Ctgcy]", json!(0.25));
        allocate(&mut e, "r1", "psu1", "sc", 5000.0);
        let result = e.compute_requirement_margin("r1");
        assert_eq!(result.usage_oid.as_deref(), Some("psu1"));
        assert_eq!(result.pid.as_deref(), Some("m"));
        assert_eq!(result.nte, Some(5000.0));
        assert_eq!(result.nte_units.as_deref(), Some("kg"));
        assert_eq!(result.margin, Some(0.2));
        assert!(result.note.is_empty());
    }

    #[test]
    fn test_margin_sign() {
        let mut e = engine();
        e.insert_pval("sc", "m[CBE]", json!(4800.0));
        e.insert_pval("sc", "m[Ctgcy]", json!(0.25));
        allocate(&mut e, "r1", "psu1", "sc", 5000.0);
        // MEV = 6000 > NTE = 5000: negative margin
        let result = e.compute_requirement_margin("r1");
        assert!(result.margin.unwrap() < 0.0);
    }

    #[test]
    fn test_margin_undefined_cases() {
        let mut e = engine();
        // unallocated
        let result = e.compute_requirement_margin("ghost");
        assert!(result.margin.is_none());
        assert!(result.note.contains("not allocated"));
        // zero MEV
        allocate(&mut e, "r1", "psu1", "sc", 5000.0);
        let result = e.compute_requirement_margin("r1");
        assert!(result.margin.is_none());
        assert!(result.note.contains("MEV"));
        // non-maximum constraint
        let mut view = RequirementView {
            oid: "r2".to_string(),
            rqt_type: "performance".to_string(),
            allocated_to: Some(UsageView::System {
                usage_oid: "psu2".to_string(),
                system_oid: "sc".to_string(),
                role: "x".to_string(),
            }),
            correlated_pid: Some("m".to_string()),
            constraint: Constraint {
                units: "kg".to_string(),
                min: 1.0,
                constraint_type: "minimum".to_string(),
                ..Constraint::default()
            },
        };
        e.refresh_allocation(&view);
        let result = e.compute_requirement_margin("r2");
        assert!(result.margin.is_none());
        assert!(result.note.contains("maximum"));
        // unconvertible units
        view.oid = "r3".to_string();
        view.constraint.constraint_type = "maximum".to_string();
        view.constraint.units = "florins".to_string();
        e.refresh_allocation(&view);
        let result = e.compute_requirement_margin("r3");
        assert!(result.margin.is_none());
        assert!(result.note.contains("units"));
    }

    #[test]
    fn test_recompute_writes_margins_and_ntes() {
        let mut e = engine();
        e.insert_pval("sc", "m[CBE]", json!(3200.0));
        e.insert_pval("sc", "m[Ctgcy]", json!(0.25));
        allocate(&mut e, "r1", "psu1", "sc", 5000.0);
        e.recompute(
            &["sc".to_string()],
            &["CBE".to_string(), "MEV".to_string()],
            &["m".to_string()],
        );
        assert_eq!(e.get_pval_f64("psu1", "m[Margin]"), 0.2);
        assert_eq!(e.get_pval_f64("psu1", "m[NTE]"), 5000.0);
        assert_eq!(e.get_pval_f64("sc", "m[MEV]"), 4000.0);
        // a second recompute clears and rewrites the same values
        e.recompute(
            &["sc".to_string()],
            &["CBE".to_string(), "MEV".to_string()],
            &["m".to_string()],
        );
        assert_eq!(e.get_pval_f64("psu1", "m[Margin]"), 0.2);
    }
}
