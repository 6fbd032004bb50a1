// Copyright 2025 The OntoCore Authors.

//! Requirement allocation index
//!
//! `rqt_allocz` maps each requirement to the usage it is allocated to, the
//! object of that usage, the correlated parameter (through the computable
//! form's ParameterRelation), and the constraint. `allocz` is the converse
//! lookup from usages to requirement oids. The index must be refreshed
//! when a requirement is saved or deleted, when a component usage's
//! component changes, and when a project system usage is saved.

use super::ParametricEngine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Constraint of a performance requirement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Constraint {
    /// Units of the numeric values
    pub units: String,
    /// Target value for `single_value` constraints
    pub target: f64,
    /// Maximum (not-to-exceed) value
    pub max: f64,
    /// Minimum value
    pub min: f64,
    /// Symmetric tolerance
    pub tol: f64,
    /// Upper tolerance when asymmetric
    pub upper: f64,
    /// Lower tolerance when asymmetric
    pub lower: f64,
    /// `single_value`, `maximum`, or `minimum`
    pub constraint_type: String,
    /// `symmetric` or `asymmetric`
    pub tol_type: String,
}

/// One requirement allocation entry
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// oid of the usage (Acu, ProjectSystemUsage, or Project)
    pub usage_oid: String,
    /// oid of the component or system of the usage
    pub obj_oid: String,
    /// Reference designator or system role of the usage
    pub alloc_ref: String,
    /// Correlated parameter id; `None` for functional requirements
    pub pid: Option<String>,
    /// Constraint; `None` for functional requirements
    pub constraint: Option<Constraint>,
}

impl Allocation {
    /// The snapshot row form: `[usage_oid, obj_oid, alloc_ref, pid, constraint]`
    pub fn to_row(&self) -> Value {
        serde_json::json!([
            self.usage_oid,
            self.obj_oid,
            self.alloc_ref,
            self.pid,
            self.constraint,
        ])
    }

    /// Parse the snapshot row form
    pub fn from_row(row: &Value) -> Option<Self> {
        let arr = row.as_array()?;
        if arr.len() != 5 {
            return None;
        }
        Some(Self {
            usage_oid: arr[0].as_str()?.to_string(),
            obj_oid: arr[1].as_str().unwrap_or_default().to_string(),
            alloc_ref: arr[2].as_str().unwrap_or_default().to_string(),
            pid: arr[3].as_str().map(|s| s.to_string()),
            constraint: serde_json::from_value(arr[4].clone()).ok(),
        })
    }
}

/// The usage a requirement is allocated to
#[derive(Debug, Clone, PartialEq)]
pub enum UsageView {
    /// An assembly component usage
    Component {
        /// oid of the Acu
        usage_oid: String,
        /// oid of the component product, empty for TBD
        component_oid: String,
        /// Reference designator (or name/id fallback)
        ref_des: String,
    },
    /// A project system usage
    System {
        /// oid of the ProjectSystemUsage
        usage_oid: String,
        /// oid of the system product
        system_oid: String,
        /// System role (or name/id fallback)
        role: String,
    },
    /// Allocation at project level
    Project {
        /// oid of the project
        oid: String,
        /// id of the project
        id: String,
    },
}

/// The parts of a Requirement the allocation index needs; built by the
/// core from the requirement Thing and its computable-form relation.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementView {
    /// oid of the requirement
    pub oid: String,
    /// `functional` or `performance`
    pub rqt_type: String,
    /// The usage the requirement is allocated to
    pub allocated_to: Option<UsageView>,
    /// Parameter id correlated through the computable form, if any
    pub correlated_pid: Option<String>,
    /// The requirement's constraint values
    pub constraint: Constraint,
}

impl ParametricEngine {
    /// Refresh the allocation entry for one requirement
    pub fn refresh_allocation(&mut self, view: &RequirementView) {
        let Some(usage) = &view.allocated_to else {
            // not allocated: drop any stale entry
            self.remove_allocation(&view.oid);
            return;
        };
        let (usage_oid, obj_oid, alloc_ref) = match usage {
            UsageView::Component {
                usage_oid,
                component_oid,
                ref_des,
            } => (usage_oid.clone(), component_oid.clone(), ref_des.clone()),
            UsageView::System {
                usage_oid,
                system_oid,
                role,
            } => (usage_oid.clone(), system_oid.clone(), role.clone()),
            UsageView::Project { oid, id } => (oid.clone(), oid.clone(), id.clone()),
        };
        let (pid, constraint) = if view.rqt_type == "functional" {
            (None, None)
        } else {
            match &view.correlated_pid {
                // no computable form or no parameter relation: treat as
                // functional
                None => (None, None),
                Some(pid) => (Some(pid.clone()), Some(view.constraint.clone())),
            }
        };
        debug!(rqt = %view.oid, usage = %usage_oid, pid = ?pid, "allocation refreshed");
        self.rqt_allocz.insert(
            view.oid.clone(),
            Allocation {
                usage_oid: usage_oid.clone(),
                obj_oid,
                alloc_ref,
                pid,
                constraint,
            },
        );
        self.reindex_allocz(&view.oid, Some(&usage_oid));
    }

    /// Remove the allocation entry for a requirement
    pub fn remove_allocation(&mut self, rqt_oid: &str) {
        if self.rqt_allocz.shift_remove(rqt_oid).is_some() {
            debug!(rqt = %rqt_oid, "allocation removed");
        }
        self.reindex_allocz(rqt_oid, None);
    }

    /// Requirement oids allocated to a usage
    pub fn allocations_of(&self, usage_oid: &str) -> &[String] {
        self.allocz
            .get(usage_oid)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Requirements allocated to a usage that constrain a variable
    pub fn constraining_requirements(&self, usage_oid: &str, variable: &str) -> Vec<String> {
        self.rqt_allocz
            .iter()
            .filter(|(_, alloc)| {
                alloc.usage_oid == usage_oid && alloc.pid.as_deref() == Some(variable)
            })
            .map(|(oid, _)| oid.clone())
            .collect()
    }

    fn reindex_allocz(&mut self, rqt_oid: &str, usage_oid: Option<&str>) {
        for list in self.allocz.values_mut() {
            list.retain(|r| r != rqt_oid);
        }
        self.allocz.retain(|_, list| !list.is_empty());
        if let Some(usage) = usage_oid {
            self.allocz
                .entry(usage.to_string())
                .or_default()
                .push(rqt_oid.to_string());
        }
    }
}
