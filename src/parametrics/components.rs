// Copyright 2025 The OntoCore Authors.

//! Assembly and system indices
//!
//! `componentz` is the authoritative source of assembly structure for
//! recomputation: it must be refreshed for the affected assembly after any
//! create/modify/delete of a component usage, before rollups run.
//! `systemz` plays the same role for project-level systems.

use super::ParametricEngine;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One component row of an assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comp {
    /// oid of the component product
    pub oid: String,
    /// oid of the Acu linking component to assembly
    pub usage_oid: String,
    /// Number of occurrences
    pub quantity: i64,
    /// Positional designator within the assembly
    #[serde(default)]
    pub reference_designator: String,
}

/// One system row of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemUsage {
    /// oid of the system product
    pub oid: String,
    /// oid of the ProjectSystemUsage
    pub usage_oid: String,
    /// Role of the system in the project
    #[serde(default)]
    pub system_role: String,
}

impl ParametricEngine {
    /// Replace the component rows of an assembly
    pub fn refresh_componentz(&mut self, assembly_oid: &str, rows: Vec<Comp>) {
        debug!(assembly = %assembly_oid, components = rows.len(), "componentz refreshed");
        self.componentz.insert(assembly_oid.to_string(), rows);
    }

    /// Append one component row pending a full refresh (used while
    /// deserializing usages)
    pub fn append_component(&mut self, assembly_oid: &str, row: Comp) {
        let rows = self.componentz.entry(assembly_oid.to_string()).or_default();
        if !rows.iter().any(|r| r.usage_oid == row.usage_oid) {
            rows.push(row);
        }
    }

    /// Drop an assembly from the component index
    pub fn remove_assembly(&mut self, assembly_oid: &str) {
        self.componentz.shift_remove(assembly_oid);
    }

    /// Replace the system rows of a project
    pub fn refresh_systemz(&mut self, project_oid: &str, rows: Vec<SystemUsage>) {
        debug!(project = %project_oid, systems = rows.len(), "systemz refreshed");
        self.systemz.insert(project_oid.to_string(), rows);
    }

    /// Append one system row pending a full refresh
    pub fn append_system(&mut self, project_oid: &str, row: SystemUsage) {
        let rows = self.systemz.entry(project_oid.to_string()).or_default();
        if !rows.iter().any(|r| r.usage_oid == row.usage_oid) {
            rows.push(row);
        }
    }

    /// Count the nodes in an assembly tree. Cycles make this explode, so
    /// callers must have checked for them first.
    pub fn node_count(&self, product_oid: &str) -> usize {
        let mut count = 0;
        if let Some(rows) = self.componentz.get(product_oid) {
            count += rows.len();
            for row in rows {
                count += self.node_count(&row.oid);
            }
        }
        count
    }

    /// Count the nodes across all systems of a project
    pub fn project_node_count(&self, project_oid: &str) -> usize {
        let mut count = 0;
        if let Some(rows) = self.systemz.get(project_oid) {
            count += rows.len();
            for row in rows {
                count += self.node_count(&row.oid);
            }
        }
        count
    }

    /// Number of units of a product within an assembly, 1 when not found
    pub fn flight_units(&self, product_oid: &str, assembly_oid: &str) -> i64 {
        self.componentz
            .get(assembly_oid)
            .and_then(|rows| rows.iter().find(|r| r.oid == product_oid))
            .map(|r| r.quantity)
            .unwrap_or(1)
    }
}
