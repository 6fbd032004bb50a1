// Copyright 2025 The OntoCore Authors.

//! Power-mode tables and modal power rollups
//!
//! Each project owns a mode table: the set of modes (activities), the
//! modal context of each system usage per mode, and the modal contexts of
//! component usages grouped under their system usage. A modal context is
//! "Off", "[computed]", or a ParameterContext id selecting a spec power
//! level; "Nominal" selects the CBE level.

use super::{parameter_id, ParametricEngine};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The modal context that computes power from components
pub const COMPUTED_CONTEXT: &str = "[computed]";

/// Mode table of one project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeDefinition {
    /// Modes: mode oid to mode name
    #[serde(default)]
    pub modes: IndexMap<String, String>,
    /// Modal contexts of system usages: usage oid -> mode oid -> context
    #[serde(default)]
    pub systems: IndexMap<String, IndexMap<String, String>>,
    /// Modal contexts of component usages, grouped under system usages:
    /// system usage oid -> component usage oid -> mode oid -> context
    #[serde(default)]
    pub components: IndexMap<String, IndexMap<String, IndexMap<String, String>>>,
}

impl ParametricEngine {
    /// Define a mode for a project
    pub fn define_mode(&mut self, project_oid: &str, mode_oid: &str, name: &str) {
        let table = self.mode_defz.entry(project_oid.to_string()).or_default();
        table
            .modes
            .insert(mode_oid.to_string(), name.to_string());
    }

    /// The modal context of a usage in a mode: from the system table, then
    /// the component tables, then empty.
    pub fn get_modal_context(&self, project_oid: &str, usage_oid: &str, mode_oid: &str) -> String {
        let Some(table) = self.mode_defz.get(project_oid) else {
            return String::new();
        };
        if let Some(modes) = table.systems.get(usage_oid) {
            return modes.get(mode_oid).cloned().unwrap_or_default();
        }
        for comp_modes in table.components.values() {
            if let Some(modes) = comp_modes.get(usage_oid) {
                return modes.get(mode_oid).cloned().unwrap_or_default();
            }
        }
        String::new()
    }

    /// Set the modal context of a system usage for a mode
    pub fn set_modal_context(
        &mut self,
        project_oid: &str,
        usage_oid: &str,
        mode_oid: &str,
        level: &str,
    ) {
        let table = self.mode_defz.entry(project_oid.to_string()).or_default();
        table
            .systems
            .entry(usage_oid.to_string())
            .or_default()
            .insert(mode_oid.to_string(), level.to_string());
    }

    /// Set the modal context of a component usage of a system usage for a
    /// mode. The system usage itself is marked "[computed]".
    pub fn set_comp_modal_context(
        &mut self,
        project_oid: &str,
        sys_usage_oid: &str,
        usage_oid: &str,
        mode_oid: &str,
        level: &str,
    ) {
        let table = self.mode_defz.entry(project_oid.to_string()).or_default();
        table
            .systems
            .entry(sys_usage_oid.to_string())
            .or_default()
            .insert(mode_oid.to_string(), COMPUTED_CONTEXT.to_string());
        table
            .components
            .entry(sys_usage_oid.to_string())
            .or_default()
            .entry(usage_oid.to_string())
            .or_default()
            .insert(mode_oid.to_string(), level.to_string());
    }

    /// Modal power of a product in a mode, per its modal context:
    /// a ParameterContext id selects the stored spec power level; "Off" is
    /// zero; "[computed]" recurses over the product's components, looking
    /// up each component usage's own context (first in the component table
    /// of the system usage, then in the system table, else "Off").
    pub fn get_modal_power(
        &self,
        project_oid: &str,
        sys_usage_oid: &str,
        oid: &str,
        mode_oid: &str,
        modal_context: &str,
        units: &str,
    ) -> f64 {
        match modal_context {
            "Off" => 0.0,
            "Nominal" => self.get_pval_in_units(oid, "P[CBE]", units),
            COMPUTED_CONTEXT => {
                let Some(table) = self.mode_defz.get(project_oid) else {
                    return 0.0;
                };
                let comp_table = table.components.get(sys_usage_oid);
                let rows = self.componentz.get(oid);
                match (comp_table, rows) {
                    (Some(comp_modes), Some(rows)) if !rows.is_empty() => {
                        let mut sum = 0.0;
                        for row in rows {
                            let context = comp_modes
                                .get(&row.usage_oid)
                                .and_then(|m| m.get(mode_oid).cloned())
                                .or_else(|| {
                                    table
                                        .systems
                                        .get(&row.usage_oid)
                                        .and_then(|m| m.get(mode_oid).cloned())
                                })
                                .unwrap_or_else(|| "Off".to_string());
                            let context = if context == "Nominal" {
                                "CBE".to_string()
                            } else {
                                context
                            };
                            let val = match context.as_str() {
                                "Off" => 0.0,
                                COMPUTED_CONTEXT => self.get_modal_power(
                                    project_oid,
                                    &row.usage_oid,
                                    &row.oid,
                                    mode_oid,
                                    COMPUTED_CONTEXT,
                                    units,
                                ),
                                level => self.get_pval_in_units(
                                    &row.oid,
                                    &parameter_id("P", level),
                                    units,
                                ),
                            };
                            sum += val * row.quantity as f64;
                        }
                        self.round(sum)
                    }
                    // no components known: fall back to the spec value
                    _ => self.get_pval_in_units(oid, &parameter_id("P", modal_context), units),
                }
            }
            level => self.get_pval_in_units(oid, &parameter_id("P", level), units),
        }
    }

    /// Power mode value of a usage in a mode, in base units or the units
    /// requested. Missing modal contexts are backfilled as "Off".
    pub fn get_usage_mode_val(
        &mut self,
        project_oid: &str,
        usage_oid: &str,
        oid: &str,
        mode_oid: &str,
        units: &str,
    ) -> f64 {
        let context = {
            let Some(table) = self.mode_defz.get_mut(project_oid) else {
                debug!(project = %project_oid, "project has no modes defined");
                return 0.0;
            };
            if !table.modes.contains_key(mode_oid) {
                debug!(mode = %mode_oid, "mode is not defined for the project");
                return 0.0;
            }
            if table.systems.is_empty() {
                debug!(project = %project_oid, "no systems have modes defined");
                return 0.0;
            }
            if let Some(modes) = table.systems.get_mut(usage_oid) {
                Some(
                    modes
                        .entry(mode_oid.to_string())
                        .or_insert_with(|| "Off".to_string())
                        .clone(),
                )
            } else {
                // not a system usage: look for it as a component usage
                let mut found: Option<String> = None;
                for comp_modes in table.components.values_mut() {
                    if let Some(modes) = comp_modes.get_mut(usage_oid) {
                        found = Some(
                            modes
                                .entry(mode_oid.to_string())
                                .or_insert_with(|| "Off".to_string())
                                .clone(),
                        );
                        break;
                    }
                }
                found
            }
        };
        match context {
            Some(context) => {
                self.get_modal_power(project_oid, usage_oid, oid, mode_oid, &context, units)
            }
            None => {
                debug!(usage = %usage_oid, "no modes defined for usage");
                0.0
            }
        }
    }
}
