// Copyright 2025 The OntoCore Authors.

//! Runtime configuration, state, and user preference structures
//!
//! These replace the ad-hoc configuration dictionaries of typical modeling
//! tools with typed, serde-backed structures. `Config` is installation
//! configuration, `State` is mutable session state, and `Prefs` holds user
//! display preferences. All three are plain data; they are owned by the
//! [`Core`](crate::core::Core) value and snapshotted alongside the caches.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Numeric display formats for parameter values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NumericFormat {
    /// Group thousands with commas (the default)
    #[default]
    #[serde(rename = "Thousands Commas")]
    ThousandsCommas,
    /// Plain decimal output
    #[serde(rename = "No Commas")]
    NoCommas,
    /// Scientific notation with 4 fractional digits
    #[serde(rename = "Scientific Notation")]
    ScientificNotation,
}

/// Installation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Grants full local permissions; never use in a synced installation
    pub local_admin: bool,
    /// Data element ids assigned to every new HardwareProduct
    pub default_data_elements: Vec<String>,
    /// Contexts recomputed eagerly after saves
    pub descriptive_contexts: Vec<String>,
    /// Variables recomputed eagerly after saves
    pub variables: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_admin: false,
            default_data_elements: vec![
                "TRL".to_string(),
                "Vendor".to_string(),
                "reference_missions".to_string(),
            ],
            descriptive_contexts: vec!["CBE".to_string(), "MEV".to_string()],
            variables: vec!["m".to_string(), "P".to_string(), "R_D".to_string()],
        }
    }
}

/// Mutable session state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct State {
    /// Parameter ids assigned by default to new products
    pub default_parms: Vec<String>,
    /// Data element ids assigned by default to new products
    pub default_data_elements: Vec<String>,
    /// Default numeric values keyed by parameter id, seeded on first add
    pub p_defaults: HashMap<String, f64>,
    /// Default values keyed by data element id, seeded on first add
    pub de_defaults: HashMap<String, serde_json::Value>,
    /// Schema version of the home directory contents
    pub schema_version: String,
    /// oid of the local user's Person object
    pub local_user_oid: String,
    /// True on a client node, false on the server
    pub client: bool,
    /// True when the client is connected to the server
    pub connected: bool,
    /// oids of objects known to have been synced to the server
    pub synced_oids: HashSet<String>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            default_parms: vec!["m".to_string(), "P".to_string(), "R_D".to_string()],
            default_data_elements: Vec::new(),
            p_defaults: HashMap::new(),
            de_defaults: HashMap::new(),
            schema_version: crate::migration::SCHEMA_VERSION.to_string(),
            local_user_oid: String::new(),
            client: true,
            connected: false,
            synced_oids: HashSet::new(),
        }
    }
}

impl State {
    /// True on the server, or on a client that is currently connected
    pub fn server_or_connected(&self) -> bool {
        !self.client || self.connected
    }

    /// True if the object has never been synced to the server
    pub fn never_synced(&self, oid: &str) -> bool {
        !self.synced_oids.contains(oid)
    }
}

/// User display preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefs {
    /// Preferred display units keyed by dimension name
    pub units: HashMap<String, String>,
    /// Numeric display format
    pub numeric_format: NumericFormat,
    /// Significant digits used when rounding for display and rollups
    pub numeric_precision: usize,
    /// User-preferred default parameter ids (overrides state defaults)
    pub default_parms: Vec<String>,
}

impl Default for Prefs {
    fn default() -> Self {
        Self {
            units: HashMap::new(),
            numeric_format: NumericFormat::default(),
            numeric_precision: 4,
            default_parms: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.local_admin);
        assert_eq!(config.variables, vec!["m", "P", "R_D"]);
        assert_eq!(config.descriptive_contexts, vec!["CBE", "MEV"]);

        let prefs = Prefs::default();
        assert_eq!(prefs.numeric_precision, 4);
        assert_eq!(prefs.numeric_format, NumericFormat::ThousandsCommas);
    }

    #[test]
    fn test_numeric_format_serde_names() {
        let json = serde_json::to_string(&NumericFormat::ScientificNotation).unwrap();
        assert_eq!(json, "\"Scientific Notation\"");
        let back: NumericFormat = serde_json::from_str("\"No Commas\"").unwrap();
        assert_eq!(back, NumericFormat::NoCommas);
    }

    #[test]
    fn test_state_sync_helpers() {
        let mut state = State::default();
        assert!(!state.server_or_connected());
        state.connected = true;
        assert!(state.server_or_connected());
        state.client = false;
        state.connected = false;
        assert!(state.server_or_connected());

        state.synced_oids.insert("a".to_string());
        assert!(!state.never_synced("a"));
        assert!(state.never_synced("b"));
    }

    #[test]
    fn test_state_round_trip() {
        let mut state = State::default();
        state.p_defaults.insert("m[Ctgcy]".to_string(), 0.25);
        state.local_user_oid = "test:me".to_string();
        let json = serde_json::to_string(&state).unwrap();
        let back: State = serde_json::from_str(&json).unwrap();
        assert_eq!(back.p_defaults.get("m[Ctgcy]"), Some(&0.25));
        assert_eq!(back.local_user_oid, "test:me");
    }
}
