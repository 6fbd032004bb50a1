// Copyright 2025 The OntoCore Authors.

//! Parameter and data-element value getters and setters
//!
//! Getters never error: a missing definition yields 0.0 and a missing
//! value yields the type-appropriate null. Setters refuse computed or
//! undefined parameters, coerce to the declared datatype, and convert
//! supplied units to SI base; a units parse failure falls back to SI with
//! a diagnostic.

use super::{split_pid, ParametricEngine};
use crate::config::NumericFormat;
use crate::errors::ParameterError;
use serde_json::Value;
use tracing::debug;

/// The null value for a range datatype name
pub fn null_for(datatype: &str) -> Value {
    match datatype {
        "int" | "long" => Value::from(0),
        "str" | "text" => Value::String(String::new()),
        "bool" | "boolean" => Value::Bool(false),
        _ => Value::from(0.0),
    }
}

/// Cast a JSON value to a range datatype, treating empty input as null
fn cast_to(datatype: &str, value: Value) -> Result<Value, String> {
    let is_null = matches!(&value, Value::Null)
        || matches!(&value, Value::String(s) if s.is_empty());
    if is_null {
        return Ok(null_for(datatype));
    }
    match datatype {
        "int" | "long" => match &value {
            Value::Number(n) => Ok(Value::from(
                n.as_i64()
                    .or_else(|| n.as_f64().map(|f| f as i64))
                    .unwrap_or(0),
            )),
            Value::String(s) => s
                .parse::<f64>()
                .map(|f| Value::from(f as i64))
                .map_err(|_| s.clone()),
            Value::Bool(b) => Ok(Value::from(if *b { 1 } else { 0 })),
            other => Err(other.to_string()),
        },
        "str" | "text" => Ok(match value {
            Value::String(s) => Value::String(s),
            other => Value::String(other.to_string()),
        }),
        "bool" | "boolean" => Ok(match value {
            Value::Bool(b) => Value::Bool(b),
            Value::String(s) => Value::Bool(s == "true" || s == "True" || s == "1"),
            Value::Number(n) => Value::Bool(n.as_f64().unwrap_or(0.0) != 0.0),
            _ => Value::Bool(false),
        }),
        _ => match &value {
            Value::Number(n) => Ok(Value::from(n.as_f64().unwrap_or(0.0))),
            Value::String(s) => s
                .parse::<f64>()
                .map(Value::from)
                .map_err(|_| s.clone()),
            Value::Bool(b) => Ok(Value::from(if *b { 1.0 } else { 0.0 })),
            other => Err(other.to_string()),
        },
    }
}

impl ParametricEngine {
    /// Cached parameter value in SI base units.
    ///
    /// Missing definitions yield 0.0; missing values yield the type null.
    pub fn get_pval(&self, oid: &str, pid: &str) -> Value {
        let Some(def) = self.parm_defz.get(pid) else {
            return Value::from(0.0);
        };
        self.parameterz
            .get(oid)
            .and_then(|parms| parms.get(pid))
            .cloned()
            .unwrap_or_else(|| null_for(&def.range_datatype))
    }

    /// Cached parameter value as f64, in SI base units
    pub fn get_pval_f64(&self, oid: &str, pid: &str) -> f64 {
        self.get_pval(oid, pid).as_f64().unwrap_or(0.0)
    }

    /// Cached parameter value converted to the requested units.
    ///
    /// `percent` dimensions multiply the stored value by 100; `money`
    /// rounds to two decimals; everything else routes through the unit
    /// service. Conversion failure falls back to the SI base value.
    pub fn get_pval_in_units(&self, oid: &str, pid: &str, units: &str) -> f64 {
        let Some(def) = self.parm_defz.get(pid) else {
            return 0.0;
        };
        let base = self.get_pval_f64(oid, pid);
        match def.dimensions.as_str() {
            "percent" => 100.0 * base,
            "money" => (base * 100.0).round() / 100.0,
            _ => {
                if units.is_empty() {
                    return base;
                }
                match self.units.from_si(base, units) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!(pid = %pid, units = %units, error = %e, "unit conversion failed");
                        base
                    }
                }
            }
        }
    }

    /// Cached parameter value as a display string, honoring the numeric
    /// format and precision preferences.
    pub fn get_pval_as_str(&self, oid: &str, pid: &str, units: &str) -> String {
        let Some(def) = self.parm_defz.get(pid) else {
            return "0".to_string();
        };
        match def.range_datatype.as_str() {
            "int" | "long" | "float" => {
                let val = self.get_pval_in_units(oid, pid, units);
                format_numeric(self.round(val), self.numeric_format)
            }
            _ => match self.get_pval(oid, pid) {
                Value::String(s) => s,
                other => other.to_string(),
            },
        }
    }

    /// Add a parameter slot to an object with a default value, seeded from
    /// `p_defaults` when configured. No-op if the slot already exists;
    /// false if the id has no definition.
    pub fn add_parameter(&mut self, oid: &str, pid: &str) -> bool {
        let Some(def) = self.parm_defz.get(pid) else {
            debug!(pid = %pid, "not in parm_defz; not adding");
            return false;
        };
        let value = match self.p_defaults.get(pid) {
            Some(v) => Value::from(*v),
            None => null_for(&def.range_datatype),
        };
        let parms = self.parameterz.entry(oid.to_string()).or_default();
        parms.entry(pid.to_string()).or_insert(value);
        true
    }

    /// Assign class- and product-type-default parameters missing from an
    /// object.
    pub fn add_default_parameters(
        &mut self,
        oid: &str,
        cname: &str,
        product_type_id: Option<&str>,
        preferred: &[String],
    ) {
        let mut pids: Vec<String> = default_class_parameters(cname)
            .iter()
            .map(|s| s.to_string())
            .collect();
        if cname == "HardwareProduct" {
            for pid in preferred {
                if !pids.contains(pid) {
                    pids.push(pid.clone());
                }
            }
            if let Some(pt) = product_type_id {
                for pid in default_product_type_parameters(pt) {
                    if !pids.iter().any(|p| p == pid) {
                        pids.push(pid.to_string());
                    }
                }
            }
        }
        for pid in pids {
            self.add_parameter(oid, &pid);
        }
    }

    /// Set a parameter value, converting from the supplied units to SI
    /// base. Refuses computed parameters and unknown ids.
    pub fn set_pval(
        &mut self,
        oid: &str,
        pid: &str,
        value: Value,
        units: Option<&str>,
    ) -> Result<(), ParameterError> {
        let def = self
            .parm_defz
            .get(pid)
            .ok_or_else(|| ParameterError::Unknown(pid.to_string()))?;
        if def.computed {
            return Err(ParameterError::Computed(pid.to_string()));
        }
        let datatype = def.range_datatype.clone();
        let cast = cast_to(&datatype, value).map_err(|raw| ParameterError::BadCast {
            pid: pid.to_string(),
            value: raw,
            datatype: datatype.clone(),
        })?;
        let converted = match (units, cast.as_f64()) {
            (Some(u), Some(magnitude)) if !u.is_empty() && u != "$" && u != "%" => {
                match self.units.to_si(magnitude, u) {
                    Ok(si) => {
                        if datatype == "int" || datatype == "long" {
                            Value::from(si as i64)
                        } else {
                            Value::from(si)
                        }
                    }
                    Err(e) => {
                        // units parse failure: assume base units
                        debug!(pid = %pid, units = %u, error = %e, "units not parsed, using SI base");
                        cast
                    }
                }
            }
            _ => cast,
        };
        if !self.parameterz.contains_key(oid)
            || !self.parameterz.get(oid).is_some_and(|p| p.contains_key(pid))
        {
            self.add_parameter(oid, pid);
        }
        self.parameterz
            .entry(oid.to_string())
            .or_default()
            .insert(pid.to_string(), converted);
        self.sink.on_parameter_changed(oid, pid);
        Ok(())
    }

    /// Set a parameter from a string value, honoring the numeric format
    /// (commas stripped) and the percent convention (input is percentage
    /// points, stored as a fraction).
    pub fn set_pval_from_str(
        &mut self,
        oid: &str,
        pid: &str,
        raw: &str,
        units: Option<&str>,
    ) -> Result<(), ParameterError> {
        let def = self
            .parm_defz
            .get(pid)
            .ok_or_else(|| ParameterError::Unknown(pid.to_string()))?;
        let datatype = def.range_datatype.clone();
        let dims = def.dimensions.clone();
        let value = if datatype == "int" || datatype == "long" || datatype == "float" {
            let cleaned = match self.numeric_format {
                NumericFormat::ThousandsCommas => raw.replace(',', ""),
                _ => raw.to_string(),
            };
            let cleaned = if cleaned.is_empty() {
                "0".to_string()
            } else {
                cleaned
            };
            let parsed = cleaned
                .parse::<f64>()
                .map_err(|_| ParameterError::BadCast {
                    pid: pid.to_string(),
                    value: raw.to_string(),
                    datatype: datatype.clone(),
                })?;
            let parsed = if dims == "percent" { 0.01 * parsed } else { parsed };
            Value::from(parsed)
        } else {
            Value::String(raw.to_string())
        };
        self.set_pval(oid, pid, value, units)
    }

    /// Write a parameter value directly, without computed-flag checks or
    /// unit conversion. Used by the recompute pass and the deserializer,
    /// whose inputs are already SI base values.
    pub fn insert_pval(&mut self, oid: &str, pid: &str, value: Value) {
        self.parameterz
            .entry(oid.to_string())
            .or_default()
            .insert(pid.to_string(), value);
    }

    /// Delete a parameter from an object and signal the sink
    pub fn delete_parameter(&mut self, oid: &str, pid: &str) {
        let removed = self
            .parameterz
            .get_mut(oid)
            .and_then(|parms| parms.shift_remove(pid));
        if removed.is_some() {
            self.sink.on_parameter_deleted(oid, pid);
        }
    }

    /// Drop every parameter and data element of an object
    pub fn purge_object(&mut self, oid: &str) {
        self.parameterz.shift_remove(oid);
        self.data_elementz.shift_remove(oid);
    }

    /// Cached data element value; missing values yield the type null
    pub fn get_dval(&self, oid: &str, deid: &str) -> Value {
        let Some(def) = self.de_defz.get(deid) else {
            return Value::String("-".to_string());
        };
        self.data_elementz
            .get(oid)
            .and_then(|des| des.get(deid))
            .cloned()
            .unwrap_or_else(|| null_for(&def.range_datatype))
    }

    /// Cached data element value as a display string
    pub fn get_dval_as_str(&self, oid: &str, deid: &str) -> String {
        match self.get_dval(oid, deid) {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }

    /// Add a data element slot to an object with a default value
    pub fn add_data_element(&mut self, oid: &str, deid: &str) -> bool {
        let Some(def) = self.de_defz.get(deid) else {
            debug!(deid = %deid, "not in de_defz; not adding");
            return false;
        };
        let value = match self.de_defaults.get(deid) {
            Some(v) => v.clone(),
            None => null_for(&def.range_datatype),
        };
        let des = self.data_elementz.entry(oid.to_string()).or_default();
        des.entry(deid.to_string()).or_insert(value);
        true
    }

    /// Assign class- and product-type-default data elements missing from
    /// an object.
    pub fn add_default_data_elements(
        &mut self,
        oid: &str,
        cname: &str,
        product_type_id: Option<&str>,
        configured: &[String],
    ) {
        let mut deids: Vec<String> = default_class_data_elements(cname)
            .iter()
            .map(|s| s.to_string())
            .collect();
        if cname == "HardwareProduct" {
            for deid in configured {
                if !deids.contains(deid) {
                    deids.push(deid.clone());
                }
            }
            if let Some(pt) = product_type_id {
                for deid in default_product_type_data_elements(pt) {
                    if !deids.iter().any(|d| d == deid) {
                        deids.push(deid.to_string());
                    }
                }
            }
        }
        for deid in deids {
            self.add_data_element(oid, &deid);
        }
    }

    /// Set a data element value, cast to its declared datatype
    pub fn set_dval(&mut self, oid: &str, deid: &str, value: Value) -> Result<(), ParameterError> {
        let def = self
            .de_defz
            .get(deid)
            .ok_or_else(|| ParameterError::Unknown(deid.to_string()))?;
        let datatype = def.range_datatype.clone();
        let cast = cast_to(&datatype, value).map_err(|raw| ParameterError::BadCast {
            pid: deid.to_string(),
            value: raw,
            datatype,
        })?;
        self.data_elementz
            .entry(oid.to_string())
            .or_default()
            .insert(deid.to_string(), cast);
        self.sink.on_data_element_changed(oid, deid);
        Ok(())
    }

    /// Delete a data element from an object and signal the sink
    pub fn delete_data_element(&mut self, oid: &str, deid: &str) {
        let removed = self
            .data_elementz
            .get_mut(oid)
            .and_then(|des| des.shift_remove(deid));
        if removed.is_some() {
            self.sink.on_data_element_deleted(oid, deid);
        }
    }

    /// Apply a serialized `parameters` dictionary to an object.
    ///
    /// Values arrive in SI base units. The older dict-shaped form
    /// (`{"value": ..., "units": ...}`) is auto-migrated. Ids defined as
    /// data elements land in the data-element cache (some were defined as
    /// parameters historically); undefined ids are dropped.
    pub fn deserialize_parms(&mut self, oid: &str, ser_parms: &serde_json::Map<String, Value>) {
        for (pid, raw) in ser_parms {
            let value = match raw {
                Value::Object(old) => old.get("value").cloned().unwrap_or(Value::Null),
                other => other.clone(),
            };
            if self.parm_defz.contains_key(pid) {
                self.insert_pval(oid, pid, value);
            } else if self.de_defz.contains_key(pid) {
                self.data_elementz
                    .entry(oid.to_string())
                    .or_default()
                    .insert(pid.clone(), value);
                if let Some(parms) = self.parameterz.get_mut(oid) {
                    parms.shift_remove(pid);
                }
            } else {
                debug!(pid = %pid, "undefined id found in parameters, dropped");
                if let Some(parms) = self.parameterz.get_mut(oid) {
                    parms.shift_remove(pid);
                }
                if let Some(des) = self.data_elementz.get_mut(oid) {
                    des.shift_remove(pid);
                }
            }
        }
    }

    /// Apply a serialized `data_elements` dictionary to an object,
    /// auto-migrating the older dict-shaped form. Undefined ids are
    /// dropped.
    pub fn deserialize_des(&mut self, oid: &str, ser_des: &serde_json::Map<String, Value>) {
        for (deid, raw) in ser_des {
            let value = match raw {
                Value::Object(old) => old.get("value").cloned().unwrap_or(Value::Null),
                other => other.clone(),
            };
            if self.de_defz.contains_key(deid) {
                self.data_elementz
                    .entry(oid.to_string())
                    .or_default()
                    .insert(deid.clone(), value);
            } else {
                debug!(deid = %deid, "undefined id found in data elements, dropped");
                if let Some(des) = self.data_elementz.get_mut(oid) {
                    des.shift_remove(deid);
                }
            }
        }
    }

    /// True if the parameter id names a computed parameter
    pub fn is_computed(&self, pid: &str) -> bool {
        self.parm_defz.get(pid).is_some_and(|d| d.computed)
    }

    /// The contexts of all power parameters assigned to an object, with an
    /// "Off" level prepended. Used to populate mode selectors.
    pub fn power_contexts(&self, oid: &str) -> Vec<String> {
        let mut contexts = vec!["Off".to_string()];
        if let Some(parms) = self.parameterz.get(oid) {
            for pid in parms.keys() {
                let (variable, context) = split_pid(pid);
                if variable == "P"
                    && !context.is_empty()
                    && context != "MEV"
                    && context != "Ctgcy"
                    && !contexts.contains(&context)
                {
                    contexts.push(context);
                }
            }
        }
        contexts
    }
}

/// Format a number per the display format preference
pub fn format_numeric(val: f64, format: NumericFormat) -> String {
    match format {
        NumericFormat::ScientificNotation => format!("{val:.4e}"),
        NumericFormat::NoCommas => trim_float(val),
        NumericFormat::ThousandsCommas => {
            let plain = trim_float(val);
            let (sign, rest) = plain
                .strip_prefix('-')
                .map(|r| ("-", r))
                .unwrap_or(("", plain.as_str()));
            let (int_part, frac_part) = match rest.split_once('.') {
                Some((i, f)) => (i, Some(f)),
                None => (rest, None),
            };
            let mut grouped = String::new();
            let digits: Vec<char> = int_part.chars().collect();
            for (i, ch) in digits.iter().enumerate() {
                if i > 0 && (digits.len() - i) % 3 == 0 {
                    grouped.push(',');
                }
                grouped.push(*ch);
            }
            match frac_part {
                Some(f) => format!("{sign}{grouped}.{f}"),
                None => format!("{sign}{grouped}"),
            }
        }
    }
}

fn trim_float(val: f64) -> String {
    if val.fract() == 0.0 && val.abs() < 1e15 {
        format!("{}", val as i64)
    } else {
        format!("{val}")
    }
}

/// Default parameters assigned to new objects, by class
fn default_class_parameters(cname: &str) -> &'static [&'static str] {
    match cname {
        "HardwareProduct" => &[
            "m",
            "m[CBE]",
            "m[Ctgcy]",
            "m[MEV]",
            "P",
            "P[CBE]",
            "P[Ctgcy]",
            "P[MEV]",
            "P[peak]",
            "P[standby]",
            "P[survival]",
            "R_D",
            "R_D[CBE]",
            "R_D[Ctgcy]",
            "R_D[MEV]",
            "Cost",
            "height",
            "width",
            "depth",
        ],
        "Mission" => &["duration"],
        "Activity" => &["duration", "t_start", "t_end"],
        _ => &[],
    }
}

/// Default parameters assigned to hardware by product type
fn default_product_type_parameters(product_type_id: &str) -> &'static [&'static str] {
    match product_type_id {
        "antenna" | "omni_antenna" | "high_gain_antenna" | "medium_gain_antenna" => {
            &["Gain_antenna"]
        }
        "thermostat" | "temperature_sensor" => &["T[max]", "T[min]"],
        "transponder" | "transmitter" | "receiver" => &["f_downlink", "f_uplink"],
        _ => &[],
    }
}

/// Default data elements assigned to new objects, by class
fn default_class_data_elements(cname: &str) -> &'static [&'static str] {
    match cname {
        "HardwareProduct" => &["Vendor", "TRL", "reference_missions"],
        _ => &[],
    }
}

/// Default data elements assigned to hardware by product type
fn default_product_type_data_elements(product_type_id: &str) -> &'static [&'static str] {
    match product_type_id {
        "heater" => &["mounting_material"],
        "heat_pipe" => &["working_fluid", "extrusion"],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::super::{DeDef, ParmDef};
    use super::*;
    use crate::thing::dtstamp;
    use serde_json::json;

    fn engine_with_defs() -> ParametricEngine {
        let mut engine = ParametricEngine::default();
        for (pid, dims, computed) in [
            ("m", "mass", false),
            ("m[CBE]", "mass", true),
            ("m[Ctgcy]", "", false),
            ("pct", "percent", false),
            ("Cost", "money", false),
        ] {
            engine.parm_defz.insert(
                pid.to_string(),
                ParmDef {
                    name: pid.to_string(),
                    variable: pid.split('[').next().unwrap().to_string(),
                    context: None,
                    context_type: None,
                    description: String::new(),
                    dimensions: dims.to_string(),
                    range_datatype: "float".to_string(),
                    computed,
                    mod_datetime: dtstamp(),
                },
            );
        }
        engine
    }

    #[test]
    fn test_missing_definition_yields_zero() {
        let engine = ParametricEngine::default();
        assert_eq!(engine.get_pval("x", "nope"), json!(0.0));
        assert_eq!(engine.get_pval_f64("x", "nope"), 0.0);
    }

    #[test]
    fn test_missing_value_yields_type_null() {
        let engine = engine_with_defs();
        assert_eq!(engine.get_pval("x", "m"), json!(0.0));
    }

    #[test]
    fn test_set_and_get_with_units() {
        let mut engine = engine_with_defs();
        engine.set_pval("x", "m", json!(2500.0), Some("g")).unwrap();
        // stored in SI base units
        assert_eq!(engine.get_pval_f64("x", "m"), 2.5);
        assert_eq!(engine.get_pval_in_units("x", "m", "g"), 2500.0);
    }

    #[test]
    fn test_set_computed_refused() {
        let mut engine = engine_with_defs();
        let err = engine.set_pval("x", "m[CBE]", json!(1.0), None).unwrap_err();
        assert!(matches!(err, ParameterError::Computed(_)));
    }

    #[test]
    fn test_set_unknown_refused() {
        let mut engine = engine_with_defs();
        let err = engine.set_pval("x", "nope", json!(1.0), None).unwrap_err();
        assert!(matches!(err, ParameterError::Unknown(_)));
    }

    #[test]
    fn test_bad_units_falls_back_to_si() {
        let mut engine = engine_with_defs();
        engine
            .set_pval("x", "m", json!(5.0), Some("cubits"))
            .unwrap();
        assert_eq!(engine.get_pval_f64("x", "m"), 5.0);
    }

    #[test]
    fn test_percent_and_money() {
        let mut engine = engine_with_defs();
        engine.set_pval("x", "pct", json!(0.25), None).unwrap();
        assert_eq!(engine.get_pval_in_units("x", "pct", ""), 25.0);
        engine.set_pval("x", "Cost", json!(1234.5678), None).unwrap();
        assert_eq!(engine.get_pval_in_units("x", "Cost", ""), 1234.57);
    }

    #[test]
    fn test_set_from_str_with_commas_and_percent() {
        let mut engine = engine_with_defs();
        engine.set_pval_from_str("x", "m", "1,250", None).unwrap();
        assert_eq!(engine.get_pval_f64("x", "m"), 1250.0);
        engine.set_pval_from_str("x", "pct", "30", None).unwrap();
        assert_eq!(engine.get_pval_f64("x", "pct"), 0.3);
        let err = engine.set_pval_from_str("x", "m", "not-a-number", None);
        assert!(matches!(err, Err(ParameterError::BadCast { .. })));
    }

    #[test]
    fn test_empty_input_is_type_null() {
        let mut engine = engine_with_defs();
        engine.set_pval("x", "m", json!(""), None).unwrap();
        assert_eq!(engine.get_pval("x", "m"), json!(0.0));
    }

    #[test]
    fn test_p_default_seeding() {
        let mut engine = engine_with_defs();
        engine.p_defaults.insert("m[Ctgcy]".to_string(), 0.25);
        engine.add_parameter("x", "m[Ctgcy]");
        assert_eq!(engine.get_pval_f64("x", "m[Ctgcy]"), 0.25);
        // adding again does not clobber
        engine.insert_pval("x", "m[Ctgcy]", json!(0.4));
        engine.add_parameter("x", "m[Ctgcy]");
        assert_eq!(engine.get_pval_f64("x", "m[Ctgcy]"), 0.4);
    }

    #[test]
    fn test_delete_parameter_signals_sink() {
        use crate::events::RecordingSink;
        let mut engine = engine_with_defs();
        engine.set_sink(Box::new(RecordingSink::default()));
        engine.insert_pval("x", "m", json!(1.0));
        engine.delete_parameter("x", "m");
        // deleting a missing slot is silent
        engine.delete_parameter("x", "m");
        assert!(engine.parameterz.get("x").unwrap().get("m").is_none());
    }

    #[test]
    fn test_data_elements() {
        let mut engine = ParametricEngine::default();
        engine.de_defz.insert(
            "Vendor".to_string(),
            DeDef {
                name: "Vendor".to_string(),
                label: String::new(),
                description: String::new(),
                range_datatype: "str".to_string(),
                mod_datetime: dtstamp(),
            },
        );
        assert_eq!(engine.get_dval("x", "Vendor"), json!(""));
        engine.set_dval("x", "Vendor", json!("Acme")).unwrap();
        assert_eq!(engine.get_dval_as_str("x", "Vendor"), "Acme");
        engine.delete_data_element("x", "Vendor");
        assert_eq!(engine.get_dval("x", "Vendor"), json!(""));
        // undefined data elements display a dash
        assert_eq!(engine.get_dval_as_str("x", "nope"), "-");
    }

    #[test]
    fn test_format_numeric() {
        assert_eq!(
            format_numeric(1234567.0, NumericFormat::ThousandsCommas),
            "1,234,567"
        );
        assert_eq!(
            format_numeric(-1234.5, NumericFormat::ThousandsCommas),
            "-1,234.5"
        );
        assert_eq!(format_numeric(1234.0, NumericFormat::NoCommas), "1234");
        assert!(format_numeric(1234.0, NumericFormat::ScientificNotation).contains('e'));
    }

    #[test]
    fn test_deserialize_parms_migrates_old_format() {
        let mut engine = engine_with_defs();
        engine.de_defz.insert(
            "Vendor".to_string(),
            DeDef {
                name: "Vendor".to_string(),
                label: String::new(),
                description: String::new(),
                range_datatype: "str".to_string(),
                mod_datetime: dtstamp(),
            },
        );
        let ser: serde_json::Map<String, serde_json::Value> = serde_json::from_value(json!({
            "m": {"value": 4.5, "units": "kg"},
            "Vendor": "Acme",
            "bogus": 1.0
        }))
        .unwrap();
        engine.deserialize_parms("x", &ser);
        // old dict-shaped value flattened
        assert_eq!(engine.get_pval_f64("x", "m"), 4.5);
        // a data element that arrived among parameters lands in the
        // data-element cache
        assert_eq!(engine.get_dval_as_str("x", "Vendor"), "Acme");
        assert!(engine.parameterz.get("x").unwrap().get("Vendor").is_none());
        // undefined ids are dropped
        assert!(engine.parameterz.get("x").unwrap().get("bogus").is_none());
    }

    #[test]
    fn test_power_contexts() {
        let mut engine = ParametricEngine::default();
        engine.insert_pval("x", "P[peak]", json!(2.0));
        engine.insert_pval("x", "P[MEV]", json!(3.0));
        engine.insert_pval("x", "P[standby]", json!(1.0));
        engine.insert_pval("x", "m[CBE]", json!(1.0));
        let contexts = engine.power_contexts("x");
        assert_eq!(contexts[0], "Off");
        assert!(contexts.contains(&"peak".to_string()));
        assert!(contexts.contains(&"standby".to_string()));
        assert!(!contexts.contains(&"MEV".to_string()));
        assert!(!contexts.contains(&"CBE".to_string()));
    }
}
