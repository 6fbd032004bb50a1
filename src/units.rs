// Copyright 2025 The OntoCore Authors.

//! Units: the boundary to quantity/unit arithmetic
//!
//! Parameter values are always stored in SI base units; conversion happens
//! only at this boundary. The [`UnitService`] trait abstracts the external
//! unit-arithmetic library: parse a magnitude with a unit string into a
//! [`Quantity`], convert a quantity to a target unit. [`StandardUnits`] is
//! the built-in linear-factor implementation covering the reference
//! dimensions; installations with exotic unit needs plug in their own
//! service.

use crate::errors::UnitError;
use std::collections::HashMap;

/// Map a dimension name to its SI base unit symbol
pub fn si_unit(dimension: &str) -> &'static str {
    match dimension {
        "acceleration" => "m/s^2",
        "angle" => "radian",
        "angular velocity" => "radian/s",
        "area" => "m^2",
        "areal density" => "kg/m^2",
        "bitrate" => "bit/s",
        "capacitance" => "F",
        "charge" => "C",
        "data" => "bit",
        "decibels" => "dB",
        "decibels-isotropic" => "dBi",
        "density" => "kg/m^3",
        "electrical current" => "A",
        "electrical potential" => "V",
        "electrical resistance" => "Ohm",
        "energy" => "J",
        "force" => "N",
        "frequency" => "Hz",
        "length" => "m",
        "linear density" => "kg/m",
        "mass" => "kg",
        "moment of inertia" => "kg*m^2",
        "momentum" => "kg*m/s",
        "money" => "$",
        "percent" => "%",
        "power" => "W",
        "pressure" => "Pa",
        "substance" => "mol",
        "surface power density" => "W/m^2",
        "temperature" => "K",
        "time" => "s",
        "torque" => "N*m",
        "velocity" => "m/s",
        "volume" => "m^3",
        _ => "",
    }
}

/// A magnitude with a unit
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    /// Numeric magnitude
    pub magnitude: f64,
    /// Unit symbol
    pub unit: String,
}

/// Service interface for parsing and converting quantities
pub trait UnitService {
    /// Parse a magnitude and unit string into a quantity
    fn parse(&self, magnitude: f64, unit: &str) -> Result<Quantity, UnitError>;

    /// Convert a quantity to the target unit, returning the magnitude
    fn convert(&self, quantity: &Quantity, target_unit: &str) -> Result<f64, UnitError>;

    /// Convert a magnitude in the given unit to its SI base unit
    fn to_si(&self, magnitude: f64, unit: &str) -> Result<f64, UnitError> {
        let q = self.parse(magnitude, unit)?;
        let (_, base) = self.base_of(&q.unit)?;
        self.convert(&q, &base)
    }

    /// Convert a magnitude in SI base units of the dimension of `unit` to
    /// `unit`
    fn from_si(&self, magnitude: f64, unit: &str) -> Result<f64, UnitError> {
        let (_, base) = self.base_of(unit)?;
        self.convert(
            &Quantity {
                magnitude,
                unit: base,
            },
            unit,
        )
    }

    /// The dimension and SI base unit symbol of a unit
    fn base_of(&self, unit: &str) -> Result<(String, String), UnitError>;
}

/// Linear-factor unit table: `unit symbol -> (dimension, factor to SI)`
#[derive(Debug, Clone)]
pub struct StandardUnits {
    factors: HashMap<String, (String, f64)>,
}

impl Default for StandardUnits {
    fn default() -> Self {
        let mut factors = HashMap::new();
        let table: &[(&str, &str, f64)] = &[
            // mass
            ("kg", "mass", 1.0),
            ("g", "mass", 1e-3),
            ("mg", "mass", 1e-6),
            ("ug", "mass", 1e-9),
            ("lb", "mass", 0.453_592_37),
            // power
            ("W", "power", 1.0),
            ("mW", "power", 1e-3),
            ("uW", "power", 1e-6),
            ("kW", "power", 1e3),
            ("MW", "power", 1e6),
            // bitrate
            ("bit/s", "bitrate", 1.0),
            ("kbit/s", "bitrate", 1e3),
            ("Mbit/s", "bitrate", 1e6),
            ("Gbit/s", "bitrate", 1e9),
            ("kB/s", "bitrate", 8e3),
            ("MB/s", "bitrate", 8e6),
            // length
            ("m", "length", 1.0),
            ("km", "length", 1e3),
            ("cm", "length", 1e-2),
            ("mm", "length", 1e-3),
            ("nm", "length", 1e-9),
            ("inch", "length", 0.0254),
            ("foot", "length", 0.3048),
            // area and volume
            ("m^2", "area", 1.0),
            ("cm^2", "area", 1e-4),
            ("mm^2", "area", 1e-6),
            ("m^3", "volume", 1.0),
            ("liter", "volume", 1e-3),
            // time
            ("s", "time", 1.0),
            ("ms", "time", 1e-3),
            ("us", "time", 1e-6),
            ("minute", "time", 60.0),
            ("hour", "time", 3600.0),
            ("day", "time", 86_400.0),
            // frequency
            ("Hz", "frequency", 1.0),
            ("kHz", "frequency", 1e3),
            ("MHz", "frequency", 1e6),
            ("GHz", "frequency", 1e9),
            // electrical
            ("A", "electrical current", 1.0),
            ("mA", "electrical current", 1e-3),
            ("V", "electrical potential", 1.0),
            ("mV", "electrical potential", 1e-3),
            ("kV", "electrical potential", 1e3),
            ("Ohm", "electrical resistance", 1.0),
            // energy, force, pressure
            ("J", "energy", 1.0),
            ("kJ", "energy", 1e3),
            ("N", "force", 1.0),
            ("kN", "force", 1e3),
            ("Pa", "pressure", 1.0),
            ("kPa", "pressure", 1e3),
            // temperature (Kelvin only; affine scales need a richer service)
            ("K", "temperature", 1.0),
            // data
            ("bit", "data", 1.0),
            ("kbit", "data", 1e3),
            ("Mbit", "data", 1e6),
            ("Gbit", "data", 1e9),
            // dimensionless oddments
            ("$", "money", 1.0),
            ("%", "percent", 1.0),
            ("dB", "decibels", 1.0),
            ("dBi", "decibels-isotropic", 1.0),
        ];
        for (unit, dim, factor) in table {
            factors.insert(unit.to_string(), (dim.to_string(), *factor));
        }
        Self { factors }
    }
}

impl StandardUnits {
    fn lookup(&self, unit: &str) -> Result<&(String, f64), UnitError> {
        self.factors
            .get(unit)
            .ok_or_else(|| UnitError::UnparseableUnits(unit.to_string()))
    }
}

impl UnitService for StandardUnits {
    fn parse(&self, magnitude: f64, unit: &str) -> Result<Quantity, UnitError> {
        self.lookup(unit)?;
        Ok(Quantity {
            magnitude,
            unit: unit.to_string(),
        })
    }

    fn convert(&self, quantity: &Quantity, target_unit: &str) -> Result<f64, UnitError> {
        let (from_dim, from_factor) = self.lookup(&quantity.unit)?;
        let (to_dim, to_factor) = self.lookup(target_unit)?;
        if from_dim != to_dim {
            return Err(UnitError::IncompatibleDimension {
                units: target_unit.to_string(),
                dimension: from_dim.clone(),
            });
        }
        Ok(quantity.magnitude * from_factor / to_factor)
    }

    fn base_of(&self, unit: &str) -> Result<(String, String), UnitError> {
        let (dim, _) = self.lookup(unit)?;
        Ok((dim.clone(), si_unit(dim).to_string()))
    }
}
