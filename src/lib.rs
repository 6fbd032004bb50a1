// Copyright 2025 The OntoCore Authors.

//! # OntoCore
//!
//! Ontology-driven object store with a parametric computation engine, for
//! collaborative hardware systems modeling.
//!
//! The crate provides the core of a systems-engineering data framework:
//! - **Schema registry**: runtime class schemas built from OWL-derived
//!   extracts, with inheritance, inverse relationships, datatype mapping,
//!   and a JSON extract cache for fast restart
//! - **Object store**: a polymorphic, oid-addressed container of
//!   [`Thing`] values with ownership/version/iteration discipline,
//!   reference-data seeding, and cascading deletes
//! - **Parametric engine**: parameter and data-element value caches,
//!   recursive assembly rollups (CBE, MEV, margin), requirement
//!   allocations, and power-mode tables
//! - **Serialization and permissions**: canonical serialize/deserialize
//!   with schema-version migration, and a role- and product-type-based
//!   permission oracle
//!
//! ## Design principles
//!
//! 1. **oids everywhere**: domain data is cyclic, so Things reference
//!    each other only by oid; inverse attributes are query functions over
//!    a reverse index, never stored pointers
//! 2. **One owner**: every cache lives in a single [`Core`] value owned
//!    by the core worker; all APIs take an explicit handle
//! 3. **SI base units**: parameter values are stored in SI base units;
//!    conversion happens only at the [`UnitService`] boundary
//! 4. **Eager derivation**: saves refresh the affected indices and
//!    recompute derived values before returning

#![warn(missing_docs)]

pub mod access;
mod clone;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
mod jsonio;
pub mod kb;
pub mod migration;
pub mod names;
pub mod ontology;
pub mod parametrics;
pub mod persistence;
pub mod refdata;
pub mod registry;
pub mod serializers;
pub mod store;
pub mod thing;
pub mod units;
pub mod validation;

// Re-export core types
pub use access::{get_perms, is_cloaked, is_global_admin, Perm, PermSet};
pub use config::{Config, NumericFormat, Prefs, State};
pub use core::Core;
pub use errors::{
    CoreError, CoreResult, MigrationError, OntologyError, ParameterError, PersistenceError,
    SchemaError, SerializationError, StoreError, UnitError,
};
pub use events::{EventSink, NullSink, RecordingSink};
pub use kb::{
    xsd_to_primitive, ClassExtract, KnowledgeBase, NamespaceExtract, PrimitiveType,
    PropertyExtract, SchemaSource,
};
pub use migration::{migrate, SchemaVersion, SCHEMA_VERSION};
pub use parametrics::{
    parameter_id, round_to, split_pid, Allocation, Comp, Constraint, DeDef, ModeDefinition,
    ParametricEngine, ParmDef, RequirementMargin, RequirementView, SystemUsage, UsageView,
};
pub use persistence::{load_caches, save_caches, LoadReport, LoadStatus};
pub use registry::{FieldDescriptor, FieldType, Schema, SchemaRegistry};
pub use serializers::{deserialize, serialize, SerializedRecord, DESERIALIZATION_ORDER};
pub use store::ObjectStore;
pub use thing::{dtstamp, normalize_datetime, Thing};
pub use units::{si_unit, Quantity, StandardUnits, UnitService};
