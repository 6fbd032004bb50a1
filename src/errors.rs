// Copyright 2025 The OntoCore Authors.

//! Error types for core operations

use thiserror::Error;

/// Errors arising from ontology ingest and qualified-name handling
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OntologyError {
    /// A qualified name used a prefix with no registered namespace
    #[error("Unknown prefix: {0}")]
    UnknownPrefix(String),

    /// A schema referenced a class that has no extract
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    /// The class extracts contain an inheritance cycle
    #[error("Cyclic ontology: build order stalled with {remaining} classes unplaced")]
    CyclicOntology {
        /// Number of classes that could not be placed in build order
        remaining: usize,
    },

    /// A qualified name was not of the form `prefix:localname`
    #[error("Invalid qualified name: {0}")]
    InvalidQName(String),
}

/// Errors arising from schema construction
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// A property range could not be represented as a field type
    #[error("Field type not representable: property {property} has range {range}")]
    UnrepresentableField {
        /// Property whose range is not representable
        property: String,
        /// The offending range
        range: String,
    },

    /// An inverse property referenced a property that does not exist
    #[error("Inverse property {property} refers to missing property {inverse_of}")]
    MissingInverse {
        /// The inverse property
        property: String,
        /// The property it claims to invert
        inverse_of: String,
    },
}

/// Errors arising from object store operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Insert of an oid that already exists
    #[error("Duplicate oid on insert: {0}")]
    DuplicateOid(String),

    /// Delete refused because of referential constraints
    #[error("Delete refused for {oid}: {reason}")]
    DeleteRefused {
        /// The object whose deletion was refused
        oid: String,
        /// Why deletion was refused
        reason: String,
    },

    /// The named class has no registered schema
    #[error("Unknown class name: {0}")]
    UnknownClass(String),
}

/// Errors arising from parameter and data-element operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParameterError {
    /// The parameter id has no definition
    #[error("Unknown parameter id: {0}")]
    Unknown(String),

    /// Attempt to set a computed parameter
    #[error("Parameter {0} is computed and cannot be set")]
    Computed(String),

    /// A string value could not be cast to the declared datatype
    #[error("Cannot cast {value:?} to {datatype} for parameter {pid}")]
    BadCast {
        /// The parameter id
        pid: String,
        /// The value that failed to cast
        value: String,
        /// The declared range datatype
        datatype: String,
    },
}

/// Errors arising from unit parsing and conversion
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UnitError {
    /// The unit string could not be parsed
    #[error("Cannot parse units: {0}")]
    UnparseableUnits(String),

    /// The units are incompatible with the dimension of the value
    #[error("Units {units} are incompatible with dimension {dimension}")]
    IncompatibleDimension {
        /// The supplied units
        units: String,
        /// The dimension of the parameter
        dimension: String,
    },
}

/// Errors arising from serialization and deserialization
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SerializationError {
    /// A serialized record carried an unregistered class tag
    #[error("Unknown class tag during deserialize: {0}")]
    UnknownClass(String),

    /// A relationship target was missing during cascade
    #[error("Missing referent {referent} while deserializing {oid}")]
    MissingReferent {
        /// The record being deserialized
        oid: String,
        /// The oid that could not be resolved
        referent: String,
    },

    /// Encoding or decoding failed at the JSON layer
    #[error("Serialization error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        SerializationError::Json(err.to_string())
    }
}

/// Errors arising from schema-version migration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MigrationError {
    /// Version string was not `major.minor.patch`
    #[error("Invalid version format: {0}")]
    InvalidVersion(String),

    /// A migration function failed
    #[error("Migration to {version} failed: {reason}")]
    MigrationFailed {
        /// Target version of the failed migration
        version: String,
        /// Why it failed
        reason: String,
    },
}

/// Errors arising from snapshot persistence
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// A snapshot file could not be written
    #[error("Failed to write {file}: {reason}")]
    WriteFailed {
        /// The snapshot file name
        file: String,
        /// The I/O failure
        reason: String,
    },

    /// A snapshot file existed but could not be decoded
    #[error("Failed to read {file}: {reason}")]
    ReadFailed {
        /// The snapshot file name
        file: String,
        /// The decode failure
        reason: String,
    },
}

/// Umbrella error for core operations
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// Ontology error
    #[error(transparent)]
    Ontology(#[from] OntologyError),
    /// Schema error
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Store error
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Parameter error
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    /// Unit conversion error
    #[error(transparent)]
    Unit(#[from] UnitError),
    /// Serialization error
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    /// Migration error
    #[error(transparent)]
    Migration(#[from] MigrationError),
    /// Persistence error
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Check if this is a not-found style error
    pub fn is_unknown(&self) -> bool {
        matches!(
            self,
            CoreError::Ontology(OntologyError::UnknownClass(_))
                | CoreError::Ontology(OntologyError::UnknownPrefix(_))
                | CoreError::Store(StoreError::UnknownClass(_))
                | CoreError::Parameter(ParameterError::Unknown(_))
                | CoreError::Serialization(SerializationError::UnknownClass(_))
        )
    }

    /// Check if this is a refused-operation error
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            CoreError::Store(StoreError::DuplicateOid(_))
                | CoreError::Store(StoreError::DeleteRefused { .. })
                | CoreError::Parameter(ParameterError::Computed(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = OntologyError::UnknownPrefix("xyz".to_string());
        assert_eq!(err.to_string(), "Unknown prefix: xyz");

        let err = OntologyError::CyclicOntology { remaining: 3 };
        assert_eq!(
            err.to_string(),
            "Cyclic ontology: build order stalled with 3 classes unplaced"
        );

        let err = StoreError::DuplicateOid("abc-123".to_string());
        assert_eq!(err.to_string(), "Duplicate oid on insert: abc-123");

        let err = StoreError::DeleteRefused {
            oid: "p-1".to_string(),
            reason: "product is still in use".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Delete refused for p-1: product is still in use"
        );

        let err = ParameterError::Computed("m[CBE]".to_string());
        assert_eq!(
            err.to_string(),
            "Parameter m[CBE] is computed and cannot be set"
        );

        let err = UnitError::IncompatibleDimension {
            units: "kg".to_string(),
            dimension: "power".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Units kg are incompatible with dimension power"
        );

        let err = SerializationError::UnknownClass("Widget".to_string());
        assert_eq!(
            err.to_string(),
            "Unknown class tag during deserialize: Widget"
        );
    }

    #[test]
    fn test_umbrella_conversion() {
        let err: CoreError = OntologyError::InvalidQName("no-colon".to_string()).into();
        assert!(matches!(err, CoreError::Ontology(_)));
        assert!(!err.is_refusal());

        let err: CoreError = StoreError::DuplicateOid("x".to_string()).into();
        assert!(err.is_refusal());
        assert!(!err.is_unknown());

        let err: CoreError = ParameterError::Unknown("q[foo]".to_string()).into();
        assert!(err.is_unknown());
    }

    #[test]
    fn test_serde_json_conversion() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{ bad json }").unwrap_err();
        let err: SerializationError = serde_err.into();
        match err {
            SerializationError::Json(msg) => assert!(!msg.is_empty()),
            _ => panic!("expected Json variant"),
        }
    }

    #[test]
    fn test_all_errors_clone() {
        let errors: Vec<CoreError> = vec![
            OntologyError::UnknownClass("A".to_string()).into(),
            StoreError::UnknownClass("B".to_string()).into(),
            ParameterError::BadCast {
                pid: "m".to_string(),
                value: "ten".to_string(),
                datatype: "float".to_string(),
            }
            .into(),
            UnitError::UnparseableUnits("furlongs".to_string()).into(),
            PersistenceError::ReadFailed {
                file: "matrix.json".to_string(),
                reason: "truncated".to_string(),
            }
            .into(),
        ];
        for error in errors {
            let cloned = error.clone();
            assert_eq!(error.to_string(), cloned.to_string());
        }
    }
}
