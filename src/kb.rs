// Copyright 2025 The OntoCore Authors.

//! Knowledge base: class, property, and namespace extracts
//!
//! The OWL parser itself is a black box upstream of this crate; what it
//! produces (and what the extract cache stores) is the fixed extract shape
//! defined here. A [`KnowledgeBase`] holds one coherent set of extracts and
//! exposes the three enumerations the registry consumes: class extracts,
//! property extracts, and namespace bindings.

use serde::{Deserialize, Serialize};

/// Primitive field datatypes, mapped from XSD datatype ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    /// UTF-8 string
    Str,
    /// Boolean
    Bool,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// 64-bit float
    Float,
    /// Binary data
    Bytes,
    /// Calendar date, stored as an ISO-8601 string
    Date,
    /// Time of day, stored as an ISO-8601 string
    Time,
    /// Datetime, stored as a UTC ISO-8601 string
    DateTime,
}

impl PrimitiveType {
    /// The canonical name used in extracts and definitions
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveType::Str => "str",
            PrimitiveType::Bool => "bool",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Bytes => "bytes",
            PrimitiveType::Date => "date",
            PrimitiveType::Time => "time",
            PrimitiveType::DateTime => "datetime",
        }
    }

    /// Parse a canonical datatype name
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "str" | "text" => Some(PrimitiveType::Str),
            "bool" | "boolean" => Some(PrimitiveType::Bool),
            "int" => Some(PrimitiveType::Int),
            "long" => Some(PrimitiveType::Long),
            "float" => Some(PrimitiveType::Float),
            "bytes" => Some(PrimitiveType::Bytes),
            "date" => Some(PrimitiveType::Date),
            "time" => Some(PrimitiveType::Time),
            "datetime" => Some(PrimitiveType::DateTime),
            _ => None,
        }
    }

    /// The type-appropriate null value
    pub fn null_value(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            PrimitiveType::Str | PrimitiveType::Bytes => Value::String(String::new()),
            PrimitiveType::Bool => Value::Bool(false),
            PrimitiveType::Int | PrimitiveType::Long => Value::from(0),
            PrimitiveType::Float => Value::from(0.0),
            // datetime nulls are the string "0" so comparisons sort them first
            PrimitiveType::Date | PrimitiveType::Time | PrimitiveType::DateTime => {
                Value::String("0".to_string())
            }
        }
    }
}

/// Map an XSD datatype local name to a primitive field type.
///
/// `token` is included for single-word text values; `base64Binary` maps to
/// bytes and `anyURI` to string.
pub fn xsd_to_primitive(local_name: &str) -> Option<PrimitiveType> {
    match local_name {
        "string" | "normalizedString" | "token" | "language" | "anyURI" => {
            Some(PrimitiveType::Str)
        }
        "boolean" => Some(PrimitiveType::Bool),
        "int" | "short" | "byte" | "unsignedShort" | "unsignedByte" | "negativeInteger"
        | "nonPositiveInteger" | "nonNegativeInteger" | "positiveInteger" => {
            Some(PrimitiveType::Int)
        }
        "long" | "integer" | "unsignedLong" | "unsignedInt" => Some(PrimitiveType::Long),
        "float" | "double" | "decimal" => Some(PrimitiveType::Float),
        "dateTime" => Some(PrimitiveType::DateTime),
        "date" => Some(PrimitiveType::Date),
        "time" => Some(PrimitiveType::Time),
        "base64Binary" | "hexBinary" => Some(PrimitiveType::Bytes),
        _ => None,
    }
}

/// Property names whose range is always forced to string, whatever the
/// ontology declares. These are id-like values used as keys.
pub const RESERVED_ID_PROPERTIES: &[&str] =
    &["id", "id_ns", "oid", "uri", "version", "domain", "range"];

/// Extract of an ontological class node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassExtract {
    /// Local name of the class (used as the runtime class name)
    pub id: String,
    /// Namespace prefix in which the class is defined
    pub id_ns: String,
    /// Display name (label), falling back to `id`
    pub name: String,
    /// Names of immediate base classes; bases form a DAG
    #[serde(default)]
    pub bases: Vec<String>,
    /// Ontological definition (from the class comment)
    #[serde(default)]
    pub definition: String,
    /// Short abbreviation, possibly empty
    #[serde(default)]
    pub abbreviation: String,
}

impl ClassExtract {
    /// Qualified oid of the extract, `id_ns:id`
    pub fn oid(&self) -> String {
        format!("{}:{}", self.id_ns, self.id)
    }
}

/// Extract of an ontological property node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyExtract {
    /// Local name of the property (used as the field name)
    pub id: String,
    /// Namespace prefix in which the property is defined
    pub id_ns: String,
    /// Display name (label), falling back to `id`
    pub name: String,
    /// Class on which the property is locally defined
    pub domain: String,
    /// Range: a primitive datatype name for datatype properties, or a class
    /// name for object properties
    pub range: String,
    /// True if the property is single-valued
    pub functional: bool,
    /// True if the range is a primitive datatype
    pub is_datatype: bool,
    /// True if the property is materialized as a back-lookup
    #[serde(default)]
    pub is_inverse: bool,
    /// The property this one inverts, when `is_inverse`
    #[serde(default)]
    pub inverse_of: String,
    /// True for one-to-one object properties
    #[serde(default)]
    pub inverse_functional: bool,
    /// Ontological definition (from the property comment)
    #[serde(default)]
    pub definition: String,
}

impl PropertyExtract {
    /// Qualified oid of the extract, `id_ns:id`
    pub fn oid(&self) -> String {
        format!("{}:{}", self.id_ns, self.id)
    }

    /// The effective range, with reserved id-like names forced to string
    pub fn effective_range(&self) -> String {
        if RESERVED_ID_PROPERTIES.contains(&self.id.as_str()) {
            "str".to_string()
        } else {
            self.range.clone()
        }
    }
}

/// Extract of a namespace binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceExtract {
    /// Namespace prefix used in qualified names
    pub prefix: String,
    /// Namespace URI
    pub uri: String,
    /// Local names declared within the namespace
    #[serde(default)]
    pub names: Vec<String>,
    /// Meta level of the namespace (10 = applies at any meta level)
    #[serde(default)]
    pub meta_level: u32,
    /// True if the name list is asserted complete
    #[serde(default)]
    pub complete: bool,
    /// Namespace iteration
    #[serde(default)]
    pub iteration: u32,
    /// Namespace version
    #[serde(default)]
    pub version: String,
}

/// Source of schema-defining extracts.
///
/// The black-box OWL parser, the extract cache, and the embedded core
/// ontology all present this interface to the registry.
pub trait SchemaSource {
    /// All namespace bindings, in declaration order
    fn namespaces(&self) -> Vec<NamespaceExtract>;
    /// All class extracts, in declaration order
    fn classes(&self) -> Vec<ClassExtract>;
    /// All property extracts, in declaration order
    fn properties(&self) -> Vec<PropertyExtract>;
}

/// A coherent set of extracts for one or more namespaces
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    namespaces: Vec<NamespaceExtract>,
    classes: Vec<ClassExtract>,
    properties: Vec<PropertyExtract>,
}

impl KnowledgeBase {
    /// Build a knowledge base from extract collections
    pub fn from_extracts(
        namespaces: Vec<NamespaceExtract>,
        classes: Vec<ClassExtract>,
        properties: Vec<PropertyExtract>,
    ) -> Self {
        Self {
            namespaces,
            classes,
            properties,
        }
    }

    /// Merge another source's extracts into this knowledge base.
    ///
    /// Name collisions clobber existing entries, matching the behavior of
    /// loading an application ontology over the core ontology.
    pub fn merge(&mut self, other: &dyn SchemaSource) {
        for ns in other.namespaces() {
            if let Some(existing) = self.namespaces.iter_mut().find(|n| n.prefix == ns.prefix) {
                *existing = ns;
            } else {
                self.namespaces.push(ns);
            }
        }
        for ce in other.classes() {
            if let Some(existing) = self.classes.iter_mut().find(|c| c.id == ce.id) {
                *existing = ce;
            } else {
                self.classes.push(ce);
            }
        }
        for pe in other.properties() {
            if let Some(existing) = self.properties.iter_mut().find(|p| p.id == pe.id) {
                *existing = pe;
            } else {
                self.properties.push(pe);
            }
        }
    }

    /// Qualified names of all class nodes
    pub fn class_node_names(&self) -> Vec<String> {
        self.classes.iter().map(|c| c.oid()).collect()
    }

    /// Qualified names of all property nodes
    pub fn property_node_names(&self) -> Vec<String> {
        self.properties.iter().map(|p| p.oid()).collect()
    }

    /// Plain-text report of the knowledge base contents
    pub fn report(&self) -> String {
        let mut out = String::new();
        out.push_str("==========\nNamespaces\n==========\n");
        for ns in &self.namespaces {
            out.push_str(&format!("- {}:  {}\n", ns.prefix, ns.uri));
        }
        out.push_str("=======\nClasses\n=======\n");
        out.push_str(&format!("{} Class nodes found:\n", self.classes.len()));
        for c in &self.classes {
            out.push_str(&format!("  - {}\n", c.oid()));
        }
        out.push_str("==========\nProperties\n==========\n");
        out.push_str(&format!("{} Property nodes found:\n", self.properties.len()));
        for p in &self.properties {
            out.push_str(&format!("  - {}\n", p.oid()));
        }
        out
    }
}

impl SchemaSource for KnowledgeBase {
    fn namespaces(&self) -> Vec<NamespaceExtract> {
        self.namespaces.clone()
    }

    fn classes(&self) -> Vec<ClassExtract> {
        self.classes.clone()
    }

    fn properties(&self) -> Vec<PropertyExtract> {
        self.properties.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xsd_mapping() {
        assert_eq!(xsd_to_primitive("string"), Some(PrimitiveType::Str));
        assert_eq!(xsd_to_primitive("token"), Some(PrimitiveType::Str));
        assert_eq!(xsd_to_primitive("anyURI"), Some(PrimitiveType::Str));
        assert_eq!(xsd_to_primitive("boolean"), Some(PrimitiveType::Bool));
        assert_eq!(xsd_to_primitive("decimal"), Some(PrimitiveType::Float));
        assert_eq!(xsd_to_primitive("dateTime"), Some(PrimitiveType::DateTime));
        assert_eq!(xsd_to_primitive("base64Binary"), Some(PrimitiveType::Bytes));
        assert_eq!(xsd_to_primitive("gYearMonth"), None);
    }

    #[test]
    fn test_primitive_null_values() {
        assert_eq!(PrimitiveType::Float.null_value(), serde_json::json!(0.0));
        assert_eq!(PrimitiveType::Int.null_value(), serde_json::json!(0));
        assert_eq!(PrimitiveType::Str.null_value(), serde_json::json!(""));
        assert_eq!(PrimitiveType::Bool.null_value(), serde_json::json!(false));
        assert_eq!(PrimitiveType::DateTime.null_value(), serde_json::json!("0"));
    }

    #[test]
    fn test_reserved_range_forcing() {
        let pe = PropertyExtract {
            id: "version".to_string(),
            id_ns: "mbe".to_string(),
            name: "version".to_string(),
            domain: "Product".to_string(),
            range: "int".to_string(),
            functional: true,
            is_datatype: true,
            is_inverse: false,
            inverse_of: String::new(),
            inverse_functional: false,
            definition: String::new(),
        };
        assert_eq!(pe.effective_range(), "str");
        assert_eq!(pe.oid(), "mbe:version");
    }

    #[test]
    fn test_merge_clobbers_by_name() {
        let a = ClassExtract {
            id: "Product".to_string(),
            id_ns: "mbe".to_string(),
            name: "Product".to_string(),
            bases: vec![],
            definition: "old".to_string(),
            abbreviation: String::new(),
        };
        let b = ClassExtract {
            definition: "new".to_string(),
            ..a.clone()
        };
        let mut kb = KnowledgeBase::from_extracts(vec![], vec![a], vec![]);
        let other = KnowledgeBase::from_extracts(vec![], vec![b], vec![]);
        kb.merge(&other);
        let classes = kb.classes();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].definition, "new");
    }
}
