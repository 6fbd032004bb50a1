// Copyright 2025 The OntoCore Authors.

//! Schema registry: runtime class schemas built from ontology extracts
//!
//! The registry computes a build order over class extracts (every ancestor
//! precedes its subclasses), then constructs an ordered [`Schema`] for each
//! class by inheriting fields from base schemas and adding locally defined
//! properties. Extracts are cached as one JSON file per class, property,
//! and namespace under a per-namespace directory so restarts skip the
//! ontology source entirely.

use crate::errors::{CoreResult, OntologyError, SchemaError};
use crate::jsonio;
use crate::kb::{
    ClassExtract, KnowledgeBase, NamespaceExtract, PrimitiveType, PropertyExtract, SchemaSource,
};
use crate::names::NamespaceRegistry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Fixed precedence ordering for the leading schema fields: identity,
/// audit, version, and ownership properties come first, in this order;
/// all other fields follow in declaration order.
pub const FIELD_ORDER: &[&str] = &[
    "oid",
    "id",
    "id_ns",
    "name",
    "description",
    "version",
    "iteration",
    "version_sequence",
    "owner",
    "creator",
    "comment",
    "create_datetime",
    "modifier",
    "mod_datetime",
    "url",
    "abbreviation",
];

/// Properties that are read-only in editors and never user-assigned
const READONLY_FIELDS: &[&str] = &[
    "oid",
    "creator",
    "create_datetime",
    "modifier",
    "mod_datetime",
    "iteration",
    "version_sequence",
    "type_of_port",
];

/// Maximum stored length of a string field, by field name
pub fn max_length(field_name: &str) -> usize {
    match field_name {
        "abbreviation" => 50,
        "id" | "name" => 150,
        "url" => 250,
        _ => 80,
    }
}

/// The representable type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// A primitive datatype value
    Primitive(PrimitiveType),
    /// A reference to another Thing, stored as its oid
    Object,
}

/// Descriptor of a single schema field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name
    pub id: String,
    /// Namespace of the defining property
    pub id_ns: String,
    /// Representable type of the field
    pub field_type: FieldType,
    /// Name of the related class for object-valued fields
    pub related_cname: Option<String>,
    /// Raw range name from the extract
    pub range: String,
    /// True if single-valued
    pub functional: bool,
    /// True if served by reverse lookup rather than storage
    pub is_inverse: bool,
    /// The forward property this field inverts, when `is_inverse`
    pub inverse_of: String,
    /// True for one-to-one object properties
    pub inverse_functional: bool,
    /// Maximum stored length for string fields
    pub max_length: usize,
    /// False for fields that are never user-edited
    pub editable: bool,
    /// True if locally defined on the class, false if inherited
    pub local: bool,
    /// Name displayed in user interfaces
    pub external_name: String,
    /// Ontological definition of the field
    pub definition: String,
}

/// Ordered runtime schema of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Names of immediate base classes
    pub base_names: Vec<String>,
    /// Name of the primary key field
    pub pk_name: String,
    /// Field names in deterministic order
    pub field_names: Vec<String>,
    /// Field descriptors keyed by field name
    pub fields: IndexMap<String, FieldDescriptor>,
    /// Ontological class definition
    pub definition: String,
}

impl Schema {
    /// Descriptor of a field, if the schema has it
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// True if the schema has a `version` field (the class is versionable)
    pub fn is_versionable(&self) -> bool {
        self.fields.contains_key("version")
    }
}

/// Build a field descriptor from a property extract
pub fn property_to_field(name: &str, pe: &PropertyExtract) -> Result<FieldDescriptor, SchemaError> {
    let range = pe.effective_range();
    let (field_type, related_cname, is_inverse, inverse_of) = if pe.is_datatype
        || crate::kb::RESERVED_ID_PROPERTIES.contains(&pe.id.as_str())
    {
        let prim =
            PrimitiveType::parse(&range).ok_or_else(|| SchemaError::UnrepresentableField {
                property: pe.id.clone(),
                range: range.clone(),
            })?;
        (FieldType::Primitive(prim), None, false, String::new())
    } else {
        (
            FieldType::Object,
            Some(range.clone()),
            pe.is_inverse,
            pe.inverse_of.clone(),
        )
    };
    Ok(FieldDescriptor {
        id: pe.id.clone(),
        id_ns: pe.id_ns.clone(),
        field_type,
        related_cname,
        range,
        functional: pe.functional,
        is_inverse,
        inverse_of,
        inverse_functional: pe.inverse_functional,
        max_length: max_length(name),
        editable: !READONLY_FIELDS.contains(&name) && !pe.is_inverse,
        local: false,
        external_name: pe.id.replace('_', " "),
        definition: pe.definition.clone(),
    })
}

/// The schema registry
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    /// Registered namespaces
    pub namespaces: NamespaceRegistry,
    /// Class extracts keyed by class name
    pub ces: IndexMap<String, ClassExtract>,
    /// Property extracts keyed by property name
    pub pes: IndexMap<String, PropertyExtract>,
    /// Schemas keyed by class name
    pub schemas: IndexMap<String, Schema>,
    /// Class names in build order (ancestors before subclasses)
    pub build_order: Vec<String>,
}

impl SchemaRegistry {
    /// Build a registry from a schema source
    pub fn from_source(source: &dyn SchemaSource) -> CoreResult<Self> {
        let mut namespaces = NamespaceRegistry::with_reference_namespaces();
        for ns in source.namespaces() {
            namespaces.register(ns);
        }
        let ces: IndexMap<String, ClassExtract> = source
            .classes()
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        let pes: IndexMap<String, PropertyExtract> = source
            .properties()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        let mut registry = Self {
            namespaces,
            ces,
            pes,
            schemas: IndexMap::new(),
            build_order: Vec::new(),
        };
        registry.build_order = registry.compute_build_order()?;
        registry.check_inverses()?;
        registry.build_schemas()?;
        info!(
            classes = registry.schemas.len(),
            properties = registry.pes.len(),
            "schema registry built"
        );
        Ok(registry)
    }

    /// Startup entry point: use the extract cache if present, rebuild from
    /// the source on `force_rebuild` or a missing cache, and write back a
    /// fresh cache either way.
    pub fn startup(
        source: &dyn SchemaSource,
        cache_dir: &Path,
        force_rebuild: bool,
    ) -> CoreResult<Self> {
        let registry = if !force_rebuild {
            match load_extract_cache(cache_dir) {
                Some(cached) => {
                    info!("building schemas from extract cache");
                    Self::from_source(&cached)?
                }
                None => {
                    info!("extract cache missing, building from source");
                    Self::from_source(source)?
                }
            }
        } else {
            info!("forced rebuild, building schemas from source");
            Self::from_source(source)?
        };
        registry.write_cache(cache_dir)?;
        Ok(registry)
    }

    /// Compute the build order: repeatedly append any class whose full
    /// ancestor set is already placed, until the worklist is empty.
    fn compute_build_order(&self) -> Result<Vec<String>, OntologyError> {
        let mut order: Vec<String> = Vec::new();
        let mut placed: HashSet<String> = HashSet::new();
        let mut remaining: Vec<String> = self.ces.keys().cloned().collect();
        while !remaining.is_empty() {
            let mut progressed = false;
            let mut next_remaining = Vec::new();
            for cname in remaining {
                let ancestors = self.ancestors_of(&cname)?;
                if ancestors.iter().all(|a| placed.contains(a)) {
                    placed.insert(cname.clone());
                    order.push(cname);
                    progressed = true;
                } else {
                    next_remaining.push(cname);
                }
            }
            if !progressed {
                return Err(OntologyError::CyclicOntology {
                    remaining: next_remaining.len(),
                });
            }
            remaining = next_remaining;
        }
        Ok(order)
    }

    /// All ancestors of a class (excluding the class itself)
    fn ancestors_of(&self, cname: &str) -> Result<HashSet<String>, OntologyError> {
        let mut out = HashSet::new();
        let mut stack: Vec<String> = self
            .ces
            .get(cname)
            .ok_or_else(|| OntologyError::UnknownClass(cname.to_string()))?
            .bases
            .clone();
        while let Some(base) = stack.pop() {
            if out.insert(base.clone()) {
                let extract = self
                    .ces
                    .get(&base)
                    .ok_or_else(|| OntologyError::UnknownClass(base.clone()))?;
                // a self-referential base would loop forever without this
                if extract.bases.contains(&extract.id) {
                    return Err(OntologyError::CyclicOntology { remaining: 1 });
                }
                stack.extend(extract.bases.clone());
            } else if base == cname {
                return Err(OntologyError::CyclicOntology { remaining: 1 });
            }
        }
        out.remove(cname);
        Ok(out)
    }

    /// Public ancestor set of a class; empty for unknown classes
    pub fn ancestors(&self, cname: &str) -> HashSet<String> {
        self.ancestors_of(cname).unwrap_or_default()
    }

    /// Names of the class and all its subclasses
    pub fn descendants(&self, cname: &str) -> HashSet<String> {
        let mut out = HashSet::new();
        if !self.ces.contains_key(cname) {
            return out;
        }
        out.insert(cname.to_string());
        loop {
            let before = out.len();
            for ce in self.ces.values() {
                if ce.bases.iter().any(|b| out.contains(b)) {
                    out.insert(ce.id.clone());
                }
            }
            if out.len() == before {
                break;
            }
        }
        out
    }

    /// True if `cname` names `of` or a subclass of it
    pub fn is_subclass(&self, cname: &str, of: &str) -> bool {
        cname == of || self.ancestors(cname).contains(of)
    }

    /// Validate that every inverse property targets an existing property
    fn check_inverses(&self) -> Result<(), SchemaError> {
        for pe in self.pes.values().filter(|p| p.is_inverse) {
            if !self.pes.contains_key(&pe.inverse_of) {
                return Err(SchemaError::MissingInverse {
                    property: pe.id.clone(),
                    inverse_of: pe.inverse_of.clone(),
                });
            }
        }
        Ok(())
    }

    /// Build schemas for every class, in build order
    fn build_schemas(&mut self) -> CoreResult<()> {
        for cname in self.build_order.clone() {
            debug!(class = %cname, "constructing schema");
            let extract = self.ces.get(&cname).cloned().expect("class in build order");
            // inherited fields, in the order the base schemas declare them
            let mut fields: IndexMap<String, FieldDescriptor> = IndexMap::new();
            for base in &extract.bases {
                let base_schema =
                    self.schemas
                        .get(base)
                        .ok_or_else(|| OntologyError::UnknownClass(base.clone()))?;
                for (name, fd) in &base_schema.fields {
                    let mut inherited = fd.clone();
                    inherited.local = false;
                    fields.entry(name.clone()).or_insert(inherited);
                }
            }
            // local properties last
            let local_props: Vec<PropertyExtract> = self
                .pes
                .values()
                .filter(|p| p.domain == cname)
                .cloned()
                .collect();
            for pe in &local_props {
                let mut fd = property_to_field(&pe.id, pe)?;
                fd.local = true;
                fields.insert(pe.id.clone(), fd);
            }
            // precedence ordering: FIELD_ORDER names first, remainder after
            let mut field_names: Vec<String> = FIELD_ORDER
                .iter()
                .filter(|n| fields.contains_key(**n))
                .map(|n| n.to_string())
                .collect();
            for name in fields.keys() {
                if !field_names.contains(name) {
                    field_names.push(name.clone());
                }
            }
            let ordered: IndexMap<String, FieldDescriptor> = field_names
                .iter()
                .map(|n| (n.clone(), fields.get(n).expect("ordered field").clone()))
                .collect();
            self.schemas.insert(
                cname.clone(),
                Schema {
                    base_names: extract.bases.clone(),
                    pk_name: "oid".to_string(),
                    field_names,
                    fields: ordered,
                    definition: extract.definition.clone(),
                },
            );
        }
        Ok(())
    }

    /// The forward property an inverse field resolves through:
    /// `(referring class, forward field name)`
    pub fn inverse_target(&self, cname: &str, field: &str) -> Option<(String, String)> {
        let schema = self.schemas.get(cname)?;
        let fd = schema.field(field)?;
        if !fd.is_inverse {
            return None;
        }
        Some((fd.related_cname.clone()?, fd.inverse_of.clone()))
    }

    /// The most specific class containing every named property, judged by
    /// position in build order. Returns `None` if any name is not a
    /// registered property.
    pub fn most_specific_domain(&self, props: &[&str]) -> Option<String> {
        let mut best: Option<usize> = None;
        for prop in props {
            let pe = self.pes.get(*prop)?;
            let idx = self.build_order.iter().position(|c| *c == pe.domain)?;
            best = Some(best.map_or(idx, |b: usize| b.max(idx)));
        }
        best.map(|idx| self.build_order[idx].clone())
    }

    /// Write the extract cache: one JSON file per class, property, and
    /// namespace, grouped under per-namespace directories.
    pub fn write_cache(&self, cache_dir: &Path) -> CoreResult<()> {
        for ns in self.namespaces.all() {
            if ns.meta_level == 10 && ns.prefix != crate::names::CORE_NS_PREFIX {
                continue;
            }
            let ns_dir = cache_dir.join(&ns.prefix);
            let nss_dir = ns_dir.join("namespaces");
            fs::create_dir_all(&nss_dir).map_err(|e| {
                crate::errors::PersistenceError::WriteFailed {
                    file: nss_dir.to_string_lossy().into_owned(),
                    reason: e.to_string(),
                }
            })?;
            jsonio::write_json(&nss_dir.join(format!("{}.json", ns.prefix)), ns)?;
            let class_dir = ns_dir.join("classes");
            let prop_dir = ns_dir.join("properties");
            for dir in [&class_dir, &prop_dir] {
                fs::create_dir_all(dir).map_err(|e| {
                    crate::errors::PersistenceError::WriteFailed {
                        file: dir.to_string_lossy().into_owned(),
                        reason: e.to_string(),
                    }
                })?;
            }
            for ce in self.ces.values().filter(|c| c.id_ns == ns.prefix) {
                jsonio::write_json(&class_dir.join(format!("{}.json", ce.id)), ce)?;
            }
            for pe in self.pes.values().filter(|p| p.id_ns == ns.prefix) {
                jsonio::write_json(&prop_dir.join(format!("{}.json", pe.id)), pe)?;
            }
        }
        debug!(dir = %cache_dir.display(), "extract cache written");
        Ok(())
    }
}

/// Load extracts from a cache directory written by
/// [`SchemaRegistry::write_cache`]. Returns `None` when the directory does
/// not exist or holds no class extracts.
pub fn load_extract_cache(cache_dir: &Path) -> Option<KnowledgeBase> {
    let mut namespaces: Vec<NamespaceExtract> = Vec::new();
    let mut classes: Vec<ClassExtract> = Vec::new();
    let mut properties: Vec<PropertyExtract> = Vec::new();
    let entries = fs::read_dir(cache_dir).ok()?;
    for entry in entries.flatten() {
        let ns_dir = entry.path();
        if !ns_dir.is_dir() {
            continue;
        }
        for (sub, kind) in [
            ("namespaces", 0usize),
            ("classes", 1usize),
            ("properties", 2usize),
        ] {
            let sub_dir = ns_dir.join(sub);
            let Ok(files) = fs::read_dir(&sub_dir) else {
                continue;
            };
            for file in files.flatten() {
                let Ok(value) = jsonio::read_json(&file.path()) else {
                    continue;
                };
                match kind {
                    0 => {
                        if let Ok(ns) = serde_json::from_value(value) {
                            namespaces.push(ns);
                        }
                    }
                    1 => {
                        if let Ok(ce) = serde_json::from_value(value) {
                            classes.push(ce);
                        }
                    }
                    _ => {
                        if let Ok(pe) = serde_json::from_value(value) {
                            properties.push(pe);
                        }
                    }
                }
            }
        }
    }
    if classes.is_empty() {
        return None;
    }
    classes.sort_by(|a, b| a.id.cmp(&b.id));
    properties.sort_by(|a, b| a.id.cmp(&b.id));
    Some(KnowledgeBase::from_extracts(namespaces, classes, properties))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::core_knowledge_base;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::from_source(&core_knowledge_base()).unwrap()
    }

    #[test]
    fn test_build_order_places_ancestors_first() {
        let reg = registry();
        for (idx, cname) in reg.build_order.iter().enumerate() {
            for ancestor in reg.ancestors(cname) {
                let apos = reg
                    .build_order
                    .iter()
                    .position(|c| *c == ancestor)
                    .unwrap();
                assert!(apos < idx, "{ancestor} not before {cname}");
            }
        }
    }

    #[test]
    fn test_cyclic_ontology_detected() {
        let classes = vec![
            ClassExtract {
                id: "A".to_string(),
                id_ns: "mbe".to_string(),
                name: "A".to_string(),
                bases: vec!["B".to_string()],
                definition: String::new(),
                abbreviation: String::new(),
            },
            ClassExtract {
                id: "B".to_string(),
                id_ns: "mbe".to_string(),
                name: "B".to_string(),
                bases: vec!["A".to_string()],
                definition: String::new(),
                abbreviation: String::new(),
            },
        ];
        let kb = KnowledgeBase::from_extracts(vec![], classes, vec![]);
        let err = SchemaRegistry::from_source(&kb).unwrap_err();
        assert!(matches!(
            err,
            crate::errors::CoreError::Ontology(OntologyError::CyclicOntology { .. })
        ));
    }

    #[test]
    fn test_field_inheritance_and_order() {
        let reg = registry();
        let hw = reg.schemas.get("HardwareProduct").unwrap();
        // identity fields lead in fixed order
        assert_eq!(hw.field_names[0], "oid");
        assert_eq!(hw.field_names[1], "id");
        assert_eq!(hw.field_names[2], "id_ns");
        // inherited from Product
        let version = hw.field("version").unwrap();
        assert!(!version.local);
        assert_eq!(version.field_type, FieldType::Primitive(PrimitiveType::Str));
        // inherited from ManagedObject
        let owner = hw.field("owner").unwrap();
        assert_eq!(owner.related_cname.as_deref(), Some("Organization"));
        assert!(hw.is_versionable());
        // Acu is not versionable
        assert!(!reg.schemas.get("Acu").unwrap().is_versionable());
    }

    #[test]
    fn test_version_field_forced_to_string() {
        let reg = registry();
        let product = reg.schemas.get("Product").unwrap();
        let version = product.field("version").unwrap();
        assert_eq!(version.field_type, FieldType::Primitive(PrimitiveType::Str));
    }

    #[test]
    fn test_inverse_fields_resolve() {
        let reg = registry();
        let (range, forward) = reg.inverse_target("Product", "components").unwrap();
        assert_eq!(range, "Acu");
        assert_eq!(forward, "assembly");
        assert!(reg.inverse_target("Product", "product_type").is_none());
        let components = reg
            .schemas
            .get("Product")
            .unwrap()
            .field("components")
            .unwrap();
        assert!(components.is_inverse);
        assert!(!components.editable);
    }

    #[test]
    fn test_missing_inverse_is_schema_error() {
        let mut kb = core_knowledge_base();
        let bogus = KnowledgeBase::from_extracts(
            vec![],
            vec![],
            vec![PropertyExtract {
                id: "widgets".to_string(),
                id_ns: "mbe".to_string(),
                name: "widgets".to_string(),
                domain: "Product".to_string(),
                range: "Acu".to_string(),
                functional: false,
                is_datatype: false,
                is_inverse: true,
                inverse_of: "no_such_property".to_string(),
                inverse_functional: false,
                definition: String::new(),
            }],
        );
        kb.merge(&bogus);
        let err = SchemaRegistry::from_source(&kb).unwrap_err();
        assert!(matches!(
            err,
            crate::errors::CoreError::Schema(SchemaError::MissingInverse { .. })
        ));
    }

    #[test]
    fn test_descendants() {
        let reg = registry();
        let subs = reg.descendants("Product");
        assert!(subs.contains("Product"));
        assert!(subs.contains("HardwareProduct"));
        assert!(subs.contains("Template"));
        assert!(!subs.contains("Acu"));
        assert!(reg.is_subclass("HardwareProduct", "ManagedObject"));
        assert!(!reg.is_subclass("Acu", "Product"));
    }

    #[test]
    fn test_most_specific_domain() {
        let reg = registry();
        // owner lives on ManagedObject, product_type on Product
        let domain = reg
            .most_specific_domain(&["owner", "product_type"])
            .unwrap();
        assert_eq!(domain, "Product");
        assert!(reg.most_specific_domain(&["owner", "nonexistent"]).is_none());
    }

    #[test]
    fn test_max_length_lookup() {
        assert_eq!(max_length("id"), 150);
        assert_eq!(max_length("abbreviation"), 50);
        assert_eq!(max_length("url"), 250);
        assert_eq!(max_length("whatever"), 80);
    }

    #[test]
    fn test_cache_round_trip() {
        let reg = registry();
        let dir = tempfile::tempdir().unwrap();
        reg.write_cache(dir.path()).unwrap();
        let cached = load_extract_cache(dir.path()).unwrap();
        let rebuilt = SchemaRegistry::from_source(&cached).unwrap();
        assert_eq!(rebuilt.schemas.len(), reg.schemas.len());
        // the cache stores extracts one file per name, so declaration
        // order is not preserved; field sets and the fixed leading
        // precedence are
        let hw = rebuilt.schemas.get("HardwareProduct").unwrap();
        let orig = reg.schemas.get("HardwareProduct").unwrap();
        let mut hw_sorted = hw.field_names.clone();
        let mut orig_sorted = orig.field_names.clone();
        hw_sorted.sort();
        orig_sorted.sort();
        assert_eq!(hw_sorted, orig_sorted);
        assert_eq!(hw.field_names[..16], orig.field_names[..16]);
    }

    #[test]
    fn test_missing_cache_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_extract_cache(&dir.path().join("nope")).is_none());
    }
}
