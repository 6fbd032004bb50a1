// Copyright 2025 The OntoCore Authors.

//! Identifiers, qualified names, and namespace bindings
//!
//! Qualified names have the form `prefix:localname`; prefixes bind to
//! namespace URIs through a [`NamespaceRegistry`]. This module also holds
//! the canonical id and name builders for generated objects (usages, role
//! assignments, relations, ports, flows) and the well-known oids of
//! definition objects.

use crate::errors::OntologyError;
use crate::kb::NamespaceExtract;
use indexmap::IndexMap;

/// The prefix of the core model-based-engineering namespace
pub const CORE_NS_PREFIX: &str = "mbe";

/// The URI of the core namespace
pub const CORE_NS_URI: &str = "http://ontocore.dev/mbe#";

/// Registry of namespace bindings, in registration order
#[derive(Debug, Clone, Default)]
pub struct NamespaceRegistry {
    by_prefix: IndexMap<String, NamespaceExtract>,
}

impl NamespaceRegistry {
    /// Create a registry pre-populated with the reference namespaces
    pub fn with_reference_namespaces() -> Self {
        let mut reg = Self::default();
        let refs: &[(&str, &str, u32)] = &[
            ("xsd", "http://www.w3.org/2001/XMLSchema#", 10),
            ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#", 10),
            ("rdfs", "http://www.w3.org/2000/01/rdf-schema#", 10),
            ("owl", "http://www.w3.org/2002/07/owl#", 10),
            (CORE_NS_PREFIX, CORE_NS_URI, 10),
            ("test", "http://ontocore.dev/test#", 0),
            ("sandbox", "http://ontocore.dev/sandbox#", 0),
            ("world", "http://ontocore.dev/world#", 0),
            ("mime", "http://www.iana.org/assignments/media-types/", 0),
        ];
        for (prefix, uri, meta_level) in refs {
            reg.register(NamespaceExtract {
                prefix: prefix.to_string(),
                uri: uri.to_string(),
                names: Vec::new(),
                meta_level: *meta_level,
                complete: false,
                iteration: 0,
                version: "0".to_string(),
            });
        }
        reg
    }

    /// Register a namespace; anonymous namespaces (empty prefix) are ignored
    pub fn register(&mut self, ns: NamespaceExtract) {
        if !ns.prefix.is_empty() {
            self.by_prefix.insert(ns.prefix.clone(), ns);
        }
    }

    /// Look up a namespace by prefix
    pub fn get(&self, prefix: &str) -> Option<&NamespaceExtract> {
        self.by_prefix.get(prefix)
    }

    /// All registered namespaces, in registration order
    pub fn all(&self) -> impl Iterator<Item = &NamespaceExtract> {
        self.by_prefix.values()
    }

    /// Get the URI for a qualified name.
    ///
    /// A name without a prefix is taken to be local (`#name`).
    pub fn qname_to_uri(&self, qname: &str) -> Result<String, OntologyError> {
        match qname.split_once(':') {
            None => {
                if qname.contains('#') {
                    Err(OntologyError::InvalidQName(qname.to_string()))
                } else {
                    Ok(format!("#{qname}"))
                }
            }
            Some((prefix, name)) => {
                if name.contains(':') {
                    return Err(OntologyError::InvalidQName(qname.to_string()));
                }
                let ns = self
                    .get(prefix)
                    .ok_or_else(|| OntologyError::UnknownPrefix(prefix.to_string()))?;
                if ns.uri.ends_with('/') || ns.uri.ends_with('#') {
                    Ok(format!("{}{}", ns.uri, name))
                } else {
                    Ok(format!("{}#{}", ns.uri, name))
                }
            }
        }
    }

    /// Get the qualified name for a URI.
    ///
    /// If no registered namespace matches the URI base, the prefix is the
    /// empty string (a local name).
    pub fn uri_to_qname(&self, uri: &str) -> String {
        let split_at = match (uri.rfind('/'), uri.rfind('#')) {
            (None, None) => return uri.to_string(),
            (Some(s), None) => s,
            (None, Some(h)) => h,
            (Some(s), Some(h)) => s.max(h),
        };
        let (base, name) = uri.split_at(split_at + 1);
        let prefix = self
            .by_prefix
            .values()
            .find(|ns| ns.uri == base)
            .map(|ns| ns.prefix.as_str())
            .unwrap_or("");
        format!("{prefix}:{name}")
    }

    /// Get the prefix for a URI, or empty for an unmatched base
    pub fn prefix_of(&self, uri: &str) -> String {
        self.uri_to_qname(uri)
            .split_once(':')
            .map(|(p, _)| p.to_string())
            .unwrap_or_default()
    }
}

/// oid of the ParameterDefinition for a variable
pub fn parameter_definition_oid(variable: &str) -> String {
    format!("{CORE_NS_PREFIX}:ParameterDefinition.{variable}")
}

/// oid of the ParameterContext with the given id
pub fn parameter_context_oid(context_id: &str) -> String {
    format!("{CORE_NS_PREFIX}:ParameterContext.{context_id}")
}

/// oid of the DataElementDefinition for a data element id
pub fn data_element_definition_oid(deid: &str) -> String {
    format!("{CORE_NS_PREFIX}:DataElementDefinition.{deid}")
}

/// Convert a camel-case class name into a user-facing name
/// (`HardwareProduct` becomes `Hardware Product`)
pub fn to_external_name(cname: &str) -> String {
    let mut out = String::new();
    for (i, ch) in cname.chars().enumerate() {
        if ch.is_uppercase() && i > 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

/// Create an `id` for a new assembly component usage
pub fn acu_id(assembly_id: &str, ref_des: &str) -> String {
    format!("{}-{}", assembly_id, ref_des.split(' ').collect::<Vec<_>>().join("-"))
}

/// Create a `name` for a new assembly component usage
pub fn acu_name(assembly_name: &str, ref_des: &str) -> String {
    format!("{assembly_name} : {ref_des}")
}

/// Get the next reference designator of the form `prefix-n` that does not
/// collide with any designator already used in the assembly.
pub fn next_ref_des(existing: &[String], prefix: &str) -> String {
    let prefix = if prefix.is_empty() { "Generic" } else { prefix };
    let used: Vec<&str> = existing.iter().map(|s| s.as_str()).collect();
    let same_prefix = used
        .iter()
        .filter(|rd| {
            rd.rsplit_once('-')
                .map(|(p, _)| p == prefix)
                .unwrap_or(false)
        })
        .count();
    let mut n = same_prefix + 1;
    loop {
        let candidate = format!("{prefix}-{n}");
        if !used.contains(&candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}

/// Create an `id` for a new role assignment
pub fn role_assignment_id(context_id: &str, role_id: &str, last: &str, first: &str, mi: &str) -> String {
    let person = format!("{last}_{first}_{mi}");
    if context_id.is_empty() {
        format!("{role_id}-{person}")
    } else {
        format!("{context_id}-{role_id}-{person}")
    }
}

/// Create a `name` for a new role assignment
pub fn role_assignment_name(
    context_id: &str,
    role_id: &str,
    last: &str,
    first: &str,
    mi: &str,
) -> String {
    let person = format!("{last} {first} {mi}");
    if context_id.is_empty() {
        format!("{role_id}: {person}")
    } else {
        format!("{context_id}: {role_id}: {person}")
    }
}

/// Create an `id` for a new Relation in a given context
pub fn relation_id(context_id: &str, role_id: &str) -> String {
    format!("{context_id}-{role_id}-relation")
}

/// Create a `name` for a new Relation in a given context
pub fn relation_name(context_name: &str, role_name: &str) -> String {
    format!("{context_name} {role_name} Relation")
}

/// Create an `id` for a new ParameterRelation
pub fn parameter_relation_id(rel_id: &str, pid: &str) -> String {
    format!("{rel_id}-{pid}-parm-rel")
}

/// Create a `name` for a new ParameterRelation
pub fn parameter_relation_name(rel_name: &str, pname: &str) -> String {
    format!("{rel_name} {pname} Parameter Relation")
}

/// Create an `id` for a new Port
pub fn port_id(of_product_id: &str, port_type_id: &str, seq: u32) -> String {
    format!("{of_product_id}-{port_type_id}-{seq}")
}

/// Create a `name` for a new Port
pub fn port_name(of_product_name: &str, port_type_name: &str, seq: u32) -> String {
    format!("{of_product_name} {port_type_name} {seq}")
}

/// Create a unique `id` for a new Flow
pub fn flow_id(
    start_context_id: &str,
    start_port_id: &str,
    end_context_id: &str,
    end_port_id: &str,
) -> String {
    format!("flow-{start_context_id}-{start_port_id}-{end_context_id}-{end_port_id}")
}

/// Create a `name` for a new Flow
pub fn flow_name(
    start_context_name: &str,
    start_port_name: &str,
    end_context_name: &str,
    end_port_name: &str,
) -> String {
    format!("Flow: {start_context_name} {start_port_name} to {end_context_name} {end_port_name}")
}

/// Display id including version when present (`id.v.version`)
pub fn display_id(id: &str, version: &str) -> String {
    if version.is_empty() {
        if id.is_empty() {
            "unknown".to_string()
        } else {
            id.to_string()
        }
    } else {
        format!("{id}.v.{version}")
    }
}

/// Display name including version when present (`name v. version`)
pub fn display_name(name: &str, version: &str) -> String {
    let name = if name.is_empty() { "Unidentified" } else { name };
    if version.is_empty() {
        name.to_string()
    } else {
        format!("{name} v. {version}")
    }
}
