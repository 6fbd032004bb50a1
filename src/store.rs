// Copyright 2025 The OntoCore Authors.

//! The object store: polymorphic, oid-addressed container of Things
//!
//! Holds the `oid -> Thing` matrix plus a reverse index over every stored
//! object-valued field, so inverse properties resolve without scanning.
//! The store is single-writer; readers may be concurrent with readers but
//! not with writers. Query operations take the schema registry as an
//! explicit handle.

use crate::errors::StoreError;
use crate::registry::{FieldType, SchemaRegistry};
use crate::thing::Thing;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Key of one reverse-index bucket: referring class and forward field
type RefKey = (String, String);

/// The object store
#[derive(Debug, Clone, Default)]
pub struct ObjectStore {
    things: IndexMap<String, Thing>,
    /// target oid -> (referrer cname, field) -> referrer oids
    reverse: HashMap<String, HashMap<RefKey, BTreeSet<String>>>,
    /// oids created locally and not yet saved
    pub new_oids: BTreeSet<String>,
}

impl ObjectStore {
    /// Number of stored Things
    pub fn len(&self) -> usize {
        self.things.len()
    }

    /// True if the store is empty
    pub fn is_empty(&self) -> bool {
        self.things.is_empty()
    }

    /// Get a Thing by oid
    pub fn get(&self, oid: &str) -> Option<&Thing> {
        self.things.get(oid)
    }

    /// Get several Things in order, with `None` for misses
    pub fn get_many(&self, oids: &[String]) -> Vec<Option<&Thing>> {
        oids.iter().map(|oid| self.things.get(oid)).collect()
    }

    /// True if the oid is stored
    pub fn contains(&self, oid: &str) -> bool {
        self.things.contains_key(oid)
    }

    /// All stored Things
    pub fn iter(&self) -> impl Iterator<Item = &Thing> {
        self.things.values()
    }

    /// All oids, or the oids of one exact class
    pub fn get_oids(&self, cname: Option<&str>) -> Vec<String> {
        match cname {
            None => self.things.keys().cloned().collect(),
            Some(c) => self
                .things
                .values()
                .filter(|t| t.cname == c)
                .map(|t| t.oid.clone())
                .collect(),
        }
    }

    /// All ids, or the ids of one exact class
    pub fn get_ids(&self, cname: Option<&str>) -> Vec<String> {
        self.things
            .values()
            .filter(|t| cname.map_or(true, |c| t.cname == c))
            .map(|t| t.id().to_string())
            .collect()
    }

    /// `(id, version)` pairs of one exact class (or of everything)
    pub fn get_idvs(&self, cname: Option<&str>) -> Vec<(String, String)> {
        self.things
            .values()
            .filter(|t| cname.map_or(true, |c| t.cname == c))
            .map(|t| (t.id().to_string(), t.get_str("version").to_string()))
            .collect()
    }

    /// Map oids to `mod_datetime` strings, for all or the named oids
    pub fn get_mod_dts(&self, oids: Option<&[String]>) -> HashMap<String, String> {
        match oids {
            None => self
                .things
                .values()
                .filter(|t| !t.mod_datetime().is_empty())
                .map(|t| (t.oid.clone(), t.mod_datetime().to_string()))
                .collect(),
            Some(oids) => oids
                .iter()
                .filter_map(|oid| self.things.get(oid))
                .filter(|t| !t.mod_datetime().is_empty())
                .map(|t| (t.oid.clone(), t.mod_datetime().to_string()))
                .collect(),
        }
    }

    /// Map oids to class names
    pub fn get_oid_cnames(&self, oids: &[String]) -> HashMap<String, String> {
        oids.iter()
            .filter_map(|oid| self.things.get(oid))
            .map(|t| (t.oid.clone(), t.cname.clone()))
            .collect()
    }

    /// Things whose exact class is `cname`
    pub fn get_by_type(&self, cname: &str) -> Vec<&Thing> {
        self.things.values().filter(|t| t.cname == cname).collect()
    }

    /// Count of Things whose exact class is `cname`
    pub fn get_count(&self, cname: &str) -> usize {
        self.things.values().filter(|t| t.cname == cname).count()
    }

    /// Things of `cname` or any of its subclasses
    pub fn get_all_subtypes(&self, registry: &SchemaRegistry, cname: &str) -> Vec<&Thing> {
        let subs = registry.descendants(cname);
        self.things
            .values()
            .filter(|t| subs.contains(&t.cname))
            .collect()
    }

    /// True if the Thing's class is `cname` or a subclass of it
    pub fn is_a(&self, registry: &SchemaRegistry, thing: &Thing, cname: &str) -> bool {
        registry.is_subclass(&thing.cname, cname)
    }

    /// Insert a new Thing; duplicate oids are refused
    pub fn insert_new(&mut self, thing: Thing) -> Result<(), StoreError> {
        if self.things.contains_key(&thing.oid) {
            return Err(StoreError::DuplicateOid(thing.oid));
        }
        self.index_refs(&thing);
        self.things.insert(thing.oid.clone(), thing);
        Ok(())
    }

    /// Insert or replace a Thing, keeping the reverse index consistent
    pub fn upsert(&mut self, thing: Thing) {
        if let Some(old) = self.things.get(&thing.oid) {
            let old = old.clone();
            self.unindex_refs(&old);
        }
        self.index_refs(&thing);
        self.things.insert(thing.oid.clone(), thing);
    }

    /// Remove a Thing; a missing oid is a logged no-op
    pub fn remove(&mut self, oid: &str) -> Option<Thing> {
        match self.things.shift_remove(oid) {
            Some(thing) => {
                self.unindex_refs(&thing);
                self.reverse.remove(oid);
                Some(thing)
            }
            None => {
                debug!(oid = %oid, "delete: oid not found, ignored");
                None
            }
        }
    }

    fn index_refs(&mut self, thing: &Thing) {
        for (field, value) in &thing.fields {
            if field == "oid" {
                continue;
            }
            if let Some(target) = value.as_str() {
                if target.is_empty() || !looks_like_ref(field) {
                    continue;
                }
                self.reverse
                    .entry(target.to_string())
                    .or_default()
                    .entry((thing.cname.clone(), field.clone()))
                    .or_default()
                    .insert(thing.oid.clone());
            }
        }
    }

    fn unindex_refs(&mut self, thing: &Thing) {
        for (field, value) in &thing.fields {
            if let Some(target) = value.as_str() {
                if target.is_empty() {
                    continue;
                }
                if let Some(buckets) = self.reverse.get_mut(target) {
                    if let Some(set) = buckets.get_mut(&(thing.cname.clone(), field.clone())) {
                        set.remove(&thing.oid);
                        if set.is_empty() {
                            buckets.remove(&(thing.cname.clone(), field.clone()));
                        }
                    }
                    if buckets.is_empty() {
                        self.reverse.remove(target);
                    }
                }
            }
        }
    }

    /// oids of Things of (a subclass of) `cname` whose `field` references
    /// the target oid.
    pub fn referencing(
        &self,
        registry: &SchemaRegistry,
        target_oid: &str,
        cname: &str,
        field: &str,
    ) -> Vec<String> {
        let subs = registry.descendants(cname);
        let mut out: Vec<String> = Vec::new();
        if let Some(buckets) = self.reverse.get(target_oid) {
            for ((ref_cname, ref_field), oids) in buckets {
                if ref_field == field && subs.contains(ref_cname) {
                    out.extend(oids.iter().cloned());
                }
            }
        }
        out.sort();
        out
    }

    /// Resolve an inverse field of a Thing: all Things of the inverse's
    /// range class whose forward field references the owner's oid.
    pub fn resolve_inverse(
        &self,
        registry: &SchemaRegistry,
        owner: &Thing,
        field: &str,
    ) -> Vec<&Thing> {
        let Some((range_cname, forward)) = registry.inverse_target(&owner.cname, field) else {
            return Vec::new();
        };
        self.referencing(registry, &owner.oid, &range_cname, &forward)
            .iter()
            .filter_map(|oid| self.things.get(oid))
            .collect()
    }

    /// First Thing of exactly `cname` matching all criteria. Object-valued
    /// criteria match by referent oid, with null matching the null
    /// reference.
    pub fn select(
        &self,
        registry: &SchemaRegistry,
        cname: &str,
        criteria: &[(&str, Value)],
    ) -> Option<&Thing> {
        let schema = registry.schemas.get(cname)?;
        self.things
            .values()
            .filter(|t| t.cname == cname)
            .find(|t| matches_criteria(t, schema, criteria))
    }

    /// All Things matching the criteria. With `cname`, the search covers
    /// that class and its subclasses (and is empty if the class lacks any
    /// criteria field); without it, the most specific class containing all
    /// criteria fields is the search root.
    pub fn search_exact(
        &self,
        registry: &SchemaRegistry,
        cname: Option<&str>,
        criteria: &[(&str, Value)],
    ) -> Vec<&Thing> {
        let fields: Vec<&str> = criteria.iter().map(|(f, _)| *f).collect();
        if fields.is_empty() {
            return Vec::new();
        }
        let Some(domain) = registry.most_specific_domain(&fields) else {
            return Vec::new();
        };
        let root = match cname {
            Some(c) => {
                let Some(extract) = registry.ces.get(c) else {
                    return Vec::new();
                };
                // the named class must contain every criteria field
                let mut bases = registry.ancestors(&extract.id);
                bases.insert(c.to_string());
                if !bases.contains(&domain) {
                    return Vec::new();
                }
                c.to_string()
            }
            None => domain,
        };
        let Some(_) = registry.schemas.get(&root) else {
            return Vec::new();
        };
        self.get_all_subtypes(registry, &root)
            .into_iter()
            .filter(|t| {
                registry
                    .schemas
                    .get(&t.cname)
                    .is_some_and(|s| matches_criteria(t, s, criteria))
            })
            .collect()
    }

    /// Generate a unique product id: `owner.id` (or "Vendor"), the product
    /// type abbreviation (or "TBD"), and a zero-padded 7-digit suffix not
    /// colliding with any HardwareProduct or Template id.
    pub fn gen_product_id(&self, obj: &Thing, vendor: bool) -> String {
        if obj.cname != "HardwareProduct" && obj.cname != "Template" {
            return String::new();
        }
        let mut all_ids = self.get_ids(Some("HardwareProduct"));
        all_ids.extend(self.get_ids(Some("Template")));
        let mut suffixes: Vec<String> = all_ids
            .iter()
            .map(|id| id.rsplit('-').next().unwrap_or("").to_string())
            .collect();
        let current_parts: Vec<&str> = obj.id().split('-').collect();
        if let Some(pos) = suffixes
            .iter()
            .position(|s| s == current_parts.last().unwrap_or(&""))
        {
            suffixes.remove(pos);
        }
        let owner_id = if vendor {
            "Vendor".to_string()
        } else {
            obj.get_ref("owner")
                .and_then(|oid| self.get(oid))
                .map(|o| o.id().to_string())
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| "Vendor".to_string())
        };
        let mut pt_abbr = obj
            .get_ref("product_type")
            .and_then(|oid| self.get(oid))
            .map(|pt| pt.get_str("abbreviation").to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| "TBD".to_string());
        // keep a conforming unique id as-is
        if current_parts.len() >= 3
            && obj.id().starts_with(&format!("{owner_id}-{pt_abbr}-"))
            && !suffixes.iter().any(|s| s == current_parts.last().unwrap())
        {
            return obj.id().to_string();
        }
        let mut max_int: u64 = 0;
        for suffix in &suffixes {
            if let Ok(n) = suffix.parse::<u64>() {
                max_int = max_int.max(n);
            }
        }
        let mut next = format!("{max_int:07}");
        while suffixes.iter().any(|s| *s == next) {
            max_int += 1;
            next = format!("{max_int:07}");
        }
        if obj.cname == "Template" {
            pt_abbr.push_str("-Template");
        }
        format!("{owner_id}-{pt_abbr}-{next}")
    }
}

/// A stored field name is indexed as a reference iff its value looks like
/// an oid reference. The store does not consult schemas here: any
/// non-empty string stored in a field is indexed, and queries filter by
/// class and field, so over-indexing is harmless while a missed reference
/// would break inverse resolution.
fn looks_like_ref(_field: &str) -> bool {
    true
}

fn matches_criteria(thing: &Thing, schema: &crate::registry::Schema, criteria: &[(&str, Value)]) -> bool {
    for (field, expected) in criteria {
        let Some(fd) = schema.field(field) else {
            return false;
        };
        let stored = thing.get(field);
        let matched = match fd.field_type {
            FieldType::Object => {
                let stored_oid = stored.and_then(|v| v.as_str()).unwrap_or("");
                match expected {
                    Value::Null => stored_oid.is_empty(),
                    Value::String(oid) => stored_oid == oid,
                    _ => false,
                }
            }
            FieldType::Primitive(_) => match (stored, expected) {
                (Some(Value::Number(a)), Value::Number(b)) => {
                    a.as_f64().unwrap_or(f64::NAN) == b.as_f64().unwrap_or(f64::NAN)
                }
                (Some(stored), expected) => stored == expected,
                (None, Value::Null) => true,
                (None, Value::String(s)) => s.is_empty(),
                _ => false,
            },
        };
        if !matched {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::core_knowledge_base;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::from_source(&core_knowledge_base()).unwrap()
    }

    fn product(reg: &SchemaRegistry, id: &str) -> Thing {
        let schema = reg.schemas.get("HardwareProduct").unwrap();
        let mut t = Thing::new("HardwareProduct");
        t.set("id", json!(id));
        t.set("name", json!(id));
        t.densify(schema);
        t
    }

    fn acu(reg: &SchemaRegistry, id: &str, assembly: &str, component: &str, qty: i64) -> Thing {
        let schema = reg.schemas.get("Acu").unwrap();
        let mut t = Thing::new("Acu");
        t.set("id", json!(id));
        t.set_ref("assembly", Some(assembly));
        t.set_ref("component", Some(component));
        t.set("quantity", json!(qty));
        t.densify(schema);
        t
    }

    #[test]
    fn test_id_round_trip() {
        let reg = registry();
        let mut store = ObjectStore::default();
        let p = product(&reg, "HW-1");
        let oid = p.oid.clone();
        store.insert_new(p.clone()).unwrap();
        assert_eq!(store.get(&oid), Some(&p));
    }

    #[test]
    fn test_duplicate_oid_refused() {
        let reg = registry();
        let mut store = ObjectStore::default();
        let p = product(&reg, "HW-1");
        store.insert_new(p.clone()).unwrap();
        let err = store.insert_new(p).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateOid(_)));
    }

    #[test]
    fn test_get_many_preserves_order_with_misses() {
        let reg = registry();
        let mut store = ObjectStore::default();
        let p1 = product(&reg, "HW-1");
        let p2 = product(&reg, "HW-2");
        let oids = vec![p2.oid.clone(), "missing".to_string(), p1.oid.clone()];
        store.insert_new(p1).unwrap();
        store.insert_new(p2).unwrap();
        let got = store.get_many(&oids);
        assert_eq!(got[0].unwrap().id(), "HW-2");
        assert!(got[1].is_none());
        assert_eq!(got[2].unwrap().id(), "HW-1");
    }

    #[test]
    fn test_type_queries() {
        let reg = registry();
        let mut store = ObjectStore::default();
        store.insert_new(product(&reg, "HW-1")).unwrap();
        let mut tmpl = Thing::new("Template");
        tmpl.set("id", json!("T-1"));
        store.insert_new(tmpl).unwrap();
        assert_eq!(store.get_by_type("HardwareProduct").len(), 1);
        assert_eq!(store.get_by_type("Product").len(), 0);
        assert_eq!(store.get_all_subtypes(&reg, "Product").len(), 2);
        let hw = store.get_by_type("HardwareProduct")[0];
        assert!(store.is_a(&reg, hw, "ManagedObject"));
        assert!(!store.is_a(&reg, hw, "Acu"));
    }

    #[test]
    fn test_inverse_resolution_via_reverse_index() {
        let reg = registry();
        let mut store = ObjectStore::default();
        let sc = product(&reg, "SC");
        let ant = product(&reg, "ANT");
        let usage = acu(&reg, "SC-ANT-1", &sc.oid, &ant.oid, 1);
        let sc_oid = sc.oid.clone();
        let ant_oid = ant.oid.clone();
        let usage_oid = usage.oid.clone();
        store.insert_new(sc).unwrap();
        store.insert_new(ant).unwrap();
        store.insert_new(usage).unwrap();
        let sc_ref = store.get(&sc_oid).unwrap();
        let components = store.resolve_inverse(&reg, sc_ref, "components");
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].oid, usage_oid);
        let ant_ref = store.get(&ant_oid).unwrap();
        let where_used = store.resolve_inverse(&reg, ant_ref, "where_used");
        assert_eq!(where_used.len(), 1);
        // removing the usage empties both directions
        store.remove(&usage_oid);
        let sc_ref = store.get(&sc_oid).unwrap();
        assert!(store.resolve_inverse(&reg, sc_ref, "components").is_empty());
    }

    #[test]
    fn test_upsert_reindexes_references() {
        let reg = registry();
        let mut store = ObjectStore::default();
        let sc = product(&reg, "SC");
        let a = product(&reg, "A");
        let b = product(&reg, "B");
        let mut usage = acu(&reg, "SC-1", &sc.oid, &a.oid, 1);
        let (sc_oid, a_oid, b_oid) = (sc.oid.clone(), a.oid.clone(), b.oid.clone());
        store.insert_new(sc).unwrap();
        store.insert_new(a).unwrap();
        store.insert_new(b).unwrap();
        store.insert_new(usage.clone()).unwrap();
        // repoint the component from a to b
        usage.set_ref("component", Some(&b_oid));
        store.upsert(usage);
        let a_ref = store.get(&a_oid).unwrap();
        assert!(store.resolve_inverse(&reg, a_ref, "where_used").is_empty());
        let b_ref = store.get(&b_oid).unwrap();
        assert_eq!(store.resolve_inverse(&reg, b_ref, "where_used").len(), 1);
        let sc_ref = store.get(&sc_oid).unwrap();
        assert_eq!(store.resolve_inverse(&reg, sc_ref, "components").len(), 1);
    }

    #[test]
    fn test_select_with_object_criteria() {
        let reg = registry();
        let mut store = ObjectStore::default();
        let sc = product(&reg, "SC");
        let ant = product(&reg, "ANT");
        let usage = acu(&reg, "SC-ANT-1", &sc.oid, &ant.oid, 1);
        let sc_oid = sc.oid.clone();
        store.insert_new(sc).unwrap();
        store.insert_new(ant).unwrap();
        store.insert_new(usage.clone()).unwrap();
        let found = store
            .select(&reg, "Acu", &[("assembly", json!(sc_oid))])
            .unwrap();
        assert_eq!(found.oid, usage.oid);
        // null criterion matches the null reference
        assert!(store
            .select(&reg, "Acu", &[("product_type_hint", Value::Null)])
            .is_some());
        assert!(store
            .select(&reg, "Acu", &[("assembly", json!("nope"))])
            .is_none());
    }

    #[test]
    fn test_search_exact_infers_domain() {
        let reg = registry();
        let mut store = ObjectStore::default();
        let mut p = product(&reg, "HW-1");
        p.set("frozen", json!(true));
        store.insert_new(p).unwrap();
        store.insert_new(product(&reg, "HW-2")).unwrap();
        // "frozen" lives on Product: search root is inferred
        let found = store.search_exact(&reg, None, &[("frozen", json!(true))]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), "HW-1");
        // a cname lacking the criteria fields yields nothing
        let none = store.search_exact(&reg, Some("Acu"), &[("frozen", json!(true))]);
        assert!(none.is_empty());
        // unknown property yields nothing
        assert!(store
            .search_exact(&reg, None, &[("no_such_field", json!(1))])
            .is_empty());
    }

    #[test]
    fn test_gen_product_id() {
        let reg = registry();
        let mut store = ObjectStore::default();
        let mut org = Thing::new("Organization");
        org.set("id", json!("GSFC"));
        let org_oid = org.oid.clone();
        store.insert_new(org).unwrap();
        let mut pt = Thing::new("ProductType");
        pt.set("id", json!("antenna"));
        pt.set("abbreviation", json!("ANT"));
        let pt_oid = pt.oid.clone();
        store.insert_new(pt).unwrap();
        let mut p = product(&reg, "");
        p.set_ref("owner", Some(&org_oid));
        p.set_ref("product_type", Some(&pt_oid));
        let id = store.gen_product_id(&p, false);
        assert_eq!(id, "GSFC-ANT-0000000");
        // store it and generate for a second product
        p.set("id", json!(id));
        store.insert_new(p.clone()).unwrap();
        let mut p2 = product(&reg, "");
        p2.set_ref("owner", Some(&org_oid));
        p2.set_ref("product_type", Some(&pt_oid));
        let id2 = store.gen_product_id(&p2, false);
        assert_eq!(id2, "GSFC-ANT-0000001");
        // vendor products use "Vendor" in place of the owner id
        let id3 = store.gen_product_id(&p2, true);
        assert!(id3.starts_with("Vendor-ANT-"));
        // a conforming id is kept
        assert_eq!(store.gen_product_id(&p, false), p.id());
        // non-products get nothing
        let a = acu(&reg, "x", "y", "z", 1);
        assert_eq!(store.gen_product_id(&a, false), "");
    }

    #[test]
    fn test_mod_dts_and_oid_cnames() {
        let reg = registry();
        let mut store = ObjectStore::default();
        let p = product(&reg, "HW-1");
        let oid = p.oid.clone();
        store.insert_new(p).unwrap();
        let dts = store.get_mod_dts(None);
        assert!(dts.contains_key(&oid));
        let cnames = store.get_oid_cnames(&[oid.clone()]);
        assert_eq!(cnames.get(&oid).unwrap(), "HardwareProduct");
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut store = ObjectStore::default();
        assert!(store.remove("ghost").is_none());
    }

    #[test]
    fn test_bulk_inserts_and_lookup() {
        use rand::Rng;
        let reg = registry();
        let mut store = ObjectStore::default();
        let mut rng = rand::thread_rng();
        let mut oids = Vec::new();
        for i in 0..50 {
            let mut p = product(&reg, &format!("HW-{i}"));
            p.set("iteration", json!(rng.gen_range(0..10)));
            oids.push(p.oid.clone());
            store.insert_new(p).unwrap();
        }
        assert_eq!(store.get_count("HardwareProduct"), 50);
        for oid in &oids {
            assert!(store.get(oid).is_some());
        }
        assert_eq!(store.get_ids(Some("HardwareProduct")).len(), 50);
    }
}
