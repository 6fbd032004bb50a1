// Copyright 2025 The OntoCore Authors.

//! Clone operations: duplicates and new versions of products
//!
//! Cloning a versionable Thing produces a fresh oid with copied field
//! values, parameters, and data elements. Clone-as-new-version is the
//! only operation that assigns a new `version_sequence`; the store itself
//! never does. Clones start unfrozen at iteration zero.

use crate::core::Core;
use crate::errors::{CoreResult, StoreError};
use crate::thing::{dtstamp, Thing};
use serde_json::json;
use tracing::debug;

impl Core {
    /// Clone a product as a new version: a fresh oid carrying the same
    /// id, the given version designator, the next `version_sequence`, and
    /// copies of the original's parameters, data elements, and direct
    /// component usages.
    pub fn clone_as_new_version(&mut self, oid: &str, version: &str) -> CoreResult<Thing> {
        let original = self
            .store
            .get(oid)
            .cloned()
            .ok_or_else(|| StoreError::UnknownClass(format!("no object with oid {oid}")))?;
        if !self.is_versionable(&original) {
            return Err(StoreError::DeleteRefused {
                oid: oid.to_string(),
                reason: "object is not versionable".to_string(),
            }
            .into());
        }
        let mut clone = self.clone_fields(&original);
        clone.set("version", json!(version));
        clone.set(
            "version_sequence",
            json!(original.get_i64("version_sequence") + 1),
        );
        debug!(original = %oid, clone = %clone.oid, version = %version, "cloned as new version");
        let clone_oid = clone.oid.clone();
        self.save(vec![clone])?;
        self.copy_parametrics(oid, &clone_oid);
        self.copy_usages(oid, &clone_oid)?;
        Ok(self.store.get(&clone_oid).cloned().expect("saved clone"))
    }

    /// Clone a Thing without versioning semantics: a fresh oid with
    /// copied fields, parameters, and data elements. The clone's id gets
    /// a discriminating suffix.
    pub fn clone_thing(&mut self, oid: &str) -> CoreResult<Thing> {
        let original = self
            .store
            .get(oid)
            .cloned()
            .ok_or_else(|| StoreError::UnknownClass(format!("no object with oid {oid}")))?;
        let mut clone = self.clone_fields(&original);
        clone.set("id", json!(format!("{}-copy", original.id())));
        let clone_oid = clone.oid.clone();
        self.save(vec![clone])?;
        self.copy_parametrics(oid, &clone_oid);
        Ok(self.store.get(&clone_oid).cloned().expect("saved clone"))
    }

    fn clone_fields(&mut self, original: &Thing) -> Thing {
        let mut clone = Thing::new(&original.cname);
        let fresh_oid = clone.oid.clone();
        for (field, value) in &original.fields {
            if field == "oid" {
                continue;
            }
            clone.set(field, value.clone());
        }
        clone.set("oid", json!(fresh_oid));
        clone.oid = fresh_oid;
        let now = dtstamp();
        clone.set("create_datetime", json!(now.clone()));
        clone.set("mod_datetime", json!(now));
        clone.set("iteration", json!(0));
        clone.set("frozen", json!(false));
        self.store.new_oids.insert(clone.oid.clone());
        clone
    }

    fn copy_parametrics(&mut self, from_oid: &str, to_oid: &str) {
        if let Some(parms) = self.engine.parameterz.get(from_oid).cloned() {
            for (pid, value) in parms {
                self.engine.insert_pval(to_oid, &pid, value);
            }
        }
        if let Some(des) = self.engine.data_elementz.get(from_oid).cloned() {
            self.engine
                .data_elementz
                .insert(to_oid.to_string(), des);
        }
    }

    fn copy_usages(&mut self, from_oid: &str, to_oid: &str) -> CoreResult<()> {
        let rows = self
            .engine
            .componentz
            .get(from_oid)
            .cloned()
            .unwrap_or_default();
        let clone_id = self
            .store
            .get(to_oid)
            .map(|t| t.id().to_string())
            .unwrap_or_default();
        for row in rows {
            let acu = self.create_thing(
                "Acu",
                &[
                    ("id", json!(crate::names::acu_id(&clone_id, &row.reference_designator))),
                    ("assembly", json!(to_oid)),
                    ("component", json!(row.oid)),
                    ("quantity", json!(row.quantity)),
                    ("reference_designator", json!(row.reference_designator)),
                ],
            )?;
            self.save(vec![acu])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> Core {
        Core::start().unwrap()
    }

    #[test]
    fn test_clone_as_new_version() {
        let mut core = core();
        let p = core
            .create_thing(
                "HardwareProduct",
                &[("id", json!("HW-1")), ("name", json!("Widget")), ("version", json!("1"))],
            )
            .unwrap();
        let oid = p.oid.clone();
        core.save(vec![p]).unwrap();
        core.engine
            .set_pval(&oid, "m", json!(5.0), None)
            .unwrap();
        let clone = core.clone_as_new_version(&oid, "2").unwrap();
        assert_ne!(clone.oid, oid);
        assert_eq!(clone.id(), "HW-1");
        assert_eq!(clone.get_str("version"), "2");
        assert_eq!(clone.get_i64("version_sequence"), 1);
        assert_eq!(clone.get_i64("iteration"), 0);
        assert!(!clone.get_bool("frozen"));
        // parameters travel with the clone
        assert_eq!(core.engine.get_pval_f64(&clone.oid, "m"), 5.0);
        // the original is untouched
        assert_eq!(core.store.get(&oid).unwrap().get_str("version"), "1");
    }

    #[test]
    fn test_clone_copies_component_usages() {
        let mut core = core();
        let sc = core
            .create_thing("HardwareProduct", &[("id", json!("SC")), ("version", json!("1"))])
            .unwrap();
        let a = core
            .create_thing("HardwareProduct", &[("id", json!("A"))])
            .unwrap();
        let (sc_oid, a_oid) = (sc.oid.clone(), a.oid.clone());
        core.save(vec![sc, a]).unwrap();
        let acu = core
            .create_thing(
                "Acu",
                &[
                    ("id", json!("SC-ANT-1")),
                    ("assembly", json!(sc_oid)),
                    ("component", json!(a_oid)),
                    ("quantity", json!(2)),
                    ("reference_designator", json!("ANT-1")),
                ],
            )
            .unwrap();
        core.save(vec![acu]).unwrap();
        let clone = core.clone_as_new_version(&sc_oid, "2").unwrap();
        let rows = core.engine.componentz.get(&clone.oid).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].oid, a_oid);
        assert_eq!(rows[0].quantity, 2);
        // the component is now used in both assemblies
        let a_ref = core.store.get(&a_oid).unwrap();
        assert_eq!(
            core.store
                .resolve_inverse(&core.registry, a_ref, "where_used")
                .len(),
            2
        );
    }

    #[test]
    fn test_clone_non_versionable_refused() {
        let mut core = core();
        let person = core
            .create_thing("Person", &[("id", json!("jdoe"))])
            .unwrap();
        let oid = person.oid.clone();
        core.save(vec![person]).unwrap();
        assert!(core.clone_as_new_version(&oid, "2").is_err());
        // the plain clone path still works
        let clone = core.clone_thing(&oid).unwrap();
        assert_eq!(clone.id(), "jdoe-copy");
    }
}
