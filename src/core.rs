// Copyright 2025 The OntoCore Authors.

//! The core: one value owning the registry, the object store, and the
//! parametric engine
//!
//! The process-wide mutable caches of a typical modeling tool become
//! fields of this single `Core` value, owned by the core worker and passed
//! explicitly to every API. Saving mutates the store, refreshes the
//! derived caches for the affected classes, and recomputes eagerly;
//! deletion cascades along dependent structures before removing entries.

use crate::config::{Config, Prefs, State};
use crate::errors::{CoreResult, StoreError};
use crate::parametrics::{
    Comp, Constraint, ParametricEngine, RequirementView, SystemUsage, UsageView,
};
use crate::refdata;
use crate::registry::SchemaRegistry;
use crate::store::ObjectStore;
use crate::thing::Thing;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Maximum assembly depth examined by cycle detection
const CYCLE_CHECK_DEPTH: usize = 5;

/// The core hub for object metadata, storage, and computation
pub struct Core {
    /// Schema registry built from the ontology
    pub registry: SchemaRegistry,
    /// The object store
    pub store: ObjectStore,
    /// The parametric engine and its caches
    pub engine: ParametricEngine,
    /// Installation configuration
    pub config: Config,
    /// Session state
    pub state: State,
    /// User preferences
    pub prefs: Prefs,
    /// Serialized records of locally created objects that were deleted
    pub trash: HashMap<String, Vec<crate::serializers::SerializedRecord>>,
    /// Role id -> product type ids the role covers
    pub role_product_types: HashMap<String, BTreeSet<String>>,
    /// Diagram layout cache, held for clients; opaque to the core
    pub diagramz: HashMap<String, Value>,
    /// Serialized role assignments of the local user
    pub user_raz: Vec<crate::serializers::SerializedRecord>,
}

impl Core {
    /// Create a core over a registry, with default configuration
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            registry,
            store: ObjectStore::default(),
            engine: ParametricEngine::default(),
            config: Config::default(),
            state: State::default(),
            prefs: Prefs::default(),
            trash: HashMap::new(),
            role_product_types: HashMap::new(),
            diagramz: HashMap::new(),
            user_raz: Vec::new(),
        }
    }

    /// Create a core from the embedded ontology and load reference data
    pub fn start() -> CoreResult<Self> {
        let registry = SchemaRegistry::from_source(&crate::ontology::core_knowledge_base())?;
        let mut core = Self::new(registry);
        core.load_reference_data()?;
        Ok(core)
    }

    /// Push preference and configuration values down into the engine
    pub fn apply_settings(&mut self) {
        self.engine.precision = self.prefs.numeric_precision;
        self.engine.numeric_format = self.prefs.numeric_format;
        self.engine.p_defaults = self.state.p_defaults.clone();
        self.engine.de_defaults = self.state.de_defaults.clone();
    }

    /// Seed and refresh reference data, rebuild the definition caches and
    /// derived indices, and recompute.
    pub fn load_reference_data(&mut self) -> CoreResult<()> {
        info!("checking reference data");
        let all = refdata::all();
        let missing: Vec<_> = all
            .iter()
            .filter(|r| {
                r.get("oid")
                    .and_then(|v| v.as_str())
                    .map(|oid| !self.store.contains(oid))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        if !missing.is_empty() {
            debug!(count = missing.len(), "loading missing reference data");
            crate::serializers::deserialize(self, missing, true, true, false)?;
        }
        // refresh stored copies that are older than the embedded release
        let ref_oids: Vec<String> = refdata::ref_oids().into_iter().collect();
        let mod_dts = self.store.get_mod_dts(Some(&ref_oids));
        let updated: Vec<_> = all
            .iter()
            .filter(|r| {
                let oid = r.get("oid").and_then(|v| v.as_str()).unwrap_or("");
                let incoming = crate::thing::normalize_datetime(
                    r.get("mod_datetime").and_then(|v| v.as_str()).unwrap_or(""),
                );
                mod_dts
                    .get(oid)
                    .map(|stored| incoming.as_str() > stored.as_str())
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        if !updated.is_empty() {
            debug!(count = updated.len(), "refreshing updated reference data");
            crate::serializers::deserialize(self, updated, true, true, true)?;
        }
        // remove deprecated reference objects
        let deprecated: Vec<String> = refdata::deprecated()
            .into_iter()
            .filter(|oid| self.store.contains(oid))
            .collect();
        if !deprecated.is_empty() {
            debug!(count = deprecated.len(), "removing deprecated reference data");
            self.delete(&deprecated)?;
        }
        self.rebuild_definition_caches();
        self.rebuild_assembly_caches();
        self.rebuild_role_product_types();
        let rqt_oids = self.store.get_oids(Some("Requirement"));
        for oid in rqt_oids {
            self.refresh_requirement_allocation(&oid);
        }
        self.recompute();
        info!("reference data loaded");
        Ok(())
    }

    /// Rebuild `parm_defz`, `parmz_by_dimz`, and `de_defz` from definition
    /// Things in the store.
    pub fn rebuild_definition_caches(&mut self) {
        let defs: Vec<Thing> = self
            .store
            .get_by_type("ParameterDefinition")
            .into_iter()
            .cloned()
            .collect();
        let contexts: Vec<Thing> = self
            .store
            .get_by_type("ParameterContext")
            .into_iter()
            .cloned()
            .collect();
        let def_refs: Vec<&Thing> = defs.iter().collect();
        let ctx_refs: Vec<&Thing> = contexts.iter().collect();
        self.engine.create_parm_defz(&def_refs, &ctx_refs);
        let deds: Vec<Thing> = self
            .store
            .get_by_type("DataElementDefinition")
            .into_iter()
            .cloned()
            .collect();
        let ded_refs: Vec<&Thing> = deds.iter().collect();
        self.engine.create_de_defz(&ded_refs);
    }

    /// Rebuild `componentz` and `systemz` from the usage Things in the
    /// store.
    pub fn rebuild_assembly_caches(&mut self) {
        let assembly_oids: BTreeSet<String> = self
            .store
            .get_by_type("Acu")
            .iter()
            .filter_map(|a| a.get_ref("assembly").map(String::from))
            .collect();
        for assembly_oid in assembly_oids {
            let rows = self.component_rows(&assembly_oid);
            self.engine.refresh_componentz(&assembly_oid, rows);
        }
        let project_oids: BTreeSet<String> = self
            .store
            .get_by_type("ProjectSystemUsage")
            .iter()
            .filter_map(|p| p.get_ref("project").map(String::from))
            .collect();
        for project_oid in project_oids {
            let rows = self.system_rows(&project_oid);
            self.engine.refresh_systemz(&project_oid, rows);
        }
    }

    /// Rebuild the role-to-product-type coverage map from discipline
    /// associations.
    pub fn rebuild_role_product_types(&mut self) {
        // discipline -> product type ids
        let mut discipline_subsystems: HashMap<String, BTreeSet<String>> = HashMap::new();
        for dpt in self.store.get_by_type("DisciplineProductType") {
            let did = dpt
                .get_ref("used_in_discipline")
                .and_then(|oid| self.store.get(oid))
                .map(|d| d.id().to_string())
                .unwrap_or_default();
            let ptid = dpt
                .get_ref("relevant_product_type")
                .and_then(|oid| self.store.get(oid))
                .map(|pt| pt.id().to_string())
                .unwrap_or_default();
            if !did.is_empty() && !ptid.is_empty() {
                discipline_subsystems.entry(did).or_default().insert(ptid);
            }
        }
        // role -> discipline ids, then compose
        let mut map: HashMap<String, BTreeSet<String>> = HashMap::new();
        for dr in self.store.get_by_type("DisciplineRole") {
            let did = dr
                .get_ref("related_to_discipline")
                .and_then(|oid| self.store.get(oid))
                .map(|d| d.id().to_string())
                .unwrap_or_default();
            let rid = dr
                .get_ref("related_role")
                .and_then(|oid| self.store.get(oid))
                .map(|r| r.id().to_string())
                .unwrap_or_default();
            if rid.is_empty() || did.is_empty() {
                continue;
            }
            if let Some(pts) = discipline_subsystems.get(&did) {
                map.entry(rid).or_default().extend(pts.iter().cloned());
            }
        }
        self.role_product_types = map;
    }

    /// Component rows of an assembly, read from its Acus in the store
    pub fn component_rows(&self, assembly_oid: &str) -> Vec<Comp> {
        self.store
            .referencing(&self.registry, assembly_oid, "Acu", "assembly")
            .iter()
            .filter_map(|usage_oid| self.store.get(usage_oid))
            .filter_map(|acu| {
                let component_oid = acu.get_ref("component")?;
                Some(Comp {
                    oid: component_oid.to_string(),
                    usage_oid: acu.oid.clone(),
                    quantity: acu.get_i64("quantity").max(1),
                    reference_designator: acu.get_str("reference_designator").to_string(),
                })
            })
            .collect()
    }

    /// System rows of a project, read from its PSUs in the store
    pub fn system_rows(&self, project_oid: &str) -> Vec<SystemUsage> {
        self.store
            .referencing(&self.registry, project_oid, "ProjectSystemUsage", "project")
            .iter()
            .filter_map(|usage_oid| self.store.get(usage_oid))
            .filter_map(|psu| {
                let system_oid = psu.get_ref("system")?;
                Some(SystemUsage {
                    oid: system_oid.to_string(),
                    usage_oid: psu.oid.clone(),
                    system_role: psu.get_str("system_role").to_string(),
                })
            })
            .collect()
    }

    /// True if the Thing's class carries version fields
    pub fn is_versionable(&self, thing: &Thing) -> bool {
        self.registry
            .schemas
            .get(&thing.cname)
            .map(|s| s.is_versionable())
            .unwrap_or(false)
    }

    /// Save Things to the store.
    ///
    /// The store never rewrites `mod_datetime`: callers stamp locally
    /// modified objects before saving so remote updates keep their remote
    /// timestamps. Existing versionable Things get their `iteration`
    /// bumped; a missing `owner` falls back to the creator's organization
    /// and then the platform root; HardwareProducts are guaranteed the
    /// canonical `m`, `P`, `R_D` parameters. Derived caches are refreshed
    /// and a recompute runs before return when anything structural
    /// changed.
    pub fn save(&mut self, things: Vec<Thing>) -> CoreResult<()> {
        let recompute_required = self.save_without_recompute(things)?;
        if recompute_required {
            self.recompute();
        }
        Ok(())
    }

    pub(crate) fn save_without_recompute(&mut self, things: Vec<Thing>) -> CoreResult<bool> {
        let mut recompute_required = false;
        for mut thing in things {
            let schema = self
                .registry
                .schemas
                .get(&thing.cname)
                .ok_or_else(|| StoreError::UnknownClass(thing.cname.clone()))?
                .clone();
            thing.densify(&schema);
            let new = !self.store.contains(&thing.oid);
            if new {
                debug!(id = %thing.id(), cname = %thing.cname, "saving new object");
            } else {
                debug!(id = %thing.id(), cname = %thing.cname, "updating existing object");
                if schema.is_versionable() {
                    let iteration = self
                        .store
                        .get(&thing.oid)
                        .map(|t| t.get_i64("iteration"))
                        .unwrap_or(0);
                    thing.set("iteration", json!(iteration + 1));
                }
            }
            self.store.new_oids.remove(&thing.oid);
            // owner fallback: creator's organization, then the platform root
            if schema.fields.contains_key("owner") && thing.get_ref("owner").is_none() {
                let creator_org = thing
                    .get_ref("creator")
                    .and_then(|c| self.store.get(c))
                    .and_then(|c| c.get_ref("org").map(String::from));
                let owner = creator_org.unwrap_or_else(|| refdata::ROOT_ORG_OID.to_string());
                thing.set_ref("owner", Some(&owner));
            }
            // an object used in assemblies affects rollups above it
            if !self
                .store
                .referencing(&self.registry, &thing.oid, "Acu", "component")
                .is_empty()
            {
                recompute_required = true;
            }
            let cname = thing.cname.clone();
            let oid = thing.oid.clone();
            self.store.upsert(thing);
            match cname.as_str() {
                "Acu" => {
                    recompute_required = true;
                    self.after_acu_save(&oid, new);
                }
                "HardwareProduct" => {
                    recompute_required = true;
                    for pid in ["m", "P", "R_D"] {
                        self.engine.add_parameter(&oid, pid);
                    }
                    let product_type_id = self
                        .store
                        .get(&oid)
                        .and_then(|t| t.get_ref("product_type"))
                        .and_then(|pt| self.store.get(pt))
                        .map(|pt| pt.id().to_string());
                    let preferred = if self.prefs.default_parms.is_empty() {
                        self.state.default_parms.clone()
                    } else {
                        self.prefs.default_parms.clone()
                    };
                    self.engine.add_default_parameters(
                        &oid,
                        "HardwareProduct",
                        product_type_id.as_deref(),
                        &preferred,
                    );
                    let configured = self.config.default_data_elements.clone();
                    self.engine.add_default_data_elements(
                        &oid,
                        "HardwareProduct",
                        product_type_id.as_deref(),
                        &configured,
                    );
                }
                "ProjectSystemUsage" => {
                    if let Some(project_oid) = self
                        .store
                        .get(&oid)
                        .and_then(|t| t.get_ref("project").map(String::from))
                    {
                        let rows = self.system_rows(&project_oid);
                        self.engine.refresh_systemz(&project_oid, rows);
                    }
                    if !new {
                        self.refresh_allocations_of_usage(&oid);
                    }
                }
                "Requirement" => {
                    self.refresh_requirement_allocation(&oid);
                    let is_performance = self
                        .store
                        .get(&oid)
                        .map(|t| t.get_str("rqt_type") == "performance")
                        .unwrap_or(false);
                    if is_performance {
                        recompute_required = true;
                    }
                }
                "DataElementDefinition" => {
                    if let Some(mut ded) = self.store.get(&oid).cloned() {
                        ded.set("public", json!(true));
                        let ded_ref = ded.clone();
                        self.store.upsert(ded);
                        self.engine.update_de_defz(&ded_ref);
                    }
                }
                "ParameterDefinition" => {
                    if let Some(mut pd) = self.store.get(&oid).cloned() {
                        pd.set("public", json!(true));
                        let pd_ref = pd.clone();
                        self.store.upsert(pd);
                        self.engine.update_parm_defz(&pd_ref);
                        let contexts: Vec<Thing> = self
                            .store
                            .get_by_type("ParameterContext")
                            .into_iter()
                            .cloned()
                            .collect();
                        for context in &contexts {
                            self.engine.add_context_parm_def(&pd_ref, context);
                        }
                    }
                }
                "ParameterContext" => {
                    if let Some(context) = self.store.get(&oid).cloned() {
                        let defs: Vec<Thing> = self
                            .store
                            .get_by_type("ParameterDefinition")
                            .into_iter()
                            .cloned()
                            .collect();
                        for pd in &defs {
                            self.engine.add_context_parm_def(pd, &context);
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(recompute_required)
    }

    fn after_acu_save(&mut self, acu_oid: &str, new: bool) {
        let Some(acu) = self.store.get(acu_oid) else {
            return;
        };
        let assembly_oid = acu.get_ref("assembly").map(String::from);
        let component_oid = acu.get_ref("component").map(String::from);
        let Some(assembly_oid) = assembly_oid else {
            warn!(acu = %acu_oid, "usage has no assembly; indices not refreshed");
            return;
        };
        // the componentz cache tells whether the component was swapped
        let comp_changed = !self
            .engine
            .componentz
            .get(&assembly_oid)
            .map(|rows| {
                rows.iter().any(|r| {
                    r.usage_oid == acu_oid && Some(r.oid.as_str()) == component_oid.as_deref()
                })
            })
            .unwrap_or(false);
        let rows = self.component_rows(&assembly_oid);
        self.engine.refresh_componentz(&assembly_oid, rows);
        if !new && comp_changed {
            debug!(acu = %acu_oid, "component changed, refreshing allocated requirements");
            self.refresh_allocations_of_usage(acu_oid);
        }
    }

    /// Refresh allocation entries for requirements allocated to a usage
    fn refresh_allocations_of_usage(&mut self, usage_oid: &str) {
        let rqt_oids: Vec<String> = self
            .engine
            .rqt_allocz
            .iter()
            .filter(|(_, alloc)| alloc.usage_oid == usage_oid)
            .map(|(oid, _)| oid.clone())
            .collect();
        for rqt_oid in rqt_oids {
            if self.store.contains(&rqt_oid) {
                self.refresh_requirement_allocation(&rqt_oid);
            } else {
                self.engine.remove_allocation(&rqt_oid);
            }
        }
    }

    /// Build the allocation view of a requirement and refresh the index
    pub fn refresh_requirement_allocation(&mut self, rqt_oid: &str) {
        let Some(view) = self.requirement_view(rqt_oid) else {
            return;
        };
        self.engine.refresh_allocation(&view);
    }

    /// The allocation-relevant projection of a Requirement Thing
    pub fn requirement_view(&self, rqt_oid: &str) -> Option<RequirementView> {
        let rqt = self.store.get(rqt_oid)?;
        let allocated_to = rqt.get_ref("allocated_to").and_then(|usage_oid| {
            let usage = self.store.get(usage_oid)?;
            Some(match usage.cname.as_str() {
                "Acu" => UsageView::Component {
                    usage_oid: usage.oid.clone(),
                    component_oid: usage.get_ref("component").unwrap_or("").to_string(),
                    ref_des: first_non_empty(&[
                        usage.get_str("reference_designator"),
                        usage.name(),
                        usage.id(),
                    ]),
                },
                "ProjectSystemUsage" => UsageView::System {
                    usage_oid: usage.oid.clone(),
                    system_oid: usage.get_ref("system").unwrap_or("").to_string(),
                    role: first_non_empty(&[
                        usage.get_str("system_role"),
                        usage.name(),
                        usage.id(),
                    ]),
                },
                _ => UsageView::Project {
                    oid: usage.oid.clone(),
                    id: usage.id().to_string(),
                },
            })
        });
        // the correlated parameter comes through the computable form's
        // parameter relation
        let correlated_pid = rqt.get_ref("computable_form").and_then(|rel_oid| {
            let parm_rels =
                self.store
                    .referencing(&self.registry, rel_oid, "ParameterRelation", "referenced_relation");
            let pr = self.store.get(parm_rels.first()?)?;
            let pd = self.store.get(pr.get_ref("correlates_parameter")?)?;
            Some(pd.id().to_string())
        });
        Some(RequirementView {
            oid: rqt.oid.clone(),
            rqt_type: rqt.get_str("rqt_type").to_string(),
            allocated_to,
            correlated_pid,
            constraint: Constraint {
                units: rqt.get_str("rqt_units").to_string(),
                target: rqt.get_f64("rqt_target_value"),
                max: rqt.get_f64("rqt_maximum_value"),
                min: rqt.get_f64("rqt_minimum_value"),
                tol: rqt.get_f64("rqt_tolerance"),
                upper: rqt.get_f64("rqt_tolerance_upper"),
                lower: rqt.get_f64("rqt_tolerance_lower"),
                constraint_type: rqt.get_str("rqt_constraint_type").to_string(),
                tol_type: rqt.get_str("rqt_tolerance_type").to_string(),
            },
        })
    }

    /// Recompute all derived parameters and margins
    pub fn recompute(&mut self) {
        let hw_oids = self.store.get_oids(Some("HardwareProduct"));
        let contexts = self.config.descriptive_contexts.clone();
        let variables = self.config.variables.clone();
        self.engine.recompute(&hw_oids, &contexts, &variables);
    }

    /// Delete objects, cascading along dependent structures.
    ///
    /// Refusals (a Product still in use, a Person with created objects)
    /// surface as [`StoreError::DeleteRefused`]. Missing oids are a logged
    /// no-op. Derived caches are refreshed and a recompute runs before
    /// return.
    pub fn delete(&mut self, oids: &[String]) -> CoreResult<()> {
        // popped from the back, so requested oids process in caller order
        let mut worklist: Vec<String> = oids.iter().rev().cloned().collect();
        let mut recompute_required = false;
        let mut refresh_assemblies: BTreeSet<String> = BTreeSet::new();
        while let Some(oid) = worklist.pop() {
            let Some(thing) = self.store.get(&oid).cloned() else {
                debug!(oid = %oid, "delete: not found, ignored");
                continue;
            };
            match thing.cname.as_str() {
                "Project" => {
                    // cascade to role assignments and system usages
                    worklist.extend(self.store.referencing(
                        &self.registry,
                        &oid,
                        "RoleAssignment",
                        "role_assignment_context",
                    ));
                    worklist.extend(self.store.referencing(
                        &self.registry,
                        &oid,
                        "ProjectSystemUsage",
                        "project",
                    ));
                }
                "Person" => {
                    let created =
                        self.store
                            .referencing(&self.registry, &oid, "Identifiable", "creator");
                    if !created.is_empty() {
                        return Err(StoreError::DeleteRefused {
                            oid: oid.clone(),
                            reason: format!(
                                "person has {} created objects; delete them first",
                                created.len()
                            ),
                        }
                        .into());
                    }
                    worklist.extend(self.store.referencing(
                        &self.registry,
                        &oid,
                        "RoleAssignment",
                        "assigned_to",
                    ));
                }
                "Organization" => {
                    // reassign owned objects to the parent org or the root
                    let new_owner = thing
                        .get_ref("parent_organization")
                        .map(String::from)
                        .unwrap_or_else(|| refdata::ROOT_ORG_OID.to_string());
                    let owned = self
                        .store
                        .referencing(&self.registry, &oid, "ManagedObject", "owner");
                    for owned_oid in owned {
                        if let Some(mut obj) = self.store.get(&owned_oid).cloned() {
                            obj.set_ref("owner", Some(&new_owner));
                            self.store.upsert(obj);
                        }
                    }
                }
                "Acu" | "ProjectSystemUsage" => {
                    for flow_oid in self.usage_flows(&oid) {
                        worklist.push(flow_oid);
                    }
                    if thing.cname == "Acu" {
                        if let Some(assembly_oid) = thing.get_ref("assembly") {
                            refresh_assemblies.insert(assembly_oid.to_string());
                        }
                        recompute_required = true;
                    } else if let Some(project_oid) = thing.get_ref("project") {
                        let project_oid = project_oid.to_string();
                        // refresh after removal below
                        refresh_assemblies.insert(format!("project:{project_oid}"));
                    }
                }
                "Port" => {
                    worklist.extend(self.port_flows(&oid));
                }
                "Requirement" => {
                    // cascade to the computable form and its parameter
                    // relations; purge the allocation entry
                    if let Some(rel_oid) = thing.get_ref("computable_form") {
                        worklist.extend(self.store.referencing(
                            &self.registry,
                            rel_oid,
                            "ParameterRelation",
                            "referenced_relation",
                        ));
                        worklist.push(rel_oid.to_string());
                        recompute_required = true;
                    }
                    self.engine.remove_allocation(&oid);
                }
                _ => {}
            }
            if self.registry.is_subclass(&thing.cname, "Product") && thing.cname != "Acu" {
                let where_used =
                    self.store
                        .referencing(&self.registry, &oid, "Acu", "component");
                if !where_used.is_empty() {
                    return Err(StoreError::DeleteRefused {
                        oid: oid.clone(),
                        reason: "product is used in assemblies".to_string(),
                    }
                    .into());
                }
                // cascade to internal flows, ports, project usages, and
                // the product's own component usages
                worklist.extend(self.store.referencing(&self.registry, &oid, "Flow", "flow_context"));
                worklist.extend(self.store.referencing(&self.registry, &oid, "Port", "of_product"));
                worklist.extend(self.store.referencing(
                    &self.registry,
                    &oid,
                    "ProjectSystemUsage",
                    "system",
                ));
                worklist.extend(self.store.referencing(&self.registry, &oid, "Acu", "assembly"));
                self.engine.remove_assembly(&oid);
            }
            if self.engine.parameterz.contains_key(&oid) {
                self.engine.purge_object(&oid);
                recompute_required = true;
            }
            // record locally created objects in the trash
            let local_user = self.state.local_user_oid.clone();
            if !local_user.is_empty() && thing.get_ref("creator") == Some(local_user.as_str()) {
                let records = crate::serializers::serialize(self, &[oid.clone()], false, false);
                self.trash.insert(oid.clone(), records);
            }
            self.store.remove(&oid);
        }
        // refresh affected assembly and project indices, skipping any
        // that were themselves removed by the cascade
        for key in refresh_assemblies {
            if let Some(project_oid) = key.strip_prefix("project:") {
                if self.store.contains(project_oid) {
                    let rows = self.system_rows(project_oid);
                    self.engine.refresh_systemz(project_oid, rows);
                }
            } else if self.store.contains(&key) {
                let rows = self.component_rows(&key);
                self.engine.refresh_componentz(&key, rows);
            }
        }
        if recompute_required {
            self.recompute();
        }
        Ok(())
    }

    /// Flows attached to a usage: flows in the assembly's context that
    /// start or end at a port of the usage's component.
    pub fn usage_flows(&self, usage_oid: &str) -> Vec<String> {
        let Some(usage) = self.store.get(usage_oid) else {
            return Vec::new();
        };
        if usage.cname != "Acu" {
            // a project context cannot have flows
            return Vec::new();
        }
        let (Some(assembly_oid), Some(component_oid)) =
            (usage.get_ref("assembly"), usage.get_ref("component"))
        else {
            return Vec::new();
        };
        let ports: BTreeSet<String> = self
            .store
            .referencing(&self.registry, component_oid, "Port", "of_product")
            .into_iter()
            .collect();
        if ports.is_empty() {
            return Vec::new();
        }
        self.store
            .referencing(&self.registry, assembly_oid, "Flow", "flow_context")
            .into_iter()
            .filter(|flow_oid| {
                self.store.get(flow_oid).is_some_and(|flow| {
                    flow.get_ref("start_port")
                        .map(|p| ports.contains(p))
                        .unwrap_or(false)
                        || flow
                            .get_ref("end_port")
                            .map(|p| ports.contains(p))
                            .unwrap_or(false)
                })
            })
            .collect()
    }

    /// Flows into and out of a port
    pub fn port_flows(&self, port_oid: &str) -> Vec<String> {
        let mut flows = self
            .store
            .referencing(&self.registry, port_oid, "Flow", "start_port");
        flows.extend(
            self.store
                .referencing(&self.registry, port_oid, "Flow", "end_port"),
        );
        flows
    }

    /// Ports whose flows feed into this port
    pub fn feeds_from(&self, port_oid: &str) -> Vec<String> {
        self.store
            .referencing(&self.registry, port_oid, "Flow", "end_port")
            .iter()
            .filter_map(|f| self.store.get(f))
            .filter_map(|f| f.get_ref("start_port").map(String::from))
            .collect()
    }

    /// Ports fed by flows out of this port
    pub fn feeds_into(&self, port_oid: &str) -> Vec<String> {
        self.store
            .referencing(&self.registry, port_oid, "Flow", "start_port")
            .iter()
            .filter_map(|f| self.store.get(f))
            .filter_map(|f| f.get_ref("end_port").map(String::from))
            .collect()
    }

    /// Check an assembly for cycles to a bounded depth. Returns a
    /// diagnostic naming the offending level, or `None` for an acyclic
    /// assembly (within the checked depth).
    pub fn check_for_cycles(&self, product_oid: &str) -> Option<String> {
        let product_id = self
            .store
            .get(product_oid)
            .map(|p| p.id().to_string())
            .unwrap_or_default();
        let mut level: Vec<String> = vec![product_oid.to_string()];
        for depth in 1..=CYCLE_CHECK_DEPTH {
            let mut next: Vec<String> = Vec::new();
            for oid in &level {
                if let Some(rows) = self.engine.componentz.get(oid) {
                    next.extend(rows.iter().map(|r| r.oid.clone()));
                }
            }
            if next.iter().any(|oid| oid == product_oid) {
                let msg = format!(
                    "product {product_oid} (id: \"{product_id}\") is a level-{depth} component of itself."
                );
                warn!("{msg}");
                return Some(msg);
            }
            if next.is_empty() {
                return None;
            }
            level = next;
        }
        None
    }

    /// The bill of materials of a product: oids of every component at
    /// every assembly level. Returns `[]` for cyclic assemblies instead of
    /// diverging.
    pub fn get_bom(&self, product_oid: &str) -> Vec<String> {
        if self.check_for_cycles(product_oid).is_some() {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.collect_bom(product_oid, &mut out, &mut path);
        out
    }

    fn collect_bom(&self, oid: &str, out: &mut Vec<String>, path: &mut Vec<String>) {
        if path.iter().any(|p| p == oid) {
            return;
        }
        path.push(oid.to_string());
        if let Some(rows) = self.engine.componentz.get(oid) {
            for row in rows {
                out.push(row.oid.clone());
                self.collect_bom(&row.oid, out, path);
            }
        }
        path.pop();
    }

    /// The assembly closure of a product: component oids plus usage oids
    /// at every level.
    pub fn get_assembly(&self, product_oid: &str) -> Vec<String> {
        if self.check_for_cycles(product_oid).is_some() {
            return Vec::new();
        }
        let mut products = vec![product_oid.to_string()];
        products.extend(self.get_bom(product_oid));
        let mut out: Vec<String> = Vec::new();
        for product in &products {
            if let Some(rows) = self.engine.componentz.get(product) {
                for row in rows {
                    if !out.contains(&row.oid) {
                        out.push(row.oid.clone());
                    }
                    if !out.contains(&row.usage_oid) {
                        out.push(row.usage_oid.clone());
                    }
                }
            }
        }
        out
    }

    /// All objects relevant to a project: the project, objects it owns,
    /// its system usages and systems, assembly closures, requirement
    /// relations, models, representations, and ports and flows of the
    /// products involved. Returns the partial result when a system
    /// assembly is cyclic.
    pub fn get_objects_for_project(&self, project_oid: &str) -> Vec<String> {
        let Some(project) = self.store.get(project_oid) else {
            return Vec::new();
        };
        if project.cname != "Project" {
            return Vec::new();
        }
        let mut out: Vec<String> = Vec::new();
        let push = |oid: String, out: &mut Vec<String>| {
            if !oid.is_empty() && !out.contains(&oid) {
                out.push(oid);
            }
        };
        push(project_oid.to_string(), &mut out);
        for obj in self.store.get_all_subtypes(&self.registry, "ManagedObject") {
            if obj.get_ref("owner") == Some(project_oid) {
                push(obj.oid.clone(), &mut out);
            }
        }
        let psus = self
            .store
            .referencing(&self.registry, project_oid, "ProjectSystemUsage", "project");
        for psu_oid in &psus {
            push(psu_oid.clone(), &mut out);
            let Some(system_oid) = self
                .store
                .get(psu_oid)
                .and_then(|p| p.get_ref("system").map(String::from))
            else {
                continue;
            };
            push(system_oid.clone(), &mut out);
            if self.check_for_cycles(&system_oid).is_some() {
                // cyclic system: stop here with the intermediate result
                return out;
            }
            for oid in self.get_assembly(&system_oid) {
                push(oid, &mut out);
            }
        }
        // requirement computable forms and their parameter relations
        for rqt in self.store.get_by_type("Requirement") {
            if rqt.get_ref("owner") != Some(project_oid) {
                continue;
            }
            if let Some(rel_oid) = rqt.get_ref("computable_form") {
                push(rel_oid.to_string(), &mut out);
                for pr in self.store.referencing(
                    &self.registry,
                    rel_oid,
                    "ParameterRelation",
                    "referenced_relation",
                ) {
                    push(pr, &mut out);
                }
            }
        }
        // models of everything collected, their representations and files
        let snapshot = out.clone();
        for oid in &snapshot {
            for model_oid in self.store.referencing(&self.registry, oid, "Model", "of_thing") {
                push(model_oid.clone(), &mut out);
                for rep_oid in
                    self.store
                        .referencing(&self.registry, &model_oid, "Representation", "of_model")
                {
                    push(rep_oid.clone(), &mut out);
                    for file_oid in self.store.referencing(
                        &self.registry,
                        &rep_oid,
                        "RepresentationFile",
                        "of_object",
                    ) {
                        push(file_oid, &mut out);
                    }
                }
            }
        }
        // ports and internal flows of the products involved
        let snapshot = out.clone();
        for oid in &snapshot {
            let Some(obj) = self.store.get(oid) else {
                continue;
            };
            if self.registry.is_subclass(&obj.cname, "Product") {
                for port in self.store.referencing(&self.registry, oid, "Port", "of_product") {
                    push(port, &mut out);
                }
                for flow in self.store.referencing(&self.registry, oid, "Flow", "flow_context") {
                    push(flow, &mut out);
                }
            }
        }
        out
    }

    /// Requirements owned by a project
    pub fn requirements_for_project(&self, project_oid: &str) -> Vec<&Thing> {
        self.store
            .get_by_type("Requirement")
            .into_iter()
            .filter(|r| r.get_ref("owner") == Some(project_oid))
            .collect()
    }

    /// The preferred display units for a dimension, falling back to the
    /// SI base unit.
    pub fn preferred_units(&self, dimension: &str) -> String {
        self.prefs
            .units
            .get(dimension)
            .cloned()
            .unwrap_or_else(|| crate::units::si_unit(dimension).to_string())
    }

    /// Generate a unique product id, using "Vendor" as the owner part when
    /// the object's Vendor data element is populated.
    pub fn gen_product_id(&self, obj: &Thing) -> String {
        let vendor = !self
            .engine
            .get_dval_as_str(&obj.oid, "Vendor")
            .trim_matches('-')
            .is_empty();
        self.store.gen_product_id(obj, vendor)
    }

    /// Create a Thing of a class with the given field values, register it
    /// as unsaved, and return it. The caller saves it when ready.
    pub fn create_thing(
        &mut self,
        cname: &str,
        fields: &[(&str, Value)],
    ) -> CoreResult<Thing> {
        let schema = self
            .registry
            .schemas
            .get(cname)
            .ok_or_else(|| StoreError::UnknownClass(cname.to_string()))?
            .clone();
        let mut thing = Thing::new(cname);
        for (field, value) in fields {
            thing.set_per_schema(&schema, field, value.clone());
        }
        thing.densify(&schema);
        self.store.new_oids.insert(thing.oid.clone());
        Ok(thing)
    }
}

fn first_non_empty(candidates: &[&str]) -> String {
    candidates
        .iter()
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_default()
}
