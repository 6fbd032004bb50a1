// Copyright 2025 The OntoCore Authors.

//! Permission oracle: role- and product-type-gated access decisions
//!
//! [`get_perms`] returns the subset of view/modify/delete a user holds on
//! an object, evaluating a fixed rule sequence (first match wins). The
//! oracle is informational: it never errors, and the returned set carries
//! diagnostic tags naming the rule that decided it.

use crate::core::Core;
use crate::refdata::{ADMIN_ROLE_OID, SANDBOX_OID, TBD_OID};
use crate::thing::Thing;
use std::collections::BTreeSet;
use std::fmt;

/// One permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Perm {
    /// Permission to view the object
    View,
    /// Permission to modify the object
    Modify,
    /// Permission to delete the object
    Delete,
}

impl fmt::Display for Perm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Perm::View => write!(f, "view"),
            Perm::Modify => write!(f, "modify"),
            Perm::Delete => write!(f, "delete"),
        }
    }
}

/// A set of permissions plus diagnostic tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermSet {
    perms: BTreeSet<Perm>,
    /// Names of the rules that produced this set
    pub tags: Vec<String>,
}

impl PermSet {
    fn empty(tag: &str) -> Self {
        Self {
            perms: BTreeSet::new(),
            tags: vec![tag.to_string()],
        }
    }

    fn of(perms: &[Perm], tag: &str) -> Self {
        Self {
            perms: perms.iter().copied().collect(),
            tags: vec![tag.to_string()],
        }
    }

    fn view(tag: &str) -> Self {
        Self::of(&[Perm::View], tag)
    }

    fn all(tag: &str) -> Self {
        Self::of(&[Perm::View, Perm::Modify, Perm::Delete], tag)
    }

    /// True if the set grants the permission
    pub fn allows(&self, perm: Perm) -> bool {
        self.perms.contains(&perm)
    }

    /// True if the set grants nothing
    pub fn is_empty(&self) -> bool {
        self.perms.is_empty()
    }

    /// The granted permissions, in order
    pub fn perms(&self) -> impl Iterator<Item = Perm> + '_ {
        self.perms.iter().copied()
    }

    fn add(&mut self, perm: Perm) {
        self.perms.insert(perm);
    }

    fn union(&mut self, other: &PermSet) {
        self.perms.extend(other.perms.iter().copied());
        self.tags.extend(other.tags.iter().cloned());
    }
}

/// Classes whose instances are reference data: view-only for everyone.
/// ParameterDefinition is a subclass of DataElementDefinition and is
/// covered through it.
const REFDATA_CLASSES: &[&str] = &[
    "ActivityType",
    "DataElementDefinition",
    "Discipline",
    "DisciplineProductType",
    "DisciplineRole",
    "ModelFamily",
    "ModelType",
    "ParameterContext",
    "PortTemplate",
    "PortType",
    "ProductType",
    "Role",
];

/// Helper classes modifiable by any user; they only exist in association
/// with other objects.
const MODIFIABLE_CLASSES: &[&str] = &[
    "ActCompRel",
    "ParameterRelation",
    "Relation",
    "Representation",
    "RequirementAncestry",
];

/// Roles that may manage requirements and projects
const MANAGER_ROLES: &[&str] = &["Administrator", "systems_engineer", "lead_engineer"];

/// Permissions of a user on an object. With no user, the local user from
/// session state is looked up; `permissive` grants everything (offline
/// single-user installations only).
pub fn get_perms(core: &Core, obj: Option<&Thing>, user: Option<&Thing>, permissive: bool) -> PermSet {
    // [1] nothing has no permissions
    let Some(obj) = obj else {
        return PermSet::empty("no object");
    };
    // [2] anyone can add systems to the sandbox; no one modifies TBD
    if obj.oid == SANDBOX_OID {
        return PermSet::of(&[Perm::View, Perm::Modify], "object is SANDBOX");
    }
    if obj.oid == TBD_OID {
        return PermSet::view("object is TBD");
    }
    // [3] local admin / permissive installations bypass everything
    if core.config.local_admin || permissive {
        return PermSet::all("local admin or permissive");
    }
    // [4] frozen products, and usages in frozen assemblies, are view-only
    let mut frozen = obj.get_bool("frozen");
    if let Some(assembly) = obj.get_ref("assembly").and_then(|a| core.store.get(a)) {
        frozen = frozen || assembly.get_bool("frozen");
    }
    if frozen {
        return PermSet::view("frozen");
    }
    // [5] products are visible when public; everything else is visible
    let is_product = core.registry.is_subclass(&obj.cname, "Product");
    let mut perms = PermSet::default();
    if is_product {
        if obj.get_bool("public") {
            perms.add(Perm::View);
        }
    } else {
        perms.add(Perm::View);
    }
    // [6] without a resolvable user, that is all
    let local_user;
    let user = match user {
        Some(u) => u,
        None => {
            let local_oid = core.state.local_user_oid.clone();
            if local_oid.is_empty() {
                perms.tags.push("no local user".to_string());
                return perms;
            }
            match core.store.get(&local_oid) {
                Some(u) => {
                    local_user = u.clone();
                    &local_user
                }
                None => {
                    perms.tags.push("no user object found".to_string());
                    return perms;
                }
            }
        }
    };
    // [7] sandbox system usages are modifiable by anyone
    if obj.cname == "ProjectSystemUsage" && obj.get_ref("project") == Some(SANDBOX_OID) {
        return PermSet::all("SANDBOX PSU");
    }
    // [8] reference data is view-only
    if REFDATA_CLASSES
        .iter()
        .any(|c| core.registry.is_subclass(&obj.cname, c))
    {
        return PermSet::view("ref data: view only");
    }
    // [9] association helpers are universally modifiable
    if MODIFIABLE_CLASSES.contains(&obj.cname.as_str()) {
        return PermSet::all("universally modifiable");
    }
    let server_or_connected = core.state.server_or_connected();
    let never_synced = core.state.never_synced(&obj.oid);
    // [10] a global admin sees everything; writes need the server or a
    // live (or never-synced) client
    if is_global_admin(core, user) {
        let mut set = PermSet::view("global admin");
        if server_or_connected || never_synced {
            set.add(Perm::Modify);
            set.add(Perm::Delete);
        }
        return set;
    }
    // [11] offline work on objects the server has never seen is unrestricted
    if core.state.client && !core.state.connected && never_synced {
        return PermSet::all("offline & object not synced");
    }
    // [12] creators own their objects (except Person objects)
    if obj.get_ref("creator") == Some(user.oid.as_str()) && obj.cname != "Person" {
        let mut set = PermSet::view("object creator");
        if server_or_connected {
            set.add(Perm::Modify);
            set.add(Perm::Delete);
        }
        return set;
    }
    // roles the user holds in the object's owner organization
    let owner_roles = |owner_oid: Option<&str>| -> BTreeSet<String> {
        match owner_oid {
            Some(owner) => role_ids_in_context(core, user, Some(owner)),
            None => BTreeSet::new(),
        }
    };
    // [13] products: write access through discipline role coverage of the
    // product type, hardware only
    if is_product {
        let Some(owner_oid) = obj.get_ref("owner") else {
            return PermSet::view("product without owner");
        };
        if obj.cname == "HardwareProduct" {
            let roles = owner_roles(Some(owner_oid));
            let covered = covered_product_types(core, &roles);
            let pt_id = obj
                .get_ref("product_type")
                .and_then(|pt| core.store.get(pt))
                .map(|pt| pt.id().to_string())
                .unwrap_or_default();
            let mut set = PermSet::view("role-based product type perms");
            if covered.contains(&pt_id) && server_or_connected {
                set.add(Perm::Modify);
                set.add(Perm::Delete);
            }
            return set;
        }
        perms.tags.push("product default".to_string());
        return perms;
    }
    match obj.cname.as_str() {
        // [14] requirements: managers modify, everyone views
        "Requirement" => {
            let roles = owner_roles(obj.get_ref("owner"));
            let mut set = PermSet::view("role-based perms (Requirement)");
            if MANAGER_ROLES.iter().any(|r| roles.contains(*r)) && server_or_connected {
                set.add(Perm::Modify);
                set.add(Perm::Delete);
            }
            set
        }
        // [15] usages: coverage of the assembly's type, the component's
        // type, or (for TBD components) the type hint
        "Acu" => {
            let Some(assembly) = obj.get_ref("assembly").and_then(|a| core.store.get(a)) else {
                return PermSet::view("usage without assembly");
            };
            let Some(owner_oid) = assembly.get_ref("owner") else {
                return PermSet::view("assembly owner not specified");
            };
            let roles = role_ids_in_context(core, user, Some(owner_oid));
            let covered = covered_product_types(core, &roles);
            let type_id = |product: Option<&Thing>| {
                product
                    .and_then(|p| p.get_ref("product_type"))
                    .and_then(|pt| core.store.get(pt))
                    .map(|pt| pt.id().to_string())
                    .unwrap_or_default()
            };
            let assembly_type = type_id(Some(assembly));
            let component = obj.get_ref("component").and_then(|c| core.store.get(c));
            let component_type = type_id(component);
            let hint_type = if obj.get_ref("component") == Some(TBD_OID) {
                obj.get_ref("product_type_hint")
                    .and_then(|pt| core.store.get(pt))
                    .map(|pt| pt.id().to_string())
                    .unwrap_or_default()
            } else {
                String::new()
            };
            let relevant = [assembly_type, component_type, hint_type]
                .iter()
                .any(|t| !t.is_empty() && covered.contains(t));
            let mut set = PermSet::view("role-based perms (Acu)");
            if relevant && server_or_connected {
                set.add(Perm::Modify);
                set.add(Perm::Delete);
            }
            set
        }
        // [16] project structure: project managers modify
        "ProjectSystemUsage" | "Project" => {
            let project_oid = if obj.cname == "Project" {
                Some(obj.oid.as_str())
            } else {
                obj.get_ref("project")
            };
            let roles = role_ids_in_context(core, user, project_oid);
            let mut set = perms.clone();
            set.tags.push("role-based perms (project)".to_string());
            if MANAGER_ROLES.iter().any(|r| roles.contains(*r)) && server_or_connected {
                set.add(Perm::Modify);
                set.add(Perm::Delete);
            }
            set
        }
        // [17] ports inherit their product's permissions
        "Port" => {
            let product = obj.get_ref("of_product").and_then(|p| core.store.get(p));
            let mut set = get_perms(core, product, Some(user), false);
            set.tags.push("inherited from product (Port)".to_string());
            set
        }
        // [18] flows take the union over their contexts and endpoint
        // products
        "Flow" => {
            let mut set = PermSet::default();
            set.tags.push("union (Flow)".to_string());
            for field in ["flow_context", "start_port_context", "end_port_context"] {
                let target = obj.get_ref(field).and_then(|t| core.store.get(t));
                if let Some(target) = target {
                    set.union(&get_perms(core, Some(target), Some(user), false));
                }
            }
            for port_field in ["start_port", "end_port"] {
                let product = obj
                    .get_ref(port_field)
                    .and_then(|p| core.store.get(p))
                    .and_then(|port| port.get_ref("of_product"))
                    .and_then(|p| core.store.get(p));
                if let Some(product) = product {
                    set.union(&get_perms(core, Some(product), Some(user), false));
                }
            }
            set
        }
        _ => perms,
    }
}

/// Role ids a user holds, optionally restricted to one organizational
/// context. `None` restricts to context-free (global) assignments.
fn role_ids_in_context(core: &Core, user: &Thing, context_oid: Option<&str>) -> BTreeSet<String> {
    core.store
        .referencing(&core.registry, &user.oid, "RoleAssignment", "assigned_to")
        .iter()
        .filter_map(|ra_oid| core.store.get(ra_oid))
        .filter(|ra| ra.get_ref("role_assignment_context") == context_oid)
        .filter_map(|ra| ra.get_ref("assigned_role"))
        .filter_map(|role_oid| core.store.get(role_oid))
        .map(|role| role.id().to_string())
        .collect()
}

/// The product type ids covered by a set of role ids
fn covered_product_types(core: &Core, role_ids: &BTreeSet<String>) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for role_id in role_ids {
        if let Some(pts) = core.role_product_types.get(role_id) {
            out.extend(pts.iter().cloned());
        }
    }
    out
}

/// True if the user holds the distinguished context-free Administrator
/// role assignment.
pub fn is_global_admin(core: &Core, user: &Thing) -> bool {
    core.store
        .referencing(&core.registry, &user.oid, "RoleAssignment", "assigned_to")
        .iter()
        .filter_map(|ra_oid| core.store.get(ra_oid))
        .any(|ra| {
            ra.get_ref("assigned_role") == Some(ADMIN_ROLE_OID)
                && ra.get_ref("role_assignment_context").is_none()
        })
}

/// Cloaking status of an object: cloaked objects are hidden from users
/// without a role granting visibility. Organizations, parameter
/// definitions, and public objects are never cloaked; usages inherit
/// cloaking from their assembly or system; sandbox system usages are
/// always cloaked.
pub fn is_cloaked(core: &Core, obj: &Thing) -> bool {
    if obj.oid.is_empty() {
        return false;
    }
    if obj.get_bool("public") {
        return false;
    }
    if core.registry.is_subclass(&obj.cname, "Organization")
        || obj.cname == "ParameterDefinition"
    {
        return false;
    }
    if obj.cname == "Acu" {
        return obj
            .get_ref("assembly")
            .and_then(|a| core.store.get(a))
            .map(|assembly| is_cloaked(core, assembly))
            .unwrap_or(false);
    }
    if obj.cname == "ProjectSystemUsage" {
        let project_id = obj
            .get_ref("project")
            .and_then(|p| core.store.get(p))
            .map(|p| p.id().to_string())
            .unwrap_or_default();
        if project_id == "SANDBOX" {
            return true;
        }
        return obj
            .get_ref("system")
            .and_then(|s| core.store.get(s))
            .map(|system| is_cloaked(core, system))
            .unwrap_or(false);
    }
    // anything else carrying a public flag and not public is cloaked
    obj.fields.contains_key("public") && !obj.get_bool("public")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refdata;
    use serde_json::json;

    fn core() -> Core {
        let mut core = Core::start().unwrap();
        core.state.client = true;
        core.state.connected = true;
        core
    }

    fn person(core: &mut Core, id: &str) -> Thing {
        let p = core
            .create_thing("Person", &[("id", json!(id)), ("name", json!(id))])
            .unwrap();
        core.save(vec![p.clone()]).unwrap();
        core.store.get(&p.oid).cloned().unwrap()
    }

    fn org(core: &mut Core, id: &str) -> Thing {
        let o = core
            .create_thing("Organization", &[("id", json!(id))])
            .unwrap();
        core.save(vec![o.clone()]).unwrap();
        core.store.get(&o.oid).cloned().unwrap()
    }

    fn assign_role(core: &mut Core, user: &Thing, role_id: &str, context: Option<&str>) {
        let ra = core
            .create_thing(
                "RoleAssignment",
                &[
                    ("id", json!(format!("{}-{}", role_id, user.id()))),
                    ("assigned_role", json!(format!("mbe:Role.{role_id}"))),
                    ("assigned_to", json!(user.oid)),
                    ("role_assignment_context", json!(context.unwrap_or(""))),
                ],
            )
            .unwrap();
        core.save(vec![ra]).unwrap();
    }

    fn hardware(core: &mut Core, id: &str, owner: &str, pt: &str) -> Thing {
        // objects in tests count as synced so role rules are exercised
        let p = core
            .create_thing(
                "HardwareProduct",
                &[
                    ("id", json!(id)),
                    ("owner", json!(owner)),
                    ("product_type", json!(format!("mbe:ProductType.{pt}"))),
                ],
            )
            .unwrap();
        core.save(vec![p.clone()]).unwrap();
        core.state.synced_oids.insert(p.oid.clone());
        core.store.get(&p.oid).cloned().unwrap()
    }

    #[test]
    fn test_null_and_sentinel_objects() {
        let core = core();
        assert!(get_perms(&core, None, None, false).is_empty());
        let sandbox = core.store.get(refdata::SANDBOX_OID).unwrap();
        let set = get_perms(&core, Some(sandbox), None, false);
        assert!(set.allows(Perm::View));
        assert!(set.allows(Perm::Modify));
        assert!(!set.allows(Perm::Delete));
        let tbd = core.store.get(refdata::TBD_OID).unwrap();
        let set = get_perms(&core, Some(tbd), None, false);
        assert!(set.allows(Perm::View));
        assert!(!set.allows(Perm::Modify));
    }

    #[test]
    fn test_local_admin_mode() {
        let mut core = core();
        core.config.local_admin = true;
        let tbd_owner = core.store.get(refdata::ROOT_ORG_OID).unwrap().clone();
        let set = get_perms(&core, Some(&tbd_owner), None, false);
        assert!(set.allows(Perm::Delete));
    }

    #[test]
    fn test_frozen_assembly_blocks_modification() {
        let mut core = core();
        let user = person(&mut core, "jdoe");
        core.state.local_user_oid = user.oid.clone();
        let o = org(&mut core, "LAB");
        let mut q = hardware(&mut core, "Q", &o.oid, "spacecraft");
        q.set("frozen", json!(true));
        core.save(vec![q.clone()]).unwrap();
        let a = hardware(&mut core, "A", &o.oid, "antenna");
        let acu = core
            .create_thing(
                "Acu",
                &[
                    ("id", json!("Q-1")),
                    ("assembly", json!(q.oid)),
                    ("component", json!(a.oid)),
                    ("creator", json!(user.oid)),
                ],
            )
            .unwrap();
        core.save(vec![acu.clone()]).unwrap();
        core.state.synced_oids.insert(acu.oid.clone());
        let acu = core.store.get(&acu.oid).cloned().unwrap();
        let set = get_perms(&core, Some(&acu), Some(&user), false);
        assert!(set.allows(Perm::View));
        assert!(!set.allows(Perm::Modify));
        assert!(!set.allows(Perm::Delete));
    }

    #[test]
    fn test_refdata_and_modifiable_classes() {
        let mut core = core();
        let user = person(&mut core, "jdoe");
        let role = core.store.get(ADMIN_ROLE_OID).cloned().unwrap();
        let set = get_perms(&core, Some(&role), Some(&user), false);
        assert!(set.allows(Perm::View));
        assert!(!set.allows(Perm::Modify));
        // ParameterDefinition is reference data through its superclass
        let pd = core
            .store
            .get(&crate::names::parameter_definition_oid("m"))
            .cloned()
            .unwrap();
        let set = get_perms(&core, Some(&pd), Some(&user), false);
        assert!(!set.allows(Perm::Modify));
        let rel = core
            .create_thing("Relation", &[("id", json!("rel-1"))])
            .unwrap();
        core.save(vec![rel.clone()]).unwrap();
        core.state.synced_oids.insert(rel.oid.clone());
        let rel = core.store.get(&rel.oid).cloned().unwrap();
        let set = get_perms(&core, Some(&rel), Some(&user), false);
        assert!(set.allows(Perm::Delete));
    }

    #[test]
    fn test_global_admin() {
        let mut core = core();
        let admin = core.store.get(refdata::ADMIN_OID).cloned().unwrap();
        assert!(is_global_admin(&core, &admin));
        let user = person(&mut core, "jdoe");
        assert!(!is_global_admin(&core, &user));
        let o = org(&mut core, "LAB");
        let hw = hardware(&mut core, "HW-1", &o.oid, "antenna");
        let set = get_perms(&core, Some(&hw), Some(&admin), false);
        assert!(set.allows(Perm::Modify));
        assert!(set.allows(Perm::Delete));
        // disconnected client, synced object: admin reads only
        core.state.connected = false;
        let set = get_perms(&core, Some(&hw), Some(&admin), false);
        assert!(set.allows(Perm::View));
        assert!(!set.allows(Perm::Modify));
    }

    #[test]
    fn test_offline_unsynced_object() {
        let mut core = core();
        core.state.connected = false;
        let user = person(&mut core, "jdoe");
        let o = org(&mut core, "LAB");
        let p = core
            .create_thing(
                "HardwareProduct",
                &[("id", json!("HW-1")), ("owner", json!(o.oid))],
            )
            .unwrap();
        core.save(vec![p.clone()]).unwrap();
        let p = core.store.get(&p.oid).cloned().unwrap();
        let set = get_perms(&core, Some(&p), Some(&user), false);
        assert!(set.allows(Perm::Modify));
        assert!(set.allows(Perm::Delete));
    }

    #[test]
    fn test_creator_perms() {
        let mut core = core();
        let user = person(&mut core, "jdoe");
        let rqt = core
            .create_thing(
                "Requirement",
                &[("id", json!("RQ-1")), ("creator", json!(user.oid))],
            )
            .unwrap();
        core.save(vec![rqt.clone()]).unwrap();
        core.state.synced_oids.insert(rqt.oid.clone());
        let rqt = core.store.get(&rqt.oid).cloned().unwrap();
        let set = get_perms(&core, Some(&rqt), Some(&user), false);
        assert!(set.allows(Perm::Modify));
        assert!(set.allows(Perm::Delete));
        // another user only views
        let other = person(&mut core, "other");
        let set = get_perms(&core, Some(&rqt), Some(&other), false);
        assert!(set.allows(Perm::View));
        assert!(!set.allows(Perm::Modify));
    }

    #[test]
    fn test_product_type_role_coverage() {
        let mut core = core();
        let user = person(&mut core, "jdoe");
        let o = org(&mut core, "LAB");
        // discipline_engineer covers antennas through the communications
        // discipline
        assign_role(&mut core, &user, "discipline_engineer", Some(&o.oid));
        let ant = hardware(&mut core, "ANT-1", &o.oid, "antenna");
        let set = get_perms(&core, Some(&ant), Some(&user), false);
        assert!(set.allows(Perm::Modify));
        assert!(set.allows(Perm::Delete));
        // no coverage without a role in the owning organization
        let elsewhere = org(&mut core, "OTHER");
        let ant2 = hardware(&mut core, "ANT-2", &elsewhere.oid, "antenna");
        let set = get_perms(&core, Some(&ant2), Some(&user), false);
        assert!(!set.allows(Perm::Modify));
    }

    #[test]
    fn test_permission_monotonicity() {
        // extra roles never remove permissions
        let mut core = core();
        let user = person(&mut core, "jdoe");
        let o = org(&mut core, "LAB");
        assign_role(&mut core, &user, "discipline_engineer", Some(&o.oid));
        let ant = hardware(&mut core, "ANT-1", &o.oid, "antenna");
        let before: Vec<Perm> = get_perms(&core, Some(&ant), Some(&user), false)
            .perms()
            .collect();
        assign_role(&mut core, &user, "lead_engineer", Some(&o.oid));
        let after = get_perms(&core, Some(&ant), Some(&user), false);
        for perm in before {
            assert!(after.allows(perm));
        }
    }

    #[test]
    fn test_requirement_manager_roles() {
        let mut core = core();
        let user = person(&mut core, "jdoe");
        let o = org(&mut core, "LAB");
        assign_role(&mut core, &user, "systems_engineer", Some(&o.oid));
        let rqt = core
            .create_thing(
                "Requirement",
                &[("id", json!("RQ-1")), ("owner", json!(o.oid))],
            )
            .unwrap();
        core.save(vec![rqt.clone()]).unwrap();
        core.state.synced_oids.insert(rqt.oid.clone());
        let rqt = core.store.get(&rqt.oid).cloned().unwrap();
        let set = get_perms(&core, Some(&rqt), Some(&user), false);
        assert!(set.allows(Perm::Modify));
        let observer = person(&mut core, "obs");
        let set = get_perms(&core, Some(&rqt), Some(&observer), false);
        assert!(set.allows(Perm::View));
        assert!(!set.allows(Perm::Modify));
    }

    #[test]
    fn test_port_inherits_product_perms() {
        let mut core = core();
        let user = person(&mut core, "jdoe");
        let o = org(&mut core, "LAB");
        assign_role(&mut core, &user, "discipline_engineer", Some(&o.oid));
        let ant = hardware(&mut core, "ANT-1", &o.oid, "antenna");
        let port = core
            .create_thing(
                "Port",
                &[("id", json!("ANT-1-p1")), ("of_product", json!(ant.oid))],
            )
            .unwrap();
        core.save(vec![port.clone()]).unwrap();
        core.state.synced_oids.insert(port.oid.clone());
        let port = core.store.get(&port.oid).cloned().unwrap();
        let set = get_perms(&core, Some(&port), Some(&user), false);
        assert!(set.allows(Perm::Modify));
    }

    #[test]
    fn test_cloaking_rules() {
        let mut core = core();
        let o = org(&mut core, "LAB");
        assert!(!is_cloaked(&core, &o));
        let hw = hardware(&mut core, "HW-1", &o.oid, "antenna");
        // not public, carries a public flag: cloaked
        assert!(is_cloaked(&core, &hw));
        let mut public_hw = hw.clone();
        public_hw.set("public", json!(true));
        assert!(!is_cloaked(&core, &public_hw));
        // a usage inherits cloaking from its assembly
        let a = hardware(&mut core, "A", &o.oid, "battery");
        let acu = core
            .create_thing(
                "Acu",
                &[
                    ("id", json!("HW-1-1")),
                    ("assembly", json!(hw.oid)),
                    ("component", json!(a.oid)),
                ],
            )
            .unwrap();
        core.save(vec![acu.clone()]).unwrap();
        let acu = core.store.get(&acu.oid).cloned().unwrap();
        assert!(is_cloaked(&core, &acu));
        // sandbox system usages are always cloaked
        let psu = core
            .create_thing(
                "ProjectSystemUsage",
                &[
                    ("id", json!("SB-1")),
                    ("project", json!(refdata::SANDBOX_OID)),
                    ("system", json!(hw.oid)),
                ],
            )
            .unwrap();
        core.save(vec![psu.clone()]).unwrap();
        let psu = core.store.get(&psu.oid).cloned().unwrap();
        assert!(is_cloaked(&core, &psu));
    }
}
