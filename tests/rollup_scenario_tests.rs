// Copyright 2025 The OntoCore Authors.

//! End-to-end rollup scenarios driven through the public API

use ontocore::Core;
use pretty_assertions::assert_eq;
use serde_json::json;

fn save_product(core: &mut Core, id: &str) -> String {
    let thing = core
        .create_thing("HardwareProduct", &[("id", json!(id)), ("name", json!(id))])
        .unwrap();
    let oid = thing.oid.clone();
    core.save(vec![thing]).unwrap();
    oid
}

fn link(core: &mut Core, id: &str, assembly: &str, component: &str, qty: i64) -> String {
    let acu = core
        .create_thing(
            "Acu",
            &[
                ("id", json!(id)),
                ("assembly", json!(assembly)),
                ("component", json!(component)),
                ("quantity", json!(qty)),
                ("reference_designator", json!(id)),
            ],
        )
        .unwrap();
    let oid = acu.oid.clone();
    core.save(vec![acu]).unwrap();
    oid
}

/// Two-component spacecraft mass rollup: SC with A (100 kg, qty 1) and
/// B (50 kg, qty 2) rolls up to 200 kg.
#[test]
fn two_component_spacecraft_mass_rollup() {
    let mut core = Core::start().unwrap();
    let sc = save_product(&mut core, "SC");
    let a = save_product(&mut core, "A");
    let b = save_product(&mut core, "B");
    core.engine.insert_pval(&sc, "m[CBE]", json!(0.0));
    core.engine.insert_pval(&a, "m[CBE]", json!(100.0));
    core.engine.insert_pval(&b, "m[CBE]", json!(50.0));
    link(&mut core, "SC-1", &sc, &a, 1);
    link(&mut core, "SC-2", &sc, &b, 2);
    assert_eq!(core.engine.get_pval_f64(&sc, "m[CBE]"), 200.0);
}

/// MEV from CBE and contingency: a leaf part with CBE 10 kg and 30%
/// contingency has an MEV of 13 kg.
#[test]
fn mev_from_cbe_and_contingency() {
    let mut core = Core::start().unwrap();
    let part = save_product(&mut core, "P");
    core.engine.insert_pval(&part, "m[CBE]", json!(10.0));
    core.engine.insert_pval(&part, "m[Ctgcy]", json!(0.3));
    core.recompute();
    assert_eq!(core.engine.get_pval_f64(&part, "m[MEV]"), 13.0);
}

/// Unset contingency defaults to 25%
#[test]
fn mev_defaults_contingency() {
    let mut core = Core::start().unwrap();
    let part = save_product(&mut core, "P");
    core.engine.insert_pval(&part, "m[CBE]", json!(100.0));
    core.recompute();
    assert_eq!(core.engine.get_pval_f64(&part, "m[MEV]"), 125.0);
    assert_eq!(core.engine.get_pval_f64(&part, "m[Ctgcy]"), 0.25);
}

/// Rollup linearity: the assembly value is the rounded quantity-weighted
/// sum over children, through multiple levels.
#[test]
fn rollup_linearity() {
    let mut core = Core::start().unwrap();
    let sc = save_product(&mut core, "SC");
    let sub = save_product(&mut core, "SUB");
    let leaf1 = save_product(&mut core, "L1");
    let leaf2 = save_product(&mut core, "L2");
    core.engine.insert_pval(&leaf1, "m[CBE]", json!(3.0));
    core.engine.insert_pval(&leaf2, "m[CBE]", json!(4.0));
    link(&mut core, "SUB-1", &sub, &leaf1, 1);
    link(&mut core, "SUB-2", &sub, &leaf2, 3);
    link(&mut core, "SC-1", &sc, &sub, 2);
    // SUB = 3 + 4*3 = 15, SC = 2*15 = 30
    assert_eq!(core.engine.get_pval_f64(&sub, "m[CBE]"), 15.0);
    assert_eq!(core.engine.get_pval_f64(&sc, "m[CBE]"), 30.0);
}

/// Unit conservation: values in SI base units are stored unchanged, and
/// reading in base units returns the stored value.
#[test]
fn unit_conservation() {
    let mut core = Core::start().unwrap();
    let part = save_product(&mut core, "P");
    core.engine
        .set_pval(&part, "m", json!(2500.0), Some("g"))
        .unwrap();
    assert_eq!(core.engine.get_pval_f64(&part, "m"), 2.5);
    assert_eq!(core.engine.get_pval_in_units(&part, "m", "kg"), 2.5);
    assert_eq!(core.engine.get_pval_in_units(&part, "m", "g"), 2500.0);
}

/// Power mode rollup: a system in mode "Cruise" with components at CBE
/// 3 W, standby 1 W, and Off totals 4 W.
#[test]
fn power_mode_rollup() {
    let mut core = Core::start().unwrap();
    let project = core
        .create_thing("Project", &[("id", json!("PRJ"))])
        .unwrap();
    let project_oid = project.oid.clone();
    core.save(vec![project]).unwrap();
    let sys = save_product(&mut core, "SYS");
    let c1 = save_product(&mut core, "C1");
    let c2 = save_product(&mut core, "C2");
    let c3 = save_product(&mut core, "C3");
    core.engine.insert_pval(&c1, "P[CBE]", json!(3.0));
    core.engine.insert_pval(&c2, "P[standby]", json!(1.0));
    core.engine.insert_pval(&c3, "P[CBE]", json!(50.0));
    let acu1 = link(&mut core, "SYS-1", &sys, &c1, 1);
    let acu2 = link(&mut core, "SYS-2", &sys, &c2, 1);
    let acu3 = link(&mut core, "SYS-3", &sys, &c3, 1);
    let psu = core
        .create_thing(
            "ProjectSystemUsage",
            &[
                ("id", json!("PRJ-SYS")),
                ("project", json!(project_oid)),
                ("system", json!(sys)),
                ("system_role", json!("spacecraft")),
            ],
        )
        .unwrap();
    let psu_oid = psu.oid.clone();
    core.save(vec![psu]).unwrap();
    core.engine.define_mode(&project_oid, "cruise", "Cruise");
    core.engine
        .set_comp_modal_context(&project_oid, &psu_oid, &acu1, "cruise", "CBE");
    core.engine
        .set_comp_modal_context(&project_oid, &psu_oid, &acu2, "cruise", "standby");
    core.engine
        .set_comp_modal_context(&project_oid, &psu_oid, &acu3, "cruise", "Off");
    let val = core
        .engine
        .get_usage_mode_val(&project_oid, &psu_oid, &sys, "cruise", "");
    assert_eq!(val, 4.0);
}

/// Editing a component triggers recomputation of its assemblies
#[test]
fn edit_recomputes_assembly() {
    let mut core = Core::start().unwrap();
    let sc = save_product(&mut core, "SC");
    let a = save_product(&mut core, "A");
    core.engine.insert_pval(&a, "m[CBE]", json!(10.0));
    link(&mut core, "SC-1", &sc, &a, 1);
    assert_eq!(core.engine.get_pval_f64(&sc, "m[CBE]"), 10.0);
    // a save of the component reruns the rollup
    core.engine.insert_pval(&a, "m[CBE]", json!(25.0));
    let a_thing = core.store.get(&a).cloned().unwrap();
    core.save(vec![a_thing]).unwrap();
    assert_eq!(core.engine.get_pval_f64(&sc, "m[CBE]"), 25.0);
}
