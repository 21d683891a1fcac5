use super::support::{Faults, Harness, Journal, class_xml, parse};
use crate::binder::{BindFailure, Environment, Medium, SPEED_OF_LIGHT, bind_environment, bind_medium};
use crate::class::{ClassTable, EntityCounts, ModelType, SearchPaths, register_classes};
use crate::config::{Document, is_class_tag};
use crate::error::ConfigError;
use crate::id::{EnvironmentId, MediumId, Owner};
use crate::param::DefaultParamStore;

struct Fixture {
    doc: Document,
    classes: ClassTable,
    store: DefaultParamStore,
    journal: Journal,
}

/// 注册 fs(pathloss)、ray(fading)、bpsk/qpsk(modulation)、broken(monitor，bind 失败)、
/// temp(physical)、city(map)，再追加 `entities`。
fn fixture(entities: &str) -> Fixture {
    let (loaders, journal) = Harness::new()
        .module("pathloss", ModelType::Pathloss)
        .module("fading", ModelType::Fading)
        .module("modulation", ModelType::Modulation)
        .module_with(
            "monitor",
            ModelType::Monitor,
            Faults {
                init: false,
                bind: true,
            },
            None,
        )
        .module("physical", ModelType::Physical)
        .module("map", ModelType::Map)
        .loaders();
    let doc = parse(&format!(
        "<worldsens>{}{}{}{}{}{}{}{entities}</worldsens>",
        class_xml("pathloss", "fs", "pathloss", r#"<default_parameters><param key="exponent" value="2"/></default_parameters>"#),
        class_xml("fading", "ray", "fading", ""),
        class_xml("modulation", "bpsk", "modulation", ""),
        class_xml("modulation", "qpsk", "modulation", ""),
        class_xml("monitor", "broken", "monitor", ""),
        class_xml("physical", "temp", "physical", ""),
        class_xml("map", "city", "map", ""),
    ));
    let declarations: Vec<_> = doc.root.children.iter().filter(|c| is_class_tag(&c.tag)).collect();
    let mut store = DefaultParamStore::new();
    let classes = register_classes(
        &declarations,
        EntityCounts {
            mediums: 2,
            environments: 1,
            node_archs: 0,
        },
        &loaders,
        &SearchPaths::default(),
        &mut store,
    )
    .expect("classes registered");
    Fixture {
        doc,
        classes,
        store,
        journal,
    }
}

fn medium(f: &mut Fixture, index: usize) -> Result<(Medium, Vec<BindFailure>), ConfigError> {
    let el = f.doc.sections("medium").nth(index).expect("medium element");
    bind_medium(MediumId(index), el, None, &mut f.classes, &mut f.store)
}

fn environment(f: &mut Fixture) -> Result<(Environment, Vec<BindFailure>), ConfigError> {
    let el = f.doc.section("environment").expect("environment element");
    bind_environment(EnvironmentId(0), el, None, &mut f.classes, &mut f.store)
}

#[test]
fn medium_roles_are_filled_in_declaration_order() {
    let mut f = fixture(
        r#"<medium name="radio" range="75">
             <modulation name="bpsk"/>
             <pathloss name="fs"><param key="exponent" value="3"/></pathloss>
             <fading name="ray"/>
             <modulation name="qpsk"/>
           </medium>"#,
    );
    let (m, failures) = medium(&mut f, 0).expect("medium bound");
    let id = |n: &str| f.classes.id_of(n).expect("class");

    assert!(failures.is_empty());
    assert_eq!(m.range, Some(75.0));
    assert_eq!(m.speed, SPEED_OF_LIGHT);
    assert_eq!(m.pathloss, Some(id("fs")));
    assert_eq!(m.fading, Some(id("ray")));
    assert_eq!(m.modulations, vec![id("bpsk"), id("qpsk")]);
    assert_eq!(m.classes, vec![id("bpsk"), id("fs"), id("ray"), id("qpsk")]);

    let fs = f.classes.by_name("fs").expect("fs");
    assert_eq!(fs.medium_position(MediumId(0)), Some(1));
    assert!(fs.instances().get(Owner::Medium(MediumId(0))).is_some());

    let params = f
        .journal
        .params_for(id("fs"), Owner::Medium(MediumId(0)))
        .expect("fs bound");
    assert_eq!(params.get("exponent"), Some("3"));
}

#[test]
fn unknown_class_in_medium_is_fatal() {
    let mut f = fixture(r#"<medium name="radio"><pathloss name="nope"/></medium>"#);
    let err = medium(&mut f, 0).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownClass { ref name, .. } if name == "nope"));
}

#[test]
fn singleton_role_given_twice_is_rejected() {
    let mut f = fixture(r#"<medium name="radio"><pathloss name="fs"/><pathloss name="fs"/></medium>"#);
    assert!(matches!(medium(&mut f, 0), Err(ConfigError::DocumentParse(_))));
}

#[test]
fn bind_failure_in_medium_is_recorded_and_binding_continues() {
    let mut f = fixture(
        r#"<medium name="radio"><monitor name="broken"/><pathloss name="fs"/></medium>"#,
    );
    let (m, failures) = medium(&mut f, 0).expect("medium still bound");
    let broken = f.classes.id_of("broken").expect("broken");

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].class, broken);
    assert_eq!(failures[0].owner, Owner::Medium(MediumId(0)));
    assert_eq!(m.monitors, vec![broken]);
    assert_eq!(m.pathloss, f.classes.id_of("fs"));
    // 失败的 bind 不创建实例
    let class = f.classes.get(broken).expect("class");
    assert!(class.instances().is_empty());
    assert_eq!(f.journal.count("bind "), 2);
}

#[test]
fn medium_params_do_not_leak_between_mediums() {
    let mut f = fixture(
        r#"<medium name="a"><pathloss name="fs"><param key="exponent" value="4"/></pathloss></medium>
           <medium name="b"><pathloss name="fs"/></medium>"#,
    );
    medium(&mut f, 0).expect("a bound");
    medium(&mut f, 1).expect("b bound");
    let fs = f.classes.id_of("fs").expect("fs");

    let b = f.journal.params_for(fs, Owner::Medium(MediumId(1))).expect("b");
    assert_eq!(b.get("exponent"), Some("2"));
}

#[test]
fn environment_binds_map_and_physicals() {
    let mut f = fixture(
        r#"<environment name="outdoor"><map name="city"/><physical name="temp"/></environment>"#,
    );
    let (env, failures) = environment(&mut f).expect("environment bound");
    let city = f.classes.id_of("city").expect("city");
    let temp = f.classes.id_of("temp").expect("temp");

    assert!(failures.is_empty());
    assert_eq!(env.map, Some(city));
    assert_eq!(env.physicals, vec![temp]);
    assert_eq!(env.classes, vec![city, temp]);
    assert_eq!(
        f.classes.get(temp).and_then(|c| c.environment_position(EnvironmentId(0))),
        Some(1)
    );
}

#[test]
fn class_bound_under_another_role_is_accepted() {
    let mut f = fixture(r#"<medium name="radio"><noise name="fs"/></medium>"#);
    let (m, _) = medium(&mut f, 0).expect("medium bound");
    assert_eq!(m.noise, f.classes.id_of("fs"));
    assert_eq!(m.pathloss, None);
}
