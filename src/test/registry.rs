use super::support::{Faults, Harness, class_xml, parse};
use crate::class::{
    Area, Capability, ClassTable, EntityCounts, Hook, Implementation, Loaders, ModelType,
    SearchPaths, register_classes,
};
use crate::config::{Document, is_class_tag};
use crate::error::ConfigError;
use crate::id::ClassId;
use crate::param::{DefaultParamStore, Scope};

fn register(doc: &Document, loaders: &Loaders, store: &mut DefaultParamStore) -> Result<ClassTable, ConfigError> {
    let declarations: Vec<_> = doc.root.children.iter().filter(|c| is_class_tag(&c.tag)).collect();
    register_classes(
        &declarations,
        EntityCounts {
            mediums: 1,
            environments: 1,
            node_archs: 2,
        },
        loaders,
        &SearchPaths::default(),
        store,
    )
}

#[test]
fn global_map_classes_are_registered_first() {
    let (loaders, journal) = Harness::new()
        .module("mac", ModelType::Mac)
        .module("map", ModelType::GlobalMap)
        .loaders();
    let doc = parse(&format!(
        "<worldsens>{}{}</worldsens>",
        class_xml("mac", "csma", "mac", ""),
        class_xml(
            "global_map",
            "world",
            "map",
            r#"<class_parameters><param key="x" value="200"/><param key="y" value="80"/></class_parameters>"#
        ),
    ));

    let mut store = DefaultParamStore::new();
    let table = register(&doc, &loaders, &mut store).expect("registered");

    assert_eq!(table.id_of("world"), Some(ClassId(0)));
    assert_eq!(table.id_of("csma"), Some(ClassId(1)));
    assert_eq!(journal.events(), vec!["init world", "init csma"]);
    assert_eq!(
        table.area(),
        Some(Area {
            x: 200.0,
            y: 80.0,
            z: 0.0
        })
    );
}

#[test]
fn map_methods_take_precedence_over_class_parameters() {
    let area = Area {
        x: 1.0,
        y: 2.0,
        z: 3.0,
    };
    let (loaders, _) = Harness::new()
        .module_with("map", ModelType::GlobalMap, Faults::default(), Some(area))
        .loaders();
    let doc = parse(&format!(
        "<worldsens>{}</worldsens>",
        class_xml(
            "global_map",
            "world",
            "map",
            r#"<class_parameters><param key="x" value="500"/></class_parameters>"#
        ),
    ));

    let table = register(&doc, &loaders, &mut DefaultParamStore::new()).expect("registered");
    let world = table.by_name("world").expect("world");
    assert_eq!(world.area, Some(area));
    assert!(world.provides(Hook::Methods));
    assert_eq!(world.methods().and_then(|m| m.capability()), Some(Capability::Map));
}

#[test]
fn mismatched_method_table_is_rejected() {
    let (loaders, _) = Harness::new()
        .module_with(
            "mac",
            ModelType::Mac,
            Faults::default(),
            Some(Area::default()),
        )
        .loaders();
    let doc = parse(&format!("<worldsens>{}</worldsens>", class_xml("mac", "csma", "mac", "")));

    let err = register(&doc, &loaders, &mut DefaultParamStore::new()).unwrap_err();
    assert!(matches!(err, ConfigError::CapabilityMismatch { ref class, .. } if class == "csma"));
}

#[test]
fn init_failure_aborts_registration() {
    let (loaders, _) = Harness::new()
        .module_with(
            "mac",
            ModelType::Mac,
            Faults {
                init: true,
                bind: false,
            },
            None,
        )
        .loaders();
    let doc = parse(&format!("<worldsens>{}</worldsens>", class_xml("mac", "csma", "mac", "")));

    let err = register(&doc, &loaders, &mut DefaultParamStore::new()).unwrap_err();
    assert!(matches!(err, ConfigError::LifecycleHookFailure { .. }));
}

#[test]
fn duplicate_class_names_are_rejected() {
    let (loaders, _) = Harness::new().module("mac", ModelType::Mac).loaders();
    let doc = parse(&format!(
        "<worldsens>{}{}</worldsens>",
        class_xml("mac", "csma", "mac", ""),
        class_xml("mac", "csma", "mac", "")
    ));

    let err = register(&doc, &loaders, &mut DefaultParamStore::new()).unwrap_err();
    assert!(matches!(err, ConfigError::DocumentParse(_)));
}

#[test]
fn unimplemented_and_script_classes_load_without_hooks() {
    let doc = parse(
        r#"<worldsens>
             <mac name="planned"/>
             <routing name="scripted"><implementation><python><param key="module" value="aodv"/></python></implementation></routing>
           </worldsens>"#,
    );

    let table = register(&doc, &Loaders::default(), &mut DefaultParamStore::new()).expect("registered");
    let planned = table.by_name("planned").expect("planned");
    assert_eq!(planned.implementation, Implementation::Unimplemented);
    assert_eq!(planned.model.kind, ModelType::Mac);
    assert_eq!(planned.hooks.iter().count(), 0);

    let scripted = table.by_name("scripted").expect("scripted");
    assert!(matches!(scripted.implementation, Implementation::Script { ref module, .. } if module.as_deref() == Some("aodv")));
    assert_eq!(scripted.model.kind, ModelType::Routing);
}

#[test]
fn native_library_missing_from_every_path_is_module_not_found() {
    let doc = parse(&format!("<worldsens>{}</worldsens>", class_xml("mac", "csma", "no_such_mac", "")));

    let err = register(&doc, &Loaders::default(), &mut DefaultParamStore::new()).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::ModuleNotFound { ref class, ref library } if class == "csma" && library == "no_such_mac"
    ));
}

#[test]
fn implementation_block_must_pick_exactly_one_backend() {
    let doc = parse(
        r#"<worldsens><mac name="m"><implementation><c library="a"/><cxx library="b"/></implementation></mac></worldsens>"#,
    );
    let err = register(&doc, &Loaders::default(), &mut DefaultParamStore::new()).unwrap_err();
    assert!(matches!(err, ConfigError::DocumentParse(_)));
}

#[test]
fn default_parameters_are_stored_at_class_scope() {
    let (loaders, _) = Harness::new().module("mac", ModelType::Mac).loaders();
    let doc = parse(&format!(
        "<worldsens>{}</worldsens>",
        class_xml(
            "mac",
            "csma",
            "mac",
            r#"<default_parameters><param key="rate" value="10"/></default_parameters>"#
        )
    ));

    let mut store = DefaultParamStore::new();
    let table = register(&doc, &loaders, &mut store).expect("registered");
    let id = table.id_of("csma").expect("csma");
    assert_eq!(store.best_match(&Scope::class(id)).and_then(|p| p.get("rate")), Some("10"));
}

#[test]
fn search_paths_try_user_dirs_before_system_dirs() {
    let paths = SearchPaths {
        user: vec!["/home/u/mods".into()],
        system: vec!["/usr/lib/wsnet".into()],
    };
    let candidates = paths.candidates("mac");
    assert_eq!(candidates.len(), 4);
    assert!(candidates[0].starts_with("/home/u/mods"));
    assert!(candidates[1].starts_with("/home/u/mods"));
    assert!(candidates[2].starts_with("/usr/lib/wsnet"));
    assert_eq!(candidates[3], std::path::PathBuf::from("/usr/lib/wsnet/mac"));
}

fn native_world(library: &str) -> Document {
    parse(&format!("<worldsens>{}</worldsens>", class_xml("mac", "m", library, "")))
}

fn register_from(doc: &Document, system: std::path::PathBuf) -> Result<ClassTable, ConfigError> {
    let declarations: Vec<_> = doc.root.children.iter().filter(|c| is_class_tag(&c.tag)).collect();
    register_classes(
        &declarations,
        EntityCounts::default(),
        &Loaders::default(),
        &SearchPaths {
            user: Vec::new(),
            system: vec![system],
        },
        &mut DefaultParamStore::new(),
    )
}

#[test]
fn unloadable_native_library_is_module_load_error() {
    let dir = std::env::temp_dir().join(format!("wsnet-rs-broken-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let file = dir.join(libloading::library_filename("broken"));
    std::fs::write(&file, b"not a shared object").expect("write library");

    let err = register_from(&native_world("broken"), dir.clone()).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::ModuleLoad { ref class, ref path, .. } if class == "m" && *path == file
    ));
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(target_os = "linux")]
#[test]
fn native_library_without_model_symbol_is_rejected() {
    // 任何不导出 `model` 的系统库都可以
    let found = [
        "/lib/x86_64-linux-gnu",
        "/usr/lib/x86_64-linux-gnu",
        "/lib/aarch64-linux-gnu",
        "/usr/lib/aarch64-linux-gnu",
        "/lib64",
        "/usr/lib64",
        "/usr/lib",
    ]
    .into_iter()
    .map(std::path::PathBuf::from)
    .find(|dir| dir.join("libm.so.6").is_file());
    let Some(dir) = found else {
        return;
    };

    let err = register_from(&native_world("libm.so.6"), dir).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::MissingRequiredSymbol { ref class, ref symbol } if class == "m" && symbol == "model"
    ));
}
