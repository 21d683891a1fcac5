//! 测试用的进程内模块与加载器
//!
//! `Recorder` 记录收到的每次钩子调用，可配置为在 `init` 或 `bind` 上失败。

use crate::assemble::{Simulation, assemble};
use crate::class::{
    Area, Backend, ClassContext, ClassModule, Hook, HookSet, Loaders, MapModel, Methods, Model,
    ModelType, ObjectHandle, SearchPaths, StaticLoader,
};
use crate::config::{Document, validate};
use crate::error::{ConfigError, HookError};
use crate::id::{Call, ClassId, Owner};
use crate::param::ParamList;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// 所有模块共享的调用记录
#[derive(Clone, Default)]
pub struct Journal {
    pub events: Rc<RefCell<Vec<String>>>,
    pub binds: Rc<RefCell<Vec<(Call, ParamList)>>>,
    next_object: Rc<Cell<u64>>,
}

impl Journal {
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events.borrow().iter().filter(|e| e.starts_with(prefix)).count()
    }

    /// 某次 bind 收到的参数
    pub fn params_for(&self, class: ClassId, owner: Owner) -> Option<ParamList> {
        self.binds
            .borrow()
            .iter()
            .find(|(call, _)| call.class == class && call.owner == owner)
            .map(|(_, p)| p.duplicate())
    }

    fn push(&self, event: String) {
        self.events.borrow_mut().push(event);
    }
}

#[derive(Clone, Copy, Default)]
pub struct Faults {
    pub init: bool,
    pub bind: bool,
}

pub struct Recorder {
    kind: ModelType,
    journal: Journal,
    faults: Faults,
    area: Option<Area>,
}

struct FixedMap(Area);

impl MapModel for FixedMap {
    fn area(&self) -> Option<Area> {
        Some(self.0)
    }
}

impl ClassModule for Recorder {
    fn model(&self) -> Model {
        Model::new(self.kind, "recorder")
    }

    fn provided(&self) -> HookSet {
        let hooks: HookSet = Hook::ALL.into_iter().filter(|h| *h != Hook::Methods).collect();
        if self.area.is_some() { hooks.with(Hook::Methods) } else { hooks }
    }

    fn init(&mut self, ctx: &ClassContext<'_>, _params: &ParamList) -> Result<(), HookError> {
        self.journal.push(format!("init {}", ctx.name));
        if self.faults.init {
            return Err(HookError::new("init refused"));
        }
        Ok(())
    }

    fn destroy(&mut self, class: ClassId) -> Result<(), HookError> {
        self.journal.push(format!("destroy {class}"));
        Ok(())
    }

    fn bootstrap(&mut self, to: Call) -> Result<(), HookError> {
        self.journal.push(format!("bootstrap {} {}", to.class, to.owner));
        Ok(())
    }

    fn bind(&mut self, to: Call, params: &ParamList) -> Result<(), HookError> {
        self.journal.push(format!("bind {} {}", to.class, to.owner));
        if self.faults.bind {
            return Err(HookError::from_code(-1));
        }
        self.journal.binds.borrow_mut().push((to, params.duplicate()));
        Ok(())
    }

    fn unbind(&mut self, to: Call) -> Result<(), HookError> {
        self.journal.push(format!("unbind {} {}", to.class, to.owner));
        Ok(())
    }

    fn ioctl(&mut self, to: Call, option: i32, input: &[u8]) -> Result<Vec<u8>, HookError> {
        self.journal.push(format!("ioctl {} {} {option}", to.class, to.owner));
        Ok(input.iter().rev().copied().collect())
    }

    fn create_object(&mut self, _to: Call) -> Option<ObjectHandle> {
        let id = self.journal.next_object.get();
        self.journal.next_object.set(id + 1);
        Some(ObjectHandle(id))
    }

    fn destroy_object(&mut self, to: Call, object: ObjectHandle) {
        self.journal.push(format!("destroy_object {} {} {}", to.class, to.owner, object.0));
    }

    fn methods(&mut self) -> Option<Methods> {
        self.area.map(|a| Methods::Map(Box::new(FixedMap(a))))
    }
}

/// 以库名登记 `Recorder` 的进程内加载器
pub struct Harness {
    pub journal: Journal,
    loader: StaticLoader,
}

impl Harness {
    pub fn new() -> Self {
        Harness {
            journal: Journal::default(),
            loader: StaticLoader::new(),
        }
    }

    pub fn module(self, library: &str, kind: ModelType) -> Self {
        self.module_with(library, kind, Faults::default(), None)
    }

    pub fn module_with(
        mut self,
        library: &str,
        kind: ModelType,
        faults: Faults,
        area: Option<Area>,
    ) -> Self {
        let journal = self.journal.clone();
        self.loader.register(library, move || {
            Box::new(Recorder {
                kind,
                journal: journal.clone(),
                faults,
                area,
            })
        });
        self
    }

    pub fn loaders(self) -> (Loaders, Journal) {
        let mut loaders = Loaders::default();
        loaders.register(Backend::C, self.loader);
        (loaders, self.journal)
    }
}

pub fn parse(xml: &str) -> Document {
    xml.parse().expect("test document parses")
}

pub fn build(xml: &str, loaders: &Loaders) -> Result<Simulation, ConfigError> {
    let doc = parse(xml);
    validate(&doc, None)?;
    assemble(&doc, loaders, SearchPaths::default(), 7)
}

/// 以 `c` 后端声明一个类
pub fn class_xml(tag: &str, name: &str, library: &str, extra: &str) -> String {
    format!(
        r#"<{tag} name="{name}"><implementation><c><param key="library" value="{library}"/></c></implementation>{extra}</{tag}>"#
    )
}

/// 常用场景中用到的所有库
pub fn standard_harness() -> Harness {
    Harness::new()
        .module("map", ModelType::GlobalMap)
        .module("pathloss", ModelType::Pathloss)
        .module("modulation", ModelType::Modulation)
        .module("physical", ModelType::Physical)
        .module("mobility", ModelType::Mobility)
        .module("mac", ModelType::Mac)
        .module("routing", ModelType::Routing)
        .module("app", ModelType::Application)
        .module("monitor", ModelType::Monitor)
}

/// 标准场景的类声明、介质、环境与一个默认节点架构；
/// `top` 追加到顶层，`sim` 追加到 `simulation` 内。
pub fn standard_world(nodes: usize, top: &str, sim: &str) -> String {
    let classes = [
        class_xml(
            "global_map",
            "world",
            "map",
            r#"<class_parameters><param key="x" value="100"/><param key="y" value="50"/></class_parameters>"#,
        ),
        class_xml("pathloss", "freespace", "pathloss", ""),
        class_xml("modulation", "bpsk", "modulation", ""),
        class_xml("physical", "temp", "physical", ""),
        class_xml(
            "mobility",
            "static",
            "mobility",
            r#"<default_parameters><param key="speed" value="0"/></default_parameters>"#,
        ),
        class_xml(
            "mac",
            "mac",
            "mac",
            r#"<default_parameters><param key="rate" value="10"/></default_parameters>"#,
        ),
        class_xml("routing", "route", "routing", ""),
        class_xml("application", "app", "app", ""),
        class_xml("monitor", "trace", "monitor", ""),
    ]
    .concat();
    format!(
        r#"<worldsens>
  {classes}
  <medium name="radio"><pathloss name="freespace"/><modulation name="bpsk"/></medium>
  <environment name="env"><physical name="temp"/></environment>
  <node_architecture name="sensor" default="true">
    <implementation>
      <mac name="mac"/>
      <routing name="route"><down name="mac"/><up name="app"/></routing>
      <application name="app"><down name="route"/></application>
    </implementation>
    <mobility name="static"/>
  </node_architecture>
  {top}
  <simulation nodes="{nodes}" duration="1s">{sim}</simulation>
</worldsens>"#
    )
}
