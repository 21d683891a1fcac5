//! 节点架构
//!
//! 每个节点架构是一套有序的协议栈：按角色分组的层类、显式的上下邻接关系，
//! 以及移动性、能量、传感器、监视器等非层绑定。
//!
//! ```xml
//! <node_architecture name="sensor" birth="0..1s" default="true">
//!   <implementation>
//!     <phy name="radio"><up name="csma"/></phy>
//!     <mac name="csma"><down name="radio"/><param key="retries" value="3"/></mac>
//!   </implementation>
//!   <mobility name="static"/>
//!   <node_types><node_type family="sensor" type="mica2"/></node_types>
//! </node_architecture>
//! ```

use crate::class::{ClassTable, ModelType};
use crate::config::Element;
use crate::error::ConfigError;
use crate::id::{ClassId, NodeArchId};
use crate::param::{DefaultParamStore, Scope};
use crate::role::{self, RoleSlots, RoleSpec, SlotMut, singleton_filled};
use crate::sim::TimeSpec;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, trace};

/// 层角色，按构建时的遍历顺序排列
pub const LAYER_ROLES: [ModelType; 11] = [
    ModelType::Phy,
    ModelType::Coding,
    ModelType::Interference,
    ModelType::Modulator,
    ModelType::Error,
    ModelType::SignalTracker,
    ModelType::Interface,
    ModelType::Transceiver,
    ModelType::Mac,
    ModelType::Routing,
    ModelType::Application,
];

/// 节点类型标签 `(family, type)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NodeType {
    pub family: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl NodeType {
    pub fn new(family: impl Into<String>, kind: impl Into<String>) -> Self {
        NodeType {
            family: family.into(),
            kind: kind.into(),
        }
    }

    /// 未声明 `node_types` 时使用的标签
    pub fn fallback() -> Self {
        NodeType::new("default", "default")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeArchitecture {
    pub id: NodeArchId,
    pub name: String,
    #[serde(skip)]
    pub birth: Option<TimeSpec>,
    pub is_default: bool,
    /// 以 `LAYER_ROLES` 下标索引的层数组
    layers: Vec<Vec<ClassId>>,
    /// 位置 -> 类；层类在前，非层类在后
    pub classes: Vec<ClassId>,
    /// 以层位置索引的上邻接
    pub up: Vec<Vec<ClassId>>,
    /// 以层位置索引的下邻接
    pub down: Vec<Vec<ClassId>>,
    pub mobility: Option<ClassId>,
    pub energy: Option<ClassId>,
    pub sensors: Vec<ClassId>,
    pub monitors: Vec<ClassId>,
    pub node_types: Vec<NodeType>,
}

impl NodeArchitecture {
    fn new(id: NodeArchId, name: String) -> Self {
        NodeArchitecture {
            id,
            name,
            birth: None,
            is_default: false,
            layers: vec![Vec::new(); LAYER_ROLES.len()],
            classes: Vec::new(),
            up: Vec::new(),
            down: Vec::new(),
            mobility: None,
            energy: None,
            sensors: Vec::new(),
            monitors: Vec::new(),
            node_types: Vec::new(),
        }
    }

    /// 某层角色的类；非层角色返回空切片
    pub fn layer(&self, role: ModelType) -> &[ClassId] {
        LAYER_ROLES
            .iter()
            .position(|r| *r == role)
            .map(|i| self.layers[i].as_slice())
            .unwrap_or_default()
    }

    /// 层位置总数
    pub fn layer_count(&self) -> usize {
        self.up.len()
    }

    pub fn position_of(&self, class: ClassId) -> Option<usize> {
        self.classes.iter().position(|c| *c == class)
    }

    pub fn is_layer(&self, class: ClassId) -> bool {
        self.position_of(class).is_some_and(|p| p < self.layer_count())
    }

    pub fn up_of(&self, class: ClassId) -> &[ClassId] {
        self.adjacency(&self.up, class)
    }

    pub fn down_of(&self, class: ClassId) -> &[ClassId] {
        self.adjacency(&self.down, class)
    }

    fn adjacency<'a>(&self, table: &'a [Vec<ClassId>], class: ClassId) -> &'a [ClassId] {
        self.position_of(class)
            .and_then(|p| table.get(p))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn context(&self) -> String {
        format!("节点架构 '{}'", self.name)
    }
}

impl RoleSlots for NodeArchitecture {
    const ROLES: &'static [RoleSpec] = &[
        RoleSpec::singleton("mobility"),
        RoleSpec::singleton("energy"),
        RoleSpec::array("sensor"),
        RoleSpec::array("monitor"),
    ];

    fn slot(&mut self, role: usize) -> SlotMut<'_> {
        match role {
            0 => SlotMut::Singleton(&mut self.mobility),
            1 => SlotMut::Singleton(&mut self.energy),
            2 => SlotMut::Array(&mut self.sensors),
            _ => SlotMut::Array(&mut self.monitors),
        }
    }

    fn filled(&self, role: usize) -> usize {
        match role {
            0 => singleton_filled(self.mobility),
            1 => singleton_filled(self.energy),
            2 => self.sensors.len(),
            _ => self.monitors.len(),
        }
    }
}

const NON_ROLE_CHILDREN: &[&str] = &["implementation", "node_types"];

/// 构建一个节点架构
#[tracing::instrument(skip_all, fields(arch = %id))]
pub fn build_node_arch(
    id: NodeArchId,
    el: &Element,
    classes: &mut ClassTable,
    store: &mut DefaultParamStore,
) -> Result<NodeArchitecture, ConfigError> {
    let name = el.required_attr("name", "node_architecture")?.to_string();
    let mut arch = NodeArchitecture::new(id, name);
    let context = arch.context();
    if let Some(raw) = el.attr("birth") {
        arch.birth = Some(TimeSpec::parse(raw).ok_or_else(|| ConfigError::invalid(&context, "birth", raw))?);
    }
    arch.is_default = el.bool_attr("default", &context)?;

    let implementation = el
        .child("implementation")
        .ok_or_else(|| ConfigError::missing(&context, "implementation"))?;

    // 计数
    let mut layer_counts = vec![0usize; LAYER_ROLES.len()];
    for child in &implementation.children {
        let i = layer_index(&child.tag).ok_or_else(|| {
            ConfigError::DocumentParse(format!("{context}: <implementation> 中未知的层角色 <{}>", child.tag))
        })?;
        layer_counts[i] += 1;
    }
    let other_counts = role::count_roles(el, NodeArchitecture::ROLES, NON_ROLE_CHILDREN, &context)?;
    let layer_total: usize = layer_counts.iter().sum();
    let total = layer_total + other_counts.iter().sum::<usize>();
    if layer_total == 0 {
        return Err(ConfigError::SizeMismatch {
            context: format!("{context} 的层"),
            needed: 1,
            available: 0,
        });
    }
    trace!(layer_total, total, "节点架构计数完成");

    // 分配
    for (i, &n) in layer_counts.iter().enumerate() {
        arch.layers[i] = Vec::with_capacity(n);
    }
    arch.classes = Vec::with_capacity(total);
    arch.up = vec![Vec::new(); layer_total];
    arch.down = vec![Vec::new(); layer_total];
    role::allocate(&mut arch, &other_counts);

    // 层类，按固定角色顺序
    let mut positions: HashMap<ClassId, usize> = HashMap::with_capacity(total);
    let mut layer_elements = Vec::with_capacity(layer_total);
    for (i, role) in LAYER_ROLES.iter().enumerate() {
        for child in implementation.children_named(role.tag()) {
            let class = record_class(&mut arch, child, classes, store, &mut positions)?;
            arch.layers[i].push(class);
            layer_elements.push(child);
        }
    }

    // 上下邻接：引用必须是本架构的层类
    for (position, child) in layer_elements.into_iter().enumerate() {
        arch.up[position] = adjacency(child, "up", &context, classes, &positions, layer_total)?;
        arch.down[position] = adjacency(child, "down", &context, classes, &positions, layer_total)?;
    }

    // 非层绑定
    for child in &el.children {
        let Some(i) = role::role_index(NodeArchitecture::ROLES, &child.tag) else {
            continue;
        };
        let class = record_class(&mut arch, child, classes, store, &mut positions)?;
        arch.slot(i).store(class);
    }

    role::verify_filled(&arch, &other_counts, &context)?;
    for (i, &n) in layer_counts.iter().enumerate() {
        if arch.layers[i].len() != n {
            return Err(ConfigError::SizeMismatch {
                context: format!("{context} 的 <{}>", LAYER_ROLES[i]),
                needed: n,
                available: arch.layers[i].len(),
            });
        }
    }

    arch.node_types = parse_node_types(el, &context)?;
    info!(
        arch = %arch.name,
        layers = layer_total,
        classes = arch.classes.len(),
        default = arch.is_default,
        "节点架构构建完成"
    );
    Ok(arch)
}

fn layer_index(tag: &str) -> Option<usize> {
    LAYER_ROLES.iter().position(|r| r.tag() == tag)
}

/// 解析类、占用下一个位置、记录反查位置和架构级参数
fn record_class(
    arch: &mut NodeArchitecture,
    child: &Element,
    classes: &mut ClassTable,
    store: &mut DefaultParamStore,
    positions: &mut HashMap<ClassId, usize>,
) -> Result<ClassId, ConfigError> {
    let context = arch.context();
    let name = child.required_attr("name", &context)?;
    let class = classes.resolve(name, &context)?;
    if positions.contains_key(&class) {
        return Err(ConfigError::DocumentParse(format!("{context}: 类 '{name}' 出现多次")));
    }
    let position = arch.classes.len();
    arch.classes.push(class);
    positions.insert(class, position);
    classes.class_mut(class).set_arch_position(arch.id, position);

    let scope = Scope::class(class).arch(arch.id);
    let inline = child.inline_params(&context)?;
    let params = store.resolve_and_record(&scope, &inline, scope);
    debug!(class = name, position, params = params.len(), role = %child.tag, "类已加入节点架构");
    Ok(class)
}

fn adjacency(
    child: &Element,
    direction: &str,
    context: &str,
    classes: &ClassTable,
    positions: &HashMap<ClassId, usize>,
    layer_total: usize,
) -> Result<Vec<ClassId>, ConfigError> {
    child
        .children_named(direction)
        .map(|link| {
            let name = link.required_attr("name", context)?;
            let class = classes.resolve(name, context)?;
            match positions.get(&class) {
                Some(&p) if p < layer_total => Ok(class),
                _ => Err(ConfigError::DocumentParse(format!(
                    "{context}: <{direction}> 引用的 '{name}' 不是本架构的层类"
                ))),
            }
        })
        .collect()
}

fn parse_node_types(el: &Element, context: &str) -> Result<Vec<NodeType>, ConfigError> {
    let mut types = Vec::new();
    if let Some(block) = el.child("node_types") {
        for t in block.children_named("node_type") {
            types.push(NodeType::new(
                t.required_attr("family", context)?,
                t.required_attr("type", context)?,
            ));
        }
    }
    if types.is_empty() {
        types.push(NodeType::fallback());
    }
    Ok(types)
}
