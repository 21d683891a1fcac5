//! 类注册表
//!
//! 发现文档中声明的类，加载其实现，解析模型描述与可选钩子，调用 `init`，
//! 并把类级默认参数写入默认参数存储。全局地图类总是最先处理。

use super::implementation::Implementation;
use super::loader::{LoadRequest, Loaders, SearchPaths};
use super::methods::{Area, Methods};
use super::model::{Model, ModelType};
use super::module::{ClassContext, ClassModule, Hook, HookSet, ObjectHandle};
use crate::config::Element;
use crate::error::{ConfigError, HookError};
use crate::id::{Call, ClassId, EnvironmentId, MediumId, NodeArchId, Owner};
use crate::param::{DefaultParamStore, ParamList, Scope};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// 某个类在各拥有者上创建的不透明对象
#[derive(Debug, Default)]
pub struct Instances {
    objects: Vec<(Owner, ObjectHandle)>,
    index: HashMap<Owner, usize>,
}

impl Instances {
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, owner: Owner) -> Option<ObjectHandle> {
        self.index.get(&owner).map(|&i| self.objects[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Owner, ObjectHandle)> + '_ {
        self.objects.iter().copied()
    }

    /// 同一拥有者重复插入时替换旧句柄
    pub fn insert(&mut self, owner: Owner, object: ObjectHandle) {
        match self.index.get(&owner) {
            Some(&i) => self.objects[i].1 = object,
            None => {
                self.index.insert(owner, self.objects.len());
                self.objects.push((owner, object));
            }
        }
    }

    pub fn remove(&mut self, owner: Owner) -> Option<ObjectHandle> {
        let i = self.index.remove(&owner)?;
        let (_, object) = self.objects.swap_remove(i);
        if let Some(&(moved, _)) = self.objects.get(i) {
            self.index.insert(moved, i);
        }
        Some(object)
    }
}

/// 一个已声明的类
pub struct Class {
    pub id: ClassId,
    pub name: String,
    /// 声明时的标签
    pub declared: ModelType,
    pub implementation: Implementation,
    pub model: Model,
    pub hooks: HookSet,
    pub class_params: ParamList,
    /// 全局地图类确定的世界范围
    pub area: Option<Area>,
    module: Box<dyn ClassModule>,
    methods: Option<Methods>,
    medium_positions: Vec<Option<usize>>,
    environment_positions: Vec<Option<usize>>,
    arch_positions: Vec<Option<usize>>,
    instances: Instances,
}

impl std::fmt::Debug for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("declared", &self.declared)
            .field("model", &self.model)
            .field("hooks", &self.hooks)
            .field("instances", &self.instances.len())
            .finish_non_exhaustive()
    }
}

fn set_position(table: &mut Vec<Option<usize>>, index: usize, position: usize) {
    if table.len() <= index {
        table.resize(index + 1, None);
    }
    table[index] = Some(position);
}

impl Class {
    pub fn provides(&self, hook: Hook) -> bool {
        self.hooks.contains(hook)
    }

    pub fn methods(&self) -> Option<&Methods> {
        self.methods.as_ref()
    }

    pub fn methods_mut(&mut self) -> Option<&mut Methods> {
        self.methods.as_mut()
    }

    pub fn instances(&self) -> &Instances {
        &self.instances
    }

    pub fn medium_position(&self, medium: MediumId) -> Option<usize> {
        self.medium_positions.get(medium.0).copied().flatten()
    }

    pub fn environment_position(&self, environment: EnvironmentId) -> Option<usize> {
        self.environment_positions.get(environment.0).copied().flatten()
    }

    pub fn arch_position(&self, arch: NodeArchId) -> Option<usize> {
        self.arch_positions.get(arch.0).copied().flatten()
    }

    pub(crate) fn set_medium_position(&mut self, medium: MediumId, position: usize) {
        set_position(&mut self.medium_positions, medium.0, position);
    }

    pub(crate) fn set_environment_position(&mut self, environment: EnvironmentId, position: usize) {
        set_position(&mut self.environment_positions, environment.0, position);
    }

    pub(crate) fn set_arch_position(&mut self, arch: NodeArchId, position: usize) {
        set_position(&mut self.arch_positions, arch.0, position);
    }

    /// 绑定到拥有者：调用 `bind`，成功且提供 `create_object` 时创建并登记实例。
    pub fn bind(&mut self, owner: Owner, params: &ParamList) -> Result<Option<ObjectHandle>, HookError> {
        let call = Call::new(self.id, owner);
        if self.provides(Hook::Bind) {
            self.module.bind(call, params)?;
        }
        if !self.provides(Hook::CreateObject) {
            return Ok(None);
        }
        let object = self.module.create_object(call);
        if let Some(object) = object {
            self.instances.insert(owner, object);
        }
        Ok(object)
    }

    /// 解除绑定：`unbind` 后销毁实例
    pub fn unbind(&mut self, owner: Owner) -> Result<(), HookError> {
        let call = Call::new(self.id, owner);
        let result = if self.provides(Hook::Unbind) {
            self.module.unbind(call)
        } else {
            Ok(())
        };
        if let Some(object) = self.instances.remove(owner) {
            if self.provides(Hook::DestroyObject) {
                self.module.destroy_object(call, object);
            }
        }
        result
    }

    pub fn bootstrap(&mut self, owner: Owner) -> Result<(), HookError> {
        if !self.provides(Hook::Bootstrap) {
            return Ok(());
        }
        self.module.bootstrap(Call::new(self.id, owner))
    }

    pub fn ioctl(&mut self, owner: Owner, option: i32, input: &[u8]) -> Result<Vec<u8>, HookError> {
        if !self.provides(Hook::Ioctl) {
            return Err(HookError::new(format!("类 '{}' 未提供 ioctl", self.name)));
        }
        self.module.ioctl(Call::new(self.id, owner), option, input)
    }

    pub fn destroy(&mut self) -> Result<(), HookError> {
        if !self.provides(Hook::Destroy) {
            return Ok(());
        }
        self.module.destroy(self.id)
    }
}

/// 配置文档中实体的数量，用于预留反查表。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub mediums: usize,
    pub environments: usize,
    pub node_archs: usize,
}

/// 类表：按稠密 id 存放所有类
#[derive(Debug, Default)]
pub struct ClassTable {
    classes: Vec<Class>,
    by_name: HashMap<String, ClassId>,
    area: Option<Area>,
}

impl ClassTable {
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn get(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(id.0)
    }

    pub fn get_mut(&mut self, id: ClassId) -> Option<&mut Class> {
        self.classes.get_mut(id.0)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Class> {
        self.classes.iter()
    }

    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut Class> {
        self.classes.iter_mut()
    }

    pub fn id_of(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&Class> {
        self.id_of(name).and_then(|id| self.get(id))
    }

    /// 按名字解析类引用，不存在即 `UnknownClass`
    pub fn resolve(&self, name: &str, context: &str) -> Result<ClassId, ConfigError> {
        self.id_of(name)
            .ok_or_else(|| ConfigError::unknown_class(context, name))
    }

    /// 第一个已加载的全局地图所确定的世界范围
    pub fn area(&self) -> Option<Area> {
        self.area
    }

    /// 所有全局地图类，按 id 顺序
    pub fn global_maps(&self) -> impl Iterator<Item = &Class> {
        self.classes
            .iter()
            .filter(|c| c.declared == ModelType::GlobalMap)
    }

    /// 类 id 对应的类，调用方保证 id 来自本表
    pub(crate) fn class_mut(&mut self, id: ClassId) -> &mut Class {
        &mut self.classes[id.0]
    }
}

/// 注册文档中声明的所有类。
///
/// 先处理所有 `global_map` 类，再按声明顺序处理其余类；任何错误都中止整个注册。
#[tracing::instrument(skip_all, fields(declarations = declarations.len()))]
pub fn register_classes(
    declarations: &[&Element],
    counts: EntityCounts,
    loaders: &Loaders,
    paths: &SearchPaths,
    store: &mut DefaultParamStore,
) -> Result<ClassTable, ConfigError> {
    let mut table = ClassTable::default();
    let (global, rest): (Vec<&Element>, Vec<&Element>) = declarations
        .iter()
        .copied()
        .partition(|el| el.tag == ModelType::GlobalMap.tag());

    for el in global.into_iter().chain(rest) {
        let class = load_class(el, &table, counts, loaders, paths, store)?;
        if class.declared == ModelType::GlobalMap && table.area.is_none() {
            table.area = class.area;
        }
        debug!(class = %class.name, id = %class.id, model = %class.model.kind, "类已注册");
        table.by_name.insert(class.name.clone(), class.id);
        table.classes.push(class);
    }

    info!(classes = table.len(), "类注册完成");
    Ok(table)
}

fn load_class(
    el: &Element,
    table: &ClassTable,
    counts: EntityCounts,
    loaders: &Loaders,
    paths: &SearchPaths,
    store: &mut DefaultParamStore,
) -> Result<Class, ConfigError> {
    let declared = ModelType::from_tag(&el.tag).ok_or_else(|| {
        ConfigError::DocumentParse(format!("未知的类角色 '{}'", el.tag))
    })?;
    let context = format!("类 <{}>", el.tag);
    let name = el.required_attr("name", &context)?.to_string();
    let context = format!("类 '{name}'");
    if table.id_of(&name).is_some() {
        return Err(ConfigError::DocumentParse(format!("{context}: 重复声明")));
    }
    let id = ClassId(table.len());

    let implementation = Implementation::parse(el, &context)?;
    let mut module = loaders.load(&LoadRequest {
        class: &name,
        declared,
        implementation: &implementation,
        paths,
    })?;

    let model = module.model();
    if model.kind != declared {
        warn!(class = %name, declared = %declared, model = %model.kind, "模块的模型类型与声明标签不一致");
    }
    let hooks = module.provided();
    let methods = if hooks.contains(Hook::Methods) {
        module.methods()
    } else {
        None
    };
    if let Some(cap) = methods.as_ref().and_then(Methods::capability) {
        if cap != model.kind.capability() {
            error!(class = %name, ?cap, "方法表能力集不匹配");
            return Err(ConfigError::CapabilityMismatch {
                class: name,
                model: model.kind.to_string(),
            });
        }
    }

    let class_params = el.param_block("class_parameters", &context)?;
    let area = if declared == ModelType::GlobalMap {
        Some(global_area(&class_params, methods.as_ref())?)
    } else {
        None
    };

    if hooks.contains(Hook::Init) {
        let ctx = ClassContext {
            id,
            name: &name,
            area: area.or(table.area),
        };
        module.init(&ctx, &class_params).map_err(|e| {
            error!(class = %name, error = %e, "init 失败");
            ConfigError::hook(format!("{context} 的 init"), e)
        })?;
    }

    let defaults = el.param_block("default_parameters", &context)?;
    store.insert(Scope::class(id), defaults);

    Ok(Class {
        id,
        name,
        declared,
        implementation,
        model,
        hooks,
        class_params,
        area,
        module,
        methods,
        medium_positions: vec![None; counts.mediums],
        environment_positions: vec![None; counts.environments],
        arch_positions: vec![None; counts.node_archs],
        instances: Instances::default(),
    })
}

/// 全局地图的范围：方法表给出的范围优先，否则取 `x`/`y`/`z` 类参数（缺省 0）。
fn global_area(params: &ParamList, methods: Option<&Methods>) -> Result<Area, ConfigError> {
    if let Some(Methods::Map(map)) = methods {
        if let Some(area) = map.area() {
            return Ok(area);
        }
    }
    Ok(Area {
        x: params.get_f64("x")?.unwrap_or(0.0),
        y: params.get_f64("y")?.unwrap_or(0.0),
        z: params.get_f64("z")?.unwrap_or(0.0),
    })
}
