//! 类模块接口
//!
//! 一个已加载的实现（原生动态库、进程内模块或脚本占位）对外呈现为 `ClassModule`。
//! 除模型描述外，所有钩子都是可选的：模块通过 `provided()` 声明自己提供了哪些，
//! 未提供的钩子记为"不存在"而不是错误。

use super::methods::{Area, Methods};
use super::model::Model;
use crate::error::HookError;
use crate::id::{Call, ClassId};
use crate::param::ParamList;
use serde::Serialize;

/// 可选的生命周期钩子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Hook {
    Init,
    Destroy,
    Bootstrap,
    Bind,
    Unbind,
    Ioctl,
    CreateObject,
    DestroyObject,
    Methods,
}

impl Hook {
    pub const ALL: [Hook; 9] = [
        Hook::Init,
        Hook::Destroy,
        Hook::Bootstrap,
        Hook::Bind,
        Hook::Unbind,
        Hook::Ioctl,
        Hook::CreateObject,
        Hook::DestroyObject,
        Hook::Methods,
    ];

    /// 原生模块中对应的符号名
    pub fn symbol(self) -> &'static str {
        match self {
            Hook::Init => "init",
            Hook::Destroy => "destroy",
            Hook::Bootstrap => "bootstrap",
            Hook::Bind => "bind",
            Hook::Unbind => "unbind",
            Hook::Ioctl => "ioctl",
            Hook::CreateObject => "create_object",
            Hook::DestroyObject => "destroy_object",
            Hook::Methods => "methods",
        }
    }

    fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// 已提供钩子的集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HookSet(u16);

impl HookSet {
    pub fn empty() -> Self {
        HookSet(0)
    }

    pub fn with(self, hook: Hook) -> Self {
        HookSet(self.0 | hook.bit())
    }

    pub fn insert(&mut self, hook: Hook) {
        self.0 |= hook.bit();
    }

    pub fn contains(&self, hook: Hook) -> bool {
        self.0 & hook.bit() != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Hook> + '_ {
        Hook::ALL.into_iter().filter(|h| self.contains(*h))
    }
}

impl FromIterator<Hook> for HookSet {
    fn from_iter<I: IntoIterator<Item = Hook>>(iter: I) -> Self {
        iter.into_iter().fold(HookSet::empty(), HookSet::with)
    }
}

impl Serialize for HookSet {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(self.iter())
    }
}

/// `create_object` 返回的不透明对象句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectHandle(pub u64);

/// `init` 时可见的类信息。全局地图先于其它类初始化，因此 `area` 对后续类可用。
#[derive(Debug, Clone, Copy)]
pub struct ClassContext<'a> {
    pub id: ClassId,
    pub name: &'a str,
    pub area: Option<Area>,
}

/// 已加载的类实现
pub trait ClassModule {
    /// 模型描述（必需）
    fn model(&self) -> Model;

    /// 本模块提供的可选钩子
    fn provided(&self) -> HookSet {
        HookSet::empty()
    }

    fn init(&mut self, _ctx: &ClassContext<'_>, _params: &ParamList) -> Result<(), HookError> {
        Ok(())
    }

    fn destroy(&mut self, _class: ClassId) -> Result<(), HookError> {
        Ok(())
    }

    fn bootstrap(&mut self, _to: Call) -> Result<(), HookError> {
        Ok(())
    }

    fn bind(&mut self, _to: Call, _params: &ParamList) -> Result<(), HookError> {
        Ok(())
    }

    fn unbind(&mut self, _to: Call) -> Result<(), HookError> {
        Ok(())
    }

    fn ioctl(&mut self, _to: Call, _option: i32, _input: &[u8]) -> Result<Vec<u8>, HookError> {
        Ok(Vec::new())
    }

    fn create_object(&mut self, _to: Call) -> Option<ObjectHandle> {
        None
    }

    fn destroy_object(&mut self, _to: Call, _object: ObjectHandle) {}

    /// 方法表，在注册时取出一次。
    fn methods(&mut self) -> Option<Methods> {
        None
    }
}

/// 不提供任何钩子的模块：用于未实现的类和脚本后端占位。
#[derive(Debug, Clone)]
pub struct HooklessModule {
    model: Model,
}

impl HooklessModule {
    pub fn new(model: Model) -> Self {
        HooklessModule { model }
    }
}

impl ClassModule for HooklessModule {
    fn model(&self) -> Model {
        self.model.clone()
    }
}
