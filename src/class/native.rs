//! 原生动态库后端
//!
//! 通过 libloading 打开 `c`/`cxx` 模块，按符号名解析必需的 `model` 描述和
//! 可选的钩子。模块导出的 C 接口：
//!
//! - `model`：`RawModel` 静态数据（必需）
//! - `init(class, params, area) -> int`、`destroy(class) -> int`
//! - `bootstrap(to) -> int`、`bind(to, params) -> int`、`unbind(to) -> int`
//! - `ioctl(to, option, input, len) -> int`
//! - `create_object(to) -> void*`、`destroy_object(to, object)`
//! - `methods`：方法表静态数据
//!
//! 钩子返回非零即视为失败。

use super::loader::{LoadRequest, ModuleLoader};
use super::methods::{Methods, NativeMethods};
use super::model::{Model, ModelType};
use super::module::{ClassContext, ClassModule, Hook, HookSet, ObjectHandle};
use super::implementation::Implementation;
use crate::error::{ConfigError, HookError};
use crate::id::{Call, ClassId, Owner};
use crate::param::ParamList;
use libloading::Library;
use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 模块导出的模型描述
#[repr(C)]
pub struct RawModel {
    /// `ModelType::ALL` 中的下标
    pub model_type: c_int,
    pub description: *const c_char,
}

#[repr(C)]
pub struct RawParam {
    pub key: *const c_char,
    pub value: *const c_char,
}

#[repr(C)]
pub struct RawParamList {
    pub params: *const RawParam,
    pub len: usize,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawCall {
    pub class: c_int,
    /// 0 仿真，1 介质，2 环境，3 节点
    pub owner_kind: c_int,
    pub owner: c_int,
}

#[repr(C)]
pub struct RawArea {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

type FnInit = unsafe extern "C" fn(c_int, *const RawParamList, *const RawArea) -> c_int;
type FnDestroy = unsafe extern "C" fn(c_int) -> c_int;
type FnCall = unsafe extern "C" fn(*const RawCall) -> c_int;
type FnBind = unsafe extern "C" fn(*const RawCall, *const RawParamList) -> c_int;
type FnIoctl = unsafe extern "C" fn(*const RawCall, c_int, *const u8, usize) -> c_int;
type FnCreateObject = unsafe extern "C" fn(*const RawCall) -> *mut c_void;
type FnDestroyObject = unsafe extern "C" fn(*const RawCall, *mut c_void);

impl From<Call> for RawCall {
    fn from(call: Call) -> Self {
        let (owner_kind, owner) = match call.owner {
            Owner::Simulation => (0, 0),
            Owner::Medium(id) => (1, id.0),
            Owner::Environment(id) => (2, id.0),
            Owner::Node(id) => (3, id.0),
        };
        RawCall {
            class: call.class.0 as c_int,
            owner_kind,
            owner: owner as c_int,
        }
    }
}

/// 参数表的 C 视图，生命周期内保持字符串存活。
struct CParams {
    _strings: Vec<CString>,
    raw: Vec<RawParam>,
}

impl CParams {
    fn new(params: &ParamList) -> Result<Self, HookError> {
        let mut strings = Vec::with_capacity(params.len() * 2);
        for p in params.iter() {
            for s in [&p.key, &p.value] {
                let c = CString::new(s.as_str())
                    .map_err(|_| HookError::new(format!("参数 '{}' 含有 NUL 字符", p.key)))?;
                strings.push(c);
            }
        }
        let raw = strings
            .chunks(2)
            .map(|kv| RawParam {
                key: kv[0].as_ptr(),
                value: kv[1].as_ptr(),
            })
            .collect();
        Ok(CParams {
            _strings: strings,
            raw,
        })
    }

    fn list(&self) -> RawParamList {
        RawParamList {
            params: self.raw.as_ptr(),
            len: self.raw.len(),
        }
    }
}

fn check(code: c_int) -> Result<(), HookError> {
    if code == 0 {
        Ok(())
    } else {
        Err(HookError::from_code(code))
    }
}

/// 从动态库加载的类模块
pub struct NativeModule {
    _library: Arc<Library>,
    model: Model,
    init: Option<FnInit>,
    destroy: Option<FnDestroy>,
    bootstrap: Option<FnCall>,
    bind: Option<FnBind>,
    unbind: Option<FnCall>,
    ioctl: Option<FnIoctl>,
    create_object: Option<FnCreateObject>,
    destroy_object: Option<FnDestroyObject>,
    methods: Option<NativeMethods>,
}

impl NativeModule {
    /// 打开动态库并解析符号
    pub fn open(class: &str, path: &Path) -> Result<Self, ConfigError> {
        // SAFETY: 模块由用户在配置中显式指定，加载其初始化代码是预期行为
        let library = unsafe { Library::new(path) }.map_err(|e| ConfigError::ModuleLoad {
            class: class.to_string(),
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let library = Arc::new(library);

        // SAFETY: 符号类型遵循模块 C 接口约定
        unsafe {
            let model_ptr = library
                .get::<*const RawModel>(b"model")
                .map(|s| *s)
                .map_err(|_| ConfigError::MissingRequiredSymbol {
                    class: class.to_string(),
                    symbol: "model".to_string(),
                })?;
            let model = read_model(class, path, model_ptr)?;

            let init = optional::<FnInit>(&library, Hook::Init);
            let destroy = optional::<FnDestroy>(&library, Hook::Destroy);
            let bootstrap = optional::<FnCall>(&library, Hook::Bootstrap);
            let bind = optional::<FnBind>(&library, Hook::Bind);
            let unbind = optional::<FnCall>(&library, Hook::Unbind);
            let ioctl = optional::<FnIoctl>(&library, Hook::Ioctl);
            let create_object = optional::<FnCreateObject>(&library, Hook::CreateObject);
            let destroy_object = optional::<FnDestroyObject>(&library, Hook::DestroyObject);
            let methods = optional::<*const c_void>(&library, Hook::Methods).map(NativeMethods);

            Ok(NativeModule {
                _library: library,
                model,
                init,
                destroy,
                bootstrap,
                bind,
                unbind,
                ioctl,
                create_object,
                destroy_object,
                methods,
            })
        }
    }
}

/// 缺失的可选钩子记为未提供
///
/// # Safety
/// `T` 必须与该钩子的 C 接口一致
unsafe fn optional<T: Copy>(library: &Library, hook: Hook) -> Option<T> {
    // SAFETY: 由调用方保证
    unsafe { library.get::<T>(hook.symbol().as_bytes()) }
        .ok()
        .map(|s| *s)
}

/// # Safety
/// `ptr` 必须指向模块导出的 `RawModel`
unsafe fn read_model(class: &str, path: &Path, ptr: *const RawModel) -> Result<Model, ConfigError> {
    let bad = |reason: &str| ConfigError::ModuleLoad {
        class: class.to_string(),
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    if ptr.is_null() {
        return Err(bad("model 符号为空"));
    }
    // SAFETY: 由调用方保证
    let raw = unsafe { &*ptr };
    let kind = usize::try_from(raw.model_type)
        .ok()
        .and_then(|i| ModelType::ALL.get(i).copied())
        .ok_or_else(|| bad("未知的模型类型"))?;
    let description = if raw.description.is_null() {
        String::new()
    } else {
        // SAFETY: 描述是以 NUL 结尾的静态字符串
        unsafe { CStr::from_ptr(raw.description) }
            .to_string_lossy()
            .into_owned()
    };
    Ok(Model { kind, description })
}

impl ClassModule for NativeModule {
    fn model(&self) -> Model {
        self.model.clone()
    }

    fn provided(&self) -> HookSet {
        let mut set = HookSet::empty();
        let present = [
            (Hook::Init, self.init.is_some()),
            (Hook::Destroy, self.destroy.is_some()),
            (Hook::Bootstrap, self.bootstrap.is_some()),
            (Hook::Bind, self.bind.is_some()),
            (Hook::Unbind, self.unbind.is_some()),
            (Hook::Ioctl, self.ioctl.is_some()),
            (Hook::CreateObject, self.create_object.is_some()),
            (Hook::DestroyObject, self.destroy_object.is_some()),
            (Hook::Methods, self.methods.is_some()),
        ];
        for (hook, ok) in present {
            if ok {
                set.insert(hook);
            }
        }
        set
    }

    fn init(&mut self, ctx: &ClassContext<'_>, params: &ParamList) -> Result<(), HookError> {
        let Some(init) = self.init else { return Ok(()) };
        let c = CParams::new(params)?;
        let list = c.list();
        let area = ctx.area.map(|a| RawArea { x: a.x, y: a.y, z: a.z });
        let area_ptr = area.as_ref().map_or(std::ptr::null(), |a| a as *const RawArea);
        // SAFETY: 指针在调用期间有效
        check(unsafe { init(ctx.id.0 as c_int, &list, area_ptr) })
    }

    fn destroy(&mut self, class: ClassId) -> Result<(), HookError> {
        let Some(destroy) = self.destroy else { return Ok(()) };
        // SAFETY: 无指针参数
        check(unsafe { destroy(class.0 as c_int) })
    }

    fn bootstrap(&mut self, to: Call) -> Result<(), HookError> {
        let Some(bootstrap) = self.bootstrap else { return Ok(()) };
        let raw = RawCall::from(to);
        // SAFETY: 指针在调用期间有效
        check(unsafe { bootstrap(&raw) })
    }

    fn bind(&mut self, to: Call, params: &ParamList) -> Result<(), HookError> {
        let Some(bind) = self.bind else { return Ok(()) };
        let c = CParams::new(params)?;
        let list = c.list();
        let raw = RawCall::from(to);
        // SAFETY: 指针在调用期间有效
        check(unsafe { bind(&raw, &list) })
    }

    fn unbind(&mut self, to: Call) -> Result<(), HookError> {
        let Some(unbind) = self.unbind else { return Ok(()) };
        let raw = RawCall::from(to);
        // SAFETY: 指针在调用期间有效
        check(unsafe { unbind(&raw) })
    }

    fn ioctl(&mut self, to: Call, option: i32, input: &[u8]) -> Result<Vec<u8>, HookError> {
        let Some(ioctl) = self.ioctl else { return Ok(Vec::new()) };
        let raw = RawCall::from(to);
        // SAFETY: 指针在调用期间有效
        check(unsafe { ioctl(&raw, option, input.as_ptr(), input.len()) })?;
        Ok(Vec::new())
    }

    fn create_object(&mut self, to: Call) -> Option<ObjectHandle> {
        let create = self.create_object?;
        let raw = RawCall::from(to);
        // SAFETY: 指针在调用期间有效
        let obj = unsafe { create(&raw) };
        (!obj.is_null()).then(|| ObjectHandle(obj as usize as u64))
    }

    fn destroy_object(&mut self, to: Call, object: ObjectHandle) {
        let Some(destroy) = self.destroy_object else { return };
        let raw = RawCall::from(to);
        // SAFETY: 句柄来自同一模块的 create_object
        unsafe { destroy(&raw, object.0 as usize as *mut c_void) }
    }

    fn methods(&mut self) -> Option<Methods> {
        self.methods.map(Methods::Native)
    }
}

/// `c`/`cxx` 后端：在搜索路径中查找并打开动态库
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl ModuleLoader for NativeLoader {
    fn load(&self, request: &LoadRequest<'_>) -> Result<Box<dyn ClassModule>, ConfigError> {
        let Implementation::Native { library, .. } = request.implementation else {
            return Err(ConfigError::ModuleLoad {
                class: request.class.to_string(),
                path: Default::default(),
                reason: "原生加载器只接受原生实现".to_string(),
            });
        };
        let path = request
            .paths
            .candidates(library)
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| ConfigError::ModuleNotFound {
                class: request.class.to_string(),
                library: library.clone(),
            })?;
        debug!(class = request.class, path = %path.display(), "打开原生模块");
        let module = NativeModule::open(request.class, &path)?;
        info!(class = request.class, library = %library, "原生模块已加载");
        Ok(Box::new(module))
    }
}
