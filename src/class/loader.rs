//! 模块加载策略
//!
//! 每种后端对应一个 `ModuleLoader`。默认情况下 `c`/`cxx` 走原生动态库加载，
//! `python`/`ruby` 只生成占位模块；宿主可以为任意后端注册自己的加载器，
//! 例如用 `StaticLoader` 把进程内实现的模型挂到某个库名上。

use super::implementation::{Backend, Implementation};
use super::model::{Model, ModelType};
use super::module::{ClassModule, HooklessModule};
use super::native::NativeLoader;
use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// 模块搜索路径：先用户路径，后系统路径。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPaths {
    pub user: Vec<PathBuf>,
    pub system: Vec<PathBuf>,
}

impl SearchPaths {
    /// 按搜索顺序列出 `library` 可能的文件位置（平台命名在前，原名在后）。
    pub fn candidates(&self, library: &str) -> Vec<PathBuf> {
        let platform = libloading::library_filename(library);
        self.user
            .iter()
            .chain(self.system.iter())
            .flat_map(|dir| [dir.join(&platform), dir.join(library)])
            .collect()
    }
}

/// 一次加载请求
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    pub class: &'a str,
    /// 声明该类时使用的标签
    pub declared: ModelType,
    pub implementation: &'a Implementation,
    pub paths: &'a SearchPaths,
}

/// 把一个实现声明变成可调用的模块
pub trait ModuleLoader {
    fn load(&self, request: &LoadRequest<'_>) -> Result<Box<dyn ClassModule>, ConfigError>;
}

/// 进程内模块工厂
pub type ModuleFactory = Box<dyn Fn() -> Box<dyn ClassModule>>;

/// 按库名查找进程内工厂的加载器
#[derive(Default)]
pub struct StaticLoader {
    factories: HashMap<String, ModuleFactory>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        library: impl Into<String>,
        factory: impl Fn() -> Box<dyn ClassModule> + 'static,
    ) -> &mut Self {
        self.factories.insert(library.into(), Box::new(factory));
        self
    }
}

impl ModuleLoader for StaticLoader {
    fn load(&self, request: &LoadRequest<'_>) -> Result<Box<dyn ClassModule>, ConfigError> {
        let library = match request.implementation {
            Implementation::Native { library, .. } => library.as_str(),
            Implementation::Script { module, .. } => module.as_deref().unwrap_or(request.class),
            Implementation::Unimplemented => request.class,
        };
        let factory = self
            .factories
            .get(library)
            .ok_or_else(|| ConfigError::ModuleNotFound {
                class: request.class.to_string(),
                library: library.to_string(),
            })?;
        debug!(class = request.class, library, "使用进程内模块");
        Ok(factory())
    }
}

/// 脚本后端占位：不加载任何东西，模型类型取自声明标签。
#[derive(Debug, Default)]
pub struct ScriptLoader;

impl ModuleLoader for ScriptLoader {
    fn load(&self, request: &LoadRequest<'_>) -> Result<Box<dyn ClassModule>, ConfigError> {
        warn!(
            class = request.class,
            backend = ?request.implementation.backend(),
            "脚本后端尚无解释器，类以无钩子模块加载"
        );
        Ok(Box::new(HooklessModule::new(Model::new(
            request.declared,
            "script stub",
        ))))
    }
}

/// 后端到加载器的注册表
pub struct Loaders {
    by_backend: HashMap<Backend, Box<dyn ModuleLoader>>,
}

impl Default for Loaders {
    fn default() -> Self {
        let mut loaders = Loaders::empty();
        loaders.register(Backend::C, NativeLoader);
        loaders.register(Backend::Cxx, NativeLoader);
        loaders.register(Backend::Python, ScriptLoader);
        loaders.register(Backend::Ruby, ScriptLoader);
        loaders
    }
}

impl Loaders {
    /// 没有任何加载器的注册表
    pub fn empty() -> Self {
        Loaders {
            by_backend: HashMap::new(),
        }
    }

    /// 注册（或替换）某个后端的加载器
    pub fn register(&mut self, backend: Backend, loader: impl ModuleLoader + 'static) {
        self.by_backend.insert(backend, Box::new(loader));
    }

    pub fn load(&self, request: &LoadRequest<'_>) -> Result<Box<dyn ClassModule>, ConfigError> {
        let Some(backend) = request.implementation.backend() else {
            debug!(class = request.class, "类未实现，使用无钩子模块");
            return Ok(Box::new(HooklessModule::new(Model::new(
                request.declared,
                "unimplemented",
            ))));
        };
        let loader = self.by_backend.get(&backend).ok_or_else(|| ConfigError::ModuleLoad {
            class: request.class.to_string(),
            path: PathBuf::new(),
            reason: format!("后端 {backend} 没有注册加载器"),
        })?;
        loader.load(request)
    }
}
