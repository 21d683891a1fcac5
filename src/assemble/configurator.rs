//! 配置入口
//!
//! 宿主设置配置文件、schema 文件与模块目录后调用 `run_configuration`：
//! 读取文档、校验结构、按阶段装配。

use super::assembler::assemble;
use super::simulation::Simulation;
use crate::class::{Backend, Loaders, ModuleLoader};
use crate::config::{Document, Settings, validate};
use crate::error::ConfigError;
use std::path::PathBuf;
use tracing::info;

pub struct Configurator {
    settings: Settings,
    loaders: Loaders,
}

impl Configurator {
    pub fn new(settings: Settings) -> Self {
        Configurator {
            settings,
            loaders: Loaders::default(),
        }
    }

    /// 用 `WSNET_MODDIR` 初始化用户模块路径
    pub fn from_env() -> Self {
        Configurator::new(Settings::from_env())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_config_file(&mut self, path: impl Into<PathBuf>) {
        self.settings.config_file = Some(path.into());
    }

    pub fn set_schema_file(&mut self, path: impl Into<PathBuf>) {
        self.settings.schema_file = Some(path.into());
    }

    /// 追加一个系统模块目录
    pub fn set_module_dir(&mut self, path: impl Into<PathBuf>) {
        self.settings.system_module_dirs.push(path.into());
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.settings.seed = seed;
    }

    /// 替换某个后端的加载策略
    pub fn register_loader(&mut self, backend: Backend, loader: impl ModuleLoader + 'static) {
        self.loaders.register(backend, loader);
    }

    pub fn set_loaders(&mut self, loaders: Loaders) {
        self.loaders = loaders;
    }

    /// 读取、校验并装配配置文件
    #[tracing::instrument(skip(self))]
    pub fn run_configuration(&self) -> Result<Simulation, ConfigError> {
        let path = self.settings.config_file.as_deref().ok_or_else(|| {
            ConfigError::MissingRequiredAttribute {
                context: "宿主设置".to_string(),
                attribute: "config_file".to_string(),
            }
        })?;
        info!(config = %path.display(), "📄 读取配置文件");
        let doc = Document::load(path)?;
        self.assemble_document(&doc)
    }

    /// 校验并装配一个已解析的文档
    pub fn assemble_document(&self, doc: &Document) -> Result<Simulation, ConfigError> {
        validate(doc, self.settings.schema_file.as_deref())?;
        assemble(
            doc,
            &self.loaders,
            self.settings.search_paths(),
            self.settings.seed,
        )
    }
}
