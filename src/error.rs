//! 配置错误
//!
//! 定义配置阶段的错误分类。除 `LifecycleHookFailure` 在介质/环境绑定中只告警外，
//! 其余错误都会中止整个配置过程。

use std::path::PathBuf;
use thiserror::Error;

/// 生命周期钩子（init/bind/bootstrap…）返回的失败。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(msg: impl Into<String>) -> Self {
        HookError(msg.into())
    }

    /// 由原生钩子的非零返回码构造
    pub fn from_code(code: i32) -> Self {
        HookError(format!("返回码 {code}"))
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取 {path} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("文档结构校验失败: {0}")]
    SchemaValidation(String),

    #[error("文档解析失败: {0}")]
    DocumentParse(String),

    #[error("{context}: 缺少必需属性 '{attribute}'")]
    MissingRequiredAttribute { context: String, attribute: String },

    #[error("{context}: 属性 '{attribute}' 的值 '{value}' 无效")]
    InvalidAttribute {
        context: String,
        attribute: String,
        value: String,
    },

    #[error("{context}: 未声明的类 '{name}'")]
    UnknownClass { context: String, name: String },

    #[error("类 '{class}': 在所有搜索路径中都找不到模块 '{library}'")]
    ModuleNotFound { class: String, library: String },

    #[error("类 '{class}': 加载模块 {path} 失败: {reason}")]
    ModuleLoad {
        class: String,
        path: PathBuf,
        reason: String,
    },

    #[error("类 '{class}': 缺少必需符号 '{symbol}'")]
    MissingRequiredSymbol { class: String, symbol: String },

    #[error("类 '{class}': 方法表与声明的模型类型 {model} 不匹配")]
    CapabilityMismatch { class: String, model: String },

    #[error("{0}: 分配失败")]
    AllocationFailure(String),

    #[error("{context}: 数量不符（需要 {needed}，实际 {available}）")]
    SizeMismatch {
        context: String,
        needed: usize,
        available: usize,
    },

    #[error("{context}: 生命周期钩子失败: {source}")]
    LifecycleHookFailure {
        context: String,
        #[source]
        source: HookError,
    },
}

impl ConfigError {
    pub(crate) fn missing(context: impl Into<String>, attribute: &str) -> Self {
        ConfigError::MissingRequiredAttribute {
            context: context.into(),
            attribute: attribute.to_string(),
        }
    }

    pub(crate) fn invalid(context: impl Into<String>, attribute: &str, value: &str) -> Self {
        ConfigError::InvalidAttribute {
            context: context.into(),
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }

    pub(crate) fn unknown_class(context: impl Into<String>, name: &str) -> Self {
        ConfigError::UnknownClass {
            context: context.into(),
            name: name.to_string(),
        }
    }

    pub(crate) fn hook(context: impl Into<String>, source: HookError) -> Self {
        ConfigError::LifecycleHookFailure {
            context: context.into(),
            source,
        }
    }
}
