//! 实现后端
//!
//! 类声明中的 `implementation` 块选择恰好一种后端：
//!
//! ```xml
//! <implementation><c><param key="library" value="mac_802_11"/></c></implementation>
//! ```
//!
//! 没有 `implementation` 块的类视为未实现。

use crate::config::Element;
use crate::error::ConfigError;
use serde::Serialize;
use std::fmt;

/// 后端种类，对应 `implementation` 块下的子元素标签。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    C,
    Cxx,
    Python,
    Ruby,
}

impl Backend {
    pub fn from_tag(tag: &str) -> Option<Backend> {
        match tag {
            "c" => Some(Backend::C),
            "cxx" => Some(Backend::Cxx),
            "python" => Some(Backend::Python),
            "ruby" => Some(Backend::Ruby),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Backend::C => "c",
            Backend::Cxx => "cxx",
            Backend::Python => "python",
            Backend::Ruby => "ruby",
        }
    }

    pub fn is_native(self) -> bool {
        matches!(self, Backend::C | Backend::Cxx)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// 类的实现方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Implementation {
    /// 原生动态库，`library` 为不带平台前后缀的模块名
    Native { backend: Backend, library: String },
    /// 内嵌脚本，仅占位
    Script { backend: Backend, module: Option<String> },
    Unimplemented,
}

impl Implementation {
    pub fn backend(&self) -> Option<Backend> {
        match self {
            Implementation::Native { backend, .. } | Implementation::Script { backend, .. } => {
                Some(*backend)
            }
            Implementation::Unimplemented => None,
        }
    }

    /// 解析类声明中的 `implementation` 块
    pub fn parse(class_el: &Element, context: &str) -> Result<Implementation, ConfigError> {
        let Some(block) = class_el.child("implementation") else {
            return Ok(Implementation::Unimplemented);
        };
        let [choice] = block.children.as_slice() else {
            return Err(ConfigError::DocumentParse(format!(
                "{context}: implementation 块必须恰好选择一种后端（实际 {} 个）",
                block.children.len()
            )));
        };
        let backend = Backend::from_tag(&choice.tag).ok_or_else(|| {
            ConfigError::DocumentParse(format!("{context}: 未知的实现后端 '{}'", choice.tag))
        })?;
        let params = choice.inline_params(context)?;
        if backend.is_native() {
            let library = params
                .get("library")
                .or_else(|| choice.attr("library"))
                .ok_or_else(|| ConfigError::missing(context, "library"))?;
            Ok(Implementation::Native {
                backend,
                library: library.to_string(),
            })
        } else {
            Ok(Implementation::Script {
                backend,
                module: params.get("module").map(str::to_string),
            })
        }
    }
}
