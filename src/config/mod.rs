//! 配置模块
//!
//! 配置文档模型、结构校验与宿主设置。

mod document;
mod schema;
mod settings;

pub use document::{Document, Element};
pub use schema::{ROOT_TAG, is_class_tag, validate};
pub use settings::{MODDIR_ENV, Settings, split_path_list};
