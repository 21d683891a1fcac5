//! 参数模块
//!
//! 参数表与按作用域解析的默认参数存储。

mod list;
mod store;

pub use list::{Param, ParamList};
pub use store::{DefaultParamEntry, DefaultParamStore, Scope};
