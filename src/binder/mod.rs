//! 介质与环境绑定模块
//!
//! 把介质/环境声明中的命名角色绑定到具体的类。

mod binding;
mod environment;
mod medium;

pub use binding::{BindFailure, BindTarget, bind_roles};
pub use environment::{Environment, bind_environment};
pub use medium::{Medium, SPEED_OF_LIGHT, bind_medium};
