//! 架构模块
//!
//! 节点架构（协议栈图）与分组架构的构建。

mod group_arch;
mod node_arch;

pub use group_arch::{GroupArchitecture, MemberRole, build_group_arch};
pub use node_arch::{LAYER_ROLES, NodeArchitecture, NodeType, build_node_arch};
