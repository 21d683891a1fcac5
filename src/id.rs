//! 标识符类型
//!
//! 所有实体都存放在各自的稠密数组中，跨实体引用一律使用这些下标句柄。

use serde::Serialize;
use std::fmt;

macro_rules! dense_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

dense_id!(
    /// 类标识符
    ClassId
);
dense_id!(
    /// 介质标识符
    MediumId
);
dense_id!(
    /// 环境标识符
    EnvironmentId
);
dense_id!(
    /// 节点架构标识符
    NodeArchId
);
dense_id!(
    /// 节点标识符
    NodeId
);
dense_id!(
    /// 分组架构标识符
    GroupArchId
);
dense_id!(
    /// 分组标识符
    GroupId
);

/// 绑定的拥有者。实例表与调用约定都以它为键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Owner {
    /// 仿真级监视器
    Simulation,
    Medium(MediumId),
    Environment(EnvironmentId),
    Node(NodeId),
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Simulation => write!(f, "simulation"),
            Owner::Medium(id) => write!(f, "medium#{id}"),
            Owner::Environment(id) => write!(f, "environment#{id}"),
            Owner::Node(id) => write!(f, "node#{id}"),
        }
    }
}

/// 统一调用约定中的一端：`{class, owner}`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Call {
    pub class: ClassId,
    pub owner: Owner,
}

impl Call {
    pub fn new(class: ClassId, owner: Owner) -> Self {
        Call { class, owner }
    }
}
