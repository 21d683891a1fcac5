//! 节点与分组
//!
//! 装配阶段创建的节点实例和分组实例。

use crate::arch::NodeType;
use crate::class::ObjectHandle;
use crate::id::{GroupArchId, GroupId, NodeArchId, NodeId};
use crate::sim::SimTime;
use serde::Serialize;

/// 节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub arch: NodeArchId,
    pub birth: SimTime,
    pub node_type: NodeType,
    /// 每个架构位置一个私有数据槽，存放 `create_object` 的结果
    pub slots: Vec<Option<ObjectHandle>>,
    pub group: Option<GroupId>,
    /// 出生事件执行后为真
    pub alive: bool,
}

impl Node {
    pub fn object_at(&self, position: usize) -> Option<ObjectHandle> {
        self.slots.get(position).copied().flatten()
    }
}

/// 分组
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub id: GroupId,
    pub arch: GroupArchId,
    pub leader: NodeId,
    pub members: Vec<NodeId>,
}

impl Group {
    /// 组长在前的全部节点
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(self.leader).chain(self.members.iter().copied())
    }
}
