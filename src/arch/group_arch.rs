//! 分组架构
//!
//! 声明一个组由什么样的节点构成：组长所需的节点架构，以及每个成员角色所需的
//! 节点架构与人数。
//!
//! ```xml
//! <group_architecture name="cluster" count="2">
//!   <leader architecture="head"/>
//!   <member architecture="sensor" count="4"/>
//! </group_architecture>
//! ```

use super::node_arch::NodeArchitecture;
use crate::config::Element;
use crate::error::ConfigError;
use crate::id::{GroupArchId, NodeArchId};
use serde::Serialize;
use tracing::info;

/// 成员角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemberRole {
    pub arch: NodeArchId,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupArchitecture {
    pub id: GroupArchId,
    pub name: String,
    pub leader: NodeArchId,
    pub members: Vec<MemberRole>,
    /// 未在 `simulation` 上给出 `groups` 时的实例数
    pub count: usize,
}

impl GroupArchitecture {
    /// 每组需要的节点数
    pub fn group_size(&self) -> usize {
        self.members.iter().fold(1usize, |acc, m| acc.saturating_add(m.count))
    }
}

fn resolve_arch(
    el: &Element,
    archs: &[NodeArchitecture],
    context: &str,
) -> Result<NodeArchId, ConfigError> {
    let name = el.required_attr("architecture", context)?;
    archs
        .iter()
        .find(|a| a.name == name)
        .map(|a| a.id)
        .ok_or_else(|| ConfigError::invalid(context, "architecture", name))
}

#[tracing::instrument(skip_all, fields(group_arch = %id))]
pub fn build_group_arch(
    id: GroupArchId,
    el: &Element,
    archs: &[NodeArchitecture],
) -> Result<GroupArchitecture, ConfigError> {
    let name = el.required_attr("name", "group_architecture")?.to_string();
    let context = format!("分组架构 '{name}'");
    let leader_el = el
        .child("leader")
        .ok_or_else(|| ConfigError::missing(&context, "leader"))?;
    let leader = resolve_arch(leader_el, archs, &context)?;

    let members = el
        .children_named("member")
        .map(|m| {
            Ok(MemberRole {
                arch: resolve_arch(m, archs, &context)?,
                count: m.parse_attr("count", &context)?.unwrap_or(1),
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;
    let count = el.parse_attr("count", &context)?.unwrap_or(1);

    let group_arch = GroupArchitecture {
        id,
        name,
        leader,
        members,
        count,
    };
    info!(
        group_arch = %group_arch.name,
        size = group_arch.group_size(),
        count,
        "分组架构构建完成"
    );
    Ok(group_arch)
}
