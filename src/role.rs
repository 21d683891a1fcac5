//! 角色槽位
//!
//! 介质、环境与节点架构都把子元素按角色标签放进单例槽或数组槽。
//! 这里提供统一的"先计数、再按精确容量分配、最后填充"流程。

use crate::config::Element;
use crate::error::ConfigError;
use crate::id::ClassId;

/// 角色的基数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Singleton,
    Array,
}

/// 一个角色：子元素标签与基数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSpec {
    pub tag: &'static str,
    pub cardinality: Cardinality,
}

impl RoleSpec {
    pub const fn singleton(tag: &'static str) -> Self {
        RoleSpec {
            tag,
            cardinality: Cardinality::Singleton,
        }
    }

    pub const fn array(tag: &'static str) -> Self {
        RoleSpec {
            tag,
            cardinality: Cardinality::Array,
        }
    }
}

/// 可写的角色槽
pub enum SlotMut<'a> {
    Singleton(&'a mut Option<ClassId>),
    Array(&'a mut Vec<ClassId>),
}

impl SlotMut<'_> {
    pub fn store(self, class: ClassId) {
        match self {
            SlotMut::Singleton(slot) => *slot = Some(class),
            SlotMut::Array(arr) => arr.push(class),
        }
    }
}

pub fn role_index(roles: &[RoleSpec], tag: &str) -> Option<usize> {
    roles.iter().position(|r| r.tag == tag)
}

/// 计数阶段：统计每个角色的子元素个数。
///
/// `ignored` 中的标签跳过；其它未知标签报错；单例角色出现多次报错。
pub fn count_roles(
    el: &Element,
    roles: &[RoleSpec],
    ignored: &[&str],
    context: &str,
) -> Result<Vec<usize>, ConfigError> {
    let mut counts = vec![0; roles.len()];
    for child in &el.children {
        if ignored.contains(&child.tag.as_str()) {
            continue;
        }
        let Some(i) = role_index(roles, &child.tag) else {
            return Err(ConfigError::DocumentParse(format!(
                "{context}: 未知的角色 <{}>",
                child.tag
            )));
        };
        counts[i] += 1;
        if roles[i].cardinality == Cardinality::Singleton && counts[i] > 1 {
            return Err(ConfigError::DocumentParse(format!(
                "{context}: 单例角色 <{}> 出现多次",
                child.tag
            )));
        }
    }
    Ok(counts)
}

/// 按角色划分槽位的实体
pub trait RoleSlots {
    const ROLES: &'static [RoleSpec];

    fn slot(&mut self, role: usize) -> SlotMut<'_>;

    /// 某角色当前已写入的类数
    fn filled(&self, role: usize) -> usize;
}

/// 数组槽按精确容量分配
pub fn allocate<S: RoleSlots>(slots: &mut S, counts: &[usize]) {
    for (i, &count) in counts.iter().enumerate() {
        if let SlotMut::Array(arr) = slots.slot(i) {
            *arr = Vec::with_capacity(count);
        }
    }
}

/// 填充后核对：每个角色实际写入的数量必须等于计数阶段的结果。
pub fn verify_filled<S: RoleSlots>(slots: &S, counts: &[usize], context: &str) -> Result<(), ConfigError> {
    for (i, role) in S::ROLES.iter().enumerate() {
        let got = slots.filled(i);
        if got != counts[i] {
            return Err(ConfigError::SizeMismatch {
                context: format!("{context} 的 <{}>", role.tag),
                needed: counts[i],
                available: got,
            });
        }
    }
    Ok(())
}

/// 单例槽的已写入数
pub fn singleton_filled(slot: Option<ClassId>) -> usize {
    usize::from(slot.is_some())
}
