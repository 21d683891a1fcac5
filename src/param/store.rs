//! 默认参数解析
//!
//! 保存配置过程中声明过的所有 `(class, arch, node, medium, environment)` 作用域参数集，
//! 并为一次绑定请求找出最具体的那一个。仅在配置阶段存在，装配结束后丢弃。

use super::list::ParamList;
use crate::id::{ClassId, EnvironmentId, MediumId, NodeArchId, NodeId};
use tracing::trace;

/// 参数集的作用域。`None` 为通配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scope {
    pub class: ClassId,
    pub arch: Option<NodeArchId>,
    pub node: Option<NodeId>,
    pub medium: Option<MediumId>,
    pub environment: Option<EnvironmentId>,
}

impl Scope {
    /// 仅指定类，其余维度通配
    pub fn class(class: ClassId) -> Self {
        Scope {
            class,
            arch: None,
            node: None,
            medium: None,
            environment: None,
        }
    }

    pub fn arch(mut self, arch: impl Into<Option<NodeArchId>>) -> Self {
        self.arch = arch.into();
        self
    }

    pub fn node(mut self, node: impl Into<Option<NodeId>>) -> Self {
        self.node = node.into();
        self
    }

    pub fn medium(mut self, medium: impl Into<Option<MediumId>>) -> Self {
        self.medium = medium.into();
        self
    }

    pub fn environment(mut self, environment: impl Into<Option<EnvironmentId>>) -> Self {
        self.environment = environment.into();
        self
    }

    /// 作为条目与查询比较：条目上的非通配维度必须与查询相等，否则不是候选。
    /// 返回得分（类维度恒计 1）。
    fn score_against(&self, query: &Scope) -> Option<u32> {
        if self.class != query.class {
            return None;
        }
        let mut score = 1;
        if !dim_matches(self.arch, query.arch, &mut score)
            || !dim_matches(self.node, query.node, &mut score)
            || !dim_matches(self.medium, query.medium, &mut score)
            || !dim_matches(self.environment, query.environment, &mut score)
        {
            return None;
        }
        Some(score)
    }
}

fn dim_matches<T: PartialEq>(entry: Option<T>, query: Option<T>, score: &mut u32) -> bool {
    match entry {
        None => true,
        Some(v) if Some(&v) == query.as_ref() => {
            *score += 1;
            true
        }
        Some(_) => false,
    }
}

/// 一条带作用域的默认参数
#[derive(Debug, Clone)]
pub struct DefaultParamEntry {
    pub scope: Scope,
    pub params: ParamList,
}

/// 默认参数存储
#[derive(Debug, Default)]
pub struct DefaultParamStore {
    entries: Vec<DefaultParamEntry>,
}

impl DefaultParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, scope: Scope, params: ParamList) {
        trace!(?scope, params = params.len(), "记录默认参数");
        self.entries.push(DefaultParamEntry { scope, params });
    }

    /// 得分最高的候选；同分时先插入者胜出。
    pub fn best_match(&self, query: &Scope) -> Option<&ParamList> {
        let mut best: Option<(u32, &DefaultParamEntry)> = None;
        for entry in &self.entries {
            let Some(score) = entry.scope.score_against(query) else {
                continue;
            };
            if best.is_none_or(|(s, _)| score > s) {
                best = Some((score, entry));
            }
        }
        best.map(|(_, e)| &e.params)
    }

    /// 类自身的全局默认值，即作用域恰为 `(class, *, *, *, *)` 的首条记录。
    pub fn class_defaults(&self, class: ClassId) -> Option<&ParamList> {
        let scope = Scope::class(class);
        self.entries
            .iter()
            .find(|e| e.scope == scope)
            .map(|e| &e.params)
    }

    /// 解析一次绑定的参数：类全局默认值的副本，合并 `query` 的最佳匹配，再合并显式参数。
    pub fn resolve(&self, query: &Scope, explicit: &ParamList) -> ParamList {
        let mut merged = self
            .class_defaults(query.class)
            .map(ParamList::duplicate)
            .unwrap_or_default();
        if let Some(best) = self.best_match(query) {
            merged.merge_all(best);
        }
        merged.merge_all(explicit);
        merged
    }

    /// 同 `resolve`，并把结果按 `record` 作用域写回，供后续绑定复用。
    pub fn resolve_and_record(
        &mut self,
        query: &Scope,
        explicit: &ParamList,
        record: Scope,
    ) -> ParamList {
        let merged = self.resolve(query, explicit);
        self.insert(record, merged.duplicate());
        merged
    }
}
