//! 装配结果
//!
//! 配置完成后的对象图：类表、介质、环境、节点架构、分组架构、节点与分组。
//! 装配后这些集合对运行时只读，唯一仍会变化的是类的实例表和节点的存活状态。

use super::assembler::Phase;
use super::birth::{BootstrapEntities, NodeBirth};
use super::node::{Group, Node};
use crate::arch::{GroupArchitecture, NodeArchitecture};
use crate::binder::{BindFailure, Environment, Medium};
use crate::class::{Area, Backend, Capability, Class, ClassTable, HookSet, Model};
use crate::error::{ConfigError, HookError};
use crate::id::{Call, ClassId, EnvironmentId, GroupId, MediumId, NodeArchId, NodeId, Owner};
use crate::sim::{SimTime, Simulator, World};
use serde::Serialize;
use std::any::Any;
use tracing::{debug, info, warn};

pub struct Simulation {
    pub(crate) classes: ClassTable,
    pub(crate) mediums: Vec<Medium>,
    pub(crate) environments: Vec<Environment>,
    pub(crate) node_archs: Vec<NodeArchitecture>,
    pub(crate) group_archs: Vec<GroupArchitecture>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) groups: Vec<Group>,
    pub(crate) duration: SimTime,
    pub(crate) global_map: Option<ClassId>,
    pub(crate) area: Option<Area>,
    pub(crate) monitors: Vec<ClassId>,
    pub(crate) bind_failures: Vec<BindFailure>,
    pub(crate) phases: Vec<Phase>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("classes", &self.classes.len())
            .field("mediums", &self.mediums.len())
            .field("environments", &self.environments.len())
            .field("nodes", &self.nodes.len())
            .field("groups", &self.groups.len())
            .field("duration", &self.duration)
            .field("global_map", &self.global_map)
            .finish_non_exhaustive()
    }
}

/// 拆除统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub unbound: usize,
    pub classes_destroyed: usize,
    pub failures: Vec<String>,
}

impl Simulation {
    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    pub fn class(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(id)
    }

    pub fn class_by_name(&self, name: &str) -> Option<&Class> {
        self.classes.by_name(name)
    }

    pub fn mediums(&self) -> &[Medium] {
        &self.mediums
    }

    pub fn medium(&self, id: MediumId) -> Option<&Medium> {
        self.mediums.get(id.0)
    }

    pub fn environments(&self) -> &[Environment] {
        &self.environments
    }

    pub fn environment(&self, id: EnvironmentId) -> Option<&Environment> {
        self.environments.get(id.0)
    }

    pub fn node_archs(&self) -> &[NodeArchitecture] {
        &self.node_archs
    }

    pub fn node_arch(&self, id: NodeArchId) -> Option<&NodeArchitecture> {
        self.node_archs.get(id.0)
    }

    pub fn node_arch_by_name(&self, name: &str) -> Option<&NodeArchitecture> {
        self.node_archs.iter().find(|a| a.name == name)
    }

    pub fn group_archs(&self) -> &[GroupArchitecture] {
        &self.group_archs
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id.0)
    }

    pub fn duration(&self) -> SimTime {
        self.duration
    }

    pub fn global_map(&self) -> Option<ClassId> {
        self.global_map
    }

    pub fn area(&self) -> Option<Area> {
        self.area
    }

    /// 仿真级监视器
    pub fn monitors(&self) -> &[ClassId] {
        &self.monitors
    }

    /// 介质/环境/仿真级绑定中被容忍的 `bind` 失败
    pub fn bind_failures(&self) -> &[BindFailure] {
        &self.bind_failures
    }

    /// 已完成的装配阶段，按执行顺序
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// 把仿真时长和出生事件推给调度器
    pub fn schedule_births(&self, sim: &mut Simulator) {
        sim.set_end(self.duration);
        sim.schedule(SimTime::ZERO, BootstrapEntities);
        for node in &self.nodes {
            sim.schedule(node.birth, NodeBirth { node: node.id });
        }
        info!(nodes = self.nodes.len(), end = ?self.duration, "出生事件已调度");
    }

    pub(crate) fn bootstrap_entities(&mut self) {
        let mut owned: Vec<(ClassId, Owner)> = Vec::new();
        owned.extend(self.monitors.iter().map(|c| (*c, Owner::Simulation)));
        for m in &self.mediums {
            owned.extend(m.classes.iter().map(|c| (*c, Owner::Medium(m.id))));
        }
        for e in &self.environments {
            owned.extend(e.classes.iter().map(|c| (*c, Owner::Environment(e.id))));
        }
        for (class, owner) in owned {
            self.bootstrap_one(class, owner);
        }
    }

    pub(crate) fn on_birth(&mut self, id: NodeId, now: SimTime) {
        let Some(node) = self.nodes.get_mut(id.0) else {
            warn!(node = %id, "出生事件指向不存在的节点");
            return;
        };
        node.alive = true;
        let arch = node.arch;
        let classes = self.node_archs[arch.0].classes.clone();
        debug!(node = %id, now = ?now, classes = classes.len(), "节点出生");
        for class in classes {
            self.bootstrap_one(class, Owner::Node(id));
        }
    }

    fn bootstrap_one(&mut self, class: ClassId, owner: Owner) {
        if let Some(c) = self.classes.get_mut(class) {
            if let Err(e) = c.bootstrap(owner) {
                warn!(class = %c.name, %owner, error = %e, "bootstrap 失败");
            }
        }
    }

    /// 把控制请求转给类的 `ioctl` 钩子
    pub fn ioctl(&mut self, to: Call, option: i32, input: &[u8]) -> Result<Vec<u8>, ConfigError> {
        let class = self
            .classes
            .get_mut(to.class)
            .ok_or_else(|| ConfigError::unknown_class("ioctl", &to.class.to_string()))?;
        let context = format!("类 '{}' 的 ioctl", class.name);
        class
            .ioctl(to.owner, option, input)
            .map_err(|e| ConfigError::hook(context, e))
    }

    /// 拆除：解除所有绑定（节点、环境、介质、仿真级），再按逆序调用各类的 `destroy`。
    #[tracing::instrument(skip(self))]
    pub fn teardown(mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        let mut bindings: Vec<(ClassId, Owner)> = Vec::new();
        for node in &self.nodes {
            let arch = &self.node_archs[node.arch.0];
            bindings.extend(arch.classes.iter().map(|c| (*c, Owner::Node(node.id))));
        }
        for e in &self.environments {
            bindings.extend(e.classes.iter().map(|c| (*c, Owner::Environment(e.id))));
        }
        for m in &self.mediums {
            bindings.extend(m.classes.iter().map(|c| (*c, Owner::Medium(m.id))));
        }
        bindings.extend(self.monitors.iter().map(|c| (*c, Owner::Simulation)));

        for (class, owner) in bindings {
            let Some(c) = self.classes.get_mut(class) else {
                continue;
            };
            match c.unbind(owner) {
                Ok(()) => report.unbound += 1,
                Err(e) => record(&mut report, c, owner, &e),
            }
        }

        for c in self.classes.iter_mut().rev() {
            match c.destroy() {
                Ok(()) => report.classes_destroyed += 1,
                Err(e) => {
                    warn!(class = %c.name, error = %e, "destroy 失败");
                    report.failures.push(format!("{}: {e}", c.name));
                }
            }
        }
        info!(unbound = report.unbound, destroyed = report.classes_destroyed, "仿真已拆除");
        report
    }

    /// 可序列化的结构摘要
    pub fn summary(&self) -> SimulationSummary<'_> {
        SimulationSummary {
            duration_ns: self.duration.0,
            area: self.area,
            global_map: self.global_map,
            classes: self
                .classes
                .iter()
                .map(|c| ClassSummary {
                    id: c.id,
                    name: &c.name,
                    model: &c.model,
                    capability: c.model.kind.capability(),
                    backend: c.implementation.backend(),
                    hooks: c.hooks,
                    instances: c.instances().len(),
                })
                .collect(),
            mediums: &self.mediums,
            environments: &self.environments,
            node_archs: &self.node_archs,
            group_archs: &self.group_archs,
            nodes: &self.nodes,
            groups: &self.groups,
            monitors: &self.monitors,
            bind_failures: &self.bind_failures,
        }
    }
}

fn record(report: &mut TeardownReport, class: &Class, owner: Owner, e: &HookError) {
    warn!(class = %class.name, %owner, error = %e, "unbind 失败");
    report.failures.push(format!("{}@{owner}: {e}", class.name));
}

impl World for Simulation {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Serialize)]
pub struct ClassSummary<'a> {
    pub id: ClassId,
    pub name: &'a str,
    pub model: &'a Model,
    pub capability: Capability,
    pub backend: Option<Backend>,
    pub hooks: HookSet,
    pub instances: usize,
}

#[derive(Debug, Serialize)]
pub struct SimulationSummary<'a> {
    pub duration_ns: u64,
    pub area: Option<Area>,
    pub global_map: Option<ClassId>,
    pub classes: Vec<ClassSummary<'a>>,
    pub mediums: &'a [Medium],
    pub environments: &'a [Environment],
    pub node_archs: &'a [NodeArchitecture],
    pub group_archs: &'a [GroupArchitecture],
    pub nodes: &'a [Node],
    pub groups: &'a [Group],
    pub monitors: &'a [ClassId],
    pub bind_failures: &'a [BindFailure],
}
