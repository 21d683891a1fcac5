//! 仿真装配器
//!
//! 严格按阶段顺序把配置文档构建成对象图：
//!
//! `CountNodes → LoadClasses → ParseSimulationBegin → BindMediums → BindEnvironments
//!  → BuildNodeArchitectures → BuildGroupArchitectures → CountGroups
//!  → AssignNodeArchitectures → CreateGroups → BindNodes → Assembled | Failed`
//!
//! 任一阶段出错即进入 `Failed`，整个配置作废。

use super::node::{Group, Node};
use super::simulation::Simulation;
use crate::arch::{GroupArchitecture, NodeArchitecture, NodeType, build_group_arch, build_node_arch};
use crate::binder::{BindFailure, Environment, Medium, bind_environment, bind_medium};
use crate::class::{Area, ClassTable, EntityCounts, Loaders, ModelType, SearchPaths, register_classes};
use crate::config::{Document, Element, is_class_tag};
use crate::error::ConfigError;
use crate::id::{ClassId, EnvironmentId, GroupArchId, GroupId, MediumId, NodeArchId, NodeId, Owner};
use crate::param::{DefaultParamStore, ParamList, Scope};
use crate::sim::{SimTime, TimeSpec};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, info, warn};

/// 装配阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Phase {
    CountNodes,
    LoadClasses,
    ParseSimulationBegin,
    BindMediums,
    BindEnvironments,
    BuildNodeArchitectures,
    BuildGroupArchitectures,
    CountGroups,
    AssignNodeArchitectures,
    CreateGroups,
    BindNodes,
    Assembled,
    Failed,
}

impl Phase {
    /// 成功完成本阶段后进入的阶段
    pub fn next(self) -> Phase {
        match self {
            Phase::CountNodes => Phase::LoadClasses,
            Phase::LoadClasses => Phase::ParseSimulationBegin,
            Phase::ParseSimulationBegin => Phase::BindMediums,
            Phase::BindMediums => Phase::BindEnvironments,
            Phase::BindEnvironments => Phase::BuildNodeArchitectures,
            Phase::BuildNodeArchitectures => Phase::BuildGroupArchitectures,
            Phase::BuildGroupArchitectures => Phase::CountGroups,
            Phase::CountGroups => Phase::AssignNodeArchitectures,
            Phase::AssignNodeArchitectures => Phase::CreateGroups,
            Phase::CreateGroups => Phase::BindNodes,
            Phase::BindNodes => Phase::Assembled,
            Phase::Assembled => Phase::Assembled,
            Phase::Failed => Phase::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Assembled | Phase::Failed)
    }
}

/// 装配器：持有配置阶段的全部中间状态，装配完成后交出 `Simulation`。
pub struct Assembler<'a> {
    doc: &'a Document,
    loaders: &'a Loaders,
    paths: SearchPaths,
    rng: StdRng,
    phase: Phase,
    completed: Vec<Phase>,
    store: DefaultParamStore,

    sim_el: Option<&'a Element>,
    counts: EntityCounts,
    node_count: usize,
    classes: ClassTable,
    duration: SimTime,
    global_map: Option<ClassId>,
    area: Option<Area>,
    monitors: Vec<ClassId>,
    mediums: Vec<Medium>,
    environments: Vec<Environment>,
    node_archs: Vec<NodeArchitecture>,
    default_arch: Option<NodeArchId>,
    group_archs: Vec<GroupArchitecture>,
    /// 每个分组架构要实例化的组数
    group_plan: Vec<usize>,
    nodes: Vec<Node>,
    groups: Vec<Group>,
    node_params: HashMap<(NodeId, ClassId), ParamList>,
    bind_failures: Vec<BindFailure>,
}

impl<'a> Assembler<'a> {
    pub fn new(doc: &'a Document, loaders: &'a Loaders, paths: SearchPaths, seed: u64) -> Self {
        Assembler {
            doc,
            loaders,
            paths,
            rng: StdRng::seed_from_u64(seed),
            phase: Phase::CountNodes,
            completed: Vec::new(),
            store: DefaultParamStore::new(),
            sim_el: None,
            counts: EntityCounts::default(),
            node_count: 0,
            classes: ClassTable::default(),
            duration: SimTime::ZERO,
            global_map: None,
            area: None,
            monitors: Vec::new(),
            mediums: Vec::new(),
            environments: Vec::new(),
            node_archs: Vec::new(),
            default_arch: None,
            group_archs: Vec::new(),
            group_plan: Vec::new(),
            nodes: Vec::new(),
            groups: Vec::new(),
            node_params: HashMap::new(),
            bind_failures: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 依次执行所有阶段
    #[tracing::instrument(skip(self))]
    pub fn run(mut self) -> Result<Simulation, ConfigError> {
        info!("▶️  开始装配仿真");
        while !self.phase.is_terminal() {
            let phase = self.phase;
            debug!(?phase, "进入阶段");
            if let Err(e) = self.step(phase) {
                error!(?phase, error = %e, "装配失败");
                self.phase = Phase::Failed;
                return Err(e);
            }
            self.completed.push(phase);
            self.phase = phase.next();
        }
        info!(
            classes = self.classes.len(),
            mediums = self.mediums.len(),
            environments = self.environments.len(),
            nodes = self.nodes.len(),
            groups = self.groups.len(),
            defaults = self.store.len(),
            "✅ 仿真装配完成"
        );
        Ok(Simulation {
            classes: self.classes,
            mediums: self.mediums,
            environments: self.environments,
            node_archs: self.node_archs,
            group_archs: self.group_archs,
            nodes: self.nodes,
            groups: self.groups,
            duration: self.duration,
            global_map: self.global_map,
            area: self.area,
            monitors: self.monitors,
            bind_failures: self.bind_failures,
            phases: self.completed,
        })
    }

    fn step(&mut self, phase: Phase) -> Result<(), ConfigError> {
        match phase {
            Phase::CountNodes => self.count_nodes(),
            Phase::LoadClasses => self.load_classes(),
            Phase::ParseSimulationBegin => self.parse_simulation_begin(),
            Phase::BindMediums => self.bind_mediums(),
            Phase::BindEnvironments => self.bind_environments(),
            Phase::BuildNodeArchitectures => self.build_node_archs(),
            Phase::BuildGroupArchitectures => self.build_group_archs(),
            Phase::CountGroups => self.count_groups(),
            Phase::AssignNodeArchitectures => self.assign_node_archs(),
            Phase::CreateGroups => self.create_groups(),
            Phase::BindNodes => self.bind_nodes(),
            Phase::Assembled | Phase::Failed => Ok(()),
        }
    }

    fn simulation_el(&self) -> Result<&'a Element, ConfigError> {
        self.sim_el
            .ok_or_else(|| ConfigError::SchemaValidation("缺少 <simulation>".to_string()))
    }

    fn count_nodes(&mut self) -> Result<(), ConfigError> {
        let sim_el = self
            .doc
            .section("simulation")
            .ok_or_else(|| ConfigError::SchemaValidation("缺少 <simulation>".to_string()))?;
        self.sim_el = Some(sim_el);
        let raw = sim_el.required_attr("nodes", "simulation")?;
        self.node_count = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid("simulation", "nodes", raw))?;
        self.counts = EntityCounts {
            mediums: self.doc.sections("medium").count(),
            environments: self.doc.sections("environment").count(),
            node_archs: self.doc.sections("node_architecture").count(),
        };
        info!(nodes = self.node_count, counts = ?self.counts, "计数完成");
        Ok(())
    }

    fn load_classes(&mut self) -> Result<(), ConfigError> {
        let declarations: Vec<&Element> = self
            .doc
            .root
            .children
            .iter()
            .filter(|c| is_class_tag(&c.tag))
            .collect();
        nonzero("类", declarations.len())?;
        self.classes = register_classes(
            &declarations,
            self.counts,
            self.loaders,
            &self.paths,
            &mut self.store,
        )?;
        Ok(())
    }

    fn parse_simulation_begin(&mut self) -> Result<(), ConfigError> {
        let sim_el = self.simulation_el()?;

        // 监视器
        for m in sim_el.children_named("monitor") {
            let name = m.required_attr("name", "simulation 的 monitor")?;
            let class_id = self.classes.resolve(name, "simulation 的 monitor")?;
            let inline = m.inline_params("simulation 的 monitor")?;
            let params = self.store.resolve(&Scope::class(class_id), &inline);
            let class = self.classes.class_mut(class_id);
            if let Err(e) = class.bind(Owner::Simulation, &params) {
                warn!(class = name, error = %e, "仿真级监视器 bind 失败，继续");
                self.bind_failures.push(BindFailure {
                    class: class_id,
                    owner: Owner::Simulation,
                    reason: e.to_string(),
                });
            }
            self.monitors.push(class_id);
        }

        // 全局地图
        self.global_map = match sim_el.child("global_map") {
            Some(g) => {
                let name = g.required_attr("name", "simulation 的 global_map")?;
                let id = self.classes.resolve(name, "simulation 的 global_map")?;
                if self.classes.get(id).map(|c| c.declared) != Some(ModelType::GlobalMap) {
                    return Err(ConfigError::invalid("simulation 的 global_map", "name", name));
                }
                Some(id)
            }
            None => self.classes.global_maps().next().map(|c| c.id),
        };
        self.area = self
            .global_map
            .and_then(|id| self.classes.get(id))
            .and_then(|c| c.area);

        // 时长
        let raw = sim_el.required_attr("duration", "simulation")?;
        self.duration = match TimeSpec::parse(raw) {
            Some(TimeSpec::Fixed(t)) => t,
            _ => return Err(ConfigError::invalid("simulation", "duration", raw)),
        };
        info!(
            duration = ?self.duration,
            global_map = ?self.global_map,
            area = ?self.area,
            monitors = self.monitors.len(),
            "仿真参数已解析"
        );
        Ok(())
    }

    fn bind_mediums(&mut self) -> Result<(), ConfigError> {
        let doc = self.doc;
        let els: Vec<&Element> = doc.sections("medium").collect();
        nonzero("介质", els.len())?;
        self.mediums.reserve_exact(els.len());
        for (i, el) in els.into_iter().enumerate() {
            let (medium, failures) =
                bind_medium(MediumId(i), el, self.global_map, &mut self.classes, &mut self.store)?;
            self.mediums.push(medium);
            self.bind_failures.extend(failures);
        }
        Ok(())
    }

    fn bind_environments(&mut self) -> Result<(), ConfigError> {
        let doc = self.doc;
        let els: Vec<&Element> = doc.sections("environment").collect();
        nonzero("环境", els.len())?;
        self.environments.reserve_exact(els.len());
        for (i, el) in els.into_iter().enumerate() {
            let (environment, failures) = bind_environment(
                EnvironmentId(i),
                el,
                self.global_map,
                &mut self.classes,
                &mut self.store,
            )?;
            self.environments.push(environment);
            self.bind_failures.extend(failures);
        }
        Ok(())
    }

    fn build_node_archs(&mut self) -> Result<(), ConfigError> {
        let doc = self.doc;
        let els: Vec<&Element> = doc.sections("node_architecture").collect();
        nonzero("节点架构", els.len())?;
        self.node_archs.reserve_exact(els.len());
        for (i, el) in els.into_iter().enumerate() {
            let arch = build_node_arch(NodeArchId(i), el, &mut self.classes, &mut self.store)?;
            if arch.is_default {
                match self.default_arch {
                    None => self.default_arch = Some(arch.id),
                    Some(first) => warn!(arch = %arch.name, kept = %first, "多个默认节点架构，保留第一个"),
                }
            }
            self.node_archs.push(arch);
        }
        Ok(())
    }

    fn build_group_archs(&mut self) -> Result<(), ConfigError> {
        let doc = self.doc;
        for (i, el) in doc.sections("group_architecture").enumerate() {
            let ga = build_group_arch(GroupArchId(i), el, &self.node_archs)?;
            self.group_archs.push(ga);
        }
        Ok(())
    }

    /// 组数：`simulation` 上的 `groups` 作用于每个分组架构，否则取各自的 `count`。
    fn count_groups(&mut self) -> Result<(), ConfigError> {
        let sim_el = self.simulation_el()?;
        let explicit: Option<usize> = sim_el.parse_attr("groups", "simulation")?;
        self.group_plan = self
            .group_archs
            .iter()
            .map(|ga| explicit.unwrap_or(ga.count))
            .collect();
        let total = self.group_plan.iter().fold(0usize, |acc, &n| acc.saturating_add(n));
        info!(groups = total, explicit = ?explicit, "组数已确定");
        Ok(())
    }

    fn assign_node_archs(&mut self) -> Result<(), ConfigError> {
        let sim_el = self.simulation_el()?;
        let mut declared: HashMap<usize, &Element> = HashMap::new();
        for el in sim_el.children_named("node") {
            let raw = el.required_attr("id", "simulation 的 node")?;
            let id: usize = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("simulation 的 node", "id", raw))?;
            if id >= self.node_count {
                return Err(ConfigError::invalid("simulation 的 node", "id", raw));
            }
            if declared.insert(id, el).is_some() {
                return Err(ConfigError::DocumentParse(format!("节点 {id} 重复声明")));
            }
        }

        self.nodes
            .try_reserve_exact(self.node_count)
            .map_err(|_| ConfigError::AllocationFailure(format!("{} 个节点", self.node_count)))?;
        for i in 0..self.node_count {
            let id = NodeId(i);
            let el = declared.get(&i).copied();
            let context = format!("节点 {i}");

            let arch_id = match el.and_then(|e| e.attr("architecture")) {
                Some(name) => self
                    .node_archs
                    .iter()
                    .find(|a| a.name == name)
                    .map(|a| a.id)
                    .ok_or_else(|| ConfigError::invalid(&context, "architecture", name))?,
                None => self
                    .default_arch
                    .unwrap_or(NodeArchId(i % self.node_archs.len())),
            };
            let arch = &self.node_archs[arch_id.0];

            let birth = match el.and_then(|e| e.attr("birth")) {
                Some(raw) => TimeSpec::parse(raw)
                    .ok_or_else(|| ConfigError::invalid(&context, "birth", raw))?
                    .sample(&mut self.rng, self.duration),
                None => arch
                    .birth
                    .map(|b| b.sample(&mut self.rng, self.duration))
                    .unwrap_or(SimTime::ZERO),
            };

            let node_type = match el.map(|e| (e.attr("family"), e.attr("type"))) {
                Some((Some(family), Some(kind))) => NodeType::new(family, kind),
                Some((Some(_), None)) => return Err(ConfigError::missing(&context, "type")),
                Some((None, Some(_))) => return Err(ConfigError::missing(&context, "family")),
                _ => arch.node_types.first().cloned().unwrap_or_else(NodeType::fallback),
            };

            if let Some(el) = el {
                for c in el.children_named("class") {
                    let name = c.required_attr("name", &context)?;
                    let class = self.classes.resolve(name, &context)?;
                    if !arch.classes.contains(&class) {
                        warn!(node = i, class = name, arch = %arch.name, "节点参数指向架构之外的类");
                    }
                    self.node_params.insert((id, class), c.inline_params(&context)?);
                }
            }

            debug!(node = i, arch = %arch.name, birth = ?birth, "节点架构已分配");
            self.nodes.push(Node {
                id,
                arch: arch_id,
                birth,
                node_type,
                slots: vec![None; arch.classes.len()],
                group: None,
                alive: false,
            });
        }
        Ok(())
    }

    fn create_groups(&mut self) -> Result<(), ConfigError> {
        // 各节点架构的节点池，按节点 id 顺序
        let mut pools: BTreeMap<NodeArchId, Vec<NodeId>> = BTreeMap::new();
        for node in &self.nodes {
            pools.entry(node.arch).or_default().push(node.id);
        }

        // 领导者与成员的需求按节点架构合计；溢出时饱和，必然超出节点池
        let mut demand: BTreeMap<NodeArchId, usize> = BTreeMap::new();
        for (ga, &n) in self.group_archs.iter().zip(&self.group_plan) {
            let leaders = demand.entry(ga.leader).or_default();
            *leaders = leaders.saturating_add(n);
            for m in &ga.members {
                let members = demand.entry(m.arch).or_default();
                *members = members.saturating_add(n.saturating_mul(m.count));
            }
        }
        for (&arch, &needed) in &demand {
            let available = pools.get(&arch).map_or(0, Vec::len);
            if needed > available {
                return Err(ConfigError::SizeMismatch {
                    context: format!("分组所需的节点架构 '{}' 节点池", self.node_archs[arch.0].name),
                    needed,
                    available,
                });
            }
        }

        // 每组至少占用一个领导者，组数不超过节点数
        let total: usize = self.group_plan.iter().sum();
        self.groups
            .try_reserve_exact(total)
            .map_err(|_| ConfigError::AllocationFailure(format!("{total} 个分组")))?;

        let mut cursors: HashMap<NodeArchId, usize> = HashMap::new();
        let mut take = |arch: NodeArchId, n: usize| -> Vec<NodeId> {
            let cursor = cursors.entry(arch).or_default();
            let start = *cursor;
            *cursor += n;
            pools.get(&arch).map(|p| p[start..start + n].to_vec()).unwrap_or_default()
        };

        for (ga, &n) in self.group_archs.iter().zip(&self.group_plan) {
            for _ in 0..n {
                let id = GroupId(self.groups.len());
                let leader = take(ga.leader, 1)[0];
                let mut members = Vec::with_capacity(ga.group_size() - 1);
                for m in &ga.members {
                    members.extend(take(m.arch, m.count));
                }
                for node in std::iter::once(leader).chain(members.iter().copied()) {
                    self.nodes[node.0].group = Some(id);
                }
                debug!(group = %id, group_arch = %ga.name, leader = %leader, members = members.len(), "分组已创建");
                self.groups.push(Group {
                    id,
                    arch: ga.id,
                    leader,
                    members,
                });
            }
        }
        info!(groups = self.groups.len(), "分组创建完成");
        Ok(())
    }

    fn bind_nodes(&mut self) -> Result<(), ConfigError> {
        let empty = ParamList::new();
        for node in &mut self.nodes {
            let arch = &self.node_archs[node.arch.0];
            for (position, &class_id) in arch.classes.iter().enumerate() {
                let scope = Scope::class(class_id).arch(arch.id).node(node.id);
                let explicit = self.node_params.get(&(node.id, class_id)).unwrap_or(&empty);
                let params = self.store.resolve_and_record(&scope, explicit, scope);
                let class = self.classes.class_mut(class_id);
                let object = class.bind(Owner::Node(node.id), &params).map_err(|e| {
                    error!(node = %node.id, class = %class.name, error = %e, "节点 bind 失败");
                    ConfigError::hook(format!("节点 {} 的类 '{}'", node.id, class.name), e)
                })?;
                node.slots[position] = object;
            }
        }
        info!(nodes = self.nodes.len(), "节点绑定完成");
        Ok(())
    }
}

fn nonzero(what: &str, n: usize) -> Result<(), ConfigError> {
    if n == 0 {
        return Err(ConfigError::SizeMismatch {
            context: format!("声明的{what}"),
            needed: 1,
            available: 0,
        });
    }
    Ok(())
}

/// 装配一个已校验的文档
pub fn assemble(
    doc: &Document,
    loaders: &Loaders,
    paths: SearchPaths,
    seed: u64,
) -> Result<Simulation, ConfigError> {
    Assembler::new(doc, loaders, paths, seed).run()
}
