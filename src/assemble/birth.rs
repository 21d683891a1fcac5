//! 出生事件
//!
//! 装配结果交给调度器后的首批事件：零时刻引导介质与环境上的类，
//! 节点出生时引导该节点上绑定的所有类。

use super::simulation::Simulation;
use crate::id::NodeId;
use crate::sim::{Event, Simulator, World};
use tracing::{debug, error};

/// 事件：引导介质、环境和仿真级监视器上的类。
#[derive(Debug)]
pub struct BootstrapEntities;

impl Event for BootstrapEntities {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Some(s) = world.as_any_mut().downcast_mut::<Simulation>() else {
            error!("世界不是 Simulation，忽略引导事件");
            return;
        };
        debug!(now = ?sim.now(), "引导介质与环境");
        s.bootstrap_entities();
    }
}

/// 事件：节点出生
#[derive(Debug)]
pub struct NodeBirth {
    pub node: NodeId,
}

impl Event for NodeBirth {
    #[tracing::instrument(skip(self, sim, world), fields(node = %self.node))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Some(s) = world.as_any_mut().downcast_mut::<Simulation>() else {
            error!("世界不是 Simulation，忽略出生事件");
            return;
        };
        s.on_birth(self.node, sim.now());
    }
}
