//! 装配模块
//!
//! 此模块按固定阶段顺序把配置文档构建成仿真对象图，并提供宿主入口。

// 子模块声明
mod assembler;
mod birth;
mod configurator;
mod node;
mod simulation;

// 重新导出公共接口
pub use assembler::{Assembler, Phase, assemble};
pub use birth::{BootstrapEntities, NodeBirth};
pub use configurator::Configurator;
pub use node::{Group, Node};
pub use simulation::{ClassSummary, Simulation, SimulationSummary, TeardownReport};
