//! 世界 trait
//!
//! 定义事件执行时可见的仿真世界接口。

use super::simulator::Simulator;
use std::any::Any;

/// 仿真世界：由装配结果实现，事件通过向下转型访问。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}
