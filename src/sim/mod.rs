//! 仿真核心模块
//!
//! 此模块包含仿真时间与时间参数解析，以及配置完成后接收结果的事件调度器。

// 子模块声明
mod event;
mod scheduled_event;
mod simulator;
mod time;
mod world;

// 重新导出公共接口
pub use event::Event;
pub use scheduled_event::ScheduledEvent;
pub use simulator::Simulator;
pub use time::{SimTime, TimeSpec};
pub use world::World;
