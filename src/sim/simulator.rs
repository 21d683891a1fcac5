//! 仿真器
//!
//! 事件驱动仿真器：维护当前时间、结束时间与事件队列。配置完成后由装配器推入
//! 仿真时长与节点出生事件。

use super::event::Event;
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use super::world::World;
use std::collections::BinaryHeap;
use tracing::{debug, info, trace};

/// 事件驱动仿真器
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    end: Option<SimTime>,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 设置仿真结束时间
    pub fn set_end(&mut self, end: SimTime) {
        debug!(end = ?end, "设置仿真结束时间");
        self.end = Some(end);
    }

    pub fn end(&self) -> Option<SimTime> {
        self.end
    }

    /// 队列中尚未执行的事件数
    pub fn pending(&self) -> usize {
        self.q.len()
    }

    /// 调度事件在指定时间执行
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) {
        let seq = self.next_seq;
        trace!(now = ?self.now, seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(ScheduledEvent {
            at,
            seq,
            ev: Box::new(ev),
        });
    }

    /// 运行直到事件队列为空或到达 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) -> u64 {
        let mut executed = 0;
        while self.q.peek().is_some_and(|top| top.at <= until) {
            if !self.step(world) {
                break;
            }
            executed += 1;
        }
        self.now = self.now.max(until);
        executed
    }

    /// 运行到结束时间；未设置结束时间时运行到队列为空。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) -> u64 {
        info!(end = ?self.end, queue_size = self.q.len(), "▶️  开始运行仿真");
        let executed = match self.end {
            Some(end) => self.run_until(end, world),
            None => {
                let mut executed = 0;
                while self.step(world) {
                    executed += 1;
                }
                executed
            }
        };
        info!(total_events = executed, final_time = ?self.now, "✅ 仿真完成");
        executed
    }

    fn step(&mut self, world: &mut dyn World) -> bool {
        let Some(item) = self.q.pop() else {
            return false;
        };
        self.now = item.at;
        item.ev.execute(self, world);
        world.on_tick(self);
        true
    }
}
