//! 场景时钟
//!
//! 按 `(时间, 序号)` 顺序执行事件；同一时刻的事件按调度顺序执行。
//! 时钟是显式传入的值，不是进程级单例。

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::{debug, info, trace};

use super::event::Event;
use super::time::SimTime;
use crate::net::Network;

struct Scheduled {
    at: SimTime,
    seq: u64,
    ev: Box<dyn Event>,
}

// BinaryHeap 是 max-heap；我们需要最小时间优先，因此反向比较。
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq)).reverse()
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<Scheduled>,
}

impl Simulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.q.len()
    }

    /// 调度事件在 `at` 执行；早于当前时间的事件按当前时间执行。
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = %at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(Scheduled {
            at: at.max(self.now),
            seq,
            ev: Box::new(ev),
        });
        trace!(seq, queue_size = self.q.len(), "事件已加入队列");
    }

    fn step(&mut self, item: Scheduled, net: &mut Network) {
        self.now = item.at;
        net.set_now(self.now);
        debug!(now = %self.now, seq = item.seq, remaining_queue = self.q.len(), "执行事件");
        item.ev.execute(self, net);
    }

    /// 运行直到事件队列为空或下一个事件晚于 `until`。
    pub fn run_until(&mut self, until: SimTime, net: &mut Network) {
        while self.q.peek().is_some_and(|top| top.at <= until) {
            if let Some(item) = self.q.pop() {
                self.step(item, net);
            }
        }
        self.now = self.now.max(until);
        net.set_now(self.now);
    }

    /// 运行所有事件直到队列为空。
    #[tracing::instrument(skip(self, net))]
    pub fn run(&mut self, net: &mut Network) {
        info!("▶️  开始运行仿真");
        let mut event_count = 0u64;
        while let Some(item) = self.q.pop() {
            event_count += 1;
            self.step(item, net);
        }
        info!(total_events = event_count, final_time = %self.now, "✅ 仿真完成");
    }
}
