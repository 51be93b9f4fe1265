//! 仿真核心模块
//!
//! 仿真时间、事件与场景时钟。

mod event;
mod simulator;
mod time;

pub use event::Event;
pub use simulator::Simulator;
pub use time::SimTime;
