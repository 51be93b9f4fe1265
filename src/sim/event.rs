//! 事件 trait

use super::simulator::Simulator;
use crate::net::Network;

/// 事件：可被调度执行。使用 `self: Box<Self>` 以支持 move/所有权转移。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, net: &mut Network);
}
