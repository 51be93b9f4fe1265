//! 发送消息事件
//!
//! 在指定仿真时刻让某个节点发出一条消息。

use tracing::{info, warn};

use super::id::NodeId;
use super::network::Network;
use crate::pipeline::Pipeline;
use crate::sim::{Event, Simulator};

/// 事件：节点 `from` 按流水线网络层的目的地址发送 `payload`。
#[derive(Debug)]
pub struct SendMessage {
    pub from: NodeId,
    pub pipeline: Pipeline,
    pub payload: Vec<u8>,
}

impl Event for SendMessage {
    #[tracing::instrument(skip(self, sim, net), fields(from = self.from.0, bytes = self.payload.len()))]
    fn execute(self: Box<Self>, sim: &mut Simulator, net: &mut Network) {
        let SendMessage {
            from,
            pipeline,
            payload,
        } = *self;

        info!(now = ?sim.now(), "📨 发送消息事件执行");
        if let Err(err) = net.send_to(from, pipeline, &payload) {
            warn!(error = %err, "发送失败");
            net.stats.failed_sends += 1;
        }
    }
}
