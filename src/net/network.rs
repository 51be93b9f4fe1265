//! 网络拓扑与传输引擎
//!
//! `Network` 以下标为键持有全部节点和网卡。一次 `send` 会同步走完整段旅程：
//! 网卡把帧交给对端时只是把“到达”排进 `in_flight` 队列，
//! `send` 返回前把队列处理完，因此不会出现重入借用，
//! 路由环路也不会造成无界递归（靠 TTL 终止）。

use std::collections::VecDeque;

use tracing::{debug, info, trace, warn};

use super::adapter::Adapter;
use super::app::App;
use super::arp::ArpTable;
use super::id::{AdapterId, NodeId};
use super::node::{Host, Node, NodeRole, Router, Server};
use super::routing::{RoutingInfo, RoutingTable};
use super::stats::{DropReason, Stats};
use crate::addr::{LinkAddress, NetworkAddress};
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use crate::proto::link::{split_frames, HEADER_LEN as LINK_HEADER_LEN};
use crate::proto::{LayerKind, LinkCodec, NetworkHeader};
use crate::sim::SimTime;
use crate::trace::{TraceEventKind, TraceLog};

/// 已发出、尚未被对端处理的帧
struct Transit {
    to: NodeId,
    ingress: AdapterId,
    pipeline: Pipeline,
    frames: Vec<u8>,
}

/// 网络拓扑
#[derive(Default)]
pub struct Network {
    nodes: Vec<Option<Box<dyn Node>>>,
    adapters: Vec<Adapter>,
    in_flight: VecDeque<Transit>,
    now: SimTime,
    pub stats: Stats,
    /// 设置后记录帧级事件
    pub trace: Option<TraceLog>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_node(&mut self, make: impl FnOnce(NodeId) -> Box<dyn Node>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let node = make(id);
        debug!(node_id = id.0, name = node.name(), role = ?node.role(), "添加节点");
        self.nodes.push(Some(node));
        id
    }

    /// 添加主机节点
    pub fn add_host(&mut self, name: impl Into<String>, app: Box<dyn App>) -> NodeId {
        let name = name.into();
        self.add_node(|id| Box::new(Host::new(id, name, app)))
    }

    /// 添加路由器节点
    pub fn add_router(&mut self, name: impl Into<String>) -> NodeId {
        let name = name.into();
        self.add_node(|id| Box::new(Router::new(id, name)))
    }

    /// 添加服务器节点
    pub fn add_server(&mut self, name: impl Into<String>, app: Box<dyn App>) -> NodeId {
        let name = name.into();
        self.add_node(|id| Box::new(Server::new(id, name, app)))
    }

    /// 给节点装一块网卡，并把 `address` 配到这块网卡上（同时装上直连路由）。
    pub fn add_adapter(
        &mut self,
        owner: NodeId,
        name: impl Into<String>,
        mac: LinkAddress,
        address: NetworkAddress,
        mtu: usize,
    ) -> Result<AdapterId> {
        let id = AdapterId(self.adapters.len());
        let adapter = Adapter::new(id, owner, name, mac, mtu)?;
        self.node_mut(owner)?.base_mut().add_interface(id, address)?;
        debug!(adapter_id = id.0, name = adapter.name(), %mac, %address, mtu, "添加网卡");
        self.adapters.push(adapter);
        Ok(id)
    }

    /// 用一条点对点链路连接两块网卡（双向）
    pub fn link(&mut self, a: AdapterId, b: AdapterId) -> Result<()> {
        if a == b {
            return Err(Error::invalid("cannot link an adapter to itself"));
        }
        for id in [a, b] {
            let adapter = self.adapter(id)?;
            if let Some(peer) = adapter.peer() {
                return Err(Error::invalid(format!(
                    "adapter {} is already linked to #{}",
                    adapter.name(),
                    peer.0
                )));
            }
        }
        self.adapter_mut(a)?.set_peer(b);
        self.adapter_mut(b)?.set_peer(a);
        debug!(a = a.0, b = b.0, "连接网卡");
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn adapters(&self) -> &[Adapter] {
        &self.adapters
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .flatten()
            .find(|n| n.name() == name)
            .map(|n| n.id())
    }

    /// 正在处理中的节点会被暂时取出，这时返回错误。
    pub fn node(&self, id: NodeId) -> Result<&dyn Node> {
        self.nodes
            .get(id.0)
            .and_then(|n| n.as_deref())
            .ok_or_else(|| Error::invalid(format!("unknown or busy node #{}", id.0)))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Box<dyn Node>> {
        self.nodes
            .get_mut(id.0)
            .and_then(|n| n.as_mut())
            .ok_or_else(|| Error::invalid(format!("unknown or busy node #{}", id.0)))
    }

    pub fn routes_mut(&mut self, id: NodeId) -> Result<&mut RoutingTable> {
        Ok(self.node_mut(id)?.base_mut().routes_mut())
    }

    pub fn arp_mut(&mut self, id: NodeId) -> Result<&mut ArpTable> {
        Ok(self.node_mut(id)?.base_mut().arp_mut())
    }

    pub fn adapter(&self, id: AdapterId) -> Result<&Adapter> {
        self.adapters
            .get(id.0)
            .ok_or_else(|| Error::invalid(format!("unknown adapter #{}", id.0)))
    }

    pub fn adapter_mut(&mut self, id: AdapterId) -> Result<&mut Adapter> {
        self.adapters
            .get_mut(id.0)
            .ok_or_else(|| Error::invalid(format!("unknown adapter #{}", id.0)))
    }

    pub fn find_adapter(&self, name: &str) -> Option<AdapterId> {
        self.adapters.iter().find(|a| a.name() == name).map(|a| a.id())
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub(crate) fn set_now(&mut self, now: SimTime) {
        self.now = now;
    }

    /// 暂时把节点取出来，避免 &mut self 与 &mut node 的重叠借用。
    fn with_node<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut dyn Node, &mut Network) -> Result<R>,
    ) -> Result<R> {
        let mut node = self
            .nodes
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or_else(|| Error::invalid(format!("unknown or busy node #{}", id.0)))?;
        trace!(node_name = node.name(), "取出节点");
        let out = f(node.as_mut(), self);
        self.nodes[id.0] = Some(node);
        out
    }

    /// 让节点 `from` 沿 `route` 发送 `payload`，并同步处理完由此引发的全部到达。
    #[tracing::instrument(skip(self, route, pipeline, payload), fields(from = from.0, route = %route))]
    pub fn send(
        &mut self,
        from: NodeId,
        route: RoutingInfo,
        pipeline: Pipeline,
        payload: &[u8],
    ) -> Result<()> {
        info!(bytes = payload.len(), "🚀 发送");
        let sent = self.with_node(from, |node, net| node.send(&route, pipeline, payload, net));
        if let Err(err) = sent {
            self.in_flight.clear();
            return Err(err);
        }
        self.pump()
    }

    /// 按流水线网络层的目的地址查 `from` 的路由表，然后发送。
    pub fn send_to(&mut self, from: NodeId, pipeline: Pipeline, payload: &[u8]) -> Result<()> {
        let destination = pipeline
            .layer(LayerKind::Network)?
            .as_network()
            .map(|n| n.destination())
            .ok_or(Error::ProtocolMismatch {
                expected: LayerKind::Network,
                found: None,
            })?;
        let route = self.node(from)?.base().routes().lookup(&destination)?;
        self.send(from, route, pipeline, payload)
    }

    /// 把帧直接交给节点 `to`（从 `ingress` 网卡进入），并处理后续到达。
    pub fn deliver(
        &mut self,
        to: NodeId,
        ingress: AdapterId,
        pipeline: Pipeline,
        frames: Vec<u8>,
    ) -> Result<()> {
        self.in_flight.push_back(Transit {
            to,
            ingress,
            pipeline,
            frames,
        });
        self.pump()
    }

    fn pump(&mut self) -> Result<()> {
        while let Some(transit) = self.in_flight.pop_front() {
            let Transit {
                to,
                ingress,
                pipeline,
                frames,
            } = transit;
            trace!(to = to.0, ingress = ingress.0, bytes = frames.len(), "📬 处理到达");
            let received =
                self.with_node(to, |node, net| node.receive(ingress, pipeline, &frames, net));
            if let Err(err) = received {
                warn!(to = to.0, error = %err, "接收失败，放弃剩余到达");
                self.in_flight.clear();
                return Err(err);
            }
        }
        Ok(())
    }

    /// 让网卡发送已缓存的数据报，把到达排给对端所在节点。
    pub(crate) fn transmit(
        &mut self,
        adapter: AdapterId,
        pipeline: Pipeline,
        link: &LinkCodec,
    ) -> Result<()> {
        let nic = self.adapter_mut(adapter)?;
        let frames = nic.transmit(link)?;
        let owner = nic.owner();
        let peer = nic
            .peer()
            .ok_or_else(|| Error::NotLinked(nic.name().to_string()))?;
        let to = self.adapter(peer)?.owner();

        let count = split_frames(&frames)?.len();
        self.stats.frames_sent += count as u64;
        let header = frames
            .get(LINK_HEADER_LEN..)
            .and_then(|d| NetworkHeader::parse(d).ok());
        self.trace_push(TraceEventKind::Transmit {
            node: owner.0,
            adapter: adapter.0,
            peer_adapter: peer.0,
            frames: count,
            bytes: frames.len(),
            ttl: header.as_ref().map(|h| h.ttl),
            src: header.as_ref().map(|h| h.source.to_string()),
            dst: header.as_ref().map(|h| h.destination.to_string()),
        });

        self.in_flight.push_back(Transit {
            to,
            ingress: peer,
            pipeline,
            frames,
        });
        Ok(())
    }

    /// 网卡接收：过滤、去帧头、取出数据报。
    pub(crate) fn receive_on(&mut self, adapter: AdapterId, frames: &[u8]) -> Result<Vec<u8>> {
        let nic = self.adapter_mut(adapter)?;
        let before = nic.counters().filtered_frames;
        nic.receive(frames)?;
        let datagrams = nic.release();
        let filtered = nic.counters().filtered_frames - before;
        let owner = nic.owner();
        self.note_filtered(owner, adapter, filtered);
        Ok(datagrams)
    }

    /// 网卡过滤：只保留被接收的帧（帧头保留）。
    pub(crate) fn filter_on(&mut self, adapter: AdapterId, frames: &[u8]) -> Result<Vec<u8>> {
        let nic = self.adapter_mut(adapter)?;
        let before = nic.counters().filtered_frames;
        let accepted = nic.filter(frames)?;
        let filtered = nic.counters().filtered_frames - before;
        let owner = nic.owner();
        self.note_filtered(owner, adapter, filtered);
        Ok(accepted)
    }

    fn note_filtered(&mut self, node: NodeId, adapter: AdapterId, frames: u64) {
        if frames == 0 {
            return;
        }
        self.stats.frames_filtered += frames;
        self.trace_push(TraceEventKind::Filtered {
            node: node.0,
            adapter: adapter.0,
            frames,
        });
    }

    pub(crate) fn note_delivered(&mut self, node: NodeId, source: NetworkAddress, bytes: usize) {
        self.stats.delivered_msgs += 1;
        self.stats.delivered_bytes += bytes as u64;
        self.trace_push(TraceEventKind::Delivered {
            node: node.0,
            src: source.to_string(),
            bytes,
        });
    }

    pub(crate) fn note_drop(&mut self, node: NodeId, reason: DropReason) {
        self.stats.count_drop(reason);
        self.trace_push(TraceEventKind::Drop {
            node: node.0,
            reason,
        });
    }

    /// 各节点的角色（按 id 排列）；正在处理中的节点不在其中。
    pub fn roles(&self) -> Vec<(NodeId, NodeRole)> {
        self.nodes
            .iter()
            .flatten()
            .map(|n| (n.id(), n.role()))
            .collect()
    }
}
