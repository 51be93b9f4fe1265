//! 节点类型
//!
//! 三种角色共享一个 `NetworkNode` 基座（接口、路由表、ARP 表、名字）：
//! - `Host`：挂一个应用，发起并终结流量，不转发；
//! - `Router`：没有应用，逐跳转发，负责 TTL；
//! - `Server`：与 Host 类似，但接收时对整条流水线做级联解封装。
//!
//! 发送：选出口网卡 → 解析链路地址 → 成帧 → 交给网卡；
//! 接收：按链路地址过滤 → 剥链路层 → 剥网络层（检查 TTL）→ 本地交付或转发。

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::addr::NetworkAddress;
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use crate::proto::link::HEADER_LEN as LINK_HEADER_LEN;
use crate::proto::{Codec, LayerKind, LinkCodec, NetworkCodec, NetworkHeader};

use super::app::App;
use super::arp::ArpTable;
use super::id::{AdapterId, NodeId};
use super::network::Network;
use super::routing::{RoutingInfo, RoutingTable};
use super::stats::DropReason;

/// 节点角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Host,
    Router,
    Server,
}

/// 节点上的一个接口：网卡 + 该网卡上配置的网络地址
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interface {
    pub adapter: AdapterId,
    pub address: NetworkAddress,
}

/// 所有角色共享的节点状态
#[derive(Debug)]
pub struct NetworkNode {
    id: NodeId,
    name: String,
    interfaces: Vec<Interface>,
    routes: RoutingTable,
    arp: ArpTable,
}

impl NetworkNode {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            interfaces: Vec::new(),
            routes: RoutingTable::new(),
            arp: ArpTable::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    pub fn routes_mut(&mut self) -> &mut RoutingTable {
        &mut self.routes
    }

    pub fn arp(&self) -> &ArpTable {
        &self.arp
    }

    pub fn arp_mut(&mut self) -> &mut ArpTable {
        &mut self.arp
    }

    /// 挂上一个接口，并在没有同键表项时装上直连路由。
    pub fn add_interface(&mut self, adapter: AdapterId, address: NetworkAddress) -> Result<()> {
        if self.owns(adapter) {
            return Err(Error::invalid(format!(
                "{}: adapter #{} is already attached",
                self.name, adapter.0
            )));
        }
        self.interfaces.push(Interface { adapter, address });
        let subnet = address.network();
        if !self.routes.contains(&subnet) {
            self.routes.add(subnet, RoutingInfo::direct(adapter))?;
            trace!(node = %self.name, %subnet, "装上直连路由");
        }
        Ok(())
    }

    pub fn owns(&self, adapter: AdapterId) -> bool {
        self.interfaces.iter().any(|i| i.adapter == adapter)
    }

    /// 地址是否属于本节点的某个接口（只比较地址字节）
    pub fn is_local(&self, address: &NetworkAddress) -> bool {
        self.interfaces.iter().any(|i| i.address.same_host(address))
    }

    pub fn address_on(&self, adapter: AdapterId) -> Option<NetworkAddress> {
        self.interfaces
            .iter()
            .find(|i| i.adapter == adapter)
            .map(|i| i.address)
    }
}

/// 节点接口
pub trait Node: Send {
    fn base(&self) -> &NetworkNode;

    fn base_mut(&mut self) -> &mut NetworkNode;

    fn role(&self) -> NodeRole;

    fn id(&self) -> NodeId {
        self.base().id()
    }

    fn name(&self) -> &str {
        self.base().name()
    }

    /// 沿 `route` 发出 `data`。流水线的所有权随数据一起交给下一跳。
    fn send(
        &mut self,
        route: &RoutingInfo,
        pipeline: Pipeline,
        data: &[u8],
        net: &mut Network,
    ) -> Result<()>;

    /// 处理从 `ingress` 网卡到达的首尾相接的帧
    fn receive(
        &mut self,
        ingress: AdapterId,
        pipeline: Pipeline,
        frames: &[u8],
        net: &mut Network,
    ) -> Result<()>;
}

/// 取出出口要用的网络层：丢掉上一跳留下的链路层，
/// 出口 MTU 不同时换成一个 MTU 对应的新实例。
fn egress_network(pipeline: &mut Pipeline, mtu: usize) -> Result<NetworkCodec> {
    if pipeline.peek().map(|l| l.kind()) == Some(LayerKind::Link) {
        pipeline.pop();
    }
    let network = pipeline.pop_network()?;
    if network.mtu() == mtu {
        Ok(network)
    } else {
        trace!(from = network.mtu(), to = mtu, "按出口网卡替换网络层 MTU");
        network.with_mtu(mtu)
    }
}

/// 解析下一跳的链路地址，成帧并交给出口网卡。
///
/// 下一跳为 `0.0.0.0` 的路由会命中 ARP 表里的默认网关表项。
fn hand_off(
    base: &NetworkNode,
    net: &mut Network,
    route: &RoutingInfo,
    destination: NetworkAddress,
    mut pipeline: Pipeline,
    datagrams: &[u8],
) -> Result<()> {
    if !base.owns(route.adapter) {
        return Err(Error::invalid(format!(
            "{}: adapter #{} does not belong to this node",
            base.name(),
            route.adapter.0
        )));
    }
    let target = route.next_hop.unwrap_or(destination);
    let dst_mac = base.arp().lookup(&target)?;

    let adapter = net.adapter_mut(route.adapter)?;
    adapter.ensure_ready()?;
    let link = LinkCodec::new(adapter.mac(), dst_mac);
    adapter.collect(datagrams)?;
    debug!(
        adapter = adapter.name(),
        %target,
        dst_mac = %dst_mac,
        bytes = datagrams.len(),
        "交给网卡"
    );

    pipeline.push(link);
    net.transmit(route.adapter, pipeline, &link)
}

/// 主机/服务器发送：整条流水线封装应用数据
fn originate(
    base: &NetworkNode,
    route: &RoutingInfo,
    mut pipeline: Pipeline,
    data: &[u8],
    net: &mut Network,
) -> Result<()> {
    if data.is_empty() {
        return Err(Error::invalid("nothing to send"));
    }
    let mtu = net.adapter(route.adapter)?.mtu();
    let network = egress_network(&mut pipeline, mtu)?;
    let destination = network.destination();
    pipeline.push(network);
    let datagrams = pipeline.encapsulate(data)?;
    hand_off(base, net, route, destination, pipeline, &datagrams)
}

/// 主机节点
pub struct Host {
    base: NetworkNode,
    app: Box<dyn App>,
}

impl Host {
    pub fn new(id: NodeId, name: impl Into<String>, app: Box<dyn App>) -> Self {
        Self {
            base: NetworkNode::new(id, name),
            app,
        }
    }
}

impl Node for Host {
    fn base(&self) -> &NetworkNode {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NetworkNode {
        &mut self.base
    }

    fn role(&self) -> NodeRole {
        NodeRole::Host
    }

    #[tracing::instrument(skip(self, route, pipeline, data, net), fields(node_name = %self.base.name(), route = %route))]
    fn send(
        &mut self,
        route: &RoutingInfo,
        pipeline: Pipeline,
        data: &[u8],
        net: &mut Network,
    ) -> Result<()> {
        debug!("🖥️  Host 发送");
        originate(&self.base, route, pipeline, data, net)
    }

    #[tracing::instrument(skip(self, ingress, pipeline, frames, net), fields(node_name = %self.base.name(), ingress = ingress.0))]
    fn receive(
        &mut self,
        ingress: AdapterId,
        mut pipeline: Pipeline,
        frames: &[u8],
        net: &mut Network,
    ) -> Result<()> {
        debug!("🖥️  Host 收到帧");
        pipeline.pop_link()?;
        let datagrams = net.receive_on(ingress, frames)?;
        if datagrams.is_empty() {
            return Ok(());
        }

        let network = pipeline.pop_network()?;
        let header = NetworkHeader::parse(&datagrams)?;
        if !self.base.is_local(&header.destination) {
            debug!(destination = %header.destination, "目的地址不是本机，丢弃");
            net.note_drop(self.base.id(), DropReason::NotLocal);
            return Ok(());
        }

        let upper = network.decapsulate(&datagrams)?;
        let payload = if pipeline.is_empty() {
            upper
        } else {
            pipeline.decapsulate(&upper)?
        };
        info!(source = %header.source, bytes = payload.len(), "✅ 交付给应用");
        self.app.receive(Some(header.source), &payload);
        net.note_delivered(self.base.id(), header.source, payload.len());
        Ok(())
    }
}

/// 路由器节点
pub struct Router {
    base: NetworkNode,
}

impl Router {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            base: NetworkNode::new(id, name),
        }
    }

    /// 查路由后发送；路由未命中或下一跳没有 ARP 表项时丢包而不报错。
    fn forward(
        &mut self,
        destination: NetworkAddress,
        pipeline: Pipeline,
        data: &[u8],
        net: &mut Network,
    ) -> Result<()> {
        let route = match self.base.routes().lookup(&destination) {
            Ok(route) => route,
            Err(err) => {
                warn!(%destination, error = %err, "没有路由，丢弃");
                net.note_drop(self.base.id(), DropReason::NoRoute);
                return Ok(());
            }
        };
        debug!(%destination, route = %route, "🔀 转发");
        match self.send(&route, pipeline, data, net) {
            Err(Error::ArpMiss(target)) => {
                warn!(%target, "下一跳没有链路地址，丢弃");
                net.note_drop(self.base.id(), DropReason::NoLinkAddress);
                Ok(())
            }
            other => other,
        }
    }
}

impl Node for Router {
    fn base(&self) -> &NetworkNode {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NetworkNode {
        &mut self.base
    }

    fn role(&self) -> NodeRole {
        NodeRole::Router
    }

    /// 只用最内层的网络层封装 `data`（已是网络层载荷）。
    #[tracing::instrument(skip(self, route, pipeline, data, net), fields(node_name = %self.base.name(), route = %route))]
    fn send(
        &mut self,
        route: &RoutingInfo,
        mut pipeline: Pipeline,
        data: &[u8],
        net: &mut Network,
    ) -> Result<()> {
        if data.is_empty() {
            return Err(Error::invalid("nothing to send"));
        }
        let mtu = net.adapter(route.adapter)?.mtu();
        let network = egress_network(&mut pipeline, mtu)?;
        let datagrams = network.encapsulate(data)?;
        let destination = network.destination();
        pipeline.push(network);
        hand_off(&self.base, net, route, destination, pipeline, &datagrams)
    }

    #[tracing::instrument(skip(self, ingress, pipeline, frames, net), fields(node_name = %self.base.name(), ingress = ingress.0))]
    fn receive(
        &mut self,
        ingress: AdapterId,
        mut pipeline: Pipeline,
        frames: &[u8],
        net: &mut Network,
    ) -> Result<()> {
        debug!("🔀 Router 收到帧");
        pipeline.pop_link()?;
        let datagrams = net.receive_on(ingress, frames)?;
        if datagrams.is_empty() {
            return Ok(());
        }

        let network = pipeline.pop_network()?;
        let header = NetworkHeader::parse(&datagrams)?;
        if header.ttl == 0 {
            debug!(destination = %header.destination, "TTL 耗尽，丢弃");
            net.note_drop(self.base.id(), DropReason::TtlExpired);
            return Ok(());
        }
        if self.base.is_local(&header.destination) {
            debug!(destination = %header.destination, "发给路由器自身，没有应用，丢弃");
            net.note_drop(self.base.id(), DropReason::NoApplication);
            return Ok(());
        }

        let payload = network.decapsulate(&datagrams)?;
        let ttl = header.ttl - 1;
        trace!(old_ttl = header.ttl, new_ttl = ttl, "替换网络层（TTL - 1）");
        pipeline.push(network.with_ttl(ttl));
        self.forward(header.destination, pipeline, &payload, net)
    }
}

/// 服务器节点
pub struct Server {
    base: NetworkNode,
    app: Box<dyn App>,
}

impl Server {
    pub fn new(id: NodeId, name: impl Into<String>, app: Box<dyn App>) -> Self {
        Self {
            base: NetworkNode::new(id, name),
            app,
        }
    }
}

impl Node for Server {
    fn base(&self) -> &NetworkNode {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NetworkNode {
        &mut self.base
    }

    fn role(&self) -> NodeRole {
        NodeRole::Server
    }

    #[tracing::instrument(skip(self, route, pipeline, data, net), fields(node_name = %self.base.name(), route = %route))]
    fn send(
        &mut self,
        route: &RoutingInfo,
        pipeline: Pipeline,
        data: &[u8],
        net: &mut Network,
    ) -> Result<()> {
        debug!("🗄️  Server 发送");
        originate(&self.base, route, pipeline, data, net)
    }

    /// 过滤后保留帧头，整条流水线级联解封装。
    #[tracing::instrument(skip(self, ingress, pipeline, frames, net), fields(node_name = %self.base.name(), ingress = ingress.0))]
    fn receive(
        &mut self,
        ingress: AdapterId,
        pipeline: Pipeline,
        frames: &[u8],
        net: &mut Network,
    ) -> Result<()> {
        debug!("🗄️  Server 收到帧");
        if pipeline.peek().map(|l| l.kind()) != Some(LayerKind::Link) {
            return Err(Error::ProtocolMismatch {
                expected: LayerKind::Link,
                found: pipeline.peek().map(|l| l.kind()),
            });
        }
        let accepted = net.filter_on(ingress, frames)?;
        if accepted.is_empty() {
            return Ok(());
        }

        let first = accepted
            .get(LINK_HEADER_LEN..)
            .ok_or_else(|| Error::malformed(LayerKind::Link, "truncated frame header"))?;
        let header = NetworkHeader::parse(first)?;
        if !self.base.is_local(&header.destination) {
            debug!(destination = %header.destination, "目的地址不是本机，丢弃");
            net.note_drop(self.base.id(), DropReason::NotLocal);
            return Ok(());
        }

        let payload = pipeline.decapsulate(&accepted)?;
        info!(source = %header.source, bytes = payload.len(), "✅ 交付给应用");
        self.app.receive(Some(header.source), &payload);
        net.note_delivered(self.base.id(), header.source, payload.len());
        Ok(())
    }
}
