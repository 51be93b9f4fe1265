//! 聊天演示拓扑
//!
//! 拓扑结构：alice <-> r1 <-> r2 <-> server
//!
//! | 网段            | 两端                               |
//! |-----------------|------------------------------------|
//! | `10.0.1.0/24`   | alice `.2`，r1 `.1`                |
//! | `10.0.12.0/30`  | r1 `.1`，r2 `.2`（核心链路，MTU 可调）|
//! | `10.0.2.0/24`   | r2 `.1`，server `.10`              |
//!
//! server 的默认路由走 `0.0.0.0` 下一跳，由 ARP 表的默认网关表项解析。

use crate::addr::{NetworkAddress, Port};
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::proto::network::DEFAULT_MTU;
use crate::proto::{AppCodec, NetworkCodec, TransportCodec};

use super::build::{Built, build};
use super::spec::{
    AdapterSpec, ArpSpec, LinkSpec, NodeSpec, RouteSpec, SCHEMA_VERSION, TopologyMeta,
    TopologySpec,
};
use crate::net::NodeRole;

pub const ALICE: &str = "alice";
pub const SERVER: &str = "server";
pub const ALICE_ADDR: NetworkAddress = NetworkAddress::host([10, 0, 1, 2]);
pub const SERVER_ADDR: NetworkAddress = NetworkAddress::host([10, 0, 2, 10]);
/// 服务器监听的端口
pub const CHAT_PORT: Port = Port::new(7000);
/// 客户端使用的源端口
pub const CLIENT_PORT: Port = Port::new(49152);

/// 演示拓扑配置选项
#[derive(Debug, Clone)]
pub struct ChatOpts {
    /// 接入链路（alice-r1、r2-server）的 MTU
    pub access_mtu: usize,
    /// 核心链路（r1-r2）的 MTU
    pub core_mtu: usize,
    pub ttl: u8,
    pub mss: usize,
}

impl Default for ChatOpts {
    fn default() -> Self {
        Self {
            access_mtu: DEFAULT_MTU,
            core_mtu: 576,
            ttl: 64,
            mss: 512,
        }
    }
}

fn adapter(name: &str, mac: &str, address: &str, mtu: usize) -> AdapterSpec {
    AdapterSpec {
        name: name.to_string(),
        mac: mac.to_string(),
        address: address.to_string(),
        mtu: Some(mtu),
        promiscuous: false,
        up: true,
    }
}

fn via(subnet: Option<&str>, adapter: &str, next_hop: &str) -> RouteSpec {
    RouteSpec {
        subnet: subnet.map(str::to_string),
        default: subnet.is_none(),
        adapter: adapter.to_string(),
        next_hop: Some(next_hop.to_string()),
    }
}

fn arp(address: &str, mac: &str) -> ArpSpec {
    ArpSpec {
        address: Some(address.to_string()),
        gateway: false,
        mac: mac.to_string(),
    }
}

fn link(a: &str, b: &str) -> LinkSpec {
    LinkSpec {
        a: a.to_string(),
        b: b.to_string(),
    }
}

/// 演示拓扑的描述
pub fn chat_topology_spec(opts: &ChatOpts) -> TopologySpec {
    const ALICE_MAC: &str = "02:00:00:00:00:01";
    const SERVER_MAC: &str = "02:00:00:00:00:02";
    const R1_WEST: &str = "02:00:00:00:01:01";
    const R1_EAST: &str = "02:00:00:00:01:02";
    const R2_WEST: &str = "02:00:00:00:02:01";
    const R2_EAST: &str = "02:00:00:00:02:02";

    let alice = NodeSpec {
        name: ALICE.to_string(),
        role: NodeRole::Host,
        adapters: vec![adapter("alice-eth0", ALICE_MAC, "10.0.1.2/24", opts.access_mtu)],
        routes: vec![via(None, "alice-eth0", "10.0.1.1")],
        arp: vec![arp("10.0.1.1", R1_WEST)],
    };
    let r1 = NodeSpec {
        name: "r1".to_string(),
        role: NodeRole::Router,
        adapters: vec![
            adapter("r1-eth0", R1_WEST, "10.0.1.1/24", opts.access_mtu),
            adapter("r1-eth1", R1_EAST, "10.0.12.1/30", opts.core_mtu),
        ],
        routes: vec![via(Some("10.0.2.0/24"), "r1-eth1", "10.0.12.2")],
        arp: vec![arp("10.0.1.2", ALICE_MAC), arp("10.0.12.2", R2_WEST)],
    };
    let r2 = NodeSpec {
        name: "r2".to_string(),
        role: NodeRole::Router,
        adapters: vec![
            adapter("r2-eth0", R2_WEST, "10.0.12.2/30", opts.core_mtu),
            adapter("r2-eth1", R2_EAST, "10.0.2.1/24", opts.access_mtu),
        ],
        routes: vec![via(None, "r2-eth0", "10.0.12.1")],
        arp: vec![arp("10.0.12.1", R1_EAST), arp("10.0.2.10", SERVER_MAC)],
    };
    let server = NodeSpec {
        name: SERVER.to_string(),
        role: NodeRole::Server,
        adapters: vec![adapter(
            "server-eth0",
            SERVER_MAC,
            "10.0.2.10/24",
            opts.access_mtu,
        )],
        routes: vec![via(None, "server-eth0", "0.0.0.0")],
        arp: vec![ArpSpec {
            address: None,
            gateway: true,
            mac: R2_EAST.to_string(),
        }],
    };

    TopologySpec {
        schema_version: SCHEMA_VERSION,
        meta: Some(TopologyMeta {
            name: Some("chat".to_string()),
            description: Some("alice <-> r1 <-> r2 <-> server".to_string()),
        }),
        nodes: vec![alice, r1, r2, server],
        links: vec![
            link("alice-eth0", "r1-eth0"),
            link("r1-eth1", "r2-eth0"),
            link("r2-eth1", "server-eth0"),
        ],
    }
}

/// 构建演示拓扑
pub fn chat_topology(opts: &ChatOpts) -> Result<Built> {
    build(&chat_topology_spec(opts))
}

/// 一条聊天消息用的流水线：应用层 → 传输层 → 网络层（链路层由发送节点逐跳加上）。
pub fn chat_pipeline(
    user: &str,
    source: NetworkAddress,
    destination: NetworkAddress,
    source_port: Port,
    destination_port: Port,
    opts: &ChatOpts,
) -> Result<Pipeline> {
    Pipeline::builder()
        .add_layer(AppCodec::new(user)?)
        .add_layer(TransportCodec::new(source_port, destination_port, opts.mss)?)
        .add_layer(NetworkCodec::new(source, destination).with_ttl(opts.ttl))
        .build()
}
