//! 拓扑描述（JSON）
//!
//! 节点、网卡、点对点链路、静态路由和 ARP 表项全部在这里写明，
//! 由 `build` 组装成 `Network`。

use serde::{Deserialize, Serialize};

use crate::net::NodeRole;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologySpec {
    pub schema_version: u32,
    #[serde(default)]
    pub meta: Option<TopologyMeta>,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    pub role: NodeRole,
    #[serde(default)]
    pub adapters: Vec<AdapterSpec>,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
    #[serde(default)]
    pub arp: Vec<ArpSpec>,
}

/// 网卡名在整个拓扑内唯一，链路按网卡名连接。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterSpec {
    pub name: String,
    /// 链路地址，例如 `02:00:00:00:00:01`
    pub mac: String,
    /// 带前缀的网络地址，例如 `10.0.1.2/24`
    pub address: String,
    #[serde(default)]
    pub mtu: Option<usize>,
    #[serde(default)]
    pub promiscuous: bool,
    #[serde(default = "default_up")]
    pub up: bool,
}

fn default_up() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSpec {
    pub a: String,
    pub b: String,
}

/// 静态路由；`default: true` 时 `subnet` 可以省略。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSpec {
    #[serde(default)]
    pub subnet: Option<String>,
    #[serde(default)]
    pub default: bool,
    pub adapter: String,
    #[serde(default)]
    pub next_hop: Option<String>,
}

/// ARP 表项；`gateway: true` 时写入默认网关，`address` 可以省略。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArpSpec {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub gateway: bool,
    pub mac: String,
}
