//! 网络模拟模块
//!
//! 网卡、路由表、ARP 表、三种节点角色，以及把它们连成拓扑的 `Network`。

mod adapter;
mod app;
mod arp;
mod id;
mod network;
mod network_trace;
mod node;
mod routing;
mod send_message;
mod stats;

pub use adapter::{Adapter, AdapterCounters};
pub use app::{App, Delivery, Inbox};
pub use arp::ArpTable;
pub use id::{AdapterId, NodeId};
pub use network::Network;
pub use node::{Host, Interface, NetworkNode, Node, NodeRole, Router, Server};
pub use routing::{RoutingEntry, RoutingInfo, RoutingTable};
pub use send_message::SendMessage;
pub use stats::{DropReason, Stats};
