//! 按 `TopologySpec` 组装网络

use std::collections::HashMap;

use tracing::{debug, info};

use crate::addr::{LinkAddress, NetworkAddress};
use crate::error::{Error, Result};
use crate::net::{AdapterId, Inbox, Network, NodeId, NodeRole, RoutingInfo};
use crate::proto::network::DEFAULT_MTU;

use super::spec::{NodeSpec, SCHEMA_VERSION, TopologySpec};

/// 组装结果
pub struct Built {
    pub net: Network,
    pub nodes: HashMap<String, NodeId>,
    pub adapters: HashMap<String, AdapterId>,
    /// 主机与服务器上挂的收件箱，按节点名索引
    pub inboxes: HashMap<String, Inbox>,
}

impl Built {
    pub fn node(&self, name: &str) -> Result<NodeId> {
        self.nodes
            .get(name)
            .copied()
            .ok_or_else(|| Error::invalid(format!("unknown node {name:?}")))
    }

    pub fn inbox(&self, name: &str) -> Result<&Inbox> {
        self.inboxes
            .get(name)
            .ok_or_else(|| Error::invalid(format!("node {name:?} has no application")))
    }
}

#[tracing::instrument(skip(spec), fields(nodes = spec.nodes.len(), links = spec.links.len()))]
pub fn build(spec: &TopologySpec) -> Result<Built> {
    if spec.schema_version != SCHEMA_VERSION {
        return Err(Error::invalid(format!(
            "unsupported schema_version {} (expected {SCHEMA_VERSION})",
            spec.schema_version
        )));
    }

    let mut built = Built {
        net: Network::new(),
        nodes: HashMap::new(),
        adapters: HashMap::new(),
        inboxes: HashMap::new(),
    };

    for node in &spec.nodes {
        add_node(&mut built, node)?;
    }
    for link in &spec.links {
        let a = adapter_id(&built, &link.a)?;
        let b = adapter_id(&built, &link.b)?;
        built.net.link(a, b)?;
    }
    // 路由和 ARP 表项可能引用任意网卡，放到所有网卡建好之后。
    for node in &spec.nodes {
        configure_tables(&mut built, node)?;
    }

    info!(
        nodes = built.nodes.len(),
        adapters = built.adapters.len(),
        "🧱 拓扑组装完成"
    );
    Ok(built)
}

fn adapter_id(built: &Built, name: &str) -> Result<AdapterId> {
    built
        .adapters
        .get(name)
        .copied()
        .ok_or_else(|| Error::invalid(format!("unknown adapter {name:?}")))
}

fn add_node(built: &mut Built, spec: &NodeSpec) -> Result<()> {
    if spec.name.is_empty() {
        return Err(Error::invalid("node name is empty"));
    }
    if built.nodes.contains_key(&spec.name) {
        return Err(Error::invalid(format!("duplicate node name {:?}", spec.name)));
    }

    let id = match spec.role {
        NodeRole::Router => built.net.add_router(&spec.name),
        NodeRole::Host | NodeRole::Server => {
            let inbox = Inbox::new();
            built.inboxes.insert(spec.name.clone(), inbox.clone());
            if spec.role == NodeRole::Host {
                built.net.add_host(&spec.name, Box::new(inbox))
            } else {
                built.net.add_server(&spec.name, Box::new(inbox))
            }
        }
    };
    built.nodes.insert(spec.name.clone(), id);

    for adapter in &spec.adapters {
        if built.adapters.contains_key(&adapter.name) {
            return Err(Error::invalid(format!(
                "duplicate adapter name {:?}",
                adapter.name
            )));
        }
        let mac: LinkAddress = adapter.mac.parse()?;
        let address: NetworkAddress = adapter.address.parse()?;
        let mtu = adapter.mtu.unwrap_or(DEFAULT_MTU);
        let aid = built
            .net
            .add_adapter(id, adapter.name.as_str(), mac, address, mtu)?;
        let nic = built.net.adapter_mut(aid)?;
        nic.set_up(adapter.up);
        nic.set_promiscuous(adapter.promiscuous);
        built.adapters.insert(adapter.name.clone(), aid);
    }
    debug!(node = %spec.name, role = ?spec.role, adapters = spec.adapters.len(), "添加节点");
    Ok(())
}

fn configure_tables(built: &mut Built, spec: &NodeSpec) -> Result<()> {
    let id = built.node(&spec.name)?;

    for route in &spec.routes {
        let adapter = adapter_id(built, &route.adapter)?;
        if built.net.adapter(adapter)?.owner() != id {
            return Err(Error::invalid(format!(
                "{}: route uses adapter {:?} of another node",
                spec.name, route.adapter
            )));
        }
        let info = match &route.next_hop {
            Some(nh) => RoutingInfo::via(adapter, nh.parse()?),
            None => RoutingInfo::direct(adapter),
        };
        let table = built.net.routes_mut(id)?;
        match (&route.subnet, route.default) {
            (None, true) => table.set_default(info),
            (Some(subnet), false) => table.add(subnet.parse()?, info)?,
            (Some(subnet), true) => {
                let subnet: NetworkAddress = subnet.parse()?;
                if subnet.network() != NetworkAddress::DEFAULT_ROUTE {
                    return Err(Error::invalid(format!(
                        "{}: default route must be 0.0.0.0/0, got {subnet}",
                        spec.name
                    )));
                }
                table.set_default(info);
            }
            (None, false) => {
                return Err(Error::invalid(format!(
                    "{}: route needs a subnet or default = true",
                    spec.name
                )));
            }
        }
    }

    for entry in &spec.arp {
        let mac: LinkAddress = entry.mac.parse()?;
        let arp = built.net.arp_mut(id)?;
        match (&entry.address, entry.gateway) {
            (None, true) => {
                arp.set_gateway(mac);
            }
            (Some(address), false) => {
                arp.insert(address.parse()?, mac);
            }
            _ => {
                return Err(Error::invalid(format!(
                    "{}: ARP entry needs exactly one of address or gateway",
                    spec.name
                )));
            }
        }
    }
    Ok(())
}
