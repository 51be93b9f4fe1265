//! 测试用的小拓扑：h1 <-> r <-> h2

use crate::addr::{LinkAddress, NetworkAddress, Port};
use crate::net::{AdapterId, Inbox, Network, NodeId, RoutingInfo};
use crate::pipeline::Pipeline;
use crate::proto::{AppCodec, NetworkCodec, TransportCodec};

pub(super) const H1_ADDR: NetworkAddress = NetworkAddress::host([10, 0, 1, 2]);
pub(super) const H2_ADDR: NetworkAddress = NetworkAddress::host([10, 0, 2, 2]);
pub(super) const R_WEST_ADDR: NetworkAddress = NetworkAddress::host([10, 0, 1, 1]);
pub(super) const R_EAST_ADDR: NetworkAddress = NetworkAddress::host([10, 0, 2, 1]);

pub(super) const H1_MAC: LinkAddress = LinkAddress::new([2, 0, 0, 0, 0, 1]);
pub(super) const H2_MAC: LinkAddress = LinkAddress::new([2, 0, 0, 0, 0, 2]);
pub(super) const R_WEST_MAC: LinkAddress = LinkAddress::new([2, 0, 0, 0, 1, 1]);
pub(super) const R_EAST_MAC: LinkAddress = LinkAddress::new([2, 0, 0, 0, 1, 2]);

pub(super) struct Line {
    pub net: Network,
    pub h1: NodeId,
    pub r: NodeId,
    pub h2: NodeId,
    pub h2_inbox: Inbox,
    pub h1_inbox: Inbox,
    pub r_east: AdapterId,
}

fn subnet(addr: NetworkAddress, len: u32) -> NetworkAddress {
    addr.with_prefix(crate::addr::Prefix::new(len).expect("prefix"))
}

/// 两个 /24 网段，中间一个路由器；`east_mtu` 是 r -> h2 方向的 MTU。
pub(super) fn line(east_mtu: usize) -> Line {
    let mut net = Network::new();
    let h1_inbox = Inbox::new();
    let h2_inbox = Inbox::new();
    let h1 = net.add_host("h1", Box::new(h1_inbox.clone()));
    let r = net.add_router("r");
    let h2 = net.add_host("h2", Box::new(h2_inbox.clone()));

    let h1_nic = net
        .add_adapter(h1, "h1-eth0", H1_MAC, subnet(H1_ADDR, 24), 1500)
        .unwrap();
    let r_west = net
        .add_adapter(r, "r-eth0", R_WEST_MAC, subnet(R_WEST_ADDR, 24), 1500)
        .unwrap();
    let r_east = net
        .add_adapter(r, "r-eth1", R_EAST_MAC, subnet(R_EAST_ADDR, 24), east_mtu)
        .unwrap();
    let h2_nic = net
        .add_adapter(h2, "h2-eth0", H2_MAC, subnet(H2_ADDR, 24), east_mtu)
        .unwrap();
    net.link(h1_nic, r_west).unwrap();
    net.link(r_east, h2_nic).unwrap();

    net.routes_mut(h1)
        .unwrap()
        .set_default(RoutingInfo::via(h1_nic, R_WEST_ADDR));
    net.arp_mut(h1).unwrap().insert(R_WEST_ADDR, R_WEST_MAC);

    net.arp_mut(r).unwrap().insert(H1_ADDR, H1_MAC);
    net.arp_mut(r).unwrap().insert(H2_ADDR, H2_MAC);

    net.routes_mut(h2)
        .unwrap()
        .set_default(RoutingInfo::via(h2_nic, R_EAST_ADDR));
    net.arp_mut(h2).unwrap().insert(R_EAST_ADDR, R_EAST_MAC);

    Line {
        net,
        h1,
        r,
        h2,
        h1_inbox,
        h2_inbox,
        r_east,
    }
}

pub(super) fn chat(
    user: &str,
    src: NetworkAddress,
    dst: NetworkAddress,
    ttl: u8,
) -> Pipeline {
    Pipeline::builder()
        .add_layer(AppCodec::new(user).unwrap())
        .add_layer(TransportCodec::new(Port::new(40000), Port::new(7000), 512).unwrap())
        .add_layer(NetworkCodec::new(src, dst).with_ttl(ttl))
        .build()
        .unwrap()
}
