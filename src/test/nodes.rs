use super::support::{
    H1_ADDR, H2_ADDR, H2_MAC, R_WEST_ADDR, chat, line,
};
use crate::addr::{LinkAddress, NetworkAddress};
use crate::error::Error;
use crate::net::{Inbox, Network, NodeId, NodeRole, RoutingInfo};
use crate::pipeline::Pipeline;
use crate::proto::NetworkCodec;
use crate::topo::chat::{ALICE, ALICE_ADDR, CHAT_PORT, CLIENT_PORT, SERVER, SERVER_ADDR};
use crate::topo::{ChatOpts, chat_pipeline, chat_topology};
use crate::trace::{TraceEventKind, TraceLog};

fn transmits(net: &Network) -> Vec<(usize, usize, Option<u8>)> {
    net.trace
        .as_ref()
        .map(|log| {
            log.events
                .iter()
                .filter_map(|e| match &e.kind {
                    TraceEventKind::Transmit {
                        node, frames, ttl, ..
                    } => Some((*node, *frames, *ttl)),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn host_message_crosses_router_to_host() {
    let mut l = line(1500);
    l.net
        .send_to(l.h1, chat("h1", H1_ADDR, H2_ADDR, 64), b"hello")
        .unwrap();

    let got = l.h2_inbox.deliveries();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].text(), "hello");
    assert_eq!(got[0].source, Some(H1_ADDR));
    assert_eq!(l.net.stats.delivered_msgs, 1);
    assert_eq!(l.net.stats.delivered_bytes, 5);
    assert_eq!(l.net.stats.frames_sent, 2);
    assert_eq!(l.net.stats.total_drops(), 0);
}

#[test]
fn router_drops_ttl_zero_without_forwarding() {
    let mut l = line(1500);
    l.net
        .send_to(l.h1, chat("h1", H1_ADDR, H2_ADDR, 0), b"late")
        .unwrap();

    assert!(l.h2_inbox.is_empty());
    assert_eq!(l.net.stats.ttl_drops, 1);
    assert_eq!(l.net.stats.frames_sent, 1);
    assert_eq!(l.net.adapter(l.r_east).unwrap().counters().tx_frames, 0);
}

#[test]
fn router_forwards_ttl_one_once_with_ttl_rewritten_to_zero() {
    let mut l = line(1500);
    l.net.trace = Some(TraceLog::new());
    l.net
        .send_to(l.h1, chat("h1", H1_ADDR, H2_ADDR, 1), b"last hop")
        .unwrap();

    assert_eq!(
        transmits(&l.net),
        vec![(l.h1.0, 1, Some(1)), (l.r.0, 1, Some(0))]
    );
    // 主机不检查 TTL
    assert_eq!(l.h2_inbox.texts(), vec!["last hop".to_string()]);
    assert_eq!(l.net.stats.ttl_drops, 0);
}

#[test]
fn router_drops_on_routing_miss_and_keeps_going() {
    let mut l = line(1500);
    let nowhere: NetworkAddress = "10.9.9.9".parse().unwrap();
    l.net
        .send_to(l.h1, chat("h1", H1_ADDR, nowhere, 64), b"lost")
        .unwrap();
    assert_eq!(l.net.stats.no_route_drops, 1);

    l.net
        .send_to(l.h1, chat("h1", H1_ADDR, H2_ADDR, 64), b"found")
        .unwrap();
    assert_eq!(l.h2_inbox.texts(), vec!["found".to_string()]);
}

#[test]
fn router_drops_when_next_hop_has_no_link_address() {
    let mut l = line(1500);
    l.net.arp_mut(l.r).unwrap().remove(&H2_ADDR);
    l.net
        .send_to(l.h1, chat("h1", H1_ADDR, H2_ADDR, 64), b"x")
        .unwrap();
    assert_eq!(l.net.stats.no_link_address_drops, 1);
    assert!(l.h2_inbox.is_empty());
}

#[test]
fn host_surfaces_routing_and_arp_misses() {
    let mut l = line(1500);
    l.net
        .routes_mut(l.h1)
        .unwrap()
        .remove(&NetworkAddress::DEFAULT_ROUTE);
    let err = l
        .net
        .send_to(l.h1, chat("h1", H1_ADDR, H2_ADDR, 64), b"x")
        .unwrap_err();
    assert_eq!(err, Error::RoutingMiss(H2_ADDR));

    let mut l = line(1500);
    l.net.arp_mut(l.h1).unwrap().remove(&R_WEST_ADDR);
    let err = l
        .net
        .send_to(l.h1, chat("h1", H1_ADDR, H2_ADDR, 64), b"x")
        .unwrap_err();
    assert_eq!(err, Error::ArpMiss(R_WEST_ADDR));
    assert!(err.is_forwarding_miss());
    assert_eq!(l.net.stats.frames_sent, 0);
}

#[test]
fn host_drops_datagrams_for_other_addresses() {
    let mut l = line(1500);
    let stray: NetworkAddress = "10.0.2.99".parse().unwrap();
    l.net.arp_mut(l.r).unwrap().insert(stray, H2_MAC);
    l.net
        .send_to(l.h1, chat("h1", H1_ADDR, stray, 64), b"not yours")
        .unwrap();
    assert_eq!(l.net.stats.not_local_drops, 1);
    assert!(l.h2_inbox.is_empty());
}

#[test]
fn host_adapter_filters_frames_for_another_link_address() {
    let mut l = line(1500);
    l.net.trace = Some(TraceLog::new());
    l.net
        .arp_mut(l.r)
        .unwrap()
        .insert(H2_ADDR, LinkAddress::new([2, 0, 0, 0, 9, 9]));
    l.net
        .send_to(l.h1, chat("h1", H1_ADDR, H2_ADDR, 64), b"x")
        .unwrap();

    assert!(l.h2_inbox.is_empty());
    assert_eq!(l.net.stats.frames_filtered, 1);
    let filtered = l
        .net
        .trace
        .as_ref()
        .unwrap()
        .events
        .iter()
        .any(|e| matches!(e.kind, TraceEventKind::Filtered { node, frames: 1, .. } if node == l.h2.0));
    assert!(filtered);
}

#[test]
fn router_refragments_for_a_smaller_egress_mtu() {
    let mut l = line(68);
    l.net.trace = Some(TraceLog::new());
    let message = "x".repeat(200);
    l.net
        .send_to(l.h1, chat("h1", H1_ADDR, H2_ADDR, 64), message.as_bytes())
        .unwrap();

    // 4 + 200 字节应用数据，8 字节段头 -> 212 字节；68 - 20 = 48 字节一片
    assert_eq!(
        transmits(&l.net),
        vec![(l.h1.0, 1, Some(64)), (l.r.0, 5, Some(63))]
    );
    assert_eq!(l.h2_inbox.texts(), vec![message]);
    assert_eq!(l.net.adapter(l.r_east).unwrap().counters().tx_frames, 5);
}

#[test]
fn routing_loop_ends_when_ttl_runs_out() {
    let mut net = Network::new();
    let h = net.add_host("h", Box::new(Inbox::new()));
    let r1 = net.add_router("r1");
    let r2 = net.add_router("r2");
    let mac = |n: u8| LinkAddress::new([2, 0, 0, 0, 0, n]);
    let addr = |s: &str| s.parse::<NetworkAddress>().unwrap();

    let h0 = net.add_adapter(h, "h-eth0", mac(1), addr("10.0.1.2/24"), 1500).unwrap();
    let r1a = net.add_adapter(r1, "r1-eth0", mac(2), addr("10.0.1.1/24"), 1500).unwrap();
    let r1b = net.add_adapter(r1, "r1-eth1", mac(3), addr("10.0.12.1/30"), 1500).unwrap();
    let r2a = net.add_adapter(r2, "r2-eth0", mac(4), addr("10.0.12.2/30"), 1500).unwrap();
    net.link(h0, r1a).unwrap();
    net.link(r1b, r2a).unwrap();

    net.routes_mut(h).unwrap().set_default(RoutingInfo::via(h0, addr("10.0.1.1")));
    net.arp_mut(h).unwrap().insert(addr("10.0.1.1"), mac(2));
    net.routes_mut(r1).unwrap().set_default(RoutingInfo::via(r1b, addr("10.0.12.2")));
    net.arp_mut(r1).unwrap().insert(addr("10.0.12.2"), mac(4));
    net.routes_mut(r2).unwrap().set_default(RoutingInfo::via(r2a, addr("10.0.12.1")));
    net.arp_mut(r2).unwrap().insert(addr("10.0.12.1"), mac(3));

    let pipeline = chat("h", addr("10.0.1.2"), addr("10.9.9.9"), 5);
    net.send_to(h, pipeline, b"round and round").unwrap();

    assert_eq!(net.stats.ttl_drops, 1);
    assert_eq!(net.stats.frames_sent, 6);
}

#[test]
fn attaching_an_adapter_installs_the_connected_route() {
    let l = line(1500);
    let h1_nic = l.net.find_adapter("h1-eth0").unwrap();
    let route = l
        .net
        .node(l.h1)
        .unwrap()
        .base()
        .routes()
        .lookup(&"10.0.1.77".parse().unwrap())
        .unwrap();
    assert_eq!(route, RoutingInfo::direct(h1_nic));
    assert!(route.is_on_link());
    assert_eq!(l.net.node(l.r).unwrap().role(), NodeRole::Router);
    assert_eq!(l.net.find_node("h2"), Some(l.h2));
}

#[test]
fn send_rejects_bad_arguments() {
    let mut l = line(1500);
    assert!(matches!(
        l.net.send_to(l.h1, chat("h1", H1_ADDR, H2_ADDR, 64), b""),
        Err(Error::InvalidArgument(_))
    ));

    let no_network = Pipeline::builder()
        .add_layer(crate::proto::AppCodec::new("h1").unwrap())
        .build()
        .unwrap();
    assert!(matches!(
        l.net.send_to(l.h1, no_network, b"x"),
        Err(Error::ProtocolMismatch { .. })
    ));

    assert!(matches!(
        l.net.send(
            l.h1,
            RoutingInfo::direct(l.r_east),
            chat("h1", H1_ADDR, H2_ADDR, 64),
            b"x"
        ),
        Err(Error::InvalidArgument(_))
    ));
    assert!(l.net.send_to(NodeId(99), chat("h1", H1_ADDR, H2_ADDR, 64), b"x").is_err());
    assert_eq!(l.net.stats.frames_sent, 0);
}

#[test]
fn linking_an_adapter_twice_fails() {
    let mut l = line(1500);
    let h1_nic = l.net.find_adapter("h1-eth0").unwrap();
    assert!(l.net.link(h1_nic, l.r_east).is_err());
    assert!(l.net.link(h1_nic, h1_nic).is_err());
}

#[test]
fn router_only_needs_a_network_layer() {
    let mut l = line(1500);
    let bare = Pipeline::builder()
        .add_layer(NetworkCodec::new(H1_ADDR, H2_ADDR))
        .build()
        .unwrap();
    l.net.send_to(l.h1, bare, b"raw datagram").unwrap();
    assert_eq!(l.h2_inbox.texts(), vec!["raw datagram".to_string()]);
}

#[test]
fn server_decapsulates_whole_stack_and_replies_through_gateway() {
    let opts = ChatOpts::default();
    let mut built = chat_topology(&opts).unwrap();
    let alice = built.node(ALICE).unwrap();
    let server = built.node(SERVER).unwrap();

    let long = "m".repeat(1000);
    let up = chat_pipeline(ALICE, ALICE_ADDR, SERVER_ADDR, CLIENT_PORT, CHAT_PORT, &opts).unwrap();
    built.net.send_to(alice, up, long.as_bytes()).unwrap();

    let got = built.inbox(SERVER).unwrap().deliveries();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].text(), long);
    assert_eq!(got[0].source, Some(ALICE_ADDR));
    // alice -> r1：1 帧；r1 -> r2（MTU 576）：2 个分片；r2 -> server：1 帧
    assert_eq!(built.net.stats.frames_sent, 4);

    let down = chat_pipeline(SERVER, SERVER_ADDR, ALICE_ADDR, CHAT_PORT, CLIENT_PORT, &opts).unwrap();
    built.net.send_to(server, down, b"ack").unwrap();
    assert_eq!(built.inbox(ALICE).unwrap().texts(), vec!["ack".to_string()]);
    assert_eq!(built.net.stats.delivered_msgs, 2);
}

#[test]
fn failed_transmit_leaves_nothing_behind_for_the_next_send() {
    let mut net = Network::new();
    let a_inbox = Inbox::new();
    let b_inbox = Inbox::new();
    let a = net.add_host("a", Box::new(a_inbox));
    let b = net.add_host("b", Box::new(b_inbox.clone()));
    let addr = |s: &str| s.parse::<NetworkAddress>().unwrap();
    let a_mac = LinkAddress::new([2, 0, 0, 0, 0, 0x0a]);
    let b_mac = LinkAddress::new([2, 0, 0, 0, 0, 0x0b]);
    let a0 = net.add_adapter(a, "a0", a_mac, addr("192.168.0.1/24"), 1500).unwrap();
    let b0 = net.add_adapter(b, "b0", b_mac, addr("192.168.0.2/24"), 1500).unwrap();
    net.arp_mut(a).unwrap().insert(addr("192.168.0.2"), b_mac);

    let first = chat("a", addr("192.168.0.1"), addr("192.168.0.2"), 64);
    assert_eq!(
        net.send_to(a, first, b"first message that failed"),
        Err(Error::NotLinked("a0".to_string()))
    );
    assert_eq!(net.adapter(a0).unwrap().pending_outbound(), 0);
    assert_eq!(net.stats.frames_sent, 0);

    net.link(a0, b0).unwrap();
    let second = chat("a", addr("192.168.0.1"), addr("192.168.0.2"), 64);
    net.send_to(a, second, b"hi").unwrap();
    assert_eq!(b_inbox.texts(), vec!["hi".to_string()]);
    assert_eq!(net.stats.frames_sent, 1);
}

#[test]
fn router_with_down_egress_fails_the_journey_and_recovers() {
    let mut l = line(1500);
    l.net.adapter_mut(l.r_east).unwrap().set_up(false);

    let err = l
        .net
        .send_to(l.h1, chat("h1", H1_ADDR, H2_ADDR, 64), b"stuck")
        .unwrap_err();
    assert_eq!(err, Error::AdapterDown("r-eth1".to_string()));
    assert!(!err.is_forwarding_miss());
    for nic in l.net.adapters() {
        assert_eq!(nic.pending_outbound(), 0, "{} kept datagrams", nic.name());
        assert_eq!(nic.pending_inbound(), 0, "{} kept datagrams", nic.name());
    }
    assert!(l.h2_inbox.is_empty());

    l.net.adapter_mut(l.r_east).unwrap().set_up(true);
    l.net
        .send_to(l.h1, chat("h1", H1_ADDR, H2_ADDR, 64), b"unstuck")
        .unwrap();
    assert_eq!(l.h2_inbox.texts(), vec!["unstuck".to_string()]);
}
