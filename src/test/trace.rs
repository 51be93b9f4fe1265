use serde_json::Value;

use super::support::{H1_ADDR, H2_ADDR, chat, line};
use crate::net::{DropReason, NodeRole};
use crate::trace::{TraceEventKind, TraceLog};

#[test]
fn meta_event_describes_nodes_and_adapters() {
    let mut l = line(1500);
    l.net.trace = Some(TraceLog::new());
    l.net.emit_trace_meta();

    let log = l.net.trace.as_ref().unwrap();
    assert_eq!(log.len(), 1);
    let TraceEventKind::Meta { nodes, adapters } = &log.events[0].kind else {
        panic!("expected meta event, got {:?}", log.events[0].kind);
    };
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[1].name, "r");
    assert_eq!(nodes[1].role, NodeRole::Router);
    assert_eq!(adapters.len(), 4);
    assert_eq!(adapters[0].name, "h1-eth0");
    assert_eq!(adapters[0].mac, "02:00:00:00:00:01");
    assert_eq!(adapters[0].address.as_deref(), Some("10.0.1.2/24"));
    assert_eq!(adapters[0].peer, Some(adapters[1].id));
}

#[test]
fn trace_is_off_by_default() {
    let mut l = line(1500);
    l.net.emit_trace_meta();
    l.net
        .send_to(l.h1, chat("h1", H1_ADDR, H2_ADDR, 64), b"quiet")
        .unwrap();
    assert!(l.net.trace.is_none());
}

#[test]
fn events_follow_the_message_and_serialize_with_kind_tags() {
    let mut l = line(1500);
    l.net.trace = Some(TraceLog::new());
    l.net.emit_trace_meta();
    l.net
        .send_to(l.h1, chat("h1", H1_ADDR, H2_ADDR, 64), b"traced")
        .unwrap();
    l.net
        .send_to(l.h1, chat("h1", H1_ADDR, H2_ADDR, 0), b"expired")
        .unwrap();

    let log = l.net.trace.as_ref().unwrap();
    let json: Value = serde_json::from_str(&log.to_json().unwrap()).unwrap();
    let kinds: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec!["meta", "transmit", "transmit", "delivered", "transmit", "drop"]
    );

    let first_hop = &json[1];
    assert_eq!(first_hop["node"], l.h1.0);
    assert_eq!(first_hop["frames"], 1);
    assert_eq!(first_hop["ttl"], 64);
    assert_eq!(first_hop["src"], "10.0.1.2/32");
    assert_eq!(first_hop["dst"], "10.0.2.2/32");
    assert_eq!(first_hop["t_ns"], 0);

    assert_eq!(json[3]["src"], "10.0.1.2/32");
    assert_eq!(json[3]["bytes"], 6);
    assert_eq!(json[5]["reason"], "ttl_expired");
    assert!(matches!(
        log.events[5].kind,
        TraceEventKind::Drop {
            reason: DropReason::TtlExpired,
            ..
        }
    ));
}
