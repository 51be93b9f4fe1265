use serde::{Deserialize, Serialize};

use crate::net::{DropReason, NodeRole};

/// 事件类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEventKind {
    /// 拓扑元信息（建议作为第一条事件）
    Meta {
        nodes: Vec<TraceNodeInfo>,
        adapters: Vec<TraceAdapterInfo>,
    },
    /// 网卡把帧发往对端
    Transmit {
        node: usize,
        adapter: usize,
        peer_adapter: usize,
        frames: usize,
        bytes: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        ttl: Option<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        src: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        dst: Option<String>,
    },
    /// 网卡按目的链路地址过滤掉的帧
    Filtered {
        node: usize,
        adapter: usize,
        frames: u64,
    },
    Drop { node: usize, reason: DropReason },
    /// 应用收到完整的消息
    Delivered {
        node: usize,
        src: String,
        bytes: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceNodeInfo {
    pub id: usize,
    pub name: String,
    pub role: NodeRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceAdapterInfo {
    pub id: usize,
    pub node: usize,
    pub name: String,
    /// 链路地址（`aa:bb:..`）
    pub mac: String,
    pub mtu: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<usize>,
}

/// 一条事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// 仿真时间（纳秒，和 `SimTime.0` 同口径）
    pub t_ns: u64,
    #[serde(flatten)]
    pub kind: TraceEventKind,
}

/// 事件收集器（存内存，仿真结束写 JSON 文件）
#[derive(Debug, Default, Clone)]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ev: TraceEvent) {
        self.events.push(ev);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.events)
    }
}
