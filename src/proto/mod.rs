//! 协议编解码层
//!
//! 每一层协议提供 encapsulate/decapsulate，以及从原始字节中提取源/目的地址的能力。
//! `Protocol` 是四种编解码器的和类型，流水线（`pipeline`）只和它打交道。

pub mod app;
pub mod link;
pub mod network;
pub mod transport;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::addr::Address;
use crate::error::Result;

pub use app::AppCodec;
pub use link::{LinkCodec, LinkHeader};
pub use network::{NetworkCodec, NetworkHeader};
pub use transport::{SegmentHeader, TransportCodec};

/// 协议所处的层
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Application,
    Transport,
    Network,
    Link,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LayerKind::Application => "application",
            LayerKind::Transport => "transport",
            LayerKind::Network => "network",
            LayerKind::Link => "link",
        })
    }
}

/// 单层协议编解码接口
pub trait Codec {
    fn kind(&self) -> LayerKind;

    /// 给上层数据加上本层的封装
    fn encapsulate(&self, payload: &[u8]) -> Result<Vec<u8>>;

    /// 去掉本层封装，返回交给上层的数据
    fn decapsulate(&self, bytes: &[u8]) -> Result<Vec<u8>>;

    /// 从本层的原始字节中解析源地址；不携带地址的层返回 `None`。
    fn extract_source(&self, _bytes: &[u8]) -> Result<Option<Address>> {
        Ok(None)
    }

    /// 从本层的原始字节中解析目的地址；不携带地址的层返回 `None`。
    fn extract_destination(&self, _bytes: &[u8]) -> Result<Option<Address>> {
        Ok(None)
    }
}

/// 流水线中的一层
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protocol {
    Application(AppCodec),
    Transport(TransportCodec),
    Network(NetworkCodec),
    Link(LinkCodec),
}

impl Protocol {
    fn codec(&self) -> &dyn Codec {
        match self {
            Protocol::Application(c) => c,
            Protocol::Transport(c) => c,
            Protocol::Network(c) => c,
            Protocol::Link(c) => c,
        }
    }

    pub fn as_network(&self) -> Option<&NetworkCodec> {
        match self {
            Protocol::Network(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&LinkCodec> {
        match self {
            Protocol::Link(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_transport(&self) -> Option<&TransportCodec> {
        match self {
            Protocol::Transport(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_app(&self) -> Option<&AppCodec> {
        match self {
            Protocol::Application(c) => Some(c),
            _ => None,
        }
    }
}

impl Codec for Protocol {
    fn kind(&self) -> LayerKind {
        self.codec().kind()
    }

    fn encapsulate(&self, payload: &[u8]) -> Result<Vec<u8>> {
        self.codec().encapsulate(payload)
    }

    fn decapsulate(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.codec().decapsulate(bytes)
    }

    fn extract_source(&self, bytes: &[u8]) -> Result<Option<Address>> {
        self.codec().extract_source(bytes)
    }

    fn extract_destination(&self, bytes: &[u8]) -> Result<Option<Address>> {
        self.codec().extract_destination(bytes)
    }
}

impl From<AppCodec> for Protocol {
    fn from(c: AppCodec) -> Self {
        Protocol::Application(c)
    }
}

impl From<TransportCodec> for Protocol {
    fn from(c: TransportCodec) -> Self {
        Protocol::Transport(c)
    }
}

impl From<NetworkCodec> for Protocol {
    fn from(c: NetworkCodec) -> Self {
        Protocol::Network(c)
    }
}

impl From<LinkCodec> for Protocol {
    fn from(c: LinkCodec) -> Self {
        Protocol::Link(c)
    }
}
