//! 错误类型
//!
//! 全 crate 共用的错误分类：参数错误、报文格式错误、协议层不匹配、
//! 路由/ARP 未命中、容量（MTU）错误，以及网卡状态错误。

use thiserror::Error;

use crate::addr::{AddressError, NetworkAddress};
use crate::proto::LayerKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("malformed {layer} data: {reason}")]
    MalformedWire { layer: LayerKind, reason: String },
    #[error("expected a {expected} layer, found {}", describe(.found))]
    ProtocolMismatch {
        expected: LayerKind,
        found: Option<LayerKind>,
    },
    #[error("no route to {0}")]
    RoutingMiss(NetworkAddress),
    #[error("no link address known for {0}")]
    ArpMiss(NetworkAddress),
    #[error("a route for {0} already exists")]
    DuplicateRoute(NetworkAddress),
    #[error("MTU {mtu} cannot carry {needed} bytes")]
    Capacity { mtu: usize, needed: usize },
    #[error("adapter {0} is down")]
    AdapterDown(String),
    #[error("adapter {0} is not linked to a peer")]
    NotLinked(String),
}

fn describe(found: &Option<LayerKind>) -> String {
    found.map_or_else(|| "nothing".to_string(), |k| k.to_string())
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn malformed(layer: LayerKind, reason: impl Into<String>) -> Self {
        Error::MalformedWire {
            layer,
            reason: reason.into(),
        }
    }

    /// 路由/ARP 未命中属于预期内的运行时情况，而不是程序错误。
    pub fn is_forwarding_miss(&self) -> bool {
        matches!(self, Error::RoutingMiss(_) | Error::ArpMiss(_))
    }
}
