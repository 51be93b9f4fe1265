//! 地址类型
//!
//! 定长字节地址：链路地址（6 字节）、网络地址（4 字节 + 前缀）、传输端口（2 字节）。
//! 三者都支持文本解析/格式化，相等与哈希基于原始字节（网络地址还包含前缀）。

mod link;
mod network;
mod port;

use std::fmt;

use thiserror::Error;

pub use link::LinkAddress;
pub use network::{NetworkAddress, Prefix};
pub use port::Port;

/// 地址解析/校验错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("{kind} address needs {expected} bytes, got {actual}")]
    Length {
        kind: AddressKind,
        expected: usize,
        actual: usize,
    },
    #[error("cannot parse {kind} address from {text:?}")]
    Syntax { kind: AddressKind, text: String },
    #[error("prefix length {0} is outside 0..=32")]
    PrefixRange(u32),
    #[error("mask {0} is not a contiguous run of 1-bits followed by 0-bits")]
    NonContiguousMask(String),
}

/// 地址种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    Link,
    Network,
    Port,
}

impl AddressKind {
    /// 该种类地址的固定字节长度
    pub const fn byte_len(self) -> usize {
        match self {
            AddressKind::Link => LinkAddress::LEN,
            AddressKind::Network => NetworkAddress::LEN,
            AddressKind::Port => Port::LEN,
        }
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AddressKind::Link => "link",
            AddressKind::Network => "network",
            AddressKind::Port => "port",
        })
    }
}

/// 任意一种地址
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    Link(LinkAddress),
    Network(NetworkAddress),
    Port(Port),
}

impl Address {
    /// 按种类从原始字节构造；长度不符时报错。
    pub fn from_bytes(kind: AddressKind, bytes: &[u8]) -> Result<Self, AddressError> {
        Ok(match kind {
            AddressKind::Link => Address::Link(LinkAddress::from_bytes(bytes)?),
            AddressKind::Network => Address::Network(NetworkAddress::from_bytes(bytes)?),
            AddressKind::Port => Address::Port(Port::from_bytes(bytes)?),
        })
    }

    pub fn kind(&self) -> AddressKind {
        match self {
            Address::Link(_) => AddressKind::Link,
            Address::Network(_) => AddressKind::Network,
            Address::Port(_) => AddressKind::Port,
        }
    }

    /// 地址的原始字节（网络字节序）
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Address::Link(a) => a.octets().to_vec(),
            Address::Network(a) => a.octets().to_vec(),
            Address::Port(p) => p.to_bytes().to_vec(),
        }
    }

    pub fn as_link(&self) -> Option<LinkAddress> {
        match self {
            Address::Link(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_network(&self) -> Option<NetworkAddress> {
        match self {
            Address::Network(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_port(&self) -> Option<Port> {
        match self {
            Address::Port(p) => Some(*p),
            _ => None,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Link(a) => a.fmt(f),
            Address::Network(a) => a.fmt(f),
            Address::Port(p) => p.fmt(f),
        }
    }
}

impl From<LinkAddress> for Address {
    fn from(a: LinkAddress) -> Self {
        Address::Link(a)
    }
}

impl From<NetworkAddress> for Address {
    fn from(a: NetworkAddress) -> Self {
        Address::Network(a)
    }
}

impl From<Port> for Address {
    fn from(p: Port) -> Self {
        Address::Port(p)
    }
}

/// 校验定长字节切片并拷贝为数组
pub(crate) fn fixed<const N: usize>(
    kind: AddressKind,
    bytes: &[u8],
) -> Result<[u8; N], AddressError> {
    bytes.try_into().map_err(|_| AddressError::Length {
        kind,
        expected: N,
        actual: bytes.len(),
    })
}
