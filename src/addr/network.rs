//! 网络地址与前缀
//!
//! 网络地址 = 4 字节点分十进制地址 + 前缀长度（0..=32）。
//! 前缀既可以用位数给出，也可以从点分掩码推导（掩码必须是连续的 1 后跟连续的 0）。

use std::fmt;
use std::str::FromStr;

use super::{fixed, AddressError, AddressKind};

/// 前缀长度（0..=32）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Prefix(u8);

impl Prefix {
    pub const MAX: u8 = 32;
    pub const HOST: Prefix = Prefix(32);
    pub const ANY: Prefix = Prefix(0);

    pub fn new(len: u32) -> Result<Self, AddressError> {
        if len > Self::MAX as u32 {
            return Err(AddressError::PrefixRange(len));
        }
        Ok(Prefix(len as u8))
    }

    /// 由 32 位掩码推导前缀；非连续掩码报错。
    pub fn from_mask(mask: u32) -> Result<Self, AddressError> {
        let ones = mask.leading_ones();
        if ones + mask.trailing_zeros() < 32 {
            return Err(AddressError::NonContiguousMask(dotted(mask.to_be_bytes())));
        }
        Ok(Prefix(ones as u8))
    }

    pub fn len(&self) -> u8 {
        self.0
    }

    /// `prefix == 0 ? 0 : ~0 << (32 - prefix)`
    pub fn mask(&self) -> u32 {
        if self.0 == 0 {
            0
        } else {
            u32::MAX << (32 - self.0 as u32)
        }
    }
}

impl Default for Prefix {
    fn default() -> Self {
        Prefix::HOST
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Prefix {
    type Err = AddressError;

    /// 接受位数（`24`）或点分掩码（`255.255.255.0`）。
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.contains('.') {
            let octets = parse_octets(text).ok_or_else(|| AddressError::Syntax {
                kind: AddressKind::Network,
                text: text.to_string(),
            })?;
            return Prefix::from_mask(u32::from_be_bytes(octets));
        }
        let len = text.parse::<u32>().map_err(|_| AddressError::Syntax {
            kind: AddressKind::Network,
            text: text.to_string(),
        })?;
        Prefix::new(len)
    }
}

/// 网络层地址，例如 `10.0.1.5/24`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkAddress {
    octets: [u8; 4],
    prefix: Prefix,
}

impl NetworkAddress {
    pub const LEN: usize = 4;
    /// `0.0.0.0/32`：ARP 表中保留给默认网关的键
    pub const UNSPECIFIED: NetworkAddress = NetworkAddress {
        octets: [0; 4],
        prefix: Prefix::HOST,
    };
    /// `0.0.0.0/0`：默认路由的键
    pub const DEFAULT_ROUTE: NetworkAddress = NetworkAddress {
        octets: [0; 4],
        prefix: Prefix::ANY,
    };

    pub const fn new(octets: [u8; 4], prefix: Prefix) -> Self {
        NetworkAddress { octets, prefix }
    }

    /// 主机地址（/32）
    pub const fn host(octets: [u8; 4]) -> Self {
        NetworkAddress {
            octets,
            prefix: Prefix::HOST,
        }
    }

    /// 从 4 个原始字节构造（/32）
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        fixed(AddressKind::Network, bytes).map(NetworkAddress::host)
    }

    pub fn from_u32(value: u32, prefix: Prefix) -> Self {
        NetworkAddress::new(value.to_be_bytes(), prefix)
    }

    pub fn octets(&self) -> [u8; 4] {
        self.octets
    }

    pub fn to_u32(&self) -> u32 {
        u32::from_be_bytes(self.octets)
    }

    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    pub fn with_prefix(self, prefix: Prefix) -> Self {
        NetworkAddress { prefix, ..self }
    }

    /// 清除主机位后的子网地址（前缀不变）
    pub fn network(&self) -> Self {
        NetworkAddress::from_u32(self.to_u32() & self.prefix.mask(), self.prefix)
    }

    /// 把自身视为子网，判断 `addr` 是否落在其中（只看 `addr` 的地址字节）。
    pub fn contains(&self, addr: &NetworkAddress) -> bool {
        let mask = self.prefix.mask();
        (addr.to_u32() & mask) == (self.to_u32() & mask)
    }

    /// 只比较地址字节，忽略前缀
    pub fn same_host(&self, other: &NetworkAddress) -> bool {
        self.octets == other.octets
    }

    pub fn is_unspecified(&self) -> bool {
        self.octets == [0; 4]
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", dotted(self.octets), self.prefix)
    }
}

impl FromStr for NetworkAddress {
    type Err = AddressError;

    /// 接受 `a.b.c.d`（视为 /32）、`a.b.c.d/len` 与 `a.b.c.d/m.m.m.m`。
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = match text.split_once('/') {
            Some((addr, prefix)) => (addr, prefix.parse::<Prefix>()?),
            None => (text, Prefix::HOST),
        };
        let octets = parse_octets(addr).ok_or_else(|| AddressError::Syntax {
            kind: AddressKind::Network,
            text: text.to_string(),
        })?;
        Ok(NetworkAddress::new(octets, prefix))
    }
}

fn parse_octets(text: &str) -> Option<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut parts = text.split('.');
    for slot in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(octets)
}

fn dotted(o: [u8; 4]) -> String {
    format!("{}.{}.{}.{}", o[0], o[1], o[2], o[3])
}
