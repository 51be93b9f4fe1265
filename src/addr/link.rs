//! 链路地址（6 字节，冒号分隔十六进制）

use std::fmt;
use std::str::FromStr;

use super::{fixed, AddressError, AddressKind};

/// 链路层地址，例如 `02:00:00:00:00:01`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LinkAddress([u8; 6]);

impl LinkAddress {
    pub const LEN: usize = 6;
    pub const BROADCAST: LinkAddress = LinkAddress([0xff; 6]);

    pub const fn new(octets: [u8; 6]) -> Self {
        LinkAddress(octets)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        fixed(AddressKind::Link, bytes).map(LinkAddress)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Display for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for LinkAddress {
    type Err = AddressError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let syntax = || AddressError::Syntax {
            kind: AddressKind::Link,
            text: text.to_string(),
        };
        let mut octets = [0u8; 6];
        let mut groups = text.split(':');
        for slot in octets.iter_mut() {
            let group = groups.next().ok_or_else(syntax)?;
            if group.is_empty()
                || group.len() > 2
                || !group.bytes().all(|b| b.is_ascii_hexdigit())
            {
                return Err(syntax());
            }
            *slot = u8::from_str_radix(group, 16).map_err(|_| syntax())?;
        }
        if groups.next().is_some() {
            return Err(syntax());
        }
        Ok(LinkAddress(octets))
    }
}
