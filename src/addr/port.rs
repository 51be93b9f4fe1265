//! 传输层端口（2 字节，大端）

use std::fmt;
use std::str::FromStr;

use super::{fixed, AddressError, AddressKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Port(u16);

impl Port {
    pub const LEN: usize = 2;

    pub const fn new(value: u16) -> Self {
        Port(value)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        fixed(AddressKind::Port, bytes).map(|b| Port(u16::from_be_bytes(b)))
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    pub fn to_bytes(&self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Port {
    type Err = AddressError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let syntax = || AddressError::Syntax {
            kind: AddressKind::Port,
            text: text.to_string(),
        };
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(syntax());
        }
        text.parse::<u16>().map(Port).map_err(|_| syntax())
    }
}

impl From<u16> for Port {
    fn from(value: u16) -> Self {
        Port(value)
    }
}
