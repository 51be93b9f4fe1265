//! ARP 表：网络地址 → 链路地址（精确匹配）
//!
//! 表项在拓扑搭建时预先填好，不做多跳 ARP 发现。
//! 全零地址 `0.0.0.0` 保留给“默认网关”。

use std::collections::HashMap;

use crate::addr::{LinkAddress, NetworkAddress};
use crate::error::{Error, Result};

#[derive(Debug, Default, Clone)]
pub struct ArpTable {
    /// 键只取地址字节，忽略前缀
    entries: HashMap<[u8; 4], LinkAddress>,
}

impl ArpTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 插入或覆盖，返回旧值
    pub fn insert(&mut self, address: NetworkAddress, link: LinkAddress) -> Option<LinkAddress> {
        self.entries.insert(address.octets(), link)
    }

    pub fn remove(&mut self, address: &NetworkAddress) -> Option<LinkAddress> {
        self.entries.remove(&address.octets())
    }

    pub fn lookup(&self, address: &NetworkAddress) -> Result<LinkAddress> {
        self.entries
            .get(&address.octets())
            .copied()
            .ok_or(Error::ArpMiss(*address))
    }

    pub fn set_gateway(&mut self, link: LinkAddress) -> Option<LinkAddress> {
        self.insert(NetworkAddress::UNSPECIFIED, link)
    }

    pub fn gateway(&self) -> Result<LinkAddress> {
        self.lookup(&NetworkAddress::UNSPECIFIED)
    }
}
