//! 路由表（最长前缀匹配）
//!
//! 键是子网（地址 + 前缀），存入时清除主机位；值是 `RoutingInfo`：
//! 出接口网卡 + 可选下一跳（`None` 表示直连）。
//! 查找时扫描全部表项，保留前缀最长的匹配。由于键已归一化，
//! 同一前缀长度下不会有两个不同的表项同时包含某个目的地址。

use std::fmt;

use crate::addr::{NetworkAddress, Prefix};
use crate::error::{Error, Result};

use super::id::AdapterId;

/// 路由结果：从哪个网卡发出、交给哪个下一跳
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingInfo {
    pub adapter: AdapterId,
    pub next_hop: Option<NetworkAddress>,
}

impl RoutingInfo {
    /// 直连路由
    pub fn direct(adapter: AdapterId) -> Self {
        Self {
            adapter,
            next_hop: None,
        }
    }

    /// 经由下一跳
    pub fn via(adapter: AdapterId, next_hop: NetworkAddress) -> Self {
        Self {
            adapter,
            next_hop: Some(next_hop),
        }
    }

    pub fn is_on_link(&self) -> bool {
        self.next_hop.is_none()
    }
}

impl fmt::Display for RoutingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.next_hop {
            Some(nh) => write!(f, "via {} dev #{}", nh, self.adapter.0),
            None => write!(f, "dev #{} (on-link)", self.adapter.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingEntry {
    pub subnet: NetworkAddress,
    pub info: RoutingInfo,
}

#[derive(Debug, Default, Clone)]
pub struct RoutingTable {
    /// 按插入顺序保存
    entries: Vec<RoutingEntry>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RoutingEntry] {
        &self.entries
    }

    pub fn contains(&self, subnet: &NetworkAddress) -> bool {
        let key = subnet.network();
        self.entries.iter().any(|e| e.subnet == key)
    }

    /// 添加表项；同一子网键已存在时报错（不隐式覆盖）。
    pub fn add(&mut self, subnet: NetworkAddress, info: RoutingInfo) -> Result<()> {
        let key = subnet.network();
        if self.contains(&key) {
            return Err(Error::DuplicateRoute(key));
        }
        self.entries.push(RoutingEntry { subnet: key, info });
        Ok(())
    }

    /// 设置默认路由 `0.0.0.0/0`，可以反复覆盖。
    pub fn set_default(&mut self, info: RoutingInfo) {
        let key = NetworkAddress::DEFAULT_ROUTE;
        match self.entries.iter_mut().find(|e| e.subnet == key) {
            Some(entry) => entry.info = info,
            None => self.entries.push(RoutingEntry { subnet: key, info }),
        }
    }

    pub fn default_route(&self) -> Option<RoutingInfo> {
        self.entries
            .iter()
            .find(|e| e.subnet == NetworkAddress::DEFAULT_ROUTE)
            .map(|e| e.info)
    }

    pub fn remove(&mut self, subnet: &NetworkAddress) -> Option<RoutingInfo> {
        let key = subnet.network();
        let idx = self.entries.iter().position(|e| e.subnet == key)?;
        Some(self.entries.remove(idx).info)
    }

    /// 最长前缀匹配
    pub fn lookup(&self, destination: &NetworkAddress) -> Result<RoutingInfo> {
        let mut best: Option<&RoutingEntry> = None;
        for entry in &self.entries {
            if !entry.subnet.contains(destination) {
                continue;
            }
            let best = best.get_or_insert(entry);
            if best.subnet.prefix() < entry.subnet.prefix() {
                *best = entry;
            }
        }
        best.map(|e| e.info)
            .ok_or(Error::RoutingMiss(destination.with_prefix(Prefix::HOST)))
    }
}
