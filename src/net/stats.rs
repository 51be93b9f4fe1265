//! 统计信息
//!
//! 定义网络仿真统计数据结构与丢包原因。

use serde::{Deserialize, Serialize};

/// 丢包原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// TTL 已耗尽
    TtlExpired,
    /// 路由表没有匹配项
    NoRoute,
    /// ARP 表没有下一跳的链路地址
    NoLinkAddress,
    /// 目的地址不属于本节点，且本节点不转发
    NotLocal,
    /// 发给没有应用的节点（路由器自身）
    NoApplication,
}

/// 网络统计信息
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub delivered_msgs: u64,
    pub delivered_bytes: u64,
    pub frames_sent: u64,
    pub frames_filtered: u64,
    pub ttl_drops: u64,
    pub no_route_drops: u64,
    pub no_link_address_drops: u64,
    pub not_local_drops: u64,
    pub no_application_drops: u64,
    /// 由调度事件发起、但以错误结束的发送
    pub failed_sends: u64,
}

impl Stats {
    pub(crate) fn count_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::TtlExpired => self.ttl_drops += 1,
            DropReason::NoRoute => self.no_route_drops += 1,
            DropReason::NoLinkAddress => self.no_link_address_drops += 1,
            DropReason::NotLocal => self.not_local_drops += 1,
            DropReason::NoApplication => self.no_application_drops += 1,
        }
    }

    pub fn total_drops(&self) -> u64 {
        self.ttl_drops
            + self.no_route_drops
            + self.no_link_address_drops
            + self.not_local_drops
            + self.no_application_drops
    }
}
