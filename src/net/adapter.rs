//! 网卡（Adapter）
//!
//! 点对点网卡：按名字 + 链路地址标识，持有 MTU、up/down 状态、混杂模式标志，
//! 以及收/发两个临时缓冲区。发送分两步：`collect` 缓存数据报，`transmit` 成帧并清空缓冲；
//! 物理投递到对端由 `Network` 完成。

use tracing::{debug, trace};

use crate::addr::LinkAddress;
use crate::error::{Error, Result};
use crate::proto::link::{split_frames, HEADER_LEN};
use crate::proto::network::split_datagrams;
use crate::proto::{LayerKind, LinkCodec, LinkHeader};

use super::id::{AdapterId, NodeId};

/// 网卡计数器
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AdapterCounters {
    pub tx_frames: u64,
    pub rx_frames: u64,
    pub filtered_frames: u64,
}

#[derive(Debug)]
pub struct Adapter {
    id: AdapterId,
    owner: NodeId,
    name: String,
    mac: LinkAddress,
    mtu: usize,
    up: bool,
    promiscuous: bool,
    peer: Option<AdapterId>,
    outbound: Vec<Vec<u8>>,
    inbound: Vec<Vec<u8>>,
    counters: AdapterCounters,
}

impl Adapter {
    pub fn new(
        id: AdapterId,
        owner: NodeId,
        name: impl Into<String>,
        mac: LinkAddress,
        mtu: usize,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid("adapter name is empty"));
        }
        if mtu <= crate::proto::network::MIN_HEADER_LEN || mtu > u16::MAX as usize {
            return Err(Error::invalid(format!("adapter {name}: MTU {mtu} is out of range")));
        }
        Ok(Self {
            id,
            owner,
            name,
            mac,
            mtu,
            up: true,
            promiscuous: false,
            peer: None,
            outbound: Vec::new(),
            inbound: Vec::new(),
            counters: AdapterCounters::default(),
        })
    }

    pub fn id(&self) -> AdapterId {
        self.id
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mac(&self) -> LinkAddress {
        self.mac
    }

    pub fn mtu(&self) -> usize {
        self.mtu
    }

    pub fn is_up(&self) -> bool {
        self.up
    }

    pub fn set_up(&mut self, up: bool) {
        self.up = up;
    }

    pub fn is_promiscuous(&self) -> bool {
        self.promiscuous
    }

    pub fn set_promiscuous(&mut self, promiscuous: bool) {
        self.promiscuous = promiscuous;
    }

    pub fn peer(&self) -> Option<AdapterId> {
        self.peer
    }

    pub(crate) fn set_peer(&mut self, peer: AdapterId) {
        self.peer = Some(peer);
    }

    pub fn counters(&self) -> AdapterCounters {
        self.counters
    }

    /// 尚未发送的数据报个数
    pub fn pending_outbound(&self) -> usize {
        self.outbound.len()
    }

    /// 已接收、尚未 release 的帧个数
    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    fn ensure_up(&self) -> Result<()> {
        if self.up {
            Ok(())
        } else {
            Err(Error::AdapterDown(self.name.clone()))
        }
    }

    /// 第一步：缓存待发送的数据报（可能首尾相接的多个）。
    ///
    /// 按每个数据报自带的 totalLength 切分；超过 MTU 的数据报报错。
    pub fn collect(&mut self, datagrams: &[u8]) -> Result<usize> {
        self.ensure_up()?;
        if datagrams.is_empty() {
            return Err(Error::invalid("nothing to collect"));
        }
        let pieces = split_datagrams(datagrams, LayerKind::Link)?;
        if let Some(big) = pieces.iter().find(|d| d.len() > self.mtu) {
            return Err(Error::Capacity {
                mtu: self.mtu,
                needed: big.len(),
            });
        }
        let count = pieces.len();
        self.outbound.extend(pieces.into_iter().map(<[u8]>::to_vec));
        trace!(adapter = %self.name, collected = count, "缓存待发送数据报");
        Ok(count)
    }

    /// 能否发送：网卡 up 且已连到对端
    pub fn ensure_ready(&self) -> Result<()> {
        self.ensure_up()?;
        if self.peer.is_none() {
            return Err(Error::NotLinked(self.name.clone()));
        }
        Ok(())
    }

    /// 第二步：用 `link` 为缓存的数据报逐个成帧，清空发送缓冲，返回首尾相接的帧。
    ///
    /// 任何失败都会丢弃发送缓冲，下一次发送不会带上这次的数据报。
    pub fn transmit(&mut self, link: &LinkCodec) -> Result<Vec<u8>> {
        if let Err(err) = self.ensure_ready() {
            let discarded = self.outbound.len();
            self.outbound.clear();
            debug!(adapter = %self.name, discarded, error = %err, "无法发送，丢弃发送缓冲");
            return Err(err);
        }
        let mut wire = Vec::new();
        let mut frames = 0;
        for datagram in self.outbound.drain(..) {
            for frame in link.frames(&datagram)? {
                wire.extend_from_slice(&frame);
                frames += 1;
            }
        }
        self.counters.tx_frames += frames;
        debug!(adapter = %self.name, frames, bytes = wire.len(), "发送帧");
        Ok(wire)
    }

    /// 帧是否应当被本网卡接收
    pub fn accepts(&self, header: &LinkHeader) -> bool {
        self.promiscuous || header.destination == self.mac || header.destination.is_broadcast()
    }

    /// 按目的链路地址过滤首尾相接的帧，返回被接收的帧（帧头保留）。
    ///
    /// 不匹配的帧被静默丢弃，只计数。
    pub fn filter(&mut self, frames: &[u8]) -> Result<Vec<u8>> {
        self.ensure_up()?;
        let mut accepted = Vec::with_capacity(frames.len());
        for frame in split_frames(frames)? {
            let header = LinkHeader::parse(frame)?;
            if self.accepts(&header) {
                self.counters.rx_frames += 1;
                accepted.extend_from_slice(frame);
            } else {
                self.counters.filtered_frames += 1;
                trace!(
                    adapter = %self.name,
                    destination = %header.destination,
                    "目的地址不匹配，丢弃帧"
                );
            }
        }
        Ok(accepted)
    }

    /// 接收：过滤后去掉帧头，把数据报放进接收缓冲。返回接收的帧数。
    pub fn receive(&mut self, frames: &[u8]) -> Result<usize> {
        let accepted = self.filter(frames)?;
        if accepted.is_empty() {
            return Ok(0);
        }
        let mut count = 0;
        for frame in split_frames(&accepted)? {
            self.inbound.push(frame[HEADER_LEN..].to_vec());
            count += 1;
        }
        Ok(count)
    }

    /// 取出并拼接接收缓冲中的全部数据报
    pub fn release(&mut self) -> Vec<u8> {
        self.inbound.drain(..).flatten().collect()
    }
}
