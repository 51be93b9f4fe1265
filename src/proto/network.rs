//! 网络层（IPv4 类）编解码：分片与重组
//!
//! 报头布局（网络字节序）：
//! `version:4|IHL:4 | TOS:8 | totalLength:16 | identification:16 | flags:3|fragOffset:13 |
//!  ttl:8 | protocol:8 | checksum:16 | src:32 | dst:32 | [options...]`
//!
//! 校验和字段保留但不计算、不校验。

use tracing::{debug, trace};

use crate::addr::{Address, NetworkAddress};
use crate::error::{Error, Result};

use super::{Codec, LayerKind};

/// 不含选项的报头长度
pub const MIN_HEADER_LEN: usize = 20;
/// 分片偏移的单位（字节）
pub const FRAGMENT_UNIT: usize = 8;
/// flags 字段中的 “more fragments” 位（`moreFragments << 1`）
pub const FLAG_MORE_FRAGMENTS: u8 = 0b010;
pub const MAX_OPTIONS_LEN: usize = 40;
pub const DEFAULT_TTL: u8 = 64;
pub const DEFAULT_MTU: usize = 1500;
/// 上层协议号：本仿真里的传输层（UDP 类）
pub const PROTOCOL_TRANSPORT: u8 = 17;

const VERSION: u8 = 4;
const FRAGMENT_OFFSET_MASK: u16 = 0x1fff;
const MAX_FRAGMENT_OFFSET: usize = FRAGMENT_OFFSET_MASK as usize;

/// 一个已解析的网络层报头
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkHeader {
    /// 报头长度（以 4 字节为单位）
    pub ihl: u8,
    pub tos: u8,
    /// 报头 + 数据的总长度（字节）
    pub total_length: u16,
    pub identification: u16,
    /// 3 位 flags
    pub flags: u8,
    /// 13 位分片偏移（以 8 字节为单位）
    pub fragment_offset: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub source: NetworkAddress,
    pub destination: NetworkAddress,
    pub options: Vec<u8>,
}

impl NetworkHeader {
    /// 解析 `bytes` 开头的报头，并确认声明的长度都落在 `bytes` 之内。
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let malformed = |reason: &str| Error::malformed(LayerKind::Network, reason);

        let first = *bytes.first().ok_or_else(|| malformed("empty datagram"))?;
        if first >> 4 != VERSION {
            return Err(malformed("version is not 4"));
        }
        let ihl = first & 0x0f;
        let header_len = ihl as usize * 4;
        if header_len < MIN_HEADER_LEN {
            return Err(malformed("header length below 20 bytes"));
        }
        if header_len > bytes.len() {
            return Err(malformed("header length exceeds remaining bytes"));
        }

        let total_length = u16::from_be_bytes([bytes[2], bytes[3]]);
        if (total_length as usize) < header_len {
            return Err(malformed("total length shorter than header"));
        }
        if total_length as usize > bytes.len() {
            return Err(malformed("total length exceeds remaining bytes"));
        }

        let flags_and_offset = u16::from_be_bytes([bytes[6], bytes[7]]);
        Ok(NetworkHeader {
            ihl,
            tos: bytes[1],
            total_length,
            identification: u16::from_be_bytes([bytes[4], bytes[5]]),
            flags: (flags_and_offset >> 13) as u8,
            fragment_offset: flags_and_offset & FRAGMENT_OFFSET_MASK,
            ttl: bytes[8],
            protocol: bytes[9],
            source: NetworkAddress::host([bytes[12], bytes[13], bytes[14], bytes[15]]),
            destination: NetworkAddress::host([bytes[16], bytes[17], bytes[18], bytes[19]]),
            options: bytes[MIN_HEADER_LEN..header_len].to_vec(),
        })
    }

    pub fn header_len(&self) -> usize {
        self.ihl as usize * 4
    }

    pub fn more_fragments(&self) -> bool {
        self.flags & FLAG_MORE_FRAGMENTS != 0
    }

    pub fn fragment_offset_bytes(&self) -> usize {
        self.fragment_offset as usize * FRAGMENT_UNIT
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.push((VERSION << 4) | (self.ihl & 0x0f));
        out.push(self.tos);
        out.extend_from_slice(&self.total_length.to_be_bytes());
        out.extend_from_slice(&self.identification.to_be_bytes());
        let flags_and_offset =
            ((self.flags as u16 & 0b111) << 13) | (self.fragment_offset & FRAGMENT_OFFSET_MASK);
        out.extend_from_slice(&flags_and_offset.to_be_bytes());
        out.push(self.ttl);
        out.push(self.protocol);
        // 校验和：不计算
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&self.source.octets());
        out.extend_from_slice(&self.destination.octets());
        out.extend_from_slice(&self.options);
    }
}

/// 读取 `bytes` 开头那个数据报声明的总长度，并确认它完整地落在 `bytes` 内。
///
/// 用于在链路层切分首尾相接的多个数据报；`layer` 仅用于错误归属。
pub(crate) fn datagram_len(bytes: &[u8], layer: LayerKind) -> Result<usize> {
    if bytes.len() < 4 {
        return Err(Error::malformed(layer, "truncated datagram length field"));
    }
    let total = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
    if total < MIN_HEADER_LEN {
        return Err(Error::malformed(layer, "datagram shorter than a header"));
    }
    if total > bytes.len() {
        return Err(Error::malformed(layer, "datagram length exceeds remaining bytes"));
    }
    Ok(total)
}

/// 把首尾相接的数据报切成独立的切片
pub(crate) fn split_datagrams(bytes: &[u8], layer: LayerKind) -> Result<Vec<&[u8]>> {
    let mut out = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        let len = datagram_len(rest, layer)?;
        let (datagram, tail) = rest.split_at(len);
        out.push(datagram);
        rest = tail;
    }
    Ok(out)
}

/// 网络层编解码器
///
/// 一旦构造完成就不再原地修改：`with_*` 系列方法返回新的实例，
/// 路由器递减 TTL 时用的也是这种“替换”方式。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkCodec {
    source: NetworkAddress,
    destination: NetworkAddress,
    tos: u8,
    identification: u16,
    flags: u8,
    ttl: u8,
    protocol: u8,
    options: Vec<u8>,
    mtu: usize,
}

impl NetworkCodec {
    pub fn new(source: NetworkAddress, destination: NetworkAddress) -> Self {
        Self {
            source,
            destination,
            tos: 0,
            identification: 0,
            flags: 0,
            ttl: DEFAULT_TTL,
            protocol: PROTOCOL_TRANSPORT,
            options: Vec::new(),
            mtu: DEFAULT_MTU,
        }
    }

    pub fn with_ttl(self, ttl: u8) -> Self {
        Self { ttl, ..self }
    }

    pub fn with_tos(self, tos: u8) -> Self {
        Self { tos, ..self }
    }

    pub fn with_identification(self, identification: u16) -> Self {
        Self {
            identification,
            ..self
        }
    }

    pub fn with_protocol(self, protocol: u8) -> Self {
        Self { protocol, ..self }
    }

    /// flags 只有 3 位（0..=7）
    pub fn with_flags(self, flags: u8) -> Result<Self> {
        if flags > 0b111 {
            return Err(Error::invalid(format!("flags {flags} do not fit in 3 bits")));
        }
        Ok(Self { flags, ..self })
    }

    /// 选项字节补零到 4 字节边界，最多 40 字节。
    pub fn with_options(self, mut options: Vec<u8>) -> Result<Self> {
        while options.len() % 4 != 0 {
            options.push(0);
        }
        if options.len() > MAX_OPTIONS_LEN {
            return Err(Error::invalid(format!(
                "{} option bytes exceed the {MAX_OPTIONS_LEN}-byte limit",
                options.len()
            )));
        }
        let codec = Self { options, ..self };
        codec.check_mtu(codec.mtu)?;
        Ok(codec)
    }

    pub fn with_mtu(self, mtu: usize) -> Result<Self> {
        self.check_mtu(mtu)?;
        Ok(Self { mtu, ..self })
    }

    pub fn source(&self) -> NetworkAddress {
        self.source
    }

    pub fn destination(&self) -> NetworkAddress {
        self.destination
    }

    pub fn ttl(&self) -> u8 {
        self.ttl
    }

    pub fn tos(&self) -> u8 {
        self.tos
    }

    pub fn identification(&self) -> u16 {
        self.identification
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    pub fn mtu(&self) -> usize {
        self.mtu
    }

    pub fn header_len(&self) -> usize {
        MIN_HEADER_LEN + self.options.len()
    }

    fn check_mtu(&self, mtu: usize) -> Result<()> {
        let needed = self.header_len() + 1;
        if mtu < needed {
            return Err(Error::Capacity { mtu, needed });
        }
        if mtu > u16::MAX as usize {
            return Err(Error::invalid(format!("MTU {mtu} exceeds the 16-bit total length")));
        }
        Ok(())
    }

    fn header_for(&self, offset: usize, len: usize, more: bool) -> Result<NetworkHeader> {
        let units = offset / FRAGMENT_UNIT;
        if units > MAX_FRAGMENT_OFFSET {
            // 偏移字段只有 13 位
            return Err(Error::Capacity {
                mtu: self.mtu,
                needed: offset + len,
            });
        }
        let mut flags = self.flags & !FLAG_MORE_FRAGMENTS;
        if more {
            flags |= FLAG_MORE_FRAGMENTS;
        }
        Ok(NetworkHeader {
            ihl: (self.header_len() / 4) as u8,
            tos: self.tos,
            total_length: (self.header_len() + len) as u16,
            identification: self.identification,
            flags,
            fragment_offset: units as u16,
            ttl: self.ttl,
            protocol: self.protocol,
            source: self.source,
            destination: self.destination,
            options: self.options.clone(),
        })
    }

    /// 把 `payload` 切成不超过 MTU 的分片，返回 (报头, 数据) 列表（按偏移排序）。
    ///
    /// 非最后分片的数据长度为 `MTU - headerLen` 向下取整到 8 的倍数；
    /// 剩余数据一旦能放进一个分片就作为最后分片整体发出。
    pub fn fragment<'a>(&self, payload: &'a [u8]) -> Result<Vec<(NetworkHeader, &'a [u8])>> {
        let header_len = self.header_len();
        self.check_mtu(self.mtu)?;
        let room = self.mtu - header_len;
        let unit = room / FRAGMENT_UNIT * FRAGMENT_UNIT;

        let mut fragments = Vec::new();
        let mut offset = 0;
        while payload.len() - offset > room {
            if unit == 0 {
                return Err(Error::Capacity {
                    mtu: self.mtu,
                    needed: header_len + FRAGMENT_UNIT,
                });
            }
            let chunk = &payload[offset..offset + unit];
            fragments.push((self.header_for(offset, chunk.len(), true)?, chunk));
            offset += unit;
        }
        let last = &payload[offset..];
        fragments.push((self.header_for(offset, last.len(), false)?, last));

        trace!(
            payload_len = payload.len(),
            mtu = self.mtu,
            fragments = fragments.len(),
            "网络层分片"
        );
        Ok(fragments)
    }
}

impl Codec for NetworkCodec {
    fn kind(&self) -> LayerKind {
        LayerKind::Network
    }

    fn encapsulate(&self, payload: &[u8]) -> Result<Vec<u8>> {
        if payload.is_empty() {
            return Err(Error::invalid("network payload is empty"));
        }
        let fragments = self.fragment(payload)?;
        let mut out = Vec::with_capacity(payload.len() + fragments.len() * self.header_len());
        for (header, data) in &fragments {
            header.write(&mut out);
            out.extend_from_slice(data);
        }
        Ok(out)
    }

    fn decapsulate(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        if bytes.is_empty() {
            return Err(Error::invalid("network input is empty"));
        }

        let mut fragments: Vec<(usize, &[u8])> = Vec::new();
        let mut rest = bytes;
        while !rest.is_empty() {
            let header = NetworkHeader::parse(rest)?;
            let total = header.total_length as usize;
            fragments.push((header.fragment_offset_bytes(), &rest[header.header_len()..total]));
            rest = &rest[total..];
        }

        fragments.sort_by_key(|(offset, _)| *offset);
        let size = fragments
            .iter()
            .map(|(offset, data)| offset + data.len())
            .max()
            .unwrap_or(0);
        let mut out = vec![0u8; size];
        // 重叠的分片：后写入者覆盖
        for (offset, data) in &fragments {
            out[*offset..*offset + data.len()].copy_from_slice(data);
        }

        debug!(fragments = fragments.len(), reassembled = size, "网络层重组");
        Ok(out)
    }

    fn extract_source(&self, bytes: &[u8]) -> Result<Option<Address>> {
        Ok(Some(NetworkHeader::parse(bytes)?.source.into()))
    }

    fn extract_destination(&self, bytes: &[u8]) -> Result<Option<Address>> {
        Ok(Some(NetworkHeader::parse(bytes)?.destination.into()))
    }
}
