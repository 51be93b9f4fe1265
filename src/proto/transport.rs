//! 传输层（UDP 类）编解码：分段与按序号重组
//!
//! 段头 8 字节：`srcPort:16 | dstPort:16 | sequence:16 | lengthBits:16`，
//! 其中 `lengthBits = (8 + 载荷长度) * 8`。

use tracing::trace;

use crate::addr::{Address, Port};
use crate::error::{Error, Result};

use super::{Codec, LayerKind};

pub const HEADER_LEN: usize = 8;
/// 保证 `lengthBits` 不超过 16 位
pub const MAX_MSS: usize = u16::MAX as usize / 8 - HEADER_LEN;
const MAX_SEGMENTS: usize = u16::MAX as usize + 1;

/// 段头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    pub source: Port,
    pub destination: Port,
    pub sequence: u16,
    pub length_bits: u16,
}

impl SegmentHeader {
    /// 解析段头，并校验 `lengthBits` 与剩余字节。
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let malformed = |reason: &str| Error::malformed(LayerKind::Transport, reason);
        if bytes.len() < HEADER_LEN {
            return Err(malformed("truncated segment header"));
        }
        let header = SegmentHeader {
            source: Port::new(u16::from_be_bytes([bytes[0], bytes[1]])),
            destination: Port::new(u16::from_be_bytes([bytes[2], bytes[3]])),
            sequence: u16::from_be_bytes([bytes[4], bytes[5]]),
            length_bits: u16::from_be_bytes([bytes[6], bytes[7]]),
        };
        if header.length_bits % 8 != 0 {
            return Err(malformed("length in bits is not a whole number of bytes"));
        }
        if header.total_len() < HEADER_LEN {
            return Err(malformed("declared length smaller than the header"));
        }
        if header.total_len() > bytes.len() {
            return Err(malformed("declared payload exceeds remaining bytes"));
        }
        Ok(header)
    }

    /// 段的总字节数（含头）
    pub fn total_len(&self) -> usize {
        self.length_bits as usize / 8
    }

    pub fn payload_len(&self) -> usize {
        self.total_len() - HEADER_LEN
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.source.to_bytes());
        out.extend_from_slice(&self.destination.to_bytes());
        out.extend_from_slice(&self.sequence.to_be_bytes());
        out.extend_from_slice(&self.length_bits.to_be_bytes());
    }
}

/// 传输层编解码器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportCodec {
    source: Port,
    destination: Port,
    mss: usize,
}

impl TransportCodec {
    pub fn new(source: Port, destination: Port, mss: usize) -> Result<Self> {
        if mss == 0 || mss > MAX_MSS {
            return Err(Error::invalid(format!("MSS {mss} is outside 1..={MAX_MSS}")));
        }
        Ok(Self {
            source,
            destination,
            mss,
        })
    }

    pub fn source(&self) -> Port {
        self.source
    }

    pub fn destination(&self) -> Port {
        self.destination
    }

    pub fn mss(&self) -> usize {
        self.mss
    }

    /// 逐段解析：返回 (段头, 载荷) 列表，保持到达顺序。
    pub fn segments<'a>(&self, bytes: &'a [u8]) -> Result<Vec<(SegmentHeader, &'a [u8])>> {
        let mut out = Vec::new();
        let mut rest = bytes;
        while !rest.is_empty() {
            let header = SegmentHeader::parse(rest)?;
            let (segment, tail) = rest.split_at(header.total_len());
            out.push((header, &segment[HEADER_LEN..]));
            rest = tail;
        }
        Ok(out)
    }
}

impl Codec for TransportCodec {
    fn kind(&self) -> LayerKind {
        LayerKind::Transport
    }

    fn encapsulate(&self, payload: &[u8]) -> Result<Vec<u8>> {
        if payload.is_empty() {
            return Err(Error::invalid("transport payload is empty"));
        }
        let count = payload.len().div_ceil(self.mss);
        if count > MAX_SEGMENTS {
            return Err(Error::invalid(format!(
                "{count} segments exceed the 16-bit sequence space"
            )));
        }

        let mut out = Vec::with_capacity(payload.len() + count * HEADER_LEN);
        for (seq, chunk) in payload.chunks(self.mss).enumerate() {
            SegmentHeader {
                source: self.source,
                destination: self.destination,
                sequence: seq as u16,
                length_bits: ((HEADER_LEN + chunk.len()) * 8) as u16,
            }
            .write(&mut out);
            out.extend_from_slice(chunk);
        }
        trace!(payload_len = payload.len(), mss = self.mss, segments = count, "传输层分段");
        Ok(out)
    }

    fn decapsulate(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        if bytes.is_empty() {
            return Err(Error::invalid("transport input is empty"));
        }
        let mut segments = self.segments(bytes)?;
        // 到达顺序不可信，按序号排序后拼接
        segments.sort_by_key(|(header, _)| header.sequence);
        Ok(segments.into_iter().flat_map(|(_, data)| data.iter().copied()).collect())
    }

    fn extract_source(&self, bytes: &[u8]) -> Result<Option<Address>> {
        Ok(Some(SegmentHeader::parse(bytes)?.source.into()))
    }

    fn extract_destination(&self, bytes: &[u8]) -> Result<Option<Address>> {
        Ok(Some(SegmentHeader::parse(bytes)?.destination.into()))
    }
}
