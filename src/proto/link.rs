//! 链路层编解码：`dst(6) || src(6) || payload`
//!
//! 输入里可能首尾相接地放着多个网络层数据报（例如分片），
//! 每个数据报按它自己的 totalLength 切出来，单独加 12 字节帧头。

use crate::addr::{Address, LinkAddress};
use crate::error::{Error, Result};

use super::network::{datagram_len, split_datagrams};
use super::{Codec, LayerKind};

pub const HEADER_LEN: usize = 12;

/// 帧头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkHeader {
    pub destination: LinkAddress,
    pub source: LinkAddress,
}

impl LinkHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::malformed(LayerKind::Link, "truncated frame header"));
        }
        Ok(LinkHeader {
            destination: LinkAddress::from_bytes(&bytes[0..6])?,
            source: LinkAddress::from_bytes(&bytes[6..12])?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.destination.octets());
        out.extend_from_slice(&self.source.octets());
    }
}

/// 把首尾相接的帧切成独立的切片（每帧 = 帧头 + 一个完整数据报）
pub fn split_frames(bytes: &[u8]) -> Result<Vec<&[u8]>> {
    let mut out = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        if rest.len() < HEADER_LEN {
            return Err(Error::malformed(LayerKind::Link, "truncated frame header"));
        }
        let len = HEADER_LEN + datagram_len(&rest[HEADER_LEN..], LayerKind::Link)?;
        let (frame, tail) = rest.split_at(len);
        out.push(frame);
        rest = tail;
    }
    Ok(out)
}

/// 链路层编解码器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkCodec {
    source: LinkAddress,
    destination: LinkAddress,
}

impl LinkCodec {
    pub fn new(source: LinkAddress, destination: LinkAddress) -> Self {
        Self {
            source,
            destination,
        }
    }

    pub fn source(&self) -> LinkAddress {
        self.source
    }

    pub fn destination(&self) -> LinkAddress {
        self.destination
    }

    /// 为每个数据报单独成帧
    pub fn frames(&self, datagrams: &[u8]) -> Result<Vec<Vec<u8>>> {
        let header = LinkHeader {
            destination: self.destination,
            source: self.source,
        };
        split_datagrams(datagrams, LayerKind::Link)?
            .into_iter()
            .map(|datagram| {
                let mut frame = Vec::with_capacity(HEADER_LEN + datagram.len());
                header.write(&mut frame);
                frame.extend_from_slice(datagram);
                Ok(frame)
            })
            .collect()
    }
}

impl Codec for LinkCodec {
    fn kind(&self) -> LayerKind {
        LayerKind::Link
    }

    fn encapsulate(&self, payload: &[u8]) -> Result<Vec<u8>> {
        if payload.is_empty() {
            return Err(Error::invalid("link payload is empty"));
        }
        Ok(self.frames(payload)?.concat())
    }

    fn decapsulate(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        if bytes.is_empty() {
            return Err(Error::invalid("link input is empty"));
        }
        let mut out = Vec::with_capacity(bytes.len());
        for frame in split_frames(bytes)? {
            out.extend_from_slice(&frame[HEADER_LEN..]);
        }
        Ok(out)
    }

    fn extract_source(&self, bytes: &[u8]) -> Result<Option<Address>> {
        Ok(Some(LinkHeader::parse(bytes)?.source.into()))
    }

    fn extract_destination(&self, bytes: &[u8]) -> Result<Option<Address>> {
        Ok(Some(LinkHeader::parse(bytes)?.destination.into()))
    }
}
