//! 协议流水线
//!
//! 一个有序的协议层序列：下标 0 是最外层（最靠近应用），末尾是最内层（最靠近线路）。
//! 同一个序列同时提供两种访问方式：
//! - 级联变换：`encapsulate` 从外到内依次折叠，`decapsulate` 从内到外依次折叠；
//! - 栈视图：`push`/`pop`/`peek` 操作最内层，供逐跳转发时剥离/替换单层使用。

use tracing::trace;

use crate::addr::Address;
use crate::error::{Error, Result};
use crate::proto::{Codec, LayerKind, LinkCodec, NetworkCodec, Protocol};

/// 构造流水线：按从外到内的顺序添加协议层
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    layers: Vec<Protocol>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_layer(mut self, layer: impl Into<Protocol>) -> Self {
        self.layers.push(layer.into());
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        if self.layers.is_empty() {
            return Err(Error::invalid("a pipeline needs at least one layer"));
        }
        Ok(Pipeline {
            layers: self.layers,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    layers: Vec<Protocol>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// 从外到内列出各层种类
    pub fn kinds(&self) -> Vec<LayerKind> {
        self.layers.iter().map(|l| l.kind()).collect()
    }

    fn check_input(&self, bytes: &[u8]) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::invalid("pipeline has no layers"));
        }
        if bytes.is_empty() {
            return Err(Error::invalid("pipeline input is empty"));
        }
        Ok(())
    }

    /// 从最外层开始逐层封装
    pub fn encapsulate(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.check_input(bytes)?;
        self.layers.iter().try_fold(bytes.to_vec(), |data, layer| {
            trace!(layer = %layer.kind(), len = data.len(), "封装");
            layer.encapsulate(&data)
        })
    }

    /// 从最内层开始逐层解封装
    pub fn decapsulate(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.check_input(bytes)?;
        self.layers.iter().rev().try_fold(bytes.to_vec(), |data, layer| {
            trace!(layer = %layer.kind(), len = data.len(), "解封装");
            layer.decapsulate(&data)
        })
    }

    pub fn push(&mut self, layer: impl Into<Protocol>) {
        self.layers.push(layer.into());
    }

    pub fn pop(&mut self) -> Option<Protocol> {
        self.layers.pop()
    }

    pub fn peek(&self) -> Option<&Protocol> {
        self.layers.last()
    }

    /// 弹出最内层，要求它是 `expected` 类型。类型不符时不修改栈。
    pub fn pop_expect(&mut self, expected: LayerKind) -> Result<Protocol> {
        match self.peek().map(|l| l.kind()) {
            Some(kind) if kind == expected => self.pop().ok_or(Error::ProtocolMismatch {
                expected,
                found: None,
            }),
            found => Err(Error::ProtocolMismatch { expected, found }),
        }
    }

    /// 弹出最内层的网络层
    pub fn pop_network(&mut self) -> Result<NetworkCodec> {
        match self.pop_expect(LayerKind::Network)? {
            Protocol::Network(codec) => Ok(codec),
            other => Err(Error::ProtocolMismatch {
                expected: LayerKind::Network,
                found: Some(other.kind()),
            }),
        }
    }

    /// 弹出最内层的链路层
    pub fn pop_link(&mut self) -> Result<LinkCodec> {
        match self.pop_expect(LayerKind::Link)? {
            Protocol::Link(codec) => Ok(codec),
            other => Err(Error::ProtocolMismatch {
                expected: LayerKind::Link,
                found: Some(other.kind()),
            }),
        }
    }

    /// 找到某一层的实例（取最内侧的那个）
    pub fn layer(&self, kind: LayerKind) -> Result<&Protocol> {
        self.layers
            .iter()
            .rev()
            .find(|l| l.kind() == kind)
            .ok_or(Error::ProtocolMismatch {
                expected: kind,
                found: None,
            })
    }

    /// 不修改状态地从该层原始字节中解析目的地址
    pub fn extract_destination_from(&self, kind: LayerKind, bytes: &[u8]) -> Result<Address> {
        self.layer(kind)?
            .extract_destination(bytes)?
            .ok_or_else(|| Error::invalid(format!("the {kind} layer carries no addresses")))
    }

    /// 不修改状态地从该层原始字节中解析源地址
    pub fn extract_source_from(&self, kind: LayerKind, bytes: &[u8]) -> Result<Address> {
        self.layer(kind)?
            .extract_source(bytes)?
            .ok_or_else(|| Error::invalid(format!("the {kind} layer carries no addresses")))
    }
}
