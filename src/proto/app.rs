//! 应用层编解码：每个载荷一行聊天消息，UTF-8 的 `name: message`

use crate::error::{Error, Result};

use super::{Codec, LayerKind};

const SEPARATOR: &str = ": ";

/// 给聊天消息加上发送者名字
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppCodec {
    name: String,
}

impl AppCodec {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid("sender name is empty"));
        }
        if name.contains(SEPARATOR) {
            return Err(Error::invalid(format!("sender name {name:?} contains {SEPARATOR:?}")));
        }
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 把一行拆成 `(name, message)`
    pub fn split(bytes: &[u8]) -> Result<(&str, &str)> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::malformed(LayerKind::Application, "line is not valid UTF-8"))?;
        text.split_once(SEPARATOR)
            .ok_or_else(|| Error::malformed(LayerKind::Application, "missing `name: ` prefix"))
    }

    /// 取出一行里的发送者名字
    pub fn sender(bytes: &[u8]) -> Result<String> {
        Self::split(bytes).map(|(name, _)| name.to_string())
    }
}

impl Codec for AppCodec {
    fn kind(&self) -> LayerKind {
        LayerKind::Application
    }

    fn encapsulate(&self, payload: &[u8]) -> Result<Vec<u8>> {
        if payload.is_empty() {
            return Err(Error::invalid("message is empty"));
        }
        if std::str::from_utf8(payload).is_err() {
            return Err(Error::invalid("message is not valid UTF-8"));
        }
        let mut out = Vec::with_capacity(self.name.len() + SEPARATOR.len() + payload.len());
        out.extend_from_slice(self.name.as_bytes());
        out.extend_from_slice(SEPARATOR.as_bytes());
        out.extend_from_slice(payload);
        Ok(out)
    }

    fn decapsulate(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        if bytes.is_empty() {
            return Err(Error::invalid("application input is empty"));
        }
        Self::split(bytes).map(|(_, message)| message.as_bytes().to_vec())
    }
}
