//! 标识符类型
//!
//! 节点与网卡（adapter）在 `Network` 中的下标。

use serde::{Deserialize, Serialize};

/// 节点标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// 网卡标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdapterId(pub usize);
