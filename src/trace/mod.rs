//! 帧级事件记录（结构化 JSON）
//!
//! 每次发送、过滤、丢包、交付都记一条事件，仿真结束后整体写成 JSON 文件，
//! 不必解析文本日志。

mod types;

pub use types::{TraceAdapterInfo, TraceEvent, TraceEventKind, TraceLog, TraceNodeInfo};
