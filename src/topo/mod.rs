//! 拓扑描述与组装

pub mod build;
pub mod chat;
pub mod spec;

pub use build::{Built, build};
pub use chat::{ChatOpts, chat_pipeline, chat_topology};
pub use spec::TopologySpec;
