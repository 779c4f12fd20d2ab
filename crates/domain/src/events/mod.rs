//! 聊天领域事件
//!
//! 定义事件日志上流转的全部事件变体及其编解码规则。

pub mod chat_event;

pub use chat_event::*;
