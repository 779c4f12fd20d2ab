//! 聚合与投影
//!
//! 把有序事件流折叠为可查询的聊天状态。

pub mod chats;

pub use chats::*;
