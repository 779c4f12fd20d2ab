//! 聊天系统核心领域模型
//!
//! 包含聊天事件、聊天聚合以及投影归约逻辑。事件是唯一的事实来源，
//! 聚合状态完全由事件流折叠得出。

pub mod aggregates;
pub mod errors;
pub mod events;

// 重新导出常用类型
pub use aggregates::*;
pub use errors::*;
pub use events::*;
