//! 领域模型错误定义

use thiserror::Error;

/// 事件模型错误类型
///
/// 校验和编解码都是纯语法层面的检查，不做跨事件一致性判断。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventError {
    /// 事件类型标签与预期变体不符
    #[error("Invalid event type: expected {expected}, got {actual}")]
    InvalidEventType { expected: String, actual: String },

    /// 聊天标识符不是合法的 UUID
    #[error("Invalid chat id: {value}")]
    InvalidChatId { value: String },

    /// 未定义的事件类型标签
    #[error("Undefined event type: {tag}")]
    UnknownEventType { tag: String },

    /// 负载结构解码失败
    #[error("Malformed event payload: {reason}")]
    MalformedPayload { reason: String },
}

impl EventError {
    /// 创建类型不符错误
    pub fn invalid_event_type(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidEventType {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// 创建负载解码错误
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }
}
