//! 聊天事件模型
//!
//! 事件以 JSON 编码，`eventType` 字段作为类型标签。解码分两步：
//! 先通用地读出标签，再对具体变体做完整解码，未知标签保留为独立错误。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::EventError;

/// 聊天领域事件
///
/// 封闭的和类型；每个变体都携带聊天标识符。事件一经创建不可变，
/// 是聊天状态的追加式事实来源。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum ChatEvent {
    /// 聊天被创建
    #[serde(rename = "ChatStartedEvent", rename_all = "camelCase")]
    ChatStarted { chat_id: String },

    /// 参与者加入聊天
    #[serde(rename = "ChatJoinedEvent", rename_all = "camelCase")]
    ChatJoined {
        chat_id: String,
        sender_id: String,
        name: String,
        joined_at: DateTime<Utc>,
    },

    /// 消息被发送
    #[serde(rename = "ChatMessageSentEvent", rename_all = "camelCase")]
    ChatMessageSent {
        chat_id: String,
        message_id: String,
        sender_id: String,
        content: String,
        sent_at: DateTime<Utc>,
    },

    /// 参与者开始输入
    #[serde(rename = "ChatMessageStartedEvent", rename_all = "camelCase")]
    ChatMessageStarted { chat_id: String, sender_id: String },

    /// 参与者停止输入
    #[serde(rename = "ChatMessageStoppedEvent", rename_all = "camelCase")]
    ChatMessageStopped { chat_id: String, sender_id: String },

    /// 参与者选择显示名称
    #[serde(rename = "NameChosenEvent", rename_all = "camelCase")]
    NameChosen {
        chat_id: String,
        sender_id: String,
        chosen_name: String,
    },
}

impl ChatEvent {
    pub const CHAT_STARTED: &'static str = "ChatStartedEvent";
    pub const CHAT_JOINED: &'static str = "ChatJoinedEvent";
    pub const CHAT_MESSAGE_SENT: &'static str = "ChatMessageSentEvent";
    pub const CHAT_MESSAGE_STARTED: &'static str = "ChatMessageStartedEvent";
    pub const CHAT_MESSAGE_STOPPED: &'static str = "ChatMessageStoppedEvent";
    pub const NAME_CHOSEN: &'static str = "NameChosenEvent";

    /// 返回事件的类型标签
    pub fn event_type(&self) -> &'static str {
        match self {
            ChatEvent::ChatStarted { .. } => Self::CHAT_STARTED,
            ChatEvent::ChatJoined { .. } => Self::CHAT_JOINED,
            ChatEvent::ChatMessageSent { .. } => Self::CHAT_MESSAGE_SENT,
            ChatEvent::ChatMessageStarted { .. } => Self::CHAT_MESSAGE_STARTED,
            ChatEvent::ChatMessageStopped { .. } => Self::CHAT_MESSAGE_STOPPED,
            ChatEvent::NameChosen { .. } => Self::NAME_CHOSEN,
        }
    }

    /// 返回事件所属的聊天标识符
    pub fn chat_id(&self) -> &str {
        match self {
            ChatEvent::ChatStarted { chat_id }
            | ChatEvent::ChatJoined { chat_id, .. }
            | ChatEvent::ChatMessageSent { chat_id, .. }
            | ChatEvent::ChatMessageStarted { chat_id, .. }
            | ChatEvent::ChatMessageStopped { chat_id, .. }
            | ChatEvent::NameChosen { chat_id, .. } => chat_id,
        }
    }

    /// 语法校验：聊天标识符必须是合法的 UUID
    ///
    /// 不做跨事件一致性检查，比如 `ChatJoined` 不要求先出现过 `ChatStarted`。
    pub fn validate(&self) -> Result<(), EventError> {
        let chat_id = self.chat_id();
        if Uuid::parse_str(chat_id).is_err() {
            return Err(EventError::InvalidChatId {
                value: chat_id.to_string(),
            });
        }
        Ok(())
    }

    /// 校验事件正是预期的变体，供只接受单一事件类型的命令入口使用
    pub fn ensure_type(&self, expected: &str) -> Result<(), EventError> {
        if self.event_type() != expected {
            return Err(EventError::invalid_event_type(expected, self.event_type()));
        }
        Ok(())
    }

    /// 序列化为 JSON 字节
    pub fn to_bytes(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(|err| EventError::malformed(err.to_string()))
    }

    /// 从 JSON 字节反序列化
    ///
    /// 第一步只读类型标签，第二步按标签解码完整负载。
    pub fn from_bytes(payload: &[u8]) -> Result<Self, EventError> {
        #[derive(Deserialize)]
        struct TagProbe {
            #[serde(rename = "eventType")]
            event_type: String,
        }

        let probe: TagProbe = serde_json::from_slice(payload)
            .map_err(|err| EventError::malformed(err.to_string()))?;

        match probe.event_type.as_str() {
            Self::CHAT_STARTED
            | Self::CHAT_JOINED
            | Self::CHAT_MESSAGE_SENT
            | Self::CHAT_MESSAGE_STARTED
            | Self::CHAT_MESSAGE_STOPPED
            | Self::NAME_CHOSEN => serde_json::from_slice(payload)
                .map_err(|err| EventError::malformed(err.to_string())),
            _ => Err(EventError::UnknownEventType {
                tag: probe.event_type,
            }),
        }
    }
}

/// 事件信封：只解码类型标签和聊天标识符两个字段
///
/// 扇出快速路径用它做轻量预扫描，避免完整解码整个变体。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_type: String,
    pub chat_id: String,
}

impl EventEnvelope {
    /// 从原始负载中预读信封字段
    pub fn peek(payload: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(payload).map_err(|err| EventError::malformed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat_id() -> String {
        Uuid::new_v4().to_string()
    }

    #[test]
    fn message_sent_round_trips_through_wire_format() {
        let event = ChatEvent::ChatMessageSent {
            chat_id: chat_id(),
            message_id: Uuid::new_v4().to_string(),
            sender_id: Uuid::new_v4().to_string(),
            content: "hello".to_string(),
            sent_at: Utc::now(),
        };

        let bytes = event.to_bytes().unwrap();
        let decoded = ChatEvent::from_bytes(&bytes).unwrap();
        assert_eq!(event, decoded);

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["eventType"], "ChatMessageSentEvent");
        assert!(value["chatId"].is_string());
        assert!(value["messageId"].is_string());
        assert!(value["sentAt"].is_string());
    }

    #[test]
    fn unknown_tag_is_reported_distinctly() {
        let payload = format!(r#"{{"eventType":"ChatArchivedEvent","chatId":"{}"}}"#, chat_id());
        let err = ChatEvent::from_bytes(payload.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            EventError::UnknownEventType {
                tag: "ChatArchivedEvent".to_string()
            }
        );
    }

    #[test]
    fn structural_decode_failure_is_malformed_payload() {
        // 标签合法但缺少必填字段
        let payload = br#"{"eventType":"ChatMessageSentEvent","chatId":"abc"}"#;
        assert!(matches!(
            ChatEvent::from_bytes(payload),
            Err(EventError::MalformedPayload { .. })
        ));

        // 完全不是 JSON
        assert!(matches!(
            ChatEvent::from_bytes(b"not json"),
            Err(EventError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn validate_rejects_non_uuid_chat_id() {
        let event = ChatEvent::ChatStarted {
            chat_id: "not-a-uuid".to_string(),
        };
        assert_eq!(
            event.validate(),
            Err(EventError::InvalidChatId {
                value: "not-a-uuid".to_string()
            })
        );

        let event = ChatEvent::ChatStarted { chat_id: chat_id() };
        assert!(event.validate().is_ok());
    }

    #[test]
    fn ensure_type_rejects_mismatched_variant() {
        let event = ChatEvent::ChatMessageStopped {
            chat_id: chat_id(),
            sender_id: Uuid::new_v4().to_string(),
        };
        assert!(event.ensure_type(ChatEvent::CHAT_MESSAGE_STOPPED).is_ok());
        assert_eq!(
            event.ensure_type(ChatEvent::CHAT_MESSAGE_STARTED),
            Err(EventError::invalid_event_type(
                ChatEvent::CHAT_MESSAGE_STARTED,
                ChatEvent::CHAT_MESSAGE_STOPPED,
            ))
        );
    }

    #[test]
    fn envelope_peek_reads_tag_and_chat_without_full_decode() {
        let id = chat_id();
        // 信封预扫描不关心变体字段是否完整
        let payload = format!(r#"{{"eventType":"ChatMessageSentEvent","chatId":"{id}"}}"#);
        let envelope = EventEnvelope::peek(payload.as_bytes()).unwrap();
        assert_eq!(envelope.event_type, "ChatMessageSentEvent");
        assert_eq!(envelope.chat_id, id);

        assert!(EventEnvelope::peek(b"{\"eventType\":1}").is_err());
    }
}
