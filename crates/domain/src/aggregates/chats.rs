//! 聊天聚合
//!
//! `Chats` 是进程级投影：从聊天标识符到 `Chat` 的映射，由归约函数
//! `apply` 独占变更。引用未知聊天的事件一律静默丢弃，乱序或迟到的
//! 事件不会让归约崩溃。

use std::collections::HashMap;

use serde::Serialize;

use crate::events::ChatEvent;

/// 聊天消息，追加后不可变
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    #[serde(rename = "messageId")]
    pub message_id: String,
    #[serde(rename = "sender")]
    pub sender_id: String,
    pub content: String,
    #[serde(rename = "sentAt")]
    pub sent_at: chrono::DateTime<chrono::Utc>,
}

/// 聊天成员
///
/// 不按标识符去重：同一参与者重复加入会累积多条记录（重放时可见）。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub sender_id: String,
    pub name: String,
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

/// 聊天聚合状态
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub chat_id: String,
    pub sender_name: String,
    pub sender_id: String,
    pub messages: Vec<Message>,
    pub members: Vec<Member>,
}

impl Chat {
    fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            ..Self::default()
        }
    }
}

/// 进程级投影：聊天标识符到聊天状态的映射
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chats {
    chats: HashMap<String, Chat>,
}

impl Chats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 归约一条事件，总是成功
    ///
    /// `ChatStarted` 会覆盖同标识符的既有聊天，清空其历史。
    /// 输入指示事件不改变投影状态。
    pub fn apply(&mut self, event: &ChatEvent) {
        match event {
            ChatEvent::ChatStarted { chat_id } => {
                self.chats.insert(chat_id.clone(), Chat::new(chat_id));
            }
            ChatEvent::ChatMessageSent {
                chat_id,
                message_id,
                sender_id,
                content,
                sent_at,
            } => {
                let Some(chat) = self.chats.get_mut(chat_id) else {
                    return;
                };
                chat.messages.push(Message {
                    message_id: message_id.clone(),
                    sender_id: sender_id.clone(),
                    content: content.clone(),
                    sent_at: *sent_at,
                });
            }
            ChatEvent::ChatJoined {
                chat_id,
                sender_id,
                name,
                joined_at,
            } => {
                let Some(chat) = self.chats.get_mut(chat_id) else {
                    return;
                };
                chat.members.push(Member {
                    sender_id: sender_id.clone(),
                    name: name.clone(),
                    joined_at: *joined_at,
                });
            }
            ChatEvent::NameChosen {
                chat_id,
                sender_id,
                chosen_name,
            } => {
                let Some(chat) = self.chats.get_mut(chat_id) else {
                    return;
                };
                chat.sender_name = chosen_name.clone();
                chat.sender_id = sender_id.clone();
            }
            ChatEvent::ChatMessageStarted { .. } | ChatEvent::ChatMessageStopped { .. } => {}
        }
    }

    pub fn get(&self, chat_id: &str) -> Option<&Chat> {
        self.chats.get(chat_id)
    }

    pub fn has(&self, chat_id: &str) -> bool {
        self.chats.contains_key(chat_id)
    }

    /// 判断某个显示名称是否已被占用
    ///
    /// 对所有聊天的成员名和聊天级显示名做线性扫描。成员总量与进程
    /// 生命周期绑定且规模很小，数据量上来之后需要换成倒排索引。
    pub fn has_name(&self, name: &str) -> bool {
        self.chats.values().any(|chat| {
            chat.sender_name == name || chat.members.iter().any(|member| member.name == name)
        })
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn started(chat_id: &str) -> ChatEvent {
        ChatEvent::ChatStarted {
            chat_id: chat_id.to_string(),
        }
    }

    fn joined(chat_id: &str, sender_id: &str, name: &str) -> ChatEvent {
        ChatEvent::ChatJoined {
            chat_id: chat_id.to_string(),
            sender_id: sender_id.to_string(),
            name: name.to_string(),
            joined_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn sent(chat_id: &str, message_id: &str, sender_id: &str, content: &str) -> ChatEvent {
        ChatEvent::ChatMessageSent {
            chat_id: chat_id.to_string(),
            message_id: message_id.to_string(),
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            sent_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 1, 0).unwrap(),
        }
    }

    #[test]
    fn message_before_chat_started_is_dropped() {
        let mut chats = Chats::new();
        chats.apply(&sent("c1", "m1", "u1", "hi"));
        assert!(!chats.has("c1"));
        assert!(chats.is_empty());
    }

    #[test]
    fn replay_is_deterministic() {
        let sequence = vec![
            started("c1"),
            joined("c1", "u1", "Alice"),
            sent("c1", "m1", "u1", "hi"),
            ChatEvent::NameChosen {
                chat_id: "c1".to_string(),
                sender_id: "u1".to_string(),
                chosen_name: "Alice".to_string(),
            },
        ];

        let mut first = Chats::new();
        let mut second = Chats::new();
        for event in &sequence {
            first.apply(event);
        }
        for event in &sequence {
            second.apply(event);
        }
        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_chat_started_resets_history() {
        let mut chats = Chats::new();
        chats.apply(&started("c1"));
        chats.apply(&joined("c1", "u1", "Alice"));
        chats.apply(&sent("c1", "m1", "u1", "hi"));

        // 第二条 ChatStarted 覆盖整个聊天，而不是幂等忽略
        chats.apply(&started("c1"));
        let chat = chats.get("c1").unwrap();
        assert!(chat.messages.is_empty());
        assert!(chat.members.is_empty());
        assert_eq!(chat.sender_name, "");
    }

    #[test]
    fn duplicate_members_accumulate() {
        let mut chats = Chats::new();
        chats.apply(&started("c1"));
        chats.apply(&joined("c1", "u1", "Alice"));
        chats.apply(&joined("c1", "u1", "Alice"));
        assert_eq!(chats.get("c1").unwrap().members.len(), 2);
    }

    #[test]
    fn has_name_scans_members_and_display_names() {
        let mut chats = Chats::new();
        chats.apply(&started("c1"));
        chats.apply(&started("c2"));
        chats.apply(&joined("c1", "u1", "Alice"));
        chats.apply(&ChatEvent::NameChosen {
            chat_id: "c2".to_string(),
            sender_id: "u2".to_string(),
            chosen_name: "Bob".to_string(),
        });

        assert!(chats.has_name("Alice"));
        assert!(chats.has_name("Bob"));
        assert!(!chats.has_name("alice"));
        assert!(!chats.has_name("Carol"));
    }

    #[test]
    fn typing_events_do_not_mutate_state() {
        let mut chats = Chats::new();
        chats.apply(&started("c1"));
        let before = chats.clone();
        chats.apply(&ChatEvent::ChatMessageStarted {
            chat_id: "c1".to_string(),
            sender_id: "u1".to_string(),
        });
        chats.apply(&ChatEvent::ChatMessageStopped {
            chat_id: "c1".to_string(),
            sender_id: "u1".to_string(),
        });
        assert_eq!(chats, before);
    }

    #[test]
    fn full_scenario_builds_expected_chat() {
        let mut chats = Chats::new();
        chats.apply(&started("c1"));
        chats.apply(&joined("c1", "u1", "Alice"));
        chats.apply(&sent("c1", "m1", "u1", "hi"));

        let chat = chats.get("c1").unwrap();
        assert_eq!(chat.members.len(), 1);
        assert_eq!(chat.members[0].name, "Alice");
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].content, "hi");
        assert_eq!(chat.messages[0].message_id, "m1");

        assert!(chats.get("c2").is_none());
    }

    #[test]
    fn name_chosen_updates_chat_level_display_name() {
        let mut chats = Chats::new();
        chats.apply(&started("c1"));
        chats.apply(&ChatEvent::NameChosen {
            chat_id: "c1".to_string(),
            sender_id: "u1".to_string(),
            chosen_name: "Alice".to_string(),
        });

        let chat = chats.get("c1").unwrap();
        assert_eq!(chat.sender_name, "Alice");
        assert_eq!(chat.sender_id, "u1");

        // 未知聊天上的 NameChosen 是空操作
        chats.apply(&ChatEvent::NameChosen {
            chat_id: "c9".to_string(),
            sender_id: "u9".to_string(),
            chosen_name: "Ghost".to_string(),
        });
        assert!(!chats.has("c9"));
    }
}
