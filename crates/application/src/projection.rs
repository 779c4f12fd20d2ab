//! 事件投影服务
//!
//! 持有进程唯一的 `Chats` 投影。写入只发生在 `run` 驱动的单一任务里，
//! 查询端通过读锁拿快照，读写通过 `RwLock` 保证安全。

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use domain::{Chat, ChatEvent, Chats};

/// 聊天投影：事件流折叠出的可查询状态
#[derive(Clone, Default)]
pub struct ChatProjection {
    chats: Arc<RwLock<Chats>>,
}

impl ChatProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 消费原始事件负载直到通道关闭
    ///
    /// 一个消费者通道对应一个投影任务；通道内的顺序就是日志顺序。
    pub async fn run(&self, mut rx: mpsc::Receiver<Vec<u8>>) {
        while let Some(payload) = rx.recv().await {
            self.apply_payload(&payload).await;
        }
        debug!("投影事件通道已关闭");
    }

    /// 解码并归约一条事件
    ///
    /// 解码失败只记日志后丢弃，重放缺口和乱序事件不会中断投影。
    pub async fn apply_payload(&self, payload: &[u8]) {
        match ChatEvent::from_bytes(payload) {
            Ok(event) => {
                debug!(event_type = event.event_type(), "应用事件到投影");
                self.chats.write().await.apply(&event);
            }
            Err(err) => {
                warn!(error = %err, "无法解析事件，已跳过");
            }
        }
    }

    /// 查询单个聊天的状态快照
    pub async fn get_chat(&self, chat_id: &str) -> Option<Chat> {
        self.chats.read().await.get(chat_id).cloned()
    }

    /// 判断显示名称是否已被任一聊天占用
    pub async fn has_display_name(&self, name: &str) -> bool {
        self.chats.read().await.has_name(name)
    }
}
