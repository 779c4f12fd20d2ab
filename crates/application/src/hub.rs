//! 扇出中心
//!
//! 把共享消费者收到的每条事件复制给所有在册的订阅者通道。
//! 注册表的变更和广播遍历都经过同一把读写锁，连接在广播进行中
//! 注销也是安全的。过滤发生在每个连接自己的投递任务里。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

use domain::{ChatEvent, EventEnvelope, EventError};

/// 允许投递给实时订阅者的事件类型
pub const DELIVERABLE_EVENTS: [&str; 4] = [
    ChatEvent::CHAT_MESSAGE_SENT,
    ChatEvent::CHAT_MESSAGE_STARTED,
    ChatEvent::CHAT_MESSAGE_STOPPED,
    ChatEvent::CHAT_JOINED,
];

/// 单个连接的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// 每连接投递过滤器：信封预扫描 + 聊天范围 + 类型白名单
#[derive(Debug, Clone)]
pub struct DeliveryFilter {
    chat_id: String,
}

impl DeliveryFilter {
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
        }
    }

    /// 判断负载是否应投递给本连接
    ///
    /// `Ok(None)` 表示静默丢弃（聊天不匹配或类型不在白名单内）；
    /// `Err` 表示信封都解不出来，本连接的投递流不可恢复。
    pub fn admits(&self, payload: &[u8]) -> Result<Option<EventEnvelope>, EventError> {
        let envelope = EventEnvelope::peek(payload)?;
        if envelope.chat_id != self.chat_id {
            return Ok(None);
        }
        if !DELIVERABLE_EVENTS.contains(&envelope.event_type.as_str()) {
            return Ok(None);
        }
        Ok(Some(envelope))
    }
}

/// 订阅者注册表与广播路径
#[derive(Clone, Default)]
pub struct FanOutHub {
    sinks: Arc<RwLock<HashMap<String, mpsc::Sender<Vec<u8>>>>>,
}

impl FanOutHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个订阅者通道
    ///
    /// 同一连接标识符重复注册会替换旧通道，旧通道随之关闭。
    pub async fn register(&self, id: impl Into<String>, sink: mpsc::Sender<Vec<u8>>) {
        let id = id.into();
        let mut sinks = self.sinks.write().await;
        sinks.insert(id.clone(), sink);
        info!(connection_id = %id, connections = sinks.len(), "订阅者已注册");
    }

    /// 注销订阅者，返回是否真的移除了条目
    ///
    /// 移除即丢弃发送端，通道关闭与注册表清理在写锁内一次完成。
    pub async fn unregister(&self, id: &str) -> bool {
        let mut sinks = self.sinks.write().await;
        let removed = sinks.remove(id).is_some();
        if removed {
            info!(connection_id = %id, connections = sinks.len(), "订阅者已注销");
        }
        removed
    }

    pub async fn connection_count(&self) -> usize {
        self.sinks.read().await.len()
    }

    /// 把一条负载复制给当前所有订阅者
    ///
    /// 先在读锁下取快照再逐个发送；订阅者通道满时发送会阻塞，
    /// 消费速度被最慢的读者限制而不是丢消息。发往已关闭通道的
    /// 消息直接忽略，对应连接正在关闭。
    pub async fn broadcast(&self, payload: &[u8]) {
        let sinks: Vec<(String, mpsc::Sender<Vec<u8>>)> = {
            self.sinks
                .read()
                .await
                .iter()
                .map(|(id, sink)| (id.clone(), sink.clone()))
                .collect()
        };

        for (id, sink) in sinks {
            if sink.send(payload.to_vec()).await.is_err() {
                debug!(connection_id = %id, "订阅者通道已关闭，跳过投递");
            }
        }
    }

    /// 消费共享扇出通道直到其关闭
    pub async fn run(&self, mut rx: mpsc::Receiver<Vec<u8>>) {
        while let Some(payload) = rx.recv().await {
            self.broadcast(&payload).await;
        }
        debug!("扇出事件通道已关闭");
    }
}
