use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish failed: {0}")]
    Failed(String),
}

impl PublishError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// 事件发布端口：命令处理器把已序列化的事件交给持久日志。
///
/// 写失败原样上抛，由调用方决定是否重试。
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), PublishError>;
}
