//! Kafka 事件消费者
//!
//! 每个消费者用独立的消费组从最早偏移量读完整事件流，互不竞争
//! 分区所有权。拉取循环在瞬时错误上只记日志重试，永不退出。

use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use config::KafkaConfig;

use crate::kafka::{KafkaError, KafkaResult};

/// 瞬时拉取错误后的等待
const PULL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Kafka 事件消费者
pub struct EventLogConsumer {
    consumer: StreamConsumer,
    group_id: String,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl EventLogConsumer {
    /// 创建消费者并订阅主题
    ///
    /// `group_id` 决定消费者的逻辑身份：投影消费者每次启动用全新
    /// 组名以便从最早偏移量完整重放，扇出消费者用固定组名。
    pub fn new(config: &KafkaConfig, group_id: &str) -> KafkaResult<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("group.id", group_id)
            .set("bootstrap.servers", config.brokers.join(","))
            .set("enable.partition.eof", "false")
            .set("session.timeout.ms", "10000")
            .set("heartbeat.interval.ms", "3000")
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", "1000")
            .set("auto.offset.reset", "earliest")
            .set("fetch.wait.max.ms", "200")
            .create()
            .map_err(|err| KafkaError::ConfigError {
                message: format!("创建 Kafka 消费者失败: {}", err),
            })?;

        consumer
            .subscribe(&[&config.topic])
            .map_err(|err| KafkaError::ConsumerError {
                message: format!("订阅主题失败: {}", err),
            })?;

        info!(group_id = %group_id, topic = %config.topic, "Kafka 消费者创建成功");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            consumer,
            group_id: group_id.to_string(),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// 拉取循环：把原始负载推入 `sink` 直到被停止
    ///
    /// 瞬时拉取错误只记日志后重试；`sink` 是有界通道，接收端读得慢
    /// 时推入会阻塞，消费节奏被最慢的读者限制而不是丢消息。
    pub async fn run(&self, sink: mpsc::Sender<Vec<u8>>) {
        let mut shutdown = self.shutdown_rx.clone();
        info!(group_id = %self.group_id, "消费者开始拉取");

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                result = self.consumer.recv() => match result {
                    Ok(message) => {
                        let Some(payload) = message.payload() else {
                            warn!(group_id = %self.group_id, "消息负载为空，跳过");
                            continue;
                        };
                        debug!(
                            group_id = %self.group_id,
                            offset = message.offset(),
                            "收到事件负载"
                        );
                        if sink.send(payload.to_vec()).await.is_err() {
                            debug!(group_id = %self.group_id, "接收端已关闭，停止消费");
                            break;
                        }
                    }
                    Err(err) => {
                        error!(group_id = %self.group_id, error = %err, "拉取消息失败，稍后重试");
                        sleep(PULL_RETRY_DELAY).await;
                    }
                }
            }
        }

        info!(group_id = %self.group_id, "消费循环已停止");
    }

    /// 停止消费：阻塞中的拉取经由关停信号立即解除，而不是悬挂
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
