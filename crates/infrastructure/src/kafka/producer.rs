//! Kafka 事件生产者
//!
//! 建连阶段带指数退避地无限重试；建连之后的写失败原样交给调用方，
//! 写路径不做内部重试。

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tokio::time::sleep;
use tracing::{info, warn};

use application::{EventPublisher, PublishError};
use config::KafkaConfig;

use crate::kafka::backoff::connect_backoff;
use crate::kafka::{KafkaError, KafkaResult};

/// Kafka 事件生产者
pub struct EventLogProducer {
    producer: FutureProducer,
    topic: String,
    send_timeout: Duration,
}

impl EventLogProducer {
    /// 连接到事件日志，失败则按退避曲线无限重试
    ///
    /// 生产者连不上日志就无法服务任何命令，进程应当阻塞在启动阶段
    /// 而不是带着坏的发布路径对外服务。
    pub async fn connect(config: &KafkaConfig) -> Self {
        let mut retries: u32 = 0;
        loop {
            match Self::try_connect(config).await {
                Ok(producer) => {
                    info!(
                        brokers = %config.brokers.join(","),
                        topic = %config.topic,
                        "Kafka 生产者连接成功"
                    );
                    return producer;
                }
                Err(err) => {
                    let delay = connect_backoff(retries);
                    warn!(
                        error = %err,
                        retries,
                        delay_ms = delay.as_millis() as u64,
                        "连接事件日志失败，稍后重试"
                    );
                    sleep(delay).await;
                    retries = retries.saturating_add(1);
                }
            }
        }
    }

    /// 单次建连尝试：创建生产者并探测主题元数据
    async fn try_connect(config: &KafkaConfig) -> KafkaResult<Self> {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", config.brokers.join(","))
            .set("message.timeout.ms", config.send_timeout_ms.to_string());

        let producer: FutureProducer =
            client_config
                .create()
                .map_err(|err| KafkaError::ConfigError {
                    message: format!("创建 Kafka 生产者失败: {}", err),
                })?;

        // 客户端创建是惰性的，主动拉一次主题元数据确认 broker 可达。
        // 元数据调用会阻塞，放到阻塞线程池里执行。
        let probe = producer.clone();
        let topic = config.topic.clone();
        let timeout = Duration::from_millis(config.send_timeout_ms as u64);
        let broker_count = tokio::task::spawn_blocking(move || {
            probe
                .client()
                .fetch_metadata(Some(&topic), timeout)
                .map(|metadata| metadata.brokers().len())
        })
        .await
        .map_err(|err| KafkaError::ConnectionError {
            message: format!("元数据探测任务失败: {}", err),
        })?
        .map_err(KafkaError::from)?;

        if broker_count == 0 {
            return Err(KafkaError::ConnectionError {
                message: "元数据中没有可用的 broker".to_string(),
            });
        }

        Ok(Self {
            producer,
            topic: config.topic.clone(),
            send_timeout: timeout,
        })
    }

    /// 同步写入一条不透明负载，等待投递确认
    pub async fn send_raw(&self, payload: &[u8]) -> KafkaResult<()> {
        let record = FutureRecord::<(), [u8]>::to(&self.topic).payload(payload);
        self.producer
            .send(record, Timeout::After(self.send_timeout))
            .await
            .map(|_| ())
            .map_err(|(err, _)| KafkaError::ProducerError {
                message: format!("发送失败: {}", err),
            })
    }

    /// 刷新缓冲并释放连接，可安全调用一次
    pub async fn close(&self) -> KafkaResult<()> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || {
            producer.flush(Timeout::After(Duration::from_secs(10)))
        })
        .await
        .map_err(|err| KafkaError::ProducerError {
            message: format!("刷新任务失败: {}", err),
        })?
        .map_err(|err| KafkaError::ProducerError {
            message: format!("刷新生产者缓冲区失败: {}", err),
        })?;
        info!("Kafka 生产者已关闭");
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for EventLogProducer {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), PublishError> {
        self.send_raw(&payload)
            .await
            .map_err(|err| PublishError::failed(err.to_string()))
    }
}
