//! 基础设施层实现。
//!
//! 提供事件日志的 Kafka 适配器，实现应用层定义的发布端口。

pub mod kafka;

pub use kafka::{connect_backoff, EventLogConsumer, EventLogProducer, KafkaError, KafkaResult};
