//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 事件日志（Kafka）连接
//! - 服务监听地址

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 事件日志配置
    pub kafka: KafkaConfig,
    /// 服务配置
    pub server: ServerConfig,
}

/// Kafka 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    /// Kafka 服务器地址列表
    pub brokers: Vec<String>,
    /// 聊天事件主题名称
    pub topic: String,
    /// 消息发送超时时间（毫秒）
    pub send_timeout_ms: u32,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("配置无效: {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// 从环境变量加载配置
    /// 主题名没有安全的默认值，环境变量缺失时直接 panic，
    /// 避免进程悄悄写错主题。
    pub fn from_env() -> Self {
        Self {
            kafka: KafkaConfig {
                brokers: broker_list(),
                topic: env::var("KAFKA_TOPIC")
                    .expect("KAFKA_TOPIC environment variable is required"),
                send_timeout_ms: env_parse("KAFKA_SEND_TIMEOUT_MS", 5000),
            },
            server: server_from_env(),
        }
    }

    /// 从环境变量加载配置，开发环境版本
    /// 提供默认主题，仅用于测试和开发
    pub fn from_env_with_defaults() -> Self {
        Self {
            kafka: KafkaConfig {
                brokers: broker_list(),
                topic: env::var("KAFKA_TOPIC").unwrap_or_else(|_| "chat-events".to_string()),
                send_timeout_ms: env_parse("KAFKA_SEND_TIMEOUT_MS", 5000),
            },
            server: server_from_env(),
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kafka.brokers.is_empty() {
            return Err(ConfigError::Invalid {
                field: "kafka.brokers".to_string(),
                reason: "至少需要一个 broker 地址".to_string(),
            });
        }
        if self.kafka.topic.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "kafka.topic".to_string(),
                reason: "主题名不能为空".to_string(),
            });
        }
        if self.kafka.send_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "kafka.send_timeout_ms".to_string(),
                reason: "发送超时必须大于 0".to_string(),
            });
        }
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "server.host".to_string(),
                reason: "监听地址不能为空".to_string(),
            });
        }
        Ok(())
    }
}

fn broker_list() -> Vec<String> {
    env::var("KAFKA_BROKER")
        .unwrap_or_else(|_| "localhost:9092".to_string())
        .split(',')
        .map(|broker| broker.trim().to_string())
        .filter(|broker| !broker.is_empty())
        .collect()
}

fn server_from_env() -> ServerConfig {
    ServerConfig {
        host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
        port: env_parse("SERVER_PORT", 8080),
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            kafka: KafkaConfig {
                brokers: vec!["localhost:9092".to_string()],
                topic: "chat-events".to_string(),
                send_timeout_ms: 5000,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn empty_topic_is_rejected() {
        let mut config = valid_config();
        config.kafka.topic = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_brokers_are_rejected() {
        let mut config = valid_config();
        config.kafka.brokers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_send_timeout_is_rejected() {
        let mut config = valid_config();
        config.kafka.send_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_build_a_valid_config() {
        let config = AppConfig::from_env_with_defaults();
        assert!(config.validate().is_ok());
    }
}
