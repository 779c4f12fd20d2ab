//! 主应用程序入口
//!
//! 连接事件日志、启动投影消费者与扇出消费者，然后对外提供 HTTP/WS 服务。

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use application::{ChatProjection, FanOutHub, SystemClock};
use config::AppConfig;
use infrastructure::{EventLogConsumer, EventLogProducer};
use web_api::AppState;

/// 消费者通道容量；写满时消费节奏被最慢的读者限制
const CONSUMER_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();
    config.validate()?;

    tracing::info!(
        brokers = %config.kafka.brokers.join(","),
        topic = %config.kafka.topic,
        "正在连接事件日志"
    );
    // 连不上日志就无法服务任何命令，这里按退避曲线无限重试
    let producer = Arc::new(EventLogProducer::connect(&config.kafka).await);

    let projection = Arc::new(ChatProjection::new());
    let hub = Arc::new(FanOutHub::new());

    // 投影消费者每次启动用全新消费组，从最早偏移量完整重放；
    // 扇出消费者身份固定。两条流各自独立读日志，互不同步。
    let projection_group = format!("chat-projection-{}", Uuid::new_v4());
    let projection_consumer = Arc::new(EventLogConsumer::new(&config.kafka, &projection_group)?);
    let fanout_consumer = Arc::new(EventLogConsumer::new(&config.kafka, "chat-room-fanout")?);

    let (projection_tx, projection_rx) = mpsc::channel(CONSUMER_CHANNEL_CAPACITY);
    let (fanout_tx, fanout_rx) = mpsc::channel(CONSUMER_CHANNEL_CAPACITY);

    {
        let consumer = projection_consumer.clone();
        tokio::spawn(async move { consumer.run(projection_tx).await });
    }
    {
        let projection = projection.clone();
        tokio::spawn(async move { projection.run(projection_rx).await });
    }
    {
        let consumer = fanout_consumer.clone();
        tokio::spawn(async move { consumer.run(fanout_tx).await });
    }
    {
        let hub = hub.clone();
        tokio::spawn(async move { hub.run(fanout_rx).await });
    }

    let state = AppState::new(producer.clone(), projection, hub, Arc::new(SystemClock));
    let app = web_api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "服务已启动");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("收到退出信号");
        })
        .await?;

    // 先解除消费者的阻塞拉取，再收尾生产者
    projection_consumer.stop();
    fanout_consumer.stop();
    producer.close().await?;

    Ok(())
}
