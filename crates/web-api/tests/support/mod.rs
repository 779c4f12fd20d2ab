//! 集成测试支撑
//!
//! 用进程内通道代替真实事件日志：发布出去的事件按序同时抵达
//! 投影消费者和扇出消费者，其余链路与生产装配完全一致。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use application::{ChatProjection, EventPublisher, FanOutHub, PublishError, SystemClock};
use web_api::AppState;

/// 把事件写进进程内通道的发布器
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

#[async_trait]
impl EventPublisher for ChannelPublisher {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), PublishError> {
        self.tx
            .send(payload)
            .map_err(|err| PublishError::failed(err.to_string()))
    }
}

pub struct TestApp {
    pub base_url: String,
    pub hub: Arc<FanOutHub>,
}

impl TestApp {
    pub fn ws_base_url(&self) -> String {
        self.base_url.replacen("http", "ws", 1)
    }
}

/// 启动一个完整的进程内服务并返回其地址与核心句柄
pub async fn spawn_app() -> TestApp {
    let (publish_tx, mut publish_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let projection = Arc::new(ChatProjection::new());
    let hub = Arc::new(FanOutHub::new());

    let (projection_tx, projection_rx) = mpsc::channel(64);
    let (fanout_tx, fanout_rx) = mpsc::channel(64);
    {
        let projection = projection.clone();
        tokio::spawn(async move { projection.run(projection_rx).await });
    }
    {
        let hub = hub.clone();
        tokio::spawn(async move { hub.run(fanout_rx).await });
    }
    // 事件日志替身：每条已发布事件按序复制给两个消费者通道
    tokio::spawn(async move {
        while let Some(payload) = publish_rx.recv().await {
            if projection_tx.send(payload.clone()).await.is_err() {
                break;
            }
            if fanout_tx.send(payload).await.is_err() {
                break;
            }
        }
    });

    let state = AppState::new(
        Arc::new(ChannelPublisher { tx: publish_tx }),
        projection.clone(),
        hub.clone(),
        Arc::new(SystemClock),
    );
    let router = web_api::router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service()).await.ok();
    });

    TestApp {
        base_url: format!("http://{}", addr),
        hub,
    }
}
