//! WebSocket 连接管理
//!
//! 封装单个订阅者连接的状态机和读写任务：读循环感知断开，过滤
//! 转发任务把通过预扫描的事件写给传输层。注销与通道关闭只发生
//! 一次，即使广播正在并发地遍历注册表。

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use application::{ConnectionState, DeliveryFilter, FanOutHub};

/// 每连接投递通道的容量
///
/// 有界通道：订阅者读得慢时广播路径会阻塞，消息不会被丢弃。
const SINK_CAPACITY: usize = 32;

/// 单个聊天室订阅者连接
pub struct ChatRoomConnection {
    hub: Arc<FanOutHub>,
    chat_id: String,
    sender_id: String,
    state: ConnectionState,
}

impl ChatRoomConnection {
    pub fn new(hub: Arc<FanOutHub>, chat_id: String, sender_id: String) -> Self {
        Self {
            hub,
            chat_id,
            sender_id,
            state: ConnectionState::Connecting,
        }
    }

    /// 驱动连接直到断开
    pub async fn serve(mut self, socket: WebSocket) {
        let (sink_tx, sink_rx) = mpsc::channel::<Vec<u8>>(SINK_CAPACITY);
        self.hub.register(self.sender_id.clone(), sink_tx).await;
        self.state = ConnectionState::Open;
        info!(
            chat_id = %self.chat_id,
            sender_id = %self.sender_id,
            "订阅者连接已建立"
        );

        let (ws_tx, mut ws_rx) = socket.split();
        let writer = tokio::spawn(forward_deliveries(
            sink_rx,
            ws_tx,
            DeliveryFilter::new(self.chat_id.clone()),
            self.hub.clone(),
            self.sender_id.clone(),
        ));

        // 读循环只为感知断开；读错误或关闭帧都进入关闭流程
        while let Some(message) = ws_rx.next().await {
            match message {
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => {}
                Err(err) => {
                    debug!(sender_id = %self.sender_id, error = %err, "读取连接失败");
                    break;
                }
            }
        }

        self.close().await;
        // 注销已丢弃发送端，转发任务观察到通道关闭后退出
        let _ = writer.await;
    }

    /// 进入 Closing：注销并随之关闭投递通道，然后标记 Closed
    async fn close(&mut self) {
        if matches!(self.state, ConnectionState::Closing | ConnectionState::Closed) {
            return;
        }
        self.state = ConnectionState::Closing;
        self.hub.unregister(&self.sender_id).await;
        self.state = ConnectionState::Closed;
        info!(
            chat_id = %self.chat_id,
            sender_id = %self.sender_id,
            "订阅者连接已关闭"
        );
    }
}

/// 过滤转发任务
///
/// 对每条负载做信封预扫描：聊天范围或类型白名单不通过就丢弃；
/// 预扫描失败说明这条流对该连接不可恢复，终止任务但不影响其他
/// 连接。任务退出时兜底注销，注销本身幂等。
async fn forward_deliveries(
    mut sink_rx: mpsc::Receiver<Vec<u8>>,
    mut ws_tx: SplitSink<WebSocket, WsMessage>,
    filter: DeliveryFilter,
    hub: Arc<FanOutHub>,
    sender_id: String,
) {
    while let Some(payload) = sink_rx.recv().await {
        match filter.admits(&payload) {
            Ok(Some(envelope)) => {
                let text = match String::from_utf8(payload) {
                    Ok(text) => text,
                    Err(err) => {
                        error!(sender_id = %sender_id, error = %err, "负载不是合法的 UTF-8，终止投递");
                        break;
                    }
                };
                debug!(
                    sender_id = %sender_id,
                    event_type = %envelope.event_type,
                    "转发事件给订阅者"
                );
                if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                    debug!(sender_id = %sender_id, "写入连接失败，终止投递");
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => {
                error!(sender_id = %sender_id, error = %err, "预扫描事件负载失败，终止投递");
                break;
            }
        }
    }
    hub.unregister(&sender_id).await;
}
