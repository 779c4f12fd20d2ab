//! WebSocket 入口
//!
//! 实现连接升级和参数校验，连接本身的生命周期交给 `ChatRoomConnection`。

use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::{state::AppState, ws_connection::ChatRoomConnection};

/// WebSocket 连接查询参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoomQuery {
    pub sender_id: String,
}

/// 处理 `/chat-room/{id}` 的连接升级
///
/// 聊天标识符和参与者标识符都必须是合法的 UUID，否则拒绝升级。
pub async fn chat_room_upgrade(
    ws: WebSocketUpgrade,
    Path(chat_id): Path<String>,
    Query(query): Query<ChatRoomQuery>,
    State(state): State<AppState>,
) -> Result<Response, StatusCode> {
    if Uuid::parse_str(&chat_id).is_err() {
        warn!(chat_id = %chat_id, "非法的聊天标识符，拒绝升级");
        return Err(StatusCode::BAD_REQUEST);
    }
    if Uuid::parse_str(&query.sender_id).is_err() {
        warn!(sender_id = %query.sender_id, "非法的参与者标识符，拒绝升级");
        return Err(StatusCode::BAD_REQUEST);
    }

    let hub = state.hub.clone();
    Ok(ws.on_upgrade(move |socket| async move {
        ChatRoomConnection::new(hub, chat_id, query.sender_id)
            .serve(socket)
            .await;
    }))
}
