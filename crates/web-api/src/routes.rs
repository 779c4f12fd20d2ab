use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use chrono::{DateTime, Utc};
use domain::{Chat, ChatEvent, Member};

use crate::{error::ApiError, state::AppState, websocket::chat_room_upgrade};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartChatPayload {
    chosen_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinChatPayload {
    chat_id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendChatMessagePayload {
    chat_id: String,
    content: String,
    sender_id: String,
    sent_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartChatResponse {
    chat_id: String,
    sender_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JoinChatResponse {
    sender_id: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chats/{id}", get(get_chat))
        .route("/chats/{id}/members", get(get_chat_members))
        .route("/start-chat", post(start_chat))
        .route("/join-chat", post(join_chat))
        .route("/send-chat-message", post(send_chat_message))
        .route("/start-typing", post(start_typing))
        .route("/stop-typing", post(stop_typing))
        .route("/chat-room/{id}", get(chat_room_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 序列化并提交一条事件；写失败原样映射为 500
async fn publish_event(state: &AppState, event: &ChatEvent) -> Result<(), ApiError> {
    let payload = event
        .to_bytes()
        .map_err(|err| ApiError::internal_server_error(err.to_string()))?;
    state.publisher.publish(payload).await?;
    Ok(())
}

async fn get_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Chat>, ApiError> {
    state
        .projection
        .get_chat(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Chat with id {} not found", id)))
}

async fn get_chat_members(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Member>>, ApiError> {
    state
        .projection
        .get_chat(&id)
        .await
        .map(|chat| Json(chat.members))
        .ok_or_else(|| ApiError::not_found(format!("Chat with id {} not found", id)))
}

async fn start_chat(
    State(state): State<AppState>,
    Json(payload): Json<StartChatPayload>,
) -> Result<(StatusCode, Json<StartChatResponse>), ApiError> {
    if state
        .projection
        .has_display_name(&payload.chosen_name)
        .await
    {
        return Err(ApiError::bad_request("Name taken"));
    }

    let chat_id = Uuid::new_v4().to_string();
    let sender_id = Uuid::new_v4().to_string();
    let events = [
        ChatEvent::ChatStarted {
            chat_id: chat_id.clone(),
        },
        ChatEvent::ChatJoined {
            chat_id: chat_id.clone(),
            sender_id: sender_id.clone(),
            name: payload.chosen_name,
            joined_at: state.clock.now(),
        },
    ];
    for event in &events {
        publish_event(&state, event).await?;
    }

    Ok((
        StatusCode::CREATED,
        Json(StartChatResponse { chat_id, sender_id }),
    ))
}

async fn join_chat(
    State(state): State<AppState>,
    Json(payload): Json<JoinChatPayload>,
) -> Result<(StatusCode, Json<JoinChatResponse>), ApiError> {
    let sender_id = Uuid::new_v4().to_string();
    let event = ChatEvent::ChatJoined {
        chat_id: payload.chat_id,
        sender_id: sender_id.clone(),
        name: payload.name,
        joined_at: state.clock.now(),
    };
    event
        .validate()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    publish_event(&state, &event).await?;

    Ok((StatusCode::CREATED, Json(JoinChatResponse { sender_id })))
}

async fn send_chat_message(
    State(state): State<AppState>,
    Json(payload): Json<SendChatMessagePayload>,
) -> Result<StatusCode, ApiError> {
    let event = ChatEvent::ChatMessageSent {
        chat_id: payload.chat_id,
        message_id: Uuid::new_v4().to_string(),
        sender_id: payload.sender_id,
        content: payload.content,
        sent_at: payload.sent_at,
    };
    event
        .validate()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    publish_event(&state, &event).await?;

    Ok(StatusCode::CREATED)
}

async fn start_typing(State(state): State<AppState>, body: Bytes) -> Result<StatusCode, ApiError> {
    dispatch_event_command(&state, &body, ChatEvent::CHAT_MESSAGE_STARTED).await
}

async fn stop_typing(State(state): State<AppState>, body: Bytes) -> Result<StatusCode, ApiError> {
    dispatch_event_command(&state, &body, ChatEvent::CHAT_MESSAGE_STOPPED).await
}

/// 请求体就是事件本身的命令入口：解码、校验类型与标识符，然后发布
async fn dispatch_event_command(
    state: &AppState,
    body: &[u8],
    expected: &str,
) -> Result<StatusCode, ApiError> {
    let event =
        ChatEvent::from_bytes(body).map_err(|err| ApiError::bad_request(err.to_string()))?;
    event
        .ensure_type(expected)
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    event
        .validate()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    publish_event(state, &event).await?;
    Ok(StatusCode::NO_CONTENT)
}
