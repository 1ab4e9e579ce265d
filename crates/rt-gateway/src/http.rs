//! HTTP handlers: introspection endpoints, message drivers and the
//! WebSocket upgrade.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rt_signaling::{
    CallLogEntry, ChatMessage, GroupMessage, MessagePayload, SignalingApi, SignalingService,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiError;
use crate::metrics::GatewayMetrics;
use crate::ws::{WebSocketConfig, WebSocketHandler};

/// Application state shared across handlers
#[derive(Clone)]
pub(crate) struct AppState {
    pub signaling: Arc<SignalingService>,
    pub metrics: Arc<GatewayMetrics>,
    pub ws_config: WebSocketConfig,
}

impl AppState {
    fn observe<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        self.metrics.record_http(result.is_ok());
        result
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WsParams {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendMessageRequest {
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(flatten)]
    pub payload: MessagePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MarkReadRequest {
    pub reader_id: String,
    pub partner_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReactionRequest {
    pub user_id: String,
    pub emoji: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GroupMessageRequest {
    pub sender_id: String,
    #[serde(flatten)]
    pub payload: MessagePayload,
}

/// `GET /ws?userId=...`
pub(crate) async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let (handler, mailbox) = WebSocketHandler::connect(
            state.signaling,
            state.metrics,
            state.ws_config,
            params.user_id.as_deref(),
        );
        debug!(connection = %handler.connection_id(), "WebSocket upgraded");
        handler.run(socket, mailbox).await;
    })
}

/// Health check endpoint
pub(crate) async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "rt-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.to_json(&state.signaling.stats()))
}

pub(crate) async fn online_users(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "users": state.signaling.online_users() }))
}

pub(crate) async fn call_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<CallLogEntry>>, ApiError> {
    let result = state
        .signaling
        .call_history(&user_id)
        .await
        .map(Json)
        .map_err(ApiError::from);
    state.observe(result)
}

pub(crate) async fn conversation(
    State(state): State<AppState>,
    Path((user_id, partner_id)): Path<(String, String)>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let result = state
        .signaling
        .conversation(&user_id, &partner_id)
        .await
        .map(Json)
        .map_err(ApiError::from);
    state.observe(result)
}

pub(crate) async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    let result = state
        .signaling
        .send_message(&request.sender_id, &request.receiver_id, request.payload)
        .await
        .map(|message| (StatusCode::CREATED, Json(message)))
        .map_err(ApiError::from);
    state.observe(result)
}

pub(crate) async fn mark_read(
    State(state): State<AppState>,
    Json(request): Json<MarkReadRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let result = state
        .signaling
        .mark_read(&request.reader_id, &request.partner_id)
        .await
        .map(|updated| Json(serde_json::json!({ "updated": updated })))
        .map_err(ApiError::from);
    state.observe(result)
}

pub(crate) async fn react(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Json(request): Json<ReactionRequest>,
) -> Result<Json<ChatMessage>, ApiError> {
    let result = state
        .signaling
        .react(&message_id, &request.user_id, &request.emoji)
        .await
        .map(Json)
        .map_err(ApiError::from);
    state.observe(result)
}

pub(crate) async fn send_group_message(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(request): Json<GroupMessageRequest>,
) -> Result<(StatusCode, Json<GroupMessage>), ApiError> {
    let result = state
        .signaling
        .send_group_message(&group_id, &request.sender_id, request.payload)
        .await
        .map(|message| (StatusCode::CREATED, Json(message)))
        .map_err(ApiError::from);
    state.observe(result)
}
