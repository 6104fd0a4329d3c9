// src/server/handlers.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        Json,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::stream::Stream;
use futures::{StreamExt, future};
use serde::Deserialize;
use serde_json::{Value, json};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::AppState;
use crate::controller::ChatController;
use crate::gateway::sse::StreamFrame;
use crate::message::{ChatEvent, ChatMessage};
use crate::pipeline::Session;
use crate::store::history::HistoryStore;

/// Health check and status endpoint
pub async fn status_handler(State(_state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "mentor",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStreamRequest {
    pub message: String,
    pub user_email: String,
}

/// Run a full mentor turn and relay the answer as `data: {"text": ...}`
/// frames. The stream ends when the turn does; a failed turn surfaces as
/// one frame carrying the synthetic error reply.
pub async fn chat_stream_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatStreamRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<ChatEvent>(64);

    let mut controller = ChatController::new(
        state.gateway.clone(),
        state.db.clone(),
        Session::new(request.user_email),
    );
    let message = request.message;
    let cancel = CancellationToken::new();

    tokio::spawn(async move {
        controller.load_history().await;
        if let Err(err) = controller.send_message(&message, tx, cancel).await {
            warn!(error = %err, "chat turn rejected");
        }
    });

    let stream = ReceiverStream::new(rx).filter_map(|event| {
        let text = match event {
            ChatEvent::Fragment(text) => Some(text),
            ChatEvent::Error { message } => Some(message),
            // The client already holds the full text; completion is
            // signalled by the stream closing.
            ChatEvent::Completed(_) => None,
        };
        future::ready(text.map(|text| {
            let payload = serde_json::to_string(&StreamFrame { text }).unwrap_or_default();
            Ok(Event::default().data(payload))
        }))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user: String,
}

/// Stored conversation in creation order. A store failure degrades to an
/// empty conversation, mirroring the client behavior.
pub async fn history_handler(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Json<Vec<ChatMessage>> {
    let store = HistoryStore::new(state.db.clone());
    match store.load(&params.user).await {
        Ok(messages) => Json(messages),
        Err(err) => {
            warn!(error = %err, "history load failed");
            Json(Vec::new())
        }
    }
}

/// Delete all chat history for a user.
pub async fn reset_handler(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<StatusCode, (StatusCode, String)> {
    let store = HistoryStore::new(state.db.clone());
    store
        .reset(&params.user)
        .await
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}
