//! SSE-over-HTTP transport (spec §4.7), grounded in the same
//! broadcast-channel-per-client pattern the teacher's `server/mod.rs` used
//! for its `/api/events` stream. A client opens `GET /sse`, receives an
//! `endpoint` event naming the session's POST URL, then posts JSON-RPC
//! requests to it; responses arrive asynchronously as `message` events on
//! the open stream.

use super::{handle_request, InvocationRegistry, RpcRequest};
use crate::tools::AppState;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::info;

struct SseState {
    app: Arc<AppState>,
    registry: Arc<InvocationRegistry>,
    sessions: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

pub fn router(app: Arc<AppState>) -> Router {
    let state = Arc::new(SseState {
        app,
        registry: Arc::new(InvocationRegistry::new()),
        sessions: Mutex::new(HashMap::new()),
    });

    Router::new()
        .route("/sse", get(open_stream))
        .route("/message", post(post_message))
        .with_state(state)
}

pub async fn serve(port: u16, app: Arc<AppState>) -> anyhow::Result<()> {
    let router = router(app);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    info!(port, "SSE transport listening");
    axum::serve(listener, router).await?;
    Ok(())
}

async fn open_stream(
    State(state): State<Arc<SseState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let session_id = uuid::Uuid::new_v4().to_string();
    let (tx, rx) = broadcast::channel(128);
    state.sessions.lock().await.insert(session_id.clone(), tx);

    let endpoint_event = Event::default().event("endpoint").data(format!("/message?sessionId={session_id}"));
    let first = tokio_stream::once(Ok(endpoint_event));

    let rest = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(data) => Some(Ok(Event::default().event("message").data(data))),
        Err(_) => None,
    });

    Sse::new(first.chain(rest)).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    #[serde(rename = "sessionId")]
    session_id: String,
}

async fn post_message(
    State(state): State<Arc<SseState>>,
    Query(query): Query<SessionQuery>,
    Json(request): Json<RpcRequest>,
) -> impl IntoResponse {
    let sender = state.sessions.lock().await.get(&query.session_id).cloned();
    let Some(sender) = sender else {
        return axum::http::StatusCode::NOT_FOUND;
    };

    let app = state.app.clone();
    let registry = state.registry.clone();
    tokio::spawn(async move {
        if let Some(response) = handle_request(&app, &registry, request).await {
            let payload = serde_json::to_string(&response).unwrap_or_default();
            let _ = sender.send(payload);
        }
    });

    axum::http::StatusCode::ACCEPTED
}
