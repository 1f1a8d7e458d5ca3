//! REST + WebSocket surface: session lifecycle endpoints, health/readiness
//! checks, metrics scraping, and the `/ws/:session_id` audio/event channel.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRef, Path, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use boardroom_config::SessionConfig;
use boardroom_llm::{ClaudeConfig, ClaudeLlm, HttpTts, HttpTtsConfig, Llm, Tts};
use boardroom_pipeline::{HttpBatchSttTransport, HttpSttConfig, SlideInfo, SttTransport};

use crate::metrics::{metrics_handler, record_session_started};
use crate::session::{SessionDeps, SessionManager, SessionRuntime};
use crate::store::InMemoryStore;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub metrics: PrometheusHandle,
}

impl FromRef<AppState> for PrometheusHandle {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id", axum::routing::delete(end_session))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route("/ws/:session_id", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(cors_origins))
        .with_state(state)
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        tracing::warn!("no CORS origins configured, allowing all (development only)");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE]);
    }
    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
}

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    config: SessionConfig,
    #[serde(default)]
    slides: Vec<SlideInfo>,
}

async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let session_id = uuid::Uuid::new_v4().to_string();

    let llm: Arc<dyn Llm> = Arc::new(
        ClaudeLlm::new(ClaudeConfig::default()).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?,
    );
    let tts: Arc<dyn Tts> = Arc::new(
        HttpTts::new(HttpTtsConfig::default()).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?,
    );
    let stt_transport = SttTransport::Batch(Box::new(
        HttpBatchSttTransport::new(HttpSttConfig::default()).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?,
    ));

    let deps = SessionDeps {
        llm,
        tts,
        stt_transport,
        store: Arc::new(InMemoryStore::new()),
        slides: request.slides,
    };

    let runtime = SessionRuntime::start(session_id.clone(), request.config, deps)
        .await
        .map_err(StatusCode::from)?;
    state.sessions.insert(runtime);
    record_session_started();

    Ok(Json(serde_json::json!({
        "session_id": session_id,
        "websocket_url": format!("/ws/{session_id}"),
    })))
}

async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<serde_json::Value>, StatusCode> {
    let runtime = state.sessions.get(&id).map_err(StatusCode::from)?;
    let ctx = runtime.session_context.read();
    Ok(Json(serde_json::json!({
        "session_id": runtime.session_id,
        "state": format!("{:?}", ctx.state),
        "completed_exchanges": ctx.completed_exchanges.len(),
    })))
}

async fn end_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    match state.sessions.end(&id).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(err) => StatusCode::from(err),
    }
}

async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.sessions.list();
    Json(serde_json::json!({ "sessions": sessions, "count": sessions.len() }))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy", "version": env!("CARGO_PKG_VERSION") }))
}

async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ready", "active_sessions": state.sessions.list().len() }))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, StatusCode> {
    let runtime = state.sessions.get(&session_id).map_err(StatusCode::from)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, runtime)))
}

/// Splits the socket: a forwarder task drains the session's `Sink` broadcast
/// into outbound text frames, while the receive loop turns inbound binary
/// frames (raw little-endian PCM16) into STT ingestion calls.
async fn handle_socket(socket: WebSocket, runtime: Arc<SessionRuntime>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = runtime.sink.subscribe();

    let forward_task = tokio::spawn(async move {
        while let Ok(msg) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&msg) else { continue };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Binary(bytes) => {
                let pcm: Vec<i16> = bytes
                    .chunks_exact(2)
                    .map(|c| i16::from_le_bytes([c[0], c[1]]))
                    .collect();
                runtime.ingest_audio_frame(&pcm).await;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    forward_task.abort();
}
