//! WebSocket server + REST endpoints for the triage board.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use super::service::{BoardEvent, TriageBoard};
use super::transition::DragInteraction;
use crate::api;
use crate::intake::IntakeFilters;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub board: Arc<TriageBoard>,
}

/// Build the Axum router with board WebSocket and REST routes.
pub fn board_routes(board: Arc<TriageBoard>) -> Router {
    let state = AppState { board };

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/api/board", get(get_board))
        .route("/api/board/refresh", post(refresh_board))
        .route("/api/board/filters", put(update_filters))
        .route("/api/board/drag", post(drag_end))
        .route("/api/intakes/{id}", get(get_intake))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Drag-end as sent by a dashboard (REST body or WS text frame).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragRequest {
    pub active_id: String,
    #[serde(default)]
    pub over_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DragRequest {
    fn split(self) -> (DragInteraction, Option<String>) {
        (
            DragInteraction {
                active_id: self.active_id,
                over_id: self.over_id,
            },
            self.notes,
        )
    }
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "intake-triage"
    }))
}

// ── WebSocket ───────────────────────────────────────────────────────────

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    info!("Board WebSocket client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state.board))
}

async fn send_event(socket: &mut WebSocket, event: &BoardEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize board event");
            true
        }
    }
}

async fn handle_socket(mut socket: WebSocket, board: Arc<TriageBoard>) {
    info!("Board WebSocket client connected");

    // Subscribe before the initial sync so nothing is missed in between
    let mut rx = board.subscribe();

    let sync = BoardEvent::BoardSync {
        board: board.snapshot().await,
    };
    if !send_event(&mut socket, &sync).await {
        warn!("Failed to send initial board sync, client disconnected");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if !send_event(&mut socket, &event).await {
                            debug!("Board WS client disconnected during send");
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "Board WS client lagged behind broadcast");
                        let sync = BoardEvent::BoardSync {
                            board: board.snapshot().await,
                        };
                        if !send_event(&mut socket, &sync).await {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("Board broadcast channel closed");
                        break;
                    }
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&text, &board);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Board WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("Board WebSocket connection closed");
}

/// Start a drag sent over the socket. It runs on its own task so the socket
/// keeps serving broadcasts and pings while the backend call is in flight;
/// the outcome reaches clients through the broadcast.
fn handle_client_message(text: &str, board: &Arc<TriageBoard>) -> Option<JoinHandle<()>> {
    let request = match serde_json::from_str::<DragRequest>(text) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, text = text, "Unrecognized WS message from client");
            return None;
        }
    };

    let board = Arc::clone(board);
    Some(tokio::spawn(async move {
        let (drag, notes) = request.split();
        match board.handle_drag(&drag, notes).await {
            Ok(outcome) => debug!(active_id = %drag.active_id, ?outcome, "Drag handled via WS"),
            Err(e) => warn!(active_id = %drag.active_id, error = %e, "Drag failed via WS"),
        }
    }))
}

// ── REST Endpoints ──────────────────────────────────────────────────────

async fn get_board(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.board.snapshot().await)
}

async fn refresh_board(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.board.refresh().await)
}

async fn update_filters(
    State(state): State<AppState>,
    Json(filters): Json<IntakeFilters>,
) -> impl IntoResponse {
    info!(?filters, "Board filters changed");
    state.board.set_filters(filters).await;
    Json(state.board.refresh().await)
}

async fn drag_end(
    State(state): State<AppState>,
    Json(body): Json<DragRequest>,
) -> impl IntoResponse {
    let (drag, notes) = body.split();
    match state.board.handle_drag(&drag, notes).await {
        Ok(outcome) => (StatusCode::OK, Json(serde_json::json!(outcome))),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({"error": format!("failed to update status: {e}")})),
        ),
    }
}

async fn get_intake(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match api::fetch_intake_details(state.board.api().as_ref(), &id).await {
        Ok(details) => (StatusCode::OK, Json(serde_json::json!(details))),
        Err(e) => {
            warn!(intake_id = %id, error = %e, "Failed to load intake details");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": format!("failed to load intake: {e}")})),
            )
        }
    }
}
