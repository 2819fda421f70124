//! HTTP and WebSocket surface.
//!
//! REST routes live under `/api/game`; live updates flow over `/ws`. The
//! caller's identity comes from the `x-player-id` header on REST requests
//! and from the `player` field of WebSocket messages.

use crate::coordinator::Coordinator;
use crate::error::SessionError;
use crate::games::{GameKind, GameSettings, GameView};
use crate::protocol::{ClientMessage, ServerEvent};
use crate::registry::SessionView;
use crate::session::{GameInfo, PlayerId};
use crate::subscription::{RoomHub, Transport};
use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::{debug, error, info, instrument, warn};

/// Header carrying the caller's identity on REST requests.
pub const PLAYER_HEADER: &str = "x-player-id";

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Session operations.
    pub coordinator: Coordinator,
    /// Live connections.
    pub hub: Arc<RoomHub>,
}

/// Builds the application router.
#[instrument(skip_all)]
pub fn router(state: AppState) -> Router {
    info!("Building router");
    Router::new()
        .route("/api/game/create", post(create_game))
        .route("/api/game/list", get(list_games))
        .route("/api/game/{id}", get(get_game))
        .route("/api/game/{id}/join", post(join_game))
        .route("/api/game/{id}/start", post(start_game))
        .route("/api/game/{id}/move", post(make_move))
        .route("/api/game/{id}/view", get(view_game))
        .route("/ws", get(ws_handler))
        .layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
            debug!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
            req
        }))
        .with_state(state)
}

/// Error response: a status code and a `{"error": ...}` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let status = match &err {
            SessionError::NotFound(_) => StatusCode::NOT_FOUND,
            SessionError::Invalid(_) | SessionError::Rejected(_) => StatusCode::BAD_REQUEST,
            SessionError::Precondition(_) => StatusCode::CONFLICT,
            SessionError::Store(store) if store.is_transient() => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            SessionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %err, "Request failed");
        } else {
            debug!(error = %err, %status, "Request refused");
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Identity taken from the [`PLAYER_HEADER`]; rejects with 401 when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub PlayerId);

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        MaybeIdentity::from_request_parts(parts, state)
            .await
            .ok()
            .and_then(|MaybeIdentity(player)| player)
            .map(Identity)
            .ok_or_else(|| {
                ApiError::new(
                    StatusCode::UNAUTHORIZED,
                    format!("Missing {} header", PLAYER_HEADER),
                )
            })
    }
}

/// Identity taken from the [`PLAYER_HEADER`], if present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaybeIdentity(pub Option<PlayerId>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let player = parts
            .headers
            .get(PLAYER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Ok(Self(player))
    }
}

/// Body of a create request: a bare kind, or a kind with settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CreatePayload {
    Kind(String),
    #[serde(rename_all = "camelCase")]
    Configured {
        game_key: String,
        #[serde(default)]
        settings: GameSettings,
    },
}

/// Body of a move request.
#[derive(Debug, Clone, Deserialize)]
struct MoveBody {
    #[serde(rename = "move")]
    mv: Value,
}

#[instrument(skip(state, body))]
async fn create_game(
    State(state): State<AppState>,
    Identity(player): Identity,
    Json(body): Json<Value>,
) -> Result<Json<GameInfo>, ApiError> {
    let payload: CreatePayload = serde_json::from_value(body)
        .map_err(|e| SessionError::Invalid(format!("Bad create request: {}", e)))?;
    let (key, settings) = match payload {
        CreatePayload::Kind(key) => (key, GameSettings::default()),
        CreatePayload::Configured { game_key, settings } => (game_key, settings),
    };
    let kind = GameKind::from_str(&key)
        .map_err(|_| SessionError::Invalid(format!("Unknown game kind '{}'", key)))?;
    let info = state.coordinator.create(&player, kind, settings).await?;
    Ok(Json(info))
}

#[instrument(skip(state))]
async fn list_games(State(state): State<AppState>) -> Result<Json<Vec<GameInfo>>, ApiError> {
    Ok(Json(state.coordinator.registry().list().await?))
}

#[instrument(skip(state))]
async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GameInfo>, ApiError> {
    Ok(Json(state.coordinator.registry().get(&id).await?))
}

#[instrument(skip(state))]
async fn join_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Identity(player): Identity,
) -> Result<Json<GameInfo>, ApiError> {
    Ok(Json(state.coordinator.join(&id, &player).await?))
}

#[instrument(skip(state))]
async fn start_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Identity(player): Identity,
) -> Result<Json<GameView>, ApiError> {
    let updates = state.coordinator.start(&id, &player).await?;
    let view = updates
        .view_for(&player)
        .cloned()
        .unwrap_or(updates.watchers);
    Ok(Json(view))
}

#[instrument(skip(state, body))]
async fn make_move(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Identity(player): Identity,
    Json(body): Json<Value>,
) -> Result<Json<GameView>, ApiError> {
    let MoveBody { mv } = serde_json::from_value(body)
        .map_err(|e| SessionError::Invalid(format!("Bad move request: {}", e)))?;
    let updates = state.coordinator.make_move(&id, &player, mv).await?;
    let view = updates
        .view_for(&player)
        .cloned()
        .unwrap_or(updates.watchers);
    Ok(Json(view))
}

#[instrument(skip(state))]
async fn view_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    MaybeIdentity(player): MaybeIdentity,
) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(
        state
            .coordinator
            .registry()
            .view(&id, player.as_deref())
            .await?,
    ))
}

/// Upgrades to a WebSocket speaking [`ClientMessage`] / [`ServerEvent`].
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (conn, mut rx) = state.hub.connect();
    info!(connection_id = %conn, "WebSocket connection established");

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "Failed to encode event"),
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(message) => state.coordinator.handle(conn, message).await,
                Err(e) => {
                    warn!(connection_id = %conn, error = %e, "Failed to parse message");
                    state.hub.emit_to(
                        conn,
                        ServerEvent::Error {
                            message: format!("Invalid message format: {}", e),
                        },
                    );
                }
            },
            Ok(Message::Close(_)) => {
                info!(connection_id = %conn, "WebSocket closed by client");
                break;
            }
            Err(e) => {
                warn!(connection_id = %conn, error = %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    state.coordinator.disconnect(conn);
    send_task.abort();
}
