//! Wire messages exchanged over the WebSocket.
//!
//! Both directions are `{ "event": <name>, "payload": <body> }`.

use crate::games::GameView;
use crate::session::{GamePlayInfo, PlayerId, SessionId};
use derive_new::new;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server-to-client events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Sent to a connection that started watching a game.
    GameWatched(GamePlayInfo),
    /// The seated players changed.
    GamePlayersUpdated(Vec<PlayerId>),
    /// A new view after a start or an accepted move.
    GameStateUpdated(StateUpdate),
    /// Every stroke drawn so far, sent to a connection opening the board.
    WhiteboardInit(Vec<Stroke>),
    /// One stroke drawn by someone else.
    WhiteboardDraw(Stroke),
    /// The board was wiped.
    WhiteboardClear,
    /// A request from this connection failed.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

/// One viewer's view after a transition.
#[derive(Debug, Clone, PartialEq, Serialize, new)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    /// The tagged view, flattened into the payload.
    #[serde(flatten)]
    pub view: GameView,
    /// Whether the view was computed for the receiving player rather than
    /// for watchers.
    pub for_player: bool,
}

/// One line segment on a game's whiteboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    /// Start x.
    pub x0: f64,
    /// Start y.
    pub y0: f64,
    /// End x.
    pub x1: f64,
    /// End y.
    pub y1: f64,
    /// CSS colour of the pen.
    pub colour: String,
    /// Pen width.
    pub size: f64,
    /// Erasing rather than drawing.
    #[serde(default)]
    pub is_eraser: bool,
}

/// Client-to-server requests.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "event",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Subscribe to a game's watcher channel, and to the player channel when
    /// `player` is seated.
    GameWatch {
        /// Game to watch.
        game_id: SessionId,
        /// Identity, if the client has one.
        #[serde(default)]
        player: Option<PlayerId>,
    },
    /// Take a seat.
    GameJoinAsPlayer {
        /// Game to join.
        game_id: SessionId,
        /// Joining identity.
        player: PlayerId,
    },
    /// Start a game one is seated in.
    GameStart {
        /// Game to start.
        game_id: SessionId,
        /// Requesting identity.
        player: PlayerId,
    },
    /// Submit a move.
    GameMakeMove {
        /// Game to move in.
        game_id: SessionId,
        /// Moving identity.
        player: PlayerId,
        /// Untrusted move payload, interpreted by the game's rules.
        #[serde(rename = "move")]
        mv: Value,
    },
    /// Open a game's whiteboard and receive its strokes so far.
    WhiteboardInit {
        /// Game whose board to open.
        game_id: SessionId,
    },
    /// Add a stroke and relay it to everyone else on the board.
    WhiteboardDraw {
        /// Game whose board to draw on.
        game_id: SessionId,
        /// The segment drawn.
        stroke: Stroke,
    },
    /// Wipe the board for everyone.
    WhiteboardClear {
        /// Game whose board to wipe.
        game_id: SessionId,
    },
}

impl ClientMessage {
    /// The game this request targets.
    pub fn game_id(&self) -> &str {
        match self {
            Self::GameWatch { game_id, .. }
            | Self::GameJoinAsPlayer { game_id, .. }
            | Self::GameStart { game_id, .. }
            | Self::GameMakeMove { game_id, .. }
            | Self::WhiteboardInit { game_id }
            | Self::WhiteboardDraw { game_id, .. }
            | Self::WhiteboardClear { game_id } => game_id,
        }
    }
}
