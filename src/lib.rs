//! Strategy Town - multiplayer game session coordinator.
//!
//! Hosts turn-based, simultaneous-reveal and timed drawing games behind one
//! session lifecycle. Every transition of a session runs through a per-game
//! queue, and every accepted transition is fanned out as masked per-viewer
//! views.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod coordinator;
mod error;
mod fanout;
mod games;
mod protocol;
mod queue;
mod registry;
mod server;
mod session;
mod store;
mod subscription;
mod whiteboard;

// Crate-level exports
pub use config::{ConfigError, ServerConfig};
pub use coordinator::Coordinator;
pub use error::{Precondition, SessionError};
pub use fanout::{PlayerView, ViewFanout, ViewUpdates};
pub use games::{
    ADVANCE_MOVE, Clock, GameContext, GameKind, GameRules, GameSettings, GameState, GameView,
    GuessMark, GuessRules, GuessState, GuessView, ManualClock, MoveRejection, NimRules, NimState,
    NimView, RandomSource, SequenceRandom, SkribblPhase, SkribblRules, SkribblState, SkribblView,
    SystemClock, ThreadRandom, Viewer, closest_players,
};
pub use protocol::{ClientMessage, ServerEvent, StateUpdate, Stroke};
pub use queue::KeyedQueue;
pub use registry::{JoinOutcome, SessionRegistry, SessionView};
pub use server::{AppState, ApiError, Identity, MaybeIdentity, PLAYER_HEADER, router, ws_handler};
pub use session::{GameInfo, GamePlayInfo, GameSession, GameStatus, PlayerId, SessionId};
pub use store::{MemoryStore, SessionStore, SqliteStore, StoreError, StoreErrorKind};
pub use subscription::{Channel, ConnectionId, RoomHub, Transport};
pub use whiteboard::Whiteboards;
