//! Errors surfaced by session operations.

use crate::games::MoveRejection;
use crate::session::{PlayerId, SessionId};
use crate::store::StoreError;
use derive_more::Display;

/// A session operation that cannot proceed in the current lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Precondition {
    /// Start or join after the game has begun.
    #[display("Game has already started")]
    AlreadyStarted,

    /// A move before the game has begun.
    #[display("Game has not started")]
    NotStarted,

    /// Joining twice.
    #[display("Player {} has already joined", _0)]
    AlreadyJoined(PlayerId),

    /// No free seat.
    #[display("Game is full ({} players)", capacity)]
    Full {
        /// Seats in the game.
        capacity: usize,
    },

    /// Starting with too few players.
    #[display("Need at least {} players, have {}", minimum, players)]
    Underpopulated {
        /// Seated players.
        players: usize,
        /// Players required.
        minimum: usize,
    },

    /// Starting a game one is not part of.
    #[display("Player {} is not in this game", _0)]
    NotAMember(PlayerId),

    /// Moving in a game one is not playing.
    #[display("Player {} is not a player in this game", _0)]
    NotAPlayer(PlayerId),

    /// A move after the game has ended.
    #[display("Game is finished")]
    Finished,

    /// Drawing on a board the connection has not opened.
    #[display("Connection is not watching game {}", _0)]
    NotWatching(SessionId),
}

/// Session operation error.
#[derive(Debug, Display)]
pub enum SessionError {
    /// No session with this ID.
    #[display("Game {} not found", _0)]
    NotFound(SessionId),

    /// Malformed request data, unknown kind or bad settings.
    #[display("Invalid request: {}", _0)]
    Invalid(String),

    /// The lifecycle state forbids the operation.
    #[display("{}", _0)]
    Precondition(Precondition),

    /// The rules refused the move.
    #[display("{}", _0)]
    Rejected(MoveRejection),

    /// Persistence failed.
    #[display("{}", _0)]
    Store(StoreError),
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rejected(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Precondition> for SessionError {
    fn from(err: Precondition) -> Self {
        Self::Precondition(err)
    }
}

impl From<MoveRejection> for SessionError {
    fn from(err: MoveRejection) -> Self {
        Self::Rejected(err)
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}
