//! Game rules.
//!
//! Each kind of game is a stateless [`GameRules`] implementation with its own
//! typed state and view. The closed enums [`GameKind`], [`GameState`] and
//! [`GameView`] dispatch to the right implementation, so the session layer
//! passes state around without ever looking inside it. A new kind is one new
//! rules type plus one arm in each `match` below.

mod context;
mod guess;
mod nim;
mod settings;
mod skribbl;

pub use context::{
    Clock, GameContext, ManualClock, RandomSource, SequenceRandom, SystemClock, ThreadRandom,
};
pub use guess::{GuessMark, GuessRules, GuessState, GuessView, closest_players};
pub use nim::{NimRules, NimState, NimView};
pub use settings::GameSettings;
pub use skribbl::{ADVANCE_MOVE, SkribblPhase, SkribblRules, SkribblState, SkribblView};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

/// Who a view is being computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Viewer {
    /// A spectator, or anyone who is not seated in the game.
    Watcher,
    /// The player at this index.
    Player(usize),
}

impl Viewer {
    /// The seat index, if any.
    pub fn index(self) -> Option<usize> {
        match self {
            Self::Watcher => None,
            Self::Player(index) => Some(index),
        }
    }

    /// Index as exposed to clients: `-1` for watchers.
    pub fn wire_index(self) -> i64 {
        match self {
            Self::Watcher => -1,
            Self::Player(index) => i64::try_from(index).unwrap_or(i64::MAX),
        }
    }
}

/// Why a rules variant refused a move.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum MoveRejection {
    /// The payload has the wrong shape or is out of range.
    #[display("Malformed move: {}", _0)]
    Malformed(String),

    /// Someone else is due to move.
    #[display("It is player {}'s turn, not player {}'s", expected, actual)]
    OutOfTurn {
        /// Index of the player due to move.
        expected: usize,
        /// Index of the player who tried.
        actual: usize,
    },

    /// The game has already finished.
    #[display("Game is already over")]
    GameOver,

    /// Well-formed, but not allowed in the current state.
    #[display("Illegal move: {}", _0)]
    Illegal(String),
}

impl std::error::Error for MoveRejection {}

/// The pure description of one kind of game.
pub trait GameRules {
    /// Authoritative state, opaque outside the rules.
    type State: Clone + Serialize + DeserializeOwned;
    /// Masked projection of the state for one viewer.
    type View: Serialize;

    /// The game cannot start with fewer players.
    fn min_players(&self) -> usize;

    /// The game accepts at most this many players (`None` for no limit).
    fn max_players(&self) -> Option<usize>;

    /// Creates the initial state for `players` seats.
    fn start(&self, players: usize, settings: &GameSettings, ctx: &GameContext) -> Self::State;

    /// Applies an untrusted move by the player at `player`.
    ///
    /// # Errors
    ///
    /// Returns [`MoveRejection`] if the move is malformed or not allowed; the
    /// input state is never modified.
    fn update(
        &self,
        state: &Self::State,
        mv: &Value,
        player: usize,
        ctx: &GameContext,
    ) -> Result<Self::State, MoveRejection>;

    /// Whether the state is terminal.
    fn is_done(&self, state: &Self::State) -> bool;

    /// Projects the state for one viewer.
    fn view_as(&self, state: &Self::State, viewer: Viewer, ctx: &GameContext) -> Self::View;
}

/// Selects which game a session plays.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameKind {
    /// Two players alternately remove one to three objects from a pile.
    Nim,
    /// Everyone secretly guesses a number; closest wins.
    Guess,
    /// Timed drawing rounds; guessers race to name the drawer's word.
    Skribbl,
}

impl GameKind {
    /// Minimum number of players needed to start.
    pub fn min_players(self) -> usize {
        match self {
            Self::Nim => NimRules.min_players(),
            Self::Guess => GuessRules.min_players(),
            Self::Skribbl => SkribblRules.min_players(),
        }
    }

    /// Maximum number of players (`None` for no limit).
    pub fn max_players(self) -> Option<usize> {
        match self {
            Self::Nim => NimRules.max_players(),
            Self::Guess => GuessRules.max_players(),
            Self::Skribbl => SkribblRules.max_players(),
        }
    }

    /// Seat limit for a session: the kind's maximum, lowered by the
    /// creator's `player_count` when one was given.
    pub fn capacity(self, settings: &GameSettings) -> Option<usize> {
        match (self.max_players(), settings.player_count) {
            (Some(max), Some(wanted)) => Some(max.min(wanted)),
            (Some(max), None) => Some(max),
            (None, wanted) => wanted,
        }
    }

    /// Initializes a fresh state of this kind.
    #[instrument(skip(ctx))]
    pub fn start(self, players: usize, settings: &GameSettings, ctx: &GameContext) -> GameState {
        match self {
            Self::Nim => GameState::Nim(NimRules.start(players, settings, ctx)),
            Self::Guess => GameState::Guess(GuessRules.start(players, settings, ctx)),
            Self::Skribbl => GameState::Skribbl(SkribblRules.start(players, settings, ctx)),
        }
    }
}

/// State of any kind of game, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "state", rename_all = "lowercase")]
pub enum GameState {
    /// Nim pile.
    Nim(NimState),
    /// Number guessing.
    Guess(GuessState),
    /// Drawing rounds.
    Skribbl(SkribblState),
}

impl GameState {
    /// The kind this state belongs to.
    pub fn kind(&self) -> GameKind {
        match self {
            Self::Nim(_) => GameKind::Nim,
            Self::Guess(_) => GameKind::Guess,
            Self::Skribbl(_) => GameKind::Skribbl,
        }
    }

    /// Applies a move through the matching rules.
    ///
    /// # Errors
    ///
    /// Returns the rules' [`MoveRejection`] unchanged.
    pub fn update(
        &self,
        mv: &Value,
        player: usize,
        ctx: &GameContext,
    ) -> Result<Self, MoveRejection> {
        match self {
            Self::Nim(state) => NimRules.update(state, mv, player, ctx).map(Self::Nim),
            Self::Guess(state) => GuessRules.update(state, mv, player, ctx).map(Self::Guess),
            Self::Skribbl(state) => SkribblRules
                .update(state, mv, player, ctx)
                .map(Self::Skribbl),
        }
    }

    /// Whether the game has reached a terminal state.
    pub fn is_done(&self) -> bool {
        match self {
            Self::Nim(state) => NimRules.is_done(state),
            Self::Guess(state) => GuessRules.is_done(state),
            Self::Skribbl(state) => SkribblRules.is_done(state),
        }
    }

    /// Computes the view for one viewer.
    pub fn view_as(&self, viewer: Viewer, ctx: &GameContext) -> GameView {
        match self {
            Self::Nim(state) => GameView::Nim(NimRules.view_as(state, viewer, ctx)),
            Self::Guess(state) => GameView::Guess(GuessRules.view_as(state, viewer, ctx)),
            Self::Skribbl(state) => GameView::Skribbl(SkribblRules.view_as(state, viewer, ctx)),
        }
    }
}

/// A view of any kind of game: `{ "type": <kind>, "view": { ... } }` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "view", rename_all = "lowercase")]
pub enum GameView {
    /// Nim view (no hidden information).
    Nim(NimView),
    /// Number-guessing view.
    Guess(GuessView),
    /// Drawing-round view.
    Skribbl(SkribblView),
}

impl GameView {
    /// The kind this view belongs to.
    pub fn kind(&self) -> GameKind {
        match self {
            Self::Nim(_) => GameKind::Nim,
            Self::Guess(_) => GameKind::Guess,
            Self::Skribbl(_) => GameKind::Skribbl,
        }
    }
}

/// Reads a JSON number as an integer, accepting integral floats like `2.0`.
pub(crate) fn json_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_kind_round_trips_through_strings() {
        for kind in GameKind::iter() {
            let name: &'static str = kind.into();
            assert_eq!(GameKind::from_str(name).unwrap(), kind);
        }
        assert!(GameKind::from_str("chess").is_err());
    }

    #[test]
    fn test_capacity_respects_player_count() {
        let settings = GameSettings {
            player_count: Some(4),
            ..GameSettings::default()
        };
        assert_eq!(GameKind::Skribbl.capacity(&settings), Some(4));
        assert_eq!(GameKind::Nim.capacity(&settings), Some(2));
        assert_eq!(GameKind::Guess.capacity(&settings), Some(4));
        assert_eq!(GameKind::Guess.capacity(&GameSettings::default()), None);
    }

    #[test]
    fn test_json_integer_accepts_integral_floats_only() {
        assert_eq!(json_integer(&json!(3)), Some(3));
        assert_eq!(json_integer(&json!(2.0)), Some(2));
        assert_eq!(json_integer(&json!(2.5)), None);
        assert_eq!(json_integer(&json!("2")), None);
    }

    #[test]
    fn test_state_dispatch_reports_kind() {
        let ctx = GameContext::system();
        for kind in GameKind::iter() {
            let state = kind.start(2, &GameSettings::default(), &ctx);
            assert_eq!(state.kind(), kind);
            assert_eq!(state.view_as(Viewer::Watcher, &ctx).kind(), kind);
            assert!(!state.is_done());
        }
    }

    #[test]
    fn test_view_wire_shape_is_tagged() {
        let ctx = GameContext::system();
        let view = GameKind::Nim
            .start(2, &GameSettings::default(), &ctx)
            .view_as(Viewer::Watcher, &ctx);
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["type"], "nim");
        assert_eq!(value["view"]["remaining"], 21);
    }
}
