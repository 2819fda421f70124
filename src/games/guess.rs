//! Number guessing: every player secretly submits one guess; the secret and
//! all guesses are revealed once everyone has guessed.

use super::{GameContext, GameRules, GameSettings, MoveRejection, Viewer, json_integer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, instrument};

/// Smallest secret and smallest legal guess.
pub const SECRET_MIN: u32 = 1;
/// Largest secret and largest legal guess.
pub const SECRET_MAX: u32 = 100;

/// The secret and each player's guess, if submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessState {
    /// Number the players are trying to hit.
    pub secret: u32,
    /// One slot per player index.
    pub guesses: Vec<Option<u32>>,
}

impl GuessState {
    fn all_guessed(&self) -> bool {
        self.guesses.iter().all(Option::is_some)
    }
}

/// What one viewer may know about one player's guess.
///
/// Serialized as `false` (not yet), `true` (submitted, hidden) or the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessMark {
    /// The player has not guessed yet.
    Pending,
    /// The player guessed, but the value is hidden from this viewer.
    Hidden,
    /// The guess itself.
    Revealed(u32),
}

impl Serialize for GuessMark {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Pending => serializer.serialize_bool(false),
            Self::Hidden => serializer.serialize_bool(true),
            Self::Revealed(value) => serializer.serialize_u32(*value),
        }
    }
}

/// Masked projection of a [`GuessState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuessView {
    /// Only present once everyone has guessed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<u32>,
    /// One mark per player index.
    pub guesses: Vec<GuessMark>,
}

/// Simultaneous-reveal rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuessRules;

impl GameRules for GuessRules {
    type State = GuessState;
    type View = GuessView;

    fn min_players(&self) -> usize {
        2
    }

    fn max_players(&self) -> Option<usize> {
        None
    }

    #[instrument(skip(self, _settings, ctx))]
    fn start(&self, players: usize, _settings: &GameSettings, ctx: &GameContext) -> GuessState {
        let span = (SECRET_MAX - SECRET_MIN + 1) as usize;
        let offset = u32::try_from(ctx.draw(span)).unwrap_or(0);
        GuessState {
            secret: SECRET_MIN + offset,
            guesses: vec![None; players],
        }
    }

    #[instrument(skip(self, state, _ctx))]
    fn update(
        &self,
        state: &GuessState,
        mv: &Value,
        player: usize,
        _ctx: &GameContext,
    ) -> Result<GuessState, MoveRejection> {
        match state.guesses.get(player) {
            None => {
                return Err(MoveRejection::Illegal(format!(
                    "no player at index {}",
                    player
                )));
            }
            Some(Some(_)) => {
                return Err(MoveRejection::Illegal("already guessed".to_string()));
            }
            Some(None) => {}
        }

        let guess = json_integer(mv)
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| (SECRET_MIN..=SECRET_MAX).contains(n))
            .ok_or_else(|| {
                MoveRejection::Malformed(format!(
                    "expected an integer from {} to {}, got {}",
                    SECRET_MIN, SECRET_MAX, mv
                ))
            })?;

        let mut next = state.clone();
        next.guesses[player] = Some(guess);
        debug!(player, "Guess recorded");
        Ok(next)
    }

    fn is_done(&self, state: &GuessState) -> bool {
        state.all_guessed()
    }

    fn view_as(&self, state: &GuessState, viewer: Viewer, _ctx: &GameContext) -> GuessView {
        if state.all_guessed() {
            return GuessView {
                secret: Some(state.secret),
                guesses: state
                    .guesses
                    .iter()
                    .map(|g| g.map_or(GuessMark::Pending, GuessMark::Revealed))
                    .collect(),
            };
        }

        let own = viewer.index();
        GuessView {
            secret: None,
            guesses: state
                .guesses
                .iter()
                .enumerate()
                .map(|(index, guess)| match guess {
                    None => GuessMark::Pending,
                    Some(value) if own == Some(index) => GuessMark::Revealed(*value),
                    Some(_) => GuessMark::Hidden,
                })
                .collect(),
        }
    }
}

/// Indices of every guess at minimum distance from the secret.
///
/// Ties are not broken: all equally close players are returned.
pub fn closest_players(secret: u32, guesses: &[u32]) -> Vec<usize> {
    let Some(best) = guesses.iter().map(|g| g.abs_diff(secret)).min() else {
        return Vec::new();
    };
    guesses
        .iter()
        .enumerate()
        .filter(|(_, g)| g.abs_diff(secret) == best)
        .map(|(index, _)| index)
        .collect()
}
