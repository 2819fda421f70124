//! Nim: two players alternately take one to three objects from a pile.

use super::{GameContext, GameRules, GameSettings, MoveRejection, Viewer, json_integer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

/// Objects on the pile at the start of every game.
pub const START_OBJECTS: u32 = 21;

/// Most objects a single move may take.
pub const MAX_TAKE: u32 = 3;

/// Pile size and whose turn it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NimState {
    /// Objects left on the pile.
    pub remaining: u32,
    /// Index of the player due to move.
    pub next_player: usize,
}

/// Nim hides nothing, so the view is the state.
pub type NimView = NimState;

impl NimState {
    /// The player who took the last object, once the pile is empty.
    pub fn winner(&self) -> Option<usize> {
        (self.remaining == 0).then(|| (self.next_player + 1) % 2)
    }
}

/// Strict-alternation rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct NimRules;

impl GameRules for NimRules {
    type State = NimState;
    type View = NimView;

    fn min_players(&self) -> usize {
        2
    }

    fn max_players(&self) -> Option<usize> {
        Some(2)
    }

    fn start(&self, _players: usize, _settings: &GameSettings, _ctx: &GameContext) -> NimState {
        NimState {
            remaining: START_OBJECTS,
            next_player: 0,
        }
    }

    #[instrument(skip(self, _ctx))]
    fn update(
        &self,
        state: &NimState,
        mv: &Value,
        player: usize,
        _ctx: &GameContext,
    ) -> Result<NimState, MoveRejection> {
        if state.remaining == 0 {
            return Err(MoveRejection::GameOver);
        }
        if player != state.next_player {
            return Err(MoveRejection::OutOfTurn {
                expected: state.next_player,
                actual: player,
            });
        }

        let take = json_integer(mv)
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| (1..=MAX_TAKE).contains(n))
            .ok_or_else(|| {
                MoveRejection::Malformed(format!(
                    "expected an integer from 1 to {}, got {}",
                    MAX_TAKE, mv
                ))
            })?;

        if take > state.remaining {
            return Err(MoveRejection::Illegal(format!(
                "cannot take {} with only {} remaining",
                take, state.remaining
            )));
        }

        let next = NimState {
            remaining: state.remaining - take,
            next_player: (state.next_player + 1) % 2,
        };
        debug!(take, remaining = next.remaining, "Objects taken");
        Ok(next)
    }

    fn is_done(&self, state: &NimState) -> bool {
        state.remaining == 0
    }

    fn view_as(&self, state: &NimState, _viewer: Viewer, _ctx: &GameContext) -> NimView {
        *state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> GameContext {
        GameContext::system()
    }

    fn fresh() -> NimState {
        NimRules.start(2, &GameSettings::default(), &ctx())
    }

    #[test]
    fn test_start_state() {
        assert_eq!(
            fresh(),
            NimState {
                remaining: 21,
                next_player: 0
            }
        );
    }

    #[test]
    fn test_move_then_out_of_turn() {
        let state = NimRules.update(&fresh(), &json!(3), 0, &ctx()).unwrap();
        assert_eq!(state.remaining, 18);
        assert_eq!(state.next_player, 1);

        let again = NimRules.update(&state, &json!(1), 0, &ctx());
        assert_eq!(
            again,
            Err(MoveRejection::OutOfTurn {
                expected: 1,
                actual: 0
            })
        );
    }

    #[test]
    fn test_wrong_player_always_rejected() {
        let mut state = fresh();
        while state.remaining > 0 {
            let wrong = (state.next_player + 1) % 2;
            for take in 0..=4 {
                assert!(NimRules.update(&state, &json!(take), wrong, &ctx()).is_err());
            }
            let take = state.remaining.min(2);
            state = NimRules
                .update(&state, &json!(take), state.next_player, &ctx())
                .unwrap();
        }
    }

    #[test]
    fn test_out_of_range_and_wrong_shape_rejected() {
        let state = fresh();
        for mv in [json!(0), json!(4), json!(-1), json!(1.5), json!("2"), json!(null)] {
            assert!(matches!(
                NimRules.update(&state, &mv, 0, &ctx()),
                Err(MoveRejection::Malformed(_))
            ));
        }
    }

    #[test]
    fn test_cannot_take_more_than_remaining() {
        let state = NimState {
            remaining: 2,
            next_player: 1,
        };
        assert!(matches!(
            NimRules.update(&state, &json!(3), 1, &ctx()),
            Err(MoveRejection::Illegal(_))
        ));
    }

    #[test]
    fn test_terminal_state_accepts_nothing() {
        let state = NimState {
            remaining: 1,
            next_player: 1,
        };
        let done = NimRules.update(&state, &json!(1), 1, &ctx()).unwrap();
        assert!(NimRules.is_done(&done));
        assert_eq!(done.winner(), Some(1));
        for player in 0..2 {
            assert_eq!(
                NimRules.update(&done, &json!(1), player, &ctx()),
                Err(MoveRejection::GameOver)
            );
        }
    }

    #[test]
    fn test_view_is_identity() {
        let state = fresh();
        assert_eq!(NimRules.view_as(&state, Viewer::Watcher, &ctx()), state);
        assert_eq!(NimRules.view_as(&state, Viewer::Player(1), &ctx()), state);
    }
}
