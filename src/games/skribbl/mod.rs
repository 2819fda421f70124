//! Drawing rounds.
//!
//! One player draws a hidden word while the others race to name it. Rounds
//! run on the clock seam: once the budget elapses, or every guesser has hit,
//! the next move of any kind ends the round. A round-end is left with the
//! [`ADVANCE_MOVE`].

mod words;

pub use words::WORDS;

use super::{GameContext, GameRules, GameSettings, MoveRejection, Viewer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

/// Move that leaves a finished round.
pub const ADVANCE_MOVE: &str = "next";

/// Points for any correct guess.
pub const BASE_POINTS: u32 = 100;
/// Extra points for guessing instantly, scaled down with elapsed time.
pub const TIME_BONUS: u32 = 50;
/// Rounds when the creator does not choose.
pub const DEFAULT_ROUNDS: u32 = 3;
/// Seconds per round when the creator does not choose.
pub const DEFAULT_DRAWING_TIME: u32 = 90;

/// Where a game is in its round cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum SkribblPhase {
    /// Someone is drawing and guesses are accepted.
    Playing,
    /// The word is revealed; waiting for someone to advance.
    RoundEnd,
    /// All rounds played.
    GameEnd,
}

/// Full state of a drawing game, including the hidden word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkribblState {
    /// Rounds in this game.
    pub total_rounds: u32,
    /// Seconds per round.
    pub round_time_limit: u32,
    /// Words not yet drawn.
    pub word_pool: Vec<String>,
    /// One-based round number.
    pub current_round: u32,
    /// Index of the drawing player.
    pub current_drawer: usize,
    /// The word being drawn.
    pub current_word: String,
    /// Milliseconds since the epoch when the round began.
    pub round_started_at: i64,
    /// Round cycle position.
    pub phase: SkribblPhase,
    /// Running score per player index.
    pub scores: Vec<u32>,
    /// Players who already hit this round, in order of guessing.
    pub correct_guessers: Vec<usize>,
}

impl SkribblState {
    fn budget_millis(&self) -> i64 {
        i64::from(self.round_time_limit) * 1000
    }

    fn remaining_millis(&self, ctx: &GameContext) -> i64 {
        let elapsed = ctx.now_millis() - self.round_started_at;
        (self.budget_millis() - elapsed).max(0)
    }

    fn time_up(&self, ctx: &GameContext) -> bool {
        ctx.now_millis() - self.round_started_at >= self.budget_millis()
    }

    fn all_guessed(&self) -> bool {
        self.correct_guessers.len() + 1 >= self.scores.len()
    }

    fn round_over(&self, ctx: &GameContext) -> bool {
        self.time_up(ctx) || self.all_guessed()
    }

    fn points(&self, ctx: &GameContext) -> u32 {
        let budget = self.budget_millis();
        if budget <= 0 {
            return BASE_POINTS;
        }
        let bonus = (i64::from(TIME_BONUS) * self.remaining_millis(ctx) / budget)
            .clamp(0, i64::from(TIME_BONUS));
        BASE_POINTS + u32::try_from(bonus).unwrap_or(0)
    }

    /// Takes the next word out of the pool, refilling it when empty.
    fn draw_word(&mut self, ctx: &GameContext) -> String {
        if self.word_pool.is_empty() {
            debug!("Word pool exhausted, refilling");
            self.word_pool = WORDS
                .iter()
                .filter(|word| **word != self.current_word)
                .map(|word| (*word).to_string())
                .collect();
        }
        let index = ctx.draw(self.word_pool.len());
        self.word_pool.remove(index)
    }

    #[instrument(skip(self, ctx), fields(round = self.current_round, phase = %self.phase))]
    fn advance(mut self, ctx: &GameContext) -> Self {
        match self.phase {
            SkribblPhase::Playing => {
                self.phase = SkribblPhase::RoundEnd;
                info!(word = %self.current_word, "Round ended");
            }
            SkribblPhase::RoundEnd if self.current_round >= self.total_rounds => {
                self.phase = SkribblPhase::GameEnd;
                info!(scores = ?self.scores, "Game ended");
            }
            SkribblPhase::RoundEnd => {
                self.current_word = self.draw_word(ctx);
                self.current_round += 1;
                self.current_drawer = (self.current_drawer + 1) % self.scores.len().max(1);
                self.round_started_at = ctx.now_millis();
                self.correct_guessers.clear();
                self.phase = SkribblPhase::Playing;
                info!(
                    round = self.current_round,
                    drawer = self.current_drawer,
                    "Round started"
                );
            }
            SkribblPhase::GameEnd => {}
        }
        self
    }
}

/// What one viewer sees of a drawing game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkribblView {
    /// One-based round number.
    pub current_round: u32,
    /// Rounds in this game.
    pub total_rounds: u32,
    /// Index of the drawing player.
    pub current_drawer: usize,
    /// Whole seconds left in the round, never negative.
    pub time_remaining: i64,
    /// Running score per player index.
    pub scores: Vec<u32>,
    /// Round cycle position.
    pub game_phase: SkribblPhase,
    /// The viewer's own index, `-1` for watchers.
    pub my_player_index: i64,
    /// Shown to the drawer, and to everyone once the round is over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_to_guess: Option<String>,
    /// Per player index, whether they hit this round.
    pub players_guessed_correctly: Vec<bool>,
}

/// Timed round-robin drawing rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkribblRules;

impl GameRules for SkribblRules {
    type State = SkribblState;
    type View = SkribblView;

    fn min_players(&self) -> usize {
        2
    }

    fn max_players(&self) -> Option<usize> {
        Some(8)
    }

    #[instrument(skip(self, ctx))]
    fn start(&self, players: usize, settings: &GameSettings, ctx: &GameContext) -> SkribblState {
        let mut state = SkribblState {
            total_rounds: settings.round_count.unwrap_or(DEFAULT_ROUNDS),
            round_time_limit: settings.drawing_time.unwrap_or(DEFAULT_DRAWING_TIME),
            word_pool: WORDS.iter().map(|word| (*word).to_string()).collect(),
            current_round: 1,
            current_drawer: 0,
            current_word: String::new(),
            round_started_at: ctx.now_millis(),
            phase: SkribblPhase::Playing,
            scores: vec![0; players],
            correct_guessers: Vec::new(),
        };
        state.current_word = state.draw_word(ctx);
        state
    }

    #[instrument(skip(self, state, ctx), fields(phase = %state.phase))]
    fn update(
        &self,
        state: &SkribblState,
        mv: &Value,
        player: usize,
        ctx: &GameContext,
    ) -> Result<SkribblState, MoveRejection> {
        if state.phase == SkribblPhase::RoundEnd && mv.as_str() == Some(ADVANCE_MOVE) {
            debug!(player, "Advancing past round end");
            return Ok(state.clone().advance(ctx));
        }

        if state.phase == SkribblPhase::Playing && state.round_over(ctx) {
            debug!(time_up = state.time_up(ctx), "Round over, forcing advance");
            return Ok(state.clone().advance(ctx));
        }

        let guess = mv
            .as_str()
            .map(str::trim)
            .filter(|word| !word.is_empty() && word.chars().all(|c| c.is_ascii_alphabetic()))
            .ok_or_else(|| {
                MoveRejection::Malformed(format!("expected a single word, got {}", mv))
            })?;

        match state.phase {
            SkribblPhase::Playing => {}
            SkribblPhase::RoundEnd => {
                return Err(MoveRejection::Illegal("the round is over".to_string()));
            }
            SkribblPhase::GameEnd => return Err(MoveRejection::GameOver),
        }
        if player >= state.scores.len() {
            return Err(MoveRejection::Illegal(format!(
                "no player at index {}",
                player
            )));
        }
        if player == state.current_drawer {
            return Err(MoveRejection::Illegal(
                "the drawer cannot guess".to_string(),
            ));
        }
        if state.correct_guessers.contains(&player) {
            return Err(MoveRejection::Illegal(
                "already guessed this round".to_string(),
            ));
        }

        let mut next = state.clone();
        if guess.eq_ignore_ascii_case(&state.current_word) {
            let points = state.points(ctx);
            next.correct_guessers.push(player);
            next.scores[player] += points;
            info!(player, points, "Correct guess");
        } else {
            debug!(player, "Wrong guess");
        }

        if next.round_over(ctx) {
            next = next.advance(ctx);
        }
        Ok(next)
    }

    fn is_done(&self, state: &SkribblState) -> bool {
        state.phase == SkribblPhase::GameEnd
    }

    fn view_as(&self, state: &SkribblState, viewer: Viewer, ctx: &GameContext) -> SkribblView {
        let is_drawer = viewer.index() == Some(state.current_drawer);
        let reveal = is_drawer || state.phase != SkribblPhase::Playing;
        SkribblView {
            current_round: state.current_round,
            total_rounds: state.total_rounds,
            current_drawer: state.current_drawer,
            time_remaining: state.remaining_millis(ctx) / 1000,
            scores: state.scores.clone(),
            game_phase: state.phase,
            my_player_index: viewer.wire_index(),
            word_to_guess: reveal.then(|| state.current_word.clone()),
            players_guessed_correctly: (0..state.scores.len())
                .map(|index| state.correct_guessers.contains(&index))
                .collect(),
        }
    }
}
