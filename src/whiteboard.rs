//! Drawing boards, one per game.
//!
//! A board is a list of strokes kept only in memory. It is created when
//! someone first opens or draws on it and dropped once nobody is watching
//! the game any more.

use crate::protocol::Stroke;
use crate::session::SessionId;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument};

/// Stroke lists keyed by game.
#[derive(Debug, Default)]
pub struct Whiteboards {
    boards: Mutex<HashMap<SessionId, Vec<Stroke>>>,
}

impl Whiteboards {
    /// Creates an empty set of boards.
    pub fn new() -> Self {
        Self::default()
    }

    fn boards(&self) -> MutexGuard<'_, HashMap<SessionId, Vec<Stroke>>> {
        self.boards.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every stroke on the board, creating an empty board if needed.
    #[instrument(skip(self))]
    pub fn open(&self, game_id: &str) -> Vec<Stroke> {
        let mut boards = self.boards();
        let strokes = boards.entry(game_id.to_string()).or_default().clone();
        debug!(strokes = strokes.len(), "Board opened");
        strokes
    }

    /// Appends a stroke, then hands it to `relay` before the next stroke on
    /// this board can be recorded.
    #[instrument(skip(self, stroke, relay))]
    pub fn draw(&self, game_id: &str, stroke: Stroke, relay: impl FnOnce(&Stroke)) {
        let mut boards = self.boards();
        let board = boards.entry(game_id.to_string()).or_default();
        board.push(stroke);
        if let Some(stroke) = board.last() {
            relay(stroke);
        }
    }

    /// Empties the board, then calls `relay` while no stroke can slip in.
    #[instrument(skip(self, relay))]
    pub fn clear(&self, game_id: &str, relay: impl FnOnce()) {
        let mut boards = self.boards();
        boards.insert(game_id.to_string(), Vec::new());
        relay();
        debug!("Board cleared");
    }

    /// Number of strokes on a board; zero when it does not exist.
    pub fn stroke_count(&self, game_id: &str) -> usize {
        self.boards().get(game_id).map_or(0, Vec::len)
    }

    /// Number of live boards.
    pub fn board_count(&self) -> usize {
        self.boards().len()
    }

    /// Drops every board for which `keep` is false; returns how many went.
    #[instrument(skip_all)]
    pub fn retain(&self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let mut boards = self.boards();
        let before = boards.len();
        boards.retain(|game_id, _| keep(game_id));
        let dropped = before - boards.len();
        if dropped > 0 {
            info!(dropped, "Unwatched boards dropped");
        }
        dropped
    }
}
