//! Game session records and the summaries handed to clients.

use crate::games::{GameContext, GameKind, GameSettings, GameState, GameView, Viewer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Unique identifier for a game session.
pub type SessionId = String;

/// Resolved identity of a participant.
pub type PlayerId = String;

/// Lifecycle position of a session, derived from its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameStatus {
    /// Accepting players; no state yet.
    Waiting,
    /// Started and accepting moves.
    Active,
    /// Finished.
    Done,
}

/// One game session: who is seated, and the opaque game state once started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    /// Session ID.
    pub id: SessionId,
    /// Which game is played.
    pub kind: GameKind,
    /// Seated players; the position is the player index.
    pub players: Vec<PlayerId>,
    /// Creator-chosen settings.
    pub settings: GameSettings,
    /// `None` until the game starts.
    pub state: Option<GameState>,
    /// Set once the rules report a terminal state, and never cleared.
    pub done: bool,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Who created the session.
    pub created_by: PlayerId,
}

impl GameSession {
    /// Creates an unstarted session with the creator in seat 0.
    #[instrument(skip(settings))]
    pub fn new(id: SessionId, kind: GameKind, settings: GameSettings, creator: PlayerId) -> Self {
        info!(session_id = %id, %kind, "Creating new game session");
        Self {
            id,
            kind,
            players: vec![creator.clone()],
            settings,
            state: None,
            done: false,
            created_at: Utc::now(),
            created_by: creator,
        }
    }

    /// Index of a player, if seated.
    pub fn player_index(&self, player: &str) -> Option<usize> {
        self.players.iter().position(|p| p == player)
    }

    /// Seat limit, if any.
    pub fn capacity(&self) -> Option<usize> {
        self.kind.capacity(&self.settings)
    }

    /// Whether no further player may join.
    pub fn is_full(&self) -> bool {
        self.capacity()
            .is_some_and(|capacity| self.players.len() >= capacity)
    }

    /// Lifecycle position.
    pub fn status(&self) -> GameStatus {
        match (&self.state, self.done) {
            (None, _) => GameStatus::Waiting,
            (Some(_), false) => GameStatus::Active,
            (Some(_), true) => GameStatus::Done,
        }
    }

    /// How this identity sees the game.
    pub fn viewer(&self, player: Option<&str>) -> Viewer {
        player
            .and_then(|p| self.player_index(p))
            .map_or(Viewer::Watcher, Viewer::Player)
    }

    /// Summary of this session.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn info(&self) -> GameInfo {
        GameInfo {
            id: self.id.clone(),
            kind: self.kind,
            status: self.status(),
            players: self.players.clone(),
            created_at: self.created_at,
            created_by: self.created_by.clone(),
            min_players: self.kind.min_players(),
            settings: self.settings.clone(),
        }
    }

    /// The game as one viewer sees it.
    #[instrument(skip(self, ctx), fields(session_id = %self.id))]
    pub fn play_info(&self, viewer: Viewer, ctx: &GameContext) -> GamePlayInfo {
        let view = self.state.as_ref().map(|state| state.view_as(viewer, ctx));
        debug!(has_view = view.is_some(), "Computed play info");
        GamePlayInfo {
            id: self.id.clone(),
            view,
            players: self.players.clone(),
        }
    }
}

/// Summary of a session, as listed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    /// Session ID.
    pub id: SessionId,
    /// Which game is played.
    #[serde(rename = "type")]
    pub kind: GameKind,
    /// Lifecycle position.
    pub status: GameStatus,
    /// Seated players.
    pub players: Vec<PlayerId>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Who created the session.
    pub created_by: PlayerId,
    /// Players needed to start.
    pub min_players: usize,
    /// Creator-chosen settings.
    pub settings: GameSettings,
}

/// The game as one viewer sees it: the masked view, if started.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GamePlayInfo {
    /// Session ID.
    pub id: SessionId,
    /// Absent until the game starts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<GameView>,
    /// Seated players.
    pub players: Vec<PlayerId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(kind: GameKind) -> GameSession {
        GameSession::new(
            "g1".to_string(),
            kind,
            GameSettings::default(),
            "alice".to_string(),
        )
    }

    #[test]
    fn test_new_session_seats_creator() {
        let s = session(GameKind::Nim);
        assert_eq!(s.players, vec!["alice".to_string()]);
        assert_eq!(s.player_index("alice"), Some(0));
        assert_eq!(s.player_index("bob"), None);
        assert_eq!(s.status(), GameStatus::Waiting);
        assert!(!s.done);
    }

    #[test]
    fn test_full_follows_capacity() {
        let mut s = session(GameKind::Nim);
        assert!(!s.is_full());
        s.players.push("bob".to_string());
        assert!(s.is_full());

        let mut g = session(GameKind::Guess);
        g.players.extend((0..20).map(|i| format!("p{}", i)));
        assert!(!g.is_full());
    }

    #[test]
    fn test_viewer_resolution() {
        let s = session(GameKind::Nim);
        assert_eq!(s.viewer(Some("alice")), Viewer::Player(0));
        assert_eq!(s.viewer(Some("mallory")), Viewer::Watcher);
        assert_eq!(s.viewer(None), Viewer::Watcher);
    }

    #[test]
    fn test_info_wire_shape() {
        let value = serde_json::to_value(session(GameKind::Skribbl).info()).unwrap();
        assert_eq!(value["type"], "skribbl");
        assert_eq!(value["status"], "waiting");
        assert_eq!(value["createdBy"], "alice");
        assert_eq!(value["minPlayers"], 2);
    }

    #[test]
    fn test_play_info_has_no_view_before_start() {
        let s = session(GameKind::Nim);
        let info = s.play_info(Viewer::Watcher, &GameContext::system());
        assert!(info.view.is_none());
        let value = serde_json::to_value(&info).unwrap();
        assert!(value.get("view").is_none());
    }
}
