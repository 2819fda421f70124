//! Session lifecycle: create, join, start, move, view.
//!
//! The registry owns every session transition. Each one loads the session
//! from the store, checks it, asks the rules for the next state, and saves
//! it back, all inside the session's [`KeyedQueue`] slot.

use crate::error::{Precondition, SessionError};
use crate::fanout::ViewUpdates;
use crate::games::{GameContext, GameKind, GameSettings};
use crate::queue::KeyedQueue;
use crate::session::{GameInfo, GamePlayInfo, GameSession, PlayerId};
use crate::store::SessionStore;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    /// The session after the join.
    pub info: GameInfo,
    /// Set when the join filled the last seat and started the game.
    pub started: Option<ViewUpdates>,
}

/// A session as seen by one identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Whether the identity is seated.
    pub is_player: bool,
    /// The view and seated players.
    #[serde(flatten)]
    pub play: GamePlayInfo,
}

/// Owns session state and serializes transitions per session.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    queue: KeyedQueue,
    ctx: GameContext,
}

impl SessionRegistry {
    /// Creates a registry over `store`, with rules consulting `ctx`.
    #[instrument(skip_all)]
    pub fn new(store: Arc<dyn SessionStore>, ctx: GameContext) -> Self {
        info!("Creating session registry");
        Self {
            store,
            queue: KeyedQueue::new(),
            ctx,
        }
    }

    /// Clock and randomness handed to the rules.
    pub fn context(&self) -> &GameContext {
        &self.ctx
    }

    /// Transition queue, shared by every operation on this registry.
    pub fn queue(&self) -> &KeyedQueue {
        &self.queue
    }

    async fn load(&self, id: &str) -> Result<GameSession, SessionError> {
        self.store.load_session(id).await?.ok_or_else(|| {
            debug!(session_id = id, "Session not found");
            SessionError::NotFound(id.to_string())
        })
    }

    /// Creates a session with `creator` in seat 0.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Invalid`] for out-of-range settings.
    #[instrument(skip(self, settings))]
    pub async fn create(
        &self,
        creator: &str,
        kind: GameKind,
        settings: GameSettings,
    ) -> Result<GameInfo, SessionError> {
        settings.validate().map_err(SessionError::Invalid)?;
        let session = GameSession::new(
            Uuid::new_v4().to_string(),
            kind,
            settings,
            creator.to_string(),
        );
        self.store.save_session(&session).await?;
        info!(session_id = %session.id, "Session created");
        Ok(session.info())
    }

    /// Summary of one session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown ID.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<GameInfo, SessionError> {
        Ok(self.load(id).await?.info())
    }

    /// Summaries of every session, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] if the store cannot be read.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<GameInfo>, SessionError> {
        let sessions = self.store.list_sessions().await?;
        debug!(count = sessions.len(), "Listed sessions");
        Ok(sessions.iter().map(GameSession::info).collect())
    }

    /// Seats `player`. Filling the last seat starts the game.
    ///
    /// # Errors
    ///
    /// Returns a [`Precondition`] error if the game has started, the player
    /// is already seated, or no seat is free.
    #[instrument(skip(self))]
    pub async fn join(&self, id: &str, player: &str) -> Result<JoinOutcome, SessionError> {
        self.queue.run_exclusive(id, self.join_queued(id, player)).await
    }

    /// [`Self::join`] for a caller already holding the slot for `id`.
    pub(crate) async fn join_queued(
        &self,
        id: &str,
        player: &str,
    ) -> Result<JoinOutcome, SessionError> {
        let mut session = self.load(id).await?;
        if session.state.is_some() {
            warn!("Join after start");
            return Err(Precondition::AlreadyStarted.into());
        }
        if session.player_index(player).is_some() {
            return Err(Precondition::AlreadyJoined(player.to_string()).into());
        }
        if let Some(capacity) = session.capacity() {
            if session.players.len() >= capacity {
                warn!(capacity, "Join into full game");
                return Err(Precondition::Full { capacity }.into());
            }
        }

        session.players.push(player.to_string());
        info!(seat = session.players.len() - 1, "Player joined");

        let started = if session.is_full()
            && session.players.len() >= session.kind.min_players()
        {
            info!("Last seat filled, starting");
            Some(self.start_locked(&mut session))
        } else {
            None
        };

        self.store.save_session(&session).await?;
        Ok(JoinOutcome {
            info: session.info(),
            started,
        })
    }

    /// Starts the game on behalf of a seated player.
    ///
    /// # Errors
    ///
    /// Returns a [`Precondition`] error if the game has started, the
    /// requester is not seated, or too few players have joined.
    #[instrument(skip(self))]
    pub async fn start(&self, id: &str, requester: &str) -> Result<ViewUpdates, SessionError> {
        self.queue.run_exclusive(id, self.start_queued(id, requester)).await
    }

    /// [`Self::start`] for a caller already holding the slot for `id`.
    pub(crate) async fn start_queued(
        &self,
        id: &str,
        requester: &str,
    ) -> Result<ViewUpdates, SessionError> {
        let mut session = self.load(id).await?;
        if session.state.is_some() {
            return Err(Precondition::AlreadyStarted.into());
        }
        if session.player_index(requester).is_none() {
            return Err(Precondition::NotAMember(requester.to_string()).into());
        }
        let minimum = session.kind.min_players();
        if session.players.len() < minimum {
            return Err(Precondition::Underpopulated {
                players: session.players.len(),
                minimum,
            }
            .into());
        }

        let updates = self.start_locked(&mut session);
        self.store.save_session(&session).await?;
        Ok(updates)
    }

    /// Initializes state. Callers hold the session's queue slot and have
    /// checked the preconditions.
    fn start_locked(&self, session: &mut GameSession) -> ViewUpdates {
        let state = session
            .kind
            .start(session.players.len(), &session.settings, &self.ctx);
        session.done = state.is_done();
        let updates = ViewUpdates::compute(&session.players, &state, &self.ctx);
        session.state = Some(state);
        info!(
            session_id = %session.id,
            kind = %session.kind,
            players = session.players.len(),
            "Game started"
        );
        updates
    }

    /// Applies `mv` on behalf of `player`.
    ///
    /// On rejection the stored state is untouched.
    ///
    /// # Errors
    ///
    /// Returns a [`Precondition`] error if the game is not running or the
    /// mover is not seated, and [`SessionError::Rejected`] if the rules
    /// refuse the move.
    #[instrument(skip(self))]
    pub async fn submit_move(
        &self,
        id: &str,
        player: &str,
        mv: Value,
    ) -> Result<ViewUpdates, SessionError> {
        self.queue
            .run_exclusive(id, self.move_queued(id, player, &mv))
            .await
    }

    /// [`Self::submit_move`] for a caller already holding the slot for `id`.
    pub(crate) async fn move_queued(
        &self,
        id: &str,
        player: &str,
        mv: &Value,
    ) -> Result<ViewUpdates, SessionError> {
        let mut session = self.load(id).await?;
        let Some(state) = session.state.as_ref() else {
            return Err(Precondition::NotStarted.into());
        };
        let Some(index) = session.player_index(player) else {
            warn!("Move from non-player");
            return Err(Precondition::NotAPlayer(player.to_string()).into());
        };
        if session.done {
            return Err(Precondition::Finished.into());
        }

        let next = state.update(mv, index, &self.ctx).map_err(|rejection| {
            debug!(%rejection, "Move rejected");
            SessionError::from(rejection)
        })?;

        session.done = session.done || next.is_done();
        let updates = ViewUpdates::compute(&session.players, &next, &self.ctx);
        session.state = Some(next);
        self.store.save_session(&session).await?;

        info!(player_index = index, done = session.done, "Move accepted");
        Ok(updates)
    }

    /// The session as `player` sees it; a watcher view when not seated.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown ID.
    #[instrument(skip(self))]
    pub async fn view(&self, id: &str, player: Option<&str>) -> Result<SessionView, SessionError> {
        let session = self.load(id).await?;
        let viewer = session.viewer(player);
        Ok(SessionView {
            is_player: viewer.index().is_some(),
            play: session.play_info(viewer, &self.ctx),
        })
    }

    /// Seated players of a session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown ID.
    #[instrument(skip(self))]
    pub async fn players(&self, id: &str) -> Result<Vec<PlayerId>, SessionError> {
        Ok(self.load(id).await?.players)
    }
}
