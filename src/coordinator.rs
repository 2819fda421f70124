//! Glue between connections, the registry and the fan-out.
//!
//! Both request surfaces go through here, so a REST move reaches WebSocket
//! watchers exactly like a WebSocket move does. Every transition is
//! published before the game's queue slot is released, so subscribers see
//! transitions in the order they were accepted.

use crate::error::{Precondition, SessionError};
use crate::fanout::{ViewFanout, ViewUpdates};
use crate::games::{GameKind, GameSettings};
use crate::protocol::{ClientMessage, ServerEvent, Stroke};
use crate::registry::{SessionRegistry, SessionView};
use crate::session::GameInfo;
use crate::subscription::{Channel, ConnectionId, Transport};
use crate::whiteboard::Whiteboards;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Runs session operations and publishes their results.
#[derive(Debug, Clone)]
pub struct Coordinator {
    registry: SessionRegistry,
    transport: Arc<dyn Transport>,
    fanout: ViewFanout,
    whiteboards: Arc<Whiteboards>,
}

impl Coordinator {
    /// Wires a registry to a transport.
    #[instrument(skip_all)]
    pub fn new(registry: SessionRegistry, transport: Arc<dyn Transport>) -> Self {
        let fanout = ViewFanout::new(Arc::clone(&transport));
        Self {
            registry,
            transport,
            fanout,
            whiteboards: Arc::new(Whiteboards::new()),
        }
    }

    /// The underlying registry, for read-only queries.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Drawing boards of every watched game.
    pub fn whiteboards(&self) -> &Whiteboards {
        &self.whiteboards
    }

    /// Creates a session.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionRegistry::create`] failures.
    #[instrument(skip(self, settings))]
    pub async fn create(
        &self,
        creator: &str,
        kind: GameKind,
        settings: GameSettings,
    ) -> Result<GameInfo, SessionError> {
        self.registry.create(creator, kind, settings).await
    }

    /// Subscribes `conn` to a game, plus the player channel when `player`
    /// is seated, and sends it the current view.
    ///
    /// Runs in the game's queue slot, so no transition lands between the
    /// snapshot and the subscription.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown game.
    #[instrument(skip(self))]
    pub async fn watch(
        &self,
        conn: ConnectionId,
        game_id: &str,
        player: Option<&str>,
    ) -> Result<SessionView, SessionError> {
        self.registry
            .queue()
            .run_exclusive(game_id, self.watch_queued(conn, game_id, player))
            .await
    }

    async fn watch_queued(
        &self,
        conn: ConnectionId,
        game_id: &str,
        player: Option<&str>,
    ) -> Result<SessionView, SessionError> {
        let view = self.registry.view(game_id, player).await?;
        self.transport
            .join(conn, &Channel::Game(game_id.to_string()));
        if view.is_player {
            if let Some(player) = player {
                self.transport
                    .join(conn, &Channel::Player(game_id.to_string(), player.to_string()));
            }
        }
        self.transport
            .emit_to(conn, ServerEvent::GameWatched(view.play.clone()));
        debug!(is_player = view.is_player, "Watching");
        Ok(view)
    }

    /// Seats `player` from a live connection and subscribes it to both
    /// channels before anything is published, so the joiner also receives
    /// the first views when its join starts the game.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionRegistry::join`] failures.
    #[instrument(skip(self))]
    pub async fn join_as_player(
        &self,
        conn: ConnectionId,
        game_id: &str,
        player: &str,
    ) -> Result<GameInfo, SessionError> {
        self.registry
            .queue()
            .run_exclusive(game_id, self.join_queued(Some(conn), game_id, player))
            .await
    }

    /// Seats `player` and tells watchers; publishes views if the join
    /// started the game.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionRegistry::join`] failures.
    #[instrument(skip(self))]
    pub async fn join(&self, game_id: &str, player: &str) -> Result<GameInfo, SessionError> {
        self.registry
            .queue()
            .run_exclusive(game_id, self.join_queued(None, game_id, player))
            .await
    }

    async fn join_queued(
        &self,
        conn: Option<ConnectionId>,
        game_id: &str,
        player: &str,
    ) -> Result<GameInfo, SessionError> {
        let outcome = self.registry.join_queued(game_id, player).await?;
        if let Some(conn) = conn {
            self.transport
                .join(conn, &Channel::Game(game_id.to_string()));
            self.transport
                .join(conn, &Channel::Player(game_id.to_string(), player.to_string()));
        }
        self.fanout.publish_players(game_id, &outcome.info.players);
        if let Some(updates) = &outcome.started {
            self.fanout.publish(game_id, updates);
        }
        Ok(outcome.info)
    }

    /// Starts a game and publishes the first views.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionRegistry::start`] failures.
    #[instrument(skip(self))]
    pub async fn start(&self, game_id: &str, player: &str) -> Result<ViewUpdates, SessionError> {
        self.registry
            .queue()
            .run_exclusive(game_id, self.start_queued(game_id, player))
            .await
    }

    async fn start_queued(&self, game_id: &str, player: &str) -> Result<ViewUpdates, SessionError> {
        let updates = self.registry.start_queued(game_id, player).await?;
        self.fanout.publish(game_id, &updates);
        Ok(updates)
    }

    /// Applies a move and publishes the resulting views.
    ///
    /// Nothing is published for a rejected move.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionRegistry::submit_move`] failures.
    #[instrument(skip(self))]
    pub async fn make_move(
        &self,
        game_id: &str,
        player: &str,
        mv: Value,
    ) -> Result<ViewUpdates, SessionError> {
        self.registry
            .queue()
            .run_exclusive(game_id, self.move_queued(game_id, player, &mv))
            .await
    }

    async fn move_queued(
        &self,
        game_id: &str,
        player: &str,
        mv: &Value,
    ) -> Result<ViewUpdates, SessionError> {
        let updates = self.registry.move_queued(game_id, player, mv).await?;
        self.fanout.publish(game_id, &updates);
        Ok(updates)
    }

    /// Subscribes `conn` to a game and sends it the board so far.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an unknown game.
    #[instrument(skip(self))]
    pub async fn open_whiteboard(
        &self,
        conn: ConnectionId,
        game_id: &str,
    ) -> Result<usize, SessionError> {
        self.registry.get(game_id).await?;
        self.transport
            .join(conn, &Channel::Game(game_id.to_string()));
        let strokes = self.whiteboards.open(game_id);
        let count = strokes.len();
        self.transport
            .emit_to(conn, ServerEvent::WhiteboardInit(strokes));
        Ok(count)
    }

    /// Records a stroke and relays it to everyone watching but the sender.
    ///
    /// # Errors
    ///
    /// Returns [`Precondition::NotWatching`] unless `conn` is subscribed to
    /// the game.
    #[instrument(skip(self, stroke))]
    pub fn draw(
        &self,
        conn: ConnectionId,
        game_id: &str,
        stroke: Stroke,
    ) -> Result<(), SessionError> {
        let channel = self.watched_channel(conn, game_id)?;
        self.whiteboards.draw(game_id, stroke, |stroke| {
            self.transport
                .emit_except(&channel, conn, ServerEvent::WhiteboardDraw(stroke.clone()));
        });
        Ok(())
    }

    /// Wipes the board for everyone watching, the sender included.
    ///
    /// # Errors
    ///
    /// Returns [`Precondition::NotWatching`] unless `conn` is subscribed to
    /// the game.
    #[instrument(skip(self))]
    pub fn clear_whiteboard(&self, conn: ConnectionId, game_id: &str) -> Result<(), SessionError> {
        let channel = self.watched_channel(conn, game_id)?;
        self.whiteboards.clear(game_id, || {
            self.transport.emit(&channel, ServerEvent::WhiteboardClear);
        });
        Ok(())
    }

    fn watched_channel(&self, conn: ConnectionId, game_id: &str) -> Result<Channel, SessionError> {
        let channel = Channel::Game(game_id.to_string());
        if self.transport.is_member(conn, &channel) {
            Ok(channel)
        } else {
            Err(Precondition::NotWatching(game_id.to_string()).into())
        }
    }

    /// Dispatches one message from a live connection.
    ///
    /// Failures go back to that connection as an error event.
    #[instrument(skip(self, message), fields(game_id = %message.game_id()))]
    pub async fn handle(&self, conn: ConnectionId, message: ClientMessage) {
        let result = match message {
            ClientMessage::GameWatch { game_id, player } => self
                .watch(conn, &game_id, player.as_deref())
                .await
                .map(|_| ()),
            ClientMessage::GameJoinAsPlayer { game_id, player } => self
                .join_as_player(conn, &game_id, &player)
                .await
                .map(|_| ()),
            ClientMessage::GameStart { game_id, player } => {
                self.start(&game_id, &player).await.map(|_| ())
            }
            ClientMessage::GameMakeMove {
                game_id,
                player,
                mv,
            } => self.make_move(&game_id, &player, mv).await.map(|_| ()),
            ClientMessage::WhiteboardInit { game_id } => {
                self.open_whiteboard(conn, &game_id).await.map(|_| ())
            }
            ClientMessage::WhiteboardDraw { game_id, stroke } => {
                self.draw(conn, &game_id, stroke)
            }
            ClientMessage::WhiteboardClear { game_id } => self.clear_whiteboard(conn, &game_id),
        };

        if let Err(e) = result {
            warn!(connection_id = %conn, error = %e, "Request failed");
            self.transport.emit_to(
                conn,
                ServerEvent::Error {
                    message: e.to_string(),
                },
            );
        }
    }

    /// Forgets a closed connection and drops boards nobody watches.
    #[instrument(skip(self))]
    pub fn disconnect(&self, conn: ConnectionId) {
        self.transport.disconnect(conn);
        self.whiteboards.retain(|game_id| {
            self.transport
                .room_size(&Channel::Game(game_id.to_string()))
                > 0
        });
        info!(connection_id = %conn, "Connection closed");
    }
}
