//! Per-viewer views after a transition, and their delivery.

use crate::games::{GameContext, GameState, GameView, Viewer};
use crate::protocol::{ServerEvent, StateUpdate};
use crate::session::PlayerId;
use crate::subscription::{Channel, Transport};
use derive_new::new;
use std::sync::Arc;
use tracing::{debug, instrument};

/// One player's masked view.
#[derive(Debug, Clone, PartialEq, new)]
pub struct PlayerView {
    /// Whose view this is.
    pub player: PlayerId,
    /// The view itself.
    pub view: GameView,
}

/// Every view produced by one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewUpdates {
    /// What watchers see.
    pub watchers: GameView,
    /// What each player sees, in seat order.
    pub players: Vec<PlayerView>,
}

impl ViewUpdates {
    /// Computes the watcher view and one view per seated player.
    #[instrument(skip_all, fields(players = players.len()))]
    pub fn compute(players: &[PlayerId], state: &GameState, ctx: &GameContext) -> Self {
        Self {
            watchers: state.view_as(Viewer::Watcher, ctx),
            players: players
                .iter()
                .enumerate()
                .map(|(index, player)| {
                    PlayerView::new(player.clone(), state.view_as(Viewer::Player(index), ctx))
                })
                .collect(),
        }
    }

    /// The view computed for one player.
    pub fn view_for(&self, player: &str) -> Option<&GameView> {
        self.players
            .iter()
            .find(|p| p.player == player)
            .map(|p| &p.view)
    }
}

/// Routes views to the right channels.
#[derive(Debug, Clone)]
pub struct ViewFanout {
    transport: Arc<dyn Transport>,
}

impl ViewFanout {
    /// Publishes through `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Sends the watcher view to the game channel and each player view to
    /// that player's channel only.
    #[instrument(skip(self, updates))]
    pub fn publish(&self, game_id: &str, updates: &ViewUpdates) {
        let watchers = self.transport.emit(
            &Channel::Game(game_id.to_string()),
            ServerEvent::GameStateUpdated(StateUpdate::new(updates.watchers.clone(), false)),
        );
        for PlayerView { player, view } in &updates.players {
            self.transport.emit(
                &Channel::Player(game_id.to_string(), player.clone()),
                ServerEvent::GameStateUpdated(StateUpdate::new(view.clone(), true)),
            );
        }
        debug!(watchers, players = updates.players.len(), "Views published");
    }

    /// Tells watchers who is seated.
    #[instrument(skip(self))]
    pub fn publish_players(&self, game_id: &str, players: &[PlayerId]) {
        self.transport.emit(
            &Channel::Game(game_id.to_string()),
            ServerEvent::GamePlayersUpdated(players.to_vec()),
        );
    }
}
