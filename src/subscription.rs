//! Named channels and the connections subscribed to them.

use crate::protocol::ServerEvent;
use crate::session::{PlayerId, SessionId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Identifies one live client connection.
pub type ConnectionId = Uuid;

/// A broadcast channel.
///
/// Watchers of a game share [`Channel::Game`]; each seated player also has a
/// private [`Channel::Player`] that carries their own view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Everyone watching a game: `<game-id>`.
    Game(SessionId),
    /// One player's private feed: `<game-id>-<player-id>`.
    Player(SessionId, PlayerId),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Game(game) => write!(f, "{}", game),
            Self::Player(game, player) => write!(f, "{}-{}", game, player),
        }
    }
}

/// Publish/subscribe contract between the coordinator and connected clients.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Subscribes a connection to a channel.
    fn join(&self, conn: ConnectionId, channel: &Channel);

    /// Unsubscribes a connection from a channel.
    fn leave(&self, conn: ConnectionId, channel: &Channel);

    /// Sends an event to every subscriber; returns how many received it.
    fn emit(&self, channel: &Channel, event: ServerEvent) -> usize;

    /// Sends an event to every subscriber but `except`; returns how many
    /// received it.
    fn emit_except(&self, channel: &Channel, except: ConnectionId, event: ServerEvent) -> usize;

    /// Sends an event to one connection.
    fn emit_to(&self, conn: ConnectionId, event: ServerEvent) -> bool;

    /// Whether a connection is subscribed to a channel.
    fn is_member(&self, conn: ConnectionId, channel: &Channel) -> bool;

    /// Subscribers of a channel.
    fn room_size(&self, channel: &Channel) -> usize;

    /// Drops a connection and all of its subscriptions.
    fn disconnect(&self, conn: ConnectionId);
}

#[derive(Debug, Default)]
struct HubState {
    connections: HashMap<ConnectionId, mpsc::Sender<ServerEvent>>,
    rooms: HashMap<Channel, HashSet<ConnectionId>>,
}

/// In-process [`Transport`] over one bounded mpsc sender per connection.
///
/// A connection whose buffer is full misses the event rather than stalling
/// the sender.
#[derive(Debug)]
pub struct RoomHub {
    buffer: usize,
    state: Mutex<HubState>,
}

impl RoomHub {
    /// Creates a hub whose connections buffer up to `buffer` events.
    #[instrument]
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            state: Mutex::new(HubState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new connection and returns its ID and event stream.
    #[instrument(skip(self))]
    pub fn connect(&self) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let conn = Uuid::new_v4();
        self.state().connections.insert(conn, tx);
        info!(connection_id = %conn, "Connection registered");
        (conn, rx)
    }

    /// Live connections.
    pub fn connection_count(&self) -> usize {
        self.state().connections.len()
    }

    fn broadcast(
        &self,
        channel: &Channel,
        except: Option<ConnectionId>,
        event: &ServerEvent,
    ) -> usize {
        let state = self.state();
        let Some(members) = state.rooms.get(channel) else {
            debug!("No subscribers");
            return 0;
        };
        let delivered = members
            .iter()
            .filter(|conn| Some(**conn) != except)
            .filter_map(|conn| state.connections.get(conn).map(|tx| (conn, tx)))
            .filter(|(conn, tx)| Self::deliver(**conn, tx, event.clone()))
            .count();
        debug!(delivered, "Event emitted");
        delivered
    }

    fn deliver(conn: ConnectionId, tx: &mpsc::Sender<ServerEvent>, event: ServerEvent) -> bool {
        match tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(connection_id = %conn, "Event dropped, channel full");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(connection_id = %conn, "Event dropped, channel closed");
                false
            }
        }
    }
}

impl Transport for RoomHub {
    #[instrument(skip(self, channel), fields(channel = %channel))]
    fn join(&self, conn: ConnectionId, channel: &Channel) {
        let mut state = self.state();
        if !state.connections.contains_key(&conn) {
            warn!(connection_id = %conn, "Join from unknown connection ignored");
            return;
        }
        state.rooms.entry(channel.clone()).or_default().insert(conn);
        debug!(connection_id = %conn, "Joined channel");
    }

    #[instrument(skip(self, channel), fields(channel = %channel))]
    fn leave(&self, conn: ConnectionId, channel: &Channel) {
        let mut state = self.state();
        if let Some(members) = state.rooms.get_mut(channel) {
            members.remove(&conn);
            if members.is_empty() {
                state.rooms.remove(channel);
            }
        }
    }

    #[instrument(skip(self, channel, event), fields(channel = %channel))]
    fn emit(&self, channel: &Channel, event: ServerEvent) -> usize {
        self.broadcast(channel, None, &event)
    }

    #[instrument(skip(self, channel, event), fields(channel = %channel))]
    fn emit_except(&self, channel: &Channel, except: ConnectionId, event: ServerEvent) -> usize {
        self.broadcast(channel, Some(except), &event)
    }

    #[instrument(skip(self, event))]
    fn emit_to(&self, conn: ConnectionId, event: ServerEvent) -> bool {
        let state = self.state();
        state
            .connections
            .get(&conn)
            .is_some_and(|tx| Self::deliver(conn, tx, event))
    }

    fn is_member(&self, conn: ConnectionId, channel: &Channel) -> bool {
        self.state()
            .rooms
            .get(channel)
            .is_some_and(|members| members.contains(&conn))
    }

    fn room_size(&self, channel: &Channel) -> usize {
        self.state().rooms.get(channel).map_or(0, HashSet::len)
    }

    #[instrument(skip(self))]
    fn disconnect(&self, conn: ConnectionId) {
        let mut state = self.state();
        state.connections.remove(&conn);
        state.rooms.retain(|_, members| {
            members.remove(&conn);
            !members.is_empty()
        });
        info!(connection_id = %conn, "Connection removed");
    }
}
