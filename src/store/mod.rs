//! Session persistence.
//!
//! The registry only talks to [`SessionStore`]. [`MemoryStore`] keeps
//! sessions for the life of the process; [`SqliteStore`] writes them to a
//! diesel-managed SQLite file.

mod error;
mod memory;
mod models;
mod schema; // Diesel schema - internal use only
mod sqlite;

pub use error::{StoreError, StoreErrorKind};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::session::GameSession;

/// Load and save whole sessions by ID.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Loads a session; `None` when the ID is unknown.
    async fn load_session(&self, id: &str) -> Result<Option<GameSession>, StoreError>;

    /// Inserts or replaces a session.
    async fn save_session(&self, session: &GameSession) -> Result<(), StoreError>;

    /// Every session, newest first.
    async fn list_sessions(&self) -> Result<Vec<GameSession>, StoreError>;
}
