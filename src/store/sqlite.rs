//! SQLite session store.

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use super::models::SessionRecord;
use super::{SessionStore, StoreError, StoreErrorKind, schema};
use crate::session::GameSession;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Sessions persisted in a SQLite database file.
///
/// Each call opens its own connection on the blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: String,
}

impl SqliteStore {
    /// Opens the database at `db_path` and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened or migrated.
    #[instrument(skip_all)]
    pub fn open(db_path: impl Into<String>) -> Result<Self, StoreError> {
        let store = Self {
            db_path: db_path.into(),
        };
        let mut conn = store.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| {
                StoreError::new(StoreErrorKind::Connection, format!("Migrations failed: {}", e))
            })?;
        info!(path = %store.db_path, migrations = applied.len(), "Session store ready");
        Ok(store)
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, StoreError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path).map_err(|e| {
            StoreError::new(
                StoreErrorKind::Connection,
                format!("Failed to connect to '{}': {}", self.db_path, e),
            )
        })
    }

    fn load_blocking(&self, id: &str) -> Result<Option<GameSession>, StoreError> {
        let mut conn = self.connection()?;
        schema::sessions::table
            .find(id)
            .select(SessionRecord::as_select())
            .first(&mut conn)
            .optional()?
            .map(SessionRecord::into_session)
            .transpose()
    }

    fn save_blocking(&self, record: SessionRecord) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        diesel::replace_into(schema::sessions::table)
            .values(&record)
            .execute(&mut conn)?;
        Ok(())
    }

    fn list_blocking(&self) -> Result<Vec<GameSession>, StoreError> {
        let mut conn = self.connection()?;
        schema::sessions::table
            .order(schema::sessions::created_at.desc())
            .select(SessionRecord::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(SessionRecord::into_session)
            .collect()
    }
}

#[async_trait::async_trait]
impl SessionStore for SqliteStore {
    #[instrument(skip(self))]
    async fn load_session(&self, id: &str) -> Result<Option<GameSession>, StoreError> {
        let store = self.clone();
        let id = id.to_string();
        let session = tokio::task::spawn_blocking(move || store.load_blocking(&id)).await??;
        debug!(found = session.is_some(), "Session loaded");
        Ok(session)
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    async fn save_session(&self, session: &GameSession) -> Result<(), StoreError> {
        let record = SessionRecord::from_session(session)?;
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.save_blocking(record)).await??;
        debug!("Session saved");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_sessions(&self) -> Result<Vec<GameSession>, StoreError> {
        let store = self.clone();
        let sessions = tokio::task::spawn_blocking(move || store.list_blocking()).await??;
        debug!(count = sessions.len(), "Listed sessions");
        Ok(sessions)
    }
}
