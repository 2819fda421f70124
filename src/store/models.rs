//! Row mapping for stored sessions.

use chrono::{NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;
use std::str::FromStr;
use tracing::instrument;

use super::{StoreError, StoreErrorKind, schema};
use crate::games::GameKind;
use crate::session::GameSession;

/// One `sessions` row. Structured columns hold JSON text.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SessionRecord {
    id: String,
    kind: String,
    players: String,
    settings: String,
    state: Option<String>,
    done: bool,
    created_at: NaiveDateTime,
    created_by: String,
}

impl SessionRecord {
    /// Encodes a session for storage.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a field cannot be encoded as JSON.
    #[instrument(skip(session), fields(session_id = %session.id))]
    pub fn from_session(session: &GameSession) -> Result<Self, StoreError> {
        Ok(Self {
            id: session.id.clone(),
            kind: session.kind.to_string(),
            players: serde_json::to_string(&session.players)?,
            settings: serde_json::to_string(&session.settings)?,
            state: session
                .state
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            done: session.done,
            created_at: session.created_at.naive_utc(),
            created_by: session.created_by.clone(),
        })
    }

    /// Decodes a stored row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the kind is unknown or a JSON column is corrupt.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn into_session(self) -> Result<GameSession, StoreError> {
        let kind = GameKind::from_str(&self.kind)
            .map_err(|_| {
            StoreError::new(
                StoreErrorKind::Encoding,
                format!("Unknown game kind '{}'", self.kind),
            )
        })?;
        Ok(GameSession {
            id: self.id,
            kind,
            players: serde_json::from_str(&self.players)?,
            settings: serde_json::from_str(&self.settings)?,
            state: self
                .state
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            done: self.done,
            created_at: Utc.from_utc_datetime(&self.created_at),
            created_by: self.created_by,
        })
    }
}
