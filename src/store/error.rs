//! Persistence error types.

use derive_more::{Display, Error};
use tracing::instrument;

/// Which part of the store failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StoreErrorKind {
    /// Opening or migrating the database.
    #[display("connection")]
    Connection,
    /// A query against an open database.
    #[display("query")]
    Query,
    /// A stored row that does not decode into a session, or a session that
    /// does not encode.
    #[display("encoding")]
    Encoding,
    /// The blocking task running the query died.
    #[display("task")]
    Task,
}

/// Persistence failure with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Store {} error: {} at {}:{}", kind, message, file, line)]
pub struct StoreError {
    /// What failed.
    pub kind: StoreErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl StoreError {
    /// Creates a new store error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Whether retrying could help: the database was unreachable or the
    /// worker died, as opposed to bad data.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, StoreErrorKind::Connection | StoreErrorKind::Task)
    }
}

impl From<diesel::result::Error> for StoreError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::new(StoreErrorKind::Query, err.to_string())
    }
}

impl From<diesel::ConnectionError> for StoreError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::new(StoreErrorKind::Connection, err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(StoreErrorKind::Encoding, err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    #[track_caller]
    fn from(err: tokio::task::JoinError) -> Self {
        Self::new(StoreErrorKind::Task, err.to_string())
    }
}
