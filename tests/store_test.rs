//! Tests for session persistence.

use std::sync::Arc;

use serde_json::json;
use strategy_town::{
    GameContext, GameKind, GameSession, GameSettings, MemoryStore, SequenceRandom,
    SessionRegistry, SessionStore, SqliteStore, SystemClock,
};
use tempfile::NamedTempFile;

/// Creates a temporary database file and a migrated store. The file handle
/// must stay in scope to keep the file alive.
fn setup_sqlite() -> (NamedTempFile, SqliteStore) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();
    let store = SqliteStore::open(db_path).expect("Failed to open store");
    (db_file, store)
}

fn sample_session(id: &str) -> GameSession {
    GameSession::new(
        id.to_string(),
        GameKind::Skribbl,
        GameSettings {
            player_count: Some(4),
            round_count: Some(2),
            drawing_time: Some(45),
        },
        "alice".to_string(),
    )
}

#[tokio::test]
async fn test_sqlite_save_and_load_unstarted() {
    let (_db, store) = setup_sqlite();
    let session = sample_session("g1");
    store.save_session(&session).await.expect("Save failed");

    let loaded = store
        .load_session("g1")
        .await
        .expect("Load failed")
        .expect("Session missing");
    assert_eq!(loaded.id, session.id);
    assert_eq!(loaded.kind, GameKind::Skribbl);
    assert_eq!(loaded.players, session.players);
    assert_eq!(loaded.settings, session.settings);
    assert_eq!(loaded.state, None);
    assert!(!loaded.done);
    assert_eq!(loaded.created_by, "alice");
    assert_eq!(
        loaded.created_at.timestamp(),
        session.created_at.timestamp()
    );
}

#[tokio::test]
async fn test_sqlite_missing_session_is_none() {
    let (_db, store) = setup_sqlite();
    assert!(store.load_session("nope").await.expect("Load failed").is_none());
}

#[tokio::test]
async fn test_sqlite_save_replaces() {
    let (_db, store) = setup_sqlite();
    let mut session = sample_session("g1");
    store.save_session(&session).await.expect("Save failed");

    session.players.push("bob".to_string());
    let ctx = GameContext::system();
    session.state = Some(GameKind::Skribbl.start(2, &session.settings, &ctx));
    store.save_session(&session).await.expect("Save failed");

    let loaded = store
        .load_session("g1")
        .await
        .expect("Load failed")
        .expect("Session missing");
    assert_eq!(loaded.players, vec!["alice".to_string(), "bob".to_string()]);
    assert_eq!(loaded.state, session.state);
    assert_eq!(store.list_sessions().await.expect("List failed").len(), 1);
}

#[tokio::test]
async fn test_sqlite_list_newest_first() {
    let (_db, store) = setup_sqlite();
    let older = sample_session("old");
    let mut newer = sample_session("new");
    newer.created_at = older.created_at + chrono::Duration::seconds(10);
    store.save_session(&older).await.expect("Save failed");
    store.save_session(&newer).await.expect("Save failed");

    let ids: Vec<_> = store
        .list_sessions()
        .await
        .expect("List failed")
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec!["new".to_string(), "old".to_string()]);
}

#[tokio::test]
async fn test_registry_survives_reopen() {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();
    let ctx = || GameContext::new(Arc::new(SystemClock), Arc::new(SequenceRandom::new([9])));

    let id = {
        let store = SqliteStore::open(db_path.clone()).expect("Failed to open store");
        let registry = SessionRegistry::new(Arc::new(store), ctx());
        let info = registry
            .create("alice", GameKind::Nim, GameSettings::default())
            .await
            .expect("Create failed");
        registry.join(&info.id, "bob").await.expect("Join failed");
        registry
            .submit_move(&info.id, "alice", json!(2))
            .await
            .expect("Move failed");
        info.id
    };

    let store = SqliteStore::open(db_path).expect("Failed to reopen store");
    let registry = SessionRegistry::new(Arc::new(store), ctx());
    let err = registry.submit_move(&id, "alice", json!(1)).await;
    assert!(err.is_err(), "alice already moved");
    registry
        .submit_move(&id, "bob", json!(1))
        .await
        .expect("Move after reopen failed");
}

#[tokio::test]
async fn test_memory_store_round_trip() {
    let store = MemoryStore::new();
    let session = sample_session("g1");
    store.save_session(&session).await.expect("Save failed");
    assert_eq!(
        store.load_session("g1").await.expect("Load failed"),
        Some(session)
    );
    assert!(store.load_session("g2").await.expect("Load failed").is_none());
}
