//! Tests for the session lifecycle and per-game move serialization.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use strategy_town::{
    GameContext, GameKind, GameSettings, GameSession, GameStatus, GameView, GuessMark,
    ManualClock, MemoryStore, MoveRejection, NimState, Precondition, SequenceRandom,
    SessionError, SessionRegistry, SessionStore, SkribblPhase, StoreError, closest_players,
};

fn registry_with(draws: Vec<usize>) -> (Arc<ManualClock>, SessionRegistry) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let ctx = GameContext::new(clock.clone(), Arc::new(SequenceRandom::new(draws)));
    (clock, SessionRegistry::new(Arc::new(MemoryStore::new()), ctx))
}

fn registry() -> SessionRegistry {
    registry_with(Vec::new()).1
}

/// Memory store that pauses on every load and save, so unserialized
/// read-modify-write cycles would overlap.
#[derive(Debug, Default)]
struct SlowStore {
    inner: MemoryStore,
}

#[async_trait]
impl SessionStore for SlowStore {
    async fn load_session(&self, id: &str) -> Result<Option<GameSession>, StoreError> {
        let session = self.inner.load_session(id).await?;
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok(session)
    }

    async fn save_session(&self, session: &GameSession) -> Result<(), StoreError> {
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.inner.save_session(session).await
    }

    async fn list_sessions(&self) -> Result<Vec<GameSession>, StoreError> {
        self.inner.list_sessions().await
    }
}

fn slow_registry(draws: Vec<usize>) -> SessionRegistry {
    let ctx = GameContext::new(
        Arc::new(ManualClock::new(1_700_000_000_000)),
        Arc::new(SequenceRandom::new(draws)),
    );
    SessionRegistry::new(Arc::new(SlowStore::default()), ctx)
}

fn nim_view(view: &GameView) -> NimState {
    match view {
        GameView::Nim(state) => *state,
        other => panic!("expected nim view, got {:?}", other),
    }
}

async fn started_nim(registry: &SessionRegistry) -> String {
    let info = registry
        .create("alice", GameKind::Nim, GameSettings::default())
        .await
        .expect("Create failed");
    let outcome = registry.join(&info.id, "bob").await.expect("Join failed");
    assert!(outcome.started.is_some(), "second join should start nim");
    info.id
}

#[tokio::test]
async fn test_create_seats_creator_and_waits() {
    let registry = registry();
    let info = registry
        .create("alice", GameKind::Guess, GameSettings::default())
        .await
        .expect("Create failed");
    assert_eq!(info.players, vec!["alice".to_string()]);
    assert_eq!(info.status, GameStatus::Waiting);
    assert_eq!(info.created_by, "alice");

    let fetched = registry.get(&info.id).await.expect("Get failed");
    assert_eq!(fetched, info);
}

#[tokio::test]
async fn test_create_rejects_bad_settings() {
    let registry = registry();
    let settings = GameSettings {
        round_count: Some(11),
        ..GameSettings::default()
    };
    let err = registry
        .create("alice", GameKind::Skribbl, settings)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Invalid(_)));
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let registry = registry();
    let first = registry
        .create("alice", GameKind::Nim, GameSettings::default())
        .await
        .expect("Create failed");
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = registry
        .create("bob", GameKind::Guess, GameSettings::default())
        .await
        .expect("Create failed");

    let ids: Vec<_> = registry
        .list()
        .await
        .expect("List failed")
        .into_iter()
        .map(|info| info.id)
        .collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn test_unknown_game_is_not_found() {
    let registry = registry();
    assert!(matches!(
        registry.join("nope", "bob").await,
        Err(SessionError::NotFound(_))
    ));
    assert!(matches!(
        registry.submit_move("nope", "bob", json!(1)).await,
        Err(SessionError::NotFound(_))
    ));
    assert!(matches!(
        registry.view("nope", None).await,
        Err(SessionError::NotFound(_))
    ));
    assert_eq!(registry.queue().active_keys(), 0);
}

#[tokio::test]
async fn test_nim_move_then_out_of_turn() {
    let registry = registry();
    let id = started_nim(&registry).await;

    let updates = registry
        .submit_move(&id, "alice", json!(3))
        .await
        .expect("Move failed");
    assert_eq!(
        nim_view(&updates.watchers),
        NimState {
            remaining: 18,
            next_player: 1
        }
    );

    let err = registry
        .submit_move(&id, "alice", json!(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Rejected(MoveRejection::OutOfTurn {
            expected: 1,
            actual: 0
        })
    ));

    let view = registry.view(&id, Some("bob")).await.expect("View failed");
    assert!(view.is_player);
    assert_eq!(
        nim_view(view.play.view.as_ref().expect("no view")),
        NimState {
            remaining: 18,
            next_player: 1
        }
    );
}

#[tokio::test]
async fn test_join_preconditions() {
    let registry = registry();
    let info = registry
        .create("alice", GameKind::Nim, GameSettings::default())
        .await
        .expect("Create failed");

    assert!(matches!(
        registry.join(&info.id, "alice").await,
        Err(SessionError::Precondition(Precondition::AlreadyJoined(_)))
    ));

    registry.join(&info.id, "bob").await.expect("Join failed");
    assert!(matches!(
        registry.join(&info.id, "carol").await,
        Err(SessionError::Precondition(Precondition::AlreadyStarted))
    ));
}

#[tokio::test]
async fn test_player_count_caps_and_autostarts() {
    let registry = registry();
    let settings = GameSettings {
        player_count: Some(3),
        ..GameSettings::default()
    };
    let info = registry
        .create("alice", GameKind::Guess, settings)
        .await
        .expect("Create failed");

    let outcome = registry.join(&info.id, "bob").await.expect("Join failed");
    assert!(outcome.started.is_none());
    assert_eq!(outcome.info.status, GameStatus::Waiting);

    let outcome = registry.join(&info.id, "carol").await.expect("Join failed");
    let started = outcome.started.expect("third join should start");
    assert_eq!(started.players.len(), 3);
    assert_eq!(outcome.info.status, GameStatus::Active);
}

#[tokio::test]
async fn test_start_preconditions() {
    let registry = registry();
    let info = registry
        .create("alice", GameKind::Guess, GameSettings::default())
        .await
        .expect("Create failed");

    assert!(matches!(
        registry.start(&info.id, "alice").await,
        Err(SessionError::Precondition(Precondition::Underpopulated {
            players: 1,
            minimum: 2
        }))
    ));

    registry.join(&info.id, "bob").await.expect("Join failed");
    assert!(matches!(
        registry.start(&info.id, "mallory").await,
        Err(SessionError::Precondition(Precondition::NotAMember(_)))
    ));

    registry.start(&info.id, "bob").await.expect("Start failed");
    assert!(matches!(
        registry.start(&info.id, "alice").await,
        Err(SessionError::Precondition(Precondition::AlreadyStarted))
    ));
}

#[tokio::test]
async fn test_move_preconditions() {
    let registry = registry();
    let info = registry
        .create("alice", GameKind::Guess, GameSettings::default())
        .await
        .expect("Create failed");
    registry.join(&info.id, "bob").await.expect("Join failed");

    assert!(matches!(
        registry.submit_move(&info.id, "alice", json!(5)).await,
        Err(SessionError::Precondition(Precondition::NotStarted))
    ));

    registry.start(&info.id, "alice").await.expect("Start failed");
    assert!(matches!(
        registry.submit_move(&info.id, "mallory", json!(5)).await,
        Err(SessionError::Precondition(Precondition::NotAPlayer(_)))
    ));

    registry
        .submit_move(&info.id, "alice", json!(5))
        .await
        .expect("Move failed");
    registry
        .submit_move(&info.id, "bob", json!(6))
        .await
        .expect("Move failed");
    assert_eq!(
        registry.get(&info.id).await.expect("Get failed").status,
        GameStatus::Done
    );
    assert!(matches!(
        registry.submit_move(&info.id, "bob", json!(7)).await,
        Err(SessionError::Precondition(Precondition::Finished))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_joins_start_once() {
    let registry = slow_registry(Vec::new());
    let info = registry
        .create("alice", GameKind::Nim, GameSettings::default())
        .await
        .expect("Create failed");

    let joins = ["bob", "carol", "dave", "erin"].map(|player| {
        let registry = registry.clone();
        let id = info.id.clone();
        tokio::spawn(async move { registry.join(&id, player).await })
    });

    let mut started = 0;
    let mut joined = 0;
    for handle in joins {
        if let Ok(outcome) = handle.await.expect("Task panicked") {
            joined += 1;
            if outcome.started.is_some() {
                started += 1;
            }
        }
    }
    assert_eq!(joined, 1);
    assert_eq!(started, 1);
    assert_eq!(
        registry.get(&info.id).await.expect("Get failed").players.len(),
        2
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_guesses_all_land() {
    let registry = slow_registry(vec![49]);
    let settings = GameSettings {
        player_count: Some(4),
        ..GameSettings::default()
    };
    let info = registry
        .create("p0", GameKind::Guess, settings)
        .await
        .expect("Create failed");
    for player in ["p1", "p2", "p3"] {
        registry.join(&info.id, player).await.expect("Join failed");
    }

    let guesses = [("p3", 51), ("p0", 10), ("p2", 49), ("p1", 90)];
    let handles = guesses.map(|(player, guess)| {
        let registry = registry.clone();
        let id = info.id.clone();
        tokio::spawn(async move { registry.submit_move(&id, player, json!(guess)).await })
    });
    for handle in handles {
        handle.await.expect("Task panicked").expect("Guess rejected");
    }

    let view = registry.view(&info.id, None).await.expect("View failed");
    let Some(GameView::Guess(view)) = view.play.view else {
        panic!("expected guess view");
    };
    assert_eq!(view.secret, Some(50));
    assert_eq!(
        view.guesses,
        vec![
            GuessMark::Revealed(10),
            GuessMark::Revealed(90),
            GuessMark::Revealed(49),
            GuessMark::Revealed(51)
        ]
    );
    let closest = closest_players(50, &[10, 90, 49, 51]);
    assert_eq!(closest.first(), Some(&2));
    assert_eq!(registry.queue().active_keys(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_nim_moves_are_linearizable() {
    let registry = slow_registry(Vec::new());
    let id = started_nim(&registry).await;

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let registry = registry.clone();
            let id = id.clone();
            let player = if i % 2 == 0 { "alice" } else { "bob" };
            tokio::spawn(async move { registry.submit_move(&id, player, json!(1)).await })
        })
        .collect();

    let mut accepted = Vec::new();
    for handle in handles {
        if let Ok(updates) = handle.await.expect("Task panicked") {
            accepted.push(nim_view(&updates.watchers));
        }
    }

    // Each accepted move took exactly one object from the state left by
    // the one before it.
    let final_view = registry.view(&id, None).await.expect("View failed");
    let final_state = nim_view(final_view.play.view.as_ref().expect("no view"));
    assert_eq!(final_state.remaining as usize, 21 - accepted.len());

    let mut remaining: Vec<u32> = accepted.iter().map(|s| s.remaining).collect();
    remaining.sort_unstable_by(|a, b| b.cmp(a));
    let gap_free: Vec<u32> = (1..=accepted.len() as u32).map(|taken| 21 - taken).collect();
    assert_eq!(remaining, gap_free);
    assert!(!accepted.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_start_racing_final_join_initializes_once() {
    let registry = slow_registry(vec![10]);
    let settings = GameSettings {
        player_count: Some(3),
        ..GameSettings::default()
    };
    for _ in 0..10 {
        let info = registry
            .create("alice", GameKind::Guess, settings.clone())
            .await
            .expect("Create failed");
        registry.join(&info.id, "bob").await.expect("Join failed");

        let start = {
            let registry = registry.clone();
            let id = info.id.clone();
            tokio::spawn(async move { registry.start(&id, "alice").await })
        };
        let join = {
            let registry = registry.clone();
            let id = info.id.clone();
            tokio::spawn(async move { registry.join(&id, "carol").await })
        };

        let started_by_start = start.await.expect("Task panicked").is_ok();
        let started_by_join = match join.await.expect("Task panicked") {
            Ok(outcome) => outcome.started.is_some(),
            Err(err) => {
                assert!(matches!(
                    err,
                    SessionError::Precondition(Precondition::AlreadyStarted)
                ));
                false
            }
        };
        assert!(
            started_by_start ^ started_by_join,
            "exactly one path must start the game"
        );
        assert_eq!(
            registry.get(&info.id).await.expect("Get failed").status,
            GameStatus::Active
        );
    }
}

#[tokio::test]
async fn test_rejected_move_leaves_state() {
    let registry = registry();
    let id = started_nim(&registry).await;

    let before = registry.view(&id, None).await.expect("View failed");
    let err = registry
        .submit_move(&id, "alice", json!(9))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Rejected(MoveRejection::Malformed(_))
    ));
    let after = registry.view(&id, None).await.expect("View failed");
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_skribbl_round_flow_through_registry() {
    let (clock, registry) = registry_with(vec![0, 0]);
    let settings = GameSettings {
        drawing_time: Some(30),
        round_count: Some(2),
        ..GameSettings::default()
    };
    let info = registry
        .create("drawer", GameKind::Skribbl, settings)
        .await
        .expect("Create failed");
    registry.join(&info.id, "guesser").await.expect("Join failed");
    let started = registry.start(&info.id, "drawer").await.expect("Start failed");

    let Some(GameView::Skribbl(drawer_view)) = started.view_for("drawer").cloned() else {
        panic!("expected skribbl view");
    };
    let word = drawer_view.word_to_guess.expect("drawer sees word");
    let Some(GameView::Skribbl(guesser_view)) = started.view_for("guesser").cloned() else {
        panic!("expected skribbl view");
    };
    assert_eq!(guesser_view.word_to_guess, None);

    let updates = registry
        .submit_move(&info.id, "guesser", json!(word))
        .await
        .expect("Guess failed");
    let GameView::Skribbl(view) = updates.watchers else {
        panic!("expected skribbl view");
    };
    assert_eq!(view.game_phase, SkribblPhase::RoundEnd);
    assert_eq!(view.scores, vec![0, 150]);

    clock.advance(Duration::from_secs(31));
    let updates = registry
        .submit_move(&info.id, "guesser", json!("next"))
        .await
        .expect("Advance failed");
    let GameView::Skribbl(view) = updates.watchers else {
        panic!("expected skribbl view");
    };
    assert_eq!(view.game_phase, SkribblPhase::Playing);
    assert_eq!(view.current_round, 2);
    assert_eq!(view.current_drawer, 1);
    assert_eq!(view.time_remaining, 30);
}
