//! Session store integration tests.
//!
//! These tests drive the store through its public operations and check the
//! durable copy written by the persistence layer.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use session_keeper::persist::{codec, DEFAULT_STORAGE_KEY};
use session_keeper::{
    FileBackend, MemoryBackend, PersistOptions, PersistedSession, Persistence, Profile,
    ProfileStatus, SessionState, SessionStore, StorageBackend, User,
};

fn user(id: u64) -> User {
    User::new().with("id", id).with("email", format!("user{id}@example.com"))
}

async fn stored(backend: &MemoryBackend) -> Value {
    let bytes = backend
        .get(DEFAULT_STORAGE_KEY)
        .await
        .unwrap()
        .expect("snapshot should be stored");
    serde_json::from_slice(&bytes).unwrap()
}

async fn stored_session(backend: &MemoryBackend) -> PersistedSession {
    let bytes = backend.get(DEFAULT_STORAGE_KEY).await.unwrap().unwrap();
    codec::decode(&bytes, codec::CURRENT_VERSION).unwrap()
}

fn apply_all(store: &SessionStore) {
    store.set_loading(true);
    store.set_user(Some(user(9)));
    store.set_tokens(Some("a9".into()), Some("r9".into()));
    store.set_profile(Some(Profile::new().with("name", "Kim")));
    store.update_profile(Profile::new().with("age", 30));
    store.set_profile_status(ProfileStatus::Incomplete);
}

// ============================================================================
// In-memory behaviour
// ============================================================================

#[test]
fn test_authenticated_follows_user() {
    let store = SessionStore::new();

    for id in [1, 2, 3] {
        store.set_user(Some(user(id)));
        assert!(store.snapshot().is_authenticated());

        store.set_user(None);
        assert!(!store.snapshot().is_authenticated());
    }
}

#[test]
fn test_update_profile_is_shallow_overwrite() {
    let store = SessionStore::new();

    store.update_profile(Profile::new().with("a", 1));
    store.update_profile(Profile::new().with("b", 2));
    assert_eq!(
        store.snapshot().profile(),
        Some(&Profile::new().with("a", 1).with("b", 2))
    );

    store.update_profile(Profile::new().with("a", 3));
    assert_eq!(
        store.snapshot().profile(),
        Some(&Profile::new().with("a", 3).with("b", 2))
    );
}

#[test]
fn test_logout_from_every_prefix() {
    let steps: Vec<Box<dyn Fn(&SessionStore)>> = vec![
        Box::new(|s: &SessionStore| s.set_loading(true)),
        Box::new(|s: &SessionStore| s.set_user(Some(user(1)))),
        Box::new(|s: &SessionStore| s.set_tokens(Some("a".into()), Some("r".into()))),
        Box::new(|s: &SessionStore| s.set_profile(Some(Profile::new().with("x", 1)))),
        Box::new(|s: &SessionStore| s.update_profile(Profile::new().with("y", 2))),
        Box::new(|s: &SessionStore| s.set_profile_status(ProfileStatus::Complete)),
    ];

    for len in 0..=steps.len() {
        let store = SessionStore::new();
        for step in &steps[..len] {
            step(&store);
        }
        store.logout();
        assert_eq!(*store.snapshot(), SessionState::default(), "prefix {len}");
    }
}

#[test]
fn test_rapid_calls_see_prior_state() {
    let store = SessionStore::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    store.subscribe(move |next, previous| {
        sink.lock().unwrap().push((
            previous.loading(),
            previous.is_authenticated(),
            next.loading(),
            next.is_authenticated(),
        ));
    });

    store.set_loading(true);
    store.set_user(Some(user(1)));
    store.set_loading(false);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (false, false, true, false),
            (true, false, true, true),
            (true, true, false, true),
        ]
    );

    let state = store.snapshot();
    assert!(!state.loading());
    assert!(state.is_authenticated());
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_stored_snapshot_never_has_loading() {
    let backend = Arc::new(MemoryBackend::new());
    let (store, persistence) = Persistence::open(backend.clone(), PersistOptions::default()).await;

    apply_all(&store);
    persistence.flush().await.unwrap();
    assert!(stored(&backend).await["state"].get("loading").is_none());

    store.set_loading(false);
    persistence.flush().await.unwrap();
    assert!(stored(&backend).await["state"].get("loading").is_none());
}

#[tokio::test]
async fn test_restart_restores_state() {
    let backend = Arc::new(MemoryBackend::new());

    let before = {
        let (store, persistence) =
            Persistence::open(backend.clone(), PersistOptions::default()).await;
        apply_all(&store);
        persistence.flush().await.unwrap();
        store.snapshot()
    };

    let (store, _persistence) = Persistence::open(backend, PersistOptions::default()).await;
    let after = store.snapshot();

    assert!(before.loading());
    assert!(!after.loading());
    assert_eq!(after.persisted(), before.persisted());
}

#[tokio::test]
async fn test_logout_clears_durable_copy() {
    let backend = Arc::new(MemoryBackend::new());
    let (store, persistence) = Persistence::open(backend.clone(), PersistOptions::default()).await;

    store.set_tokens(Some("a1".into()), Some("r1".into()));
    store.set_profile(Some(Profile::new().with("name", "Jo")));
    store.set_profile_status(ProfileStatus::Complete);
    persistence.flush().await.unwrap();

    let snapshot = stored_session(&backend).await;
    assert_eq!(snapshot.access_token.as_deref(), Some("a1"));
    assert_eq!(snapshot.profile, Some(Profile::new().with("name", "Jo")));

    store.logout();
    persistence.flush().await.unwrap();

    assert_eq!(stored_session(&backend).await, PersistedSession::default());
    assert_eq!(
        stored(&backend).await,
        json!({
            "state": {
                "user": null,
                "isAuthenticated": false,
                "accessToken": null,
                "refreshToken": null,
                "profile": null,
                "profileStatus": null
            },
            "version": 0
        })
    );

    // A restart after logout must not bring the credentials back.
    let (store, _persistence) = Persistence::open(backend, PersistOptions::default()).await;
    assert!(store.snapshot().is_default());
}

#[tokio::test]
async fn test_failed_writes_do_not_affect_memory() {
    let backend = Arc::new(MemoryBackend::new());
    let (store, persistence) = Persistence::open(backend.clone(), PersistOptions::default()).await;

    backend.set_available(false);
    store.set_tokens(Some("a1".into()), None);
    persistence.flush().await.unwrap();

    assert_eq!(store.snapshot().access_token(), Some("a1"));
    backend.set_available(true);
    assert!(backend.is_empty());

    // The next mutation supersedes the lost write.
    store.set_profile_status(ProfileStatus::Complete);
    persistence.flush().await.unwrap();
    let snapshot = stored_session(&backend).await;
    assert_eq!(snapshot.access_token.as_deref(), Some("a1"));
    assert_eq!(snapshot.profile_status, ProfileStatus::Complete);
}

#[tokio::test]
async fn test_unreadable_backend_starts_at_defaults() {
    let backend = Arc::new(MemoryBackend::new());
    backend
        .set(DEFAULT_STORAGE_KEY, b"{ corrupted".to_vec())
        .await
        .unwrap();

    let (store, _persistence) = Persistence::open(backend.clone(), PersistOptions::default()).await;
    assert!(store.has_hydrated());
    assert!(store.snapshot().is_default());

    backend.set_available(false);
    let (store, _persistence) = Persistence::open(backend, PersistOptions::default()).await;
    assert!(store.has_hydrated());
    assert!(store.snapshot().is_default());
}

#[tokio::test]
async fn test_defaults_visible_before_rehydration() {
    let backend = Arc::new(MemoryBackend::new());
    {
        let (store, persistence) =
            Persistence::open(backend.clone(), PersistOptions::default()).await;
        store.set_user(Some(user(4)));
        persistence.flush().await.unwrap();
    }

    let store = Arc::new(SessionStore::new());
    let persistence = Persistence::attach(Arc::clone(&store), backend, PersistOptions::default());
    assert!(!store.has_hydrated());
    assert!(store.snapshot().is_default());

    assert!(persistence.rehydrate().await);
    assert!(store.snapshot().is_authenticated());
}

#[tokio::test]
async fn test_custom_key_is_isolated() {
    let backend = Arc::new(MemoryBackend::new());
    let (first, first_persistence) =
        Persistence::open(backend.clone(), PersistOptions::new("first")).await;
    let (second, second_persistence) =
        Persistence::open(backend.clone(), PersistOptions::new("second")).await;

    first.set_tokens(Some("one".into()), None);
    second.set_tokens(Some("two".into()), None);
    first_persistence.flush().await.unwrap();
    second_persistence.flush().await.unwrap();

    let (restored, _p) = Persistence::open(backend, PersistOptions::new("first")).await;
    assert_eq!(restored.snapshot().access_token(), Some("one"));
}

#[tokio::test]
async fn test_file_backend_restart() {
    let dir = tempfile::TempDir::new().unwrap();

    {
        let backend = Arc::new(FileBackend::new(dir.path()));
        let (store, persistence) = Persistence::open(backend, PersistOptions::default()).await;
        store.set_user(Some(user(11)));
        store.set_tokens(Some("a11".into()), Some("r11".into()));
        persistence.flush().await.unwrap();
        persistence.detach().await;
    }

    let backend = Arc::new(FileBackend::new(dir.path()));
    let (store, _persistence) = Persistence::open(backend, PersistOptions::default()).await;
    let state = store.snapshot();
    assert_eq!(state.user(), Some(&user(11)));
    assert_eq!(state.refresh_token(), Some("r11"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_writes_follow_mutation_order_across_threads() {
    let backend = Arc::new(MemoryBackend::new());
    let (store, persistence) = Persistence::open(backend.clone(), PersistOptions::default()).await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        handles.push(std::thread::spawn(move || {
            for j in 0..25 {
                store.update_profile(Profile::new().with(format!("t{i}"), j));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    persistence.flush().await.unwrap();
    assert_eq!(
        stored_session(&backend).await,
        store.snapshot().persisted()
    );
}
