use chrono::Duration;
use practice_core::model::{
    Difficulty, Operation, PracticeSettings, Question, QuestionId, SessionRecord,
};
use practice_core::time::fixed_now;
use practice_core::tracker::ProgressTracker;
use storage::repository::{
    ProgressRepository, SESSION_LOG_LIMIT, SessionLogRepository, SettingsRepository, Storage,
};
use storage::sqlite::SqliteRepository;

fn tracker_with_history() -> ProgressTracker {
    let mut tracker = ProgressTracker::new(fixed_now());
    let mut questions = Vec::new();
    for id in 1..=10 {
        let mut q = Question::new(QuestionId::new(id), Operation::Addition, 3, 4, 7);
        tracker.record_answer(&q, 7.0, true, fixed_now());
        q.record_answer(7.0, 2_000);
        questions.push(q);
    }
    let result = practice_core::model::SessionResult::from_questions(
        Operation::Addition,
        Difficulty::Easy,
        fixed_now(),
        fixed_now() + Duration::seconds(20),
        &questions,
    )
    .unwrap();
    tracker.record_session(&result, fixed_now());
    tracker
}

#[tokio::test]
async fn sqlite_roundtrip_persists_progress_snapshot() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_progress?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert!(repo.load_progress().await.unwrap().is_none());

    let tracker = tracker_with_history();
    repo.save_progress(tracker.state(), fixed_now())
        .await
        .unwrap();

    let loaded = repo.load_progress().await.unwrap().expect("snapshot");
    assert_eq!(&loaded, tracker.state());
    assert_eq!(
        loaded.history(Operation::Addition, Difficulty::Easy).len(),
        1
    );
    assert_eq!(loaded.badges().len(), tracker.state().badges().len());
}

#[tokio::test]
async fn sqlite_save_overwrites_and_clear_removes() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_overwrite?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let fresh = ProgressTracker::new(fixed_now());
    repo.save_progress(fresh.state(), fixed_now()).await.unwrap();

    let played = tracker_with_history();
    repo.save_progress(played.state(), fixed_now() + Duration::minutes(1))
        .await
        .unwrap();

    let loaded = repo.load_progress().await.unwrap().unwrap();
    assert_eq!(loaded.total_questions(), 10);

    repo.clear_progress().await.unwrap();
    assert!(repo.load_progress().await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_loads_legacy_payload() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_legacy?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let state = tracker_with_history().into_state();
    let legacy = serde_json::to_string(&state).unwrap();
    sqlx::query(
        "INSERT INTO progress_snapshots (id, version, payload, updated_at) VALUES (1, '0', ?1, ?2)",
    )
    .bind(legacy)
    .bind(fixed_now())
    .execute(repo.pool())
    .await
    .unwrap();

    let loaded = repo.load_progress().await.unwrap().unwrap();
    assert_eq!(loaded, state);
}

#[tokio::test]
async fn sqlite_settings_roundtrip() {
    let storage = Storage::sqlite("sqlite:file:memdb_settings?mode=memory&cache=shared")
        .await
        .expect("storage");

    assert!(storage.settings.get_settings().await.unwrap().is_none());

    let settings = PracticeSettings::new(15, true, 5, 3, 40).unwrap();
    storage.settings.save_settings(&settings).await.unwrap();
    storage.settings.save_settings(&settings).await.unwrap();

    assert_eq!(
        storage.settings.get_settings().await.unwrap(),
        Some(settings)
    );

    storage.settings.clear_settings().await.unwrap();
    assert!(storage.settings.get_settings().await.unwrap().is_none());
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(count, 2);
}

fn logged(minute: i64) -> SessionRecord {
    SessionRecord {
        recorded_at: fixed_now() + Duration::minutes(minute),
        operation: Operation::Multiplication,
        difficulty: Difficulty::Advanced,
        score: 8,
        total_questions: 10,
        accuracy: 80.0,
        time_spent_secs: 75,
    }
}

#[tokio::test]
async fn sqlite_session_log_is_capped_and_replaceable() {
    let storage = Storage::sqlite("sqlite:file:memdb_sessions?mode=memory&cache=shared")
        .await
        .expect("storage");

    for minute in 0..25 {
        storage.sessions.append_session(&logged(minute)).await.unwrap();
    }
    let sessions = storage.sessions.list_sessions().await.unwrap();
    assert_eq!(sessions.len(), SESSION_LOG_LIMIT);
    assert_eq!(sessions[0], logged(5));
    assert_eq!(sessions[SESSION_LOG_LIMIT - 1], logged(24));

    let backup = vec![logged(100), logged(101)];
    storage.sessions.replace_sessions(&backup).await.unwrap();
    assert_eq!(storage.sessions.list_sessions().await.unwrap(), backup);
}
