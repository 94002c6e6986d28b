use chrono::Duration;
use practice_core::model::{AchievementId, Difficulty, Operation, PracticeSettings};
use practice_core::sampler::RandomSampler;
use practice_core::time::fixed_clock;
use services::{PracticeEvent, PracticeLoopService, ProgressService};
use storage::repository::Storage;

async fn build_loop(storage: &Storage, seed: u64) -> PracticeLoopService {
    let progress = ProgressService::load(fixed_clock(), storage)
        .await
        .unwrap();
    PracticeLoopService::with_samplers(
        PracticeSettings::default(),
        progress,
        RandomSampler::seeded(seed),
        RandomSampler::seeded(seed + 1),
    )
    .with_multiple_choice(true)
}

async fn play_perfect_game(practice: &mut PracticeLoopService) -> Vec<PracticeEvent> {
    let mut events = Vec::new();
    practice.start(Operation::Addition, Difficulty::Easy).unwrap();
    while let Some(presented) = practice.next_question().unwrap() {
        practice.progress_mut().clock_mut().advance(Duration::seconds(4));
        let raw = presented.question.correct_answer().to_string();
        let outcome = practice.submit(presented.question.id(), &raw).unwrap();
        events.extend(outcome.events);
    }
    let outcome = practice.finish().await.unwrap();
    assert!(outcome.persisted);
    events.extend(outcome.events);
    events
}

#[tokio::test]
async fn perfect_game_persists_progress_and_badge() {
    let storage = Storage::in_memory();
    let mut practice = build_loop(&storage, 42).await;

    let events = play_perfect_game(&mut practice).await;

    let answered = events
        .iter()
        .filter(|e| matches!(e, PracticeEvent::QuestionAnswered { .. }))
        .count();
    assert_eq!(answered, 10);
    assert!(events.contains(&PracticeEvent::GameComplete {
        score: 10,
        total_questions: 10,
        accuracy: 100.0,
        time_spent_secs: 40,
    }));
    for achievement in [
        AchievementId::FirstCorrect,
        AchievementId::Streak5,
        AchievementId::Streak10,
        AchievementId::PerfectGame,
        AchievementId::Speedster,
    ] {
        assert!(
            events.contains(&PracticeEvent::AchievementUnlocked { achievement }),
            "missing {achievement}"
        );
    }

    let stored = storage.progress.load_progress().await.unwrap().unwrap();
    assert_eq!(stored.sessions_completed(), 1);
    assert_eq!(stored.longest_streak(), 10);
    assert_eq!(
        stored.history(Operation::Addition, Difficulty::Easy).len(),
        1
    );
}

#[tokio::test]
async fn repeated_perfect_games_keep_one_badge_and_ramp_mastery() {
    let storage = Storage::in_memory();
    let mut practice = build_loop(&storage, 7).await;

    for _ in 0..3 {
        play_perfect_game(&mut practice).await;
    }

    let state = practice.progress().state();
    let perfect = state
        .badges()
        .iter()
        .filter(|b| b.id == AchievementId::PerfectGame)
        .count();
    assert_eq!(perfect, 1);
    assert_eq!(
        practice
            .progress()
            .tracker()
            .mastery_level(Operation::Addition, Difficulty::Easy),
        30.0
    );

    let reloaded = build_loop(&storage, 99).await;
    assert_eq!(reloaded.progress().state(), state);
}
