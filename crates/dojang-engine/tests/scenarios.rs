//! End-to-end learner scenarios.

use chrono::{Duration, Utc};
use dojang_engine::{
    same_category_ratio, Catalog, Direction, Engine, Item, Learner, LearnerProgress, LearningMode,
    ProgressBook, RankLadder, Session, SessionMode, SessionSnapshot, SessionState, TestKind,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn seventh_keup_catalog() -> Catalog {
    let mut items = Vec::new();
    for i in 0..10 {
        items.push(Item::new(
            format!("7k-{}", i),
            format!("Seventh term {}", i),
            format!("Seventh meaning {}", i),
            "7th_keup",
            "techniques",
        ));
    }
    for i in 0..40 {
        let category = ["stances", "blocks", "kicks", "strikes"][i % 4];
        let rank = ["10th_keup", "9th_keup", "8th_keup"][i % 3];
        items.push(Item::new(
            format!("early-{}", i),
            format!("Early term {}", i),
            format!("Early meaning {}", i),
            rank,
            category,
        ));
    }
    for i in 0..8 {
        items.push(Item::new(
            format!("6k-{}", i),
            format!("Sixth term {}", i),
            format!("Sixth meaning {}", i),
            "6th_keup",
            "patterns",
        ));
    }
    Catalog::new(items, RankLadder::standard()).unwrap()
}

/// Run a test session answering the first `correct` cards right and the rest wrong.
fn run_test(
    engine: &Engine,
    catalog: &Catalog,
    learner: &Learner<'_>,
    correct: usize,
) -> dojang_engine::Results {
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let items = engine.select_items(catalog, learner, 10, None, &mut rng).unwrap();
    let cards = items
        .iter()
        .map(|item| {
            let q = engine
                .generate_question(catalog, item, Direction::FrontToBack, &mut rng)
                .unwrap();
            dojang_engine::SessionCard::quiz((*item).clone(), q)
        })
        .collect();
    let config = dojang_engine::SessionConfig::new(SessionMode::Test, learner.mode, learner.rank);
    let mut session = Session::new(config, cards);
    session.start(Utc::now()).unwrap();

    let mut answered = 0;
    while !session.is_at_end() {
        let q = session.current_card().unwrap().question.clone().unwrap();
        let choice = if answered < correct {
            q.correct_answer_index
        } else {
            (q.correct_answer_index + 1) % 4
        };
        session.record_answer(choice, 1500).unwrap();
        session.advance().unwrap();
        answered += 1;
    }
    session.complete(engine.aggregator(), Utc::now()).unwrap()
}

#[test]
fn progression_returns_all_current_rank_items() {
    let engine = Engine::with_defaults();
    let catalog = seventh_keup_catalog();
    let book = ProgressBook::new();
    let learner = Learner { rank: "7th_keup", mode: LearningMode::Progression, progress: &book };
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let items = engine.select_items(&catalog, &learner, 20, None, &mut rng).unwrap();
    assert_eq!(items.len(), 10);
    assert!(items.iter().all(|i| i.rank == "7th_keup"));
}

#[test]
fn mastery_reviews_prior_ranks() {
    let engine = Engine::with_defaults();
    let catalog = seventh_keup_catalog();
    let book = ProgressBook::new();
    let learner = Learner { rank: "7th_keup", mode: LearningMode::Mastery, progress: &book };
    let mut rng = ChaCha8Rng::seed_from_u64(2);

    let items = engine.select_items(&catalog, &learner, 100, None, &mut rng).unwrap();
    assert_eq!(items.len(), 50);
    assert!(items.iter().all(|i| i.rank != "6th_keup"));
    assert!(items.iter().any(|i| i.rank == "7th_keup"));
}

#[test]
fn seventy_percent_is_not_weak() {
    let engine = Engine::with_defaults();
    let catalog = seventh_keup_catalog();
    let book = ProgressBook::new();
    let learner = Learner { rank: "7th_keup", mode: LearningMode::Progression, progress: &book };

    let results = run_test(&engine, &catalog, &learner, 7);
    assert_eq!(results.total_items, 10);
    assert!((results.accuracy - 0.70).abs() < 1e-12);
    assert_eq!(results.category_breakdown.len(), 1);
    assert!(results.weak_areas.is_empty());
}

#[test]
fn twenty_percent_flags_category() {
    let engine = Engine::with_defaults();
    let catalog = seventh_keup_catalog();
    let book = ProgressBook::new();
    let learner = Learner { rank: "7th_keup", mode: LearningMode::Progression, progress: &book };

    let results = run_test(&engine, &catalog, &learner, 2);
    assert!((results.accuracy - 0.20).abs() < 1e-12);
    assert_eq!(results.weak_areas.len(), 1);
    assert!(results.weak_areas[0].contains("techniques"));
    assert!(!results.recommendations.is_empty());
}

#[test]
fn box_four_miss_returns_to_box_one() {
    let engine = Engine::with_defaults();
    let scheduler = engine.scheduler();
    let mut progress = LearnerProgress::new("7k-0");
    let now = Utc::now();
    for _ in 0..3 {
        scheduler.record_answer(&mut progress, true, now);
    }
    assert_eq!(progress.box_number, 4);

    scheduler.record_answer(&mut progress, false, now + Duration::days(7));
    assert_eq!(progress.box_number, 1);
    scheduler.record_answer(&mut progress, false, now + Duration::days(8));
    assert_eq!(progress.box_number, 1);
    assert_eq!(progress.incorrect_streak, 2);
}

#[test]
fn interrupted_test_resumes_where_it_stopped() {
    let engine = Engine::with_defaults();
    let catalog = seventh_keup_catalog();
    let book = ProgressBook::new();
    let learner = Learner { rank: "7th_keup", mode: LearningMode::Progression, progress: &book };
    let mut rng = ChaCha8Rng::seed_from_u64(8);

    let mut session = engine
        .build_test(&catalog, &learner, TestKind::Quick, 10, &mut rng)
        .unwrap();
    assert!((5..=10).contains(&session.len()));
    session.start(Utc::now()).unwrap();
    for _ in 0..3 {
        let correct = session
            .current_card()
            .unwrap()
            .question
            .as_ref()
            .unwrap()
            .correct_answer_index;
        session.record_answer(correct, 700).unwrap();
        session.advance().unwrap();
    }

    let saved = session.save_state().to_json().unwrap();
    let mut resumed = Session::restore(SessionSnapshot::from_json(&saved).unwrap()).unwrap();
    assert_eq!(resumed.state(), SessionState::InProgress);
    assert_eq!(resumed.current_index(), 3);
    assert_eq!(resumed.answers(), session.answers());

    while !resumed.is_at_end() {
        resumed.record_answer(0, 700).unwrap();
        resumed.advance().unwrap();
    }
    let results = resumed.complete(engine.aggregator(), Utc::now()).unwrap();
    assert_eq!(results.total_items, resumed.len());
    assert!(results.correct_count >= 3);
}

#[test]
fn spaced_repetition_round_trip() {
    let engine = Engine::with_defaults();
    let catalog = seventh_keup_catalog();
    let mut book = ProgressBook::new();
    assert_eq!(book.migrate(&catalog), catalog.len());

    let dist = book.box_distribution(engine.scheduler(), &catalog);
    assert_eq!(dist.boxes[&1], catalog.len());
    assert_eq!(dist.untracked, 0);

    let now = Utc::now();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut session = {
        let learner = Learner {
            rank: "7th_keup",
            mode: LearningMode::Progression,
            progress: &book,
        };
        engine.build_study(&catalog, &learner, 10, now, &mut rng).unwrap()
    };
    session.start(now).unwrap();
    while !session.is_at_end() {
        session.flip().unwrap();
        session.record_recall(true, 2000).unwrap();
        session.advance().unwrap();
    }
    engine.finish_session(&mut session, &mut book, now).unwrap();

    let learner = Learner { rank: "7th_keup", mode: LearningMode::Progression, progress: &book };
    let due = engine.select_due_items(&catalog, &learner, 10, now, &mut rng).unwrap();
    assert!(due.is_empty());
    let later = engine
        .select_due_items(&catalog, &learner, 10, now + Duration::days(2), &mut rng)
        .unwrap();
    assert_eq!(later.len(), 10);
}

#[test]
fn batch_distractors_mostly_share_category() {
    let engine = Engine::with_defaults();
    let catalog = seventh_keup_catalog();
    let book = ProgressBook::new();
    let learner = Learner { rank: "7th_keup", mode: LearningMode::Mastery, progress: &book };
    let mut rng = ChaCha8Rng::seed_from_u64(21);

    let items = engine.select_items(&catalog, &learner, 50, None, &mut rng).unwrap();
    let questions = engine
        .generator()
        .generate_test(TestKind::Comprehensive, &items, catalog.items(), &mut rng)
        .unwrap();
    assert_eq!(questions.len(), items.len() * 2);
    assert!(same_category_ratio(&questions) > 0.5);
}
