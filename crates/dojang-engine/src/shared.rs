//! Thread-shareable handles.
//!
//! The engine itself is synchronous. These wrappers let a host application
//! touch progress and sessions from several threads (for example a
//! background persistence flush) while keeping each update whole.

use crate::error::EngineResult;
use crate::leitner::{LeitnerScheduler, ProgressBook};
use crate::models::LearnerProgress;
use crate::results::{Results, ResultsAggregator};
use crate::session::{Session, SessionSnapshot};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// A learner's progress book behind a lock.
#[derive(Debug, Clone, Default)]
pub struct SharedProgress {
    inner: Arc<Mutex<ProgressBook>>,
}

impl SharedProgress {
    pub fn new(book: ProgressBook) -> Self {
        Self {
            inner: Arc::new(Mutex::new(book)),
        }
    }

    /// Apply one answer as a single read-modify-write.
    pub fn record(
        &self,
        scheduler: &LeitnerScheduler,
        item_id: &str,
        correct: bool,
        now: DateTime<Utc>,
    ) -> LearnerProgress {
        self.inner.lock().record(scheduler, item_id, correct, now).clone()
    }

    /// Copy of a single record.
    pub fn get(&self, item_id: &str) -> Option<LearnerProgress> {
        self.inner.lock().get(item_id).cloned()
    }

    /// Copy of the whole book, e.g. for persisting.
    pub fn snapshot(&self) -> ProgressBook {
        self.inner.lock().clone()
    }

    /// Run a closure with exclusive access.
    pub fn with<T>(&self, f: impl FnOnce(&mut ProgressBook) -> T) -> T {
        f(&mut *self.inner.lock())
    }
}

/// A session behind a lock, so it is never advanced from two threads at once.
#[derive(Debug, Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Record an answer and advance in one step.
    pub fn answer_and_advance(
        &self,
        selected_index: usize,
        response_time_ms: u64,
    ) -> EngineResult<bool> {
        let mut session = self.inner.lock();
        let correct = session.record_answer(selected_index, response_time_ms)?.is_correct;
        session.advance()?;
        Ok(correct)
    }

    pub fn complete(
        &self,
        aggregator: &ResultsAggregator,
        now: DateTime<Utc>,
    ) -> EngineResult<Results> {
        self.inner.lock().complete(aggregator, now)
    }

    pub fn save_state(&self) -> SessionSnapshot {
        self.inner.lock().save_state()
    }

    /// Run a closure with exclusive access.
    pub fn with<T>(&self, f: impl FnOnce(&mut Session) -> T) -> T {
        f(&mut *self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::models::{Direction, Item, LearningMode, Question};
    use crate::session::{SessionCard, SessionConfig, SessionMode, SessionState};
    use std::thread;

    fn test_session(n: usize) -> Session {
        let cards = (0..n)
            .map(|i| {
                let item = Item::new(
                    format!("i{}", i),
                    format!("term {}", i),
                    format!("meaning {}", i),
                    "9th_keup",
                    "basics",
                );
                let question = Question {
                    source_item_id: item.id.clone(),
                    prompt: item.front_text.clone(),
                    options: vec![item.back_text.clone(), "a".into(), "b".into(), "c".into()],
                    correct_answer_index: 0,
                    direction: Direction::FrontToBack,
                    same_category_distractors: 3,
                };
                SessionCard::quiz(item, question)
            })
            .collect();
        let config = SessionConfig::new(SessionMode::Test, LearningMode::Progression, "9th_keup");
        let mut session = Session::new(config, cards);
        session.start(Utc::now()).unwrap();
        session
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let scheduler = LeitnerScheduler::default();
        let shared = SharedProgress::default();
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                let scheduler = scheduler.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        shared.record(&scheduler, "item", true, now);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let progress = shared.get("item").unwrap();
        assert_eq!(progress.total_reviews, 200);
        assert_eq!(progress.correct_streak, 200);
        assert_eq!(progress.box_number, scheduler.box_count());
    }

    #[test]
    fn test_concurrent_answers_cover_every_card_once() {
        let shared = SharedSession::new(test_session(120));

        let handles: Vec<_> = (0..6)
            .map(|t| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let mut landed = 0;
                    loop {
                        match shared.answer_and_advance(t % 4, 10) {
                            Ok(_) => landed += 1,
                            Err(EngineError::NoCurrentCard { .. }) => break,
                            Err(e) => panic!("unexpected error: {}", e),
                        }
                    }
                    landed
                })
            })
            .collect();
        let landed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(landed, 120);
        shared.with(|session| {
            assert!(session.is_at_end());
            assert_eq!(session.current_index(), 120);
            assert!(session.answers().keys().copied().eq(0..120));
        });
        let snapshot = shared.save_state();
        assert_eq!(snapshot.answers.len(), 120);

        let results = shared.complete(&ResultsAggregator::default(), Utc::now()).unwrap();
        assert_eq!(results.total_items, 120);
        assert_eq!(shared.with(|session| session.state()), SessionState::Completed);
    }
}
