//! Adaptive learning and assessment engine for Taekwondo study.
//!
//! This crate decides what a learner studies next and keeps score:
//!
//! - **Selection**: rank-aware item selection in progression or mastery mode
//! - **Scheduling**: Leitner boxes with per-box review intervals
//! - **Questions**: four-option multiple choice with category-aware distractors
//! - **Sessions**: study and test sessions with save/restore
//! - **Results**: per-category and per-rank breakdowns, weak areas, trends
//!
//! Content loading and persistence belong to the host application; the
//! engine works on an already-validated [`Catalog`] and a learner's
//! [`ProgressBook`], passed explicitly to every call.

pub mod catalog;
pub mod config;
pub mod error;
pub mod leitner;
pub mod models;
pub mod question;
pub mod rank;
pub mod results;
pub mod selection;
pub mod session;
pub mod shared;

// Re-exports
pub use catalog::Catalog;
pub use config::{EngineConfig, LeitnerConfig, QuestionConfig, ResultsConfig, SelectionConfig};
pub use error::{EngineError, EngineResult};
pub use leitner::{BoxDistribution, LeitnerScheduler, ProgressBook, ProgressSummary};
pub use models::{
    Direction, Item, ItemId, LearnerProgress, LearningMode, MasteryLevel, Question, RankId,
    RankLevel,
};
pub use question::{same_category_ratio, QuestionGenerator, TestKind, OPTION_COUNT};
pub use rank::RankLadder;
pub use results::{Breakdown, Results, ResultsAggregator, Trend};
pub use selection::{SelectionPolicy, SelectionRequest};
pub use session::{
    Answer, Session, SessionCard, SessionConfig, SessionId, SessionMode, SessionSnapshot,
    SessionState,
};
pub use shared::{SharedProgress, SharedSession};

use chrono::{DateTime, Utc};
use rand::Rng;

/// Learner context supplied by the profile store for each call.
#[derive(Debug, Clone, Copy)]
pub struct Learner<'a> {
    /// Current rank id.
    pub rank: &'a str,
    /// Learning mode.
    pub mode: LearningMode,
    /// Spaced-repetition state.
    pub progress: &'a ProgressBook,
}

/// Everything a session needs, built once from an [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    scheduler: LeitnerScheduler,
    policy: SelectionPolicy,
    generator: QuestionGenerator,
    aggregator: ResultsAggregator,
}

impl Engine {
    /// Create an engine, validating the configuration.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            scheduler: LeitnerScheduler::new(config.leitner.clone())?,
            policy: SelectionPolicy::new(config.selection.clone()),
            generator: QuestionGenerator::new(config.questions.clone()),
            aggregator: ResultsAggregator::new(config.results.clone()),
            config,
        })
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: EngineConfig::default(),
            scheduler: LeitnerScheduler::default(),
            policy: SelectionPolicy::default(),
            generator: QuestionGenerator::default(),
            aggregator: ResultsAggregator::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &LeitnerScheduler {
        &self.scheduler
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    pub fn generator(&self) -> &QuestionGenerator {
        &self.generator
    }

    pub fn aggregator(&self) -> &ResultsAggregator {
        &self.aggregator
    }

    /// Select items for a learner.
    pub fn select_items<'c, R: Rng + ?Sized>(
        &self,
        catalog: &'c Catalog,
        learner: &Learner<'_>,
        requested_count: usize,
        category: Option<&str>,
        rng: &mut R,
    ) -> EngineResult<Vec<&'c Item>> {
        let rank = catalog.ladder().require(learner.rank)?;
        let mut request = SelectionRequest::new(rank, learner.mode, requested_count);
        request.category = category;
        Ok(self.policy.select(catalog, &request, rng))
    }

    /// Select only items that are due for review, most urgent first.
    pub fn select_due_items<'c, R: Rng + ?Sized>(
        &self,
        catalog: &'c Catalog,
        learner: &Learner<'_>,
        requested_count: usize,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> EngineResult<Vec<&'c Item>> {
        let rank = catalog.ladder().require(learner.rank)?;
        let request = SelectionRequest::new(rank, learner.mode, requested_count);
        Ok(self
            .policy
            .select_due(catalog, &request, learner.progress, &self.scheduler, now, rng))
    }

    /// Build one question for an item.
    pub fn generate_question<R: Rng + ?Sized>(
        &self,
        catalog: &Catalog,
        item: &Item,
        direction: Direction,
        rng: &mut R,
    ) -> EngineResult<Question> {
        self.generator.generate_question(item, catalog.items(), direction, rng)
    }

    /// Build an unstarted test session over the learner's eligible items.
    pub fn build_test<R: Rng + ?Sized>(
        &self,
        catalog: &Catalog,
        learner: &Learner<'_>,
        kind: TestKind,
        requested_count: usize,
        rng: &mut R,
    ) -> EngineResult<Session> {
        let items = self.select_items(catalog, learner, requested_count, None, rng)?;
        let questions = self.generator.generate_test(kind, &items, catalog.items(), rng)?;
        let cards = questions
            .into_iter()
            .map(|q| {
                catalog
                    .require(&q.source_item_id)
                    .map(|item| SessionCard::quiz(item.clone(), q))
            })
            .collect::<EngineResult<Vec<_>>>()?;
        let config = SessionConfig::new(SessionMode::Test, learner.mode, learner.rank);
        Ok(Session::new(config, cards))
    }

    /// Build an unstarted flashcard session, due items first.
    pub fn build_study<R: Rng + ?Sized>(
        &self,
        catalog: &Catalog,
        learner: &Learner<'_>,
        requested_count: usize,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> EngineResult<Session> {
        let mut items = self.select_due_items(catalog, learner, requested_count, now, rng)?;
        if items.is_empty() {
            items = self.select_items(catalog, learner, requested_count, None, rng)?;
        }
        let cards = items.into_iter().cloned().map(SessionCard::flashcard).collect();
        let config = SessionConfig::new(SessionMode::Study, learner.mode, learner.rank);
        Ok(Session::new(config, cards))
    }

    /// Complete a session and fold its answers into the learner's progress.
    pub fn finish_session(
        &self,
        session: &mut Session,
        progress: &mut ProgressBook,
        now: DateTime<Utc>,
    ) -> EngineResult<Results> {
        let results = session.complete(&self.aggregator, now)?;
        progress.apply_session(&self.scheduler, session, now)?;
        Ok(results)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn catalog() -> Catalog {
        let items = (0..12)
            .map(|i| {
                let category = if i % 3 == 0 { "blocks" } else { "kicks" };
                Item::new(
                    format!("i{}", i),
                    format!("term {}", i),
                    format!("meaning {}", i),
                    "9th_keup",
                    category,
                )
            })
            .collect();
        Catalog::new(items, RankLadder::standard()).unwrap()
    }

    #[test]
    fn test_engine_creation() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        assert_eq!(engine.scheduler().box_count(), 5);
    }

    #[test]
    fn test_unknown_rank_is_reported() {
        let engine = Engine::with_defaults();
        let catalog = catalog();
        let book = ProgressBook::new();
        let learner = Learner { rank: "purple", mode: LearningMode::Progression, progress: &book };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(
            engine.select_items(&catalog, &learner, 5, None, &mut rng),
            Err(EngineError::UnknownRank(_))
        ));
    }

    #[test]
    fn test_test_session_end_to_end() {
        let engine = Engine::with_defaults();
        let catalog = catalog();
        let mut book = ProgressBook::new();
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let learner = Learner {
            rank: "9th_keup",
            mode: LearningMode::Progression,
            progress: &book,
        };
        let mut session = engine
            .build_test(&catalog, &learner, TestKind::Comprehensive, 3, &mut rng)
            .unwrap();
        assert_eq!(session.len(), 6);

        let now = Utc::now();
        session.start(now).unwrap();
        while !session.is_at_end() {
            let correct = session
                .current_card()
                .unwrap()
                .question
                .as_ref()
                .unwrap()
                .correct_answer_index;
            session.record_answer(correct, 900).unwrap();
            session.advance().unwrap();
        }
        let results = engine.finish_session(&mut session, &mut book, now).unwrap();
        assert_eq!(results.accuracy, 1.0);
        assert_eq!(book.len(), 3);
        assert!(book.iter().all(|p| p.box_number == 3));
    }

    #[test]
    fn test_study_prefers_due_items() {
        let engine = Engine::with_defaults();
        let catalog = catalog();
        let mut book = ProgressBook::new();
        let now = Utc::now();
        for i in 0..10 {
            book.record(engine.scheduler(), &format!("i{}", i), true, now);
        }

        let learner = Learner {
            rank: "9th_keup",
            mode: LearningMode::Progression,
            progress: &book,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let session = engine.build_study(&catalog, &learner, 20, now, &mut rng).unwrap();
        let mut ids: Vec<_> = session.cards().iter().map(|c| c.item.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["i10", "i11"]);
    }

    #[test]
    fn test_mastery_study_keeps_current_rank() {
        let engine = Engine::with_defaults();
        let mut items = Vec::new();
        for (rank, count) in [("10th_keup", 30), ("9th_keup", 30), ("7th_keup", 10)] {
            for i in 0..count {
                items.push(Item::new(
                    format!("{}-{}", rank, i),
                    format!("{} term {}", rank, i),
                    format!("{} meaning {}", rank, i),
                    rank,
                    "basics",
                ));
            }
        }
        let catalog = Catalog::new(items, RankLadder::standard()).unwrap();
        let mut book = ProgressBook::new();
        book.migrate(&catalog);

        let learner = Learner { rank: "7th_keup", mode: LearningMode::Mastery, progress: &book };
        let now = Utc::now();
        let mut first_ids = Vec::new();
        for seed in 0..5 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let session = engine.build_study(&catalog, &learner, 50, now, &mut rng).unwrap();
            assert_eq!(session.len(), 50);
            assert!(session.cards().iter().any(|c| c.item.rank == "7th_keup"));
            first_ids.push(session.cards()[0].item.id.clone());
        }
        first_ids.sort();
        first_ids.dedup();
        assert!(first_ids.len() > 1);
    }
}
