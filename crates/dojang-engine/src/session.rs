//! Study and test sessions.
//!
//! A session walks a fixed sequence of cards through
//! `NotStarted -> InProgress -> Completed`. Test sessions only move forward
//! and need an answer on every card before advancing; study sessions allow
//! skipping, flipping and stepping back.

use crate::error::{EngineError, EngineResult};
use crate::models::{Item, LearningMode, Question};
use crate::question::{normalize, OPTION_COUNT};
use crate::results::{Results, ResultsAggregator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// Unique session identifier.
pub type SessionId = Uuid;

/// What kind of session this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Flashcards; answers optional.
    #[default]
    Study,
    /// Graded; every card must be answered.
    Test,
}

impl SessionMode {
    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Study => "study",
            Self::Test => "test",
        }
    }
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Study or test.
    pub mode: SessionMode,
    /// Learning mode the cards were selected with.
    pub learning_mode: LearningMode,
    /// Learner's rank when the session was built.
    pub learner_rank: String,
    /// Optional category focus.
    #[serde(default)]
    pub category: Option<String>,
}

impl SessionConfig {
    /// Create a new session config.
    pub fn new(
        mode: SessionMode,
        learning_mode: LearningMode,
        learner_rank: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            learning_mode,
            learner_rank: learner_rank.into(),
            category: None,
        }
    }

    /// Set category focus.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// One card in a session: the source item and, for quizzes, its question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCard {
    pub item: Item,
    #[serde(default)]
    pub question: Option<Question>,
}

impl SessionCard {
    /// A plain flashcard.
    pub fn flashcard(item: Item) -> Self {
        Self { item, question: None }
    }

    /// A multiple-choice card.
    pub fn quiz(item: Item, question: Question) -> Self {
        Self {
            item,
            question: Some(question),
        }
    }
}

/// A recorded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Chosen option; `None` for self-graded flashcards.
    pub selected_index: Option<usize>,
    /// Whether the answer was right.
    pub is_correct: bool,
    /// Time taken in milliseconds.
    pub response_time_ms: u64,
}

/// Serializable session state for interruption and restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub config: SessionConfig,
    pub cards: Vec<SessionCard>,
    pub current_index: usize,
    pub answers: BTreeMap<usize, Answer>,
    pub state: SessionState,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub flipped: bool,
}

impl SessionSnapshot {
    /// Serialize to JSON.
    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON.
    pub fn from_json(s: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// A study or test session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: SessionId,
    config: SessionConfig,
    cards: Vec<SessionCard>,
    current_index: usize,
    answers: BTreeMap<usize, Answer>,
    state: SessionState,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    flipped: bool,
}

impl Session {
    /// Create a session that has not started yet.
    pub fn new(config: SessionConfig, cards: Vec<SessionCard>) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            cards,
            current_index: 0,
            answers: BTreeMap::new(),
            state: SessionState::NotStarted,
            started_at: None,
            completed_at: None,
            flipped: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn mode(&self) -> SessionMode {
        self.config.mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn cards(&self) -> &[SessionCard] {
        &self.cards
    }

    pub fn answers(&self) -> &BTreeMap<usize, Answer> {
        &self.answers
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Whether the current flashcard shows its back.
    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    /// Total cards in session.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the session has no cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// Whether every card has been passed.
    pub fn is_at_end(&self) -> bool {
        self.current_index >= self.cards.len()
    }

    /// Get current card.
    pub fn current_card(&self) -> Option<&SessionCard> {
        self.cards.get(self.current_index)
    }

    /// Answer recorded for the current card.
    pub fn current_answer(&self) -> Option<&Answer> {
        self.answers.get(&self.current_index)
    }

    /// Cards with an answer, in session order.
    pub fn answered_cards(&self) -> impl Iterator<Item = (&SessionCard, &Answer)> {
        self.answers
            .iter()
            .filter_map(|(idx, answer)| self.cards.get(*idx).map(|card| (card, answer)))
    }

    /// Percentage of cards passed; exactly 100 at the end.
    pub fn progress_percent(&self) -> f64 {
        if self.cards.is_empty() || self.is_at_end() {
            return 100.0;
        }
        self.current_index as f64 / self.cards.len() as f64 * 100.0
    }

    /// Number of correct answers so far.
    pub fn correct_count(&self) -> usize {
        self.answers.values().filter(|a| a.is_correct).count()
    }

    /// Mean response time over recorded answers.
    pub fn average_response_time_ms(&self) -> Option<f64> {
        if self.answers.is_empty() {
            return None;
        }
        let total: u64 = self.answers.values().map(|a| a.response_time_ms).sum();
        Some(total as f64 / self.answers.len() as f64)
    }

    /// Begin the session.
    pub fn start(&mut self, now: DateTime<Utc>) -> EngineResult<()> {
        match self.state {
            SessionState::NotStarted => {
                self.state = SessionState::InProgress;
                self.started_at = Some(now);
                tracing::debug!(
                    session = %self.id,
                    cards = self.cards.len(),
                    mode = self.mode().name(),
                    "session started"
                );
                Ok(())
            }
            SessionState::InProgress => Ok(()),
            SessionState::Completed => Err(EngineError::SessionCompleted),
        }
    }

    /// Record a multiple-choice answer for the current card.
    ///
    /// Calling again for the same card replaces the earlier answer.
    pub fn record_answer(
        &mut self,
        selected_index: usize,
        response_time_ms: u64,
    ) -> EngineResult<&Answer> {
        self.ensure_in_progress()?;
        let index = self.current_index;
        let card = self
            .cards
            .get(index)
            .ok_or(EngineError::NoCurrentCard { index })?;
        let question = card.question.as_ref().ok_or(EngineError::AnswerKindMismatch {
            index,
            reason: "card has no question; use record_recall",
        })?;
        if selected_index >= question.options.len() {
            return Err(EngineError::InvalidOption {
                selected: selected_index,
                options: question.options.len(),
            });
        }

        let answer = Answer {
            selected_index: Some(selected_index),
            is_correct: question.is_correct(selected_index),
            response_time_ms,
        };
        Ok(self.store_answer(index, answer))
    }

    /// Record a self-graded flashcard answer for the current card.
    pub fn record_recall(&mut self, correct: bool, response_time_ms: u64) -> EngineResult<&Answer> {
        self.ensure_in_progress()?;
        let index = self.current_index;
        let card = self
            .cards
            .get(index)
            .ok_or(EngineError::NoCurrentCard { index })?;
        if card.question.is_some() {
            return Err(EngineError::AnswerKindMismatch {
                index,
                reason: "card has a question; use record_answer",
            });
        }

        let answer = Answer {
            selected_index: None,
            is_correct: correct,
            response_time_ms,
        };
        Ok(self.store_answer(index, answer))
    }

    fn store_answer(&mut self, index: usize, answer: Answer) -> &Answer {
        tracing::debug!(session = %self.id, index, correct = answer.is_correct, "answer recorded");
        self.answers.insert(index, answer);
        &self.answers[&index]
    }

    /// Move to the next card.
    pub fn advance(&mut self) -> EngineResult<()> {
        self.ensure_in_progress()?;
        if self.is_at_end() {
            return Err(EngineError::AdvancePastEnd {
                index: self.current_index,
                len: self.cards.len(),
            });
        }
        if self.mode() == SessionMode::Test && !self.answers.contains_key(&self.current_index) {
            tracing::warn!(
                session = %self.id,
                index = self.current_index,
                "advance refused without answer"
            );
            return Err(EngineError::AnswerRequired {
                index: self.current_index,
            });
        }
        self.current_index += 1;
        self.flipped = false;
        Ok(())
    }

    /// Skip the current card without answering. Study sessions only.
    pub fn skip(&mut self) -> EngineResult<()> {
        self.ensure_in_progress()?;
        if self.mode() == SessionMode::Test {
            return Err(EngineError::NotPermitted {
                action: "Skipping",
                mode: self.mode().name(),
            });
        }
        self.advance()
    }

    /// Step back one card. Study sessions only.
    pub fn previous(&mut self) -> EngineResult<()> {
        self.ensure_in_progress()?;
        if self.mode() == SessionMode::Test {
            return Err(EngineError::RewindNotAllowed);
        }
        if self.current_index > 0 {
            self.current_index -= 1;
            self.flipped = false;
        }
        Ok(())
    }

    /// Turn the current flashcard over. Study sessions only.
    pub fn flip(&mut self) -> EngineResult<bool> {
        self.ensure_in_progress()?;
        if self.mode() == SessionMode::Test {
            return Err(EngineError::NotPermitted {
                action: "Flipping",
                mode: self.mode().name(),
            });
        }
        if self.is_at_end() {
            return Err(EngineError::NoCurrentCard {
                index: self.current_index,
            });
        }
        self.flipped = !self.flipped;
        Ok(self.flipped)
    }

    /// Finish the session and produce its results.
    ///
    /// Cards and answers are left as they were.
    pub fn complete(
        &mut self,
        aggregator: &ResultsAggregator,
        now: DateTime<Utc>,
    ) -> EngineResult<Results> {
        self.ensure_in_progress()?;
        self.state = SessionState::Completed;
        self.completed_at = Some(now);

        let results = aggregator.aggregate(self)?;
        tracing::info!(
            session = %self.id,
            answered = results.total_items,
            correct = results.correct_count,
            accuracy = results.accuracy,
            "session completed"
        );
        Ok(results)
    }

    /// Capture the session as plain data.
    pub fn save_state(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            config: self.config.clone(),
            cards: self.cards.clone(),
            current_index: self.current_index,
            answers: self.answers.clone(),
            state: self.state,
            started_at: self.started_at,
            completed_at: self.completed_at,
            flipped: self.flipped,
        }
    }

    /// Rebuild a session from a snapshot, checking it is consistent.
    pub fn restore(snapshot: SessionSnapshot) -> EngineResult<Self> {
        let len = snapshot.cards.len();
        if snapshot.current_index > len {
            return Err(EngineError::InvalidSnapshot(format!(
                "current index {} beyond {} cards",
                snapshot.current_index, len
            )));
        }
        for (idx, card) in snapshot.cards.iter().enumerate() {
            if let Some(question) = &card.question {
                check_question(card, question).map_err(|reason| {
                    EngineError::InvalidSnapshot(format!("question for card {}: {}", idx, reason))
                })?;
            }
        }
        for (idx, answer) in &snapshot.answers {
            let card = snapshot.cards.get(*idx).ok_or_else(|| {
                EngineError::InvalidSnapshot(format!("answer for card {} of {}", idx, len))
            })?;
            match (&card.question, answer.selected_index) {
                (Some(q), Some(sel)) if sel < q.options.len() => {
                    if q.is_correct(sel) != answer.is_correct {
                        return Err(EngineError::InvalidSnapshot(format!(
                            "answer for card {} disagrees with its question",
                            idx
                        )));
                    }
                }
                (None, None) => {}
                _ => {
                    return Err(EngineError::InvalidSnapshot(format!(
                        "answer for card {} does not fit the card",
                        idx
                    )))
                }
            }
        }
        match snapshot.state {
            SessionState::NotStarted
                if snapshot.current_index > 0 || !snapshot.answers.is_empty() =>
            {
                return Err(EngineError::InvalidSnapshot("unstarted session has progress".into()));
            }
            SessionState::Completed if snapshot.completed_at.is_none() => {
                return Err(EngineError::InvalidSnapshot(
                    "completed session has no completion time".into(),
                ));
            }
            _ => {}
        }

        Ok(Self {
            id: snapshot.id,
            config: snapshot.config,
            cards: snapshot.cards,
            current_index: snapshot.current_index,
            answers: snapshot.answers,
            state: snapshot.state,
            started_at: snapshot.started_at,
            completed_at: snapshot.completed_at,
            flipped: snapshot.flipped,
        })
    }

    fn ensure_in_progress(&self) -> EngineResult<()> {
        match self.state {
            SessionState::InProgress => Ok(()),
            SessionState::NotStarted => Err(EngineError::SessionNotStarted),
            SessionState::Completed => Err(EngineError::SessionCompleted),
        }
    }
}

/// A stored question must look like one the generator builds.
fn check_question(card: &SessionCard, question: &Question) -> Result<(), &'static str> {
    if question.source_item_id != card.item.id {
        return Err("belongs to a different item");
    }
    if question.options.len() != OPTION_COUNT {
        return Err("wrong number of options");
    }
    let unique: HashSet<String> = question.options.iter().map(|o| normalize(o)).collect();
    if unique.len() != OPTION_COUNT {
        return Err("options are not unique");
    }
    if question.correct_answer_index >= question.options.len() {
        return Err("correct answer index out of range");
    }
    Ok(())
}
