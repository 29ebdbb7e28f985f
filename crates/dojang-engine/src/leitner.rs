//! Leitner box scheduling.
//!
//! Each learner/item pair sits in one of N boxes. A correct answer moves the
//! item up one box (capped at N); an incorrect answer sends it straight back
//! to box 1. Higher boxes wait longer before the item is due again.

use crate::catalog::Catalog;
use crate::config::{LeitnerConfig, MAX_INTERVAL_DAYS};
use crate::error::{EngineError, EngineResult};
use crate::models::{ItemId, LearnerProgress, MasteryLevel};
use crate::session::Session;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Applies box transitions and answers due-ness queries.
#[derive(Debug, Clone)]
pub struct LeitnerScheduler {
    config: LeitnerConfig,
}

impl Default for LeitnerScheduler {
    fn default() -> Self {
        Self {
            config: LeitnerConfig::default(),
        }
    }
}

impl LeitnerScheduler {
    /// Create a scheduler from a validated config.
    pub fn new(config: LeitnerConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Number of boxes (N).
    pub fn box_count(&self) -> u8 {
        self.config.box_count()
    }

    /// Review interval for a box. Out-of-range boxes clamp to the nearest end.
    pub fn interval_for(&self, box_number: u8) -> Duration {
        let idx = (box_number.max(1) as usize - 1).min(self.config.box_intervals_days.len() - 1);
        Duration::days(self.config.box_intervals_days[idx].clamp(0, MAX_INTERVAL_DAYS))
    }

    /// Apply one answer to a record.
    ///
    /// The new state is computed in full before being written back, so the
    /// record is never left half-updated.
    pub fn record_answer(&self, progress: &mut LearnerProgress, correct: bool, now: DateTime<Utc>) {
        let mut next = progress.clone();
        let before = progress.box_number;

        if correct {
            next.box_number = before.saturating_add(1).clamp(1, self.box_count());
            next.correct_streak += 1;
            next.incorrect_streak = 0;
        } else {
            next.box_number = 1;
            next.incorrect_streak += 1;
            next.correct_streak = 0;
        }
        next.total_reviews += 1;
        next.last_reviewed_at = Some(now);
        next.mastery_level = self.mastery_level(&next);

        tracing::debug!(
            item = %next.item_id,
            correct,
            from_box = before,
            to_box = next.box_number,
            "leitner transition"
        );
        *progress = next;
    }

    /// Derive the mastery level from box and streak.
    pub fn mastery_level(&self, progress: &LearnerProgress) -> MasteryLevel {
        if progress.box_number >= self.config.mastered_box
            && progress.correct_streak >= self.config.mastered_streak
        {
            MasteryLevel::Mastered
        } else if progress.box_number >= self.config.familiar_box {
            MasteryLevel::Familiar
        } else {
            MasteryLevel::Learning
        }
    }

    /// When a record next becomes due. `None` means due now.
    pub fn next_review_at(&self, progress: &LearnerProgress) -> Option<DateTime<Utc>> {
        progress
            .last_reviewed_at
            .map(|last| {
                last.checked_add_signed(self.interval_for(progress.box_number))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC)
            })
    }

    /// Check if an item is due. Items with no record are always due.
    pub fn is_due(&self, progress: Option<&LearnerProgress>, now: DateTime<Utc>) -> bool {
        match progress {
            None => true,
            Some(p) if p.box_number <= 1 => true,
            Some(p) => match self.next_review_at(p) {
                None => true,
                Some(due) => due <= now,
            },
        }
    }
}

/// Count of items per box for one learner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxDistribution {
    /// Box number to tracked item count; every box 1..=N is present.
    pub boxes: BTreeMap<u8, usize>,
    /// Catalog items without a progress record.
    pub untracked: usize,
}

impl BoxDistribution {
    /// Items with a progress record.
    pub fn tracked(&self) -> usize {
        self.boxes.values().sum()
    }

    /// Tracked plus untracked.
    pub fn total(&self) -> usize {
        self.tracked() + self.untracked
    }
}

/// Items per mastery level for one learner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub learning: usize,
    pub familiar: usize,
    pub mastered: usize,
    pub never_seen: usize,
}

/// All progress records of a single learner, keyed by item id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressBook {
    records: HashMap<ItemId, LearnerProgress>,
}

impl ProgressBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from existing records.
    pub fn from_records(records: impl IntoIterator<Item = LearnerProgress>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.item_id.clone(), r)).collect(),
        }
    }

    /// Look up a record.
    pub fn get(&self, item_id: &str) -> Option<&LearnerProgress> {
        self.records.get(item_id)
    }

    /// Number of tracked items.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over records.
    pub fn iter(&self) -> impl Iterator<Item = &LearnerProgress> {
        self.records.values()
    }

    /// Record an answer, creating the record on first exposure.
    pub fn record(
        &mut self,
        scheduler: &LeitnerScheduler,
        item_id: &str,
        correct: bool,
        now: DateTime<Utc>,
    ) -> &LearnerProgress {
        let progress = self
            .records
            .entry(item_id.to_string())
            .or_insert_with(|| LearnerProgress::new(item_id));
        scheduler.record_answer(progress, correct, now);
        progress
    }

    /// Create a box-1 record for every catalog item not yet tracked.
    ///
    /// Existing records are left untouched. Returns the number created.
    pub fn migrate(&mut self, catalog: &Catalog) -> usize {
        let mut created = 0;
        for item in catalog.items() {
            if !self.records.contains_key(&item.id) {
                self.records.insert(item.id.clone(), LearnerProgress::new(item.id.clone()));
                created += 1;
            }
        }
        tracing::info!(
            created,
            tracked = self.records.len(),
            "migrated learner into spaced repetition"
        );
        created
    }

    /// Count progress records per box.
    ///
    /// Every record is counted, including records for items no longer in
    /// the catalog, so `tracked()` equals `len()`. Catalog items without a
    /// record are counted as untracked.
    pub fn box_distribution(
        &self,
        scheduler: &LeitnerScheduler,
        catalog: &Catalog,
    ) -> BoxDistribution {
        let mut boxes: BTreeMap<u8, usize> = (1..=scheduler.box_count()).map(|b| (b, 0)).collect();
        for p in self.records.values() {
            let b = p.box_number.clamp(1, scheduler.box_count());
            *boxes.entry(b).or_insert(0) += 1;
        }
        let untracked = catalog
            .items()
            .iter()
            .filter(|item| !self.records.contains_key(&item.id))
            .count();
        BoxDistribution { boxes, untracked }
    }

    /// Due catalog items: never-seen first, then lower boxes, then oldest review.
    pub fn due_items(
        &self,
        scheduler: &LeitnerScheduler,
        catalog: &Catalog,
        now: DateTime<Utc>,
    ) -> Vec<ItemId> {
        let mut due: Vec<(Option<&LearnerProgress>, &str)> = catalog
            .items()
            .iter()
            .map(|item| (self.records.get(&item.id), item.id.as_str()))
            .filter(|(p, _)| scheduler.is_due(*p, now))
            .collect();

        due.sort_by(|(a, _), (b, _)| urgency_key(*a).cmp(&urgency_key(*b)));
        due.into_iter().map(|(_, id)| id.to_string()).collect()
    }

    /// Items per mastery level across the catalog.
    pub fn summary(&self, catalog: &Catalog) -> ProgressSummary {
        let mut summary = ProgressSummary::default();
        for item in catalog.items() {
            match self.records.get(&item.id) {
                None => summary.never_seen += 1,
                Some(p) if p.total_reviews == 0 => summary.never_seen += 1,
                Some(p) => match p.mastery_level {
                    MasteryLevel::Learning => summary.learning += 1,
                    MasteryLevel::Familiar => summary.familiar += 1,
                    MasteryLevel::Mastered => summary.mastered += 1,
                },
            }
        }
        summary
    }

    /// Feed every answer of a completed session into the book, in order.
    pub fn apply_session(
        &mut self,
        scheduler: &LeitnerScheduler,
        session: &Session,
        now: DateTime<Utc>,
    ) -> EngineResult<usize> {
        if !session.is_completed() {
            return Err(EngineError::SessionNotCompleted);
        }
        let mut applied = 0;
        for (card, answer) in session.answered_cards() {
            self.record(scheduler, &card.item.id, answer.is_correct, now);
            applied += 1;
        }
        tracing::info!(applied, session = %session.id(), "applied session answers to progress");
        Ok(applied)
    }
}

/// Sort key for review urgency; smaller is more urgent.
pub(crate) fn urgency_key(progress: Option<&LearnerProgress>) -> (u8, u8, Option<DateTime<Utc>>) {
    match progress {
        None => (0, 0, None),
        Some(p) if p.total_reviews == 0 => (0, 0, None),
        Some(p) => (1, p.box_number, p.last_reviewed_at),
    }
}
