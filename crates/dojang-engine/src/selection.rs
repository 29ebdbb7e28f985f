//! Item selection policy.

use crate::catalog::Catalog;
use crate::config::SelectionConfig;
use crate::leitner::{urgency_key, LeitnerScheduler, ProgressBook};
use crate::models::{Item, LearningMode, RankLevel};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

/// A selection request from the session layer.
#[derive(Debug, Clone, Copy)]
pub struct SelectionRequest<'a> {
    /// Learner's current rank.
    pub learner_rank: &'a RankLevel,
    /// Progression or mastery.
    pub mode: LearningMode,
    /// How many items the caller would like.
    pub requested_count: usize,
    /// Optional category filter.
    pub category: Option<&'a str>,
}

impl<'a> SelectionRequest<'a> {
    pub fn new(learner_rank: &'a RankLevel, mode: LearningMode, requested_count: usize) -> Self {
        Self {
            learner_rank,
            mode,
            requested_count,
            category: None,
        }
    }

    /// Restrict to a single category.
    pub fn in_category(mut self, category: &'a str) -> Self {
        self.category = Some(category);
        self
    }
}

/// Decides which items a learner sees.
#[derive(Debug, Clone, Default)]
pub struct SelectionPolicy {
    config: SelectionConfig,
}

impl SelectionPolicy {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    /// Items the request may draw from, in catalog order.
    pub fn eligible<'c>(
        &self,
        catalog: &'c Catalog,
        request: &SelectionRequest<'_>,
    ) -> Vec<&'c Item> {
        catalog
            .items()
            .iter()
            .filter(|item| {
                let Some(rank) = catalog.rank_of(item) else {
                    return false;
                };
                let rank_ok = match request.mode {
                    LearningMode::Progression => rank.sort_key == request.learner_rank.sort_key,
                    LearningMode::Mastery => rank.is_prior_or_equal(request.learner_rank),
                };
                rank_ok && request.category.map_or(true, |c| item.category == c)
            })
            .collect()
    }

    /// Upper bound on how many items a request can return.
    pub fn limit(&self, request: &SelectionRequest<'_>) -> usize {
        match request.mode {
            LearningMode::Progression => request.requested_count,
            LearningMode::Mastery => request.requested_count.min(self.config.mastery_cap),
        }
    }

    /// Select items in random order.
    ///
    /// Returns `min(limit, eligible)` items; asking for more than exists is
    /// not an error. In mastery mode the learner's current rank is always
    /// represented when it has any eligible items.
    pub fn select<'c, R: Rng + ?Sized>(
        &self,
        catalog: &'c Catalog,
        request: &SelectionRequest<'_>,
        rng: &mut R,
    ) -> Vec<&'c Item> {
        let mut pool = self.eligible(catalog, request);
        let take = self.limit(request).min(pool.len());
        if take == 0 {
            return Vec::new();
        }

        pool.shuffle(rng);
        if let Some(pos) = missing_current_rank(&pool, take, request) {
            let slot = rng.gen_range(0..take);
            pool.swap(slot, pos);
        }
        pool.truncate(take);

        tracing::debug!(
            mode = request.mode.name(),
            rank = %request.learner_rank.id,
            requested = request.requested_count,
            selected = pool.len(),
            "selected items"
        );
        pool
    }

    /// Select due items, most urgent first.
    ///
    /// Items of equal urgency come back in random order. In mastery mode
    /// the current rank is represented whenever it has due items, taking
    /// the least urgent slot if needed.
    pub fn select_due<'c, R: Rng + ?Sized>(
        &self,
        catalog: &'c Catalog,
        request: &SelectionRequest<'_>,
        progress: &ProgressBook,
        scheduler: &LeitnerScheduler,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<&'c Item> {
        let eligible: HashMap<&str, &'c Item> = self
            .eligible(catalog, request)
            .into_iter()
            .map(|item| (item.id.as_str(), item))
            .collect();

        let mut pool: Vec<&'c Item> = progress
            .due_items(scheduler, catalog, now)
            .iter()
            .filter_map(|id| eligible.get(id.as_str()).copied())
            .collect();
        pool.shuffle(rng);
        pool.sort_by_key(|item| urgency_key(progress.get(&item.id)));

        let take = self.limit(request).min(pool.len());
        if take == 0 {
            return Vec::new();
        }
        if let Some(pos) = missing_current_rank(&pool, take, request) {
            pool.swap(take - 1, pos);
        }
        pool.truncate(take);

        tracing::debug!(
            mode = request.mode.name(),
            rank = %request.learner_rank.id,
            due = eligible.len(),
            selected = pool.len(),
            "selected due items"
        );
        pool
    }
}

/// Position past `take` of a current-rank item, when mastery mode would
/// otherwise leave the current rank out of the first `take` items.
fn missing_current_rank(
    pool: &[&Item],
    take: usize,
    request: &SelectionRequest<'_>,
) -> Option<usize> {
    if request.mode != LearningMode::Mastery {
        return None;
    }
    let current = request.learner_rank.id.as_str();
    if pool[..take].iter().any(|i| i.rank == current) {
        return None;
    }
    pool[take..]
        .iter()
        .position(|i| i.rank == current)
        .map(|pos| take + pos)
}
