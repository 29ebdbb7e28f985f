//! Session results and analytics.

use crate::config::ResultsConfig;
use crate::error::{EngineError, EngineResult};
use crate::session::{Session, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Totals for one category or rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    /// Category name or rank id.
    pub name: String,
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
}

impl Breakdown {
    fn new(name: String, total: usize, correct: usize) -> Self {
        Self {
            name,
            total,
            correct,
            accuracy: ratio(correct, total),
        }
    }
}

/// Immutable summary of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Results {
    pub session_id: SessionId,
    /// Answered cards.
    pub total_items: usize,
    pub correct_count: usize,
    pub incorrect_count: usize,
    /// `correct_count / total_items`, or 0 for an empty session.
    pub accuracy: f64,
    pub category_breakdown: Vec<Breakdown>,
    pub rank_breakdown: Vec<Breakdown>,
    /// One entry per weak category; each contains the category name.
    pub weak_areas: Vec<String>,
    pub recommendations: Vec<String>,
    pub average_response_time_ms: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Results {
    /// Accuracy as a whole percentage.
    pub fn accuracy_percent(&self) -> f64 {
        self.accuracy * 100.0
    }
}

/// Direction of accuracy over several sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

impl Trend {
    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Improving => "Improving",
            Self::Declining => "Declining",
            Self::Stable => "Stable",
            Self::InsufficientData => "Not enough data",
        }
    }
}

/// Rolls sessions up into results.
#[derive(Debug, Clone, Default)]
pub struct ResultsAggregator {
    config: ResultsConfig,
}

impl ResultsAggregator {
    pub fn new(config: ResultsConfig) -> Self {
        Self { config }
    }

    /// Summarize a completed session.
    ///
    /// Every answer lands in exactly one category bucket and one rank bucket,
    /// so both breakdowns sum to the session totals.
    pub fn aggregate(&self, session: &Session) -> EngineResult<Results> {
        if !session.is_completed() {
            return Err(EngineError::SessionNotCompleted);
        }

        let mut by_category: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        let mut by_rank: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        let mut total = 0;
        let mut correct = 0;

        for (card, answer) in session.answered_cards() {
            let hit = usize::from(answer.is_correct);
            total += 1;
            correct += hit;

            let entry = by_category.entry(card.item.category.as_str()).or_default();
            entry.0 += 1;
            entry.1 += hit;

            let entry = by_rank.entry(card.item.rank.as_str()).or_default();
            entry.0 += 1;
            entry.1 += hit;
        }

        let category_breakdown = to_breakdowns(by_category);
        let rank_breakdown = to_breakdowns(by_rank);

        let weak: Vec<&Breakdown> = category_breakdown
            .iter()
            .filter(|b| self.is_weak(b.accuracy))
            .collect();
        let weak_areas = weak
            .iter()
            .map(|b| {
                format!(
                    "{}: {:.0}% accuracy ({} of {} correct)",
                    b.name,
                    b.accuracy * 100.0,
                    b.correct,
                    b.total
                )
            })
            .collect();

        let incorrect = total - correct;
        let recommendations = self.recommend(&weak, &rank_breakdown, total, incorrect);

        Ok(Results {
            session_id: session.id(),
            total_items: total,
            correct_count: correct,
            incorrect_count: incorrect,
            accuracy: ratio(correct, total),
            category_breakdown,
            rank_breakdown,
            weak_areas,
            recommendations,
            average_response_time_ms: session.average_response_time_ms(),
            completed_at: session.completed_at(),
        })
    }

    /// Accuracy at the threshold counts as passing.
    fn is_weak(&self, accuracy: f64) -> bool {
        accuracy + 1e-9 < self.config.weak_area_threshold
    }

    fn recommend(
        &self,
        weak: &[&Breakdown],
        ranks: &[Breakdown],
        total: usize,
        incorrect: usize,
    ) -> Vec<String> {
        let mut out = Vec::new();

        for b in weak {
            out.push(format!(
                "Review {} terminology: {} of {} missed this session",
                b.name,
                b.total - b.correct,
                b.total
            ));
        }
        for rank in ranks.iter().filter(|r| self.is_weak(r.accuracy)) {
            out.push(format!("Revisit material from {} before moving on", rank.name));
        }
        if incorrect > 0 && out.is_empty() {
            out.push(format!(
                "Go over the {} item{} you missed once more",
                incorrect,
                if incorrect == 1 { "" } else { "s" }
            ));
        }
        if total > 0 && incorrect == 0 {
            out.push("Perfect session; try mastery mode to review earlier belts".to_string());
        }
        out
    }

    /// Classify accuracy across sessions in order.
    ///
    /// Uses the least-squares slope of accuracy against session number, so
    /// any non-decreasing sequence with at least one rise is improving.
    pub fn analyze_trend(&self, history: &[Results]) -> Trend {
        if history.len() < 2 {
            return Trend::InsufficientData;
        }

        let n = history.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = history.iter().map(|r| r.accuracy).sum::<f64>() / n;

        let mut cov = 0.0;
        let mut var = 0.0;
        for (i, r) in history.iter().enumerate() {
            let dx = i as f64 - mean_x;
            cov += dx * (r.accuracy - mean_y);
            var += dx * dx;
        }
        let slope = cov / var;

        if slope > self.config.trend_tolerance {
            Trend::Improving
        } else if slope < -self.config.trend_tolerance {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }
}

fn to_breakdowns(groups: BTreeMap<&str, (usize, usize)>) -> Vec<Breakdown> {
    groups
        .into_iter()
        .map(|(name, (total, correct))| Breakdown::new(name.to_string(), total, correct))
        .collect()
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
