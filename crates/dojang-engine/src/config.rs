//! Engine configuration.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub leitner: LeitnerConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub questions: QuestionConfig,
    #[serde(default)]
    pub results: ResultsConfig,
}

impl EngineConfig {
    /// Parse from TOML and validate.
    pub fn from_toml_str(s: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml_string(&self) -> EngineResult<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Toml(e.to_string()))
    }

    /// Check every section.
    pub fn validate(&self) -> EngineResult<()> {
        self.leitner.validate()?;
        self.selection.validate()?;
        self.questions.validate()?;
        self.results.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeitnerConfig {
    /// Review interval per box in days; index 0 is box 1.
    #[serde(default = "default_box_intervals")]
    pub box_intervals_days: Vec<i64>,
    /// Lowest box counted as familiar.
    #[serde(default = "default_familiar_box")]
    pub familiar_box: u8,
    /// Lowest box counted as mastered.
    #[serde(default = "default_mastered_box")]
    pub mastered_box: u8,
    /// Correct streak also required for mastered.
    #[serde(default = "default_mastered_streak")]
    pub mastered_streak: u32,
}

/// Longest review interval a box may have, in days.
pub const MAX_INTERVAL_DAYS: i64 = 36_500;

fn default_box_intervals() -> Vec<i64> { vec![0, 1, 3, 7, 14] }
fn default_familiar_box() -> u8 { 3 }
fn default_mastered_box() -> u8 { 5 }
fn default_mastered_streak() -> u32 { 3 }

impl Default for LeitnerConfig {
    fn default() -> Self {
        Self {
            box_intervals_days: default_box_intervals(),
            familiar_box: default_familiar_box(),
            mastered_box: default_mastered_box(),
            mastered_streak: default_mastered_streak(),
        }
    }
}

impl LeitnerConfig {
    /// Number of boxes.
    pub fn box_count(&self) -> u8 {
        self.box_intervals_days.len().min(u8::MAX as usize) as u8
    }

    pub(crate) fn validate(&self) -> EngineResult<()> {
        if self.box_intervals_days.is_empty() {
            return Err(EngineError::Config("leitner.box_intervals_days must not be empty".into()));
        }
        if self.box_intervals_days.len() > u8::MAX as usize {
            return Err(EngineError::Config("leitner.box_intervals_days has too many boxes".into()));
        }
        if self.box_intervals_days.iter().any(|d| *d < 0) {
            return Err(EngineError::Config(
                "leitner.box_intervals_days must not be negative".into(),
            ));
        }
        if self.box_intervals_days.iter().any(|d| *d > MAX_INTERVAL_DAYS) {
            return Err(EngineError::Config(format!(
                "leitner.box_intervals_days must not exceed {} days",
                MAX_INTERVAL_DAYS
            )));
        }
        if self.box_intervals_days.windows(2).any(|w| w[1] < w[0]) {
            return Err(EngineError::Config(
                "leitner.box_intervals_days must be non-decreasing".into(),
            ));
        }
        let boxes = self.box_count();
        if self.familiar_box == 0 || self.familiar_box > boxes {
            return Err(EngineError::Config(format!(
                "leitner.familiar_box must be within 1..={}",
                boxes
            )));
        }
        if self.mastered_box < self.familiar_box || self.mastered_box > boxes {
            return Err(EngineError::Config(format!(
                "leitner.mastered_box must be within {}..={}",
                self.familiar_box, boxes
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Hard cap on mastery-mode selections.
    #[serde(default = "default_mastery_cap")]
    pub mastery_cap: usize,
}

fn default_mastery_cap() -> usize { 50 }

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            mastery_cap: default_mastery_cap(),
        }
    }
}

impl SelectionConfig {
    fn validate(&self) -> EngineResult<()> {
        if self.mastery_cap == 0 {
            return Err(EngineError::Config("selection.mastery_cap must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionConfig {
    /// Fewest questions in a quick test.
    #[serde(default = "default_quick_min")]
    pub quick_min: usize,
    /// Most questions in a quick test.
    #[serde(default = "default_quick_max")]
    pub quick_max: usize,
    /// Expected batch-level share of same-category distractors.
    #[serde(default = "default_same_category_target")]
    pub same_category_ratio_target: f64,
}

fn default_quick_min() -> usize { 5 }
fn default_quick_max() -> usize { 10 }
fn default_same_category_target() -> f64 { 0.5 }

impl Default for QuestionConfig {
    fn default() -> Self {
        Self {
            quick_min: default_quick_min(),
            quick_max: default_quick_max(),
            same_category_ratio_target: default_same_category_target(),
        }
    }
}

impl QuestionConfig {
    fn validate(&self) -> EngineResult<()> {
        if self.quick_min == 0 || self.quick_min > self.quick_max {
            return Err(EngineError::Config(format!(
                "questions.quick_min ({}) must be positive and no larger than quick_max ({})",
                self.quick_min, self.quick_max
            )));
        }
        if !(0.0..=1.0).contains(&self.same_category_ratio_target) {
            return Err(EngineError::Config(
                "questions.same_category_ratio_target must be within 0..=1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsConfig {
    /// Categories below this accuracy are weak areas.
    #[serde(default = "default_weak_threshold")]
    pub weak_area_threshold: f64,
    /// Minimum slope for a trend to count as moving.
    #[serde(default = "default_trend_tolerance")]
    pub trend_tolerance: f64,
}

fn default_weak_threshold() -> f64 { 0.70 }
fn default_trend_tolerance() -> f64 { 1e-9 }

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            weak_area_threshold: default_weak_threshold(),
            trend_tolerance: default_trend_tolerance(),
        }
    }
}

impl ResultsConfig {
    fn validate(&self) -> EngineResult<()> {
        if !(0.0..=1.0).contains(&self.weak_area_threshold) {
            return Err(EngineError::Config(
                "results.weak_area_threshold must be within 0..=1".into(),
            ));
        }
        if self.trend_tolerance < 0.0 {
            return Err(EngineError::Config("results.trend_tolerance must not be negative".into()));
        }
        Ok(())
    }
}
