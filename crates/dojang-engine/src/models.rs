//! Data models for the learning engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifiers.
pub type ItemId = String;
pub type RankId = String;

/// An immutable study unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier.
    pub id: ItemId,
    /// Front text (the term).
    pub front_text: String,
    /// Back text (the translation).
    pub back_text: String,
    /// Pronunciation guide.
    #[serde(default)]
    pub pronunciation: String,
    /// Longer definition.
    #[serde(default)]
    pub definition: String,
    /// Belt rank this item belongs to.
    pub rank: RankId,
    /// Content category.
    pub category: String,
    /// Difficulty, 1 (easiest) to 5.
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
}

fn default_difficulty() -> u8 {
    1
}

impl Item {
    /// Create a new item.
    pub fn new(
        id: impl Into<ItemId>,
        front_text: impl Into<String>,
        back_text: impl Into<String>,
        rank: impl Into<RankId>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            front_text: front_text.into(),
            back_text: back_text.into(),
            pronunciation: String::new(),
            definition: String::new(),
            rank: rank.into(),
            category: category.into(),
            difficulty: default_difficulty(),
        }
    }

    /// Set pronunciation.
    pub fn with_pronunciation(mut self, pronunciation: impl Into<String>) -> Self {
        self.pronunciation = pronunciation.into();
        self
    }

    /// Set definition.
    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = definition.into();
        self
    }

    /// Set difficulty.
    pub fn with_difficulty(mut self, difficulty: u8) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Text shown to the learner for the given direction.
    pub fn prompt(&self, direction: Direction) -> &str {
        match direction {
            Direction::FrontToBack => &self.front_text,
            Direction::BackToFront => &self.back_text,
        }
    }

    /// Text the learner must produce for the given direction.
    pub fn answer(&self, direction: Direction) -> &str {
        match direction {
            Direction::FrontToBack => &self.back_text,
            Direction::BackToFront => &self.front_text,
        }
    }
}

/// A belt rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankLevel {
    /// Unique identifier.
    pub id: RankId,
    /// Display name.
    pub display_name: String,
    /// Larger = less advanced (learned earlier).
    pub sort_key: u32,
    /// Whether this rank is in the beginner tier.
    #[serde(default)]
    pub is_beginner_tier: bool,
}

impl RankLevel {
    /// Create a new rank level.
    pub fn new(id: impl Into<RankId>, display_name: impl Into<String>, sort_key: u32) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            sort_key,
            is_beginner_tier: false,
        }
    }

    /// Mark as beginner tier.
    pub fn beginner(mut self) -> Self {
        self.is_beginner_tier = true;
        self
    }

    /// Whether `self` is the same rank as `other` or learned before it.
    pub fn is_prior_or_equal(&self, other: &RankLevel) -> bool {
        self.sort_key >= other.sort_key
    }
}

/// Which content a learner reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningMode {
    /// Current rank only.
    #[default]
    Progression,
    /// Current rank plus every prior rank.
    Mastery,
}

impl LearningMode {
    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Progression => "progression",
            Self::Mastery => "mastery",
        }
    }
}

impl std::str::FromStr for LearningMode {
    type Err = crate::EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "progression" => Ok(Self::Progression),
            "mastery" => Ok(Self::Mastery),
            _ => Err(crate::EngineError::Config(format!("Unknown learning mode: {}", s))),
        }
    }
}

/// Question direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Show the term, ask for the translation.
    #[default]
    FrontToBack,
    /// Show the translation, ask for the term.
    BackToFront,
}

impl Direction {
    /// Both directions.
    pub const ALL: [Direction; 2] = [Direction::FrontToBack, Direction::BackToFront];
}

/// How well a learner knows an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryLevel {
    #[default]
    Learning,
    Familiar,
    Mastered,
}

impl MasteryLevel {
    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Learning => "Learning",
            Self::Familiar => "Familiar",
            Self::Mastered => "Mastered",
        }
    }
}

/// Spaced-repetition state for one learner and one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerProgress {
    /// Item this record tracks.
    pub item_id: ItemId,
    /// Leitner box, 1-based.
    pub box_number: u8,
    /// Consecutive correct answers.
    pub correct_streak: u32,
    /// Consecutive incorrect answers.
    pub incorrect_streak: u32,
    /// Number of recorded answers.
    pub total_reviews: u32,
    /// When the last answer was recorded.
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// Derived from box and streak.
    pub mastery_level: MasteryLevel,
}

impl LearnerProgress {
    /// Create a fresh record in box 1.
    pub fn new(item_id: impl Into<ItemId>) -> Self {
        Self {
            item_id: item_id.into(),
            box_number: 1,
            correct_streak: 0,
            incorrect_streak: 0,
            total_reviews: 0,
            last_reviewed_at: None,
            mastery_level: MasteryLevel::Learning,
        }
    }
}

/// A generated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Item the question was built from.
    pub source_item_id: ItemId,
    /// Text shown to the learner.
    pub prompt: String,
    /// Exactly four unique options.
    pub options: Vec<String>,
    /// Position of the correct answer in `options`.
    pub correct_answer_index: usize,
    /// Direction the question asks in.
    pub direction: Direction,
    /// How many distractors share the source item's category.
    pub same_category_distractors: usize,
}

impl Question {
    /// Get the correct answer text.
    pub fn correct_answer(&self) -> &str {
        &self.options[self.correct_answer_index]
    }

    /// Check a selected option.
    pub fn is_correct(&self, selected_index: usize) -> bool {
        selected_index == self.correct_answer_index
    }

    /// Number of distractors.
    pub fn distractor_count(&self) -> usize {
        self.options.len().saturating_sub(1)
    }
}
