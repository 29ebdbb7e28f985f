//! Belt rank ordering.

use crate::error::{EngineError, EngineResult};
use crate::models::RankLevel;
use std::collections::HashSet;

/// Total order over belt ranks.
///
/// Levels are kept in learning order: the least advanced rank (largest sort
/// key) first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankLadder {
    levels: Vec<RankLevel>,
}

impl RankLadder {
    /// Build a ladder, rejecting duplicate ids or duplicate sort keys.
    pub fn new(mut levels: Vec<RankLevel>) -> EngineResult<Self> {
        let mut ids = HashSet::new();
        let mut keys = HashSet::new();
        for level in &levels {
            if !ids.insert(level.id.as_str()) {
                return Err(EngineError::InvalidCatalog(format!(
                    "rank '{}' is defined more than once",
                    level.id
                )));
            }
            if !keys.insert(level.sort_key) {
                return Err(EngineError::InvalidCatalog(format!(
                    "rank '{}' reuses sort key {}",
                    level.id, level.sort_key
                )));
            }
        }
        levels.sort_by(|a, b| b.sort_key.cmp(&a.sort_key));
        Ok(Self { levels })
    }

    /// Colour-belt grades from 10th keup to 1st keup, then 1st dan.
    pub fn standard() -> Self {
        const BELTS: [(&str, &str, u32); 11] = [
            ("10th_keup", "10th Keup (White Belt)", 10),
            ("9th_keup", "9th Keup (White Belt, Yellow Tag)", 9),
            ("8th_keup", "8th Keup (Yellow Belt)", 8),
            ("7th_keup", "7th Keup (Yellow Belt, Green Tag)", 7),
            ("6th_keup", "6th Keup (Green Belt)", 6),
            ("5th_keup", "5th Keup (Green Belt, Blue Tag)", 5),
            ("4th_keup", "4th Keup (Blue Belt)", 4),
            ("3rd_keup", "3rd Keup (Blue Belt, Red Tag)", 3),
            ("2nd_keup", "2nd Keup (Red Belt)", 2),
            ("1st_keup", "1st Keup (Red Belt, Black Tag)", 1),
            ("1st_dan", "1st Dan (Black Belt)", 0),
        ];

        let levels = BELTS
            .iter()
            .map(|(id, name, key)| {
                let level = RankLevel::new(*id, *name, *key);
                if *key >= 7 {
                    level.beginner()
                } else {
                    level
                }
            })
            .collect();
        Self { levels }
    }

    /// Find a level by id.
    pub fn get(&self, id: &str) -> Option<&RankLevel> {
        self.levels.iter().find(|l| l.id == id)
    }

    /// Find a level by id, failing on unknown ids.
    pub fn require(&self, id: &str) -> EngineResult<&RankLevel> {
        self.get(id).ok_or_else(|| EngineError::UnknownRank(id.to_string()))
    }

    /// Check whether a rank id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// All levels, least advanced first.
    pub fn levels(&self) -> &[RankLevel] {
        &self.levels
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the ladder is empty.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Ranks learned before `rank`, least advanced first.
    pub fn prior_ranks<'a>(
        &'a self,
        rank: &'a RankLevel,
    ) -> impl Iterator<Item = &'a RankLevel> + 'a {
        self.levels.iter().filter(move |l| l.sort_key > rank.sort_key)
    }

    /// The rank immediately after `rank`, if any.
    pub fn next_rank(&self, rank: &RankLevel) -> Option<&RankLevel> {
        self.levels
            .iter()
            .filter(|l| l.sort_key < rank.sort_key)
            .max_by_key(|l| l.sort_key)
    }

    /// The rank immediately before `rank`, if any.
    pub fn previous_rank(&self, rank: &RankLevel) -> Option<&RankLevel> {
        self.levels
            .iter()
            .filter(|l| l.sort_key > rank.sort_key)
            .min_by_key(|l| l.sort_key)
    }
}

impl Default for RankLadder {
    fn default() -> Self {
        Self::standard()
    }
}
