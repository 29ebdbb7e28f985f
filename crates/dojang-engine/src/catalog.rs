//! Immutable content catalog.

use crate::error::{EngineError, EngineResult};
use crate::models::{Item, RankLevel};
use crate::rank::RankLadder;
use std::collections::{BTreeSet, HashMap};

/// Validated set of study items plus the rank ladder they refer to.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<Item>,
    ladder: RankLadder,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog.
    ///
    /// Fails when ids repeat, an item references a rank missing from the
    /// ladder, a difficulty is outside 1..=5, or no category is defined.
    pub fn new(items: Vec<Item>, ladder: RankLadder) -> EngineResult<Self> {
        let mut index = HashMap::with_capacity(items.len());
        for (pos, item) in items.iter().enumerate() {
            if index.insert(item.id.clone(), pos).is_some() {
                return Err(EngineError::InvalidCatalog(format!(
                    "item id '{}' appears more than once",
                    item.id
                )));
            }
            if !ladder.contains(&item.rank) {
                return Err(EngineError::InvalidCatalog(format!(
                    "item '{}' references unknown rank '{}'",
                    item.id, item.rank
                )));
            }
            if !(1..=5).contains(&item.difficulty) {
                return Err(EngineError::InvalidCatalog(format!(
                    "item '{}' has difficulty {} (expected 1-5)",
                    item.id, item.difficulty
                )));
            }
        }

        if !items.iter().any(|i| !i.category.trim().is_empty()) {
            return Err(EngineError::NoCategories);
        }

        tracing::debug!(items = items.len(), ranks = ladder.len(), "catalog built");
        Ok(Self { items, ladder, index })
    }

    /// All items in load order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// The rank ladder.
    pub fn ladder(&self) -> &RankLadder {
        &self.ladder
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an item.
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    /// Look up an item, failing on unknown ids.
    pub fn require(&self, id: &str) -> EngineResult<&Item> {
        self.get(id).ok_or_else(|| EngineError::UnknownItem(id.to_string()))
    }

    /// Rank of an item.
    pub fn rank_of(&self, item: &Item) -> Option<&RankLevel> {
        self.ladder.get(&item.rank)
    }

    /// Distinct category names, sorted.
    pub fn categories(&self) -> Vec<&str> {
        self.items
            .iter()
            .map(|i| i.category.as_str())
            .filter(|c| !c.trim().is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Items at a given rank.
    pub fn items_for_rank<'a>(&'a self, rank_id: &'a str) -> impl Iterator<Item = &'a Item> + 'a {
        self.items.iter().filter(move |i| i.rank == rank_id)
    }
}
