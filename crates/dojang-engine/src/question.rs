//! Multiple-choice question generation.
//!
//! Every question has four unique options: the correct answer and three
//! distractors. Distractors are drawn from the source item's category first
//! and fall back to the whole pool only when that category runs short, so
//! across a batch most distractors share their question's category while
//! small categories still produce valid questions.

use crate::config::QuestionConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{Direction, Item, Question};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Options per question.
pub const OPTION_COUNT: usize = 4;

/// Test length policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    /// One question per direction for every item.
    Comprehensive,
    /// A short test of `quick_min..=quick_max` questions.
    Quick,
}

/// Builds questions from catalog items.
#[derive(Debug, Clone, Default)]
pub struct QuestionGenerator {
    config: QuestionConfig,
}

impl QuestionGenerator {
    pub fn new(config: QuestionConfig) -> Self {
        Self { config }
    }

    /// Build one question for `item`, drawing distractors from `all_items`.
    ///
    /// Fails only when `all_items` cannot supply four distinct answers.
    pub fn generate_question<R: Rng + ?Sized>(
        &self,
        item: &Item,
        all_items: &[Item],
        direction: Direction,
        rng: &mut R,
    ) -> EngineResult<Question> {
        let refs: Vec<&Item> = all_items.iter().collect();
        self.generate_from(item, &refs, direction, rng)
    }

    fn generate_from<R: Rng + ?Sized>(
        &self,
        item: &Item,
        all_items: &[&Item],
        direction: Direction,
        rng: &mut R,
    ) -> EngineResult<Question> {
        ensure_enough_answers(all_items, direction)?;

        let correct = item.answer(direction).to_string();
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(normalize(&correct));

        let (mut same, mut other): (Vec<&Item>, Vec<&Item>) = all_items
            .iter()
            .copied()
            .filter(|c| c.id != item.id)
            .partition(|c| c.category == item.category);
        same.shuffle(rng);
        other.shuffle(rng);

        let needed = OPTION_COUNT - 1;
        let mut distractors = Vec::with_capacity(OPTION_COUNT);
        let mut same_category = 0;

        for candidate in same.iter() {
            if distractors.len() == needed {
                break;
            }
            let text = candidate.answer(direction);
            if seen.insert(normalize(text)) {
                distractors.push(text.to_string());
                same_category += 1;
            }
        }

        if distractors.len() < needed {
            tracing::debug!(
                item = %item.id,
                category = %item.category,
                same_category,
                "category short of distractors, drawing from other categories"
            );
            for candidate in other.iter() {
                if distractors.len() == needed {
                    break;
                }
                let text = candidate.answer(direction);
                if seen.insert(normalize(text)) {
                    distractors.push(text.to_string());
                }
            }
        }

        if distractors.len() < needed {
            // Every distinct answer belongs to the source item itself.
            return Err(EngineError::InsufficientCandidates {
                needed: OPTION_COUNT,
                available: distractors.len() + 1,
            });
        }

        let correct_answer_index = rng.gen_range(0..OPTION_COUNT);
        let mut options = distractors;
        options.insert(correct_answer_index, correct);

        Ok(Question {
            source_item_id: item.id.clone(),
            prompt: item.prompt(direction).to_string(),
            options,
            correct_answer_index,
            direction,
            same_category_distractors: same_category,
        })
    }

    /// Build a test over `items`, with distractors from `all_items`.
    ///
    /// Comprehensive tests ask both directions for every item. Quick tests
    /// ask a random `quick_min..=quick_max` (item, direction) pairs; when
    /// fewer distinct pairs exist they are repeated, each repeat with freshly
    /// drawn options, to reach the length. Question order is shuffled.
    pub fn generate_test<R: Rng + ?Sized>(
        &self,
        kind: TestKind,
        items: &[&Item],
        all_items: &[Item],
        rng: &mut R,
    ) -> EngineResult<Vec<Question>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let refs: Vec<&Item> = all_items.iter().collect();
        for direction in Direction::ALL {
            ensure_enough_answers(&refs, direction)?;
        }

        let mut pairs: Vec<(&Item, Direction)> = items
            .iter()
            .flat_map(|item| Direction::ALL.into_iter().map(move |d| (*item, d)))
            .collect();
        pairs.shuffle(rng);

        if kind == TestKind::Quick {
            let target = rng.gen_range(self.config.quick_min..=self.config.quick_max);
            let distinct = pairs.len();
            while pairs.len() < target {
                let next = pairs[pairs.len() % distinct];
                pairs.push(next);
            }
            pairs.truncate(target);
            if distinct < target {
                pairs.shuffle(rng);
            }
        }

        let questions = pairs
            .into_iter()
            .map(|(item, direction)| self.generate_from(item, &refs, direction, rng))
            .collect::<EngineResult<Vec<_>>>()?;

        tracing::debug!(
            kind = ?kind,
            questions = questions.len(),
            same_category_ratio = same_category_ratio(&questions),
            "generated test"
        );
        Ok(questions)
    }

    /// Whether a batch meets the configured same-category target.
    pub fn meets_category_target(&self, questions: &[Question]) -> bool {
        same_category_ratio(questions) > self.config.same_category_ratio_target
    }
}

/// Share of distractors in a batch that came from their question's category.
pub fn same_category_ratio(questions: &[Question]) -> f64 {
    let total: usize = questions.iter().map(|q| q.distractor_count()).sum();
    if total == 0 {
        return 0.0;
    }
    let same: usize = questions.iter().map(|q| q.same_category_distractors).sum();
    same as f64 / total as f64
}

fn ensure_enough_answers(items: &[&Item], direction: Direction) -> EngineResult<()> {
    let distinct: HashSet<String> = items.iter().map(|i| normalize(i.answer(direction))).collect();
    if items.len() < OPTION_COUNT || distinct.len() < OPTION_COUNT {
        return Err(EngineError::InsufficientCandidates {
            needed: OPTION_COUNT,
            available: distinct.len(),
        });
    }
    Ok(())
}

pub(crate) fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn items() -> Vec<Item> {
        let mut items = Vec::new();
        for i in 0..6 {
            items.push(Item::new(
                format!("k{}", i),
                format!("Chagi {}", i),
                format!("Kick {}", i),
                "8th_keup",
                "kicks",
            ));
        }
        for i in 0..6 {
            items.push(Item::new(
                format!("s{}", i),
                format!("Sogi {}", i),
                format!("Stance {}", i),
                "8th_keup",
                "stances",
            ));
        }
        items
    }

    #[test]
    fn test_four_unique_options_with_answer() {
        let items = items();
        let generator = QuestionGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for item in &items {
            for direction in Direction::ALL {
                let q = generator.generate_question(item, &items, direction, &mut rng).unwrap();
                assert_eq!(q.options.len(), 4);
                let unique: HashSet<_> = q.options.iter().collect();
                assert_eq!(unique.len(), 4);
                assert_eq!(q.correct_answer(), item.answer(direction));
                assert_eq!(q.prompt, item.prompt(direction));
            }
        }
    }

    #[test]
    fn test_prefers_same_category() {
        let items = items();
        let generator = QuestionGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let q = generator
            .generate_question(&items[0], &items, Direction::FrontToBack, &mut rng)
            .unwrap();
        assert_eq!(q.same_category_distractors, 3);
        assert!(q.options.iter().all(|o| o.starts_with("Kick")));
    }

    #[test]
    fn test_falls_back_across_categories() {
        let mut items = items();
        items.push(Item::new("p0", "Poomsae", "Pattern", "8th_keup", "patterns"));
        let generator = QuestionGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let q = generator
            .generate_question(items.last().unwrap(), &items, Direction::FrontToBack, &mut rng)
            .unwrap();
        assert_eq!(q.options.len(), 4);
        assert_eq!(q.same_category_distractors, 0);
        assert!(q.options.contains(&"Pattern".to_string()));
    }

    #[test]
    fn test_skips_duplicate_answer_text() {
        let items = vec![
            Item::new("a", "Ap chagi", "Front kick", "8th_keup", "kicks"),
            Item::new("b", "Ap cha busigi", "Front kick", "8th_keup", "kicks"),
            Item::new("c", "Yop chagi", "Side kick", "8th_keup", "kicks"),
            Item::new("d", "Dollyo chagi", "Turning kick", "8th_keup", "kicks"),
            Item::new("e", "Dwit chagi", "Back kick", "8th_keup", "kicks"),
        ];
        let generator = QuestionGenerator::default();
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let q = generator
                .generate_question(&items[0], &items, Direction::FrontToBack, &mut rng)
                .unwrap();
            let unique: HashSet<_> = q.options.iter().collect();
            assert_eq!(unique.len(), 4);
        }
    }

    #[test]
    fn test_too_small_catalog_is_fatal() {
        let items: Vec<Item> = items().into_iter().take(3).collect();
        let generator = QuestionGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = generator
            .generate_question(&items[0], &items, Direction::FrontToBack, &mut rng)
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientCandidates { needed: 4, .. }));
    }

    #[test]
    fn test_correct_index_uses_every_position() {
        let items = items();
        let generator = QuestionGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut seen = [false; 4];
        for i in 0..40 {
            let item = &items[i % items.len()];
            let q = generator
                .generate_question(item, &items, Direction::FrontToBack, &mut rng)
                .unwrap();
            seen[q.correct_answer_index] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_comprehensive_asks_both_directions() {
        let items = items();
        let chosen: Vec<&Item> = items.iter().take(5).collect();
        let generator = QuestionGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let questions = generator
            .generate_test(TestKind::Comprehensive, &chosen, &items, &mut rng)
            .unwrap();
        assert_eq!(questions.len(), 10);
        for item in &chosen {
            let dirs: HashSet<_> = questions
                .iter()
                .filter(|q| q.source_item_id == item.id)
                .map(|q| q.direction)
                .collect();
            assert_eq!(dirs.len(), 2);
        }
        assert!(generator.meets_category_target(&questions));
    }

    #[test]
    fn test_quick_is_bounded() {
        let items = items();
        let chosen: Vec<&Item> = items.iter().collect();
        let generator = QuestionGenerator::default();
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let questions = generator
                .generate_test(TestKind::Quick, &chosen, &items, &mut rng)
                .unwrap();
            assert!((5..=10).contains(&questions.len()));
        }
    }

    #[test]
    fn test_quick_reaches_minimum_with_few_items() {
        let items = items();
        let chosen: Vec<&Item> = items.iter().take(2).collect();
        let generator = QuestionGenerator::default();
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let questions = generator
                .generate_test(TestKind::Quick, &chosen, &items, &mut rng)
                .unwrap();
            assert!((5..=10).contains(&questions.len()));
            for direction in Direction::ALL {
                for item in &chosen {
                    assert!(questions
                        .iter()
                        .any(|q| q.source_item_id == item.id && q.direction == direction));
                }
            }
        }
    }

    #[test]
    fn test_empty_selection_gives_empty_test() {
        let items = items();
        let generator = QuestionGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let questions = generator
            .generate_test(TestKind::Quick, &[], &items, &mut rng)
            .unwrap();
        assert!(questions.is_empty());
    }
}
