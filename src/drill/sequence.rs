/*!
 * Sequence building.
 *
 * `build` is the pure core: one English item then `repetitions` Mandarin items
 * per pair, in the order given. `DrillPlan` does the upstream work that decides
 * that order (eligibility, category filter, shuffle).
 */

use log::debug;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;

use super::model::{DrillItem, DrillSequence, Language, PhrasePair};

/// Category sentinel that disables filtering
pub const ALL_CATEGORIES: &str = "All";

/// Lowest accepted repetition count; smaller values are clamped up to it
pub const MIN_REPETITIONS: u32 = 1;

/// Build the drill sequence for `pairs`.
///
/// A repetition count of 0 is clamped to 1, so every pair always produces at
/// least one Mandarin item. An empty slice yields an empty sequence.
pub fn build(pairs: &[PhrasePair], repetitions: u32) -> DrillSequence {
    let repetitions = repetitions.max(MIN_REPETITIONS) as usize;
    let mut items = Vec::with_capacity(pairs.len() * (repetitions + 1));

    for pair in pairs {
        items.push(DrillItem::new(pair.english.clone(), Language::English, pair.id.clone()));
        for _ in 0..repetitions {
            items.push(DrillItem::new(pair.chinese.clone(), Language::Mandarin, pair.id.clone()));
        }
    }

    DrillSequence::from(items)
}

/// Drop pairs that cannot be drilled (blank English or Chinese)
pub fn eligible_pairs(pairs: &[PhrasePair]) -> Vec<PhrasePair> {
    let eligible: Vec<PhrasePair> = pairs.iter().filter(|p| p.is_drillable()).cloned().collect();
    if eligible.len() < pairs.len() {
        debug!("Excluded {} phrase(s) with blank text", pairs.len() - eligible.len());
    }
    eligible
}

/// Keep pairs in `category`; the `All` sentinel keeps everything
pub fn filter_by_category(pairs: Vec<PhrasePair>, category: &str) -> Vec<PhrasePair> {
    if category == ALL_CATEGORIES {
        return pairs;
    }
    pairs
        .into_iter()
        .filter(|p| p.category.as_deref() == Some(category))
        .collect()
}

/// Uniform random permutation (Fisher–Yates) of `pairs`
pub fn shuffle_pairs<R: Rng + ?Sized>(mut pairs: Vec<PhrasePair>, rng: &mut R) -> Vec<PhrasePair> {
    pairs.shuffle(rng);
    pairs
}

/// The `All` sentinel followed by the sorted distinct categories
pub fn categories(pairs: &[PhrasePair]) -> Vec<String> {
    let distinct: BTreeSet<&str> = pairs
        .iter()
        .filter_map(|p| p.category.as_deref())
        .filter(|c| !c.trim().is_empty())
        .collect();

    std::iter::once(ALL_CATEGORIES.to_string())
        .chain(distinct.into_iter().map(str::to_string))
        .collect()
}

/// Parameters that, when changed, require a new sequence
#[derive(Debug, Clone, PartialEq)]
pub struct PlanParams {
    pub repetitions: u32,
    pub shuffle: bool,
    pub category: String,
}

impl Default for PlanParams {
    fn default() -> Self {
        Self {
            repetitions: 3,
            shuffle: false,
            category: ALL_CATEGORIES.to_string(),
        }
    }
}

/// Ordered pairs plus the sequence derived from them
#[derive(Debug, Clone, Default)]
pub struct DrillPlan {
    pairs: Vec<PhrasePair>,
    sequence: DrillSequence,
}

impl DrillPlan {
    /// Prepare a plan from the catalog list. Shuffling happens here, once per
    /// call, never while a sequence is being played.
    pub fn prepare<R: Rng + ?Sized>(catalog: &[PhrasePair], params: &PlanParams, rng: &mut R) -> Self {
        let pairs = filter_by_category(eligible_pairs(catalog), &params.category);
        let pairs = if params.shuffle { shuffle_pairs(pairs, rng) } else { pairs };
        let sequence = build(&pairs, params.repetitions);

        debug!(
            "Prepared plan: {} phrase(s), {} item(s), category '{}', shuffle {}",
            pairs.len(),
            sequence.len(),
            params.category,
            params.shuffle
        );

        Self { pairs, sequence }
    }

    pub fn pairs(&self) -> &[PhrasePair] {
        &self.pairs
    }

    pub fn sequence(&self) -> &DrillSequence {
        &self.sequence
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
