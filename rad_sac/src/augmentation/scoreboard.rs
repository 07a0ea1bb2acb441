//! Running scores for the active augmentations.
//!
//! In `prune` mode a score counts wins. In the idle-counting modes (`unused`,
//! `search`, `warm_up`, `tune`) it counts consecutive steps an augmentation
//! was not selected. `select` only counts wins and never evicts.

use indexmap::IndexMap;

use super::kind::{AugmentationKey, AugmentationKind, AugmentationMode};

/// Score per active augmentation key, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AugmentationScoreBoard {
    scores: IndexMap<AugmentationKey, usize>,
}

/// Step context needed to settle scores after a selection.
#[derive(Debug, Clone, Copy)]
pub struct SettleContext {
    pub mode: AugmentationMode,
    pub step: usize,
    pub prune_interval: usize,
    /// Number of currently active augmentations.
    pub active: usize,
    /// Steps that must have elapsed before `prune` evicts anything.
    pub warmup_steps: usize,
}

impl AugmentationScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Board with every key at zero.
    pub fn with_keys(keys: impl IntoIterator<Item = AugmentationKey>) -> Self {
        Self {
            scores: keys.into_iter().map(|key| (key, 0)).collect(),
        }
    }

    pub fn insert(&mut self, key: AugmentationKey, score: usize) {
        self.scores.insert(key, score);
    }

    pub fn increment(&mut self, key: &AugmentationKey) {
        if let Some(score) = self.scores.get_mut(key) {
            *score += 1;
        }
    }

    pub fn reset(&mut self, key: &AugmentationKey) {
        if let Some(score) = self.scores.get_mut(key) {
            *score = 0;
        }
    }

    /// Remove `key`, keeping the order of the remaining keys.
    pub fn evict(&mut self, key: &AugmentationKey) -> Option<usize> {
        self.scores.shift_remove(key)
    }

    pub fn score(&self, key: &AugmentationKey) -> Option<usize> {
        self.scores.get(key).copied()
    }

    pub fn contains(&self, key: &AugmentationKey) -> bool {
        self.scores.contains_key(key)
    }

    /// Key with the lowest score; the first one seen wins ties.
    pub fn worst_key(&self) -> Option<AugmentationKey> {
        let mut worst: Option<(AugmentationKey, usize)> = None;
        for (key, &score) in &self.scores {
            match worst {
                Some((_, lowest)) if score >= lowest => {}
                _ => worst = Some((*key, score)),
            }
        }
        worst.map(|(key, _)| key)
    }

    /// Floor of the mean score over keys sharing `base`; zero without siblings.
    pub fn sibling_average(&self, base: AugmentationKind) -> usize {
        let (count, sum) = self
            .scores
            .iter()
            .filter(|(key, _)| key.base == base)
            .fold((0usize, 0usize), |(count, sum), (_, &score)| (count + 1, sum + score));
        if count == 0 {
            0
        } else {
            sum / count
        }
    }

    /// Update scores for this step's `winner` and return the key to evict, if any.
    ///
    /// Score changes are collected first and applied afterwards; the returned
    /// key is not removed here.
    pub fn settle(&mut self, winner: &AugmentationKey, ctx: SettleContext) -> Option<AugmentationKey> {
        match ctx.mode {
            AugmentationMode::Prune => {
                self.increment(winner);
                let due = ctx.prune_interval > 0 && ctx.step % ctx.prune_interval == 0;
                if due && ctx.active > 1 && ctx.step > ctx.warmup_steps {
                    self.worst_key()
                } else {
                    None
                }
            }
            mode if mode.counts_idle_steps() => {
                let mut candidate = None;
                let mut idle = Vec::with_capacity(self.scores.len());
                for (key, &score) in &self.scores {
                    if key == winner {
                        continue;
                    }
                    if score + 1 > ctx.prune_interval {
                        candidate.get_or_insert(*key);
                    } else {
                        idle.push(*key);
                    }
                }
                self.reset(winner);
                for key in &idle {
                    self.increment(key);
                }
                candidate
            }
            _ => {
                self.increment(winner);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AugmentationKey, &usize)> {
        self.scores.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augmentation::kind::AugmentationParams;
    use proptest::prelude::*;

    fn key(kind: AugmentationKind) -> AugmentationKey {
        AugmentationKey::base(kind)
    }

    fn ctx(mode: AugmentationMode, step: usize, prune_interval: usize, active: usize) -> SettleContext {
        SettleContext {
            mode,
            step,
            prune_interval,
            active,
            warmup_steps: 1000,
        }
    }

    #[test]
    fn test_prune_evicts_global_minimum() {
        let (a, b, c) = (
            key(AugmentationKind::Flip),
            key(AugmentationKind::Cutout),
            key(AugmentationKind::Rotate),
        );
        let mut board = AugmentationScoreBoard::new();
        board.insert(a, 5);
        board.insert(b, 3);
        board.insert(c, 7);

        let evict = board.settle(&c, ctx(AugmentationMode::Prune, 2000, 100, 3));
        assert_eq!(evict, Some(b));
        assert_eq!(board.score(&c), Some(8));
        assert_eq!(board.score(&a), Some(5));
    }

    #[test]
    fn test_prune_ties_first_seen() {
        let (a, b) = (key(AugmentationKind::Flip), key(AugmentationKind::Cutout));
        let mut board = AugmentationScoreBoard::with_keys([a, b]);
        let evict = board.settle(&b, ctx(AugmentationMode::Prune, 1100, 100, 2));
        // b won and moved to 1, leaving a as the unique minimum
        assert_eq!(evict, Some(a));

        let mut board = AugmentationScoreBoard::with_keys([a, b, key(AugmentationKind::Rotate)]);
        board.insert(key(AugmentationKind::Rotate), 4);
        assert_eq!(board.worst_key(), Some(a));
    }

    #[test]
    fn test_prune_waits_for_interval_and_warmup() {
        let (a, b) = (key(AugmentationKind::Flip), key(AugmentationKind::Cutout));
        let mut board = AugmentationScoreBoard::with_keys([a, b]);
        assert_eq!(board.settle(&a, ctx(AugmentationMode::Prune, 1050, 100, 2)), None);
        assert_eq!(board.settle(&a, ctx(AugmentationMode::Prune, 1000, 100, 2)), None);
        assert_eq!(board.settle(&a, ctx(AugmentationMode::Prune, 1100, 100, 1)), None);
        assert_eq!(board.score(&a), Some(3));
    }

    #[test]
    fn test_idle_eviction_on_crossing_step() {
        let (a, b) = (key(AugmentationKind::Flip), key(AugmentationKind::Cutout));
        let interval = 3;
        let mut board = AugmentationScoreBoard::with_keys([a, b]);

        // b loses `interval` times and reaches the threshold without eviction
        for step in 1..=interval {
            let evict = board.settle(&a, ctx(AugmentationMode::Tune, 1000 + step, interval, 2));
            assert_eq!(evict, None, "evicted early at step {step}");
            assert_eq!(board.score(&b), Some(step));
            assert_eq!(board.score(&a), Some(0));
        }

        // the next loss would exceed the interval
        let evict = board.settle(&a, ctx(AugmentationMode::Tune, 2000, interval, 2));
        assert_eq!(evict, Some(b));
        assert_eq!(board.score(&b), Some(interval));
    }

    #[test]
    fn test_idle_first_candidate_wins() {
        let keys = [
            key(AugmentationKind::Flip),
            key(AugmentationKind::Cutout),
            key(AugmentationKind::Rotate),
            key(AugmentationKind::Grayscale),
        ];
        let mut board = AugmentationScoreBoard::new();
        board.insert(keys[0], 0);
        board.insert(keys[1], 5);
        board.insert(keys[2], 5);
        board.insert(keys[3], 1);

        let evict = board.settle(&keys[0], ctx(AugmentationMode::Search, 1500, 5, 4));
        assert_eq!(evict, Some(keys[1]));
        assert_eq!(board.score(&keys[2]), Some(5));
        assert_eq!(board.score(&keys[3]), Some(2));
    }

    #[test]
    fn test_winner_resets_in_idle_modes() {
        let (a, b) = (key(AugmentationKind::Flip), key(AugmentationKind::Cutout));
        for mode in [
            AugmentationMode::Unused,
            AugmentationMode::Search,
            AugmentationMode::WarmUp,
            AugmentationMode::Tune,
        ] {
            let mut board = AugmentationScoreBoard::new();
            board.insert(a, 2);
            board.insert(b, 0);
            board.settle(&a, ctx(mode, 1500, 10, 2));
            assert_eq!(board.score(&a), Some(0), "{mode}");
            assert_eq!(board.score(&b), Some(1), "{mode}");
        }
    }

    #[test]
    fn test_select_counts_wins_only() {
        let (a, b) = (key(AugmentationKind::Flip), key(AugmentationKind::Cutout));
        let mut board = AugmentationScoreBoard::with_keys([a, b]);
        for step in 1..=5 {
            assert_eq!(board.settle(&a, ctx(AugmentationMode::Select, 1000 * step, 1, 2)), None);
        }
        assert_eq!(board.score(&a), Some(5));
        assert_eq!(board.score(&b), Some(0));
    }

    #[test]
    fn test_sibling_average_floor() {
        let mut board = AugmentationScoreBoard::new();
        board.insert(
            AugmentationKey::variant(AugmentationKind::Flip, AugmentationParams::Probability { p: 0.2 }),
            4,
        );
        board.insert(
            AugmentationKey::variant(AugmentationKind::Flip, AugmentationParams::Probability { p: 0.3 }),
            6,
        );
        board.insert(key(AugmentationKind::Cutout), 100);
        assert_eq!(board.sibling_average(AugmentationKind::Flip), 5);

        board.insert(key(AugmentationKind::Flip), 1);
        assert_eq!(board.sibling_average(AugmentationKind::Flip), 3);
        assert_eq!(board.sibling_average(AugmentationKind::Rotate), 0);
    }

    #[test]
    fn test_evict_keeps_order() {
        let keys = [
            key(AugmentationKind::Flip),
            key(AugmentationKind::Cutout),
            key(AugmentationKind::Rotate),
        ];
        let mut board = AugmentationScoreBoard::with_keys(keys);
        assert_eq!(board.evict(&keys[1]), Some(0));
        let order: Vec<_> = board.iter().map(|(k, _)| *k).collect();
        assert_eq!(order, vec![keys[0], keys[2]]);
        assert_eq!(board.evict(&keys[1]), None);
    }

    proptest! {
        #[test]
        fn prop_idle_scores_stay_within_interval(
            winners in proptest::collection::vec(0usize..3, 1..200),
            interval in 1usize..20,
        ) {
            let keys = [
                key(AugmentationKind::Flip),
                key(AugmentationKind::Cutout),
                key(AugmentationKind::Rotate),
            ];
            let mut board = AugmentationScoreBoard::with_keys(keys);
            for (i, w) in winners.iter().enumerate() {
                let evict = board.settle(&keys[*w], ctx(AugmentationMode::Unused, 1000 + i, interval, 3));
                if let Some(evicted) = evict {
                    prop_assert_ne!(evicted, keys[*w]);
                    prop_assert_eq!(board.score(&evicted), Some(interval));
                }
                for (_, score) in board.iter() {
                    prop_assert!(*score <= interval);
                }
            }
        }
    }
}
