//! Candidate parameter variants for adaptive augmentation search.
//!
//! Each base augmentation owns an ordered list of untried parameter records.
//! Drawing a record removes it, so every variant is tried at most once per
//! run. A base whose list is empty is exhausted.

use indexmap::IndexMap;
use rand::seq::SliceRandom;
use rand::Rng;

use super::kind::{AugmentationKind, AugmentationMode, AugmentationParams};

/// How a variant is drawn from a base's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridDraw {
    /// The mildest untried variant.
    First,
    /// A uniformly random untried variant.
    Random,
}

/// Per-base lists of untried parameter variants.
#[derive(Debug, Clone, Default)]
pub struct AugmentationGridIndex {
    lists: IndexMap<AugmentationKind, Vec<AugmentationParams>>,
}

impl AugmentationGridIndex {
    /// Build the grid for `mode`, keeping only the configured bases.
    ///
    /// Modes without a sweep (`unused`, `select`, none) get an empty grid.
    pub fn for_mode(
        mode: Option<AugmentationMode>,
        image_size: usize,
        configured: &[AugmentationKind],
    ) -> Self {
        let full = match mode {
            Some(AugmentationMode::Search) => search_grid(),
            Some(m) if m.is_mild() => intensity_grid(image_size),
            _ => IndexMap::new(),
        };
        let mut lists = IndexMap::new();
        for kind in configured {
            if let Some(list) = full.get(kind) {
                lists.insert(*kind, list.clone());
            }
        }
        Self { lists }
    }

    /// Grid from explicit lists.
    pub fn from_lists(lists: impl IntoIterator<Item = (AugmentationKind, Vec<AugmentationParams>)>) -> Self {
        Self {
            lists: lists.into_iter().collect(),
        }
    }

    pub fn is_exhausted(&self, kind: AugmentationKind) -> bool {
        self.lists.get(&kind).map_or(true, |list| list.is_empty())
    }

    /// Untried variants for `kind`, mildest first.
    pub fn remaining(&self, kind: AugmentationKind) -> &[AugmentationParams] {
        self.lists.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bases that still have untried variants, in insertion order.
    pub fn available(&self) -> Vec<AugmentationKind> {
        self.lists
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Remove and return a variant of `kind`; `None` when exhausted.
    pub fn draw<R: Rng>(&mut self, kind: AugmentationKind, how: GridDraw, rng: &mut R) -> Option<AugmentationParams> {
        let list = self.lists.get_mut(&kind)?;
        if list.is_empty() {
            return None;
        }
        let index = match how {
            GridDraw::First => 0,
            GridDraw::Random => rng.gen_range(0..list.len()),
        };
        Some(list.remove(index))
    }

    /// Pick a random non-exhausted base.
    pub fn random_available<R: Rng>(&self, rng: &mut R) -> Option<AugmentationKind> {
        self.available().choose(rng).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.values().all(|list| list.is_empty())
    }
}

fn search_grid() -> IndexMap<AugmentationKind, Vec<AugmentationParams>> {
    use AugmentationKind as K;
    use AugmentationParams as P;

    let cutouts = vec![
        P::Cutout { min_cut: 0, max_cut: 20 },
        P::Cutout { min_cut: 20, max_cut: 40 },
        P::Cutout { min_cut: 30, max_cut: 50 },
        P::Cutout { min_cut: 40, max_cut: 60 },
    ];
    let jitters = vec![
        P::ColorJitter { bright: 0.2, contrast: 0.2, satur: 0.2, hue: 0.3 },
        P::ColorJitter { bright: 0.1, contrast: 0.1, satur: 0.1, hue: 0.2 },
        P::ColorJitter { bright: 0.5, contrast: 0.5, satur: 0.5, hue: 0.6 },
        P::ColorJitter { bright: 0.6, contrast: 0.6, satur: 0.6, hue: 0.7 },
    ];
    let sizes = [104, 80, 90, 75];

    IndexMap::from([
        (K::Cutout, cutouts.clone()),
        (K::CutoutColor, cutouts),
        (K::ColorJitter, jitters.clone()),
        (K::CenterCrop, sizes.iter().map(|&out| P::Out { out }).collect()),
        (K::TranslateCc, sizes.iter().map(|&crop_sz| P::CropSize { crop_sz }).collect()),
        (K::KorniaJitter, jitters),
    ])
}

fn intensity_grid(image_size: usize) -> IndexMap<AugmentationKind, Vec<AugmentationParams>> {
    use AugmentationKind as K;
    use AugmentationParams as P;

    let steps = 2..=10usize;
    let probabilities: Vec<_> = steps
        .clone()
        .map(|i| P::Probability { p: i as f32 / 10.0 })
        .collect();
    let cutouts: Vec<_> = (1..=10usize)
        .map(|i| P::Cutout { min_cut: 10 * i, max_cut: 10 * i + 10 })
        .collect();
    let jitters: Vec<_> = steps.clone().map(|i| P::jitter(i as f32 / 10.0)).collect();
    let shrink = |i: usize| image_size.saturating_sub(2 * i);

    IndexMap::from([
        (K::Flip, probabilities.clone()),
        (K::Grayscale, probabilities.clone()),
        (K::Rotate, probabilities),
        (K::Cutout, cutouts.clone()),
        (K::CutoutColor, cutouts),
        (K::ColorJitter, jitters.clone()),
        (K::CenterCrop, steps.clone().map(|i| P::Out { out: shrink(i) }).collect()),
        (K::TranslateCc, steps.clone().map(|i| P::CropSize { crop_sz: shrink(i) }).collect()),
        (K::KorniaJitter, jitters),
        (K::InFrameTranslate, steps.clone().map(|i| P::Size { size: image_size + 2 * i }).collect()),
        (K::CropTranslate, steps.clone().map(|i| P::Out { out: shrink(i) }).collect()),
        (K::CenterCropDrac, steps.map(|i| P::Out { out: image_size + 2 * i }).collect()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn intensity(params: &AugmentationParams) -> f32 {
        match *params {
            AugmentationParams::Probability { p } => p,
            AugmentationParams::Cutout { min_cut, .. } => min_cut as f32,
            AugmentationParams::ColorJitter { bright, .. } => bright,
            AugmentationParams::Out { out } => -(out as f32),
            AugmentationParams::CropSize { crop_sz } => -(crop_sz as f32),
            AugmentationParams::Size { size } => size as f32,
            AugmentationParams::None => 0.0,
        }
    }

    #[test]
    fn test_only_configured_bases() {
        let grid = AugmentationGridIndex::for_mode(
            Some(AugmentationMode::WarmUp),
            84,
            &[AugmentationKind::Flip, AugmentationKind::NoAug],
        );
        assert_eq!(grid.available(), vec![AugmentationKind::Flip]);
        assert!(grid.is_exhausted(AugmentationKind::NoAug));
        assert!(grid.is_exhausted(AugmentationKind::Cutout));
    }

    #[test]
    fn test_warm_up_draws_mildest_first() {
        let mut rng = StdRng::seed_from_u64(0);
        let configured = [
            AugmentationKind::Flip,
            AugmentationKind::Cutout,
            AugmentationKind::CenterCrop,
            AugmentationKind::InFrameTranslate,
        ];
        let mut grid = AugmentationGridIndex::for_mode(Some(AugmentationMode::WarmUp), 84, &configured);

        for kind in configured {
            let mut previous = f32::NEG_INFINITY;
            let mut drawn = 0;
            while let Some(params) = grid.draw(kind, GridDraw::First, &mut rng) {
                let value = intensity(&params);
                assert!(value >= previous, "{kind}: {params} is milder than its predecessor");
                previous = value;
                drawn += 1;
            }
            assert!(drawn >= 9);
            assert!(grid.is_exhausted(kind));
        }
        assert!(grid.is_empty());
    }

    #[test]
    fn test_first_draw_values() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut grid = AugmentationGridIndex::for_mode(
            Some(AugmentationMode::Tune),
            84,
            &[AugmentationKind::Flip, AugmentationKind::Cutout, AugmentationKind::CenterCrop],
        );
        assert_eq!(
            grid.draw(AugmentationKind::Flip, GridDraw::First, &mut rng),
            Some(AugmentationParams::Probability { p: 0.2 })
        );
        assert_eq!(
            grid.draw(AugmentationKind::Cutout, GridDraw::First, &mut rng),
            Some(AugmentationParams::Cutout { min_cut: 10, max_cut: 20 })
        );
        assert_eq!(
            grid.draw(AugmentationKind::CenterCrop, GridDraw::First, &mut rng),
            Some(AugmentationParams::Out { out: 80 })
        );
    }

    #[test]
    fn test_random_draw_never_repeats() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut grid = AugmentationGridIndex::for_mode(
            Some(AugmentationMode::Search),
            84,
            &[AugmentationKind::CenterCrop],
        );
        let mut seen = Vec::new();
        while let Some(params) = grid.draw(AugmentationKind::CenterCrop, GridDraw::Random, &mut rng) {
            assert!(!seen.contains(&params));
            seen.push(params);
        }
        assert_eq!(seen.len(), 4);
        assert_eq!(grid.draw(AugmentationKind::CenterCrop, GridDraw::Random, &mut rng), None);
    }

    #[test]
    fn test_search_grid_has_no_flip() {
        let grid = AugmentationGridIndex::for_mode(
            Some(AugmentationMode::Search),
            84,
            &[AugmentationKind::Flip, AugmentationKind::Cutout],
        );
        assert_eq!(grid.available(), vec![AugmentationKind::Cutout]);
    }

    #[test]
    fn test_modes_without_sweep() {
        for mode in [None, Some(AugmentationMode::Unused), Some(AugmentationMode::Select)] {
            let grid = AugmentationGridIndex::for_mode(mode, 84, &[AugmentationKind::Flip]);
            assert!(grid.is_empty());
        }
    }
}
