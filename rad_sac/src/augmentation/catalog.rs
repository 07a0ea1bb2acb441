//! Registry of augmentations and their default parameters.

use indexmap::IndexMap;
use rand::Rng;

use super::kind::{AugmentationKey, AugmentationKind, AugmentationMode, AugmentationParams};
use super::transforms::{self, ImageBatch};
use crate::error::{AgentError, Result};

/// An augmentation ready to be applied: its key plus the parameters to use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AugmentationEntry {
    pub key: AugmentationKey,
    pub params: AugmentationParams,
}

impl AugmentationEntry {
    pub fn new(key: AugmentationKey, params: AugmentationParams) -> Self {
        Self { key, params }
    }

    /// Entry for a promoted grid variant; the key records the parameters.
    pub fn variant(base: AugmentationKind, params: AugmentationParams) -> Self {
        Self {
            key: AugmentationKey::variant(base, params),
            params,
        }
    }

    /// The identity augmentation.
    pub fn identity() -> Self {
        Self::new(AugmentationKey::base(AugmentationKind::NoAug), AugmentationParams::None)
    }

    pub fn kind(&self) -> AugmentationKind {
        self.key.base
    }

    pub fn apply<R: Rng>(&self, batch: ImageBatch, rng: &mut R) -> ImageBatch {
        transforms::apply(self.key.base, &self.params, batch, rng)
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Fixed mapping from augmentation kind to its default parameters.
///
/// The mild regime (`warm_up`, `tune`, `prune`) starts every augmentation
/// close to identity so the grid can raise intensity gradually; every other
/// mode, including no mode at all, uses the full-strength regime.
#[derive(Debug, Clone)]
pub struct AugmentationCatalog {
    mode: Option<AugmentationMode>,
    defaults: IndexMap<AugmentationKind, AugmentationParams>,
}

impl AugmentationCatalog {
    /// Build the catalog for a mode. `image_size` is the encoder input side.
    pub fn for_mode(mode: Option<AugmentationMode>, image_size: usize) -> Self {
        use AugmentationKind as K;
        use AugmentationParams as P;

        let mild = mode.map(|m| m.is_mild()).unwrap_or(false);
        let defaults: IndexMap<AugmentationKind, AugmentationParams> = if mild {
            IndexMap::from([
                (K::Grayscale, P::Probability { p: 0.1 }),
                (K::Cutout, P::Cutout { min_cut: 0, max_cut: 10 }),
                (K::CutoutColor, P::Cutout { min_cut: 0, max_cut: 10 }),
                (K::Flip, P::Probability { p: 0.1 }),
                (K::Rotate, P::Probability { p: 0.1 }),
                (K::RandConv, P::None),
                (K::ColorJitter, P::jitter(0.1)),
                (K::CenterCrop, P::Out { out: image_size.saturating_sub(2) }),
                (K::TranslateCc, P::CropSize { crop_sz: image_size.saturating_sub(2) }),
                (K::KorniaJitter, P::jitter(0.1)),
                (K::InFrameTranslate, P::Size { size: image_size + 2 }),
                (K::CropTranslate, P::Out { out: image_size.saturating_sub(2) }),
                (K::CenterCropDrac, P::Out { out: 110 }),
                (K::NoAug, P::None),
            ])
        } else {
            IndexMap::from([
                (K::Crop, P::Out { out: 84 }),
                (K::Grayscale, P::Probability { p: 0.3 }),
                (K::Cutout, P::Cutout { min_cut: 10, max_cut: 30 }),
                (K::CutoutColor, P::Cutout { min_cut: 10, max_cut: 30 }),
                (K::Flip, P::Probability { p: 0.2 }),
                (K::Rotate, P::Probability { p: 0.3 }),
                (K::RandConv, P::None),
                (
                    K::ColorJitter,
                    P::ColorJitter { bright: 0.4, contrast: 0.4, satur: 0.4, hue: 0.5 },
                ),
                (K::Translate, P::Size { size: 108 }),
                (K::CenterCrop, P::Out { out: 96 }),
                (K::TranslateCc, P::CropSize { crop_sz: 92 }),
                (
                    K::KorniaJitter,
                    P::ColorJitter { bright: 0.4, contrast: 0.4, satur: 0.4, hue: 0.5 },
                ),
                (K::InFrameTranslate, P::Size { size: 128 }),
                (K::CropTranslate, P::Out { out: 100 }),
                (K::NoAug, P::None),
                (K::CenterCropDrac, P::Out { out: 116 }),
            ])
        };

        Self { mode, defaults }
    }

    pub fn mode(&self) -> Option<AugmentationMode> {
        self.mode
    }

    pub fn contains(&self, kind: AugmentationKind) -> bool {
        self.defaults.contains_key(&kind)
    }

    /// Default-parameter entry for `kind`, if the catalog carries it.
    pub fn entry(&self, kind: AugmentationKind) -> Option<AugmentationEntry> {
        self.defaults
            .get(&kind)
            .map(|params| AugmentationEntry::new(AugmentationKey::base(kind), *params))
    }

    /// Resolve configured names into entries, in configuration order.
    ///
    /// Fails on the first name that is unknown or absent from this regime.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<IndexMap<AugmentationKey, AugmentationEntry>> {
        let mut resolved = IndexMap::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let entry = name
                .parse::<AugmentationKind>()
                .ok()
                .and_then(|kind| self.entry(kind))
                .ok_or_else(|| AgentError::UnknownAugmentation {
                    name: name.to_string(),
                    mode: self.mode,
                })?;
            resolved.insert(entry.key, entry);
        }
        Ok(resolved)
    }

    pub fn len(&self) -> usize {
        self.defaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regimes() {
        let full = AugmentationCatalog::for_mode(None, 84);
        assert_eq!(full.len(), 16);
        assert_eq!(
            full.entry(AugmentationKind::Crop).map(|e| e.params),
            Some(AugmentationParams::Out { out: 84 })
        );

        let mild = AugmentationCatalog::for_mode(Some(AugmentationMode::Prune), 84);
        assert_eq!(mild.len(), 14);
        assert!(!mild.contains(AugmentationKind::Crop));
        assert!(!mild.contains(AugmentationKind::Translate));
        assert_eq!(
            mild.entry(AugmentationKind::CenterCrop).map(|e| e.params),
            Some(AugmentationParams::Out { out: 82 })
        );
        assert_eq!(
            mild.entry(AugmentationKind::InFrameTranslate).map(|e| e.params),
            Some(AugmentationParams::Size { size: 86 })
        );
    }

    #[test]
    fn test_search_uses_full_strength() {
        let catalog = AugmentationCatalog::for_mode(Some(AugmentationMode::Search), 84);
        assert_eq!(
            catalog.entry(AugmentationKind::Flip).map(|e| e.params),
            Some(AugmentationParams::Probability { p: 0.2 })
        );
    }

    #[test]
    fn test_resolve_keeps_order() {
        let catalog = AugmentationCatalog::for_mode(None, 84);
        let resolved = catalog.resolve(&["flip", "crop", "cutout"]).unwrap();
        let names: Vec<String> = resolved.keys().map(|k| k.to_string()).collect();
        assert_eq!(names, vec!["flip", "crop", "cutout"]);
    }

    #[test]
    fn test_resolve_rejects_missing_name() {
        let catalog = AugmentationCatalog::for_mode(Some(AugmentationMode::Tune), 84);
        match catalog.resolve(&["flip", "crop"]) {
            Err(AgentError::UnknownAugmentation { name, mode }) => {
                assert_eq!(name, "crop");
                assert_eq!(mode, Some(AugmentationMode::Tune));
            }
            other => panic!("expected UnknownAugmentation, got {other:?}"),
        }
        assert!(catalog.resolve(&["nope"]).is_err());
    }
}
