//! Augmentation identifiers, parameter records and selection modes.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Augmentation Kind
// ============================================================================

/// Base augmentation names understood by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AugmentationKind {
    NoAug,
    Crop,
    Grayscale,
    Cutout,
    CutoutColor,
    Flip,
    Rotate,
    RandConv,
    ColorJitter,
    KorniaJitter,
    Translate,
    CenterCrop,
    TranslateCc,
    InFrameTranslate,
    CropTranslate,
    CenterCropDrac,
}

impl AugmentationKind {
    pub const ALL: [AugmentationKind; 16] = [
        AugmentationKind::NoAug,
        AugmentationKind::Crop,
        AugmentationKind::Grayscale,
        AugmentationKind::Cutout,
        AugmentationKind::CutoutColor,
        AugmentationKind::Flip,
        AugmentationKind::Rotate,
        AugmentationKind::RandConv,
        AugmentationKind::ColorJitter,
        AugmentationKind::KorniaJitter,
        AugmentationKind::Translate,
        AugmentationKind::CenterCrop,
        AugmentationKind::TranslateCc,
        AugmentationKind::InFrameTranslate,
        AugmentationKind::CropTranslate,
        AugmentationKind::CenterCropDrac,
    ];

    /// Name as written in the `-`-delimited configuration string.
    pub fn name(&self) -> &'static str {
        match self {
            AugmentationKind::NoAug => "no_aug",
            AugmentationKind::Crop => "crop",
            AugmentationKind::Grayscale => "grayscale",
            AugmentationKind::Cutout => "cutout",
            AugmentationKind::CutoutColor => "cutout_color",
            AugmentationKind::Flip => "flip",
            AugmentationKind::Rotate => "rotate",
            AugmentationKind::RandConv => "rand_conv",
            AugmentationKind::ColorJitter => "color_jitter",
            AugmentationKind::KorniaJitter => "kornia_jitter",
            AugmentationKind::Translate => "translate",
            AugmentationKind::CenterCrop => "center_crop",
            AugmentationKind::TranslateCc => "translate_cc",
            AugmentationKind::InFrameTranslate => "in_frame_translate",
            AugmentationKind::CropTranslate => "crop_translate",
            AugmentationKind::CenterCropDrac => "center_crop_drac",
        }
    }
}

impl fmt::Display for AugmentationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a name is not a known augmentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl FromStr for AugmentationKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AugmentationKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

// ============================================================================
// Parameter Records
// ============================================================================

/// Parameter record for one augmentation.
///
/// Floats are compared and hashed by bit pattern so records can be part of a
/// map key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum AugmentationParams {
    None,
    Probability { p: f32 },
    Cutout { min_cut: usize, max_cut: usize },
    ColorJitter { bright: f32, contrast: f32, satur: f32, hue: f32 },
    /// Output side length (`crop`, `center_crop`, `crop_translate`, `center_crop_drac`).
    Out { out: usize },
    /// Center-crop side length (`translate_cc`).
    CropSize { crop_sz: usize },
    /// Canvas side length (`translate`, `in_frame_translate`).
    Size { size: usize },
}

impl AugmentationParams {
    /// Uniform jitter strength on all four channels.
    pub fn jitter(strength: f32) -> Self {
        AugmentationParams::ColorJitter {
            bright: strength,
            contrast: strength,
            satur: strength,
            hue: strength,
        }
    }

    fn bits(&self) -> (u8, [u64; 4]) {
        match *self {
            AugmentationParams::None => (0, [0; 4]),
            AugmentationParams::Probability { p } => (1, [p.to_bits() as u64, 0, 0, 0]),
            AugmentationParams::Cutout { min_cut, max_cut } => {
                (2, [min_cut as u64, max_cut as u64, 0, 0])
            }
            AugmentationParams::ColorJitter { bright, contrast, satur, hue } => (
                3,
                [
                    bright.to_bits() as u64,
                    contrast.to_bits() as u64,
                    satur.to_bits() as u64,
                    hue.to_bits() as u64,
                ],
            ),
            AugmentationParams::Out { out } => (4, [out as u64, 0, 0, 0]),
            AugmentationParams::CropSize { crop_sz } => (5, [crop_sz as u64, 0, 0, 0]),
            AugmentationParams::Size { size } => (6, [size as u64, 0, 0, 0]),
        }
    }
}

impl PartialEq for AugmentationParams {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for AugmentationParams {}

impl Hash for AugmentationParams {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

impl fmt::Display for AugmentationParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AugmentationParams::None => f.write_str("{}"),
            AugmentationParams::Probability { p } => write!(f, "p={p}"),
            AugmentationParams::Cutout { min_cut, max_cut } => {
                write!(f, "min_cut={min_cut},max_cut={max_cut}")
            }
            AugmentationParams::ColorJitter { bright, contrast, satur, hue } => {
                write!(f, "bright={bright},contrast={contrast},satur={satur},hue={hue}")
            }
            AugmentationParams::Out { out } => write!(f, "out={out}"),
            AugmentationParams::CropSize { crop_sz } => write!(f, "crop_sz={crop_sz}"),
            AugmentationParams::Size { size } => write!(f, "size={size}"),
        }
    }
}

// ============================================================================
// Augmentation Key
// ============================================================================

/// Identity of an active augmentation.
///
/// Catalog defaults have no variant; grid promotions carry the parameter
/// record they were created with. Displayed as `name` or `name/params`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AugmentationKey {
    pub base: AugmentationKind,
    pub variant: Option<AugmentationParams>,
}

impl AugmentationKey {
    pub fn base(base: AugmentationKind) -> Self {
        Self { base, variant: None }
    }

    pub fn variant(base: AugmentationKind, params: AugmentationParams) -> Self {
        Self {
            base,
            variant: Some(params),
        }
    }

    pub fn is_variant(&self) -> bool {
        self.variant.is_some()
    }
}

impl From<AugmentationKind> for AugmentationKey {
    fn from(kind: AugmentationKind) -> Self {
        AugmentationKey::base(kind)
    }
}

impl fmt::Display for AugmentationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variant {
            None => write!(f, "{}", self.base),
            Some(params) => write!(f, "{}/{}", self.base, params),
        }
    }
}

// ============================================================================
// Selection Mode
// ============================================================================

/// Adaptive selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AugmentationMode {
    /// Score by consecutive non-selections, evict, no promotion.
    Unused,
    /// Like `Unused`, promoting a random grid variant of a random active base.
    Search,
    /// Like `Search`, promoting the mildest untried variant.
    WarmUp,
    /// Like `Unused`, promoting the next variant of the evicted base.
    Tune,
    /// Count wins, periodically evict the global minimum, promote like `Tune`.
    Prune,
    /// Count wins only.
    Select,
}

impl AugmentationMode {
    pub fn name(&self) -> &'static str {
        match self {
            AugmentationMode::Unused => "unused",
            AugmentationMode::Search => "search",
            AugmentationMode::WarmUp => "warm_up",
            AugmentationMode::Tune => "tune",
            AugmentationMode::Prune => "prune",
            AugmentationMode::Select => "select",
        }
    }

    /// Parse a mode string; `none` and the empty string disable adaptive selection.
    /// Unrecognized names fall back to win counting.
    pub fn parse_optional(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => None,
            "unused" => Some(AugmentationMode::Unused),
            "search" => Some(AugmentationMode::Search),
            "warm_up" => Some(AugmentationMode::WarmUp),
            "tune" => Some(AugmentationMode::Tune),
            "prune" => Some(AugmentationMode::Prune),
            _ => Some(AugmentationMode::Select),
        }
    }

    /// Modes that use the mild parameter regime.
    pub fn is_mild(&self) -> bool {
        matches!(
            self,
            AugmentationMode::WarmUp | AugmentationMode::Tune | AugmentationMode::Prune
        )
    }

    /// Modes that replace an evicted augmentation with a grid variant.
    pub fn promotes(&self) -> bool {
        matches!(
            self,
            AugmentationMode::Search
                | AugmentationMode::WarmUp
                | AugmentationMode::Tune
                | AugmentationMode::Prune
        )
    }

    /// Modes that score by consecutive non-selections.
    pub fn counts_idle_steps(&self) -> bool {
        matches!(
            self,
            AugmentationMode::Unused
                | AugmentationMode::Search
                | AugmentationMode::WarmUp
                | AugmentationMode::Tune
        )
    }
}

impl fmt::Display for AugmentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in AugmentationKind::ALL {
            assert_eq!(kind.name().parse::<AugmentationKind>(), Ok(kind));
        }
        assert!("sparkle".parse::<AugmentationKind>().is_err());
    }

    #[test]
    fn test_key_display() {
        let base = AugmentationKey::base(AugmentationKind::Cutout);
        assert_eq!(base.to_string(), "cutout");

        let variant = AugmentationKey::variant(
            AugmentationKind::Cutout,
            AugmentationParams::Cutout { min_cut: 10, max_cut: 20 },
        );
        assert_eq!(variant.to_string(), "cutout/min_cut=10,max_cut=20");
    }

    #[test]
    fn test_keys_distinguish_params() {
        let mut keys = HashSet::new();
        keys.insert(AugmentationKey::base(AugmentationKind::Flip));
        keys.insert(AugmentationKey::variant(
            AugmentationKind::Flip,
            AugmentationParams::Probability { p: 0.2 },
        ));
        keys.insert(AugmentationKey::variant(
            AugmentationKind::Flip,
            AugmentationParams::Probability { p: 0.2 },
        ));
        keys.insert(AugmentationKey::variant(
            AugmentationKind::Flip,
            AugmentationParams::Probability { p: 0.3 },
        ));
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(AugmentationMode::parse_optional("none"), None);
        assert_eq!(AugmentationMode::parse_optional(""), None);
        assert_eq!(AugmentationMode::parse_optional("warm_up"), Some(AugmentationMode::WarmUp));
        assert_eq!(AugmentationMode::parse_optional("PRUNE"), Some(AugmentationMode::Prune));
        assert_eq!(AugmentationMode::parse_optional("greedy"), Some(AugmentationMode::Select));
    }

    #[test]
    fn test_mode_families() {
        assert!(AugmentationMode::Tune.is_mild());
        assert!(!AugmentationMode::Search.is_mild());
        assert!(AugmentationMode::Search.counts_idle_steps());
        assert!(!AugmentationMode::Prune.counts_idle_steps());
        assert!(!AugmentationMode::Select.counts_idle_steps());
        assert!(AugmentationMode::Prune.promotes());
        assert!(!AugmentationMode::Unused.promotes());
        assert!(!AugmentationMode::Select.promotes());
    }
}
