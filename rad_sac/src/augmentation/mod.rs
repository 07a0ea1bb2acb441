//! Data augmentation: catalog, variant grid, scoring and per-step selection.

mod catalog;
mod grid;
mod kind;
mod scoreboard;
mod selector;
pub mod transforms;


pub use catalog::{AugmentationCatalog, AugmentationEntry};
pub use grid::{AugmentationGridIndex, GridDraw};
pub use kind::{AugmentationKey, AugmentationKind, AugmentationMode, AugmentationParams, UnknownKind};
pub use scoreboard::{AugmentationScoreBoard, SettleContext};
pub use selector::{AugmentationSelector, Selection};
pub use transforms::ImageBatch;
