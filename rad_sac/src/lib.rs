//! # RAD-SAC: Soft Actor-Critic with Adaptive Augmentation Selection
//!
//! Learning core for image-based continuous control. Every training step
//! scores each active data augmentation by the critic loss it produces on the
//! same sampled transitions, trains the critic on the highest-loss batch, and
//! periodically evicts weak augmentations in favor of stronger parameter
//! variants.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        RadSacAgent::update                    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ReplayBuffer ──► AugmentationSelector ──► CriticLossEvaluator │
//! │  (AugmentedSampler)   │  catalog / grid / scoreboard          │
//! │                       ▼                                       │
//! │              chosen batch ──► critic step ──► actor + α step  │
//! │                                         └──► target update    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rad_sac::{AugmentationMode, NullLogger, RadSacAgent, RadSacConfig, ReplayBuffer, ReplayBufferConfig};
//!
//! let config = RadSacConfig::new()
//!     .with_data_augs("cutout-flip-grayscale")
//!     .with_mode(AugmentationMode::Prune, 2000);
//! let mut agent: RadSacAgent<B> = RadSacAgent::new(config, [9, 84, 84], 6, &device)?;
//! let buffer = ReplayBuffer::new(ReplayBufferConfig::from_agent_config(agent.config(), 100_000, [9, 84, 84], 6));
//!
//! for step in 1..=num_steps {
//!     // collect transitions into `buffer` ...
//!     let info = agent.update(&buffer, &mut NullLogger, step)?;
//! }
//! ```

pub mod augmentation;
pub mod buffer;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod metrics;
pub mod nn;
pub mod sac;
pub mod target_network;

pub use augmentation::{
    AugmentationCatalog, AugmentationEntry, AugmentationGridIndex, AugmentationKey,
    AugmentationKind, AugmentationMode, AugmentationParams, AugmentationScoreBoard,
    AugmentationSelector, Selection,
};
pub use buffer::{AugmentedSampler, ReplayBuffer, ReplayBufferConfig, SampledBatch, Transition, TransitionBatch};
pub use checkpoint::{CheckpointError, Checkpointer};
pub use config::{EncoderType, RadSacConfig};
pub use error::{AgentError, Result};
pub use metrics::{ConsoleLogger, CsvLogger, MultiLogger, NullLogger, TrainingLogger};
pub use sac::{CriticLoss, CriticLossEvaluator, RadSacAgent, UpdateInfo};
pub use target_network::soft_update;
