//! Error types for the agent.

use thiserror::Error;

use crate::augmentation::AugmentationMode;
use crate::checkpoint::CheckpointError;

/// Errors raised by the agent and its collaborators.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Invalid hyperparameter or configuration combination.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An augmentation name in the `-`-delimited list is not in the catalog.
    #[error("unknown augmentation '{name}' for mode {mode:?}")]
    UnknownAugmentation {
        name: String,
        mode: Option<AugmentationMode>,
    },

    /// The replay buffer cannot serve a batch of the requested size.
    #[error("replay buffer holds {available} transitions, batch needs {requested}")]
    InsufficientSamples { requested: usize, available: usize },

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AgentError>;

impl AgentError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        AgentError::Configuration(msg.into())
    }
}
