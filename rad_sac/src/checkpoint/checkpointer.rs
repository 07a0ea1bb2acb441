//! Step-keyed module checkpoints.
//!
//! Each module is written to its own file, `{prefix}_{step}.bin`, with
//! burn's full-precision binary recorder. Actor and critic checkpoints are
//! independent; nothing enforces that both exist for a step except
//! [`Checkpointer::latest_step`], which only reports steps where they do.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use thiserror::Error;

pub const ACTOR_PREFIX: &str = "actor";
pub const CRITIC_PREFIX: &str = "critic";
pub const CURL_PREFIX: &str = "curl";

/// Error type for checkpointing operations.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Recorder error: {0}")]
    Recorder(String),

    #[error("No checkpoints found")]
    NoCheckpoints,
}

/// Saves and restores modules under one directory.
#[derive(Debug, Clone)]
pub struct Checkpointer {
    dir: PathBuf,
}

impl Checkpointer {
    /// Create the checkpointer, creating `dir` if it does not exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for `prefix` at `step`.
    pub fn path(&self, prefix: &str, step: usize) -> PathBuf {
        self.dir.join(format!("{prefix}_{step}.bin"))
    }

    pub fn save<B: Backend, M: Module<B>>(
        &self,
        prefix: &str,
        module: &M,
        step: usize,
    ) -> Result<PathBuf, CheckpointError> {
        let path = self.path(prefix, step);
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        module
            .clone()
            .save_file(&path, &recorder)
            .map_err(|e| CheckpointError::Recorder(e.to_string()))?;
        log::debug!("saved {}", path.display());
        Ok(path)
    }

    /// Load `prefix` at `step` into `template`.
    pub fn load<B: Backend, M: Module<B>>(
        &self,
        prefix: &str,
        template: M,
        step: usize,
        device: &B::Device,
    ) -> Result<M, CheckpointError> {
        let path = self.path(prefix, step);
        if !path.exists() {
            return Err(CheckpointError::NoCheckpoints);
        }
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        template
            .load_file(&path, &recorder, device)
            .map_err(|e| CheckpointError::Recorder(e.to_string()))
    }

    /// Steps with a `prefix` checkpoint, ascending.
    pub fn list_steps(&self, prefix: &str) -> Result<Vec<usize>, CheckpointError> {
        let head = format!("{prefix}_");
        let mut steps: Vec<usize> = fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().into_string().ok()?;
                name.strip_prefix(&head)?.strip_suffix(".bin")?.parse().ok()
            })
            .collect();
        steps.sort_unstable();
        Ok(steps)
    }

    /// Highest step for which both actor and critic checkpoints exist.
    pub fn latest_step(&self) -> Result<usize, CheckpointError> {
        let critic_steps = self.list_steps(CRITIC_PREFIX)?;
        self.list_steps(ACTOR_PREFIX)?
            .into_iter()
            .rev()
            .find(|step| critic_steps.binary_search(step).is_ok())
            .ok_or(CheckpointError::NoCheckpoints)
    }
}
