//! Replay storage and the sampling interface consumed by the agent.

mod replay_buffer;

pub use replay_buffer::{ReplayBuffer, ReplayBufferConfig, Transition};

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::augmentation::AugmentationEntry;
use crate::error::Result;

/// One training batch. All tensors share the leading batch dimension.
#[derive(Debug, Clone)]
pub struct TransitionBatch<B: Backend> {
    /// `[batch, channels, height, width]`; flat states are `[batch, dim, 1, 1]`.
    pub obs: Tensor<B, 4>,
    /// `[batch, action_dim]`
    pub action: Tensor<B, 2>,
    /// `[batch, 1]`
    pub reward: Tensor<B, 2>,
    pub next_obs: Tensor<B, 4>,
    /// `[batch, 1]`; zero for terminal transitions.
    pub not_done: Tensor<B, 2>,
}

impl<B: Backend> TransitionBatch<B> {
    /// Assemble a batch.
    ///
    /// # Panics
    /// If the components disagree on batch size, or reward / not_done are not `[batch, 1]`.
    pub fn new(
        obs: Tensor<B, 4>,
        action: Tensor<B, 2>,
        reward: Tensor<B, 2>,
        next_obs: Tensor<B, 4>,
        not_done: Tensor<B, 2>,
    ) -> Self {
        let batch = obs.dims()[0];
        assert_eq!(action.dims()[0], batch, "action batch size differs from obs");
        assert_eq!(next_obs.dims()[0], batch, "next_obs batch size differs from obs");
        assert_eq!(reward.dims(), [batch, 1], "reward must be [batch, 1]");
        assert_eq!(not_done.dims(), [batch, 1], "not_done must be [batch, 1]");
        Self {
            obs,
            action,
            reward,
            next_obs,
            not_done,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.obs.dims()[0]
    }
}

/// A batch together with the buffer indices it was drawn from.
#[derive(Debug, Clone)]
pub struct SampledBatch<B: Backend> {
    pub batch: TransitionBatch<B>,
    pub indices: Vec<usize>,
}

/// Source of augmented training batches.
pub trait AugmentedSampler<B: Backend> {
    /// Sample a batch, applying `augs` in order to `obs` and `next_obs`.
    ///
    /// With `indices`, the same transitions are returned again (only the
    /// augmentation randomness differs); otherwise fresh indices are drawn.
    fn sample_augmented(
        &self,
        augs: &[AugmentationEntry],
        indices: Option<&[usize]>,
        device: &B::Device,
    ) -> Result<SampledBatch<B>>;

    /// Sample a batch without augmentation.
    fn sample_plain(&self, device: &B::Device) -> Result<TransitionBatch<B>> {
        Ok(self.sample_augmented(&[], None, device)?.batch)
    }
}
