//! Network interfaces consumed by the SAC update.
//!
//! The actor maps observations to a squashed Gaussian policy; the critic maps
//! `(obs, action)` to twin Q-values. Online and target critics share one type
//! and are parameterized independently.

use burn::module::Module;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

// ============================================================================
// Actor
// ============================================================================

/// Output of one actor pass.
#[derive(Debug, Clone)]
pub struct ActorOutput<B: Backend> {
    /// Deterministic action `tanh(μ)`, `[batch, action_dim]`.
    pub mean: Tensor<B, 2>,
    /// Reparameterized sample `tanh(μ + σε)`, `[batch, action_dim]`.
    pub sample: Tensor<B, 2>,
    /// Log-probability of `sample`, `[batch, 1]`.
    pub log_prob: Tensor<B, 2>,
    /// Bounded log standard deviation, `[batch, action_dim]`.
    pub log_std: Tensor<B, 2>,
}

pub trait SacActor<B: Backend>: Module<B> + Clone {
    /// Evaluate the policy. With `detach_encoder`, no gradient reaches the
    /// conv layers.
    fn forward(&self, obs: Tensor<B, 4>, detach_encoder: bool) -> ActorOutput<B>;

    fn action_dim(&self) -> usize;
}

// ============================================================================
// Critic
// ============================================================================

/// Twin Q-values, each `[batch, 1]`.
#[derive(Debug, Clone)]
pub struct CriticOutput<B: Backend> {
    pub q1: Tensor<B, 2>,
    pub q2: Tensor<B, 2>,
}

impl<B: Backend> CriticOutput<B> {
    /// Pessimistic estimate `min(Q1, Q2)`.
    pub fn min_q(&self) -> Tensor<B, 2> {
        self.q1.clone().min_pair(self.q2.clone())
    }
}

pub trait SacCritic<B: Backend>: Module<B> + Clone {
    fn forward(&self, obs: Tensor<B, 4>, action: Tensor<B, 2>, detach_encoder: bool) -> CriticOutput<B>;
}
