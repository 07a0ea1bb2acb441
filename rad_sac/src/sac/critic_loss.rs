//! Critic regression loss.
//!
//! Used both to optimize the critic and to score candidate augmentations:
//! the selector evaluates every active augmentation through the same
//! [`CriticLossEvaluator`] and keeps the batch with the highest loss.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};

use super::losses::{sac_critic_loss, sac_td_targets};
use super::traits::{SacActor, SacCritic};
use crate::buffer::TransitionBatch;

/// Critic loss with its diagnostics.
#[derive(Debug, Clone)]
pub struct CriticLoss<B: Backend> {
    /// `mse(Q1, y) + mse(Q2, y)`, still attached to the autodiff graph.
    pub loss: Tensor<B, 1>,
    /// Scalar value of `loss`.
    pub value: f32,
    pub q1_loss: f32,
    pub q2_loss: f32,
    pub mean_target_q: f32,
    pub mean_q1: f32,
    pub mean_q2: f32,
}

/// Computes the SAC critic loss of a transition batch.
#[derive(Debug, Clone, Copy)]
pub struct CriticLossEvaluator {
    pub discount: f32,
    /// Stop critic gradients at the encoder's conv output.
    pub detach_encoder: bool,
}

impl CriticLossEvaluator {
    pub fn new(discount: f32, detach_encoder: bool) -> Self {
        Self {
            discount,
            detach_encoder,
        }
    }

    /// Evaluate the loss of `batch`.
    ///
    /// The next action and its log-probability come from `actor` at
    /// `next_obs`; the bootstrap uses `target`; the current estimates come
    /// from `critic`. `alpha` enters as a constant.
    pub fn evaluate<B, A, C>(
        &self,
        actor: &A,
        critic: &C,
        target: &C,
        alpha: f32,
        batch: &TransitionBatch<B>,
    ) -> CriticLoss<B>
    where
        B: Backend,
        A: SacActor<B>,
        C: SacCritic<B>,
    {
        let next = actor.forward(batch.next_obs.clone(), false);
        let target_q = target.forward(batch.next_obs.clone(), next.sample.detach(), false);
        let targets = sac_td_targets(
            batch.reward.clone(),
            batch.not_done.clone(),
            target_q.min_q().detach(),
            next.log_prob.detach(),
            self.discount,
            alpha,
        );

        let current = critic.forward(batch.obs.clone(), batch.action.clone(), self.detach_encoder);
        let (q1_loss, q2_loss) = sac_critic_loss(current.q1.clone(), current.q2.clone(), targets.clone());
        let loss = q1_loss.clone() + q2_loss.clone();

        CriticLoss {
            value: scalar(loss.clone()),
            q1_loss: scalar(q1_loss),
            q2_loss: scalar(q2_loss),
            mean_target_q: scalar(targets.mean()),
            mean_q1: scalar(current.q1.detach().mean()),
            mean_q2: scalar(current.q2.detach().mean()),
            loss,
        }
    }
}

pub(crate) fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> f32 {
    tensor.into_scalar().elem::<f32>()
}
