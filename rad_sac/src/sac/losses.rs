//! SAC loss terms over `[batch, 1]` columns.

use std::f32::consts::PI;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// TD targets `y = r + not_done * γ * (min_Q' - α * log π')`.
///
/// Returned detached: no gradient flows into the bootstrap.
pub fn sac_td_targets<B: Backend>(
    reward: Tensor<B, 2>,
    not_done: Tensor<B, 2>,
    min_q_next: Tensor<B, 2>,
    next_log_prob: Tensor<B, 2>,
    discount: f32,
    alpha: f32,
) -> Tensor<B, 2> {
    let v_next = min_q_next - next_log_prob.mul_scalar(alpha);
    (reward + not_done.mul_scalar(discount) * v_next).detach()
}

/// Per-head MSE against the targets: `(q1_loss, q2_loss)`.
pub fn sac_critic_loss<B: Backend>(
    q1: Tensor<B, 2>,
    q2: Tensor<B, 2>,
    targets: Tensor<B, 2>,
) -> (Tensor<B, 1>, Tensor<B, 1>) {
    let q1_loss = (q1 - targets.clone()).powf_scalar(2.0).mean();
    let q2_loss = (q2 - targets).powf_scalar(2.0).mean();
    (q1_loss, q2_loss)
}

/// Actor loss `mean(α * log π - min_Q)`.
pub fn sac_actor_loss<B: Backend>(min_q: Tensor<B, 2>, log_prob: Tensor<B, 2>, alpha: f32) -> Tensor<B, 1> {
    (log_prob.mul_scalar(alpha) - min_q).mean()
}

/// Mean differential entropy of a diagonal Gaussian with the given log-std.
pub fn gaussian_entropy<B: Backend>(log_std: Tensor<B, 2>) -> Tensor<B, 1> {
    let [_, dim] = log_std.dims();
    let constant = 0.5 * dim as f32 * (1.0 + (2.0 * PI).ln());
    log_std.sum_dim(1).add_scalar(constant).mean()
}

/// Target entropy for a continuous action space: `-|A|`.
pub fn target_entropy_continuous(action_dim: usize) -> f32 {
    -(action_dim as f32)
}
