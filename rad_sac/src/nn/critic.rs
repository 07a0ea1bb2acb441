//! Twin Q-functions over encoded observations.

use burn::module::Module;
use burn::prelude::*;
use burn::tensor::activation::relu;

use super::encoder::{Encoder, EncoderConfig};
use super::orthogonal::{OrthogonalLinear, OrthogonalLinearConfig};
use crate::config::RadSacConfig;
use crate::sac::{CriticOutput, SacCritic};
use crate::target_network::soft_update;

/// `Q(features, action) -> [batch, 1]`
#[derive(Module, Debug)]
pub struct QFunction<B: Backend> {
    fc1: OrthogonalLinear<B>,
    fc2: OrthogonalLinear<B>,
    fc3: OrthogonalLinear<B>,
}

impl<B: Backend> QFunction<B> {
    pub fn new(feature_dim: usize, action_dim: usize, hidden_dim: usize, device: &B::Device) -> Self {
        Self {
            fc1: OrthogonalLinearConfig::new(feature_dim + action_dim, hidden_dim).init(device),
            fc2: OrthogonalLinearConfig::new(hidden_dim, hidden_dim).init(device),
            fc3: OrthogonalLinearConfig::new(hidden_dim, 1).init(device),
        }
    }

    pub fn forward(&self, features: Tensor<B, 2>, action: Tensor<B, 2>) -> Tensor<B, 2> {
        let h = Tensor::cat(vec![features, action], 1);
        let h = relu(self.fc1.forward(h));
        let h = relu(self.fc2.forward(h));
        self.fc3.forward(h)
    }
}

#[derive(Debug, Clone)]
pub struct PixelCriticConfig {
    pub encoder: EncoderConfig,
    pub hidden_dim: usize,
    pub action_dim: usize,
}

impl PixelCriticConfig {
    pub fn from_agent_config(config: &RadSacConfig, obs_shape: [usize; 3], action_dim: usize) -> Self {
        Self {
            encoder: EncoderConfig::from_agent_config(config, obs_shape),
            hidden_dim: config.hidden_dim,
            action_dim,
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> PixelCritic<B> {
        let feature_dim = self.encoder.feature_dim;
        PixelCritic {
            encoder: self.encoder.init(device),
            q1: QFunction::new(feature_dim, self.action_dim, self.hidden_dim, device),
            q2: QFunction::new(feature_dim, self.action_dim, self.hidden_dim, device),
        }
    }
}

/// Critic: one encoder shared by both Q-functions.
#[derive(Module, Debug)]
pub struct PixelCritic<B: Backend> {
    pub encoder: Encoder<B>,
    pub q1: QFunction<B>,
    pub q2: QFunction<B>,
}

impl<B: Backend> PixelCritic<B> {
    /// Move `self` (a target copy) toward `online`.
    ///
    /// Q-functions use `critic_tau`, the encoder uses `encoder_tau`.
    pub fn soft_update_from(self, online: &Self, critic_tau: f32, encoder_tau: f32) -> Self {
        Self {
            q1: soft_update(&online.q1, self.q1, critic_tau),
            q2: soft_update(&online.q2, self.q2, critic_tau),
            encoder: soft_update(&online.encoder, self.encoder, encoder_tau),
        }
    }
}

impl<B: Backend> SacCritic<B> for PixelCritic<B> {
    fn forward(&self, obs: Tensor<B, 4>, action: Tensor<B, 2>, detach_encoder: bool) -> CriticOutput<B> {
        let features = self.encoder.forward(obs, detach_encoder);
        CriticOutput {
            q1: self.q1.forward(features.clone(), action.clone()),
            q2: self.q2.forward(features, action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncoderType;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray<f32>;

    fn critic_config() -> PixelCriticConfig {
        let config = RadSacConfig::state_based()
            .with_hidden_dim(16)
            .with_encoder_feature_dim(8)
            .with_encoder_type(EncoderType::Identity);
        PixelCriticConfig::from_agent_config(&config, [4, 1, 1], 2)
    }

    #[test]
    fn test_twin_q_shapes() {
        let device = Default::default();
        let critic: PixelCritic<TestBackend> = critic_config().init(&device);
        let obs = Tensor::random([3, 4, 1, 1], Distribution::Normal(0.0, 1.0), &device);
        let action = Tensor::random([3, 2], Distribution::Uniform(-1.0, 1.0), &device);
        let out = critic.forward(obs, action, false);
        assert_eq!(out.q1.dims(), [3, 1]);
        assert_eq!(out.q2.dims(), [3, 1]);
        assert_eq!(out.min_q().dims(), [3, 1]);
    }

    #[test]
    fn test_soft_update_uses_separate_taus() {
        let device = Default::default();
        let online: PixelCritic<TestBackend> = critic_config().init(&device);
        let target: PixelCritic<TestBackend> = critic_config().init(&device);
        let target_q1 = target.q1.fc1.weight.val().into_data();

        // Encoder copied fully, Q-functions untouched
        let updated = target.soft_update_from(&online, 0.0, 1.0);
        updated.q1.fc1.weight.val().into_data().assert_eq(&target_q1, true);

        let ones_input = || Tensor::<TestBackend, 4>::ones([1, 4, 1, 1], &device);
        let expected = online.encoder.forward(ones_input(), false).into_data().to_vec::<f32>().unwrap();
        let actual = updated.encoder.forward(ones_input(), false).into_data().to_vec::<f32>().unwrap();
        for (e, a) in expected.iter().zip(actual) {
            assert!((e - a).abs() < 1e-5);
        }
    }
}
