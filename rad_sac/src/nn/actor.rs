//! Squashed Gaussian policy over encoded observations.

use std::f32::consts::PI;

use burn::module::Module;
use burn::prelude::*;
use burn::tensor::activation::{relu, tanh};
use burn::tensor::Distribution;

use super::encoder::{Encoder, EncoderConfig};
use super::orthogonal::{OrthogonalLinear, OrthogonalLinearConfig};
use crate::config::RadSacConfig;
use crate::sac::{ActorOutput, SacActor};

#[derive(Debug, Clone)]
pub struct PixelActorConfig {
    pub encoder: EncoderConfig,
    pub hidden_dim: usize,
    pub action_dim: usize,
    pub log_std_min: f32,
    pub log_std_max: f32,
}

impl PixelActorConfig {
    pub fn from_agent_config(config: &RadSacConfig, obs_shape: [usize; 3], action_dim: usize) -> Self {
        Self {
            encoder: EncoderConfig::from_agent_config(config, obs_shape),
            hidden_dim: config.hidden_dim,
            action_dim,
            log_std_min: config.actor_log_std_min,
            log_std_max: config.actor_log_std_max,
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> PixelActor<B> {
        let feature_dim = self.encoder.feature_dim;
        PixelActor {
            encoder: self.encoder.init(device),
            fc1: OrthogonalLinearConfig::new(feature_dim, self.hidden_dim).init(device),
            fc2: OrthogonalLinearConfig::new(self.hidden_dim, self.hidden_dim).init(device),
            head: OrthogonalLinearConfig::new(self.hidden_dim, 2 * self.action_dim).init(device),
            action_dim: self.action_dim,
            log_std_min: self.log_std_min,
            log_std_max: self.log_std_max,
        }
    }
}

/// Actor network: encoder, two hidden layers, then mean and log-std heads.
#[derive(Module, Debug)]
pub struct PixelActor<B: Backend> {
    pub encoder: Encoder<B>,
    fc1: OrthogonalLinear<B>,
    fc2: OrthogonalLinear<B>,
    head: OrthogonalLinear<B>,
    action_dim: usize,
    #[module(skip)]
    log_std_min: f32,
    #[module(skip)]
    log_std_max: f32,
}

impl<B: Backend> PixelActor<B> {
    /// Mirror the conv layers of `encoder` (the critic's).
    pub fn with_tied_encoder(mut self, encoder: &Encoder<B>) -> Self {
        self.encoder = self.encoder.tie_convs_from(encoder);
        self
    }

    /// Mean and bounded log-std, both `[batch, action_dim]`.
    fn distribution(&self, obs: Tensor<B, 4>, detach_encoder: bool) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let features = self.encoder.forward(obs, detach_encoder);
        let h = relu(self.fc1.forward(features));
        let h = relu(self.fc2.forward(h));
        let out = self.head.forward(h);
        let [batch, _] = out.dims();
        let a = self.action_dim;

        let mean = out.clone().slice([0..batch, 0..a]);
        let raw_log_std = out.slice([0..batch, a..2 * a]);
        let log_std = (tanh(raw_log_std).add_scalar(1.0))
            .mul_scalar(0.5 * (self.log_std_max - self.log_std_min))
            .add_scalar(self.log_std_min);
        (mean, log_std)
    }
}

impl<B: Backend> SacActor<B> for PixelActor<B> {
    fn forward(&self, obs: Tensor<B, 4>, detach_encoder: bool) -> ActorOutput<B> {
        let (mean, log_std) = self.distribution(obs, detach_encoder);
        let noise = Tensor::random(mean.dims(), Distribution::Normal(0.0, 1.0), &mean.device());
        let sample = mean.clone() + noise.clone() * log_std.clone().exp();
        let log_prob = gaussian_log_prob(noise, log_std.clone());
        let (mean, sample, log_prob) = squash(mean, sample, log_prob);

        ActorOutput {
            mean,
            sample,
            log_prob,
            log_std,
        }
    }

    fn action_dim(&self) -> usize {
        self.action_dim
    }
}

/// Log-density of a diagonal Gaussian at `mean + noise * exp(log_std)`.
///
/// Returns `[batch, 1]`.
pub fn gaussian_log_prob<B: Backend>(noise: Tensor<B, 2>, log_std: Tensor<B, 2>) -> Tensor<B, 2> {
    let [_, dim] = noise.dims();
    let residual = (noise.powf_scalar(2.0).mul_scalar(-0.5) - log_std).sum_dim(1);
    residual.sub_scalar(0.5 * (2.0 * PI).ln() * dim as f32)
}

/// Apply tanh to mean and sample, correcting the log-prob for the squash.
pub fn squash<B: Backend>(
    mean: Tensor<B, 2>,
    sample: Tensor<B, 2>,
    log_prob: Tensor<B, 2>,
) -> (Tensor<B, 2>, Tensor<B, 2>, Tensor<B, 2>) {
    let mean = tanh(mean);
    let sample = tanh(sample);
    let correction = relu(sample.clone().powf_scalar(2.0).neg().add_scalar(1.0))
        .add_scalar(1e-6)
        .log()
        .sum_dim(1);
    (mean, sample, log_prob - correction)
}
