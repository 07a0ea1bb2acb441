//! Observation encoders shared by the actor and the critic.
//!
//! Pixel mode: `num_layers` 3x3 convolutions (first stride 2), flatten,
//! linear projection, LayerNorm, tanh. Identity mode: flat state vectors
//! stored as `[dim, 1, 1]` go straight to the projection.

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{LayerNorm, LayerNormConfig};
use burn::prelude::*;
use burn::tensor::activation::{relu, tanh};

use super::orthogonal::{OrthogonalLinear, OrthogonalLinearConfig};
use crate::config::{EncoderType, RadSacConfig};

/// Encoder hyperparameters.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// `[channels, height, width]`
    pub obs_shape: [usize; 3],
    pub feature_dim: usize,
    pub num_layers: usize,
    pub num_filters: usize,
    pub encoder_type: EncoderType,
}

impl EncoderConfig {
    pub fn from_agent_config(config: &RadSacConfig, obs_shape: [usize; 3]) -> Self {
        Self {
            obs_shape,
            feature_dim: config.encoder_feature_dim,
            num_layers: config.num_layers,
            num_filters: config.num_filters,
            encoder_type: config.encoder_type,
        }
    }

    /// Flattened size of the conv stack output (or of the raw state).
    pub fn flat_dim(&self) -> usize {
        let [c, h, w] = self.obs_shape;
        match self.encoder_type {
            EncoderType::Identity => c * h * w,
            EncoderType::Pixel => {
                let out = |size: usize| {
                    let mut size = size.saturating_sub(3) / 2 + 1;
                    for _ in 1..self.num_layers {
                        size = size.saturating_sub(2);
                    }
                    size
                };
                self.num_filters * out(h) * out(w)
            }
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        let convs = match self.encoder_type {
            EncoderType::Identity => Vec::new(),
            EncoderType::Pixel => (0..self.num_layers)
                .map(|i| {
                    let (in_channels, stride) = if i == 0 {
                        (self.obs_shape[0], 2)
                    } else {
                        (self.num_filters, 1)
                    };
                    Conv2dConfig::new([in_channels, self.num_filters], [3, 3])
                        .with_stride([stride, stride])
                        .init(device)
                })
                .collect(),
        };

        Encoder {
            convs,
            fc: OrthogonalLinearConfig::new(self.flat_dim(), self.feature_dim).init(device),
            ln: LayerNormConfig::new(self.feature_dim).init(device),
            feature_dim: self.feature_dim,
        }
    }
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    convs: Vec<Conv2d<B>>,
    fc: OrthogonalLinear<B>,
    ln: LayerNorm<B>,
    feature_dim: usize,
}

impl<B: Backend> Encoder<B> {
    /// `[batch, C, H, W] -> [batch, feature_dim]`.
    ///
    /// With `detach`, gradients stop at the conv output; the projection
    /// still trains.
    pub fn forward(&self, obs: Tensor<B, 4>, detach: bool) -> Tensor<B, 2> {
        let [batch, ..] = obs.dims();
        let mut h = obs;
        for conv in &self.convs {
            h = relu(conv.forward(h));
        }
        let [_, c, hh, ww] = h.dims();
        let mut flat = h.reshape([batch, c * hh * ww]);
        if detach {
            flat = flat.detach();
        }
        tanh(self.ln.forward(self.fc.forward(flat)))
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    pub fn is_pixel(&self) -> bool {
        !self.convs.is_empty()
    }

    pub fn convs(&self) -> &[Conv2d<B>] {
        &self.convs
    }

    /// Replace this encoder's conv layers with `source`'s.
    pub fn tie_convs_from(mut self, source: &Encoder<B>) -> Self {
        if self.convs.len() == source.convs.len() {
            self.convs = source.convs.clone();
        } else {
            log::warn!(
                "cannot tie encoders with {} and {} conv layers",
                self.convs.len(),
                source.convs.len()
            );
        }
        self
    }
}
