//! Agent configuration.
//!
//! `RadSacConfig` carries every hyperparameter consumed by the agent, the
//! augmentation selector and the replay buffer. Values default to the
//! pixel-based SAC settings and are adjusted with `with_*` builders or loaded
//! from JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::augmentation::{AugmentationKind, AugmentationMode};
use crate::error::{AgentError, Result};

/// Observation encoder family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderType {
    /// Convolutional encoder over stacked image frames.
    Pixel,
    /// Flat state vectors; no augmentation is applied.
    Identity,
}

// ============================================================================
// RAD-SAC Configuration
// ============================================================================

/// Configuration for the RAD-SAC agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadSacConfig {
    // ========================================================================
    // Network Shape
    // ========================================================================
    /// Width of the actor and Q-function MLPs.
    pub hidden_dim: usize,

    pub encoder_type: EncoderType,

    /// Output size of the encoder.
    pub encoder_feature_dim: usize,

    /// Number of 3x3 conv layers in the pixel encoder.
    pub num_layers: usize,

    /// Channels per conv layer.
    pub num_filters: usize,

    /// Size of the CURL bilinear projection.
    pub latent_dim: usize,

    /// Spatial size (height == width) of the observations fed to the encoder.
    pub image_size: usize,

    // ========================================================================
    // SAC Hyperparameters
    // ========================================================================
    /// Discount factor.
    pub discount: f32,

    /// Initial entropy coefficient.
    pub init_temperature: f32,

    pub alpha_lr: f64,
    pub alpha_beta: f64,

    pub actor_lr: f64,
    pub actor_beta: f64,
    pub actor_log_std_min: f32,
    pub actor_log_std_max: f32,

    /// Actor and temperature update cadence, in training steps.
    pub actor_update_freq: usize,

    pub critic_lr: f64,
    pub critic_beta: f64,

    /// Polyak coefficient for the target Q-functions.
    pub critic_tau: f32,

    /// Target network update cadence, in training steps.
    pub critic_target_update_freq: usize,

    pub encoder_lr: f64,

    /// Polyak coefficient for the target encoder.
    pub encoder_tau: f32,

    pub cpc_update_freq: usize,

    /// Stop critic gradients from reaching the encoder.
    pub detach_encoder: bool,

    // ========================================================================
    // Augmentation Selection
    // ========================================================================
    /// `-`-delimited augmentation names, e.g. `"crop-cutout-flip"`.
    pub data_augs: String,

    /// Adaptive selection mode; `None` applies every configured augmentation.
    pub mode: Option<AugmentationMode>,

    /// Eviction interval. Required whenever `mode` is set.
    pub prune_interval: Option<usize>,

    /// Steps during which selection is bypassed and batches are unaugmented.
    pub warmup_steps: usize,

    // ========================================================================
    // Training Loop
    // ========================================================================
    /// Transitions per sampled batch; see `ReplayBufferConfig::from_agent_config`.
    pub batch_size: usize,

    /// Interval for interval-gated metrics.
    pub log_interval: usize,

    /// Seed for the selector's random draws and the replay buffer built from this config.
    pub seed: Option<u64>,
}

impl Default for RadSacConfig {
    fn default() -> Self {
        Self {
            hidden_dim: 256,
            encoder_type: EncoderType::Pixel,
            encoder_feature_dim: 50,
            num_layers: 4,
            num_filters: 32,
            latent_dim: 128,
            image_size: 84,
            discount: 0.99,
            init_temperature: 0.1,
            alpha_lr: 1e-4,
            alpha_beta: 0.9,
            actor_lr: 1e-3,
            actor_beta: 0.9,
            actor_log_std_min: -10.0,
            actor_log_std_max: 2.0,
            actor_update_freq: 2,
            critic_lr: 1e-3,
            critic_beta: 0.9,
            critic_tau: 0.005,
            critic_target_update_freq: 2,
            encoder_lr: 1e-3,
            encoder_tau: 0.05,
            cpc_update_freq: 1,
            detach_encoder: false,
            data_augs: String::new(),
            mode: None,
            prune_interval: None,
            warmup_steps: 1000,
            batch_size: 32,
            log_interval: 100,
            seed: None,
        }
    }
}

impl RadSacConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for flat state observations.
    pub fn state_based() -> Self {
        Self {
            encoder_type: EncoderType::Identity,
            ..Self::default()
        }
    }

    pub fn with_hidden_dim(mut self, hidden_dim: usize) -> Self {
        self.hidden_dim = hidden_dim;
        self
    }

    pub fn with_encoder_type(mut self, encoder_type: EncoderType) -> Self {
        self.encoder_type = encoder_type;
        self
    }

    pub fn with_encoder_feature_dim(mut self, dim: usize) -> Self {
        self.encoder_feature_dim = dim;
        self
    }

    pub fn with_num_layers(mut self, num_layers: usize) -> Self {
        self.num_layers = num_layers;
        self
    }

    pub fn with_num_filters(mut self, num_filters: usize) -> Self {
        self.num_filters = num_filters;
        self
    }

    pub fn with_latent_dim(mut self, latent_dim: usize) -> Self {
        self.latent_dim = latent_dim;
        self
    }

    pub fn with_image_size(mut self, image_size: usize) -> Self {
        self.image_size = image_size;
        self
    }

    pub fn with_discount(mut self, discount: f32) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_init_temperature(mut self, temperature: f32) -> Self {
        self.init_temperature = temperature;
        self
    }

    pub fn with_actor_update_freq(mut self, freq: usize) -> Self {
        self.actor_update_freq = freq;
        self
    }

    pub fn with_critic_target_update_freq(mut self, freq: usize) -> Self {
        self.critic_target_update_freq = freq;
        self
    }

    /// Set both soft-update coefficients.
    pub fn with_taus(mut self, critic_tau: f32, encoder_tau: f32) -> Self {
        self.critic_tau = critic_tau;
        self.encoder_tau = encoder_tau;
        self
    }

    pub fn with_learning_rates(mut self, actor_lr: f64, critic_lr: f64, alpha_lr: f64) -> Self {
        self.actor_lr = actor_lr;
        self.critic_lr = critic_lr;
        self.alpha_lr = alpha_lr;
        self
    }

    pub fn with_detach_encoder(mut self, detach: bool) -> Self {
        self.detach_encoder = detach;
        self
    }

    pub fn with_data_augs(mut self, data_augs: impl Into<String>) -> Self {
        self.data_augs = data_augs.into();
        self
    }

    /// Enable adaptive selection with the given mode and eviction interval.
    pub fn with_mode(mut self, mode: AugmentationMode, prune_interval: usize) -> Self {
        self.mode = Some(mode);
        self.prune_interval = Some(prune_interval);
        self
    }

    pub fn with_warmup_steps(mut self, steps: usize) -> Self {
        self.warmup_steps = steps;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_log_interval(mut self, interval: usize) -> Self {
        self.log_interval = interval;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Augmentation names from `data_augs`, in configuration order.
    pub fn augmentation_names(&self) -> Vec<&str> {
        self.data_augs
            .split('-')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// Parse `data_augs` into augmentation kinds.
    pub fn augmentation_kinds(&self) -> Result<Vec<AugmentationKind>> {
        self.augmentation_names()
            .into_iter()
            .map(|name| {
                name.parse::<AugmentationKind>()
                    .map_err(|_| AgentError::UnknownAugmentation {
                        name: name.to_string(),
                        mode: self.mode,
                    })
            })
            .collect()
    }

    /// Check hyperparameter consistency.
    pub fn validate(&self) -> Result<()> {
        if self.mode.is_some() {
            match self.prune_interval {
                None => {
                    return Err(AgentError::config(
                        "prune_interval is required when an augmentation mode is set",
                    ))
                }
                Some(0) => return Err(AgentError::config("prune_interval must be positive")),
                Some(_) => {}
            }
            if self.encoder_type == EncoderType::Pixel && self.augmentation_names().is_empty() {
                return Err(AgentError::config(
                    "adaptive augmentation needs at least one augmentation in data_augs",
                ));
            }
        }
        if self.actor_update_freq == 0 || self.critic_target_update_freq == 0 {
            return Err(AgentError::config("update frequencies must be positive"));
        }
        if self.cpc_update_freq == 0 || self.log_interval == 0 {
            return Err(AgentError::config(
                "cpc_update_freq and log_interval must be positive",
            ));
        }
        for (name, tau) in [("critic_tau", self.critic_tau), ("encoder_tau", self.encoder_tau)] {
            if !(0.0..=1.0).contains(&tau) {
                return Err(AgentError::config(format!("{name} must lie in [0, 1], got {tau}")));
            }
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(AgentError::config(format!(
                "discount must lie in [0, 1], got {}",
                self.discount
            )));
        }
        if self.init_temperature <= 0.0 {
            return Err(AgentError::config("init_temperature must be positive"));
        }
        if self.actor_log_std_min >= self.actor_log_std_max {
            return Err(AgentError::config("actor_log_std_min must be below actor_log_std_max"));
        }
        if self.hidden_dim == 0 || self.encoder_feature_dim == 0 || self.latent_dim == 0 {
            return Err(AgentError::config("layer sizes must be positive"));
        }
        if self.encoder_type == EncoderType::Pixel && (self.num_layers == 0 || self.num_filters == 0)
        {
            return Err(AgentError::config("pixel encoder needs at least one conv layer"));
        }
        if self.batch_size == 0 {
            return Err(AgentError::config("batch_size must be positive"));
        }
        self.augmentation_kinds()?;
        Ok(())
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}
