//! RAD-SAC agent: one optimization step per call to [`RadSacAgent::update`].
//!
//! ```text
//! batch  ── selector (adaptive mode) or direct augmented sample
//! critic ── every step, on the chosen batch
//! actor  ── step % actor_update_freq == 0, followed by the α step
//! target ── step % critic_target_update_freq == 0, Polyak with critic_tau / encoder_tau
//! ```
//!
//! The actor's conv layers mirror the critic's: they are re-tied after every
//! step that changes the critic encoder, and actor updates never reach them.

use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use super::critic_loss::{scalar, CriticLoss, CriticLossEvaluator};
use super::losses::{gaussian_entropy, sac_actor_loss, target_entropy_continuous};
use super::temperature::Temperature;
use super::traits::{SacActor, SacCritic};
use crate::augmentation::{
    AugmentationCatalog, AugmentationEntry, AugmentationKey, AugmentationSelector,
};
use crate::buffer::{AugmentedSampler, TransitionBatch};
use crate::checkpoint::{Checkpointer, ACTOR_PREFIX, CRITIC_PREFIX, CURL_PREFIX};
use crate::config::{EncoderType, RadSacConfig};
use crate::error::Result;
use crate::metrics::TrainingLogger;
use crate::nn::{CurlHead, Encoder, PixelActor, PixelActorConfig, PixelCritic, PixelCriticConfig};

/// Summary of one [`RadSacAgent::update`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateInfo {
    pub critic_loss: f32,
    /// Present on steps where the actor and α were updated.
    pub actor_loss: Option<f32>,
    pub alpha_loss: Option<f32>,
    /// α after the step.
    pub alpha: f32,
    pub target_updated: bool,
    /// Augmentation whose batch trained the critic, in adaptive mode.
    pub augmentation: Option<AugmentationKey>,
    pub active_augmentations: usize,
}

pub struct RadSacAgent<B: AutodiffBackend> {
    config: RadSacConfig,
    actor: PixelActor<B>,
    critic: PixelCritic<B>,
    critic_target: PixelCritic<B>,
    temperature: Temperature<B>,
    curl: CurlHead<B>,
    actor_optimizer: OptimizerAdaptor<Adam, PixelActor<B>, B>,
    critic_optimizer: OptimizerAdaptor<Adam, PixelCritic<B>, B>,
    alpha_optimizer: OptimizerAdaptor<Adam, Temperature<B>, B>,
    encoder_optimizer: OptimizerAdaptor<Adam, Encoder<B>, B>,
    curl_optimizer: OptimizerAdaptor<Adam, CurlHead<B>, B>,
    selector: Option<AugmentationSelector>,
    /// Applied to every batch when no adaptive mode is set.
    augmentations: Vec<AugmentationEntry>,
    evaluator: CriticLossEvaluator,
    target_entropy: f32,
    device: B::Device,
}

impl<B: AutodiffBackend> RadSacAgent<B> {
    /// Build networks, optimizers and, when a mode is set, the augmentation selector.
    ///
    /// `obs_shape` is `[channels, height, width]` (`[dim, 1, 1]` for states).
    pub fn new(
        config: RadSacConfig,
        obs_shape: [usize; 3],
        action_dim: usize,
        device: &B::Device,
    ) -> Result<Self> {
        config.validate()?;

        let critic = PixelCriticConfig::from_agent_config(&config, obs_shape, action_dim).init(device);
        let critic_target = critic.clone().no_grad();
        let actor = PixelActorConfig::from_agent_config(&config, obs_shape, action_dim)
            .init(device)
            .with_tied_encoder(&critic.encoder);

        let pixel = config.encoder_type == EncoderType::Pixel;
        let selector = match config.mode {
            Some(_) if pixel => Some(AugmentationSelector::from_config(&config)?),
            Some(mode) => {
                log::warn!("augmentation mode {mode} ignored for state observations");
                None
            }
            None => None,
        };
        let augmentations = if pixel && selector.is_none() {
            AugmentationCatalog::for_mode(None, config.image_size)
                .resolve(&config.augmentation_names())?
                .into_values()
                .collect()
        } else {
            Vec::new()
        };

        log::info!(
            "RAD-SAC agent: obs={obs_shape:?}, action_dim={action_dim}, encoder={:?}, mode={}",
            config.encoder_type,
            config.mode.map_or("none".to_string(), |m| m.to_string())
        );

        Ok(Self {
            temperature: Temperature::new(config.init_temperature, device),
            curl: CurlHead::new(config.encoder_feature_dim, device),
            actor_optimizer: AdamConfig::new().with_beta_1(config.actor_beta as f32).init(),
            critic_optimizer: AdamConfig::new().with_beta_1(config.critic_beta as f32).init(),
            alpha_optimizer: AdamConfig::new().with_beta_1(config.alpha_beta as f32).init(),
            encoder_optimizer: AdamConfig::new().init(),
            curl_optimizer: AdamConfig::new().init(),
            evaluator: CriticLossEvaluator::new(config.discount, config.detach_encoder),
            target_entropy: target_entropy_continuous(action_dim),
            device: device.clone(),
            actor,
            critic,
            critic_target,
            selector,
            augmentations,
            config,
        })
    }

    pub fn config(&self) -> &RadSacConfig {
        &self.config
    }

    pub fn actor(&self) -> &PixelActor<B> {
        &self.actor
    }

    pub fn critic(&self) -> &PixelCritic<B> {
        &self.critic
    }

    pub fn critic_target(&self) -> &PixelCritic<B> {
        &self.critic_target
    }

    pub fn curl(&self) -> &CurlHead<B> {
        &self.curl
    }

    pub fn selector(&self) -> Option<&AugmentationSelector> {
        self.selector.as_ref()
    }

    pub fn alpha(&self) -> f32 {
        self.temperature.alpha()
    }

    pub fn target_entropy(&self) -> f32 {
        self.target_entropy
    }

    /// Critic loss of `batch` under the current networks.
    pub fn critic_loss(&self, batch: &TransitionBatch<B>) -> CriticLoss<B> {
        self.evaluator.evaluate(
            &self.actor,
            &self.critic,
            &self.critic_target,
            self.temperature.alpha(),
            batch,
        )
    }

    /// Run one training iteration at `step`.
    pub fn update<S>(&mut self, sampler: &S, logger: &mut dyn TrainingLogger, step: usize) -> Result<UpdateInfo>
    where
        S: AugmentedSampler<B> + ?Sized,
    {
        let log_now = step % self.config.log_interval == 0;

        let (batch, loss, augmentation) = match self.selector.as_mut() {
            Some(selector) => {
                let alpha = self.temperature.alpha();
                let (evaluator, actor, critic, target) =
                    (self.evaluator, &self.actor, &self.critic, &self.critic_target);
                let selection = selector.select_batch(sampler, step, &self.device, |batch| {
                    Ok(evaluator.evaluate(actor, critic, target, alpha, batch))
                })?;
                if log_now {
                    logger.log_scalar("train_aug/active_count", selector.active_len() as f32, step);
                }
                (selection.batch, selection.loss, Some(selection.key))
            }
            None => {
                let batch = if self.augmentations.is_empty() {
                    sampler.sample_plain(&self.device)?
                } else {
                    sampler.sample_augmented(&self.augmentations, None, &self.device)?.batch
                };
                let loss = self.critic_loss(&batch);
                (batch, loss, None)
            }
        };

        let critic_loss = loss.value;
        self.optimize_critic(loss, logger, step);

        if log_now {
            let reward = scalar(batch.reward.clone().mean());
            logger.log_scalar("train/batch_reward", reward, step);
        }

        let (actor_loss, alpha_loss) = if step % self.config.actor_update_freq == 0 {
            let (actor_loss, alpha_loss) = self.update_actor_and_alpha(batch.obs, logger, step);
            (Some(actor_loss), Some(alpha_loss))
        } else {
            (None, None)
        };

        let target_updated = step % self.config.critic_target_update_freq == 0;
        if target_updated {
            self.critic_target = self.critic_target.clone().soft_update_from(
                &self.critic,
                self.config.critic_tau,
                self.config.encoder_tau,
            );
        }

        Ok(UpdateInfo {
            critic_loss,
            actor_loss,
            alpha_loss,
            alpha: self.temperature.alpha(),
            target_updated,
            augmentation,
            active_augmentations: self.selector.as_ref().map_or(0, AugmentationSelector::active_len),
        })
    }

    /// Backpropagate `loss` through the critic and step its optimizer.
    pub fn optimize_critic(&mut self, loss: CriticLoss<B>, logger: &mut dyn TrainingLogger, step: usize) {
        logger.log_scalar("train/Q1 loss", loss.q1_loss, step);
        logger.log_scalar("train/Q2 loss", loss.q2_loss, step);
        logger.log_scalar("train/Mean Target Q", loss.mean_target_q, step);
        logger.log_scalar("train/Mean Q1", loss.mean_q1, step);
        logger.log_scalar("train/Mean Q2", loss.mean_q2, step);
        if step % self.config.log_interval == 0 {
            logger.log_scalar("train_critic/loss", loss.value, step);
        }

        let grads = GradientsParams::from_grads(loss.loss.backward(), &self.critic);
        self.critic = self
            .critic_optimizer
            .step(self.config.critic_lr, self.critic.clone(), grads);
        self.retie_actor_encoder();
    }

    /// Policy step on `obs` followed by the temperature step.
    ///
    /// Returns `(actor_loss, alpha_loss)`.
    pub fn update_actor_and_alpha(
        &mut self,
        obs: Tensor<B, 4>,
        logger: &mut dyn TrainingLogger,
        step: usize,
    ) -> (f32, f32) {
        let log_now = step % self.config.log_interval == 0;
        let alpha = self.temperature.alpha();

        let policy = self.actor.forward(obs.clone(), true);
        let q = self.critic.forward(obs, policy.sample.clone(), true);
        let actor_loss = sac_actor_loss(q.min_q(), policy.log_prob.clone(), alpha);
        let actor_loss_val = scalar(actor_loss.clone());
        if log_now {
            logger.log_scalar("train_actor/loss", actor_loss_val, step);
            logger.log_scalar("train_actor/target_entropy", self.target_entropy, step);
            let entropy = scalar(gaussian_entropy(policy.log_std.clone().detach()));
            logger.log_scalar("train_actor/entropy", entropy, step);
        }

        let grads = GradientsParams::from_grads(actor_loss.backward(), &self.actor);
        self.actor = self
            .actor_optimizer
            .step(self.config.actor_lr, self.actor.clone(), grads);

        let alpha_loss = self.temperature.loss(policy.log_prob, self.target_entropy);
        let alpha_loss_val = scalar(alpha_loss.clone());
        if log_now {
            logger.log_scalar("train_alpha/loss", alpha_loss_val, step);
            logger.log_scalar("train_alpha/value", alpha, step);
        }
        let grads = GradientsParams::from_grads(alpha_loss.backward(), &self.temperature);
        self.temperature = self
            .alpha_optimizer
            .step(self.config.alpha_lr, self.temperature.clone(), grads);

        (actor_loss_val, alpha_loss_val)
    }

    /// Contrastive step: anchors through the online encoder, positives through
    /// the target encoder. Updates the critic encoder and the CURL head.
    ///
    /// Not part of [`update`](Self::update); drivers call it on their own cadence.
    pub fn update_cpc(
        &mut self,
        obs_anchor: Tensor<B, 4>,
        obs_pos: Tensor<B, 4>,
        logger: &mut dyn TrainingLogger,
        step: usize,
    ) -> f32 {
        let z_a = self.critic.encoder.forward(obs_anchor, false);
        let z_pos = self.critic_target.encoder.forward(obs_pos, false).detach();
        let logits = self.curl.compute_logits(z_a, z_pos);
        let [n, _] = logits.dims();
        let labels = Tensor::<B, 1, Int>::arange(0..n as i64, &self.device);
        let loss = CrossEntropyLossConfig::new()
            .init(&self.device)
            .forward(logits, labels);
        let loss_val = scalar(loss.clone());

        let mut grads = loss.backward();
        let encoder_grads = GradientsParams::from_module(&mut grads, &self.critic.encoder);
        let curl_grads = GradientsParams::from_grads(grads, &self.curl);
        self.critic.encoder =
            self.encoder_optimizer
                .step(self.config.encoder_lr, self.critic.encoder.clone(), encoder_grads);
        self.curl = self
            .curl_optimizer
            .step(self.config.encoder_lr, self.curl.clone(), curl_grads);
        self.retie_actor_encoder();

        if step % self.config.log_interval == 0 {
            logger.log_scalar("train/curl_loss", loss_val, step);
        }
        loss_val
    }

    /// Deterministic action `tanh(μ)` for each observation.
    pub fn select_action(&self, obs: Tensor<B, 4>) -> Tensor<B, 2> {
        self.actor.forward(self.fit_to_image_size(obs), false).mean.detach()
    }

    /// Stochastic action from the policy.
    pub fn sample_action(&self, obs: Tensor<B, 4>) -> Tensor<B, 2> {
        self.actor.forward(self.fit_to_image_size(obs), false).sample.detach()
    }

    /// Write actor and critic checkpoints for `step`.
    pub fn save(&self, checkpointer: &Checkpointer, step: usize) -> Result<()> {
        checkpointer.save(ACTOR_PREFIX, &self.actor, step)?;
        checkpointer.save(CRITIC_PREFIX, &self.critic, step)?;
        Ok(())
    }

    pub fn save_curl(&self, checkpointer: &Checkpointer, step: usize) -> Result<()> {
        checkpointer.save(CURL_PREFIX, &self.curl, step)?;
        Ok(())
    }

    /// Restore actor and critic from the checkpoints for `step`.
    pub fn load(&mut self, checkpointer: &Checkpointer, step: usize) -> Result<()> {
        self.actor = checkpointer.load(ACTOR_PREFIX, self.actor.clone(), step, &self.device)?;
        self.critic = checkpointer.load(CRITIC_PREFIX, self.critic.clone(), step, &self.device)?;
        self.retie_actor_encoder();
        log::info!("loaded actor and critic from step {step}");
        Ok(())
    }

    fn retie_actor_encoder(&mut self) {
        self.actor = self.actor.clone().with_tied_encoder(&self.critic.encoder);
    }

    /// Center-crop pixel observations larger than the configured image size.
    fn fit_to_image_size(&self, obs: Tensor<B, 4>) -> Tensor<B, 4> {
        let [batch, channels, height, width] = obs.dims();
        let size = self.config.image_size;
        if self.config.encoder_type != EncoderType::Pixel || (height == size && width == size) {
            return obs;
        }
        if height < size || width < size {
            log::warn!("observation {height}x{width} smaller than image size {size}");
            return obs;
        }
        let top = (height - size) / 2;
        let left = (width - size) / 2;
        obs.slice([0..batch, 0..channels, top..top + size, left..left + size])
    }
}
