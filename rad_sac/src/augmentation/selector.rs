//! Per-step augmentation selection.
//!
//! Each training step past warm-up evaluates every active augmentation on the
//! same sampled transitions, keeps the one with the highest critic loss,
//! settles the scoreboard and, when an augmentation is evicted, may promote a
//! new parameter variant from the grid.
//!
//! ```text
//! WARMUP ──(step >= warmup_steps)──► EVALUATE ─► SELECT ─► POLICY_UPDATE ─► (caller) OPTIMIZE
//! ```

use burn::tensor::backend::Backend;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::catalog::{AugmentationCatalog, AugmentationEntry};
use super::grid::{AugmentationGridIndex, GridDraw};
use super::kind::{AugmentationKey, AugmentationKind, AugmentationMode, AugmentationParams};
use super::scoreboard::{AugmentationScoreBoard, SettleContext};
use crate::buffer::{AugmentedSampler, TransitionBatch};
use crate::config::RadSacConfig;
use crate::error::{AgentError, Result};
use crate::sac::CriticLoss;

/// Outcome of one selection step.
#[derive(Debug)]
pub struct Selection<B: Backend> {
    /// The augmentation whose batch and loss were kept.
    pub key: AugmentationKey,
    pub batch: TransitionBatch<B>,
    pub loss: CriticLoss<B>,
    /// Number of augmentations evaluated this step.
    pub evaluated: usize,
    pub evicted: Option<AugmentationKey>,
    pub promoted: Option<AugmentationKey>,
}

/// Owns the active augmentation set, its scores and the variant grid.
#[derive(Debug, Clone)]
pub struct AugmentationSelector {
    mode: AugmentationMode,
    prune_interval: usize,
    warmup_steps: usize,
    active: IndexMap<AugmentationKey, AugmentationEntry>,
    scores: AugmentationScoreBoard,
    grid: AugmentationGridIndex,
    rng: StdRng,
}

impl AugmentationSelector {
    /// Build the selector from the configured augmentation list.
    ///
    /// Fails if no mode is set, the prune interval is missing, or a name is
    /// not in the catalog for the mode.
    pub fn from_config(config: &RadSacConfig) -> Result<Self> {
        let mode = config
            .mode
            .ok_or_else(|| AgentError::config("augmentation selection requires a mode"))?;
        let prune_interval = config
            .prune_interval
            .filter(|interval| *interval > 0)
            .ok_or_else(|| AgentError::config("prune_interval is required when a mode is set"))?;

        let catalog = AugmentationCatalog::for_mode(Some(mode), config.image_size);
        let active = catalog.resolve(&config.augmentation_names())?;
        if active.is_empty() {
            return Err(AgentError::config("no augmentations configured"));
        }
        let kinds: Vec<AugmentationKind> = active.keys().map(|key| key.base).collect();
        let grid = AugmentationGridIndex::for_mode(Some(mode), config.image_size, &kinds);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self::from_parts(mode, prune_interval, config.warmup_steps, active, grid, rng))
    }

    /// Assemble a selector from explicit parts; every active key starts at score 0.
    pub fn from_parts(
        mode: AugmentationMode,
        prune_interval: usize,
        warmup_steps: usize,
        active: IndexMap<AugmentationKey, AugmentationEntry>,
        grid: AugmentationGridIndex,
        rng: StdRng,
    ) -> Self {
        log::info!(
            "augmentation selection on: mode={mode}, prune_interval={prune_interval}, set=[{}]",
            active.keys().map(|k| k.to_string()).collect::<Vec<_>>().join(", ")
        );
        let scores = AugmentationScoreBoard::with_keys(active.keys().copied());
        Self {
            mode,
            prune_interval,
            warmup_steps,
            active,
            scores,
            grid,
            rng,
        }
    }

    pub fn mode(&self) -> AugmentationMode {
        self.mode
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn active_keys(&self) -> Vec<AugmentationKey> {
        self.active.keys().copied().collect()
    }

    pub fn entry(&self, key: &AugmentationKey) -> Option<&AugmentationEntry> {
        self.active.get(key)
    }

    pub fn scores(&self) -> &AugmentationScoreBoard {
        &self.scores
    }

    pub fn grid(&self) -> &AugmentationGridIndex {
        &self.grid
    }

    /// Run one selection step and return the batch to optimize on.
    ///
    /// `evaluate` computes the critic loss of a candidate batch. Before
    /// `warmup_steps` the identity augmentation is used and nothing is scored.
    pub fn select_batch<B, S, F>(
        &mut self,
        sampler: &S,
        step: usize,
        device: &B::Device,
        mut evaluate: F,
    ) -> Result<Selection<B>>
    where
        B: Backend,
        S: AugmentedSampler<B> + ?Sized,
        F: FnMut(&TransitionBatch<B>) -> Result<CriticLoss<B>>,
    {
        if step < self.warmup_steps {
            let identity = AugmentationEntry::identity();
            let sampled = sampler.sample_augmented(&[identity], None, device)?;
            let loss = evaluate(&sampled.batch)?;
            return Ok(Selection {
                key: identity.key,
                batch: sampled.batch,
                loss,
                evaluated: 1,
                evicted: None,
                promoted: None,
            });
        }

        let mut indices: Option<Vec<usize>> = None;
        let mut best: Option<(AugmentationKey, TransitionBatch<B>, CriticLoss<B>)> = None;
        let entries: Vec<AugmentationEntry> = self.active.values().copied().collect();
        for entry in &entries {
            let sampled = sampler.sample_augmented(std::slice::from_ref(entry), indices.as_deref(), device)?;
            if indices.is_none() {
                indices = Some(sampled.indices);
            }
            let loss = evaluate(&sampled.batch)?;
            let better = match &best {
                None => true,
                Some((_, _, current)) => loss.value > current.value,
            };
            if better {
                best = Some((entry.key, sampled.batch, loss));
            }
        }

        let (key, batch, loss) =
            best.ok_or_else(|| AgentError::config("no active augmentation to evaluate"))?;
        let (evicted, promoted) = self.apply_policy(&key, step);

        Ok(Selection {
            key,
            batch,
            loss,
            evaluated: entries.len(),
            evicted,
            promoted,
        })
    }

    /// Settle scores for `winner` and apply any eviction and promotion.
    ///
    /// In the promoting modes the replacement variant is drawn before the
    /// victim is removed; when the grid has nothing to offer the eviction is
    /// skipped and the victim keeps its score.
    pub fn apply_policy(
        &mut self,
        winner: &AugmentationKey,
        step: usize,
    ) -> (Option<AugmentationKey>, Option<AugmentationKey>) {
        let ctx = SettleContext {
            mode: self.mode,
            step,
            prune_interval: self.prune_interval,
            active: self.active.len(),
            warmup_steps: self.warmup_steps,
        };
        let Some(victim) = self.scores.settle(winner, ctx) else {
            return (None, None);
        };
        if self.active.len() <= 1 {
            log::debug!("keeping {victim}: it is the last active augmentation");
            return (None, None);
        }

        let replacement = if self.mode.promotes() {
            match self.draw_replacement(&victim) {
                Some(drawn) => Some(drawn),
                None => {
                    log::debug!("step {step}: keeping {victim}: grid has no variant to promote");
                    return (None, None);
                }
            }
        } else {
            None
        };

        self.active.shift_remove(&victim);
        self.scores.evict(&victim);
        log::info!("step {step}: evicted augmentation {victim} ({} left)", self.active.len());

        let promoted = replacement.map(|(base, params)| self.insert_variant(base, params));
        if let Some(key) = &promoted {
            log::info!(
                "step {step}: promoted augmentation {key} with score {}",
                self.scores.score(key).unwrap_or_default()
            );
        }
        (Some(victim), promoted)
    }

    /// Pop the variant that will replace `victim`, if the grid has one.
    fn draw_replacement(&mut self, victim: &AugmentationKey) -> Option<(AugmentationKind, AugmentationParams)> {
        match self.mode {
            AugmentationMode::Search | AugmentationMode::WarmUp => {
                let how = if self.mode == AugmentationMode::Search {
                    GridDraw::Random
                } else {
                    GridDraw::First
                };
                let mut bases: Vec<AugmentationKind> = Vec::new();
                for key in self.active.keys().filter(|key| *key != victim) {
                    if !bases.contains(&key.base) {
                        bases.push(key.base);
                    }
                }
                while !bases.is_empty() {
                    let pick = bases.choose(&mut self.rng).copied()?;
                    bases.retain(|b| *b != pick);
                    if let Some(params) = self.grid.draw(pick, how, &mut self.rng) {
                        return Some((pick, params));
                    }
                }
                None
            }
            AugmentationMode::Tune | AugmentationMode::Prune => {
                let base = if self.grid.is_exhausted(victim.base) {
                    self.grid.random_available(&mut self.rng)?
                } else {
                    victim.base
                };
                let params = self.grid.draw(base, GridDraw::First, &mut self.rng)?;
                Some((base, params))
            }
            AugmentationMode::Unused | AugmentationMode::Select => None,
        }
    }

    /// Add a promoted variant; its score is computed after the victim is gone.
    fn insert_variant(&mut self, base: AugmentationKind, params: AugmentationParams) -> AugmentationKey {
        let score = match self.mode {
            AugmentationMode::Tune => 0,
            _ => self.scores.sibling_average(base),
        };
        let entry = AugmentationEntry::variant(base, params);
        self.active.insert(entry.key, entry);
        self.scores.insert(entry.key, score);
        entry.key
    }
}
