//! Uniform replay buffer with augmentation-aware sampling.
//!
//! - **Ring buffer** semantics (overwrite oldest when full)
//! - **Uniform random sampling** with replacement
//! - **Index replay**: a batch can be re-drawn from previously returned
//!   indices so several augmentations see identical transitions

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{AugmentedSampler, SampledBatch, TransitionBatch};
use crate::augmentation::{AugmentationEntry, ImageBatch};
use crate::config::RadSacConfig;
use crate::error::{AgentError, Result};

// ============================================================================
// Buffer Configuration
// ============================================================================

/// Configuration for the replay buffer.
#[derive(Debug, Clone)]
pub struct ReplayBufferConfig {
    /// Maximum number of transitions to store.
    pub capacity: usize,
    /// Batch size for sampling.
    pub batch_size: usize,
    /// Observation shape `[channels, height, width]`; flat states use `[dim, 1, 1]`.
    pub obs_shape: [usize; 3],
    pub action_dim: usize,
    /// Seed for index draws and augmentation randomness.
    pub seed: Option<u64>,
}

impl ReplayBufferConfig {
    pub fn new(capacity: usize, batch_size: usize, obs_shape: [usize; 3], action_dim: usize) -> Self {
        Self {
            capacity,
            batch_size,
            obs_shape,
            action_dim,
            seed: None,
        }
    }

    /// Configuration sized for an agent: batch size and seed come from `config`.
    pub fn from_agent_config(
        config: &RadSacConfig,
        capacity: usize,
        obs_shape: [usize; 3],
        action_dim: usize,
    ) -> Self {
        Self {
            capacity,
            batch_size: config.batch_size,
            obs_shape,
            action_dim,
            seed: config.seed,
        }
    }

    /// Configuration for flat state vectors of length `state_dim`.
    pub fn for_states(capacity: usize, batch_size: usize, state_dim: usize, action_dim: usize) -> Self {
        Self::new(capacity, batch_size, [state_dim, 1, 1], action_dim)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn obs_len(&self) -> usize {
        self.obs_shape.iter().product()
    }
}

/// One stored transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub obs: Vec<f32>,
    pub action: Vec<f32>,
    pub reward: f32,
    pub next_obs: Vec<f32>,
    pub done: bool,
}

// ============================================================================
// Ring Buffer (Internal)
// ============================================================================

struct RingBuffer<T> {
    buffer: Vec<T>,
    capacity: usize,
    write_pos: usize,
}

impl<T> RingBuffer<T> {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity.min(1 << 16)),
            capacity,
            write_pos: 0,
        }
    }

    /// Push an item, overwriting the oldest when full.
    fn push(&mut self, item: T) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(item);
        } else {
            self.buffer[self.write_pos] = item;
        }
        self.write_pos = (self.write_pos + 1) % self.capacity;
    }

    #[inline]
    fn get(&self, idx: usize) -> Option<&T> {
        self.buffer.get(idx)
    }

    #[inline]
    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.write_pos = 0;
    }
}

// ============================================================================
// Replay Buffer
// ============================================================================

struct SamplerRng {
    indices: fastrand::Rng,
    augment: StdRng,
}

impl SamplerRng {
    fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self {
                indices: fastrand::Rng::with_seed(seed),
                augment: StdRng::seed_from_u64(seed),
            },
            None => Self {
                indices: fastrand::Rng::new(),
                augment: StdRng::from_entropy(),
            },
        }
    }
}

/// Replay buffer serving augmented batches.
pub struct ReplayBuffer {
    config: ReplayBufferConfig,
    storage: RwLock<RingBuffer<Transition>>,
    rng: Mutex<SamplerRng>,
}

impl ReplayBuffer {
    /// # Panics
    /// If the capacity is zero.
    pub fn new(config: ReplayBufferConfig) -> Self {
        assert!(config.capacity > 0, "replay buffer capacity must be positive");
        Self {
            storage: RwLock::new(RingBuffer::new(config.capacity)),
            rng: Mutex::new(SamplerRng::new(config.seed)),
            config,
        }
    }

    /// Store a transition.
    ///
    /// # Panics
    /// If the observation or action length does not match the configuration.
    pub fn push(&self, obs: Vec<f32>, action: Vec<f32>, reward: f32, next_obs: Vec<f32>, done: bool) {
        let obs_len = self.config.obs_len();
        assert_eq!(obs.len(), obs_len, "obs length mismatch");
        assert_eq!(next_obs.len(), obs_len, "next_obs length mismatch");
        assert_eq!(action.len(), self.config.action_dim, "action length mismatch");
        self.storage.write().push(Transition {
            obs,
            action,
            reward,
            next_obs,
            done,
        });
    }

    pub fn len(&self) -> usize {
        self.storage.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.storage.write().clear();
    }

    pub fn config(&self) -> &ReplayBufferConfig {
        &self.config
    }

    /// Stored transition at `idx`.
    pub fn get(&self, idx: usize) -> Option<Transition> {
        self.storage.read().get(idx).cloned()
    }

    /// Draw `batch_size` uniform indices with replacement.
    fn draw_indices(&self, available: usize) -> Result<Vec<usize>> {
        let requested = self.config.batch_size;
        if available < requested || available == 0 {
            return Err(AgentError::InsufficientSamples {
                requested,
                available,
            });
        }
        let mut rng = self.rng.lock();
        Ok((0..requested).map(|_| rng.indices.usize(..available)).collect())
    }
}

impl<B: Backend> AugmentedSampler<B> for ReplayBuffer {
    fn sample_augmented(
        &self,
        augs: &[AugmentationEntry],
        indices: Option<&[usize]>,
        device: &B::Device,
    ) -> Result<SampledBatch<B>> {
        let storage = self.storage.read();
        let indices = match indices {
            Some(given) => given.to_vec(),
            None => self.draw_indices(storage.len())?,
        };

        let [channels, height, width] = self.config.obs_shape;
        let obs_len = self.config.obs_len();
        let action_dim = self.config.action_dim;
        let n = indices.len();

        let mut obs = Vec::with_capacity(n * obs_len);
        let mut next_obs = Vec::with_capacity(n * obs_len);
        let mut actions = Vec::with_capacity(n * action_dim);
        let mut rewards = Vec::with_capacity(n);
        let mut not_dones = Vec::with_capacity(n);
        for &idx in &indices {
            let t = storage.get(idx).unwrap_or_else(|| {
                panic!("replay index {idx} out of range for {} stored transitions", storage.len())
            });
            obs.extend_from_slice(&t.obs);
            next_obs.extend_from_slice(&t.next_obs);
            actions.extend_from_slice(&t.action);
            rewards.push(t.reward);
            not_dones.push(if t.done { 0.0 } else { 1.0 });
        }
        drop(storage);

        let mut obs = ImageBatch::new(obs, n, channels, height, width);
        let mut next_obs = ImageBatch::new(next_obs, n, channels, height, width);
        if !augs.is_empty() {
            let mut rng = self.rng.lock();
            for aug in augs {
                obs = aug.apply(obs, &mut rng.augment);
                next_obs = aug.apply(next_obs, &mut rng.augment);
            }
            log::debug!(
                "sampled {n} transitions with [{}]",
                augs.iter().map(|a| a.key.to_string()).collect::<Vec<_>>().join(", ")
            );
        }

        let batch = TransitionBatch::new(
            image_to_tensor(obs, device),
            Tensor::<B, 1>::from_floats(actions.as_slice(), device).reshape([n, action_dim]),
            Tensor::<B, 1>::from_floats(rewards.as_slice(), device).reshape([n, 1]),
            image_to_tensor(next_obs, device),
            Tensor::<B, 1>::from_floats(not_dones.as_slice(), device).reshape([n, 1]),
        );
        Ok(SampledBatch { batch, indices })
    }
}

fn image_to_tensor<B: Backend>(image: ImageBatch, device: &B::Device) -> Tensor<B, 4> {
    let shape = image.shape();
    Tensor::<B, 1>::from_floats(image.data.as_slice(), device).reshape(shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augmentation::{AugmentationKind, AugmentationParams};
    use burn::backend::NdArray;
    use burn::tensor::ElementConversion;

    type TestBackend = NdArray<f32>;

    fn filled(value: f32, len: usize) -> Vec<f32> {
        vec![value; len]
    }

    fn pixel_buffer(capacity: usize, batch_size: usize) -> ReplayBuffer {
        let buffer = ReplayBuffer::new(
            ReplayBufferConfig::new(capacity, batch_size, [3, 8, 8], 2).with_seed(0),
        );
        for i in 0..capacity {
            let v = i as f32 / capacity as f32;
            buffer.push(filled(v, 192), vec![v, -v], i as f32, filled(v, 192), i % 4 == 3);
        }
        buffer
    }

    #[test]
    fn test_ring_buffer_overflow() {
        let mut ring = RingBuffer::new(3);
        for i in 0..5 {
            ring.push(i);
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.get(0), Some(&3));
        assert_eq!(ring.get(1), Some(&4));
        assert_eq!(ring.get(2), Some(&2));
    }

    #[test]
    fn test_sample_shapes() {
        let device = Default::default();
        let buffer = pixel_buffer(16, 4);
        let sampled: SampledBatch<TestBackend> = buffer.sample_augmented(&[], None, &device).unwrap();
        assert_eq!(sampled.indices.len(), 4);
        assert_eq!(sampled.batch.obs.dims(), [4, 3, 8, 8]);
        assert_eq!(sampled.batch.action.dims(), [4, 2]);
        assert_eq!(sampled.batch.reward.dims(), [4, 1]);
        assert_eq!(sampled.batch.not_done.dims(), [4, 1]);
    }

    #[test]
    fn test_insufficient_samples() {
        let device = Default::default();
        let buffer = pixel_buffer(3, 8);
        let result: Result<SampledBatch<TestBackend>> = buffer.sample_augmented(&[], None, &device);
        assert!(matches!(
            result,
            Err(AgentError::InsufficientSamples { requested: 8, available: 3 })
        ));
    }

    #[test]
    fn test_shared_indices_replay_same_transitions() {
        let device = Default::default();
        let buffer = pixel_buffer(32, 6);
        let cutout = AugmentationEntry::new(
            AugmentationKind::Cutout.into(),
            AugmentationParams::Cutout { min_cut: 2, max_cut: 4 },
        );

        let first: SampledBatch<TestBackend> =
            buffer.sample_augmented(&[cutout], None, &device).unwrap();
        let replay: SampledBatch<TestBackend> = buffer
            .sample_augmented(&[], Some(&first.indices), &device)
            .unwrap();

        assert_eq!(replay.indices, first.indices);
        first
            .batch
            .reward
            .into_data()
            .assert_eq(&replay.batch.reward.into_data(), true);
        first
            .batch
            .action
            .into_data()
            .assert_eq(&replay.batch.action.into_data(), true);
    }

    #[test]
    fn test_seeded_buffers_draw_the_same_indices() {
        let device = Default::default();
        let a = pixel_buffer(32, 8);
        let b = pixel_buffer(32, 8);
        for _ in 0..3 {
            let from_a: SampledBatch<TestBackend> = a.sample_augmented(&[], None, &device).unwrap();
            let from_b: SampledBatch<TestBackend> = b.sample_augmented(&[], None, &device).unwrap();
            assert_eq!(from_a.indices, from_b.indices);
        }
    }

    #[test]
    fn test_config_from_agent_config() {
        let agent = RadSacConfig::default().with_batch_size(128).with_seed(9);
        let config = ReplayBufferConfig::from_agent_config(&agent, 1000, [9, 84, 84], 6);
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.obs_len(), 9 * 84 * 84);
    }

    #[test]
    fn test_not_done_flags() {
        let device = Default::default();
        let buffer = pixel_buffer(8, 1);
        let sampled: SampledBatch<TestBackend> =
            buffer.sample_augmented(&[], Some(&[3]), &device).unwrap();
        let not_done: f32 = sampled.batch.not_done.sum().into_scalar().elem();
        assert_eq!(not_done, 0.0);

        let sampled: SampledBatch<TestBackend> =
            buffer.sample_augmented(&[], Some(&[2]), &device).unwrap();
        let not_done: f32 = sampled.batch.not_done.sum().into_scalar().elem();
        assert_eq!(not_done, 1.0);
    }

    #[test]
    fn test_crop_changes_spatial_size() {
        let device = Default::default();
        let buffer = pixel_buffer(8, 2);
        let crop = AugmentationEntry::new(AugmentationKind::Crop.into(), AugmentationParams::Out { out: 6 });
        let sampled: SampledBatch<TestBackend> =
            buffer.sample_augmented(&[crop], None, &device).unwrap();
        assert_eq!(sampled.batch.obs.dims(), [2, 3, 6, 6]);
        assert_eq!(sampled.batch.next_obs.dims(), [2, 3, 6, 6]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_index_panics() {
        let device = Default::default();
        let buffer = pixel_buffer(4, 2);
        let _: Result<SampledBatch<TestBackend>> =
            buffer.sample_augmented(&[], Some(&[0, 9]), &device);
    }

    #[test]
    #[should_panic(expected = "action length mismatch")]
    fn test_push_validates_action() {
        let buffer = ReplayBuffer::new(ReplayBufferConfig::for_states(4, 1, 3, 2));
        buffer.push(vec![0.0; 3], vec![0.0; 3], 0.0, vec![0.0; 3], false);
    }
}
