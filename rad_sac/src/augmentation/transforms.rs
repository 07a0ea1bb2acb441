//! Image augmentations over host-side observation batches.
//!
//! Observations are stacked RGB frames stored as `[B, C, H, W]` floats in
//! `[0, 1]`. Every transform draws its randomness per sample from the supplied
//! RNG, so two calls with identically seeded RNGs produce identical output.
//! Color transforms operate per 3-channel frame and leave batches whose
//! channel count is not a multiple of three untouched.

use rand::Rng;

use super::kind::{AugmentationKind, AugmentationParams};

// ============================================================================
// Image Batch
// ============================================================================

/// Dense `[B, C, H, W]` float batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBatch {
    pub data: Vec<f32>,
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl ImageBatch {
    /// Wrap raw data. Panics if the length does not match the shape.
    pub fn new(data: Vec<f32>, batch: usize, channels: usize, height: usize, width: usize) -> Self {
        assert_eq!(
            data.len(),
            batch * channels * height * width,
            "image batch data does not match shape [{batch}, {channels}, {height}, {width}]"
        );
        Self {
            data,
            batch,
            channels,
            height,
            width,
        }
    }

    pub fn zeros(batch: usize, channels: usize, height: usize, width: usize) -> Self {
        Self::new(vec![0.0; batch * channels * height * width], batch, channels, height, width)
    }

    pub fn shape(&self) -> [usize; 4] {
        [self.batch, self.channels, self.height, self.width]
    }

    fn sample_len(&self) -> usize {
        self.channels * self.height * self.width
    }

    #[inline]
    fn idx(&self, b: usize, c: usize, y: usize, x: usize) -> usize {
        ((b * self.channels + c) * self.height + y) * self.width + x
    }

    #[inline]
    pub fn get(&self, b: usize, c: usize, y: usize, x: usize) -> f32 {
        self.data[self.idx(b, c, y, x)]
    }

    #[inline]
    pub fn set(&mut self, b: usize, c: usize, y: usize, x: usize, value: f32) {
        let i = self.idx(b, c, y, x);
        self.data[i] = value;
    }

    fn frames(&self) -> Option<usize> {
        (self.channels % 3 == 0 && self.channels > 0).then_some(self.channels / 3)
    }

    /// Copy a `h x w` window of every sample, with per-sample origins.
    fn window(&self, origins: &[(usize, usize)], h: usize, w: usize) -> ImageBatch {
        let mut out = ImageBatch::zeros(self.batch, self.channels, h, w);
        for (b, &(oy, ox)) in origins.iter().enumerate() {
            for c in 0..self.channels {
                for y in 0..h {
                    let src = self.idx(b, c, oy + y, ox);
                    let dst = out.idx(b, c, y, 0);
                    out.data[dst..dst + w].copy_from_slice(&self.data[src..src + w]);
                }
            }
        }
        out
    }

    /// Paste every sample into a zero canvas at per-sample offsets.
    fn paste(&self, offsets: &[(usize, usize)], h: usize, w: usize) -> ImageBatch {
        let mut out = ImageBatch::zeros(self.batch, self.channels, h, w);
        for (b, &(oy, ox)) in offsets.iter().enumerate() {
            for c in 0..self.channels {
                for y in 0..self.height {
                    let src = self.idx(b, c, y, 0);
                    let dst = out.idx(b, c, oy + y, ox);
                    out.data[dst..dst + self.width]
                        .copy_from_slice(&self.data[src..src + self.width]);
                }
            }
        }
        out
    }
}

fn random_origins<R: Rng>(rng: &mut R, n: usize, max_y: usize, max_x: usize) -> Vec<(usize, usize)> {
    (0..n)
        .map(|_| (rng.gen_range(0..=max_y), rng.gen_range(0..=max_x)))
        .collect()
}

// ============================================================================
// Dispatch
// ============================================================================

/// Apply `kind` with `params` to a batch.
///
/// A parameter record that does not belong to `kind` leaves the batch
/// unchanged and logs a warning.
pub fn apply<R: Rng>(
    kind: AugmentationKind,
    params: &AugmentationParams,
    batch: ImageBatch,
    rng: &mut R,
) -> ImageBatch {
    use AugmentationKind as K;
    use AugmentationParams as P;

    match (kind, *params) {
        (K::NoAug, _) => batch,
        (K::Crop, P::Out { out }) => random_crop(batch, out, rng),
        (K::Grayscale, P::Probability { p }) => random_grayscale(batch, p, rng),
        (K::Cutout, P::Cutout { min_cut, max_cut }) => random_cutout(batch, min_cut, max_cut, false, rng),
        (K::CutoutColor, P::Cutout { min_cut, max_cut }) => {
            random_cutout(batch, min_cut, max_cut, true, rng)
        }
        (K::Flip, P::Probability { p }) => random_flip(batch, p, rng),
        (K::Rotate, P::Probability { p }) => random_rotation(batch, p, rng),
        (K::RandConv, _) => random_convolution(batch, rng),
        (K::ColorJitter | K::KorniaJitter, P::ColorJitter { bright, contrast, satur, hue }) => {
            color_jitter(batch, JitterStrength { bright, contrast, satur, hue }, rng)
        }
        (K::Translate, P::Size { size }) => random_translate(batch, size, rng),
        (K::CenterCrop, P::Out { out }) => center_crop(batch, out),
        (K::TranslateCc, P::CropSize { crop_sz }) => translate_center_crop(batch, crop_sz, rng),
        (K::InFrameTranslate, P::Size { size }) => in_frame_translate(batch, size, rng),
        (K::CropTranslate, P::Out { out }) => crop_translate(batch, out, rng),
        (K::CenterCropDrac, P::Out { out }) => center_crop_drac(batch, out, rng),
        (kind, params) => {
            log::warn!("parameters {params} do not apply to {kind}; batch left unchanged");
            batch
        }
    }
}

// ============================================================================
// Geometric Transforms
// ============================================================================

/// Random `out x out` crop per sample. Returns the input when `out` does not
/// fit inside the image.
pub fn random_crop<R: Rng>(batch: ImageBatch, out: usize, rng: &mut R) -> ImageBatch {
    if out == 0 || out > batch.height || out > batch.width {
        return batch;
    }
    let origins = random_origins(rng, batch.batch, batch.height - out, batch.width - out);
    batch.window(&origins, out, out)
}

/// Horizontal flip with probability `p` per sample.
pub fn random_flip<R: Rng>(mut batch: ImageBatch, p: f32, rng: &mut R) -> ImageBatch {
    let width = batch.width;
    for b in 0..batch.batch {
        if rng.gen::<f32>() >= p {
            continue;
        }
        for c in 0..batch.channels {
            for y in 0..batch.height {
                let start = batch.idx(b, c, y, 0);
                batch.data[start..start + width].reverse();
            }
        }
    }
    batch
}

/// With probability `p` per sample, rotate by a random multiple of 90 degrees.
/// Non-square images only receive 180 degree turns.
pub fn random_rotation<R: Rng>(mut batch: ImageBatch, p: f32, rng: &mut R) -> ImageBatch {
    let (h, w) = (batch.height, batch.width);
    let square = h == w;
    for b in 0..batch.batch {
        if rng.gen::<f32>() >= p {
            continue;
        }
        let turns = if square { rng.gen_range(1..=3) } else { 2 };
        for c in 0..batch.channels {
            let plane: Vec<f32> = (0..h * w)
                .map(|i| batch.get(b, c, i / w, i % w))
                .collect();
            for y in 0..h {
                for x in 0..w {
                    let (sy, sx) = match turns {
                        1 => (x, w - 1 - y),
                        2 => (h - 1 - y, w - 1 - x),
                        _ => (h - 1 - x, y),
                    };
                    batch.set(b, c, y, x, plane[sy * w + sx]);
                }
            }
        }
    }
    batch
}

/// Zero (or color) a random rectangle with sides in `[min_cut, max_cut)`.
pub fn random_cutout<R: Rng>(
    mut batch: ImageBatch,
    min_cut: usize,
    max_cut: usize,
    colored: bool,
    rng: &mut R,
) -> ImageBatch {
    let side = |rng: &mut R, limit: usize| -> usize {
        let side = if max_cut > min_cut {
            rng.gen_range(min_cut..max_cut)
        } else {
            min_cut
        };
        side.min(limit)
    };
    for b in 0..batch.batch {
        let ch = side(rng, batch.height);
        let cw = side(rng, batch.width);
        let oy = rng.gen_range(0..=batch.height - ch);
        let ox = rng.gen_range(0..=batch.width - cw);
        let fill: Vec<f32> = (0..batch.channels)
            .map(|_| if colored { rng.gen::<f32>() } else { 0.0 })
            .collect();
        for (c, &value) in fill.iter().enumerate() {
            for y in oy..oy + ch {
                let start = batch.idx(b, c, y, ox);
                batch.data[start..start + cw].fill(value);
            }
        }
    }
    batch
}

/// Place each sample at a random offset inside a `size x size` zero canvas.
pub fn random_translate<R: Rng>(batch: ImageBatch, size: usize, rng: &mut R) -> ImageBatch {
    if size <= batch.height || size <= batch.width {
        return batch;
    }
    let offsets = random_origins(rng, batch.batch, size - batch.height, size - batch.width);
    batch.paste(&offsets, size, size)
}

/// Keep the central `out x out` window and zero the border.
pub fn center_crop(mut batch: ImageBatch, out: usize) -> ImageBatch {
    if out >= batch.height || out >= batch.width {
        return batch;
    }
    let top = (batch.height - out) / 2;
    let left = (batch.width - out) / 2;
    for b in 0..batch.batch {
        for c in 0..batch.channels {
            for y in 0..batch.height {
                for x in 0..batch.width {
                    let inside = (top..top + out).contains(&y) && (left..left + out).contains(&x);
                    if !inside {
                        batch.set(b, c, y, x, 0.0);
                    }
                }
            }
        }
    }
    batch
}

/// Center crop to `crop_sz`, then translate back into the original frame.
pub fn translate_center_crop<R: Rng>(batch: ImageBatch, crop_sz: usize, rng: &mut R) -> ImageBatch {
    let (h, w) = (batch.height, batch.width);
    if crop_sz == 0 || crop_sz >= h || crop_sz >= w {
        return batch;
    }
    let center = vec![((h - crop_sz) / 2, (w - crop_sz) / 2); batch.batch];
    let cropped = batch.window(&center, crop_sz, crop_sz);
    let offsets = random_origins(rng, cropped.batch, h - crop_sz, w - crop_sz);
    cropped.paste(&offsets, h, w)
}

/// Translate inside a `size` canvas, then center-crop back to the original size.
pub fn in_frame_translate<R: Rng>(batch: ImageBatch, size: usize, rng: &mut R) -> ImageBatch {
    let (h, w) = (batch.height, batch.width);
    if size <= h || size <= w {
        return batch;
    }
    let translated = random_translate(batch, size, rng);
    let center = vec![((size - h) / 2, (size - w) / 2); translated.batch];
    translated.window(&center, h, w)
}

/// Random crop to `out`, then translate back into the original frame.
pub fn crop_translate<R: Rng>(batch: ImageBatch, out: usize, rng: &mut R) -> ImageBatch {
    let (h, w) = (batch.height, batch.width);
    if out == 0 || out >= h || out >= w {
        return batch;
    }
    let cropped = random_crop(batch, out, rng);
    let offsets = random_origins(rng, cropped.batch, h - out, w - out);
    cropped.paste(&offsets, h, w)
}

/// Zero-pad to an `out x out` canvas, then random-crop back to the original size.
pub fn center_crop_drac<R: Rng>(batch: ImageBatch, out: usize, rng: &mut R) -> ImageBatch {
    let (h, w) = (batch.height, batch.width);
    if out <= h || out <= w {
        return batch;
    }
    let center = vec![((out - h) / 2, (out - w) / 2); batch.batch];
    let padded = batch.paste(&center, out, out);
    let origins = random_origins(rng, padded.batch, out - h, out - w);
    padded.window(&origins, h, w)
}

// ============================================================================
// Color Transforms
// ============================================================================

const LUMA: [f32; 3] = [0.2989, 0.587, 0.114];

/// With probability `p` per sample, replace every RGB frame by its luma.
pub fn random_grayscale<R: Rng>(mut batch: ImageBatch, p: f32, rng: &mut R) -> ImageBatch {
    let Some(frames) = batch.frames() else {
        return batch;
    };
    let plane = batch.height * batch.width;
    for b in 0..batch.batch {
        if rng.gen::<f32>() >= p {
            continue;
        }
        let base = b * batch.sample_len();
        for f in 0..frames {
            let r = base + 3 * f * plane;
            for i in 0..plane {
                let gray = LUMA[0] * batch.data[r + i]
                    + LUMA[1] * batch.data[r + plane + i]
                    + LUMA[2] * batch.data[r + 2 * plane + i];
                batch.data[r + i] = gray;
                batch.data[r + plane + i] = gray;
                batch.data[r + 2 * plane + i] = gray;
            }
        }
    }
    batch
}

/// Maximum deviation of each jitter factor.
#[derive(Debug, Clone, Copy)]
pub struct JitterStrength {
    pub bright: f32,
    pub contrast: f32,
    pub satur: f32,
    pub hue: f32,
}

fn factor<R: Rng>(rng: &mut R, strength: f32) -> f32 {
    let strength = strength.max(0.0);
    if strength == 0.0 {
        return 1.0;
    }
    rng.gen_range((1.0 - strength).max(0.0)..=1.0 + strength)
}

/// Random brightness, contrast, saturation and hue per sample.
///
/// Hue is rotated in YIQ space by up to `hue * PI` radians.
pub fn color_jitter<R: Rng>(mut batch: ImageBatch, strength: JitterStrength, rng: &mut R) -> ImageBatch {
    let Some(frames) = batch.frames() else {
        return batch;
    };
    let plane = batch.height * batch.width;
    let max_hue = strength.hue.clamp(0.0, 1.0);
    for b in 0..batch.batch {
        let brightness = factor(rng, strength.bright);
        let contrast = factor(rng, strength.contrast);
        let saturation = factor(rng, strength.satur);
        let hue = if max_hue > 0.0 { rng.gen_range(-max_hue..=max_hue) } else { 0.0 };
        let (sin, cos) = (hue * std::f32::consts::PI).sin_cos();

        let base = b * batch.sample_len();
        for f in 0..frames {
            let r0 = base + 3 * f * plane;
            let (g0, b0) = (r0 + plane, r0 + 2 * plane);

            let mut mean_gray = 0.0;
            for i in 0..plane {
                for start in [r0, g0, b0] {
                    batch.data[start + i] = (batch.data[start + i] * brightness).clamp(0.0, 1.0);
                }
                mean_gray += LUMA[0] * batch.data[r0 + i]
                    + LUMA[1] * batch.data[g0 + i]
                    + LUMA[2] * batch.data[b0 + i];
            }
            mean_gray /= plane as f32;

            for i in 0..plane {
                let mut rgb = [batch.data[r0 + i], batch.data[g0 + i], batch.data[b0 + i]];
                for v in rgb.iter_mut() {
                    *v = ((*v - mean_gray) * contrast + mean_gray).clamp(0.0, 1.0);
                }
                let gray = LUMA[0] * rgb[0] + LUMA[1] * rgb[1] + LUMA[2] * rgb[2];
                for v in rgb.iter_mut() {
                    *v = (gray + (*v - gray) * saturation).clamp(0.0, 1.0);
                }
                if hue != 0.0 {
                    let y = 0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2];
                    let ci = 0.596 * rgb[0] - 0.274 * rgb[1] - 0.322 * rgb[2];
                    let cq = 0.211 * rgb[0] - 0.523 * rgb[1] + 0.312 * rgb[2];
                    let (i2, q2) = (ci * cos - cq * sin, ci * sin + cq * cos);
                    rgb = [
                        y + 0.956 * i2 + 0.621 * q2,
                        y - 0.272 * i2 - 0.647 * q2,
                        y - 1.106 * i2 + 1.703 * q2,
                    ];
                }
                batch.data[r0 + i] = rgb[0].clamp(0.0, 1.0);
                batch.data[g0 + i] = rgb[1].clamp(0.0, 1.0);
                batch.data[b0 + i] = rgb[2].clamp(0.0, 1.0);
            }
        }
    }
    batch
}

/// One random 3x3 RGB-to-RGB convolution per batch, zero padded.
pub fn random_convolution<R: Rng>(batch: ImageBatch, rng: &mut R) -> ImageBatch {
    let Some(frames) = batch.frames() else {
        return batch;
    };
    let (h, w) = (batch.height as isize, batch.width as isize);
    // He-normal scale for fan_in = 3 * 3 * 3, drawn as a uniform with equal variance
    let bound = (3.0f32 * 2.0 / 27.0).sqrt();
    let kernel: Vec<f32> = (0..3 * 3 * 9).map(|_| rng.gen_range(-bound..=bound)).collect();

    let mut out = ImageBatch::zeros(batch.batch, batch.channels, batch.height, batch.width);
    for b in 0..batch.batch {
        for f in 0..frames {
            for oc in 0..3 {
                for y in 0..h {
                    for x in 0..w {
                        let mut acc = 0.0;
                        for ic in 0..3 {
                            for ky in -1..=1isize {
                                for kx in -1..=1isize {
                                    let (sy, sx) = (y + ky, x + kx);
                                    if sy < 0 || sx < 0 || sy >= h || sx >= w {
                                        continue;
                                    }
                                    let weight =
                                        kernel[((oc * 3 + ic) * 3 + (ky + 1) as usize) * 3 + (kx + 1) as usize];
                                    acc += weight * batch.get(b, 3 * f + ic, sy as usize, sx as usize);
                                }
                            }
                        }
                        out.set(b, 3 * f + oc, y as usize, x as usize, acc);
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ramp(batch: usize, channels: usize, size: usize) -> ImageBatch {
        let len = batch * channels * size * size;
        let data = (0..len).map(|i| (i % 97) as f32 / 97.0).collect();
        ImageBatch::new(data, batch, channels, size, size)
    }

    #[test]
    fn test_no_aug_is_identity() {
        let mut rng = StdRng::seed_from_u64(0);
        let batch = ramp(2, 3, 8);
        let out = apply(AugmentationKind::NoAug, &AugmentationParams::None, batch.clone(), &mut rng);
        assert_eq!(out, batch);
    }

    #[test]
    fn test_crop_output_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = random_crop(ramp(4, 6, 10), 8, &mut rng);
        assert_eq!(out.shape(), [4, 6, 8, 8]);
    }

    #[test]
    fn test_translate_output_shape_and_mass() {
        let mut rng = StdRng::seed_from_u64(2);
        let batch = ramp(3, 3, 6);
        let total: f32 = batch.data.iter().sum();
        let out = random_translate(batch, 10, &mut rng);
        assert_eq!(out.shape(), [3, 3, 10, 10]);
        let moved: f32 = out.data.iter().sum();
        assert!((total - moved).abs() < 1e-3);
    }

    #[test]
    fn test_size_preserving_transforms() {
        let mut rng = StdRng::seed_from_u64(3);
        let batch = ramp(2, 3, 12);
        for out in [
            center_crop(batch.clone(), 8),
            translate_center_crop(batch.clone(), 8, &mut rng),
            in_frame_translate(batch.clone(), 16, &mut rng),
            crop_translate(batch.clone(), 8, &mut rng),
            center_crop_drac(batch.clone(), 16, &mut rng),
            random_convolution(batch.clone(), &mut rng),
        ] {
            assert_eq!(out.shape(), batch.shape());
        }
    }

    #[test]
    fn test_flip_probability_one_reverses_rows() {
        let mut rng = StdRng::seed_from_u64(4);
        let batch = ramp(1, 3, 4);
        let out = random_flip(batch.clone(), 1.0, &mut rng);
        for c in 0..3 {
            for y in 0..4 {
                for x in 0..4 {
                    assert_eq!(out.get(0, c, y, x), batch.get(0, c, y, 3 - x));
                }
            }
        }
    }

    #[test]
    fn test_probability_zero_is_identity() {
        let mut rng = StdRng::seed_from_u64(5);
        let batch = ramp(3, 3, 5);
        assert_eq!(random_flip(batch.clone(), 0.0, &mut rng), batch);
        assert_eq!(random_rotation(batch.clone(), 0.0, &mut rng), batch);
        assert_eq!(random_grayscale(batch.clone(), 0.0, &mut rng), batch);
    }

    #[test]
    fn test_grayscale_equalizes_channels() {
        let mut rng = StdRng::seed_from_u64(6);
        let out = random_grayscale(ramp(2, 6, 4), 1.0, &mut rng);
        for b in 0..2 {
            for f in 0..2 {
                let r = out.get(b, 3 * f, 1, 2);
                assert_eq!(r, out.get(b, 3 * f + 1, 1, 2));
                assert_eq!(r, out.get(b, 3 * f + 2, 1, 2));
            }
        }
    }

    #[test]
    fn test_cutout_zeroes_a_rectangle() {
        let mut rng = StdRng::seed_from_u64(7);
        let batch = ImageBatch::new(vec![1.0; 2 * 3 * 16 * 16], 2, 3, 16, 16);
        let out = random_cutout(batch, 4, 6, false, &mut rng);
        for b in 0..2 {
            let zeros = (0..16 * 16).filter(|i| out.get(b, 0, i / 16, i % 16) == 0.0).count();
            assert!((16..=25).contains(&zeros), "cutout area {zeros} outside [16, 25]");
        }
    }

    #[test]
    fn test_rotation_preserves_values() {
        let mut rng = StdRng::seed_from_u64(8);
        let batch = ramp(1, 3, 5);
        let out = random_rotation(batch.clone(), 1.0, &mut rng);
        let mut before = batch.data.clone();
        let mut after = out.data.clone();
        before.sort_by(|a, b| a.total_cmp(b));
        after.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(before, after);
    }

    #[test]
    fn test_color_jitter_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(9);
        let strength = JitterStrength { bright: 0.6, contrast: 0.6, satur: 0.6, hue: 0.7 };
        let out = color_jitter(ramp(4, 3, 6), strength, &mut rng);
        assert!(out.data.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_mismatched_params_leave_batch() {
        let mut rng = StdRng::seed_from_u64(10);
        let batch = ramp(1, 3, 4);
        let out = apply(
            AugmentationKind::Cutout,
            &AugmentationParams::Probability { p: 1.0 },
            batch.clone(),
            &mut rng,
        );
        assert_eq!(out, batch);
    }

    #[test]
    fn test_same_seed_same_output() {
        let batch = ramp(3, 3, 8);
        let a = translate_center_crop(batch.clone(), 6, &mut StdRng::seed_from_u64(11));
        let b = translate_center_crop(batch, 6, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }
}
