//! Linear layer with orthogonal weight initialization.
//!
//! Fully connected layers of the actor, critic and encoder start from
//! orthogonal weights and zero bias.
//!
//! # Gain Values
//!
//! - 1.0: Linear/Identity activations
//! - sqrt(2) ≈ 1.41: ReLU activations

use burn::module::{Module, Param};
use burn::prelude::*;
use burn::tensor::Distribution;

/// Configuration for OrthogonalLinear layer.
#[derive(Debug, Clone)]
pub struct OrthogonalLinearConfig {
    pub d_input: usize,
    pub d_output: usize,
    /// Scale applied to the orthogonal weights.
    pub gain: f64,
}

impl OrthogonalLinearConfig {
    pub fn new(d_input: usize, d_output: usize) -> Self {
        Self {
            d_input,
            d_output,
            gain: 1.0,
        }
    }

    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> OrthogonalLinear<B> {
        let weight = orthogonal_weights::<B>(self.d_output, self.d_input, self.gain, device);
        OrthogonalLinear {
            weight: Param::from_tensor(weight),
            bias: Param::from_tensor(Tensor::zeros([self.d_output], device)),
            d_input: self.d_input,
            d_output: self.d_output,
        }
    }
}

/// Linear layer `y = x W^T + b` with orthogonally initialized `W`.
#[derive(Module, Debug)]
pub struct OrthogonalLinear<B: Backend> {
    /// Weight matrix of shape [d_output, d_input]
    pub weight: Param<Tensor<B, 2>>,
    /// Bias of shape [d_output]
    pub bias: Param<Tensor<B, 1>>,
    d_input: usize,
    d_output: usize,
}

impl<B: Backend> OrthogonalLinear<B> {
    /// `[batch, d_input] -> [batch, d_output]`
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        input.matmul(self.weight.val().transpose()) + self.bias.val().unsqueeze_dim(0)
    }

    pub fn d_input(&self) -> usize {
        self.d_input
    }

    pub fn d_output(&self) -> usize {
        self.d_output
    }
}

/// Orthogonal `[rows, cols]` matrix scaled by `gain`.
///
/// Orthonormalizes the columns of a Gaussian matrix (rows when the matrix is
/// wide) with modified Gram-Schmidt.
pub fn orthogonal_weights<B: Backend>(rows: usize, cols: usize, gain: f64, device: &B::Device) -> Tensor<B, 2> {
    let orthogonal = if rows >= cols {
        let random = Tensor::<B, 2>::random([rows, cols], Distribution::Normal(0.0, 1.0), device);
        orthonormal_columns(random)
    } else {
        let random = Tensor::<B, 2>::random([cols, rows], Distribution::Normal(0.0, 1.0), device);
        orthonormal_columns(random).transpose()
    };
    orthogonal.mul_scalar(gain as f32)
}

fn orthonormal_columns<B: Backend>(matrix: Tensor<B, 2>) -> Tensor<B, 2> {
    let [rows, cols] = matrix.dims();
    let mut basis: Vec<Tensor<B, 2>> = Vec::with_capacity(cols);
    for i in 0..cols {
        let mut v = matrix.clone().slice([0..rows, i..i + 1]);
        for u in &basis {
            let dot = (v.clone() * u.clone()).sum().unsqueeze::<2>();
            v = v - u.clone() * dot;
        }
        let norm = v.clone().powf_scalar(2.0).sum().sqrt().add_scalar(1e-10).unsqueeze::<2>();
        basis.push(v / norm);
    }
    Tensor::cat(basis, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::ElementConversion;

    type TestBackend = NdArray<f32>;

    fn deviation_from_identity(product: Tensor<TestBackend, 2>, n: usize) -> f32 {
        let identity = Tensor::<TestBackend, 2>::eye(n, &Default::default());
        (product - identity).abs().mean().into_scalar().elem()
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let linear: OrthogonalLinear<TestBackend> = OrthogonalLinearConfig::new(4, 3).init(&device);
        let input = Tensor::random([2, 4], Distribution::Normal(0.0, 1.0), &device);
        assert_eq!(linear.forward(input).dims(), [2, 3]);
    }

    #[test]
    fn test_tall_matrix_has_orthonormal_columns() {
        let weights = orthogonal_weights::<TestBackend>(8, 4, 1.0, &Default::default());
        assert_eq!(weights.dims(), [8, 4]);
        let product = weights.clone().transpose().matmul(weights);
        assert!(deviation_from_identity(product, 4) < 1e-3);
    }

    #[test]
    fn test_wide_matrix_has_orthonormal_rows() {
        let weights = orthogonal_weights::<TestBackend>(3, 9, 1.0, &Default::default());
        assert_eq!(weights.dims(), [3, 9]);
        let product = weights.clone().matmul(weights.transpose());
        assert!(deviation_from_identity(product, 3) < 1e-3);
    }

    #[test]
    fn test_gain_scales_norm() {
        let weights = orthogonal_weights::<TestBackend>(5, 5, 2.0, &Default::default());
        let product = weights.clone().matmul(weights.transpose()).div_scalar(4.0);
        assert!(deviation_from_identity(product, 5) < 1e-3);
    }

    #[test]
    fn test_bias_starts_at_zero() {
        let linear: OrthogonalLinear<TestBackend> =
            OrthogonalLinearConfig::new(6, 2).init(&Default::default());
        let bias: f32 = linear.bias.val().abs().sum().into_scalar().elem();
        assert_eq!(bias, 0.0);
    }
}
