//! Contrastive head: bilinear similarity between anchor and positive codes.

use burn::module::{Module, Param};
use burn::prelude::*;
use burn::tensor::Distribution;

#[derive(Module, Debug)]
pub struct CurlHead<B: Backend> {
    /// Bilinear weight `[z_dim, z_dim]`.
    pub w: Param<Tensor<B, 2>>,
}

impl<B: Backend> CurlHead<B> {
    pub fn new(z_dim: usize, device: &B::Device) -> Self {
        Self {
            w: Param::from_tensor(Tensor::random([z_dim, z_dim], Distribution::Default, device)),
        }
    }

    /// `logits[i, j] = z_a[i] · W · z_pos[j]`, shifted so each row's max is 0.
    ///
    /// Row `i`'s positive is column `i`.
    pub fn compute_logits(&self, z_a: Tensor<B, 2>, z_pos: Tensor<B, 2>) -> Tensor<B, 2> {
        let wz = self.w.val().matmul(z_pos.transpose());
        let logits = z_a.matmul(wz);
        let row_max = logits.clone().max_dim(1);
        logits - row_max
    }
}
