//! Learnable entropy coefficient.
//!
//! α is parameterized as `exp(log_alpha)` and tuned by dual gradient descent:
//! ```text
//! min_α E[α * (-log π - H_target)]
//! ```

use burn::module::{Module, Param};
use burn::prelude::*;
use burn::tensor::ElementConversion;

#[derive(Module, Debug)]
pub struct Temperature<B: Backend> {
    log_alpha: Param<Tensor<B, 1>>,
}

impl<B: Backend> Temperature<B> {
    pub fn new(initial_alpha: f32, device: &B::Device) -> Self {
        Self {
            log_alpha: Param::from_tensor(Tensor::from_floats([initial_alpha.ln()], device)),
        }
    }

    /// `exp(log_alpha)` as a one-element tensor.
    pub fn alpha_tensor(&self) -> Tensor<B, 1> {
        self.log_alpha.val().exp()
    }

    pub fn alpha(&self) -> f32 {
        self.alpha_tensor().into_scalar().elem::<f32>()
    }

    /// `mean(α * (-log π - H_target))` with `log_prob` treated as a constant.
    pub fn loss(&self, log_prob: Tensor<B, 2>, target_entropy: f32) -> Tensor<B, 1> {
        let gap = log_prob.detach().neg().sub_scalar(target_entropy).mean();
        self.alpha_tensor() * gap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::{AdamConfig, GradientsParams, Optimizer};

    type B = Autodiff<NdArray<f32>>;

    #[test]
    fn test_initial_alpha() {
        let temperature = Temperature::<B>::new(0.1, &Default::default());
        assert!((temperature.alpha() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_loss_value() {
        let device = Default::default();
        let temperature = Temperature::<B>::new(0.5, &device);
        let log_prob = Tensor::<B, 2>::from_floats([[1.0], [3.0]], &device);

        // 0.5 * (-(2) - (-2)) = 0
        let loss: f32 = temperature.loss(log_prob, -2.0).into_scalar().elem();
        assert!(loss.abs() < 1e-6);
    }

    #[test]
    fn test_alpha_grows_when_entropy_too_low() {
        let device = Default::default();
        let mut temperature = Temperature::<B>::new(0.1, &device);
        let mut optimizer = AdamConfig::new().init::<B, Temperature<B>>();

        // log π far above -H_target means entropy is below target
        let log_prob = Tensor::<B, 2>::full([8, 1], 5.0, &device);
        for _ in 0..10 {
            let loss = temperature.loss(log_prob.clone(), -1.0);
            let grads = GradientsParams::from_grads(loss.backward(), &temperature);
            temperature = optimizer.step(1e-2, temperature, grads);
        }
        assert!(temperature.alpha() > 0.1);
    }
}
