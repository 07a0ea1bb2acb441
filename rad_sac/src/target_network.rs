//! Polyak averaging for target networks.
//!
//! ```text
//! θ_target = τ * θ_online + (1 - τ) * θ_target
//! ```
//!
//! The target critic's Q-functions track the online ones with `critic_tau`
//! and its encoder with `encoder_tau`; both go through [`soft_update`].

use burn::module::{Module, ModuleMapper, Param};
use burn::prelude::*;

/// Collects every float parameter of a module, flattened, in traversal order.
struct ParamExtractor<B: Backend> {
    params: Vec<Tensor<B, 1>>,
}

impl<B: Backend> ModuleMapper<B> for ParamExtractor<B> {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let val = param.val();
        let total_size: usize = val.dims().iter().product();
        self.params.push(val.reshape([total_size]));
        param
    }
}

/// Interpolates target parameters toward the extracted online ones.
///
/// Parameters are matched by traversal order, not by ParamId, so two
/// independently created modules of the same architecture line up.
struct SoftUpdateMapper<B: Backend> {
    online_params: Vec<Tensor<B, 1>>,
    tau: f32,
    index: usize,
}

impl<B: Backend> ModuleMapper<B> for SoftUpdateMapper<B> {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let idx = self.index;
        self.index += 1;

        let Some(online) = self.online_params.get(idx) else {
            log::warn!("soft update: target has more parameters than online module");
            return param;
        };
        let target_val = param.val();
        let shape = target_val.dims();
        let total_size: usize = shape.iter().product();
        if online.dims()[0] != total_size {
            log::warn!("soft update: parameter {idx} size mismatch, keeping target");
            return param;
        }

        let interpolated = online.clone().mul_scalar(self.tau)
            + target_val.reshape([total_size]).mul_scalar(1.0 - self.tau);
        Param::initialized(param.id.clone(), interpolated.reshape(shape).detach())
    }
}

/// Soft update `target` toward `online` with coefficient `tau`.
///
/// `tau == 1` copies the online module, `tau == 0` returns the target as is.
/// The result carries no autodiff history.
pub fn soft_update<B, M>(online: &M, target: M, tau: f32) -> M
where
    B: Backend,
    M: Module<B>,
{
    if (tau - 1.0).abs() < 1e-6 {
        return online.clone().no_grad();
    }
    if tau.abs() < 1e-6 {
        return target;
    }

    let mut extractor = ParamExtractor { params: Vec::new() };
    let _ = online.clone().map(&mut extractor);

    let mut updater = SoftUpdateMapper {
        online_params: extractor.params,
        tau,
        index: 0,
    };
    target.map(&mut updater).no_grad()
}
