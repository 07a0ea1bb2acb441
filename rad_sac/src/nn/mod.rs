//! Network building blocks.

mod actor;
mod critic;
mod curl;
mod encoder;
mod orthogonal;

pub use actor::{gaussian_log_prob, squash, PixelActor, PixelActorConfig};
pub use critic::{PixelCritic, PixelCriticConfig, QFunction};
pub use curl::CurlHead;
pub use encoder::{Encoder, EncoderConfig};
pub use orthogonal::{orthogonal_weights, OrthogonalLinear, OrthogonalLinearConfig};
