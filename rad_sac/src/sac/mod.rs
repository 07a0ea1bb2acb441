//! Soft Actor-Critic with augmented critic batches.
//!
//! - [`CriticLossEvaluator`]: TD regression loss, also the augmentation score
//! - [`Temperature`]: learnable α with target entropy `-|A|`
//! - [`RadSacAgent`]: the per-step update (critic, actor + α, target networks)

mod agent;
mod critic_loss;
pub mod losses;
mod temperature;
mod traits;


pub use agent::{RadSacAgent, UpdateInfo};
pub use critic_loss::{CriticLoss, CriticLossEvaluator};
pub use temperature::Temperature;
pub use traits::{ActorOutput, CriticOutput, SacActor, SacCritic};
