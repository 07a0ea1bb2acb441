//! Model checkpointing.
//!
//! ```rust,ignore
//! let checkpointer = Checkpointer::new("./checkpoints")?;
//! checkpointer.save(ACTOR_PREFIX, &actor, step)?;
//! let actor = checkpointer.load(ACTOR_PREFIX, template, step, &device)?;
//! ```

pub mod checkpointer;

pub use checkpointer::{CheckpointError, Checkpointer, ACTOR_PREFIX, CRITIC_PREFIX, CURL_PREFIX};
