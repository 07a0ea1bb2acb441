//! Training metrics.
//!
//! Metric names follow a `section/metric` scheme, e.g. `train/Q1 loss`,
//! `train_actor/loss`, `train_alpha/value`.

pub mod logger;

pub use logger::{ConsoleLogger, CsvLogger, MultiLogger, NullLogger, TrainingLogger};
