//! Self-play training pipeline
//!
//! - [`TrainingSession`] plays unattended games and drives persistence
//! - observers report progress and collect metrics

pub mod observers;
pub mod training;

pub use observers::{MetricsHandle, MetricsObserver, MetricsSummary, ProgressObserver};
pub use training::{TrainingResult, TrainingSession};

pub use crate::ports::Observer;
