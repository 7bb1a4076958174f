//! Training primitives for dog IMU inference models.
//!
//! This crate holds everything a model hands to an external training
//! driver, independent of any particular architecture:
//!
//! # Model Output
//!
//! - [`ModelOutput`] - The `(prediction, target, output_indices)` triple
//!
//! # Loss Functions
//!
//! - [`MultiLabelCrossEntropyLoss`] - Per-IMU weighted cross-entropy
//! - [`ImuMseLoss`] - Mean squared error for regressed IMU vectors
//! - [`ClassWeights`] - Per-IMU class weight table
//!
//! # Optimization
//!
//! - [`OptimizerConfig`] - Adam/AdamW settings convertible to Burn configs
//! - [`StepDecay`] - 1-indexed step-decay learning-rate schedule
//!
//! # Metrics
//!
//! - [`SequenceMultiClassMetric`] - Per-step class accuracy
//! - [`AngleEvaluationMetric`] - Mean rotation error in degrees
//! - [`AngleClassificationMetric`] - Nearest-centroid agreement
//!
//! # Example
//!
//! ```
//! use imu_training::StepDecay;
//!
//! let schedule = StepDecay::new(0.001, 0.1, 90, 3);
//! assert!(schedule.rate(91).is_ok());
//! assert!(schedule.rate(0).is_err());
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
mod error;
mod loss;
mod metrics;
mod output;
mod weights;

// Re-export configuration
pub use config::{OptimizerConfig, OptimizerType, StepDecay};

// Re-export loss functions
pub use loss::{ImuLoss, ImuMseLoss, MultiLabelCrossEntropyLoss};
pub use weights::ClassWeights;

// Re-export metrics
pub use metrics::{
    AngleClassificationMetric, AngleEvaluationMetric, Metric, MetricKind, QuaternionCentroids,
    SequenceMultiClassMetric, angle_degrees,
};

// Re-export output triple
pub use output::ModelOutput;

// Re-export error types
pub use error::{Result, TrainingError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        AngleClassificationMetric, AngleEvaluationMetric, ClassWeights, ImuLoss, ImuMseLoss,
        Metric, MetricKind, ModelOutput, MultiLabelCrossEntropyLoss, OptimizerConfig,
        OptimizerType, QuaternionCentroids, SequenceMultiClassMetric, StepDecay, TrainingError,
    };
}
