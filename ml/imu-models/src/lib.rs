//! Burn model heads inferring dog IMU readings from video frames.
//!
//! Two architectures share the [`ImuModel`] contract consumed by an external
//! training driver:
//!
//! - [`SequenceToImu`] - Embeds a window of precomputed frame features, runs
//!   them through a stacked LSTM and classifies every selected IMU channel at
//!   each of the first `output_length` steps
//! - [`PairwiseFrameRegressor`] - Passes two stacked RGB frames through a
//!   shared [`ResNet18`] and regresses one quaternion per IMU channel
//!
//! Each model reports its loss, optional optimizer settings, learning-rate
//! schedule and the metric evaluators the driver should run. Losses,
//! schedules and metrics live in `imu-training`.
//!
//! # Checkpoint Persistence
//!
//! Weights are saved and loaded with Burn's recorders in binary or JSON
//! form. The pairwise regressor loads its pretrained backbone this way.
//!
//! # Example
//!
//! ```ignore
//! use imu_models::{ImuModel, ModelConfig, SequenceToImu};
//! use imu_training::{ClassWeights, ImuLoss};
//!
//! let config = ModelConfig::from_json_file("run.json")?;
//! let model = SequenceToImu::<MyBackend>::new(&config, &device)?;
//!
//! let output = model.forward(embeddings, classes);
//! let loss = model.loss().forward(&output);
//! let lr = model.learning_rate(epoch)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod backbone;
mod checkpoint;
mod config;
mod error;
mod model;
mod pairwise;
mod recurrent;
mod sequence;

// Re-export models
pub use model::ImuModel;
pub use pairwise::{
    ImuHead, PAIR_FEATURES, PAIRWISE_LR_SCHEDULE, PairwiseFrameRegressor, QUATERNION_DIM,
    normalize_quaternions,
};
pub use sequence::{SEQUENCE_BASE_LR, SEQUENCE_LR_SCHEDULE, SequenceToImu};

// Re-export building blocks
pub use backbone::{BasicBlock, Downsample, RESNET18_FEATURES, RGB_CHANNELS, ResNet18};
pub use recurrent::RecurrentHead;

// Re-export configuration
pub use config::ModelConfig;

// Re-export checkpoint utilities
pub use checkpoint::{CheckpointFormat, load_checkpoint, save_checkpoint};

// Re-export error types
pub use error::{ModelError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        CheckpointFormat, ImuModel, ModelConfig, ModelError, PairwiseFrameRegressor,
        SequenceToImu, load_checkpoint, normalize_quaternions, save_checkpoint,
    };
}
