//! Error types for imu-training crate.

use thiserror::Error;

/// Errors raised by losses, schedules and metric evaluators.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Epoch numbers are 1-indexed.
    #[error("invalid epoch {0}: epochs start at 1")]
    InvalidEpoch(usize),

    /// Tensor shape does not match what the evaluator expects.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected shape.
        expected: String,
        /// Actual shape.
        actual: String,
    },

    /// Angle metrics on class predictions need a centroid table.
    #[error("metric {0} requires a class centroid table")]
    MissingCentroids(&'static str),

    /// Tensor data could not be read back to the host.
    #[error("tensor data error: {0}")]
    Data(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TrainingError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Creates a shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a tensor data error.
    #[must_use]
    pub fn data(reason: impl Into<String>) -> Self {
        Self::Data(reason.into())
    }
}

impl From<std::io::Error> for TrainingError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TrainingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for training operations.
pub type Result<T> = std::result::Result<T, TrainingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_invalid_config() {
        let err = TrainingError::invalid_config("step_size must be > 0");
        assert!(err.to_string().contains("invalid configuration"));
        assert!(err.to_string().contains("step_size"));
    }

    #[test]
    fn error_invalid_epoch() {
        let err = TrainingError::InvalidEpoch(0);
        assert!(err.to_string().contains("epoch 0"));
    }

    #[test]
    fn error_shape_mismatch() {
        let err = TrainingError::shape_mismatch("[2, 3, 4, 4]", "[2, 3, 4, 7]");
        assert!(err.to_string().contains("[2, 3, 4, 4]"));
        assert!(err.to_string().contains("[2, 3, 4, 7]"));
    }

    #[test]
    fn error_missing_centroids() {
        let err = TrainingError::MissingCentroids("angle_evaluation");
        assert!(err.to_string().contains("angle_evaluation"));
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: TrainingError = io_err.into();
        assert!(matches!(err, TrainingError::Io(_)));
    }

    #[test]
    fn error_from_json_error() {
        let json_err = serde_json::from_str::<Vec<f32>>("[1.0,").unwrap_err();
        let err: TrainingError = json_err.into();
        assert!(matches!(err, TrainingError::Serialization(_)));
        assert!(err.to_string().starts_with("serialization error"));
    }
}
