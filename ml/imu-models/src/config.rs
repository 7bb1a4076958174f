//! Model configuration shared by all IMU models.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use imu_training::ClassWeights;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

const fn default_image_feature() -> usize {
    512
}

const fn default_hidden_size() -> usize {
    512
}

const fn default_num_layers() -> usize {
    1
}

/// Hyperparameters of an IMU model.
///
/// Built once by the training driver and read-only afterwards. Each model
/// validates the fields it depends on at construction.
///
/// # Example
///
/// ```
/// use imu_models::ModelConfig;
///
/// let config = ModelConfig::new(5, 5, 3, vec![0, 2, 4])
///     .with_hidden_size(64)
///     .with_image_feature(128);
/// assert_eq!(config.imus, vec![0, 2, 4]);
/// assert!(!config.regression);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of frames per dataset sample.
    pub sequence_length: usize,

    /// Frames fed to the model.
    pub input_length: usize,

    /// Frames scored against the target.
    pub output_length: usize,

    /// Selected IMU channels, in head order.
    pub imus: Vec<usize>,

    /// Regress IMU vectors instead of classifying them.
    #[serde(default)]
    pub regression: bool,

    /// Start the backbone from pretrained weights.
    #[serde(default)]
    pub pretrain: bool,

    /// Burn record holding the pretrained backbone, required with `pretrain`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backbone_weights: Option<PathBuf>,

    /// Width of each precomputed image embedding.
    #[serde(default = "default_image_feature")]
    pub image_feature: usize,

    /// Recurrent hidden size.
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,

    /// Number of stacked LSTM layers.
    #[serde(default = "default_num_layers")]
    pub num_layers: usize,

    /// Class weights for the selected IMUs, one row per entry of `imus`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_weights: Option<ClassWeights>,
}

impl ModelConfig {
    /// Creates a configuration with default sizes.
    #[must_use]
    pub const fn new(
        sequence_length: usize,
        input_length: usize,
        output_length: usize,
        imus: Vec<usize>,
    ) -> Self {
        Self {
            sequence_length,
            input_length,
            output_length,
            imus,
            regression: false,
            pretrain: false,
            backbone_weights: None,
            image_feature: default_image_feature(),
            hidden_size: default_hidden_size(),
            num_layers: default_num_layers(),
            class_weights: None,
        }
    }

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Serialization`] on malformed JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Io`] if the file can't be read and
    /// [`ModelError::Serialization`] on malformed JSON.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Sets regression mode.
    #[must_use]
    pub const fn with_regression(mut self, regression: bool) -> Self {
        self.regression = regression;
        self
    }

    /// Enables pretrained backbone weights from a Burn record.
    #[must_use]
    pub fn with_pretrained_backbone(mut self, path: impl Into<PathBuf>) -> Self {
        self.pretrain = true;
        self.backbone_weights = Some(path.into());
        self
    }

    /// Sets the image embedding width.
    #[must_use]
    pub const fn with_image_feature(mut self, image_feature: usize) -> Self {
        self.image_feature = image_feature;
        self
    }

    /// Sets the recurrent hidden size.
    #[must_use]
    pub const fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    /// Sets the number of LSTM layers.
    #[must_use]
    pub const fn with_num_layers(mut self, num_layers: usize) -> Self {
        self.num_layers = num_layers;
        self
    }

    /// Sets the per-IMU class weights.
    #[must_use]
    pub fn with_class_weights(mut self, class_weights: ClassWeights) -> Self {
        self.class_weights = Some(class_weights);
        self
    }

    /// Selects this configuration's rows from the dataset's global class weight table.
    ///
    /// # Errors
    ///
    /// Returns an error if an IMU index has no row in `global`.
    pub fn with_dataset_class_weights(mut self, global: &[Vec<f32>]) -> Result<Self> {
        self.class_weights = Some(ClassWeights::select(global, &self.imus)?);
        Ok(self)
    }

    /// Checks the preconditions of the sequence-to-IMU classifier and
    /// returns its class weights.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] naming the first violated rule.
    pub fn validate_sequence(&self) -> Result<&ClassWeights> {
        if self.sequence_length != self.input_length {
            return Err(ModelError::invalid_config(format!(
                "sequence_length ({}) must equal input_length ({})",
                self.sequence_length, self.input_length
            )));
        }
        if self.input_length < self.output_length {
            return Err(ModelError::invalid_config(format!(
                "input_length ({}) must be >= output_length ({})",
                self.input_length, self.output_length
            )));
        }
        if self.output_length == 0 {
            return Err(ModelError::invalid_config("output_length must be > 0"));
        }
        self.validate_imus()?;
        if self.image_feature == 0 || self.hidden_size == 0 || self.num_layers == 0 {
            return Err(ModelError::invalid_config(
                "image_feature, hidden_size and num_layers must be > 0",
            ));
        }
        let weights = self
            .class_weights
            .as_ref()
            .ok_or_else(|| ModelError::invalid_config("class_weights are required"))?;
        if weights.num_imus() != self.imus.len() {
            return Err(ModelError::invalid_config(format!(
                "class_weights has {} rows for {} imus",
                weights.num_imus(),
                self.imus.len()
            )));
        }
        Ok(weights)
    }

    /// Checks the preconditions of the pairwise-frame regressor.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] naming the first violated rule.
    pub fn validate_regression(&self) -> Result<()> {
        if self.sequence_length != 1 {
            return Err(ModelError::invalid_config(format!(
                "pairwise regression supports sequence_length = 1, got {}",
                self.sequence_length
            )));
        }
        if !self.regression {
            return Err(ModelError::invalid_config("regression must be true"));
        }
        self.validate_imus()?;
        if self.pretrain && self.backbone_weights.is_none() {
            return Err(ModelError::invalid_config(
                "pretrain requires backbone_weights",
            ));
        }
        Ok(())
    }

    fn validate_imus(&self) -> Result<()> {
        if self.imus.is_empty() {
            return Err(ModelError::invalid_config("imus must not be empty"));
        }
        let mut seen = HashSet::with_capacity(self.imus.len());
        if let Some(dup) = self.imus.iter().find(|imu| !seen.insert(**imu)) {
            return Err(ModelError::invalid_config(format!("imu {dup} listed twice")));
        }
        Ok(())
    }
}
