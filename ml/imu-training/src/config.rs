//! Optimizer and learning-rate schedule configuration.

use burn::optim::decay::WeightDecayConfig;
use burn::optim::{AdamConfig, AdamWConfig};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainingError};

/// Optimizer configuration.
///
/// # Example
///
/// ```
/// use imu_training::OptimizerConfig;
///
/// let adam = OptimizerConfig::adam(1e-3);
/// assert!((adam.learning_rate - 1e-3).abs() < 1e-12);
/// assert!(adam.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Initial learning rate. The per-epoch rate comes from the model's schedule.
    pub learning_rate: f64,

    /// Weight decay (L2 penalty for Adam, decoupled for `AdamW`).
    pub weight_decay: f32,

    /// Optimizer type.
    pub optimizer_type: OptimizerType,

    /// Beta1.
    pub beta1: f32,

    /// Beta2.
    pub beta2: f32,

    /// Epsilon for numerical stability.
    pub epsilon: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::adam(1e-3)
    }
}

impl OptimizerConfig {
    /// Creates an Adam optimizer config.
    #[must_use]
    pub const fn adam(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            weight_decay: 0.0,
            optimizer_type: OptimizerType::Adam,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }

    /// Creates an `AdamW` optimizer config.
    #[must_use]
    pub const fn adamw(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            weight_decay: 1e-2,
            optimizer_type: OptimizerType::AdamW,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }

    /// Sets weight decay.
    #[must_use]
    pub const fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// Validates the configuration.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.learning_rate > 0.0
            && self.weight_decay >= 0.0
            && (0.0..1.0).contains(&self.beta1)
            && (0.0..1.0).contains(&self.beta2)
            && self.epsilon > 0.0
    }

    /// Builds the Burn Adam configuration.
    ///
    /// A zero weight decay maps to no penalty at all.
    #[must_use]
    pub fn to_adam(&self) -> AdamConfig {
        let decay = (self.weight_decay > 0.0).then(|| WeightDecayConfig::new(self.weight_decay));
        AdamConfig::new()
            .with_beta_1(self.beta1)
            .with_beta_2(self.beta2)
            .with_epsilon(self.epsilon)
            .with_weight_decay(decay)
    }

    /// Builds the Burn `AdamW` configuration.
    #[must_use]
    pub fn to_adamw(&self) -> AdamWConfig {
        AdamWConfig::new()
            .with_beta_1(self.beta1)
            .with_beta_2(self.beta2)
            .with_epsilon(self.epsilon)
            .with_weight_decay(self.weight_decay)
    }
}

/// Type of optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptimizerType {
    /// Adam optimizer.
    Adam,
    /// `AdamW` optimizer (Adam with decoupled weight decay).
    AdamW,
}

/// Step-decay learning-rate schedule over 1-indexed epochs.
///
/// The rate is `base_lr * factor^k` with `k = min((epoch - 1) / step_size, max_decays)`,
/// so each stage spans `step_size` epochs and the last stage is open-ended.
///
/// # Example
///
/// ```
/// use imu_training::StepDecay;
///
/// let schedule = StepDecay::new(0.01, 0.1, 30, 3);
/// assert!((schedule.rate(30).unwrap() - 0.01).abs() < 1e-12);
/// assert!((schedule.rate(31).unwrap() - 0.001).abs() < 1e-12);
/// assert!(schedule.rate(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepDecay {
    /// Rate of the first stage.
    pub base_lr: f64,

    /// Multiplier applied at every stage boundary.
    pub factor: f64,

    /// Stage width in epochs.
    pub step_size: usize,

    /// Number of decays after which the rate stays constant.
    pub max_decays: u32,
}

impl StepDecay {
    /// Creates a step decay schedule.
    #[must_use]
    pub const fn new(base_lr: f64, factor: f64, step_size: usize, max_decays: u32) -> Self {
        Self {
            base_lr,
            factor,
            step_size,
            max_decays,
        }
    }

    /// Validates the schedule.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.base_lr > 0.0 && self.factor > 0.0 && self.factor <= 1.0 && self.step_size > 0
    }

    /// Number of decays applied at `epoch`.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidEpoch`] for epoch 0 and
    /// [`TrainingError::InvalidConfig`] for a zero stage width.
    pub fn stage(&self, epoch: usize) -> Result<u32> {
        if epoch == 0 {
            return Err(TrainingError::InvalidEpoch(epoch));
        }
        if self.step_size == 0 {
            return Err(TrainingError::invalid_config("step_size must be > 0"));
        }
        let stage = u32::try_from((epoch - 1) / self.step_size).unwrap_or(u32::MAX);
        Ok(stage.min(self.max_decays))
    }

    /// Learning rate for a 1-indexed epoch.
    ///
    /// # Errors
    ///
    /// See [`StepDecay::stage`].
    #[allow(clippy::cast_possible_wrap)]
    pub fn rate(&self, epoch: usize) -> Result<f64> {
        let stage = self.stage(epoch)?;
        // Divide by the inverse factor: 0.001 / 10.0 lands closer to 1e-4 than 0.001 * 0.1.
        let inverse = 1.0 / self.factor;
        Ok(self.base_lr / inverse.powi(stage as i32))
    }
}
