//! Base contract shared by IMU models.

use burn::prelude::Backend;
use imu_training::{ImuLoss, MetricKind, ModelOutput, OptimizerConfig};

use crate::error::Result;

/// Interface a training driver uses to run an IMU model.
///
/// Each step the driver calls [`ImuModel::forward`], scores the returned
/// triple with [`ImuModel::loss`], steps the optimizer at
/// [`ImuModel::learning_rate`] and periodically evaluates the metric kinds
/// listed in [`ImuModel::METRICS`].
pub trait ImuModel<B: Backend> {
    /// Input batch tensor.
    type Input;

    /// Ground-truth batch tensor.
    type Target;

    /// Loss over this model's output triple.
    type Loss: ImuLoss<B, Self::Target>;

    /// Metric evaluators the driver should run.
    const METRICS: &'static [MetricKind];

    /// Runs the model and aligns the target with the prediction.
    fn forward(&self, input: Self::Input, target: Self::Target) -> ModelOutput<B, Self::Target>;

    /// Returns the loss to minimise.
    fn loss(&self) -> Self::Loss;

    /// Optimizer settings, `None` to use the driver's default.
    fn optimizer(&self) -> Option<OptimizerConfig> {
        None
    }

    /// Learning rate for a 1-indexed epoch.
    ///
    /// # Errors
    ///
    /// Returns an error for epoch 0.
    fn learning_rate(&self, epoch: usize) -> Result<f64>;
}
