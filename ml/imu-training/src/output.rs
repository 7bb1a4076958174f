//! The `(prediction, target, output_indices)` triple returned by every model.

use burn::prelude::Backend;
use burn::tensor::{Int, Tensor, TensorData};

/// Output of a model forward pass.
///
/// `prediction` and `target` share the same temporal alignment: step `i` of
/// one corresponds to step `i` of the other. `output_indices` lists the
/// steps that losses and metrics should score.
///
/// Predictions are always `[batch, time, num_imus, width]`, where `width`
/// is the number of classes for classifiers and 4 for quaternion regressors.
#[derive(Debug, Clone)]
pub struct ModelOutput<B: Backend, T> {
    /// Model prediction `[batch, time, num_imus, width]`.
    pub prediction: Tensor<B, 4>,

    /// Ground truth, truncated to the prediction's time window.
    pub target: T,

    /// Time steps to score.
    pub output_indices: Vec<usize>,
}

impl<B: Backend, T> ModelOutput<B, T> {
    /// Creates a new output triple.
    #[must_use]
    pub const fn new(prediction: Tensor<B, 4>, target: T, output_indices: Vec<usize>) -> Self {
        Self {
            prediction,
            target,
            output_indices,
        }
    }

    /// Number of scored time steps.
    #[must_use]
    pub fn num_steps(&self) -> usize {
        self.output_indices.len()
    }

    /// Output indices as an `Int` tensor on the prediction's device.
    #[must_use]
    pub fn indices_tensor(&self) -> Tensor<B, 1, Int> {
        index_tensor(&self.output_indices, &self.prediction.device())
    }

    /// Prediction restricted to the scored time steps.
    #[must_use]
    pub fn scored_prediction(&self) -> Tensor<B, 4> {
        self.prediction.clone().select(1, self.indices_tensor())
    }
}

/// Builds a 1-D `Int` tensor from host indices.
#[allow(clippy::cast_possible_wrap)]
pub(crate) fn index_tensor<B: Backend>(indices: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let values: Vec<i64> = indices.iter().map(|&i| i as i64).collect();
    let data = TensorData::new(values, [indices.len()]);
    Tensor::from_data(data, device)
}
