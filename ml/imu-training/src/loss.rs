//! Loss functions for IMU classification and regression heads.

use burn::nn::loss::{MseLoss, Reduction};
use burn::prelude::Backend;
use burn::tensor::activation::log_softmax;
use burn::tensor::{Int, Tensor};

use crate::output::ModelOutput;

/// A loss over a model's output triple.
///
/// Only the time steps listed in `output_indices` are scored.
pub trait ImuLoss<B: Backend, T> {
    /// Computes the scalar loss.
    fn forward(&self, output: &ModelOutput<B, T>) -> Tensor<B, 1>;
}

/// Weighted cross-entropy applied independently to every IMU channel.
///
/// Each IMU has its own softmax over classes, so several channels are
/// active at the same step. For channel `i` the loss is the weighted mean
/// `sum(w[i][y] * nll) / sum(w[i][y])` over all scored `(batch, step)`
/// pairs; the per-channel losses are summed.
///
/// Expects logits `[batch, time, num_imus, num_classes]` and class targets
/// `[batch, time, num_imus]`.
#[derive(Debug, Clone)]
pub struct MultiLabelCrossEntropyLoss<B: Backend> {
    weights: Tensor<B, 2>,
}

impl<B: Backend> MultiLabelCrossEntropyLoss<B> {
    /// Creates the loss from a `[num_imus, num_classes]` weight tensor.
    #[must_use]
    pub const fn new(weights: Tensor<B, 2>) -> Self {
        Self { weights }
    }

    /// Class weights `[num_imus, num_classes]`.
    #[must_use]
    pub const fn weights(&self) -> &Tensor<B, 2> {
        &self.weights
    }
}

impl<B: Backend> ImuLoss<B, Tensor<B, 3, Int>> for MultiLabelCrossEntropyLoss<B> {
    fn forward(&self, output: &ModelOutput<B, Tensor<B, 3, Int>>) -> Tensor<B, 1> {
        let indices = output.indices_tensor();
        let logits = output.prediction.clone().select(1, indices.clone());
        let target: Tensor<B, 4, Int> = output.target.clone().select(1, indices).unsqueeze_dim(3);
        let [batch, steps, imus, classes] = logits.dims();

        let nll = log_softmax(logits, 3).gather(3, target.clone()).neg();
        let weights = self
            .weights
            .clone()
            .reshape([1, 1, imus, classes])
            .expand([batch, steps, imus, classes])
            .gather(3, target);

        // [1, 1, imus, 1] after reducing batch and time.
        let weighted = (nll * weights.clone()).sum_dim(0).sum_dim(1);
        let normalizer = weights.sum_dim(0).sum_dim(1);

        (weighted / normalizer).sum()
    }
}

/// Mean squared error between predicted and target IMU vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImuMseLoss;

impl ImuMseLoss {
    /// Creates the loss.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl<B: Backend> ImuLoss<B, Tensor<B, 4>> for ImuMseLoss {
    fn forward(&self, output: &ModelOutput<B, Tensor<B, 4>>) -> Tensor<B, 1> {
        let indices = output.indices_tensor();
        let prediction = output.prediction.clone().select(1, indices.clone());
        let target = output.target.clone().select(1, indices);
        MseLoss::new().forward(prediction, target, Reduction::Mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn::tensor::ElementConversion;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn device() -> <TestBackend as Backend>::Device {
        <TestBackend as Backend>::Device::default()
    }

    #[test]
    fn cross_entropy_uniform_logits() {
        let device = device();
        // 1 batch, 2 steps, 2 imus, 4 classes, all logits equal -> nll = ln(4) per imu.
        let prediction = Tensor::<TestBackend, 4>::zeros([1, 2, 2, 4], &device);
        let target = Tensor::<TestBackend, 3, Int>::from_data([[[0, 3], [1, 2]]], &device);
        let weights = Tensor::<TestBackend, 2>::ones([2, 4], &device);

        let output = ModelOutput::new(prediction, target, vec![0, 1]);
        let loss = MultiLabelCrossEntropyLoss::new(weights).forward(&output);
        let value: f32 = loss.into_scalar().elem();

        assert_relative_eq!(value, 2.0 * 4.0_f32.ln(), max_relative = 1e-5);
    }

    #[test]
    fn cross_entropy_confident_correct_is_small() {
        let device = device();
        let prediction = Tensor::<TestBackend, 4>::from_data(
            [[[[10.0, -10.0]], [[-10.0, 10.0]]]],
            &device,
        );
        let target = Tensor::<TestBackend, 3, Int>::from_data([[[0], [1]]], &device);
        let weights = Tensor::<TestBackend, 2>::ones([1, 2], &device);

        let output = ModelOutput::new(prediction, target, vec![0, 1]);
        let value: f32 = MultiLabelCrossEntropyLoss::new(weights)
            .forward(&output)
            .into_scalar()
            .elem();
        assert!(value < 1e-3);
    }

    #[test]
    fn cross_entropy_class_weights_reweight_mean() {
        let device = device();
        // Step 0 is confidently right, step 1 is uniform over 2 classes.
        let prediction = Tensor::<TestBackend, 4>::from_data(
            [[[[20.0, -20.0]], [[0.0, 0.0]]]],
            &device,
        );
        let target = Tensor::<TestBackend, 3, Int>::from_data([[[0], [1]]], &device);
        let output = ModelOutput::new(prediction, target, vec![0, 1]);

        let equal = Tensor::<TestBackend, 2>::from_data([[1.0, 1.0]], &device);
        let skewed = Tensor::<TestBackend, 2>::from_data([[1.0, 3.0]], &device);

        let equal: f32 = MultiLabelCrossEntropyLoss::new(equal)
            .forward(&output)
            .into_scalar()
            .elem();
        let skewed: f32 = MultiLabelCrossEntropyLoss::new(skewed)
            .forward(&output)
            .into_scalar()
            .elem();

        let ln2 = 2.0_f32.ln();
        assert_relative_eq!(equal, ln2 / 2.0, max_relative = 1e-4);
        assert_relative_eq!(skewed, 3.0 * ln2 / 4.0, max_relative = 1e-4);
    }

    #[test]
    fn cross_entropy_scores_only_output_indices() {
        let device = device();
        // Step 1 is badly wrong but not scored.
        let prediction = Tensor::<TestBackend, 4>::from_data(
            [[[[10.0, -10.0]], [[10.0, -10.0]]]],
            &device,
        );
        let target = Tensor::<TestBackend, 3, Int>::from_data([[[0], [1]]], &device);
        let weights = Tensor::<TestBackend, 2>::ones([1, 2], &device);

        let output = ModelOutput::new(prediction, target, vec![0]);
        let value: f32 = MultiLabelCrossEntropyLoss::new(weights)
            .forward(&output)
            .into_scalar()
            .elem();
        assert!(value < 1e-3);
    }

    #[test]
    fn mse_zero_for_identical() {
        let device = device();
        let values = Tensor::<TestBackend, 4>::from_data(
            [[[[0.1, 0.2, 0.3, 0.4], [0.5, 0.6, 0.7, 0.8]]]],
            &device,
        );
        let output = ModelOutput::new(values.clone(), values, vec![0]);
        let value: f32 = ImuMseLoss::new().forward(&output).into_scalar().elem();
        assert!(value.abs() < 1e-7);
    }

    #[test]
    fn mse_matches_hand_computation() {
        let device = device();
        let prediction = Tensor::<TestBackend, 4>::from_data([[[[1.0, 0.0, 0.0, 0.0]]]], &device);
        let target = Tensor::<TestBackend, 4>::from_data([[[[0.0, 0.0, 0.0, 2.0]]]], &device);
        let output = ModelOutput::new(prediction, target, vec![0]);
        let value: f32 = ImuMseLoss::new().forward(&output).into_scalar().elem();
        // (1 + 0 + 0 + 4) / 4
        assert_relative_eq!(value, 1.25, max_relative = 1e-6);
    }
}
