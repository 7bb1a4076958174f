//! Recurrent model inferring IMU classes from a window of image embeddings.

use burn::module::{Ignored, Module};
use burn::nn;
use burn::prelude::Backend;
use burn::tensor::{Int, Tensor};
use imu_training::{
    ClassWeights, MetricKind, ModelOutput, MultiLabelCrossEntropyLoss, OptimizerConfig, StepDecay,
};
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::error::Result;
use crate::model::ImuModel;
use crate::recurrent::RecurrentHead;

/// Learning rate schedule: 1e-3, divided by 10 every 90 epochs, three times.
pub const SEQUENCE_LR_SCHEDULE: StepDecay = StepDecay::new(1e-3, 0.1, 90, 3);

/// Initial Adam learning rate.
pub const SEQUENCE_BASE_LR: f64 = 1e-3;

/// Given a sequence of frame embeddings, classifies the IMU change at each
/// of the first `output_length` frames.
///
/// Architecture: shared Linear embedding -> stacked LSTM -> per-step
/// classifier with one softmax group per IMU channel.
///
/// # Shapes
///
/// - Input: `[batch, sequence, image_feature]`
/// - Target: `[batch, sequence, num_imus]` class indices
/// - Prediction: `[batch, output_length, num_imus, num_classes]`
#[derive(Debug, Module)]
pub struct SequenceToImu<B: Backend> {
    embedding: nn::Linear<B>,
    recurrent: RecurrentHead<B>,
    input_length: usize,
    output_length: usize,
    class_weights: Ignored<ClassWeights>,
}

impl<B: Backend> SequenceToImu<B> {
    /// Creates the model.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ModelError::InvalidConfig`] unless
    /// `sequence_length == input_length >= output_length` and the class
    /// weights have one row per IMU.
    pub fn new(config: &ModelConfig, device: &B::Device) -> Result<Self> {
        let class_weights = config.validate_sequence()?.clone();

        let embedding = nn::LinearConfig::new(config.image_feature, config.hidden_size).init(device);
        let recurrent = RecurrentHead::new(
            config.hidden_size,
            config.num_layers,
            config.imus.len(),
            class_weights.num_classes(),
            device,
        );

        info!(
            input_length = config.input_length,
            output_length = config.output_length,
            imus = ?config.imus,
            classes = class_weights.num_classes(),
            hidden = config.hidden_size,
            "Built sequence-to-IMU model"
        );

        Ok(Self {
            embedding,
            recurrent,
            input_length: config.input_length,
            output_length: config.output_length,
            class_weights: Ignored(class_weights),
        })
    }

    /// Frames consumed per sample.
    #[must_use]
    pub const fn input_length(&self) -> usize {
        self.input_length
    }

    /// Frames scored per sample.
    #[must_use]
    pub const fn output_length(&self) -> usize {
        self.output_length
    }

    /// Class weights, one row per IMU.
    #[must_use]
    pub fn class_weights(&self) -> &ClassWeights {
        &self.class_weights.0
    }
}

impl<B: Backend> ImuModel<B> for SequenceToImu<B> {
    type Input = Tensor<B, 3>;
    type Target = Tensor<B, 3, Int>;
    type Loss = MultiLabelCrossEntropyLoss<B>;

    const METRICS: &'static [MetricKind] =
        &[MetricKind::SequenceMultiClass, MetricKind::AngleEvaluation];

    fn forward(&self, input: Tensor<B, 3>, target: Tensor<B, 3, Int>) -> ModelOutput<B, Self::Target> {
        let [batch, frames, features] = input.dims();
        let [_, target_frames, imus] = target.dims();
        let input_steps = self.input_length.min(frames);
        let steps = self.output_length.min(input_steps).min(target_frames);

        let input = input.slice([0..batch, 0..input_steps, 0..features]);
        let target = target.slice([0..batch, 0..steps, 0..imus]);

        // Burn's LSTM iterates the time axis of batch-major input.
        let embedded = self.embedding.forward(input);
        let logits = self.recurrent.forward(embedded);

        let [_, _, num_imus, num_classes] = logits.dims();
        let prediction = logits.slice([0..batch, 0..steps, 0..num_imus, 0..num_classes]);

        debug!(
            batch,
            input_steps,
            output_steps = steps,
            "sequence-to-IMU forward"
        );

        ModelOutput::new(prediction, target, (0..steps).collect())
    }

    fn loss(&self) -> Self::Loss {
        let device = self.embedding.weight.val().device();
        MultiLabelCrossEntropyLoss::new(self.class_weights.0.to_tensor::<B>(&device))
    }

    fn optimizer(&self) -> Option<OptimizerConfig> {
        Some(OptimizerConfig::adam(SEQUENCE_BASE_LR))
    }

    fn learning_rate(&self, epoch: usize) -> Result<f64> {
        Ok(SEQUENCE_LR_SCHEDULE.rate(epoch)?)
    }
}
