//! Regressor predicting IMU quaternions from a pair of frames.

use burn::module::Module;
use burn::nn;
use burn::prelude::Backend;
use burn::tensor::Tensor;
use imu_training::{ImuMseLoss, MetricKind, ModelOutput, StepDecay};
use tracing::{debug, info, warn};

use crate::backbone::{RESNET18_FEATURES, RGB_CHANNELS, ResNet18};
use crate::checkpoint::load_checkpoint;
use crate::config::ModelConfig;
use crate::error::{ModelError, Result};
use crate::model::ImuModel;

/// Learning rate schedule: 1e-2, divided by 10 every 30 epochs, three times.
pub const PAIRWISE_LR_SCHEDULE: StepDecay = StepDecay::new(1e-2, 0.1, 30, 3);

/// Values regressed per IMU (a quaternion).
pub const QUATERNION_DIM: usize = 4;

/// Width of the concatenated pair embedding.
pub const PAIR_FEATURES: usize = 2 * RESNET18_FEATURES;

/// Linear regression head for one IMU channel.
#[derive(Debug, Module)]
pub struct ImuHead<B: Backend> {
    imu: usize,
    linear: nn::Linear<B>,
}

impl<B: Backend> ImuHead<B> {
    fn new(imu: usize, device: &B::Device) -> Self {
        Self {
            imu,
            linear: nn::LinearConfig::new(PAIR_FEATURES, QUATERNION_DIM).init(device),
        }
    }

    /// IMU channel this head predicts.
    #[must_use]
    pub const fn imu(&self) -> usize {
        self.imu
    }

    /// Maps pair features `[batch, 1024]` to `[batch, 4]`.
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(features)
    }
}

/// Predicts the IMU quaternions between two consecutive frames.
///
/// Both frames go through one shared ResNet-18, their features are
/// concatenated and every configured IMU gets its own linear head.
///
/// # Shapes
///
/// - Input: `[batch, 6, height, width]`, frame 1 in channels 0..3, frame 2 in 3..6
/// - Target: `[batch, 1, num_imus, 4]`
/// - Prediction: `[batch, 1, num_imus, 4]`, unnormalised
///
/// # Example
///
/// ```ignore
/// use imu_models::{ImuModel, ModelConfig, PairwiseFrameRegressor};
///
/// let config = ModelConfig::new(1, 1, 1, vec![0, 2]).with_regression(true);
/// let model = PairwiseFrameRegressor::<MyBackend>::new(&config, &device)?;
/// let output = model.forward(frames, target);
/// assert_eq!(output.prediction.dims()[2], 2);
/// ```
#[derive(Debug, Module)]
pub struct PairwiseFrameRegressor<B: Backend> {
    backbone: ResNet18<B>,
    heads: Vec<ImuHead<B>>,
}

impl<B: Backend> PairwiseFrameRegressor<B> {
    /// Creates the model, loading backbone weights when `pretrain` is set.
    ///
    /// # Errors
    ///
    /// - [`ModelError::InvalidConfig`] unless `sequence_length == 1` and
    ///   `regression` is set
    /// - checkpoint errors if the pretrained backbone can't be loaded
    pub fn new(config: &ModelConfig, device: &B::Device) -> Result<Self> {
        config.validate_regression()?;

        let mut backbone = ResNet18::new(device);
        if config.pretrain {
            let path = config
                .backbone_weights
                .as_deref()
                .ok_or_else(|| ModelError::invalid_config("pretrain requires backbone_weights"))?;
            warn!(path = %path.display(), "Loading pretrained backbone");
            backbone = load_checkpoint(backbone, path, device)?;
        }

        let heads: Vec<_> = config
            .imus
            .iter()
            .map(|&imu| ImuHead::new(imu, device))
            .collect();

        info!(
            imus = ?config.imus,
            pretrain = config.pretrain,
            features = PAIR_FEATURES,
            "Built pairwise-frame regressor"
        );

        Ok(Self { backbone, heads })
    }

    /// Pooled ResNet-18 features of one RGB frame batch, `[batch, 512]`.
    pub fn resnet_features(&self, frames: Tensor<B, 4>) -> Tensor<B, 2> {
        self.backbone.forward(frames)
    }

    /// Concatenated features of both frames, `[batch, 1024]`.
    pub fn feats(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch, _, height, width] = x.dims();
        let first = x
            .clone()
            .slice([0..batch, 0..RGB_CHANNELS, 0..height, 0..width]);
        let second = x.slice([0..batch, RGB_CHANNELS..2 * RGB_CHANNELS, 0..height, 0..width]);
        Tensor::cat(
            vec![self.resnet_features(first), self.resnet_features(second)],
            1,
        )
    }

    /// Head for an IMU channel, if configured.
    #[must_use]
    pub fn head(&self, imu: usize) -> Option<&ImuHead<B>> {
        self.heads.iter().find(|head| head.imu == imu)
    }

    /// Configured IMU channels in output order.
    #[must_use]
    pub fn imus(&self) -> Vec<usize> {
        self.heads.iter().map(|head| head.imu).collect()
    }

    /// Shared image backbone.
    #[must_use]
    pub const fn backbone(&self) -> &ResNet18<B> {
        &self.backbone
    }
}

/// Scales every quaternion along the last axis to unit length.
///
/// Zero vectors stay zero.
pub fn normalize_quaternions<B: Backend>(prediction: Tensor<B, 4>) -> Tensor<B, 4> {
    let norm = prediction
        .clone()
        .powf_scalar(2.0)
        .sum_dim(3)
        .sqrt()
        .clamp_min(1e-12);
    prediction / norm
}

impl<B: Backend> ImuModel<B> for PairwiseFrameRegressor<B> {
    type Input = Tensor<B, 4>;
    type Target = Tensor<B, 4>;
    type Loss = ImuMseLoss;

    const METRICS: &'static [MetricKind] =
        &[MetricKind::AngleClassification, MetricKind::AngleEvaluation];

    fn forward(&self, input: Tensor<B, 4>, target: Tensor<B, 4>) -> ModelOutput<B, Self::Target> {
        let features = self.feats(input);
        let outputs: Vec<_> = self
            .heads
            .iter()
            .map(|head| head.forward(features.clone()))
            .collect();
        let prediction: Tensor<B, 4> = Tensor::stack::<3>(outputs, 1).unsqueeze_dim(1);

        let steps = target.dims()[1];
        debug!(
            dims = ?prediction.dims(),
            steps,
            "pairwise-frame forward"
        );

        ModelOutput::new(prediction, target, (0..steps).collect())
    }

    fn loss(&self) -> Self::Loss {
        ImuMseLoss::new()
    }

    fn learning_rate(&self, epoch: usize) -> Result<f64> {
        Ok(PAIRWISE_LR_SCHEDULE.rate(epoch)?)
    }
}
