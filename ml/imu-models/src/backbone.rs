//! ResNet-18 feature extractor.
//!
//! The standard image-classification network without its final fully
//! connected layer: a convolutional stem, four residual stages and global
//! average pooling, producing [`RESNET18_FEATURES`] values per image.

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, PaddingConfig2d};
use burn::prelude::Backend;
use burn::tensor::Tensor;
use burn::tensor::activation::relu;

/// Width of the pooled feature vector.
pub const RESNET18_FEATURES: usize = 512;

/// Input channels of one RGB frame.
pub const RGB_CHANNELS: usize = 3;

fn conv3x3<B: Backend>(
    in_channels: usize,
    out_channels: usize,
    stride: usize,
    device: &B::Device,
) -> Conv2d<B> {
    Conv2dConfig::new([in_channels, out_channels], [3, 3])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .with_bias(false)
        .init(device)
}

/// 1x1 projection on the shortcut path when a block changes shape.
#[derive(Debug, Module)]
pub struct Downsample<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B>,
}

impl<B: Backend> Downsample<B> {
    fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [1, 1])
            .with_stride([stride, stride])
            .with_bias(false)
            .init(device);
        let bn = BatchNormConfig::new(out_channels).init(device);
        Self { conv, bn }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(x))
    }
}

/// Two 3x3 convolutions with an identity (or projected) shortcut.
#[derive(Debug, Module)]
pub struct BasicBlock<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B>,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B>,
    downsample: Option<Downsample<B>>,
}

impl<B: Backend> BasicBlock<B> {
    fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        let downsample = (stride != 1 || in_channels != out_channels)
            .then(|| Downsample::new(in_channels, out_channels, stride, device));
        Self {
            conv1: conv3x3(in_channels, out_channels, stride, device),
            bn1: BatchNormConfig::new(out_channels).init(device),
            conv2: conv3x3(out_channels, out_channels, 1, device),
            bn2: BatchNormConfig::new(out_channels).init(device),
            downsample,
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(downsample) => downsample.forward(x.clone()),
            None => x.clone(),
        };
        let out = relu(self.bn1.forward(self.conv1.forward(x)));
        let out = self.bn2.forward(self.conv2.forward(out));
        relu(out + identity)
    }
}

/// A residual stage: two basic blocks, the first one possibly strided.
fn stage<B: Backend>(
    in_channels: usize,
    out_channels: usize,
    stride: usize,
    device: &B::Device,
) -> Vec<BasicBlock<B>> {
    vec![
        BasicBlock::new(in_channels, out_channels, stride, device),
        BasicBlock::new(out_channels, out_channels, 1, device),
    ]
}

/// ResNet-18 backbone with the classification layer removed.
///
/// # Example
///
/// ```ignore
/// use imu_models::ResNet18;
///
/// let backbone = ResNet18::<MyBackend>::new(&device);
/// let features = backbone.forward(Tensor::zeros([2, 3, 224, 224], &device));
/// assert_eq!(features.dims(), [2, 512]);
/// ```
#[derive(Debug, Module)]
pub struct ResNet18<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B>,
    maxpool: MaxPool2d,
    layer1: Vec<BasicBlock<B>>,
    layer2: Vec<BasicBlock<B>>,
    layer3: Vec<BasicBlock<B>>,
    layer4: Vec<BasicBlock<B>>,
    avgpool: AdaptiveAvgPool2d,
}

impl<B: Backend> ResNet18<B> {
    /// Creates a randomly initialised backbone.
    #[must_use]
    pub fn new(device: &B::Device) -> Self {
        let conv1 = Conv2dConfig::new([RGB_CHANNELS, 64], [7, 7])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .with_bias(false)
            .init(device);
        let maxpool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        Self {
            conv1,
            bn1: BatchNormConfig::new(64).init(device),
            maxpool,
            layer1: stage(64, 64, 1, device),
            layer2: stage(64, 128, 2, device),
            layer3: stage(128, 256, 2, device),
            layer4: stage(256, RESNET18_FEATURES, 2, device),
            avgpool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
        }
    }

    /// Extracts pooled features.
    ///
    /// # Arguments
    ///
    /// - `x`: RGB images `[batch, 3, height, width]`
    ///
    /// # Returns
    ///
    /// Features `[batch, 512]`.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = relu(self.bn1.forward(self.conv1.forward(x)));
        let mut x = self.maxpool.forward(x);

        for block in self
            .layer1
            .iter()
            .chain(&self.layer2)
            .chain(&self.layer3)
            .chain(&self.layer4)
        {
            x = block.forward(x);
        }

        self.avgpool.forward(x).flatten(1, 3)
    }
}
