//! Recurrent head classifying IMU classes at every time step.

use burn::module::Module;
use burn::nn;
use burn::nn::lstm::{Lstm, LstmConfig};
use burn::prelude::Backend;
use burn::tensor::Tensor;

/// Stacked LSTM followed by a per-step classifier.
///
/// Output logits are `[batch, time, num_imus, num_classes]`, one softmax
/// group per IMU channel.
#[derive(Debug, Module)]
pub struct RecurrentHead<B: Backend> {
    layers: Vec<Lstm<B>>,
    classifier: nn::Linear<B>,
    num_imus: usize,
    num_classes: usize,
}

impl<B: Backend> RecurrentHead<B> {
    /// Creates the head.
    ///
    /// - `hidden_size`: LSTM input and hidden width
    /// - `num_layers`: stacked LSTM layers (at least one is created)
    #[must_use]
    pub fn new(
        hidden_size: usize,
        num_layers: usize,
        num_imus: usize,
        num_classes: usize,
        device: &B::Device,
    ) -> Self {
        let layers = (0..num_layers.max(1))
            .map(|_| LstmConfig::new(hidden_size, hidden_size, true).init(device))
            .collect();
        let classifier = nn::LinearConfig::new(hidden_size, num_imus * num_classes).init(device);
        Self {
            layers,
            classifier,
            num_imus,
            num_classes,
        }
    }

    /// Number of stacked LSTM layers.
    #[must_use]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Runs the sequence through every layer, starting each from a zero state.
    ///
    /// # Arguments
    ///
    /// - `x`: Embedded sequence `[batch, time, hidden_size]`
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 4> {
        let mut x = x;
        for lstm in &self.layers {
            let (output, _state) = lstm.forward(x, None);
            x = output;
        }

        let [batch, steps, _] = x.dims();
        self.classifier
            .forward(x)
            .reshape([batch, steps, self.num_imus, self.num_classes])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn head_output_shape() {
        let device = <TestBackend as Backend>::Device::default();
        let head = RecurrentHead::<TestBackend>::new(8, 2, 3, 5, &device);
        assert_eq!(head.num_layers(), 2);

        let x = Tensor::<TestBackend, 3>::ones([2, 4, 8], &device);
        assert_eq!(head.forward(x).dims(), [2, 4, 3, 5]);
    }

    #[test]
    fn head_creates_at_least_one_layer() {
        let device = <TestBackend as Backend>::Device::default();
        let head = RecurrentHead::<TestBackend>::new(4, 0, 1, 2, &device);
        assert_eq!(head.num_layers(), 1);
    }

    #[test]
    fn state_is_reset_between_calls() {
        let device = <TestBackend as Backend>::Device::default();
        let head = RecurrentHead::<TestBackend>::new(4, 1, 1, 2, &device);

        let x = Tensor::<TestBackend, 3>::ones([1, 3, 4], &device);
        let first = head.forward(x.clone()).into_data().to_vec::<f32>();
        let second = head.forward(x).into_data().to_vec::<f32>();
        assert!(first.is_ok());
        assert_eq!(first.ok(), second.ok());
    }
}
