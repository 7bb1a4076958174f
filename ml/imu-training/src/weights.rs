//! Per-IMU class weight tables.

use burn::prelude::Backend;
use burn::tensor::{Tensor, TensorData};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainingError};

/// Class weights for each selected IMU channel, `[num_imus][num_classes]`.
///
/// Rows follow the order of the configured IMU list. Built once from the
/// dataset's global table with [`ClassWeights::select`].
///
/// # Example
///
/// ```
/// use imu_training::ClassWeights;
///
/// let global = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
/// let weights = ClassWeights::select(&global, &[2, 0]).unwrap();
/// assert_eq!(weights.rows(), &[vec![5.0, 6.0], vec![1.0, 2.0]]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f32>>", into = "Vec<Vec<f32>>")]
pub struct ClassWeights {
    rows: Vec<Vec<f32>>,
}

impl ClassWeights {
    /// Creates a table from already-selected rows.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] if the table is empty, rows
    /// have different lengths, or a weight is negative or not finite.
    pub fn new(rows: Vec<Vec<f32>>) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(TrainingError::invalid_config("class weight table is empty"));
        };
        let num_classes = first.len();
        if num_classes == 0 {
            return Err(TrainingError::invalid_config("class weight rows are empty"));
        }
        if let Some(row) = rows.iter().position(|r| r.len() != num_classes) {
            return Err(TrainingError::invalid_config(format!(
                "class weight row {row} has {} classes, expected {num_classes}",
                rows[row].len()
            )));
        }
        if rows.iter().flatten().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(TrainingError::invalid_config(
                "class weights must be finite and non-negative",
            ));
        }
        Ok(Self { rows })
    }

    /// Selects the rows of `global` for the given IMU indices, in order.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] if an index is out of range
    /// or the resulting table is invalid.
    pub fn select(global: &[Vec<f32>], imus: &[usize]) -> Result<Self> {
        let rows = imus
            .iter()
            .map(|&imu| {
                global.get(imu).cloned().ok_or_else(|| {
                    TrainingError::invalid_config(format!(
                        "imu {imu} out of range for class weight table with {} rows",
                        global.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(rows)
    }

    /// Uniform weights of 1.0.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] if either dimension is zero.
    pub fn uniform(num_imus: usize, num_classes: usize) -> Result<Self> {
        Self::new(vec![vec![1.0; num_classes]; num_imus])
    }

    /// Weight rows in IMU order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }

    /// Number of IMU rows.
    #[must_use]
    pub fn num_imus(&self) -> usize {
        self.rows.len()
    }

    /// Number of classes per IMU.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Uploads the table as a `[num_imus, num_classes]` tensor.
    #[must_use]
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let values: Vec<f32> = self.rows.iter().flatten().copied().collect();
        let data = TensorData::new(values, [self.num_imus(), self.num_classes()]);
        Tensor::from_data(data, device)
    }
}

impl TryFrom<Vec<Vec<f32>>> for ClassWeights {
    type Error = TrainingError;

    fn try_from(rows: Vec<Vec<f32>>) -> Result<Self> {
        Self::new(rows)
    }
}

impl From<ClassWeights> for Vec<Vec<f32>> {
    fn from(weights: ClassWeights) -> Self {
        weights.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn global() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 1.0, 1.0],
            vec![0.5, 2.0, 1.5],
            vec![3.0, 0.0, 1.0],
        ]
    }

    #[test]
    fn select_preserves_imu_order() {
        let weights = ClassWeights::select(&global(), &[2, 1]);
        assert!(weights.is_ok());
        let weights = weights.unwrap();
        assert_eq!(weights.num_imus(), 2);
        assert_eq!(weights.num_classes(), 3);
        assert_eq!(weights.rows()[0], vec![3.0, 0.0, 1.0]);
        assert_eq!(weights.rows()[1], vec![0.5, 2.0, 1.5]);
    }

    #[test]
    fn select_rejects_out_of_range() {
        let err = ClassWeights::select(&global(), &[0, 7]);
        assert!(matches!(err, Err(TrainingError::InvalidConfig(_))));
    }

    #[test]
    fn new_rejects_ragged_rows() {
        let err = ClassWeights::new(vec![vec![1.0, 1.0], vec![1.0]]);
        assert!(err.is_err());
    }

    #[test]
    fn new_rejects_negative_weights() {
        let err = ClassWeights::new(vec![vec![1.0, -1.0]]);
        assert!(err.is_err());
    }

    #[test]
    fn new_rejects_empty() {
        assert!(ClassWeights::new(Vec::new()).is_err());
        assert!(ClassWeights::new(vec![Vec::new()]).is_err());
    }

    #[test]
    fn to_tensor_shape() {
        let device = <TestBackend as Backend>::Device::default();
        let weights = ClassWeights::uniform(4, 6).unwrap();
        let tensor = weights.to_tensor::<TestBackend>(&device);
        assert_eq!(tensor.dims(), [4, 6]);
    }

    #[test]
    fn serde_validates_rows() {
        let ok: std::result::Result<ClassWeights, _> = serde_json::from_str("[[1.0, 2.0]]");
        assert!(ok.is_ok());

        let ragged: std::result::Result<ClassWeights, _> =
            serde_json::from_str("[[1.0, 2.0], [1.0]]");
        assert!(ragged.is_err());
    }
}
