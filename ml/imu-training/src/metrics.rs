//! Metric evaluators over model outputs.
//!
//! Evaluators accumulate over batches on the host. A training driver calls
//! [`Metric::update`] per batch, reads [`Metric::value`] at the end of an
//! epoch and then [`Metric::reset`]s.

// Counts stay far below f64 precision limits.
#![allow(clippy::cast_precision_loss)]

use burn::prelude::Backend;
use burn::tensor::{Int, Tensor};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TrainingError};
use crate::output::ModelOutput;

/// Identifies a metric evaluator type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// Per-step, per-IMU class accuracy.
    SequenceMultiClass,
    /// Agreement of nearest quaternion centroids for regressed IMU deltas.
    AngleClassification,
    /// Mean rotation angle between predicted and target IMU deltas.
    AngleEvaluation,
}

impl MetricKind {
    /// Returns the metric name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SequenceMultiClass => "sequence_multi_class",
            Self::AngleClassification => "angle_classification",
            Self::AngleEvaluation => "angle_evaluation",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An accumulating evaluator over `(prediction, target, output_indices)`.
pub trait Metric<B: Backend, T> {
    /// Kind of this evaluator.
    fn kind(&self) -> MetricKind;

    /// Accumulates one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if prediction and target shapes disagree or the
    /// evaluator lacks data it needs.
    fn update(&mut self, output: &ModelOutput<B, T>) -> Result<()>;

    /// Current value, `None` before the first update.
    fn value(&self) -> Option<f64>;

    /// Clears accumulated state.
    fn reset(&mut self);
}

/// Unit quaternions that represent each IMU class.
///
/// Index `c` holds the representative rotation of class `c`. Rows are
/// normalised on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuaternionCentroids {
    centroids: Vec<[f32; 4]>,
}

impl QuaternionCentroids {
    /// Creates a centroid table.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] if the table is empty or a
    /// centroid has zero or non-finite norm.
    pub fn new(centroids: Vec<[f32; 4]>) -> Result<Self> {
        if centroids.is_empty() {
            return Err(TrainingError::invalid_config("centroid table is empty"));
        }
        let centroids = centroids
            .into_iter()
            .enumerate()
            .map(|(class, q)| {
                normalize(q).ok_or_else(|| {
                    TrainingError::invalid_config(format!("centroid {class} has zero norm"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { centroids })
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    /// Centroid of a class.
    #[must_use]
    pub fn get(&self, class: usize) -> Option<[f32; 4]> {
        self.centroids.get(class).copied()
    }

    /// Index of the centroid with the smallest rotation angle to `q`.
    #[must_use]
    pub fn nearest(&self, q: [f32; 4]) -> usize {
        self.centroids
            .iter()
            .enumerate()
            .map(|(class, c)| (class, angle_degrees(q, *c)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(0, |(class, _)| class)
    }

    fn lookup(&self, class: i64) -> Result<[f32; 4]> {
        usize::try_from(class)
            .ok()
            .and_then(|c| self.get(c))
            .ok_or_else(|| {
                TrainingError::shape_mismatch(
                    format!("class index < {}", self.len()),
                    class.to_string(),
                )
            })
    }
}

/// Rotation angle in degrees between two quaternions.
///
/// Both inputs are normalised first; `q` and `-q` are the same rotation.
/// A zero-norm input is treated as maximally wrong (180 degrees).
#[must_use]
pub fn angle_degrees(a: [f32; 4], b: [f32; 4]) -> f64 {
    match (normalize(a), normalize(b)) {
        (Some(a), Some(b)) => {
            let dot: f32 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
            let dot = f64::from(dot.abs()).min(1.0);
            (2.0 * dot.acos()).to_degrees()
        }
        _ => 180.0,
    }
}

fn normalize(q: [f32; 4]) -> Option<[f32; 4]> {
    let norm = q.iter().map(|x| x * x).sum::<f32>().sqrt();
    (norm.is_finite() && norm > f32::EPSILON).then(|| q.map(|x| x / norm))
}

fn float_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| TrainingError::data(format!("{e:?}")))
}

fn int_values<B: Backend, const D: usize>(tensor: Tensor<B, D, Int>) -> Result<Vec<i64>> {
    tensor
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| TrainingError::data(format!("{e:?}")))
}

fn quaternions(values: &[f32]) -> impl Iterator<Item = [f32; 4]> + '_ {
    values
        .chunks_exact(4)
        .map(|c| [c[0], c[1], c[2], c[3]])
}

/// Scored class predictions and targets, flattened in `[batch, time, imu]` order.
struct ScoredClasses {
    predicted: Vec<i64>,
    target: Vec<i64>,
    num_imus: usize,
}

fn scored_classes<B: Backend>(output: &ModelOutput<B, Tensor<B, 3, Int>>) -> Result<ScoredClasses> {
    let prediction = output.scored_prediction();
    let target = output.target.clone().select(1, output.indices_tensor());
    let [batch, steps, imus, _] = prediction.dims();
    if target.dims() != [batch, steps, imus] {
        return Err(TrainingError::shape_mismatch(
            format!("{:?}", [batch, steps, imus]),
            format!("{:?}", target.dims()),
        ));
    }
    Ok(ScoredClasses {
        predicted: int_values(prediction.argmax(3))?,
        target: int_values(target)?,
        num_imus: imus,
    })
}

/// Scored quaternion predictions and targets, flattened.
fn scored_quaternions<B: Backend>(
    output: &ModelOutput<B, Tensor<B, 4>>,
) -> Result<(Vec<f32>, Vec<f32>)> {
    let prediction = output.scored_prediction();
    let target = output.target.clone().select(1, output.indices_tensor());
    let dims = prediction.dims();
    if dims[3] != 4 || target.dims() != dims {
        return Err(TrainingError::shape_mismatch(
            format!("{:?} with last axis 4", target.dims()),
            format!("{dims:?}"),
        ));
    }
    Ok((float_values(prediction)?, float_values(target)?))
}

/// Class accuracy per time step and IMU channel.
///
/// The prediction's argmax over classes is compared against the target
/// class at every scored `(batch, step, imu)` position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceMultiClassMetric {
    correct: Vec<usize>,
    total: Vec<usize>,
}

impl SequenceMultiClassMetric {
    /// Creates an empty evaluator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accuracy of each IMU channel, in configured order.
    #[must_use]
    pub fn per_imu_accuracy(&self) -> Vec<f64> {
        self.correct
            .iter()
            .zip(&self.total)
            .map(|(&c, &t)| if t == 0 { 0.0 } else { c as f64 / t as f64 })
            .collect()
    }
}

impl<B: Backend> Metric<B, Tensor<B, 3, Int>> for SequenceMultiClassMetric {
    fn kind(&self) -> MetricKind {
        MetricKind::SequenceMultiClass
    }

    fn update(&mut self, output: &ModelOutput<B, Tensor<B, 3, Int>>) -> Result<()> {
        let scored = scored_classes(output)?;
        if self.total.is_empty() {
            self.correct = vec![0; scored.num_imus];
            self.total = vec![0; scored.num_imus];
        } else if self.total.len() != scored.num_imus {
            return Err(TrainingError::shape_mismatch(
                format!("{} imus", self.total.len()),
                format!("{} imus", scored.num_imus),
            ));
        }

        for (i, (p, t)) in scored.predicted.iter().zip(&scored.target).enumerate() {
            let imu = i % scored.num_imus;
            self.total[imu] += 1;
            if p == t {
                self.correct[imu] += 1;
            }
        }
        debug!(samples = scored.target.len(), "sequence multi-class update");
        Ok(())
    }

    fn value(&self) -> Option<f64> {
        let total: usize = self.total.iter().sum();
        (total > 0).then(|| self.correct.iter().sum::<usize>() as f64 / total as f64)
    }

    fn reset(&mut self) {
        self.correct.clear();
        self.total.clear();
    }
}

/// Mean rotation angle, in degrees, between prediction and target.
///
/// Regression outputs are compared directly. Class outputs need a
/// [`QuaternionCentroids`] table mapping each class to its rotation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AngleEvaluationMetric {
    centroids: Option<QuaternionCentroids>,
    sum_degrees: f64,
    count: usize,
}

impl AngleEvaluationMetric {
    /// Creates an evaluator for regression outputs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an evaluator that maps classes to rotations.
    #[must_use]
    pub fn with_centroids(centroids: QuaternionCentroids) -> Self {
        Self {
            centroids: Some(centroids),
            ..Self::default()
        }
    }

    fn record(&mut self, predicted: [f32; 4], target: [f32; 4]) {
        self.sum_degrees += angle_degrees(predicted, target);
        self.count += 1;
    }
}

impl<B: Backend> Metric<B, Tensor<B, 4>> for AngleEvaluationMetric {
    fn kind(&self) -> MetricKind {
        MetricKind::AngleEvaluation
    }

    fn update(&mut self, output: &ModelOutput<B, Tensor<B, 4>>) -> Result<()> {
        let (predicted, target) = scored_quaternions(output)?;
        for (p, t) in quaternions(&predicted).zip(quaternions(&target)) {
            self.record(p, t);
        }
        Ok(())
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum_degrees / self.count as f64)
    }

    fn reset(&mut self) {
        self.sum_degrees = 0.0;
        self.count = 0;
    }
}

impl<B: Backend> Metric<B, Tensor<B, 3, Int>> for AngleEvaluationMetric {
    fn kind(&self) -> MetricKind {
        MetricKind::AngleEvaluation
    }

    fn update(&mut self, output: &ModelOutput<B, Tensor<B, 3, Int>>) -> Result<()> {
        let centroids = self
            .centroids
            .as_ref()
            .ok_or(TrainingError::MissingCentroids(MetricKind::AngleEvaluation.name()))?;
        let scored = scored_classes(output)?;
        // Resolve every class first so a bad index leaves the totals untouched.
        let pairs = scored
            .predicted
            .iter()
            .zip(&scored.target)
            .map(|(&p, &t)| Ok((centroids.lookup(p)?, centroids.lookup(t)?)))
            .collect::<Result<Vec<_>>>()?;
        for (p, t) in pairs {
            self.record(p, t);
        }
        Ok(())
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum_degrees / self.count as f64)
    }

    fn reset(&mut self) {
        self.sum_degrees = 0.0;
        self.count = 0;
    }
}

/// Classification accuracy of regressed rotations.
///
/// Prediction and target are each assigned to their nearest centroid; the
/// metric is the fraction of positions where the assignments agree.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleClassificationMetric {
    centroids: QuaternionCentroids,
    correct: usize,
    total: usize,
}

impl AngleClassificationMetric {
    /// Creates an evaluator over the given centroids.
    #[must_use]
    pub const fn new(centroids: QuaternionCentroids) -> Self {
        Self {
            centroids,
            correct: 0,
            total: 0,
        }
    }
}

impl<B: Backend> Metric<B, Tensor<B, 4>> for AngleClassificationMetric {
    fn kind(&self) -> MetricKind {
        MetricKind::AngleClassification
    }

    fn update(&mut self, output: &ModelOutput<B, Tensor<B, 4>>) -> Result<()> {
        let (predicted, target) = scored_quaternions(output)?;
        for (p, t) in quaternions(&predicted).zip(quaternions(&target)) {
            self.total += 1;
            if self.centroids.nearest(p) == self.centroids.nearest(t) {
                self.correct += 1;
            }
        }
        Ok(())
    }

    fn value(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64)
    }

    fn reset(&mut self) {
        self.correct = 0;
        self.total = 0;
    }
}
