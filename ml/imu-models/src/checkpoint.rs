//! Checkpoint persistence for model and backbone weights.

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::Backend;
use burn::record::{BinFileRecorder, FullPrecisionSettings, PrettyJsonFileRecorder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ModelError, Result};

/// Supported checkpoint file formats.
///
/// # Example
///
/// ```
/// use imu_models::CheckpointFormat;
///
/// let format = CheckpointFormat::from_extension("bin");
/// assert_eq!(format, Some(CheckpointFormat::Binary));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckpointFormat {
    /// Burn `BinFileRecorder` at full precision.
    #[default]
    Binary,

    /// Burn `PrettyJsonFileRecorder`, human-readable.
    Json,
}

impl CheckpointFormat {
    /// Determines format from a file extension, case-insensitively.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "bin" => Some(Self::Binary),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Determines format from a file path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// File extension written by this format's recorder.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::Json => "json",
        }
    }

    /// Format name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for CheckpointFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Saves a module's weights.
///
/// Any extension on `path` is replaced by the format's own.
///
/// # Returns
///
/// The path actually written.
///
/// # Errors
///
/// Returns [`ModelError::SaveCheckpoint`] if the recorder fails.
///
/// # Example
///
/// ```ignore
/// use imu_models::{save_checkpoint, CheckpointFormat};
///
/// let written = save_checkpoint(&model, "runs/epoch_10", CheckpointFormat::Binary)?;
/// assert!(written.ends_with("epoch_10.bin"));
/// ```
pub fn save_checkpoint<B, M>(
    model: &M,
    path: impl AsRef<Path>,
    format: CheckpointFormat,
) -> Result<PathBuf>
where
    B: Backend,
    M: Module<B>,
{
    let full_path = path.as_ref().with_extension(format.extension());
    let saved = match format {
        CheckpointFormat::Binary => model.clone().save_file(
            full_path.clone(),
            &BinFileRecorder::<FullPrecisionSettings>::new(),
        ),
        CheckpointFormat::Json => model.clone().save_file(
            full_path.clone(),
            &PrettyJsonFileRecorder::<FullPrecisionSettings>::new(),
        ),
    };
    saved.map_err(|e| ModelError::save_checkpoint(full_path.display().to_string(), e.to_string()))?;

    info!(path = %full_path.display(), %format, "Saved checkpoint");
    Ok(full_path)
}

/// Loads weights into `model` from a checkpoint written by [`save_checkpoint`].
///
/// The format is taken from the file extension.
///
/// # Errors
///
/// - [`ModelError::CheckpointNotFound`] if the file doesn't exist
/// - [`ModelError::UnsupportedFormat`] for an unknown extension
/// - [`ModelError::LoadCheckpoint`] if the record doesn't match the module
pub fn load_checkpoint<B, M>(model: M, path: impl AsRef<Path>, device: &B::Device) -> Result<M>
where
    B: Backend,
    M: Module<B>,
{
    let path = path.as_ref();
    let shown = path.display().to_string();

    if !path.is_file() {
        return Err(ModelError::checkpoint_not_found(shown));
    }
    let format =
        CheckpointFormat::from_path(path).ok_or_else(|| ModelError::unsupported_format(&shown))?;

    let loaded = match format {
        CheckpointFormat::Binary => model.load_file(
            path.to_path_buf(),
            &BinFileRecorder::<FullPrecisionSettings>::new(),
            device,
        ),
        CheckpointFormat::Json => model.load_file(
            path.to_path_buf(),
            &PrettyJsonFileRecorder::<FullPrecisionSettings>::new(),
            device,
        ),
    }
    .map_err(|e| ModelError::load_checkpoint(&shown, e.to_string()))?;

    debug!(path = %shown, %format, "Loaded checkpoint");
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::nn::{Linear, LinearConfig};
    use burn::tensor::Tensor;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn values(linear: &Linear<TestBackend>) -> Vec<f32> {
        let device = <TestBackend as Backend>::Device::default();
        let x = Tensor::<TestBackend, 2>::ones([1, 3], &device);
        linear
            .forward(x)
            .into_data()
            .to_vec::<f32>()
            .unwrap()
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            CheckpointFormat::from_extension("bin"),
            Some(CheckpointFormat::Binary)
        );
        assert_eq!(
            CheckpointFormat::from_extension("JSON"),
            Some(CheckpointFormat::Json)
        );
        assert_eq!(CheckpointFormat::from_extension("pth"), None);
    }

    #[test]
    fn format_from_path() {
        assert_eq!(
            CheckpointFormat::from_path(Path::new("/runs/backbone.bin")),
            Some(CheckpointFormat::Binary)
        );
        assert_eq!(CheckpointFormat::from_path(Path::new("backbone")), None);
    }

    #[test]
    fn format_display_and_default() {
        assert_eq!(CheckpointFormat::default(), CheckpointFormat::Binary);
        assert_eq!(CheckpointFormat::Json.to_string(), "json");
        assert_eq!(CheckpointFormat::Binary.extension(), "bin");
    }

    #[test]
    fn save_then_load_restores_weights() {
        let device = <TestBackend as Backend>::Device::default();
        let dir = tempfile::tempdir().unwrap();

        for format in [CheckpointFormat::Binary, CheckpointFormat::Json] {
            let saved: Linear<TestBackend> = LinearConfig::new(3, 2).init(&device);
            let written = save_checkpoint(&saved, dir.path().join("linear"), format);
            assert!(written.is_ok(), "{format} save failed: {written:?}");
            let written = written.unwrap();
            assert_eq!(CheckpointFormat::from_path(&written), Some(format));

            let fresh: Linear<TestBackend> = LinearConfig::new(3, 2).init(&device);
            let loaded = load_checkpoint(fresh, &written, &device);
            assert!(loaded.is_ok(), "{format} load failed");
            let loaded = loaded.unwrap();
            assert_eq!(values(&saved), values(&loaded));
        }
    }

    #[test]
    fn load_missing_file() {
        let device = <TestBackend as Backend>::Device::default();
        let model: Linear<TestBackend> = LinearConfig::new(3, 2).init(&device);
        let result = load_checkpoint(model, "/nonexistent/model.bin", &device);
        assert!(matches!(result, Err(ModelError::CheckpointNotFound(_))));
    }

    #[test]
    fn load_unknown_extension() {
        let device = <TestBackend as Backend>::Device::default();
        let file = tempfile::Builder::new()
            .suffix(".pth")
            .tempfile()
            .unwrap();
        let model: Linear<TestBackend> = LinearConfig::new(3, 2).init(&device);
        let result = load_checkpoint(model, file.path(), &device);
        assert!(matches!(result, Err(ModelError::UnsupportedFormat(_))));
    }

    #[test]
    fn load_garbage_record() {
        let device = <TestBackend as Backend>::Device::default();
        let file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .unwrap();
        assert!(std::fs::write(file.path(), b"{\"not\": \"a record\"}").is_ok());

        let model: Linear<TestBackend> = LinearConfig::new(3, 2).init(&device);
        let result = load_checkpoint(model, file.path(), &device);
        assert!(matches!(result, Err(ModelError::LoadCheckpoint { .. })));
    }
}
