use thiserror::Error;

/// Central error type for the stemkit-core crate.
///
/// Every pipeline stage returns this type; the first failure short-circuits
/// the rest of the run and becomes the terminal error result.
#[derive(Debug, Error)]
pub enum StemError {
    #[error("Input file not found: {path}")]
    InputNotFound { path: String },

    #[error("No input files provided")]
    NoInputsProvided,

    #[error("Sample rate mismatch: expected {expected}, got {actual} for {path}")]
    SampleRateMismatch {
        expected: u32,
        actual: u32,
        path: String,
    },

    #[error("Invalid volume list `{input}`: {reason}")]
    VolumeFormatInvalid { input: String, reason: String },

    #[error("Failed to load model `{model}`: {reason}")]
    ModelLoadFailure { model: String, reason: String },

    #[error("Failed to decode {path}: {reason}")]
    DecodeFailure { path: String, reason: String },

    #[error("Failed to encode {path}: {reason}")]
    EncodeFailure { path: String, reason: String },

    // Generic fallback (wraps anyhow)
    #[error("{0}")]
    Unexpected(#[from] anyhow::Error),
}

impl StemError {
    /// Stable machine-readable code, included in error JSON.
    pub fn code(&self) -> &'static str {
        match self {
            StemError::InputNotFound { .. } => "INPUT_NOT_FOUND",
            StemError::NoInputsProvided => "NO_INPUTS_PROVIDED",
            StemError::SampleRateMismatch { .. } => "SAMPLE_RATE_MISMATCH",
            StemError::VolumeFormatInvalid { .. } => "VOLUME_FORMAT_INVALID",
            StemError::ModelLoadFailure { .. } => "MODEL_LOAD_FAILURE",
            StemError::DecodeFailure { .. } => "DECODE_FAILURE",
            StemError::EncodeFailure { .. } => "ENCODE_FAILURE",
            StemError::Unexpected(_) => "UNEXPECTED",
        }
    }

    pub(crate) fn decode(path: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        StemError::DecodeFailure {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn encode(path: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        StemError::EncodeFailure {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn model(model: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        StemError::ModelLoadFailure {
            model: model.into(),
            reason: reason.to_string(),
        }
    }
}

// --- Implement From conversions for common errors ---
impl From<std::io::Error> for StemError {
    fn from(e: std::io::Error) -> Self {
        StemError::Unexpected(e.into())
    }
}

impl From<serde_json::Error> for StemError {
    fn from(e: serde_json::Error) -> Self {
        StemError::Unexpected(e.into())
    }
}

impl From<ndarray::ShapeError> for StemError {
    fn from(e: ndarray::ShapeError) -> Self {
        StemError::Unexpected(e.into())
    }
}

impl From<rubato::ResamplerConstructionError> for StemError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        StemError::Unexpected(e.into())
    }
}

impl From<rubato::ResampleError> for StemError {
    fn from(e: rubato::ResampleError) -> Self {
        StemError::Unexpected(e.into())
    }
}

pub type Result<T> = std::result::Result<T, StemError>;
