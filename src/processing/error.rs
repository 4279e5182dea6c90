use thiserror::Error;
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid band [{low}, {high}] Hz: cutoffs must satisfy 0 < low < high < nyquist ({nyquist} Hz)")]
    InvalidBand { low: f64, high: f64, nyquist: f64 },
    #[error("unknown band '{name}'; available bands: {available}")]
    UnknownBand { name: String, available: String },
    #[error("baseline channel '{channel}' has zero variance")]
    ZeroVariance { channel: String },
    #[error("baseline needs at least {required} samples, got {actual}")]
    InsufficientBaseline { required: usize, actual: usize },
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("channel '{channel}' has {actual} samples, expected {expected}")]
    LengthMismatch {
        channel: String,
        expected: usize,
        actual: usize,
    },
    #[error("label count mismatch: {samples} samples but {labels} labels")]
    LabelLengthMismatch { samples: usize, labels: usize },
    #[error("invalid channel layout: {0}")]
    InvalidLayout(String),
    #[error("sample is missing channel '{0}'")]
    MissingChannel(String),
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),
    #[error("invalid window: {0}")]
    InvalidWindow(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
