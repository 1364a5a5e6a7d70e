use thiserror::Error;

#[derive(Error, Debug)]
pub enum VrmError {
    #[error("Problem must be paired with a survey before {0}")]
    NotPaired(&'static str),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        got: usize,
    },

    #[error("Refinement flag {level} for cell {cell} exceeds refinement factor {max}")]
    InvalidRefinementFlag {
        cell: usize,
        level: usize,
        max: usize,
    },

    #[error("Waveform '{waveform}' does not support field type '{field_type}'")]
    UnsupportedFieldType {
        waveform: &'static str,
        field_type: String,
    },

    #[error("Invalid time channel: {0}")]
    InvalidTimeChannel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VrmError {
    pub fn dimension(what: impl Into<String>, expected: usize, got: usize) -> Self {
        VrmError::DimensionMismatch {
            what: what.into(),
            expected,
            got,
        }
    }
}

pub type VrmResult<T> = Result<T, VrmError>;
