// crates/adcpnc-core/src/error.rs

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use adcpnc_meta::MetadataError;

/// Pipeline stage, used to say where a requirement was not met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Load,
    Atmospheric,
    Clip,
    Depth,
    Transform,
    Trim,
    Reshape,
    Annotate,
    Output,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Atmospheric => "atmospheric correction",
            Stage::Clip => "clip",
            Stage::Depth => "depth/orientation",
            Stage::Transform => "coordinate transform",
            Stage::Trim => "qa/qc trim",
            Stage::Reshape => "dimension normalization",
            Stage::Annotate => "epic annotation",
            Stage::Output => "output",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage}: required attribute '{key}' is missing")]
    MissingAttribute { stage: Stage, key: String },

    #[error("{stage}: required variable '{name}' is missing")]
    MissingVariable { stage: Stage, name: String },

    #[error("{stage}: attribute '{key}' is invalid: {reason}")]
    InvalidAttribute {
        stage: Stage,
        key: String,
        reason: String,
    },

    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("{stage}: variable '{variable}' has {found} samples along '{dim}', expected {expected}")]
    ShapeMismatch {
        stage: Stage,
        variable: String,
        dim: String,
        expected: usize,
        found: usize,
    },

    #[error("{stage}: variable '{name}' already exists")]
    DuplicateVariable { stage: Stage, name: String },

    #[error("vertical axis already swapped from bindist to depth")]
    AlreadySwapped,

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("array shape error: {0}")]
    Array(#[from] ndarray::ShapeError),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),
}

impl PipelineError {
    pub fn missing_attribute(stage: Stage, key: impl Into<String>) -> Self {
        PipelineError::MissingAttribute {
            stage,
            key: key.into(),
        }
    }

    pub fn missing_variable(stage: Stage, name: impl Into<String>) -> Self {
        PipelineError::MissingVariable {
            stage,
            name: name.into(),
        }
    }

    pub fn invalid_attribute(stage: Stage, key: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::InvalidAttribute {
            stage,
            key: key.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Advisory conditions. They are reported to the caller and logged, but the
/// conversion still completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    NonIntegerTimeEncoding { count: usize },
    DeclinationMissing,
    TimeNotShifted { seconds: f64 },
    DefaultInstrumentHeight,
    OrientationMismatch { declared: String, matrix_suggests: String },
    NonIntegerDeltaT { seconds: f64 },
    TrimWithoutPressure,
    TrimSkippedDownward,
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::NonIntegerTimeEncoding { count } => write!(
                f,
                "{count} EPIC time values are not integers; this will cause problems with time and time2"
            ),
            PipelineWarning::DeclinationMissing => f.write_str(
                "no magnetic variation information provided; not correcting compass orientation",
            ),
            PipelineWarning::TimeNotShifted { seconds } => write!(
                f,
                "time NOT shifted because not a whole number of seconds: {seconds} s"
            ),
            PipelineWarning::DefaultInstrumentHeight => {
                f.write_str("initial_instrument_height not supplied; using 0")
            }
            PipelineWarning::OrientationMismatch {
                declared,
                matrix_suggests,
            } => write!(
                f,
                "declared orientation {declared} disagrees with calibration matrix ({matrix_suggests})"
            ),
            PipelineWarning::NonIntegerDeltaT { seconds } => {
                write!(f, "DELTA_T is not an integer ({seconds} s); casting as int in attrs")
            }
            PipelineWarning::TrimWithoutPressure => f.write_str(
                "no pressure series available; trimming against nominal instrument depth",
            ),
            PipelineWarning::TrimSkippedDownward => {
                f.write_str("instrument faces down; water level trimming skipped")
            }
        }
    }
}
