use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct FormatAttempt {
    pub format: &'static str,
    pub message: String,
}

impl FormatAttempt {
    pub fn new(format: &'static str, message: impl Into<String>) -> Self {
        Self {
            format,
            message: message.into(),
        }
    }
}

impl fmt::Display for FormatAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.format, self.message)
    }
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("{format} format mismatch: {reason}")]
    FormatMismatch {
        format: &'static str,
        reason: String,
    },

    #[error("{format} row {line_index} invalid: {message}")]
    InvalidRow {
        format: &'static str,
        line_index: usize,
        message: String,
    },

    #[error("{format} CSV error: {source}")]
    Csv {
        format: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("metadata key '{key}' has an unusable value: {message}")]
    InvalidValue { key: String, message: String },

    #[error("failed to read metadata file: {0}")]
    Io(#[from] std::io::Error),

    #[error("{format} file did not contain any attributes")]
    Empty { format: &'static str },

    #[error("no metadata format recognized this file; attempts: {attempts:?}")]
    NoMatchingFormat { attempts: Vec<FormatAttempt> },
}
