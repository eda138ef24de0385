use std::fmt;

use thiserror::Error;

/// Result alias for indicator operations.
pub type Result<T> = std::result::Result<T, IndicatorError>;

/// Which input sequence a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    Subset,
    Treatment,
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subset => write!(f, "subset_assignment"),
            Self::Treatment => write!(f, "treatment_label"),
        }
    }
}

#[derive(Debug, Error)]
pub enum IndicatorError {
    /// Caller broke the interface contract (length mismatch, zero chunk size,
    /// unknown target label). Not a data error.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A value outside its configured domain.
    #[error("{sequence}[{index}]: value {value} is outside the configured domain")]
    DomainViolation {
        sequence: Sequence,
        index: usize,
        value: String,
    },

    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (duplicate value, bad chunk size, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// Missing required column in the unit file.
    #[error("missing column '{column}'")]
    MissingColumn { column: String },

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl IndicatorError {
    /// True for errors that signal a programming/interface mistake rather
    /// than bad data: callers abort instead of discarding one candidate.
    pub fn is_contract_error(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    pub(crate) fn length_mismatch(subsets: usize, treatments: usize) -> Self {
        Self::InvalidArgument(format!(
            "subset_assignment has {subsets} unit(s) but treatment_label has {treatments}"
        ))
    }
}
