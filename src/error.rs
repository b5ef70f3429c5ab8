use thiserror::Error;

/// Failures of the analysis pipeline.
///
/// Every variant aborts the run; a malformed session is never skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LfpError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("data shape error: {0}")]
    DataShape(String),

    #[error("numeric instability: {0}")]
    NumericInstability(String),
}

pub type Result<T> = std::result::Result<T, LfpError>;
