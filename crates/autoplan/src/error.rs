use thiserror::Error;

use crate::llm::LlmError;
use crate::tools::CatalogError;

/// Unified error type for the autoplan crate.
///
/// Plan-level problems (bad model output, failing tools, exhausted replans)
/// are reported inside result values, not through this type.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid input provided by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Configuration could not be read or written.
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    /// The run was aborted between phases.
    #[error("run cancelled")]
    Cancelled,
    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;
