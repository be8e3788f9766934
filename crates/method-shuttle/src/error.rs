//! Shuttle error types.
//!
//! Errors are values: they are stored on completion handles and cloned to
//! every observer, so no variant carries a non-cloneable source.

use crate::RemoteFailure;
use thiserror::Error;

/// Shuttle error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShuttleError {
    /// Work unit fields do not line up with its declared parameters, or a
    /// value cannot cross the channel.
    #[error("Capture error: {0}")]
    Capture(String),

    /// The executing side could not rebuild the work unit.
    #[error("Reconstruction error: {0}")]
    Reconstruction(String),

    /// The channel could not connect or deliver.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The work unit ran and failed.
    #[error("Remote execution failed: {0}")]
    RemoteExecution(RemoteFailure),

    /// The returned value does not decode into the expected type.
    #[error("Result decode error: {0}")]
    ResultDecode(String),
}

/// Result type alias using ShuttleError.
pub type ShuttleResult<T> = Result<T, ShuttleError>;
