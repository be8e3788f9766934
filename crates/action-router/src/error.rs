//! Dispatch error types.
//!
//! Every variant renders to the flat diagnostic string legacy callers see.

use thiserror::Error;

/// Reasons a dispatched request fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Action name is not in the action table.
    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    /// Payload missing, empty, or using an unknown addressing scheme.
    #[error("{0}")]
    MalformedPayload(String),

    /// The only addressed target failed.
    #[error("Failed: {0}")]
    TargetFailed(String),

    /// Some of several per-item targets failed.
    #[error("Failed: [{}]", .0.join(", "))]
    TargetsFailed(Vec<String>),

    /// The batch handler reported these targets as failed.
    #[error("Failed packages: [{}]", .0.join(", "))]
    PartialBatchFailure(Vec<String>),

    /// The controller refused to launch; carries its reason verbatim.
    #[error("{0}")]
    LaunchRefused(String),

    /// The target has nothing to launch.
    #[error("no_launcher_activity")]
    NoLauncher,

    /// A handler raised or panicked.
    #[error("Internal exception: {0}")]
    InternalFault(String),
}

/// Result type alias using DispatchError.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Unexpected controller failure (e.g. the controlled subsystem is not set up).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerFault(pub String);

impl HandlerFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<HandlerFault> for DispatchError {
    fn from(fault: HandlerFault) -> Self {
        DispatchError::InternalFault(fault.0)
    }
}
