//! Invocation outcomes as carried back over the channel.

use crate::{ShuttleError, ShuttleResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a remote invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The unit could not be rebuilt; its body never ran.
    Reconstruction,
    /// The unit's body returned an error.
    Execution,
    /// Construction or execution panicked.
    Panic,
}

/// A failure captured on the executing side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Underlying causes, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl RemoteFailure {
    pub fn reconstruction(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Reconstruction,
            message: message.into(),
            causes: Vec::new(),
        }
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Panic,
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Capture an execution error with its cause chain.
    ///
    /// An error that is itself a remote failure of a nested shuttle call is
    /// unwrapped one level, so the origin sees the real cause.
    pub fn from_error(error: &anyhow::Error) -> Self {
        if let Some(ShuttleError::RemoteExecution(inner)) = error.downcast_ref::<ShuttleError>() {
            return inner.clone();
        }
        Self {
            kind: FailureKind::Execution,
            message: error.to_string(),
            causes: error.chain().skip(1).map(|c| c.to_string()).collect(),
        }
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for cause in &self.causes {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl From<RemoteFailure> for ShuttleError {
    fn from(failure: RemoteFailure) -> Self {
        match failure.kind {
            FailureKind::Reconstruction => ShuttleError::Reconstruction(failure.message),
            FailureKind::Execution | FailureKind::Panic => ShuttleError::RemoteExecution(failure),
        }
    }
}

/// Result of one remote invocation. Exactly one of value or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationOutcome {
    /// The unit ran. `result` is empty for void units.
    Completed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
    },
    /// The unit could not be rebuilt or failed while running.
    Failed { failure: RemoteFailure },
}

impl InvocationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, InvocationOutcome::Completed { .. })
    }

    /// Convert into the origin-side result.
    pub fn into_result(self) -> ShuttleResult<Option<serde_json::Value>> {
        match self {
            InvocationOutcome::Completed { result } => Ok(result),
            InvocationOutcome::Failed { failure } => Err(failure.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn wire_form_is_tagged() {
        let done = InvocationOutcome::Completed {
            result: Some(serde_json::json!(7)),
        };
        assert_eq!(
            serde_json::to_string(&done).unwrap(),
            r#"{"status":"completed","result":7}"#
        );

        let void: InvocationOutcome = serde_json::from_str(r#"{"status":"completed"}"#).unwrap();
        assert_eq!(void.into_result().unwrap(), None);
    }

    #[test]
    fn error_chain_is_kept() {
        let err = Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"))
            .context("writing state")
            .unwrap_err();
        let failure = RemoteFailure::from_error(&err);
        assert_eq!(failure.kind, FailureKind::Execution);
        assert_eq!(failure.message, "writing state");
        assert_eq!(failure.causes, vec!["disk gone".to_string()]);
        assert_eq!(failure.to_string(), "writing state: disk gone");
    }

    #[test]
    fn nested_remote_failure_is_unwrapped_once() {
        let inner = RemoteFailure {
            kind: FailureKind::Execution,
            message: "target missing".to_string(),
            causes: Vec::new(),
        };
        let err = anyhow::Error::new(ShuttleError::RemoteExecution(inner.clone()));
        assert_eq!(RemoteFailure::from_error(&err), inner);
    }

    #[test]
    fn reconstruction_failure_maps_to_reconstruction_error() {
        let outcome = InvocationOutcome::Failed {
            failure: RemoteFailure::reconstruction("unknown unit"),
        };
        assert_eq!(
            outcome.into_result().unwrap_err(),
            ShuttleError::Reconstruction("unknown unit".to_string())
        );
    }
}
