//! Payload parsing.

use crate::{DispatchError, DispatchResult};
use gatehouse_protocol_types::payload::{MULTI_TARGET_SCHEME, SINGLE_TARGET_SCHEME};

/// Targets addressed by one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSet {
    targets: Vec<String>,
    single: bool,
}

impl TargetSet {
    /// Parse an addressing-scheme payload.
    ///
    /// `multi-target:` entries are trimmed and blank entries dropped. A
    /// payload that addresses no target at all is malformed.
    pub fn parse(payload: Option<&str>) -> DispatchResult<Self> {
        let payload = payload.ok_or_else(|| invalid("<none>"))?;
        let (scheme, rest) = payload.split_once(':').ok_or_else(|| invalid(payload))?;

        let set = match scheme {
            SINGLE_TARGET_SCHEME => Self {
                targets: vec![rest.trim().to_string()],
                single: true,
            },
            MULTI_TARGET_SCHEME => Self {
                targets: rest
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect(),
                single: false,
            },
            _ => {
                return Err(DispatchError::MalformedPayload(format!(
                    "Unsupported payload scheme: {}",
                    payload
                )))
            }
        };

        if set.targets.iter().all(|t| t.is_empty()) {
            return Err(invalid(payload));
        }
        Ok(set)
    }

    /// Whether the payload used the single-target scheme.
    pub fn is_single(&self) -> bool {
        self.single
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

fn invalid(payload: &str) -> DispatchError {
    DispatchError::MalformedPayload(format!("Invalid data in payload: {}", payload))
}
