//! API protocol definitions.
//!
//! Requests and responses travel as single JSON lines. A response carries at
//! most one diagnostic string: its absence means success. The diagnostic text
//! is meant for humans and logs only; clients must treat the outcome as a
//! boolean and never parse the message.

use serde::{Deserialize, Serialize};

/// Action names accepted by the gateway.
pub mod actions {
    /// Make targets active again (reverses `deactivate-target`).
    pub const ACTIVATE_TARGET: &str = "activate-target";
    /// Put targets into the inactive (frozen) state.
    pub const DEACTIVATE_TARGET: &str = "deactivate-target";
    /// Launch a single target.
    pub const LAUNCH_TARGET: &str = "launch-target";
    /// Suspend a set of targets.
    pub const SUSPEND_TARGETS: &str = "suspend-targets";
    /// Lift suspension of a set of targets.
    pub const UNSUSPEND_TARGETS: &str = "unsuspend-targets";
}

/// Permissions that grant callers access to action pairs.
pub mod permissions {
    /// Grants `activate-target` and `deactivate-target`.
    pub const FREEZE_PACKAGE: &str = "gatehouse.permission.FREEZE_PACKAGE";
    /// Grants `launch-target`.
    pub const LAUNCH_PACKAGE: &str = "gatehouse.permission.LAUNCH_PACKAGE";
    /// Grants `suspend-targets` and `unsuspend-targets`.
    pub const SUSPEND_PACKAGE: &str = "gatehouse.permission.SUSPEND_PACKAGE";
}

/// The closed set of actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    ActivateTarget,
    DeactivateTarget,
    LaunchTarget,
    SuspendTargets,
    UnsuspendTargets,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::ActivateTarget,
        Action::DeactivateTarget,
        Action::LaunchTarget,
        Action::SuspendTargets,
        Action::UnsuspendTargets,
    ];

    /// Look up an action by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.name() == name)
    }

    /// Wire name of the action.
    pub fn name(self) -> &'static str {
        match self {
            Action::ActivateTarget => actions::ACTIVATE_TARGET,
            Action::DeactivateTarget => actions::DEACTIVATE_TARGET,
            Action::LaunchTarget => actions::LAUNCH_TARGET,
            Action::SuspendTargets => actions::SUSPEND_TARGETS,
            Action::UnsuspendTargets => actions::UNSUSPEND_TARGETS,
        }
    }

    /// Permission that authorizes a caller for this action.
    ///
    /// Paired actions share one permission.
    pub fn permission(self) -> &'static str {
        match self {
            Action::ActivateTarget | Action::DeactivateTarget => permissions::FREEZE_PACKAGE,
            Action::LaunchTarget => permissions::LAUNCH_PACKAGE,
            Action::SuspendTargets | Action::UnsuspendTargets => permissions::SUSPEND_PACKAGE,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload addressing schemes.
pub mod payload {
    /// `single-target:<id>`
    pub const SINGLE_TARGET_SCHEME: &str = "single-target";
    /// `multi-target:<id>[,<id>...]`
    pub const MULTI_TARGET_SCHEME: &str = "multi-target";

    /// Build a payload addressing one target.
    pub fn single(target: &str) -> String {
        format!("{}:{}", SINGLE_TARGET_SCHEME, target)
    }

    /// Build a payload addressing several targets.
    pub fn multi<S: AsRef<str>>(targets: &[S]) -> String {
        let joined = targets
            .iter()
            .map(|t| t.as_ref())
            .collect::<Vec<_>>()
            .join(",");
        format!("{}:{}", MULTI_TARGET_SCHEME, joined)
    }
}

/// Capability token proving which package created it.
///
/// Used when the transport cannot tell who the caller is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerToken {
    /// Package that minted the token, if the token carries it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_package: Option<String>,
    /// Numeric identity of the creator (negative when unknown).
    #[serde(default = "unknown_uid")]
    pub creator_uid: i64,
}

fn unknown_uid() -> i64 {
    -1
}

impl CallerToken {
    pub fn new(creator_package: &str, creator_uid: i64) -> Self {
        Self {
            creator_package: Some(creator_package.to_string()),
            creator_uid,
        }
    }
}

/// API request message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Request ID for correlation.
    pub id: String,
    /// Action to invoke.
    pub action: String,
    /// Package name the caller declares.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_package: Option<String>,
    /// Capability token identifying the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_id: Option<CallerToken>,
    /// Addressing-scheme payload (e.g. `single-target:org.example.app`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl ApiRequest {
    /// Create a new request with auto-generated ID.
    pub fn new(action: &str, payload: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            action: action.to_string(),
            caller_package: None,
            caller_id: None,
            payload,
        }
    }

    /// Declare the caller package.
    pub fn with_caller_package(mut self, package: &str) -> Self {
        self.caller_package = Some(package.to_string());
        self
    }

    /// Attach a capability token.
    pub fn with_caller_id(mut self, token: CallerToken) -> Self {
        self.caller_id = Some(token);
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// API response message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Request ID this responds to (empty when the request was unparsable).
    pub id: String,
    /// Diagnostic for a failed request; absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl ApiResponse {
    /// Create a success response.
    pub fn success(id: &str) -> Self {
        Self {
            id: id.to_string(),
            diagnostic: None,
        }
    }

    /// Create a failure response.
    pub fn failure(id: &str, diagnostic: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            diagnostic: Some(diagnostic.into()),
        }
    }

    /// Check if this is a success response.
    pub fn is_success(&self) -> bool {
        self.diagnostic.is_none()
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
