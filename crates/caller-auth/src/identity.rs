//! Caller identities.
//!
//! A numeric identity (uid) packs the execution context and the app:
//! `uid = context * PER_CONTEXT_UID_RANGE + app_id`. The same app installed
//! in two execution contexts has two uids sharing one app id.

/// Number of uids reserved for each execution context.
pub const PER_CONTEXT_UID_RANGE: i64 = 100_000;

/// Who is calling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Package name of the caller.
    pub package: String,
    /// Numeric identity (negative when unknown).
    pub uid: i64,
}

impl CallerIdentity {
    pub fn new(package: &str, uid: i64) -> Self {
        Self {
            package: package.to_string(),
            uid,
        }
    }

    /// Whether the numeric identity is known.
    pub fn has_uid(&self) -> bool {
        self.uid >= 0
    }
}

/// App part of a uid.
pub fn app_id(uid: i64) -> i64 {
    uid % PER_CONTEXT_UID_RANGE
}

/// Execution-context part of a uid.
pub fn context_id(uid: i64) -> i64 {
    uid / PER_CONTEXT_UID_RANGE
}

/// Whether two uids belong to the same app, possibly in different contexts.
pub fn is_same_app(uid: i64, other: i64) -> bool {
    uid >= 0 && other >= 0 && app_id(uid) == app_id(other)
}
