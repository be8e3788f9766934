//! Authentication error types.
//!
//! Messages are local diagnostics; they are not part of the API contract.

use thiserror::Error;

/// Reasons a caller is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Neither transport metadata nor a usable capability token.
    #[error("{0}")]
    MissingCredential(String),

    /// Caller is not in the trust cache.
    #[error("Unauthorized client: {0}")]
    UnauthorizedClient(String),

    /// Caller package could not be queried from the package registry.
    #[error("Permission denied or client package not found: {0}")]
    ClientNotFound(String),

    /// Live signing certificate differs from the trusted fingerprint.
    #[error("Package signature mismatch: {0}")]
    SignatureMismatch(String),
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;

/// Package registry query failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No such package is installed.
    #[error("Package not found: {0}")]
    NotFound(String),

    /// The registry refused or failed the query.
    #[error("Package query failed: {0}")]
    Query(String),
}
