//! Caller authentication for the Gatehouse API.
//!
//! This crate provides:
//! - Caller identities and the same-app check across execution contexts
//! - Signing-certificate fingerprints (legacy array hash and SHA-256)
//! - A process-lifetime trust cache pre-seeded with legacy partners
//! - The authenticator: same-app bypass, live permission check, then
//!   fingerprint verification through the trust cache

mod authenticator;
mod error;
mod fingerprint;
mod identity;
mod platform;
mod trust_cache;

pub use authenticator::{AuthPath, AuthRequest, CallerAuthenticator};
pub use error::{AuthError, AuthResult, RegistryError};
pub use fingerprint::Fingerprint;
pub use identity::{app_id, context_id, is_same_app, CallerIdentity, PER_CONTEXT_UID_RANGE};
pub use platform::{CredentialResolver, EmbeddedCredentialResolver, PackageRegistry};
pub use trust_cache::{TrustCache, TrustEntry, LEGACY_PARTNERS};
