//! Platform seams used by the authenticator.

use crate::{CallerIdentity, RegistryError};
use gatehouse_protocol_types::CallerToken;

/// Local package registry of the host platform.
///
/// Both queries are local lookups; implementations must not perform remote
/// calls.
pub trait PackageRegistry: Send + Sync {
    /// Whether `uid` currently holds `permission`.
    fn check_permission(&self, permission: &str, uid: i64) -> bool;

    /// Uid an installed package runs as, `None` when it is not installed.
    fn uid_of(&self, package: &str) -> Option<i64>;

    /// Signing certificates of an installed package.
    fn signing_certificates(&self, package: &str) -> Result<Vec<Vec<u8>>, RegistryError>;
}

/// Resolves capability tokens into caller identities.
pub trait CredentialResolver: Send + Sync {
    /// `None` when the token carries no creator information.
    fn resolve(&self, token: &CallerToken) -> Option<CallerIdentity>;
}

/// Resolver reading the creator fields embedded in the token.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedCredentialResolver;

impl CredentialResolver for EmbeddedCredentialResolver {
    fn resolve(&self, token: &CallerToken) -> Option<CallerIdentity> {
        let package = token.creator_package.as_deref()?;
        if package.trim().is_empty() {
            return None;
        }
        Some(CallerIdentity::new(package, token.creator_uid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_resolver_reads_creator() {
        let token = CallerToken::new("org.example.partner", 10_077);
        let identity = EmbeddedCredentialResolver.resolve(&token).unwrap();
        assert_eq!(identity, CallerIdentity::new("org.example.partner", 10_077));
    }

    #[test]
    fn embedded_resolver_rejects_anonymous_tokens() {
        let anonymous = CallerToken {
            creator_package: None,
            creator_uid: 10_077,
        };
        assert!(EmbeddedCredentialResolver.resolve(&anonymous).is_none());

        let blank = CallerToken::new("  ", 10_077);
        assert!(EmbeddedCredentialResolver.resolve(&blank).is_none());
    }
}
