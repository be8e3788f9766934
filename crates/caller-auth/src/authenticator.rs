//! Caller verification.
//!
//! Strategies are tried in order and the first success wins:
//!
//! 1. Caller resolution. The transport peer uid is authoritative; the
//!    declared package (else the token's creator package) only names the
//!    caller. Without a peer uid the capability token is the sole source,
//!    and its creator package must be installed under its creator uid.
//! 2. Same app as this process (in any execution context).
//! 3. Live permission check for the action's permission.
//! 4. Trust cache: the named package must belong to the caller uid and its
//!    signing certificates must match the seeded fingerprint. The first
//!    match promotes the entry so later calls skip the certificate lookup.

use crate::{
    is_same_app, AuthError, AuthResult, CallerIdentity, CredentialResolver,
    EmbeddedCredentialResolver, PackageRegistry, RegistryError, TrustCache, TrustEntry,
};
use gatehouse_protocol_types::{Action, CallerToken};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the authenticator knows about an inbound request.
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    /// Action name as received.
    pub action: &'a str,
    /// Caller package declared in the request.
    pub caller_package: Option<&'a str>,
    /// Caller uid reported by the transport, when it knows one.
    pub peer_uid: Option<i64>,
    /// Capability token.
    pub caller_id: Option<&'a CallerToken>,
}

/// Which strategy accepted the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPath {
    /// Caller is this app, possibly in another execution context.
    SameApp,
    /// Caller holds the action's permission.
    Permission(&'static str),
    /// Caller is a trusted partner; `cached` when already verified earlier.
    TrustedPartner { cached: bool },
}

/// Authenticates API callers.
pub struct CallerAuthenticator {
    own_uid: i64,
    trust: Arc<TrustCache>,
    registry: Arc<dyn PackageRegistry>,
    resolver: Arc<dyn CredentialResolver>,
}

impl CallerAuthenticator {
    /// Create an authenticator for a process running as `own_uid`.
    pub fn new(own_uid: i64, trust: Arc<TrustCache>, registry: Arc<dyn PackageRegistry>) -> Self {
        Self {
            own_uid,
            trust,
            registry,
            resolver: Arc::new(EmbeddedCredentialResolver),
        }
    }

    /// Replace the capability token resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn CredentialResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// The trust cache consulted by the legacy strategy.
    pub fn trust_cache(&self) -> &Arc<TrustCache> {
        &self.trust
    }

    /// Verify a request's caller.
    pub fn verify(&self, request: &AuthRequest<'_>) -> AuthResult<AuthPath> {
        let caller = self.resolve_caller(request)?;

        if caller.uid > 0 && is_same_app(caller.uid, self.own_uid) {
            return Ok(AuthPath::SameApp);
        }

        debug!(package = %caller.package, uid = caller.uid, action = %request.action, "API invoked");

        if caller.has_uid() {
            if let Some(permission) = Action::from_name(request.action).map(Action::permission) {
                if self.registry.check_permission(permission, caller.uid) {
                    return Ok(AuthPath::Permission(permission));
                }
            }
        }

        self.verify_trusted_partner(&caller)
    }

    fn resolve_caller(&self, request: &AuthRequest<'_>) -> AuthResult<CallerIdentity> {
        if let Some(uid) = request.peer_uid {
            let package = match request.caller_package {
                Some(package) => package.to_string(),
                None => self.resolve_token(request.caller_id)?.package,
            };
            return Ok(CallerIdentity { package, uid });
        }

        // No transport metadata: the token's creator must check out on its own.
        let caller = self.resolve_token(request.caller_id)?;
        self.check_ownership(&caller)?;
        Ok(caller)
    }

    fn resolve_token(&self, token: Option<&CallerToken>) -> AuthResult<CallerIdentity> {
        let token = token.ok_or_else(|| {
            AuthError::MissingCredential("Missing required credential: caller_id".to_string())
        })?;
        self.resolver.resolve(token).ok_or_else(|| {
            AuthError::MissingCredential(format!("No creator information in {:?}", token))
        })
    }

    /// The named package must be installed under the caller's app.
    fn check_ownership(&self, caller: &CallerIdentity) -> AuthResult<()> {
        match self.registry.uid_of(&caller.package) {
            None => Err(AuthError::ClientNotFound(caller.package.clone())),
            Some(owner) if is_same_app(owner, caller.uid) => Ok(()),
            Some(owner) => {
                warn!(
                    package = %caller.package,
                    uid = caller.uid,
                    owner = owner,
                    "caller named a package it does not own"
                );
                Err(AuthError::UnauthorizedClient(caller.package.clone()))
            }
        }
    }

    fn verify_trusted_partner(&self, caller: &CallerIdentity) -> AuthResult<AuthPath> {
        let package = caller.package.as_str();
        let entry = self
            .trust
            .lookup(package)
            .ok_or_else(|| AuthError::UnauthorizedClient(package.to_string()))?;

        self.check_ownership(caller)?;

        let fingerprint = match entry {
            TrustEntry::Verified => return Ok(AuthPath::TrustedPartner { cached: true }),
            TrustEntry::Pending(fingerprint) => fingerprint,
        };

        let certificates = self
            .registry
            .signing_certificates(package)
            .map_err(|e| match e {
                RegistryError::NotFound(_) | RegistryError::Query(_) => {
                    debug!(package = %package, error = %e, "certificate lookup failed");
                    AuthError::ClientNotFound(package.to_string())
                }
            })?;

        // Every certificate must match; an unsigned package never does.
        if certificates.is_empty() || !certificates.iter().all(|c| fingerprint.matches(c)) {
            return Err(AuthError::SignatureMismatch(package.to_string()));
        }

        self.trust.promote(package);
        info!(package = %package, fingerprint = %fingerprint, "trusted partner verified");
        Ok(AuthPath::TrustedPartner { cached: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Fingerprint, PER_CONTEXT_UID_RANGE};
    use gatehouse_protocol_types::{actions, permissions};
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const OWN_UID: i64 = 10_042;
    const PARTNER: &str = "org.example.partner";
    const PARTNER_UID: i64 = 10_077;
    const PARTNER_CERT: &[u8] = b"partner-signing-certificate";
    const STRANGER_UID: i64 = 10_500;

    #[derive(Default)]
    struct MockRegistry {
        grants: Mutex<HashSet<(String, i64)>>,
        installed: Mutex<HashMap<String, (i64, Vec<Vec<u8>>)>>,
        certificate_lookups: AtomicUsize,
        permission_checks: AtomicUsize,
    }

    impl MockRegistry {
        fn grant(&self, permission: &str, uid: i64) {
            self.grants.lock().insert((permission.to_string(), uid));
        }

        fn install(&self, package: &str, uid: i64, certificates: Vec<Vec<u8>>) {
            self.installed
                .lock()
                .insert(package.to_string(), (uid, certificates));
        }

        fn lookups(&self) -> usize {
            self.certificate_lookups.load(Ordering::SeqCst)
        }
    }

    impl PackageRegistry for MockRegistry {
        fn check_permission(&self, permission: &str, uid: i64) -> bool {
            self.permission_checks.fetch_add(1, Ordering::SeqCst);
            self.grants.lock().contains(&(permission.to_string(), uid))
        }

        fn uid_of(&self, package: &str) -> Option<i64> {
            self.installed.lock().get(package).map(|(uid, _)| *uid)
        }

        fn signing_certificates(&self, package: &str) -> Result<Vec<Vec<u8>>, RegistryError> {
            self.certificate_lookups.fetch_add(1, Ordering::SeqCst);
            self.installed
                .lock()
                .get(package)
                .map(|(_, certificates)| certificates.clone())
                .ok_or_else(|| RegistryError::NotFound(package.to_string()))
        }
    }

    fn setup() -> (CallerAuthenticator, Arc<MockRegistry>, Arc<TrustCache>) {
        let registry = Arc::new(MockRegistry::default());
        let trust = Arc::new(TrustCache::with_legacy_partners());
        trust.seed(
            PARTNER,
            Fingerprint::LegacyHash(Fingerprint::legacy_hash(PARTNER_CERT)),
        );
        let auth = CallerAuthenticator::new(OWN_UID, trust.clone(), registry.clone());
        (auth, registry, trust)
    }

    fn request<'a>(action: &'a str, package: Option<&'a str>, peer_uid: i64) -> AuthRequest<'a> {
        AuthRequest {
            action,
            caller_package: package,
            peer_uid: Some(peer_uid),
            caller_id: None,
        }
    }

    fn token_request<'a>(
        action: &'a str,
        token: &'a CallerToken,
        peer_uid: Option<i64>,
    ) -> AuthRequest<'a> {
        AuthRequest {
            action,
            caller_package: None,
            peer_uid,
            caller_id: Some(token),
        }
    }

    #[test]
    fn same_app_is_trusted_for_every_action() {
        let (auth, registry, _) = setup();
        let other_context_uid = 3 * PER_CONTEXT_UID_RANGE + OWN_UID;

        for action in [
            actions::ACTIVATE_TARGET,
            actions::DEACTIVATE_TARGET,
            actions::LAUNCH_TARGET,
            actions::SUSPEND_TARGETS,
            actions::UNSUSPEND_TARGETS,
            "not-an-action",
        ] {
            let path = auth
                .verify(&request(action, Some("org.self"), other_context_uid))
                .unwrap();
            assert_eq!(path, AuthPath::SameApp);
        }
        assert_eq!(registry.permission_checks.load(Ordering::SeqCst), 0);
        assert_eq!(registry.lookups(), 0);
    }

    #[test]
    fn permission_holder_is_trusted_without_cache_entry() {
        let (auth, registry, trust) = setup();
        registry.grant(permissions::SUSPEND_PACKAGE, STRANGER_UID);

        let path = auth
            .verify(&request(actions::UNSUSPEND_TARGETS, Some("org.stranger"), STRANGER_UID))
            .unwrap();
        assert_eq!(path, AuthPath::Permission(permissions::SUSPEND_PACKAGE));
        assert!(trust.lookup("org.stranger").is_none());
    }

    #[test]
    fn permission_for_other_action_does_not_help() {
        let (auth, registry, _) = setup();
        registry.grant(permissions::LAUNCH_PACKAGE, STRANGER_UID);

        let err = auth
            .verify(&request(actions::SUSPEND_TARGETS, Some("org.stranger"), STRANGER_UID))
            .unwrap_err();
        assert_eq!(err, AuthError::UnauthorizedClient("org.stranger".to_string()));
    }

    #[test]
    fn matching_fingerprint_promotes_and_skips_second_lookup() {
        let (auth, registry, trust) = setup();
        registry.install(PARTNER, PARTNER_UID, vec![PARTNER_CERT.to_vec()]);

        let first = auth
            .verify(&request(actions::LAUNCH_TARGET, Some(PARTNER), PARTNER_UID))
            .unwrap();
        assert_eq!(first, AuthPath::TrustedPartner { cached: false });
        assert_eq!(trust.lookup(PARTNER), Some(TrustEntry::Verified));
        assert_eq!(registry.lookups(), 1);

        let second = auth
            .verify(&request(actions::LAUNCH_TARGET, Some(PARTNER), PARTNER_UID))
            .unwrap();
        assert_eq!(second, AuthPath::TrustedPartner { cached: true });
        assert_eq!(registry.lookups(), 1);
    }

    #[test]
    fn partner_in_another_context_is_verified() {
        let (auth, registry, _) = setup();
        registry.install(PARTNER, PARTNER_UID, vec![PARTNER_CERT.to_vec()]);

        let path = auth
            .verify(&request(
                actions::LAUNCH_TARGET,
                Some(PARTNER),
                10 * PER_CONTEXT_UID_RANGE + PARTNER_UID,
            ))
            .unwrap();
        assert_eq!(path, AuthPath::TrustedPartner { cached: false });
    }

    #[test]
    fn peer_naming_a_foreign_partner_is_rejected() {
        let (auth, registry, trust) = setup();
        registry.install(PARTNER, PARTNER_UID, vec![PARTNER_CERT.to_vec()]);

        let err = auth
            .verify(&request(actions::ACTIVATE_TARGET, Some(PARTNER), STRANGER_UID))
            .unwrap_err();
        assert_eq!(err, AuthError::UnauthorizedClient(PARTNER.to_string()));
        assert_eq!(registry.lookups(), 0);

        // A verified entry does not lend its trust to other callers either.
        auth.verify(&request(actions::ACTIVATE_TARGET, Some(PARTNER), PARTNER_UID))
            .unwrap();
        assert_eq!(trust.lookup(PARTNER), Some(TrustEntry::Verified));
        let err = auth
            .verify(&request(actions::ACTIVATE_TARGET, Some(PARTNER), STRANGER_UID))
            .unwrap_err();
        assert_eq!(err, AuthError::UnauthorizedClient(PARTNER.to_string()));
    }

    #[test]
    fn peer_uid_overrides_token_creator_uid() {
        let (auth, registry, _) = setup();
        registry.install("org.evil", STRANGER_UID, Vec::new());
        let forged = CallerToken::new("org.evil", OWN_UID);

        let err = auth
            .verify(&token_request(actions::SUSPEND_TARGETS, &forged, Some(STRANGER_UID)))
            .unwrap_err();
        assert_eq!(err, AuthError::UnauthorizedClient("org.evil".to_string()));
    }

    #[test]
    fn token_naming_a_partner_from_a_foreign_peer_is_rejected() {
        let (auth, registry, _) = setup();
        registry.install(PARTNER, PARTNER_UID, vec![PARTNER_CERT.to_vec()]);
        let token = CallerToken::new(PARTNER, PARTNER_UID);

        let err = auth
            .verify(&token_request(actions::LAUNCH_TARGET, &token, Some(STRANGER_UID)))
            .unwrap_err();
        assert_eq!(err, AuthError::UnauthorizedClient(PARTNER.to_string()));
    }

    #[test]
    fn token_alone_must_match_installed_owner() {
        let (auth, registry, _) = setup();
        registry.install(PARTNER, PARTNER_UID, vec![PARTNER_CERT.to_vec()]);

        let genuine = CallerToken::new(PARTNER, PARTNER_UID);
        let path = auth
            .verify(&token_request(actions::LAUNCH_TARGET, &genuine, None))
            .unwrap();
        assert_eq!(path, AuthPath::TrustedPartner { cached: false });

        let forged = CallerToken::new(PARTNER, OWN_UID);
        let err = auth
            .verify(&token_request(actions::LAUNCH_TARGET, &forged, None))
            .unwrap_err();
        assert_eq!(err, AuthError::UnauthorizedClient(PARTNER.to_string()));

        let unknown = CallerToken::new("org.evil", OWN_UID);
        let err = auth
            .verify(&token_request(actions::LAUNCH_TARGET, &unknown, None))
            .unwrap_err();
        assert_eq!(err, AuthError::ClientNotFound("org.evil".to_string()));
    }

    #[test]
    fn own_token_without_transport_is_same_app() {
        let (auth, registry, _) = setup();
        registry.install("org.self", OWN_UID, Vec::new());
        let token = CallerToken::new("org.self", OWN_UID);

        let path = auth
            .verify(&token_request(actions::SUSPEND_TARGETS, &token, None))
            .unwrap();
        assert_eq!(path, AuthPath::SameApp);
    }

    #[test]
    fn declared_package_without_transport_needs_a_token() {
        let (auth, _, _) = setup();
        let err = auth
            .verify(&AuthRequest {
                action: actions::LAUNCH_TARGET,
                caller_package: Some("org.self"),
                peer_uid: None,
                caller_id: None,
            })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required credential: caller_id"
        );
    }

    #[test]
    fn mismatching_fingerprint_is_rejected_and_not_promoted() {
        let (auth, registry, trust) = setup();
        registry.install(PARTNER, PARTNER_UID, vec![b"forged-certificate".to_vec()]);

        let err = auth
            .verify(&request(actions::DEACTIVATE_TARGET, Some(PARTNER), PARTNER_UID))
            .unwrap_err();
        assert_eq!(err, AuthError::SignatureMismatch(PARTNER.to_string()));
        assert!(matches!(
            trust.lookup(PARTNER),
            Some(TrustEntry::Pending(_))
        ));
    }

    #[test]
    fn any_mismatching_certificate_rejects() {
        let (auth, registry, _) = setup();
        registry.install(
            PARTNER,
            PARTNER_UID,
            vec![PARTNER_CERT.to_vec(), b"second-signer".to_vec()],
        );

        let err = auth
            .verify(&request(actions::LAUNCH_TARGET, Some(PARTNER), PARTNER_UID))
            .unwrap_err();
        assert!(matches!(err, AuthError::SignatureMismatch(_)));
    }

    #[test]
    fn unsigned_package_is_rejected() {
        let (auth, registry, _) = setup();
        registry.install(PARTNER, PARTNER_UID, Vec::new());

        let err = auth
            .verify(&request(actions::LAUNCH_TARGET, Some(PARTNER), PARTNER_UID))
            .unwrap_err();
        assert!(matches!(err, AuthError::SignatureMismatch(_)));
    }

    #[test]
    fn uninstalled_partner_is_reported() {
        let (auth, _, _) = setup();
        let err = auth
            .verify(&request(actions::LAUNCH_TARGET, Some("com.catchingnow.icebox"), 10_300))
            .unwrap_err();
        assert_eq!(
            err,
            AuthError::ClientNotFound("com.catchingnow.icebox".to_string())
        );
    }

    #[test]
    fn unknown_package_is_unauthorized() {
        let (auth, _, _) = setup();
        let err = auth
            .verify(&request(actions::LAUNCH_TARGET, Some("org.unknown"), 10_700))
            .unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized client: org.unknown");
    }

    #[test]
    fn missing_package_and_token_is_unauthenticatable() {
        let (auth, _, _) = setup();
        let err = auth
            .verify(&request(actions::LAUNCH_TARGET, None, 10_700))
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingCredential(_)));
    }

    #[test]
    fn token_without_creator_is_rejected() {
        let (auth, _, _) = setup();
        let token = CallerToken {
            creator_package: None,
            creator_uid: OWN_UID,
        };
        let err = auth
            .verify(&token_request(actions::LAUNCH_TARGET, &token, None))
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingCredential(_)));
    }

    #[test]
    fn unknown_uid_skips_permission_check() {
        let (auth, registry, _) = setup();
        registry.grant(permissions::LAUNCH_PACKAGE, -1);

        let err = auth
            .verify(&request(actions::LAUNCH_TARGET, Some("org.stranger"), -1))
            .unwrap_err();
        assert!(matches!(err, AuthError::UnauthorizedClient(_)));
        assert_eq!(registry.permission_checks.load(Ordering::SeqCst), 0);
    }
}
