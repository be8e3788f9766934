//! Process-lifetime trust cache.
//!
//! Maps a caller package to either the fingerprint its signing certificate
//! must match or the verified sentinel. Entries are seeded at startup,
//! promoted at most once, and never removed. Promotion is idempotent, so
//! concurrent promotions of the same package always converge on
//! [`TrustEntry::Verified`].

use crate::Fingerprint;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Legacy integration partners and the array hash of their signing
/// certificates. Wire-compatible with existing clients; do not change.
pub const LEGACY_PARTNERS: [(&str, i32); 2] = [
    ("com.oasisfeng.greenify", -373_128_424),
    ("com.catchingnow.icebox", -502_198_281),
];

/// Verification state of a trusted package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustEntry {
    /// Certificate must still be checked against this fingerprint.
    Pending(Fingerprint),
    /// Already verified in this process; never checked again.
    Verified,
}

/// Concurrency-safe trust cache.
#[derive(Debug, Default)]
pub struct TrustCache {
    entries: RwLock<HashMap<String, TrustEntry>>,
}

impl TrustCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache seeded with [`LEGACY_PARTNERS`].
    pub fn with_legacy_partners() -> Self {
        let cache = Self::new();
        for (package, hash) in LEGACY_PARTNERS {
            cache.seed(package, Fingerprint::LegacyHash(hash));
        }
        cache
    }

    /// Add a pending entry. An existing entry for the package is kept.
    ///
    /// Returns whether the entry was added.
    pub fn seed(&self, package: &str, fingerprint: Fingerprint) -> bool {
        let mut entries = self.entries.write();
        if entries.contains_key(package) {
            return false;
        }
        entries.insert(package.to_string(), TrustEntry::Pending(fingerprint));
        true
    }

    /// Current entry of a package.
    pub fn lookup(&self, package: &str) -> Option<TrustEntry> {
        self.entries.read().get(package).copied()
    }

    /// Mark a package as verified for the rest of the process lifetime.
    ///
    /// Unknown packages are left out; returns whether the package is known.
    pub fn promote(&self, package: &str) -> bool {
        let mut entries = self.entries.write();
        match entries.get_mut(package) {
            Some(entry) => {
                if *entry != TrustEntry::Verified {
                    *entry = TrustEntry::Verified;
                    debug!(package = %package, "trust entry promoted to verified");
                }
                true
            }
            None => false,
        }
    }

    /// Number of trusted packages.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no package is trusted.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
