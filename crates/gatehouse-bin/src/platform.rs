//! Package registry and trust cache built from the configuration.

use caller_auth::{Fingerprint, PackageRegistry, RegistryError, TrustCache};
use gatehouse_config_and_utils::{Config, CoreResult};
use std::collections::{HashMap, HashSet};
use tracing::debug;

struct PackageEntry {
    uid: i64,
    certificates: Vec<Vec<u8>>,
    permissions: HashSet<String>,
}

/// Package registry backed by the `packages` section of the config.
pub struct StaticPackageRegistry {
    packages: HashMap<String, PackageEntry>,
}

impl StaticPackageRegistry {
    pub fn from_config(config: &Config) -> CoreResult<Self> {
        let mut packages = HashMap::new();
        for record in &config.packages {
            packages.insert(
                record.package.clone(),
                PackageEntry {
                    uid: record.uid,
                    certificates: record.decoded_certificates()?,
                    permissions: record.permissions.iter().cloned().collect(),
                },
            );
        }
        debug!(packages = packages.len(), "package registry loaded");
        Ok(Self { packages })
    }
}

impl PackageRegistry for StaticPackageRegistry {
    fn check_permission(&self, permission: &str, uid: i64) -> bool {
        self.packages
            .values()
            .any(|entry| entry.uid == uid && entry.permissions.contains(permission))
    }

    fn uid_of(&self, package: &str) -> Option<i64> {
        self.packages.get(package).map(|entry| entry.uid)
    }

    fn signing_certificates(&self, package: &str) -> Result<Vec<Vec<u8>>, RegistryError> {
        self.packages
            .get(package)
            .map(|entry| entry.certificates.clone())
            .ok_or_else(|| RegistryError::NotFound(package.to_string()))
    }
}

/// Trust cache with the legacy partners plus configured partners.
pub fn build_trust_cache(config: &Config) -> CoreResult<TrustCache> {
    let cache = TrustCache::with_legacy_partners();
    for partner in &config.trusted_partners {
        let fingerprint = Fingerprint::Sha256(partner.fingerprint()?);
        if !cache.seed(&partner.package, fingerprint) {
            debug!(package = %partner.package, "partner already trusted, keeping existing entry");
        }
    }
    Ok(cache)
}
