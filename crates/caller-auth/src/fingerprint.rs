//! Signing-certificate fingerprints.

use sha2::{Digest, Sha256};
use std::fmt;

/// Identity proof a trusted caller's signing certificate must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fingerprint {
    /// 32-bit array hash of the certificate bytes, as computed by legacy
    /// clients (`h = 31 * h + signed_byte`, starting at 1, wrapping).
    LegacyHash(i32),
    /// SHA-256 digest of the certificate bytes.
    Sha256([u8; 32]),
}

impl Fingerprint {
    /// Compute the legacy array hash of a certificate.
    pub fn legacy_hash(certificate: &[u8]) -> i32 {
        certificate.iter().fold(1i32, |hash, byte| {
            hash.wrapping_mul(31).wrapping_add(i32::from(*byte as i8))
        })
    }

    /// Compute the SHA-256 fingerprint of a certificate.
    pub fn sha256(certificate: &[u8]) -> [u8; 32] {
        Sha256::digest(certificate).into()
    }

    /// Check a certificate against this fingerprint.
    pub fn matches(&self, certificate: &[u8]) -> bool {
        match self {
            Fingerprint::LegacyHash(expected) => Self::legacy_hash(certificate) == *expected,
            Fingerprint::Sha256(expected) => Self::sha256(certificate) == *expected,
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fingerprint::LegacyHash(hash) => write!(f, "legacy:{}", hash),
            Fingerprint::Sha256(digest) => {
                f.write_str("sha256:")?;
                for byte in digest {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}
