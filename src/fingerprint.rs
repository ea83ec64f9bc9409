//! Content fingerprinting for skipping redundant regeneration.
//!
//! Editors and config-management agents frequently rewrite the alarm file
//! without changing its content. Hashing the raw bytes lets the pipeline
//! treat those re-triggers as no-ops.

use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 digest of the raw input bytes.
///
/// Held in memory for the lifetime of the watch process only; never
/// persisted, so the first run after a restart always regenerates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Compute the fingerprint of the given bytes.
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }

    /// Short hex prefix for log lines.
    pub fn short(&self) -> String {
        self.0[..4].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}
