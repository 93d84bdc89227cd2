//! Hashing for variant fingerprints.

use sha2::{Digest, Sha256};

/// Compute the SHA256 hash of a string, hex-encoded.
pub fn sha256_str(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}

/// Accumulates string components into a stable fingerprint.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    pub fn new() -> Self {
        Fingerprint::default()
    }

    /// Add a component. A separator byte keeps `("ab","c")` distinct from
    /// `("a","bc")`.
    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update(s.as_bytes());
        self.hasher.update(b"\0");
        self
    }

    /// Finalize to a full hex digest.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }

    /// Finalize to a short digest (first 16 hex chars), enough for
    /// change-detection stamps.
    pub fn finish_short(self) -> String {
        let mut full = self.finish();
        full.truncate(16);
        full
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_str() {
        assert_eq!(
            sha256_str("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_fingerprint_component_boundaries() {
        let digest = |parts: &[&str]| {
            let mut fp = Fingerprint::new();
            for p in parts {
                fp.update_str(p);
            }
            fp.finish()
        };

        assert_eq!(digest(&["a", "b"]), digest(&["a", "b"]));
        assert_ne!(digest(&["ab"]), digest(&["a", "b"]));
    }

    #[test]
    fn test_finish_short_length() {
        let mut fp = Fingerprint::new();
        fp.update_str("compiler_type=\"clang\"");
        assert_eq!(fp.finish_short().len(), 16);
    }
}
