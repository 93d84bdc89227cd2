//! Generation stamps.
//!
//! After a successful generator run the variant's fingerprint is written
//! into the output directory; a later run with an unchanged configuration
//! sees the matching stamp and skips regeneration, reusing the directory.

use std::path::Path;

use anyhow::Result;

use crate::util::fs::write_string;

pub const STAMP_FILE: &str = ".armada-stamp";

/// Whether `dir` already carries a matching stamp.
pub fn is_fresh(dir: &Path, fingerprint: &str) -> bool {
    std::fs::read_to_string(dir.join(STAMP_FILE))
        .map(|s| s.trim() == fingerprint)
        .unwrap_or(false)
}

/// Record a successful generation.
pub fn write(dir: &Path, fingerprint: &str) -> Result<()> {
    write_string(&dir.join(STAMP_FILE), &format!("{fingerprint}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stamp_roundtrip() {
        let tmp = TempDir::new().unwrap();

        assert!(!is_fresh(tmp.path(), "abc123"));
        write(tmp.path(), "abc123").unwrap();
        assert!(is_fresh(tmp.path(), "abc123"));
        assert!(!is_fresh(tmp.path(), "def456"));
    }
}
