//! Compiler capability probing.
//!
//! Probing supplies opaque capability records (which compilers exist on this
//! host, where, and at what version) that the driver uses to narrow the
//! variant set and the manifest uses for version-gated rules. The matrix
//! engine itself never looks at any of this. Deliberately no feature
//! detection beyond the version triple.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::util::ProcessBuilder;

/// The compiler families a matrix can condition on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerKind {
    Clang,
    Gcc,
    Msvc,
}

impl CompilerKind {
    pub const ALL: [CompilerKind; 3] = [CompilerKind::Clang, CompilerKind::Gcc, CompilerKind::Msvc];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerKind::Clang => "clang",
            CompilerKind::Gcc => "gcc",
            CompilerKind::Msvc => "msvc",
        }
    }

    /// The executable probed for this family.
    fn program(&self) -> &'static str {
        match self {
            CompilerKind::Clang => "clang++",
            CompilerKind::Gcc => "g++",
            CompilerKind::Msvc => "cl",
        }
    }
}

impl fmt::Display for CompilerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompilerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clang" => Ok(CompilerKind::Clang),
            "gcc" => Ok(CompilerKind::Gcc),
            "msvc" => Ok(CompilerKind::Msvc),
            other => Err(format!(
                "unknown compiler `{other}` (expected clang, gcc, or msvc)"
            )),
        }
    }
}

/// An opaque record of one detected compiler.
#[derive(Debug, Clone)]
pub struct CompilerCapability {
    pub kind: CompilerKind,
    pub path: PathBuf,
    pub version: Version,
}

impl fmt::Display for CompilerCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.version, self.path.display())
    }
}

/// Probe the host for every known compiler family.
///
/// Families that are absent, or whose version output cannot be parsed, are
/// skipped with a debug log; callers see only what was actually found.
pub fn probe_compilers() -> Vec<CompilerCapability> {
    CompilerKind::ALL.iter().filter_map(|&k| probe_one(k)).collect()
}

fn probe_one(kind: CompilerKind) -> Option<CompilerCapability> {
    let path = match which::which(kind.program()) {
        Ok(path) => path,
        Err(_) => {
            tracing::debug!("{} not found ({})", kind, kind.program());
            return None;
        }
    };

    // cl.exe prints its banner to stderr when run without arguments; the
    // others answer --version on stdout.
    let mut cmd = ProcessBuilder::new(&path);
    if kind != CompilerKind::Msvc {
        cmd = cmd.arg("--version");
    }

    let output = match cmd.exec() {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!("failed to run {}: {}", path.display(), e);
            return None;
        }
    };

    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    let version = match parse_version(&text) {
        Some(version) => version,
        None => {
            tracing::debug!("no version triple in output of {}", path.display());
            return None;
        }
    };

    tracing::debug!("detected {} {} at {}", kind, version, path.display());
    Some(CompilerCapability {
        kind,
        path,
        version,
    })
}

/// Extract the first `major.minor.patch` triple from version output.
fn parse_version(text: &str) -> Option<Version> {
    static VERSION_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").unwrap());

    let caps = VERSION_RE.captures(text)?;
    let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}
