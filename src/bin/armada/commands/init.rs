//! `armada init` command

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::cli::InitArgs;
use armada::util::fs::write_string;
use armada::MANIFEST_NAME;

/// The starter matrix: compiler x standard x debug x sanitizer x coverage x
/// test selection x feature macros, with the usual pruning rules.
const STARTER_MANIFEST: &str = r#"# Build matrix definition for armada.
#
# Each [[args]] table declares one orthogonal build option; [[rules]] tables
# prune combinations that make no sense. Run `armada list` to see what
# survives, `armada gen` / `armada build` to drive the external tools.

[[args]]
name = "is_debug"
short = "debug"
bool = true

[[args]]
name = "is_run_tests"
short = "tests"
bool = true

[[args]]
name = "is_run_performance_tests"
short = "perf"
bool = true

[[args]]
name = "is_asan"
short = "asan"
bool = true

[[args]]
name = "is_generate_test_coverage"
short = "cov"
bool = true

[[args]]
name = "compiler_type"
short = "c"
values = [
    { name = "clang" },
    { name = "gcc" },
    { name = "msvc" },
]

[[args]]
name = "std_version"
short = "std"
values = [
    { name = "cpp11", serialized = '"c++11"', short = "11" },
    { name = "cpp14", serialized = '"c++14"', short = "14" },
    { name = "cpp17", serialized = '"c++17"', short = "17" },
    { name = "cpplatest", serialized = '"c++latest"', short = "latest" },
]

[[args]]
name = "define_macros"
short = "defs"
values = [
    { name = "no_macro", serialized = "[]", short = "e" },
    { name = "assert_on", serialized = '["ASSERT_ON"]', short = "assert" },
    { name = "terminate_on", serialized = '["TERMINATE_ON_EXCEPTION_ON"]', short = "exc" },
    { name = "assert_and_terminate_on", serialized = '["ASSERT_ON", "TERMINATE_ON_EXCEPTION_ON"]', short = "assert-exc" },
]

# Sanitizers and coverage instrumentation need clang.
[[rules]]
exclude = { compiler_type = ["gcc", "msvc"], is_asan = "true" }

[[rules]]
exclude = { compiler_type = ["gcc", "msvc"], is_generate_test_coverage = "true" }

# Coverage without running the tests would measure nothing.
[[rules]]
exclude = { is_generate_test_coverage = "true", is_run_tests = "false" }

# Terminate-on-exception builds abort inside the test binaries.
[[rules]]
exclude = { define_macros = ["terminate_on", "assert_and_terminate_on"], is_run_tests = "true" }

[[rules]]
exclude = { compiler_type = "msvc", std_version = "cpp11" }

[[rules]]
exclude = { compiler_type = ["clang", "gcc"], std_version = "cpplatest" }

# Standards the older toolchains cannot compile.
[[rules]]
exclude = { compiler_type = "clang", std_version = "cpp17" }
when-compiler-below = { clang = "9.0.0" }

[[rules]]
exclude = { compiler_type = "gcc", std_version = ["cpp14", "cpp17"] }
when-compiler-below = { gcc = "5.0.0" }

# Generate everything, build only what runs fast.
[[rules]]
phase = "build"
exclude = { is_run_performance_tests = "true" }

# CI builders skip sanitizer and coverage configurations.
[[rules]]
phase = "ci"
exclude = { is_asan = "true" }

[[rules]]
phase = "ci"
exclude = { is_generate_test_coverage = "true" }

[probe]
compiler-arg = "compiler_type"

[driver]
out-dir = "out"
generator = "gn"
generator-args = ["gen", "{dir}", "--args={args}"]
builder = "ninja"
builder-args = ["-C", "{dir}"]
"#;

pub fn execute(args: InitArgs) -> Result<()> {
    let dir = args.path.unwrap_or_else(|| PathBuf::from("."));
    let manifest_path = dir.join(MANIFEST_NAME);

    if manifest_path.exists() {
        bail!("{} already exists", manifest_path.display());
    }

    write_string(&manifest_path, STARTER_MANIFEST)?;
    eprintln!("     Created {}", manifest_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use armada::Manifest;

    #[test]
    fn test_starter_manifest_parses() {
        let manifest = Manifest::parse(STARTER_MANIFEST).unwrap();
        assert_eq!(manifest.args.len(), 8);
        assert!(manifest.rules.len() >= 10);
        assert_eq!(manifest.probe.compiler_arg.as_deref(), Some("compiler_type"));
    }

    #[test]
    fn test_starter_manifest_expands() {
        let manifest = Manifest::parse(STARTER_MANIFEST).unwrap();
        let compiled = manifest.compile(&[]).unwrap();
        let mut set = compiled.matrix.variants().unwrap();

        // The unfiltered product is 2^5 * 3 * 4 * 4 = 1536; the permanent
        // rules cut it well below that without emptying it.
        let n = set.len();
        assert!(n > 0);
        assert!(n < 1536);

        for v in set.iter() {
            assert!(!(v.is_true("is_asan") && !v.is("compiler_type", "clang")));
        }
    }
}
