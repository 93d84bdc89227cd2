//! Drives the external generator and build tool over a variant set.
//!
//! Each surviving variant maps to one output directory (its
//! [`dir_name`](crate::matrix::Variant::dir_name)) and one argument string
//! (its [`arg_string`](crate::matrix::Variant::arg_string)); the driver
//! substitutes both into the command templates from the manifest and runs
//! the commands, tracking per-variant success and failure. Variants are
//! independent of each other, so the build step runs them in parallel with a
//! shared stop flag: once a failure trips it under fail-fast, no new builds
//! start and in-flight ones are left to finish.

pub mod stamp;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{anyhow, bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::manifest::{DriverSpec, Manifest, Phase, PostRule};
use crate::matrix::{ArgMatrix, MatrixError, Variant, VariantSet};
use crate::probe::{CompilerCapability, CompilerKind};
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists};
use crate::util::ProcessBuilder;

/// Per-run switches.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Stop scheduling new work after the first failure.
    pub fail_fast: bool,

    /// Parallel build jobs (defaults to the rayon global pool size).
    pub jobs: Option<usize>,

    /// Regenerate even when the stamp says the directory is up to date.
    pub force: bool,

    /// Apply ci-phase rules.
    pub ci: bool,
}

/// Success/failure accounting for one generate or build pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ok({}), failed({}), skipped({})",
            self.succeeded, self.failed, self.skipped
        )
    }
}

/// The compiled manifest bound to a project root and the probed toolchain.
pub struct Driver {
    matrix: ArgMatrix,
    post_rules: Vec<PostRule>,
    config: DriverSpec,
    capabilities: Vec<CompilerCapability>,
    probe_arg: Option<String>,
    root: PathBuf,
}

impl Driver {
    /// Compile `manifest` against the probed capabilities. `root` is the
    /// directory the manifest was found in; the output directory and all
    /// external commands resolve against it.
    pub fn new(
        manifest: &Manifest,
        root: impl Into<PathBuf>,
        capabilities: Vec<CompilerCapability>,
    ) -> Result<Self> {
        let compiled = manifest.compile(&capabilities)?;
        Ok(Driver {
            matrix: compiled.matrix,
            post_rules: compiled.post_rules,
            config: manifest.driver.clone(),
            probe_arg: manifest.probe.compiler_arg.clone(),
            capabilities,
            root: root.into(),
        })
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root.join(&self.config.out_dir)
    }

    pub fn capabilities(&self) -> &[CompilerCapability] {
        &self.capabilities
    }

    /// Expand the matrix and keep only variants whose compiler was detected
    /// on this host (when the manifest ties an argument to probing).
    ///
    /// An empty result is fatal here: nothing downstream may run external
    /// tools over zero variants.
    pub fn plan(&self) -> Result<VariantSet> {
        let mut set = self.matrix.variants()?;
        if let Some(arg) = self.probe_arg.clone() {
            let detected: Vec<&'static str> = self
                .capabilities
                .iter()
                .map(|c| c.kind.as_str())
                .collect();
            set.retain(move |v| detected.iter().any(|kind| v.is(&arg, kind)));
        }
        if set.is_empty() {
            return Err(MatrixError::NoVariants.into());
        }
        Ok(set)
    }

    /// Narrow the set to one compiler family, for `--compiler-type`.
    pub fn narrow_to_compiler(&self, set: &mut VariantSet, kind: CompilerKind) -> Result<()> {
        let arg = self.probe_arg.clone().ok_or_else(|| {
            anyhow!("filtering by compiler needs `compiler-arg` in the [probe] section")
        })?;
        set.retain(move |v| v.is(&arg, kind.as_str()));
        Ok(())
    }

    /// Run the generator once per variant, sequentially.
    ///
    /// Directories whose stamp matches the variant fingerprint are skipped
    /// unless `force` is set. Under fail-fast the first failure aborts the
    /// pass; otherwise failures are counted and reported at the end.
    pub fn generate(&self, set: &mut VariantSet, opts: &RunOptions) -> Result<RunReport> {
        if set.is_empty() {
            return Err(MatrixError::NoVariants.into());
        }

        let out = self.out_dir();
        let mut report = RunReport::default();

        for variant in set.iter() {
            let dir = out.join(variant.dir_name());
            let fingerprint = variant.stable_hash();

            if !opts.force && stamp::is_fresh(&dir, &fingerprint) {
                tracing::debug!("up to date: {}", dir.display());
                report.skipped += 1;
                continue;
            }

            ensure_dir(&dir)?;
            let cmd = self.command(
                &self.config.generator,
                &self.config.generator_args,
                &dir,
                variant,
            );
            tracing::info!("{}", cmd.display_command());

            let output = cmd.exec()?;
            if output.status.success() {
                stamp::write(&dir, &fingerprint)?;
                report.succeeded += 1;
            } else {
                report.failed += 1;
                tracing::error!(
                    "generation failed for {}:\n{}",
                    dir.display(),
                    tool_output(&output)
                );
                if opts.fail_fast {
                    bail!(
                        "`{}` failed with exit code {:?}",
                        cmd.display_command(),
                        output.status.code()
                    );
                }
            }
        }

        if report.failed > 0 {
            bail!(
                "generation failed for {} of {} variant(s)",
                report.failed,
                report.total()
            );
        }
        Ok(report)
    }

    /// Run the build tool once per variant, in parallel.
    ///
    /// Build-phase rules (and ci-phase rules in CI mode) narrow the set
    /// first. Defaults to keep-going with an aggregate failure at the end;
    /// with fail-fast, the first failure stops new builds from starting.
    pub fn build(&self, set: &mut VariantSet, opts: &RunOptions) -> Result<RunReport> {
        for rule in &self.post_rules {
            let applies = match rule.phase {
                Phase::Build => true,
                Phase::Ci => opts.ci,
                Phase::Matrix => false,
            };
            if applies {
                tracing::debug!(rule = %rule.label, "narrowing before build");
                let rule = rule.clone();
                set.retain(move |v| rule.keeps(v));
            }
        }
        if set.is_empty() {
            return Err(MatrixError::NoVariants.into());
        }

        if let Some(jobs) = opts.jobs {
            // Ignored if the global pool already exists.
            rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build_global()
                .ok();
        }

        let variants = set.variants();
        let pb = ProgressBar::new(variants.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );

        let stop = AtomicBool::new(false);
        let succeeded = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);
        let out = self.out_dir();

        variants.par_iter().for_each(|variant| {
            if stop.load(Ordering::SeqCst) {
                skipped.fetch_add(1, Ordering::SeqCst);
                pb.inc(1);
                return;
            }

            let dir = out.join(variant.dir_name());
            pb.set_message(variant.dir_name());

            match self.build_one(variant, &dir) {
                Ok(()) => {
                    succeeded.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    failed.fetch_add(1, Ordering::SeqCst);
                    pb.println(format!("error: {e:#}"));
                    if opts.fail_fast {
                        stop.store(true, Ordering::SeqCst);
                    }
                }
            }
            pb.inc(1);
        });
        pb.finish_and_clear();

        let report = RunReport {
            succeeded: succeeded.load(Ordering::SeqCst),
            failed: failed.load(Ordering::SeqCst),
            skipped: skipped.load(Ordering::SeqCst),
        };
        if report.failed > 0 {
            bail!(
                "build failed for {} of {} variant(s)",
                report.failed,
                report.total()
            );
        }
        Ok(report)
    }

    fn build_one(&self, variant: &Variant, dir: &Path) -> Result<()> {
        if !dir.exists() {
            bail!(
                "{} is not generated; run `armada gen` first",
                dir.display()
            );
        }
        let cmd = self.command(&self.config.builder, &self.config.builder_args, dir, variant);
        tracing::debug!("{}", cmd.display_command());

        let output = cmd.exec()?;
        if !output.status.success() {
            bail!(
                "`{}` failed with exit code {:?}\n{}",
                cmd.display_command(),
                output.status.code(),
                tool_output(&output)
            );
        }
        Ok(())
    }

    /// Remove the whole output directory.
    pub fn clean(&self) -> Result<()> {
        remove_dir_all_if_exists(&self.out_dir())
    }

    fn command(
        &self,
        program: &str,
        template: &[String],
        dir: &Path,
        variant: &Variant,
    ) -> ProcessBuilder {
        let dir_str = dir.display().to_string();
        let args = variant.arg_string();
        ProcessBuilder::new(program)
            .args(
                template
                    .iter()
                    .map(|t| t.replace("{dir}", &dir_str).replace("{args}", &args)),
            )
            .cwd(&self.root)
    }
}

fn tool_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{}{}", stdout, stderr).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // A manifest whose generator writes a marker file and whose builder
    // checks for it, exercising the full command-template path with stub
    // tools instead of gn/ninja.
    fn stub_manifest() -> Manifest {
        Manifest::parse(
            r#"
            [[args]]
            name = "compiler_type"
            short = "c"
            values = [{ name = "clang" }, { name = "gcc" }]

            [[args]]
            name = "is_debug"
            short = "debug"
            bool = true

            [driver]
            out-dir = "out"
            generator = "sh"
            generator-args = ["-c", "echo '{args}' > {dir}/generated.txt"]
            builder = "sh"
            builder-args = ["-c", "test -f {dir}/generated.txt"]
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_generate_writes_stamps_and_skips_when_fresh() {
        let tmp = TempDir::new().unwrap();
        let driver = Driver::new(&stub_manifest(), tmp.path(), Vec::new()).unwrap();

        let mut set = driver.plan().unwrap();
        let report = driver.generate(&mut set, &RunOptions::default()).unwrap();
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failed, 0);

        for v in set.iter() {
            let dir = driver.out_dir().join(v.dir_name());
            assert!(dir.join("generated.txt").exists());
            assert!(stamp::is_fresh(&dir, &v.stable_hash()));
        }

        // Second run: everything is up to date.
        let report = driver.generate(&mut set, &RunOptions::default()).unwrap();
        assert_eq!(report.skipped, 4);
        assert_eq!(report.succeeded, 0);

        // Forced run regenerates.
        let opts = RunOptions {
            force: true,
            ..Default::default()
        };
        let report = driver.generate(&mut set, &opts).unwrap();
        assert_eq!(report.succeeded, 4);
    }

    #[test]
    fn test_build_after_generate() {
        let tmp = TempDir::new().unwrap();
        let driver = Driver::new(&stub_manifest(), tmp.path(), Vec::new()).unwrap();

        let mut set = driver.plan().unwrap();
        driver.generate(&mut set, &RunOptions::default()).unwrap();
        let report = driver.build(&mut set, &RunOptions::default()).unwrap();
        assert_eq!(report.succeeded, 4);
    }

    #[test]
    fn test_build_without_generate_fails() {
        let tmp = TempDir::new().unwrap();
        let driver = Driver::new(&stub_manifest(), tmp.path(), Vec::new()).unwrap();

        let mut set = driver.plan().unwrap();
        let err = driver.build(&mut set, &RunOptions::default()).unwrap_err();
        assert!(err.to_string().contains("build failed for 4 of 4"));
    }

    #[test]
    fn test_empty_set_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let driver = Driver::new(&stub_manifest(), tmp.path(), Vec::new()).unwrap();

        let mut set = driver.plan().unwrap();
        set.retain(|v| v.is("compiler_type", "msvc"));

        let err = driver.generate(&mut set, &RunOptions::default()).unwrap_err();
        assert!(err.downcast_ref::<MatrixError>().is_some());
    }

    #[test]
    fn test_probe_narrowing() {
        let manifest = Manifest::parse(
            r#"
            [[args]]
            name = "compiler_type"
            short = "c"
            values = [{ name = "clang" }, { name = "gcc" }, { name = "msvc" }]

            [probe]
            compiler-arg = "compiler_type"
            "#,
        )
        .unwrap();
        let tmp = TempDir::new().unwrap();

        let clang_only = vec![CompilerCapability {
            kind: CompilerKind::Clang,
            path: PathBuf::from("/usr/bin/clang++"),
            version: semver::Version::new(17, 0, 6),
        }];
        let driver = Driver::new(&manifest, tmp.path(), clang_only).unwrap();
        let mut set = driver.plan().unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.iter().all(|v| v.is("compiler_type", "clang")));

        // No compilers at all leaves nothing to build.
        let driver = Driver::new(&manifest, tmp.path(), Vec::new()).unwrap();
        assert!(driver.plan().is_err());
    }

    #[test]
    fn test_ci_rules_only_apply_in_ci_mode() {
        let manifest = Manifest::parse(
            r#"
            [[args]]
            name = "is_asan"
            short = "asan"
            bool = true

            [[rules]]
            phase = "ci"
            exclude = { is_asan = "true" }

            [driver]
            generator = "sh"
            generator-args = ["-c", "true"]
            builder = "sh"
            builder-args = ["-c", "true"]
            "#,
        )
        .unwrap();
        let tmp = TempDir::new().unwrap();
        let driver = Driver::new(&manifest, tmp.path(), Vec::new()).unwrap();

        let mut set = driver.plan().unwrap();
        driver.generate(&mut set, &RunOptions::default()).unwrap();
        let report = driver.build(&mut set, &RunOptions::default()).unwrap();
        assert_eq!(report.succeeded, 2);

        let mut set = driver.plan().unwrap();
        driver.generate(&mut set, &RunOptions::default()).unwrap();
        let opts = RunOptions {
            ci: true,
            ..Default::default()
        };
        let report = driver.build(&mut set, &opts).unwrap();
        assert_eq!(report.succeeded, 1);
    }

    #[test]
    fn test_clean_removes_out_dir() {
        let tmp = TempDir::new().unwrap();
        let driver = Driver::new(&stub_manifest(), tmp.path(), Vec::new()).unwrap();

        let mut set = driver.plan().unwrap();
        driver.generate(&mut set, &RunOptions::default()).unwrap();
        assert!(driver.out_dir().exists());

        driver.clean().unwrap();
        assert!(!driver.out_dir().exists());
    }
}
