//! `armada build` command

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;

use crate::cli::BuildArgs;
use crate::commands::open_driver;
use armada::RunOptions;

pub fn execute(manifest_path: &Option<PathBuf>, args: BuildArgs) -> Result<()> {
    let start = Instant::now();
    let driver = open_driver(manifest_path)?;
    let mut set = driver.plan()?;

    if let Some(kind) = args.compiler_type {
        driver.narrow_to_compiler(&mut set, kind)?;
    }

    let opts = RunOptions {
        fail_fast: args.fail_fast,
        jobs: args.jobs,
        ci: args.ci,
        ..Default::default()
    };
    let report = driver.build(&mut set, &opts)?;

    eprintln!(
        "    Finished {} variant(s) in {:.2}s: {}",
        report.total(),
        start.elapsed().as_secs_f64(),
        report
    );
    Ok(())
}
