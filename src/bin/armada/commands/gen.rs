//! `armada gen` command

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;

use crate::cli::GenArgs;
use crate::commands::open_driver;
use armada::RunOptions;

pub fn execute(manifest_path: &Option<PathBuf>, args: GenArgs) -> Result<()> {
    let start = Instant::now();
    let driver = open_driver(manifest_path)?;
    let mut set = driver.plan()?;

    if let Some(kind) = args.compiler_type {
        driver.narrow_to_compiler(&mut set, kind)?;
    }

    let opts = RunOptions {
        fail_fast: !args.keep_going,
        force: args.force,
        ..Default::default()
    };
    let report = driver.generate(&mut set, &opts)?;

    eprintln!(
        "   Generated {} variant(s) in {:.2}s: {}",
        report.total(),
        start.elapsed().as_secs_f64(),
        report
    );
    Ok(())
}
