//! `armada clean` command

use std::path::PathBuf;

use anyhow::Result;

use crate::commands::open_driver;

pub fn execute(manifest_path: &Option<PathBuf>) -> Result<()> {
    let driver = open_driver(manifest_path)?;
    let out_dir = driver.out_dir();

    driver.clean()?;
    eprintln!("     Removed {}", out_dir.display());

    Ok(())
}
