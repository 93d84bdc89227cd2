//! Command implementations.

pub mod build;
pub mod clean;
pub mod completions;
pub mod doctor;
pub mod gen;
pub mod init;
pub mod list;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use armada::{find_manifest, probe_compilers, Driver, Manifest};

/// Locate and load the manifest, returning it with its directory.
pub fn open_manifest(manifest_path: &Option<PathBuf>) -> Result<(Manifest, PathBuf)> {
    let path = match manifest_path {
        Some(path) => path.clone(),
        None => {
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            find_manifest(&cwd).ok_or_else(|| {
                anyhow!(
                    "could not find {} in this directory or any parent\n\
                     help: run `armada init` to create one",
                    armada::MANIFEST_NAME
                )
            })?
        }
    };

    let manifest = Manifest::load(&path)?;
    let root = path
        .parent()
        .unwrap_or(Path::new("."))
        .to_path_buf();
    Ok((manifest, root))
}

/// Load the manifest and compile it against the probed toolchain.
pub fn open_driver(manifest_path: &Option<PathBuf>) -> Result<Driver> {
    let (manifest, root) = open_manifest(manifest_path)?;
    let capabilities = probe_compilers();
    Driver::new(&manifest, root, capabilities)
}
