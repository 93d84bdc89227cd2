//! `armada doctor` command
//!
//! Reports what the compiler probe sees, which is what the driver's
//! variant narrowing and the manifest's version gates will act on.

use anyhow::Result;

use armada::probe_compilers;

pub fn execute() -> Result<()> {
    let capabilities = probe_compilers();

    if capabilities.is_empty() {
        eprintln!("warning: no compilers detected; every probed variant will be filtered out");
        return Ok(());
    }

    for cap in &capabilities {
        println!("{}", cap);
    }
    eprintln!("     {} compiler(s) detected", capabilities.len());

    Ok(())
}
