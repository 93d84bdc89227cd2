//! `armada list` command

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::cli::ListArgs;
use crate::commands::open_driver;

#[derive(Serialize)]
struct VariantRecord {
    dir: String,
    args: String,
    values: std::collections::BTreeMap<String, String>,
}

pub fn execute(manifest_path: &Option<PathBuf>, args: ListArgs) -> Result<()> {
    let driver = open_driver(manifest_path)?;
    let mut set = driver.plan()?;

    if let Some(kind) = args.compiler_type {
        driver.narrow_to_compiler(&mut set, kind)?;
    }

    if args.json {
        let records: Vec<VariantRecord> = set
            .iter()
            .map(|v| VariantRecord {
                dir: v.dir_name(),
                args: v.arg_string(),
                values: v.to_map(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for v in set.iter() {
        if args.dirs {
            println!("{}", v.dir_name());
        } else if args.args {
            println!("{}", v.arg_string());
        } else {
            println!("{}  {}", v.dir_name(), v.arg_string());
        }
    }
    eprintln!("     {} variant(s)", set.len());

    Ok(())
}
