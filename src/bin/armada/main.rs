//! Armada CLI - a build-configuration-matrix generator and driver

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("armada=debug")
    } else {
        EnvFilter::new("armada=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Init(args) => commands::init::execute(args),
        Commands::List(args) => commands::list::execute(&cli.manifest_path, args),
        Commands::Gen(args) => commands::gen::execute(&cli.manifest_path, args),
        Commands::Build(args) => commands::build::execute(&cli.manifest_path, args),
        Commands::Clean => commands::clean::execute(&cli.manifest_path),
        Commands::Doctor => commands::doctor::execute(),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
