//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use armada::CompilerKind;

/// Armada - a build-configuration-matrix generator and driver
#[derive(Parser)]
#[command(name = "armada")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to Armada.toml (defaults to searching upward from the current
    /// directory)
    #[arg(long, global = true)]
    pub manifest_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter Armada.toml
    Init(InitArgs),

    /// List the surviving build variants
    List(ListArgs),

    /// Run the generator tool for every variant
    Gen(GenArgs),

    /// Run the build tool for every variant
    Build(BuildArgs),

    /// Remove the output directory
    Clean,

    /// Report the detected compilers
    Doctor,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize (defaults to the current directory)
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Print directory names only
    #[arg(long, conflicts_with_all = ["args", "json"])]
    pub dirs: bool,

    /// Print argument strings only
    #[arg(long, conflicts_with = "json")]
    pub args: bool,

    /// Emit the variant list as JSON
    #[arg(long)]
    pub json: bool,

    /// Only variants for this compiler family
    #[arg(long)]
    pub compiler_type: Option<CompilerKind>,
}

#[derive(Args)]
pub struct GenArgs {
    /// Only variants for this compiler family
    #[arg(long)]
    pub compiler_type: Option<CompilerKind>,

    /// Continue past generation failures and report them at the end
    #[arg(long)]
    pub keep_going: bool,

    /// Regenerate even when a directory is up to date
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Only variants for this compiler family
    #[arg(long)]
    pub compiler_type: Option<CompilerKind>,

    /// Apply the manifest's ci-phase rules
    #[arg(long)]
    pub ci: bool,

    /// Stop scheduling new builds after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
