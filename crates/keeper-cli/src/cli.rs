use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "keeper",
    about = "Keeper: version history, diffs, and restores for files in blob storage",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "keeper.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the scanner and the HTTP API until interrupted
    Serve(ServeArgs),
    /// Run one scan cycle and print its report
    Scan,
    /// List tracked files
    Files,
    /// Show the version history of a file
    Log(LogArgs),
    /// Show one version with its content
    Show(ShowArgs),
    /// Show changes between two versions
    Diff(DiffArgs),
    /// Upload the content of an old version back to storage
    Restore(RestoreArgs),
    /// Audit ledger integrity
    Verify,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Override `[server] bind_addr`
    #[arg(long)]
    pub bind: Option<String>,
    /// Serve the API without running the scanner
    #[arg(long)]
    pub no_scan: bool,
}

#[derive(Args)]
pub struct LogArgs {
    /// Canonical path: `<account>/<container>/<path>`
    pub path: String,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Version id, as `42` or `v42`
    pub version: String,
    /// Print metadata only
    #[arg(long)]
    pub no_content: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    pub old: String,
    pub new: String,
    /// Side-by-side view
    #[arg(long)]
    pub split: bool,
    /// Context lines around each change (unified view)
    #[arg(short = 'U', long, default_value = "3")]
    pub context: usize,
}

#[derive(Args)]
pub struct RestoreArgs {
    pub path: String,
    pub version: String,
}
