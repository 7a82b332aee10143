use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "coursefetch")]
#[command(about = "Offline course content prefetcher", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $COURSEFETCH_CONFIG or config/coursefetch.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download every supported module of a course for offline use
    Sync(SyncArgs),
    /// Print the intro files of a module as JSON
    Intro(ModuleArgs),
    /// Mark a module's cached content stale
    Invalidate(ModuleArgs),
    /// Invalidate a module if any of the given update names concern it
    Refresh(RefreshArgs),
    /// List registered handlers and whether the site enables them
    Handlers,
    /// Remove stale cache entries past the retention window
    Prune,
    /// Print the effective configuration
    Config,
}

#[derive(clap::Args, Debug)]
pub struct SyncArgs {
    #[arg(long)]
    pub course: i64,
    /// Download right away instead of prefetching for later
    #[arg(long)]
    pub now: bool,
}

#[derive(clap::Args, Debug)]
pub struct ModuleArgs {
    #[arg(long)]
    pub course: i64,
    #[arg(long)]
    pub module: i64,
    /// Content type, used when the module is not found in the course listing
    #[arg(long, default_value = "book")]
    pub modname: String,
}

#[derive(clap::Args, Debug)]
pub struct RefreshArgs {
    #[command(flatten)]
    pub module: ModuleArgs,
    /// Update event name reported by the site (repeatable)
    #[arg(long = "update", required = true)]
    pub updates: Vec<String>,
}
