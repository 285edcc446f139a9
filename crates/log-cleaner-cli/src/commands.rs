use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "log-cleaner")]
#[command(about = "Archive stale logs, prune old archives and watch free disk space", long_about = None)]
pub struct Cli {
    /// Configuration file name (without extension), defaults to LogCleaner
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Archive and clean every log directory, then check free space (default)
    Run,
    /// Only check free space on the volumes holding the log directories
    CheckDrives,
    /// Print configuration values
    PrintConfig,
}
