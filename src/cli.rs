use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gitown")]
#[command(about = "Attribution and ownership statistics across git repositories")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    #[arg(long, default_value = "repos", help = "Root directory scanned for git repositories")]
    pub repos_root: PathBuf,

    #[arg(long, default_value = ".", help = "Directory the stats/ tree is written under")]
    pub output_root: PathBuf,

    #[arg(long, default_value = "configuration", help = "Directory holding alias.json, ignore_user.txt and services.json")]
    pub config_dir: PathBuf,

    #[arg(long, help = "Worker pool size (default: sized from the machine)")]
    pub max_workers: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Per-repository commit attribution for one date window
    Summary {
        #[arg(long, help = "Window start, YYYY-MM-DD (inclusive)")]
        from: String,

        #[arg(long, help = "Window end, YYYY-MM-DD (inclusive)")]
        to: String,
    },
    /// Per-author activity with language and temporal breakdowns
    Authors {
        #[arg(long, help = "Window start, YYYY-MM-DD (inclusive)")]
        from: String,

        #[arg(long, help = "Window end, YYYY-MM-DD (inclusive)")]
        to: String,
    },
    /// Service-level attribution across all repositories
    Subsystems {
        #[arg(long, help = "Window start, YYYY-MM-DD (inclusive)")]
        from: String,

        #[arg(long, help = "Window end, YYYY-MM-DD (inclusive)")]
        to: String,
    },
    /// Line-ownership snapshot of every repository's current tree
    Blame,
    /// Run every monthly window of a year and fold the results into
    /// yearly rollups
    Year {
        #[arg(help = "Calendar year, e.g. 2025")]
        year: i32,

        #[arg(long, help = "Skip the blame snapshot at the end of the run")]
        skip_blame: bool,
    },
    /// Reconstruct historical ownership shares of one subsystem from
    /// stored blame and monthly summaries
    Timeline {
        #[arg(help = "Subsystem name as it appears in the summaries")]
        subsystem: String,

        #[arg(long, default_value_t = 5, help = "Track the top N current owners")]
        top: usize,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Summary { from, to } => crate::summary::exec(self.common, from, to),
            Commands::Authors { from, to } => crate::authors::exec(self.common, from, to),
            Commands::Subsystems { from, to } => crate::subsystems::exec(self.common, from, to),
            Commands::Blame => crate::ownership::exec(self.common),
            Commands::Year { year, skip_blame } => crate::year::exec(self.common, year, skip_blame),
            Commands::Timeline { subsystem, top } => {
                crate::timeline::exec(self.common, subsystem, top)
            }
        }
    }
}
