use crate::constants::DEFAULT_COMMAND_TIMEOUT_SECS;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// git-marks: list changed files in a git work tree and find files carrying the edit marker
#[derive(Parser, Debug)]
#[command(name = "git-marks", about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// directory inside the work tree to inspect
    #[arg(long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// seconds to wait for each git command
    #[arg(long, global = true, default_value_t = DEFAULT_COMMAND_TIMEOUT_SECS)]
    pub timeout: u64,

    /// print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// print the git commands being run
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Action>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// list every changed path (default)
    Status,
    /// list untracked paths
    Untracked,
    /// list paths with merge conflicts
    Unmerged,
    /// list modified or added files containing the marker
    Marked,
    /// print the current branch name
    Branch,
    /// print the abbreviated hash of a recent commit
    Commit {
        /// how far back to go; 1 is the most recent commit
        #[arg(short = 'n', long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=30))]
        back: u8,
    },
    /// report the offset of the marker in each file
    Scan {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// print the marker text
    Marker,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn action(&self) -> Action {
        self.command.clone().unwrap_or(Action::Status)
    }
}
