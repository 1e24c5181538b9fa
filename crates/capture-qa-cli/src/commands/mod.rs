//! CLI command definitions and handlers.

pub mod check;

use clap::{Parser, Subcommand};

/// Capture QA - Image quality gate for captured photos
#[derive(Parser)]
#[command(name = "capture-qa")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Shared check arguments (paths, thresholds, flags).
    #[command(flatten)]
    pub check: check::CheckArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Assess image quality
    Check(check::CheckArgs),
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every image is valid and passes every check.
    Success,
    /// At least one image is invalid, fails a check, or could not be read.
    IssuesFound,
    /// Fatal error.
    Error,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        match code {
            ExitCode::Success => Self::SUCCESS,
            ExitCode::IssuesFound => Self::from(1),
            ExitCode::Error => Self::from(2),
        }
    }
}
