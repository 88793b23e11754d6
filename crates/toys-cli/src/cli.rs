//! CLI argument parsing using clap derive

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use toys_spawn::JobStatus;

/// Shelley power toys - launch and track sub-agent tasks
#[derive(Parser, Debug)]
#[command(name = "toys")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Job ledger file
    #[arg(long, global = true, env = "SHELLEY_SPAWN_FILE")]
    pub ledger: Option<PathBuf>,

    /// Shelley API base URL
    #[arg(long, global = true, env = "SHELLEY_API")]
    pub api: Option<String>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Launch and track sub-agent tasks
    Spawn {
        #[command(subcommand)]
        action: SpawnAction,
    },

    /// Generate shell completions
    ///
    /// Examples:
    ///   toys completions bash > ~/.local/share/bash-completion/completions/toys
    ///   toys completions zsh > ~/.zfunc/_toys
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Sub-agent job actions
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum SpawnAction {
    /// Launch a sub-agent on a task and record it as a job
    ///
    /// Returns as soon as the remote conversation exists, printing the job
    /// id. With --wait, blocks until the job resolves.
    ///
    /// Examples:
    ///   toys spawn start "summarise the failing tests"
    ///   toys spawn start --cwd ~/src/app --wait --timeout 600 "fix the build"
    Start {
        /// Instruction for the sub-agent
        task: String,

        /// Working directory for the sub-agent (default: current directory)
        #[arg(long)]
        cwd: Option<String>,

        /// Model for the sub-agent
        #[arg(long)]
        model: Option<String>,

        /// Block until the job resolves
        #[arg(long)]
        wait: bool,

        /// Give up waiting after this many seconds
        #[arg(long, requires = "wait", value_parser = parse_seconds)]
        timeout: Option<Duration>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List tracked jobs
    List {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,

        /// Only show jobs with this status
        #[arg(long)]
        status: Option<JobStatus>,

        /// Show recorded status without asking the host
        #[arg(long)]
        no_refresh: bool,
    },

    /// Show one job, refreshing its status from the host
    Check {
        /// Job id or unique prefix (at least 4 characters)
        id: String,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,

        /// Show recorded status without asking the host
        #[arg(long)]
        no_refresh: bool,
    },

    /// Block until jobs resolve
    ///
    /// Without ids, waits on every job that has not resolved yet.
    ///
    /// Exit codes: 0 resolved, 1 error, 2 timed out, 130 interrupted.
    ///
    /// Examples:
    ///   toys spawn wait                       # all unresolved jobs
    ///   toys spawn wait --any 0f6c 9b2e       # first of two jobs
    ///   toys spawn wait --timeout 300 0f6c
    Wait {
        /// Job ids or unique prefixes
        ids: Vec<String>,

        /// Return when any one job resolves
        #[arg(long, conflicts_with = "all")]
        any: bool,

        /// Return when every job resolves (default)
        #[arg(long)]
        all: bool,

        /// Give up after this many seconds
        #[arg(long, value_parser = parse_seconds)]
        timeout: Option<Duration>,

        /// Seconds between status polls
        #[arg(long, value_parser = parse_seconds)]
        interval: Option<Duration>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

/// Parse a non-negative number of seconds, fractions allowed.
fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", s))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("'{}' is not a valid duration", s))
}
