//! Shelley power toys CLI
//!
//! Launches sub-agent tasks on a Shelley host and tracks them to completion.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands, SpawnAction};
use commands::start::StartOptions;
use context::SpawnContext;
use error::{Result, exit};

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("  {}", hint.dimmed());
            }
            exit::ERROR
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Commands::Spawn { action }) => {
            let ctx = SpawnContext::load(cli.ledger, cli.api)?;
            execute_spawn(&ctx, action)
        }
        Some(Commands::Completions { shell }) => {
            commands::run_completions(shell);
            Ok(exit::SUCCESS)
        }
        None => {
            println!("{} Shelley power toys", "toys".green().bold());
            println!();
            println!("Run {} for available commands.", "toys --help".cyan());
            Ok(exit::SUCCESS)
        }
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let installed = if verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    if let Err(e) = installed {
        eprintln!("{}: logging unavailable: {}", "warning".yellow(), e);
    }
    tracing::debug!("Verbose mode enabled");
}

fn execute_spawn(ctx: &SpawnContext, action: SpawnAction) -> Result<i32> {
    match action {
        SpawnAction::Start {
            task,
            cwd,
            model,
            wait,
            timeout,
            json,
        } => commands::run_start(
            ctx,
            &task,
            &StartOptions {
                cwd,
                model,
                wait,
                timeout,
                json,
            },
        ),
        SpawnAction::List {
            json,
            status,
            no_refresh,
        } => commands::run_list(ctx, json, status, no_refresh).map(|()| exit::SUCCESS),
        SpawnAction::Check {
            id,
            json,
            no_refresh,
        } => commands::run_check(ctx, &id, json, no_refresh).map(|()| exit::SUCCESS),
        SpawnAction::Wait {
            ids,
            any,
            all: _,
            timeout,
            interval,
            json,
        } => commands::run_wait(ctx, &ids, any, timeout, interval, json),
    }
}
