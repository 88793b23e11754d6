//! Start command implementation

use std::time::Duration;

use colored::Colorize;
use serde::Serialize;
use toys_spawn::{Job, LaunchOptions, SpawnLauncher, WaitMode, WaitOptions, WaitReport};

use super::wait::{print_report, wait_for};
use super::{exit_code_for, print_json, short_id};
use crate::context::SpawnContext;
use crate::error::{Result, exit};

/// Options for the start command
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub cwd: Option<String>,
    pub model: Option<String>,
    pub wait: bool,
    pub timeout: Option<Duration>,
    pub json: bool,
}

#[derive(Serialize)]
struct StartedAndWaited<'a> {
    job: &'a Job,
    wait: &'a WaitReport,
}

/// Run the start command; returns the process exit code.
pub fn run_start(ctx: &SpawnContext, task: &str, options: &StartOptions) -> Result<i32> {
    let job = launch(ctx, task, options)?;

    if !options.wait {
        if options.json {
            print_json(&job)?;
        } else {
            println!("{} job {}", "Started".green().bold(), job.id);
            println!("  {}: {}", "handle".dimmed(), job.remote_handle);
            println!();
            println!(
                "Run {} to follow it.",
                format!("toys spawn check {}", short_id(&job.id)).cyan()
            );
        }
        return Ok(exit::SUCCESS);
    }

    if !options.json {
        println!("{} job {}, waiting...", "Started".green().bold(), job.id);
    }
    let wait_options = WaitOptions {
        mode: WaitMode::All,
        timeout: options.timeout,
        poll_interval: ctx.settings.poll_interval(),
    };
    let report = wait_for(ctx, vec![job.id.clone()], wait_options)?;

    if options.json {
        let job = ctx.ledger.get(&job.id)?;
        print_json(&StartedAndWaited {
            job: &job,
            wait: &report,
        })?;
    } else {
        print_report(&report);
    }
    Ok(exit_code_for(report.end))
}

/// Create the remote conversation and record the job.
///
/// The blocking client is dropped before any runtime is started.
fn launch(ctx: &SpawnContext, task: &str, options: &StartOptions) -> Result<Job> {
    let client = ctx.client()?;
    let default_cwd = std::env::current_dir()?.to_string_lossy().into_owned();
    let launcher = SpawnLauncher::new(&client, &ctx.ledger, ctx.settings.model.clone(), default_cwd);

    Ok(launcher.launch(
        task,
        &LaunchOptions {
            cwd: options.cwd.clone(),
            model: options.model.clone(),
        },
    )?)
}
