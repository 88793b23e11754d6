//! Wait command implementation

use std::time::Duration;

use colored::Colorize;
use toys_spawn::{
    CancelFlag, Outcome, WaitEnd, WaitEngine, WaitMode, WaitOptions, WaitReport,
};

use super::{exit_code_for, print_json, short_id, status_label};
use crate::context::SpawnContext;
use crate::error::{CliError, Result};

/// Run the wait command; returns the process exit code.
pub fn run_wait(
    ctx: &SpawnContext,
    ids: &[String],
    any: bool,
    timeout: Option<Duration>,
    interval: Option<Duration>,
    json: bool,
) -> Result<i32> {
    let targets = if ids.is_empty() {
        ctx.ledger.unresolved_ids()?
    } else {
        ctx.ledger.resolve_ids(ids)?
    };

    let options = WaitOptions {
        mode: if any { WaitMode::Any } else { WaitMode::All },
        timeout,
        poll_interval: interval
            .map(WaitOptions::clamp_interval)
            .unwrap_or_else(|| ctx.settings.poll_interval()),
    };

    let report = wait_for(ctx, targets, options)?;
    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }
    Ok(exit_code_for(report.end))
}

/// Run the wait engine off the async runtime, cancelling it on Ctrl-C.
pub(crate) fn wait_for(
    ctx: &SpawnContext,
    ids: Vec<String>,
    options: WaitOptions,
) -> Result<WaitReport> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let ctx = ctx.clone();

    runtime.block_on(async move {
        let cancel = CancelFlag::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::debug!("interrupt received");
                    cancel.cancel();
                }
            })
        };

        // The HTTP client blocks, so it lives and dies on the blocking pool.
        let waiting = tokio::task::spawn_blocking(move || -> Result<WaitReport> {
            let resolver = ctx.resolver()?;
            let report = WaitEngine::new(&ctx.ledger, resolver)
                .with_cancel(cancel)
                .wait(&ids, &options)?;
            Ok(report)
        });

        let report = waiting
            .await
            .map_err(|e| CliError::user(format!("wait task failed: {}", e)))?;
        interrupt.abort();
        report
    })
}

pub(crate) fn print_report(report: &WaitReport) {
    if report.outcomes.is_empty() {
        println!("{}", "Nothing to wait for".dimmed());
        return;
    }

    for out in &report.outcomes {
        let marker = match out.outcome {
            Outcome::Completed => "+".green(),
            Outcome::Failed => "x".red(),
            Outcome::TimedOut | Outcome::Pending => "-".dimmed(),
        };
        let detail = match out.outcome {
            Outcome::Completed | Outcome::Failed => {
                status_label(out.last_known).to_string()
            }
            Outcome::TimedOut => format!(
                "{} (last known: {})",
                "timed out".magenta(),
                status_label(out.last_known)
            ),
            Outcome::Pending => format!("{}", status_label(out.last_known)),
        };
        println!("  {} {}  {}", marker, short_id(&out.id), detail);
        if let Some(result) = &out.result {
            for line in result.lines() {
                println!("      {}", line);
            }
        }
    }

    println!();
    let seconds = report.elapsed_ms as f64 / 1000.0;
    let unresolved = report
        .outcomes
        .iter()
        .filter(|o| matches!(o.outcome, Outcome::TimedOut | Outcome::Pending))
        .count();
    match (report.end, &report.winner) {
        (WaitEnd::Resolved, Some(winner)) => println!(
            "{} job {} resolved after {:.1}s",
            "Done:".green().bold(),
            short_id(winner),
            seconds
        ),
        (WaitEnd::Resolved, None) => println!(
            "{} all {} job(s) resolved after {:.1}s",
            "Done:".green().bold(),
            report.outcomes.len(),
            seconds
        ),
        (WaitEnd::TimedOut, _) => println!(
            "{} gave up after {:.1}s; {} job(s) still unresolved",
            "Timed out:".yellow().bold(),
            seconds,
            unresolved
        ),
        (WaitEnd::Interrupted, _) => println!(
            "{} after {:.1}s; {} job(s) still unresolved",
            "Interrupted".yellow().bold(),
            seconds,
            unresolved
        ),
    }
}
