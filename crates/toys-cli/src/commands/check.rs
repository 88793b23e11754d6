//! Check command implementation

use colored::Colorize;
use toys_spawn::{Freshness, JobView, refresh_job};

use super::{print_json, status_label};
use crate::context::SpawnContext;
use crate::error::Result;

/// Run the check command
pub fn run_check(ctx: &SpawnContext, id: &str, json: bool, no_refresh: bool) -> Result<()> {
    let id = ctx.ledger.resolve_id(id)?;
    let job = ctx.ledger.get(&id)?;

    let view = if no_refresh {
        JobView::cached(job)
    } else {
        refresh_job(&ctx.ledger, &ctx.resolver()?, job)?
    };

    if json {
        return print_json(&view);
    }
    print_view(&view);
    Ok(())
}

fn print_view(view: &JobView) {
    let job = &view.job;

    println!("{}:     {}", "Job".dimmed(), job.id.bold());
    println!("{}:  {}", "Status".dimmed(), status_label(job.status));
    println!("{}:    {}", "Task".dimmed(), job.task);
    println!("{}:  {}", "Handle".dimmed(), job.remote_handle);
    if let Some(cwd) = &job.cwd {
        println!("{}:     {}", "Cwd".dimmed(), cwd);
    }
    if let Some(model) = &job.model {
        println!("{}:   {}", "Model".dimmed(), model);
    }
    println!(
        "{}: {}",
        "Created".dimmed(),
        job.created_at.with_timezone(&chrono::Local).to_rfc2822()
    );
    if let Some(resolved) = job.resolved_at {
        println!(
            "{}: {}",
            "Resolved".dimmed(),
            resolved.with_timezone(&chrono::Local).to_rfc2822()
        );
    }

    match &view.freshness {
        Freshness::Stale(reason) => {
            println!();
            println!(
                "{} host unreachable, showing last recorded status ({})",
                "warning:".yellow().bold(),
                reason
            );
        }
        Freshness::Cached => {
            println!();
            println!("{}", "Status not refreshed".dimmed());
        }
        Freshness::Terminal | Freshness::Refreshed => {}
    }

    if let Some(result) = &job.result {
        println!();
        let heading = if job.status == toys_spawn::JobStatus::Failed {
            "Error".red().bold()
        } else {
            "Result".bold()
        };
        println!("{}:", heading);
        for line in result.lines() {
            println!("  {}", line);
        }
    }
}
