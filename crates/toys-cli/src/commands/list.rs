//! List command implementation

use colored::Colorize;
use toys_spawn::{JobStatus, JobView, refresh_all};

use super::{freshness_note, one_line, print_json, short_id, status_label};
use crate::context::SpawnContext;
use crate::error::Result;

const TASK_WIDTH: usize = 60;

/// Run the list command
pub fn run_list(
    ctx: &SpawnContext,
    json: bool,
    status: Option<JobStatus>,
    no_refresh: bool,
) -> Result<()> {
    let views = load_views(ctx, no_refresh)?;
    let views: Vec<JobView> = views
        .into_iter()
        .filter(|v| status.is_none_or(|s| v.job.status == s))
        .collect();

    if json {
        return print_json(&views);
    }

    if views.is_empty() {
        println!("{}", "No jobs".dimmed());
        println!();
        println!("Run {} to launch one.", "toys spawn start <task>".cyan());
        return Ok(());
    }

    println!(
        "{:<8}  {:<10}  {:<16}  {}",
        "ID".bold(),
        "STATUS".bold(),
        "CREATED".bold(),
        "TASK".bold()
    );
    for view in &views {
        let job = &view.job;
        let created = job
            .created_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M");
        let mut line = format!(
            "{:<8}  {:<10}  {:<16}  {}",
            short_id(&job.id),
            status_label(job.status),
            created,
            one_line(&job.task, TASK_WIDTH)
        );
        if let Some(note) = freshness_note(&view.freshness) {
            line.push_str(&format!(" {}", note));
        }
        println!("{}", line);
    }

    let stale = views
        .iter()
        .filter(|v| matches!(v.freshness, toys_spawn::Freshness::Stale(_)))
        .count();
    if stale > 0 {
        println!();
        println!(
            "{} host unreachable; {} job(s) show their last recorded status",
            "warning:".yellow().bold(),
            stale
        );
    }
    Ok(())
}

fn load_views(ctx: &SpawnContext, no_refresh: bool) -> Result<Vec<JobView>> {
    let jobs = ctx.ledger.list()?;
    if no_refresh {
        return Ok(jobs.into_iter().map(JobView::cached).collect());
    }
    let resolver = ctx.resolver()?;
    Ok(refresh_all(&ctx.ledger, &resolver, jobs)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use toys_spawn::{Job, SpawnSettings};

    fn ctx_in(dir: &TempDir) -> SpawnContext {
        SpawnContext::with_settings(
            SpawnSettings::default(),
            Some(dir.path().join("jobs.toml")),
            Some("http://127.0.0.1:9/api".into()),
        )
    }

    #[test]
    fn test_list_empty_ledger() {
        let temp = TempDir::new().unwrap();
        assert!(run_list(&ctx_in(&temp), false, None, true).is_ok());
    }

    #[test]
    fn test_list_without_refresh_reads_ledger() {
        let temp = TempDir::new().unwrap();
        let ctx = ctx_in(&temp);
        ctx.ledger
            .append(Job::pending("c0000001", "task A", None, None))
            .unwrap();

        let views = load_views(&ctx, true).unwrap();

        assert_eq!(views.len(), 1);
        assert_eq!(views[0].freshness, toys_spawn::Freshness::Cached);
    }
}
