use std::fs;

use anyhow::{Context, Result};
use icsync_core::ics::events_from_ics;
use icsync_core::SyncEngine;
use icsync_gcal::{GoogleCalendar, Session};
use owo_colors::OwoColorize;

use crate::config::Config;

/// Runs one sync pass. With `apply` false only the plan is printed.
pub async fn run(config: &Config, apply: bool) -> Result<()> {
    let source_path = &config.calendar.source;
    let content = fs::read_to_string(source_path)
        .with_context(|| format!("could not read source file {source_path}"))?;
    let events = events_from_ics(&content)?;
    let boundary = config.start_boundary()?;

    let session = Session::load_valid(&config.auth.account).await?;
    let remote = GoogleCalendar::new(session.access_token(), &config.calendar.google_id);
    let engine = SyncEngine::new(remote);

    let plan = engine.prepare(events, boundary).await?;
    println!(
        "{} insert {}, update {}, delete {}",
        "plan:".bold(),
        plan.to_insert.len(),
        plan.to_update.len(),
        plan.to_delete.len()
    );
    if !apply {
        return Ok(());
    }
    if plan.is_empty() {
        println!("{}", "nothing to do".green());
        return Ok(());
    }

    let report = engine.apply(plan).await?;
    println!(
        "{} inserted {}, updated {}, deleted {}",
        "done:".bold(),
        report.inserted,
        report.updated,
        report.deleted
    );
    if report.is_clean() {
        return Ok(());
    }
    for item in &report.failed {
        eprintln!(
            "{} {} {}: {}",
            "failed".red().bold(),
            item.action.as_str(),
            item.uid,
            item.reason
        );
    }
    anyhow::bail!("{} event(s) failed to sync", report.failed.len());
}
