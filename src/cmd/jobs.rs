//! Job listing, initiation and manual steps: `settle jobs`, `settle init`, `settle step`.

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use settle::ui::render_jobs;
use settle::workflow::{BatchInitiator, RegistrySync, StepExecutor};
use settle::{JobCode, SettlementDate};

use super::Session;
use crate::Cli;

pub async fn cmd_jobs(cli: &Cli, project_dir: &Path, date: SettlementDate) -> Result<()> {
    let session = Session::open(cli, project_dir, date, None)?;
    RegistrySync::new(session.backend.clone(), session.registry.clone())
        .sync(date)
        .await
        .with_context(|| format!("Failed to list jobs for {}", date))?;

    println!("{} {}", style("Jobs for").bold(), style(date).cyan());
    println!("{}", render_jobs(&session.registry.snapshot()));
    Ok(())
}

pub async fn cmd_init(cli: &Cli, project_dir: &Path, date: SettlementDate) -> Result<()> {
    let session = Session::open(cli, project_dir, date, None)?;
    let jobs = BatchInitiator::new(session.backend.clone(), session.registry.clone())
        .init(date)
        .await
        .with_context(|| format!("Failed to initiate batch for {}", date))?;

    if jobs.is_empty() {
        println!("Backend created no jobs for {}", style(date).cyan());
        return Ok(());
    }
    println!("{} {}", style("Batch initiated for").bold(), style(date).cyan());
    println!("{}", render_jobs(&session.registry.snapshot()));
    Ok(())
}

pub async fn cmd_step(
    cli: &Cli,
    project_dir: &Path,
    date: SettlementDate,
    code: JobCode,
) -> Result<()> {
    let session = Session::open(cli, project_dir, date, None)?;
    let executor = StepExecutor::new(session.backend.clone(), session.registry.clone());
    let result = executor.run_step(date, code).await;

    println!("{}", render_jobs(&session.registry.snapshot()));
    if !result.success {
        anyhow::bail!(
            "Job {} failed: {}",
            code,
            result.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    println!("{} job {} completed", style("✓").green(), code);
    Ok(())
}
