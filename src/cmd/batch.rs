//! Full batch run: `settle batch`.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

use settle::SettlementDate;
use settle::ui::{BatchUI, UiMode, render_jobs};
use settle::workflow::{AbortReason, BatchOrchestrator, BatchPhase};

use super::Session;
use crate::Cli;

pub async fn cmd_batch(
    cli: &Cli,
    project_dir: &Path,
    date: SettlementDate,
    pacing_ms: Option<u64>,
    mode: UiMode,
) -> Result<()> {
    use dialoguer::Confirm;

    let session = Session::open(cli, project_dir, date, pacing_ms)?;

    if !cli.yes {
        let confirm = Confirm::new()
            .with_prompt(format!("Run the full settlement batch for {}?", date))
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirm {
            println!("Batch cancelled");
            return Ok(());
        }
    }

    let (tx, rx) = mpsc::channel(64);
    let orchestrator = BatchOrchestrator::new(
        session.backend.clone(),
        session.registry.clone(),
        session.config.batch.clone(),
    )
    .with_event_channel(tx);

    let ui = Arc::new(BatchUI::new(mode));
    let ui_task = {
        let ui = ui.clone();
        tokio::spawn(async move { ui.drain(rx).await })
    };

    let report = orchestrator.run(date).await;
    // Closes the event channel so the UI task can finish.
    drop(orchestrator);
    ui_task.await.context("Progress UI task panicked")?;
    let report = report?;

    ui.print_report(&report);
    if mode == UiMode::Full {
        println!("{}", render_jobs(&session.registry.snapshot()));
    }

    if report.is_failure() {
        anyhow::bail!("Batch for {} {}", date, report.phase);
    }
    if report.phase == BatchPhase::Aborted(AbortReason::EmptyBatch) && mode == UiMode::Full {
        println!("Backend created no jobs for {}; nothing to run", date);
    }
    Ok(())
}
