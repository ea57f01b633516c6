//! Job output download: `settle download`.

use anyhow::Result;
use std::path::Path;

use settle::artifact::download_job_artifact;
use settle::{JobCode, SettlementDate};

use super::Session;
use crate::Cli;

pub async fn cmd_download(
    cli: &Cli,
    project_dir: &Path,
    date: SettlementDate,
    code: JobCode,
    out: &Path,
) -> Result<()> {
    let session = Session::open(cli, project_dir, date, None)?;
    let path =
        download_job_artifact(session.backend.clone(), session.registry.clone(), code, out).await?;
    println!("Saved {}", path.display());
    Ok(())
}
