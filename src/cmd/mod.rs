//! CLI command implementations.
//!
//! | Module     | Commands handled            |
//! |------------|-----------------------------|
//! | `jobs`     | `Jobs`, `Init`, `Step`      |
//! | `batch`    | `Batch`                     |
//! | `download` | `Download`                  |
//! | `config`   | `Config`                    |

pub mod batch;
pub mod config;
pub mod download;
pub mod jobs;

pub use batch::cmd_batch;
pub use config::cmd_config;
pub use download::cmd_download;
pub use jobs::{cmd_init, cmd_jobs, cmd_step};

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use settle::client::HttpBackend;
use settle::config::Config;
use settle::{JobRegistry, SettlementDate};

use crate::Cli;

/// Backend connection and registry shared by the command handlers.
pub struct Session {
    pub config: Config,
    pub backend: Arc<HttpBackend>,
    pub registry: Arc<JobRegistry>,
}

impl Session {
    pub fn open(
        cli: &Cli,
        project_dir: &Path,
        date: SettlementDate,
        pacing_ms: Option<u64>,
    ) -> Result<Self> {
        let config = Config::load(
            cli.config.as_deref(),
            project_dir,
            cli.base_url.clone(),
            pacing_ms,
        )?;
        if let Some(source) = &config.source {
            tracing::debug!(path = %source.display(), "loaded settle.toml");
        }
        let backend = HttpBackend::new(&config.base_url, config.timeout)
            .with_context(|| format!("Failed to set up backend client for {}", config.base_url))?;
        tracing::debug!(base_url = %backend.base_url(), %date, "session opened");

        Ok(Self {
            config,
            backend: Arc::new(backend),
            registry: Arc::new(JobRegistry::new(date)),
        })
    }
}
