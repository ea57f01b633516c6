//! Configuration for the settlement console.
//!
//! Settings are layered: `settle.toml` → environment → CLI. The file is looked
//! up in the project directory first, then in the user config directory
//! (`~/.config/settle/settle.toml` on Linux).
//!
//! # Configuration File Format
//!
//! ```toml
//! [backend]
//! base_url = "http://127.0.0.1:8088"
//! timeout_secs = 30
//!
//! [batch]
//! pacing_ms = 1000
//! slot_plan = "fixed"
//! slot_count = 5
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::workflow::{BatchConfig, Pacing, SlotPlan};

pub const CONFIG_FILE_NAME: &str = "settle.toml";
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8088";

pub const ENV_BASE_URL: &str = "SETTLE_BASE_URL";
pub const ENV_PACING_MS: &str = "SETTLE_PACING_MS";

/// How the orchestrator chooses the job codes to step through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotPlanKind {
    /// A fixed range of slot indices, each used as the job code.
    #[default]
    Fixed,
    /// The codes returned by initiation.
    Initiated,
}

impl std::fmt::Display for SlotPlanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotPlanKind::Fixed => write!(f, "fixed"),
            SlotPlanKind::Initiated => write!(f, "initiated"),
        }
    }
}

impl std::str::FromStr for SlotPlanKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(SlotPlanKind::Fixed),
            "initiated" => Ok(SlotPlanKind::Initiated),
            _ => anyhow::bail!("Invalid slot plan '{}'. Valid values: fixed, initiated", s),
        }
    }
}

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSection {
    /// Base URL of the settlement backend
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds; unset uses the transport default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

/// Batch orchestration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSection {
    /// Wait after initiation and after each step, in milliseconds
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    #[serde(default)]
    pub slot_plan: SlotPlanKind,
    /// Number of slots for the fixed plan
    #[serde(default = "default_slot_count")]
    pub slot_count: u32,
}

fn default_pacing_ms() -> u64 {
    crate::workflow::state::DEFAULT_PACING.as_millis() as u64
}

fn default_slot_count() -> u32 {
    crate::workflow::state::DEFAULT_SLOT_COUNT
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing_ms(),
            slot_plan: SlotPlanKind::default(),
            slot_count: default_slot_count(),
        }
    }
}

/// Contents of `settle.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleToml {
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub batch: BatchSection,
}

impl SettleToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse settle.toml")
    }

    /// Load from an explicit path, or from the first default location that
    /// exists. Returns defaults when no file is found.
    pub fn discover(explicit: Option<&Path>, project_dir: &Path) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        for candidate in default_locations(project_dir) {
            if candidate.exists() {
                return Ok((Self::load(&candidate)?, Some(candidate)));
            }
        }
        Ok((Self::default(), None))
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize settle.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(
            std::env::var(ENV_BASE_URL).ok(),
            std::env::var(ENV_PACING_MS).ok(),
        )
    }

    fn apply_overrides(&mut self, base_url: Option<String>, pacing_ms: Option<String>) -> Result<()> {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.backend.base_url = url;
        }
        if let Some(raw) = pacing_ms {
            self.batch.pacing_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of milliseconds, got '{}'", ENV_PACING_MS, raw))?;
        }
        Ok(())
    }

    /// Check settings that parse but cannot work.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let url = self.backend.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            warnings.push(format!("backend.base_url '{}' is not an http(s) URL", url));
        }
        if self.backend.timeout_secs == Some(0) {
            warnings.push("backend.timeout_secs = 0 makes every request time out".to_string());
        }
        if self.batch.slot_plan == SlotPlanKind::Fixed && self.batch.slot_count == 0 {
            warnings.push("batch.slot_count = 0 with the fixed plan steps no jobs".to_string());
        }
        warnings
    }
}

/// Candidate config files, most specific first.
pub fn default_locations(project_dir: &Path) -> Vec<PathBuf> {
    let mut locations = vec![project_dir.join(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("settle").join(CONFIG_FILE_NAME));
    }
    locations
}

/// Effective runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub batch: BatchConfig,
    /// File the settings were read from, if any
    pub source: Option<PathBuf>,
    file: SettleToml,
}

impl Config {
    /// Resolve file → environment → CLI overrides.
    pub fn load(
        explicit: Option<&Path>,
        project_dir: &Path,
        base_url: Option<String>,
        pacing_ms: Option<u64>,
    ) -> Result<Self> {
        let (mut file, source) = SettleToml::discover(explicit, project_dir)?;
        file.apply_env()?;
        if let Some(url) = base_url {
            file.backend.base_url = url;
        }
        if let Some(ms) = pacing_ms {
            file.batch.pacing_ms = ms;
        }
        Ok(Self::from_toml(file, source))
    }

    pub fn from_toml(file: SettleToml, source: Option<PathBuf>) -> Self {
        let slot_plan = match file.batch.slot_plan {
            SlotPlanKind::Fixed => SlotPlan::Fixed {
                count: file.batch.slot_count,
            },
            SlotPlanKind::Initiated => SlotPlan::Initiated,
        };
        let batch = BatchConfig::default()
            .with_pacing(Pacing::fixed(Duration::from_millis(file.batch.pacing_ms)))
            .with_slot_plan(slot_plan);

        Self {
            base_url: file.backend.base_url.clone(),
            timeout: file.backend.timeout_secs.map(Duration::from_secs),
            batch,
            source,
            file,
        }
    }

    /// The merged settings in file form.
    pub fn settings(&self) -> &SettleToml {
        &self.file
    }
}
