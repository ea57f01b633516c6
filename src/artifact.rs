//! Downloadable job output.

use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use crate::client::SettlementBackend;
use crate::job::JobCode;
use crate::registry::JobRegistry;
use crate::workflow::RegistrySync;

// RFC 5987 extended form first, then the plain quoted/unquoted form.
static DISPOSITION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"filename\*=UTF-8''([^;]+)|filename="?([^";]+)"?"#)
        .expect("content-disposition regex is a valid static pattern")
});

/// A file produced by a settlement job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Name announced by the backend, if any.
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// The name to save under: the announced name, else `fallback`.
    pub fn resolved_name(&self, fallback: &str) -> String {
        let raw = self.file_name.as_deref().unwrap_or(fallback);
        let name = Path::new(raw)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name.is_empty() || name == ".." {
            fallback.to_string()
        } else {
            name
        }
    }

    /// Write the artifact into `dir`, creating it if needed.
    pub fn save_to(&self, dir: &Path, fallback: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        let path = dir.join(self.resolved_name(fallback));
        std::fs::write(&path, &self.bytes)
            .with_context(|| format!("Failed to write artifact: {}", path.display()))?;
        Ok(path)
    }
}

/// Extract the file name from a `Content-Disposition` header value.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let caps = DISPOSITION_REGEX.captures(header)?;
    if let Some(encoded) = caps.get(1) {
        return urlencoding::decode(encoded.as_str().trim())
            .ok()
            .map(|s| s.into_owned());
    }
    caps.get(2)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Download the artifact of job `code` into `dir`.
///
/// The registry is resynchronized first so the lookup sees the backend's
/// current `artifact_ref`. The job name is the fallback file name.
pub async fn download_job_artifact(
    backend: Arc<dyn SettlementBackend>,
    registry: Arc<JobRegistry>,
    code: JobCode,
    dir: &Path,
) -> Result<PathBuf> {
    let date = registry.selected_date();
    RegistrySync::new(backend.clone(), registry.clone())
        .sync(date)
        .await
        .with_context(|| format!("Failed to list jobs for {}", date))?;

    let job = registry
        .get(code)
        .with_context(|| format!("No job {} for {}", code, date))?;
    let location = job
        .artifact_ref
        .as_deref()
        .filter(|r| !r.is_empty())
        .with_context(|| format!("Job {} ({}) has no downloadable output", code, job.name))?;

    tracing::info!(%code, %location, "downloading artifact");
    let artifact = backend
        .fetch_artifact(location)
        .await
        .with_context(|| format!("Failed to download output of job {}", code))?;
    artifact.save_to(dir, &job.name)
}
