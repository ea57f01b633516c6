//! Contract with the settlement system of record.
//!
//! The workflow only talks to the backend through [`SettlementBackend`].
//! Real implementation: [`HttpBackend`]. Tests drive the workflow with a
//! scripted in-memory double.

pub mod http;
pub mod wire;

use async_trait::async_trait;

use crate::artifact::Artifact;
use crate::errors::BackendError;
use crate::job::{JobCode, SettlementDate, WorkflowJob};

pub use http::HttpBackend;

/// Remote operations the console consumes.
#[async_trait]
pub trait SettlementBackend: Send + Sync {
    /// Create (or re-initialize) the batch for `date` and return its jobs.
    async fn initiate_batch(&self, date: SettlementDate) -> Result<Vec<WorkflowJob>, BackendError>;

    /// Execute one job's remote run step. `Ok` only on a success envelope.
    async fn run_job(&self, date: SettlementDate, code: JobCode) -> Result<(), BackendError>;

    /// Canonical job list for `date`.
    async fn list_jobs(&self, date: SettlementDate) -> Result<Vec<WorkflowJob>, BackendError>;

    /// Fetch the output produced by a job, addressed by its artifact reference.
    async fn fetch_artifact(&self, location: &str) -> Result<Artifact, BackendError>;
}
