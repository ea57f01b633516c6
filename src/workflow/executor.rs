//! Single-job execution with optimistic local state.

use std::sync::Arc;

use crate::client::SettlementBackend;
use crate::job::{JobCode, JobState, SettlementDate};
use crate::registry::JobRegistry;
use crate::workflow::sync::RegistrySync;

/// Outcome of one step attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub code: JobCode,
    pub success: bool,
    /// Diagnostic for a failed attempt.
    pub error: Option<String>,
}

/// Executes exactly one job's remote run step.
///
/// Any job may be executed at any time regardless of its state; there is no
/// terminal state that blocks a re-run.
#[derive(Clone)]
pub struct StepExecutor {
    backend: Arc<dyn SettlementBackend>,
    registry: Arc<JobRegistry>,
    sync: RegistrySync,
}

impl StepExecutor {
    pub fn new(backend: Arc<dyn SettlementBackend>, registry: Arc<JobRegistry>) -> Self {
        let sync = RegistrySync::new(backend.clone(), registry.clone());
        Self {
            backend,
            registry,
            sync,
        }
    }

    /// Run job `code` for `date`. Returns `true` on success.
    pub async fn execute(&self, date: SettlementDate, code: JobCode) -> bool {
        self.run_step(date, code).await.success
    }

    /// Run job `code` for `date` and report the outcome in detail.
    ///
    /// The job reads `running` while the call is in flight, then `completed` or
    /// `error`, and finally whatever the mandatory resync of the selected date
    /// reports. Application and transport failures are not distinguished in
    /// the result.
    pub async fn run_step(&self, date: SettlementDate, code: JobCode) -> StepResult {
        self.registry.apply_optimistic(code, JobState::Running);
        tracing::info!(%date, %code, "running job");

        let result = match self.backend.run_job(date, code).await {
            Ok(()) => {
                self.registry.apply_optimistic(code, JobState::Completed);
                tracing::info!(%date, %code, "job completed");
                StepResult {
                    code,
                    success: true,
                    error: None,
                }
            }
            Err(err) => {
                self.registry.apply_optimistic(code, JobState::Error);
                tracing::warn!(
                    %date,
                    %code,
                    application = err.is_application(),
                    error = %err,
                    "job failed"
                );
                StepResult {
                    code,
                    success: false,
                    error: Some(err.to_string()),
                }
            }
        };

        let selected = self.registry.selected_date();
        if let Err(err) = self.sync.sync(selected).await {
            tracing::warn!(date = %selected, error = %err, "resync after step failed");
        }

        result
    }
}
