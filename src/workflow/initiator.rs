//! Batch creation for a settlement date.

use std::sync::Arc;

use crate::client::SettlementBackend;
use crate::errors::BackendError;
use crate::job::{SettlementDate, WorkflowJob};
use crate::registry::JobRegistry;

/// Requests creation of a date's batch and seeds the registry with it.
#[derive(Clone)]
pub struct BatchInitiator {
    backend: Arc<dyn SettlementBackend>,
    registry: Arc<JobRegistry>,
}

impl BatchInitiator {
    pub fn new(backend: Arc<dyn SettlementBackend>, registry: Arc<JobRegistry>) -> Self {
        Self { backend, registry }
    }

    /// Initiate the batch for `date`.
    ///
    /// A non-success envelope is a controlled failure: the registry is cleared
    /// and an empty list is returned. A transport failure also leaves the
    /// registry empty but is returned as an error.
    pub async fn init(&self, date: SettlementDate) -> Result<Vec<WorkflowJob>, BackendError> {
        match self.backend.initiate_batch(date).await {
            Ok(jobs) => {
                tracing::info!(%date, jobs = jobs.len(), "batch initiated");
                self.registry.replace_all(date, jobs.clone());
                Ok(jobs)
            }
            Err(err) if err.is_application() => {
                tracing::warn!(%date, error = %err, "batch initiation rejected");
                self.registry.replace_all(date, Vec::new());
                Ok(Vec::new())
            }
            Err(err) => {
                tracing::warn!(%date, error = %err, "batch initiation failed");
                self.registry.replace_all(date, Vec::new());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobCode, JobState};
    use crate::testing::{Call, Failure, ScriptedBackend, date, job};

    fn setup(backend: ScriptedBackend) -> (Arc<ScriptedBackend>, Arc<JobRegistry>, BatchInitiator) {
        let backend = Arc::new(backend);
        let registry = Arc::new(JobRegistry::new(date()));
        let initiator = BatchInitiator::new(backend.clone(), registry.clone());
        (backend, registry, initiator)
    }

    #[tokio::test]
    async fn test_init_seeds_registry() {
        let (backend, registry, initiator) = setup(ScriptedBackend::with_pending(5));
        let jobs = initiator.init(date()).await.unwrap();

        assert_eq!(jobs.len(), 5);
        assert_eq!(registry.len(), 5);
        assert!(jobs.iter().all(|j| j.state == JobState::Pending));
        assert_eq!(backend.calls(), vec![Call::Init(date())]);
    }

    #[tokio::test]
    async fn test_init_keeps_reported_timestamps() {
        let mut done = job(0, JobState::Completed);
        done.actual_start = Some("2025-12-11 01:00:05".into());
        let (_backend, registry, initiator) = setup(ScriptedBackend::with_jobs(vec![done]));

        initiator.init(date()).await.unwrap();
        let seeded = registry.get(JobCode(0)).unwrap();
        assert_eq!(seeded.actual_start.as_deref(), Some("2025-12-11 01:00:05"));
        assert!(seeded.actual_end.is_none());
    }

    #[tokio::test]
    async fn test_rejected_init_clears_registry() {
        let (_backend, registry, initiator) =
            setup(ScriptedBackend::with_pending(3).fail_init(Failure::Application));
        registry.replace_all(date(), vec![job(9, JobState::Pending)]);

        let jobs = initiator.init(date()).await.unwrap();
        assert!(jobs.is_empty());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_error_and_clears() {
        let (_backend, registry, initiator) =
            setup(ScriptedBackend::with_pending(3).fail_init(Failure::Transport));
        registry.replace_all(date(), vec![job(9, JobState::Pending)]);

        let err = initiator.init(date()).await.unwrap_err();
        assert!(err.is_transport());
        assert!(registry.is_empty());
    }
}
