//! Reconciliation of the registry against the system of record.

use std::sync::Arc;

use crate::client::SettlementBackend;
use crate::errors::BackendError;
use crate::job::SettlementDate;
use crate::registry::JobRegistry;

/// Replaces the registry wholesale with the backend's canonical job list.
///
/// This is the only path that ever sets actual start/end timestamps.
#[derive(Clone)]
pub struct RegistrySync {
    backend: Arc<dyn SettlementBackend>,
    registry: Arc<JobRegistry>,
}

impl RegistrySync {
    pub fn new(backend: Arc<dyn SettlementBackend>, registry: Arc<JobRegistry>) -> Self {
        Self { backend, registry }
    }

    /// Fetch the canonical list for `date` and replace the registry with it.
    ///
    /// Returns the number of jobs now held. A non-success envelope clears the
    /// registry and yields `Ok(0)`. A transport failure leaves the registry
    /// untouched and is returned to the caller. Results for a date that is no
    /// longer selected are discarded.
    pub async fn sync(&self, date: SettlementDate) -> Result<usize, BackendError> {
        let jobs = match self.backend.list_jobs(date).await {
            Ok(jobs) => jobs,
            Err(err) if err.is_application() => {
                tracing::warn!(%date, error = %err, "job list rejected; clearing registry");
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(%date, error = %err, "job list unavailable; registry unchanged");
                return Err(err);
            }
        };

        let count = jobs.len();
        if !self.registry.replace_if_selected(date, jobs) {
            tracing::debug!(%date, selected = %self.registry.selected_date(), "discarding resync for deselected date");
            return Ok(self.registry.len());
        }
        Ok(count)
    }

    /// Switch the registry to `date` and load its batch.
    pub async fn select(&self, date: SettlementDate) -> Result<usize, BackendError> {
        if self.registry.selected_date() != date {
            self.registry.reset(date);
        }
        self.sync(date).await
    }
}
