//! In-memory job table for the currently selected settlement date.
//!
//! The registry is a two-phase container: a speculative single-field write
//! ([`JobRegistry::apply_optimistic`]) is always superseded by an authoritative
//! full replacement ([`JobRegistry::replace_all`]). There is no field-level
//! merge. Readers take an [`Arc`] snapshot, so a reader never observes a
//! half-applied write.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::job::{JobCode, JobState, SettlementDate, WorkflowJob};

/// Capacity of the observer channel. Slow observers see `Lagged` and should
/// re-read the snapshot.
const EVENT_CAPACITY: usize = 256;

/// Notification sent to read-only observers after every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// The whole collection was swapped for authoritative data.
    Replaced { date: SettlementDate, count: usize },
    /// One job's state was overwritten locally.
    StateChanged { code: JobCode, state: JobState },
    /// The selected date changed; the collection is empty.
    Reset { date: SettlementDate },
}

struct Inner {
    date: SettlementDate,
    jobs: Arc<Vec<WorkflowJob>>,
}

/// The job table owned by the orchestrator and shared with its collaborators.
pub struct JobRegistry {
    inner: RwLock<Inner>,
    events: broadcast::Sender<RegistryEvent>,
}

impl JobRegistry {
    /// Create an empty registry for `date`.
    pub fn new(date: SettlementDate) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: RwLock::new(Inner {
                date,
                jobs: Arc::new(Vec::new()),
            }),
            events,
        }
    }

    /// The date whose batch this registry currently holds.
    pub fn selected_date(&self) -> SettlementDate {
        self.inner.read().date
    }

    /// Current collection. The returned snapshot never changes underneath the
    /// caller.
    pub fn snapshot(&self) -> Arc<Vec<WorkflowJob>> {
        Arc::clone(&self.inner.read().jobs)
    }

    /// Look up one job by code in the current snapshot.
    pub fn get(&self, code: JobCode) -> Option<WorkflowJob> {
        self.inner.read().jobs.iter().find(|j| j.code == code).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Atomically swap in an authoritative collection for `date`.
    ///
    /// Duplicate codes keep their first occurrence so the registry always holds
    /// exactly one entry per code.
    pub fn replace_all(&self, date: SettlementDate, jobs: Vec<WorkflowJob>) {
        let unique = dedup_codes(date, jobs);
        let count = unique.len();
        {
            let mut inner = self.inner.write();
            inner.date = date;
            inner.jobs = Arc::new(unique);
        }
        tracing::debug!(%date, count, "registry replaced");
        let _ = self.events.send(RegistryEvent::Replaced { date, count });
    }

    /// Swap in `jobs` only while `date` is still the selected date.
    ///
    /// The check and the swap happen under one write lock, so a concurrent
    /// [`reset`](Self::reset) to another date is never undone. Returns whether
    /// the collection was replaced.
    pub fn replace_if_selected(&self, date: SettlementDate, jobs: Vec<WorkflowJob>) -> bool {
        let unique = dedup_codes(date, jobs);
        let count = unique.len();
        {
            let mut inner = self.inner.write();
            if inner.date != date {
                return false;
            }
            inner.jobs = Arc::new(unique);
        }
        tracing::debug!(%date, count, "registry replaced");
        let _ = self.events.send(RegistryEvent::Replaced { date, count });
        true
    }

    /// Overwrite one job's state ahead of authoritative data.
    ///
    /// Returns `false` when no job with `code` is present; nothing changes in
    /// that case.
    pub fn apply_optimistic(&self, code: JobCode, state: JobState) -> bool {
        let applied = {
            let mut inner = self.inner.write();
            let jobs = Arc::make_mut(&mut inner.jobs);
            match jobs.iter_mut().find(|j| j.code == code) {
                Some(job) => {
                    job.state = state;
                    true
                }
                None => false,
            }
        };

        if applied {
            let _ = self.events.send(RegistryEvent::StateChanged { code, state });
        } else {
            tracing::debug!(%code, %state, "optimistic write skipped: job not in registry");
        }
        applied
    }

    /// Drop every job and keep the selected date.
    pub fn clear(&self) {
        let date = {
            let mut inner = self.inner.write();
            inner.jobs = Arc::new(Vec::new());
            inner.date
        };
        let _ = self.events.send(RegistryEvent::Replaced { date, count: 0 });
    }

    /// Select a new date and discard the previous date's batch.
    pub fn reset(&self, date: SettlementDate) {
        {
            let mut inner = self.inner.write();
            inner.date = date;
            inner.jobs = Arc::new(Vec::new());
        }
        let _ = self.events.send(RegistryEvent::Reset { date });
    }

    /// Receive a notification for every subsequent mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }
}

/// Keep the first job for each code.
fn dedup_codes(date: SettlementDate, jobs: Vec<WorkflowJob>) -> Vec<WorkflowJob> {
    let mut unique: Vec<WorkflowJob> = Vec::with_capacity(jobs.len());
    for job in jobs {
        if unique.iter().any(|j| j.code == job.code) {
            tracing::warn!(code = %job.code, %date, "dropping duplicate job code from backend");
            continue;
        }
        unique.push(job);
    }
    unique
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("JobRegistry")
            .field("date", &inner.date)
            .field("jobs", &inner.jobs.len())
            .finish()
    }
}
