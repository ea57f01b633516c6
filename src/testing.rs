//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::artifact::Artifact;
use crate::client::SettlementBackend;
use crate::errors::BackendError;
use crate::job::{JobCode, JobState, SettlementDate, WorkflowJob};
use crate::registry::JobRegistry;

pub fn date() -> SettlementDate {
    "20251211".parse().unwrap()
}

pub fn job(code: u32, state: JobState) -> WorkflowJob {
    WorkflowJob {
        id: format!("{}", 100 + code),
        code: JobCode(code),
        name: format!("job-{code}"),
        settlement_date: date(),
        planned_start: "2025-12-11 01:00:00".into(),
        planned_end: "2025-12-11 02:00:00".into(),
        actual_start: None,
        actual_end: None,
        state,
        artifact_ref: None,
    }
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init(SettlementDate),
    Run(SettlementDate, JobCode),
    List(SettlementDate),
    Fetch(String),
}

/// How a scripted call should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Non-success envelope.
    Application,
    /// Response could not be understood.
    Transport,
}

impl Failure {
    fn into_error(self, operation: &'static str) -> BackendError {
        match self {
            Failure::Application => BackendError::Application {
                operation,
                status_code: "99".into(),
                msg: "scripted failure".into(),
            },
            Failure::Transport => BackendError::Decode {
                operation,
                message: "scripted transport failure".into(),
            },
        }
    }
}

/// In-memory system of record with scriptable failures.
///
/// A successful run marks the job completed with actual timestamps; a failed
/// run marks it error. Listing returns the current record.
#[derive(Default)]
pub struct ScriptedBackend {
    record: Mutex<Vec<WorkflowJob>>,
    seed: Vec<WorkflowJob>,
    init_failure: Option<Failure>,
    list_failure: Mutex<Option<Failure>>,
    run_failures: HashMap<JobCode, Failure>,
    run_delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
    observer: Option<Arc<JobRegistry>>,
    observed: Mutex<Vec<(JobCode, Option<JobState>)>>,
    artifacts: HashMap<String, Artifact>,
}

impl ScriptedBackend {
    /// Backend whose initiation yields `jobs`.
    pub fn with_jobs(jobs: Vec<WorkflowJob>) -> Self {
        Self {
            seed: jobs,
            ..Default::default()
        }
    }

    /// Backend whose initiation yields pending jobs `0..n`.
    pub fn with_pending(n: u32) -> Self {
        Self::with_jobs((0..n).map(|c| job(c, JobState::Pending)).collect())
    }

    /// Pre-populate the record as if initiation had already happened.
    pub fn initiated(self) -> Self {
        *self.record.lock() = self.seed.clone();
        self
    }

    pub fn fail_init(mut self, failure: Failure) -> Self {
        self.init_failure = Some(failure);
        self
    }

    pub fn fail_run(mut self, code: u32, failure: Failure) -> Self {
        self.run_failures.insert(JobCode(code), failure);
        self
    }

    pub fn fail_list(&self, failure: Option<Failure>) {
        *self.list_failure.lock() = failure;
    }

    pub fn delay_runs(mut self, delay: Duration) -> Self {
        self.run_delay = Some(delay);
        self
    }

    /// Record the registry's view of a job at the moment its run call arrives.
    pub fn observe(mut self, registry: Arc<JobRegistry>) -> Self {
        self.observer = Some(registry);
        self
    }

    pub fn with_artifact(mut self, location: &str, artifact: Artifact) -> Self {
        self.artifacts.insert(location.to_string(), artifact);
        self
    }

    pub fn set_state(&self, code: u32, state: JobState) {
        if let Some(j) = self.record.lock().iter_mut().find(|j| j.code == JobCode(code)) {
            j.state = state;
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Codes passed to `run_job`, in call order.
    pub fn run_codes(&self) -> Vec<u32> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Run(_, code) => Some(code.as_u32()),
                _ => None,
            })
            .collect()
    }

    pub fn observed(&self) -> Vec<(JobCode, Option<JobState>)> {
        self.observed.lock().clone()
    }
}

#[async_trait]
impl SettlementBackend for ScriptedBackend {
    async fn initiate_batch(&self, date: SettlementDate) -> Result<Vec<WorkflowJob>, BackendError> {
        self.calls.lock().push(Call::Init(date));
        if let Some(failure) = self.init_failure {
            return Err(failure.into_error("init"));
        }
        *self.record.lock() = self.seed.clone();
        Ok(self.seed.clone())
    }

    async fn run_job(&self, date: SettlementDate, code: JobCode) -> Result<(), BackendError> {
        self.calls.lock().push(Call::Run(date, code));
        if let Some(registry) = &self.observer {
            let seen = registry.get(code).map(|j| j.state);
            self.observed.lock().push((code, seen));
        }
        if let Some(delay) = self.run_delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.run_failures.get(&code).copied();
        let mut record = self.record.lock();
        let Some(target) = record.iter_mut().find(|j| j.code == code) else {
            return Err(Failure::Application.into_error("run"));
        };
        target.actual_start = Some("2025-12-11 03:00:00".into());
        match failure {
            None => {
                target.state = JobState::Completed;
                target.actual_end = Some("2025-12-11 03:05:00".into());
                Ok(())
            }
            Some(f) => {
                target.state = JobState::Error;
                Err(f.into_error("run"))
            }
        }
    }

    async fn list_jobs(&self, date: SettlementDate) -> Result<Vec<WorkflowJob>, BackendError> {
        self.calls.lock().push(Call::List(date));
        if let Some(failure) = *self.list_failure.lock() {
            return Err(failure.into_error("tasks"));
        }
        Ok(self.record.lock().clone())
    }

    async fn fetch_artifact(&self, location: &str) -> Result<Artifact, BackendError> {
        self.calls.lock().push(Call::Fetch(location.to_string()));
        self.artifacts
            .get(location)
            .cloned()
            .ok_or(BackendError::Http {
                operation: "download",
                status: 404,
            })
    }
}

/// Distinct codes in a snapshot, for uniqueness assertions.
pub fn codes(jobs: &[WorkflowJob]) -> HashSet<JobCode> {
    jobs.iter().map(|j| j.code).collect()
}
