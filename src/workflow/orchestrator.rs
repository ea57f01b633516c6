//! Batch orchestration: initiate, then step through job slots one at a time.
//!
//! The orchestrator is a small state machine driven by [`BatchOrchestrator::run`]:
//! each call to `advance` performs the work of the current [`BatchPhase`], waits
//! the configured [`Pacing`](crate::workflow::Pacing) where required, and
//! returns the next phase. Steps never run in parallel, and the first failed
//! step ends the run.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

use crate::client::SettlementBackend;
use crate::errors::BatchError;
use crate::job::{JobCode, SettlementDate};
use crate::registry::JobRegistry;
use crate::workflow::executor::StepExecutor;
use crate::workflow::initiator::BatchInitiator;
use crate::workflow::state::{AbortReason, BatchConfig, BatchPhase, BatchReport, SlotOutcome};
use crate::workflow::sync::RegistrySync;

/// Progress events emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    /// Initiation finished; `slots` is the number of steps that will follow.
    Initiated {
        date: SettlementDate,
        jobs: usize,
        slots: usize,
    },
    /// A slot's step is about to run.
    SlotStarted { slot: usize, code: JobCode },
    /// A slot's step finished and the registry was resynchronized.
    SlotFinished {
        slot: usize,
        code: JobCode,
        success: bool,
    },
    /// The run reached a terminal phase.
    Finished { phase: BatchPhase },
}

/// Mutable state of one in-flight run.
struct BatchRun {
    date: SettlementDate,
    phase: BatchPhase,
    slots: Vec<JobCode>,
    outcomes: Vec<SlotOutcome>,
}

/// Clears the in-flight flag when a run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives a date's batch from initiation to completion or first failure.
pub struct BatchOrchestrator {
    registry: Arc<JobRegistry>,
    initiator: BatchInitiator,
    executor: StepExecutor,
    sync: RegistrySync,
    config: BatchConfig,
    in_flight: AtomicBool,
    event_tx: Option<mpsc::Sender<BatchEvent>>,
}

impl BatchOrchestrator {
    pub fn new(
        backend: Arc<dyn SettlementBackend>,
        registry: Arc<JobRegistry>,
        config: BatchConfig,
    ) -> Self {
        Self {
            initiator: BatchInitiator::new(backend.clone(), registry.clone()),
            executor: StepExecutor::new(backend.clone(), registry.clone()),
            sync: RegistrySync::new(backend, registry.clone()),
            registry,
            config,
            in_flight: AtomicBool::new(false),
            event_tx: None,
        }
    }

    /// Set the event channel for progress updates.
    pub fn with_event_channel(mut self, tx: mpsc::Sender<BatchEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// The executor used for both batch steps and manual re-runs.
    pub fn executor(&self) -> &StepExecutor {
        &self.executor
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Whether a batch run is currently in flight.
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run the whole batch for `date`.
    ///
    /// An abort (empty batch, failed initiation, failed step) is a normal
    /// outcome and is reported in the returned [`BatchReport`]. The only error
    /// is a refusal to start while another run is in flight.
    pub async fn run(&self, date: SettlementDate) -> Result<BatchReport, BatchError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(%date, "batch run rejected: another run is in flight");
            return Err(BatchError::AlreadyRunning {
                date: date.to_string(),
            });
        }
        let _guard = RunGuard(&self.in_flight);

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("batch", %run_id, %date);
        self.drive(run_id, date).instrument(span).await
    }

    async fn drive(&self, run_id: Uuid, date: SettlementDate) -> Result<BatchReport, BatchError> {
        let started = Instant::now();
        if self.registry.selected_date() != date {
            self.registry.reset(date);
        }

        let mut run = BatchRun {
            date,
            phase: BatchPhase::Idle,
            slots: Vec::new(),
            outcomes: Vec::new(),
        };

        while !run.phase.is_terminal() {
            let next = self.advance(&mut run).await;
            debug_assert!(
                run.phase.can_transition_to(&next),
                "illegal batch transition {} -> {}",
                run.phase,
                next
            );
            tracing::debug!(from = %run.phase, to = %next, "batch transition");
            run.phase = next;
        }

        match &run.phase {
            BatchPhase::Finished => tracing::info!(steps = run.outcomes.len(), "batch finished"),
            other => tracing::warn!(phase = %other, "batch aborted"),
        }
        self.emit(BatchEvent::Finished {
            phase: run.phase.clone(),
        })
        .await;

        Ok(BatchReport {
            run_id,
            date,
            phase: run.phase,
            slots: run.outcomes,
            duration: started.elapsed(),
        })
    }

    /// Perform the current phase's work and return the next phase.
    async fn advance(&self, run: &mut BatchRun) -> BatchPhase {
        match run.phase {
            BatchPhase::Idle => BatchPhase::Initiating,
            BatchPhase::Initiating => self.initiate(run).await,
            BatchPhase::Stepping { slot } => self.step(run, slot).await,
            ref terminal => terminal.clone(),
        }
    }

    async fn initiate(&self, run: &mut BatchRun) -> BatchPhase {
        let jobs = match self.initiator.init(run.date).await {
            Ok(jobs) => jobs,
            Err(err) => {
                return BatchPhase::Aborted(AbortReason::InitiationFailed {
                    error: err.to_string(),
                });
            }
        };
        if jobs.is_empty() {
            return BatchPhase::Aborted(AbortReason::EmptyBatch);
        }

        run.slots = self.config.slot_plan.slots(&jobs);
        self.emit(BatchEvent::Initiated {
            date: run.date,
            jobs: jobs.len(),
            slots: run.slots.len(),
        })
        .await;

        pause(self.config.pacing.after_initiation()).await;

        if run.slots.is_empty() {
            BatchPhase::Finished
        } else {
            BatchPhase::Stepping { slot: 0 }
        }
    }

    async fn step(&self, run: &mut BatchRun, slot: usize) -> BatchPhase {
        let code = run.slots[slot];
        self.emit(BatchEvent::SlotStarted { slot, code }).await;

        let result = self.executor.run_step(run.date, code).await;
        pause(self.config.pacing.after_step(slot)).await;
        if let Err(err) = self.sync.sync(run.date).await {
            tracing::warn!(slot, %code, error = %err, "resync after slot failed");
        }

        run.outcomes.push(SlotOutcome {
            slot,
            code,
            success: result.success,
            error: result.error,
        });
        self.emit(BatchEvent::SlotFinished {
            slot,
            code,
            success: result.success,
        })
        .await;

        if !result.success {
            BatchPhase::Aborted(AbortReason::StepFailed { slot, code })
        } else if slot + 1 < run.slots.len() {
            BatchPhase::Stepping { slot: slot + 1 }
        } else {
            BatchPhase::Finished
        }
    }

    async fn emit(&self, event: BatchEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
