//! Batch run state machine and its parameters.
//!
//! A run moves `Idle -> Initiating -> Stepping(0) -> ... -> Aborted | Finished`.
//! `Aborted` and `Finished` are terminal for that run; a new run always starts
//! again from `Idle`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::job::{JobCode, WorkflowJob};

/// Default wait between orchestration steps.
pub const DEFAULT_PACING: Duration = Duration::from_millis(1000);

/// Default number of job slots in a batch.
pub const DEFAULT_SLOT_COUNT: u32 = 5;

/// Why a run stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbortReason {
    /// Initiation yielded no jobs, or the backend refused it.
    EmptyBatch,
    /// Initiation could not reach the backend.
    InitiationFailed { error: String },
    /// A step reported failure; later slots were not attempted.
    StepFailed { slot: usize, code: JobCode },
}

/// Position of a batch run in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum BatchPhase {
    #[default]
    Idle,
    Initiating,
    Stepping { slot: usize },
    Aborted(AbortReason),
    Finished,
}

impl BatchPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Aborted(_) | Self::Finished)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: &BatchPhase) -> bool {
        match (self, next) {
            (Self::Idle, Self::Initiating) => true,
            (Self::Initiating, Self::Stepping { slot: 0 }) => true,
            (Self::Initiating, Self::Aborted(_) | Self::Finished) => true,
            (Self::Stepping { slot }, Self::Stepping { slot: next }) => *next == slot + 1,
            (Self::Stepping { .. }, Self::Aborted(_) | Self::Finished) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Initiating => write!(f, "initiating"),
            Self::Stepping { slot } => write!(f, "stepping({slot})"),
            Self::Aborted(AbortReason::EmptyBatch) => write!(f, "aborted: empty batch"),
            Self::Aborted(AbortReason::InitiationFailed { error }) => {
                write!(f, "aborted: initiation failed ({error})")
            }
            Self::Aborted(AbortReason::StepFailed { slot, code }) => {
                write!(f, "aborted: job {code} failed at slot {slot}")
            }
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Wait inserted after initiation and after each step so the backend can
/// settle before the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub interval: Duration,
}

impl Pacing {
    pub fn fixed(interval: Duration) -> Self {
        Self { interval }
    }

    /// No waiting at all.
    pub fn none() -> Self {
        Self::fixed(Duration::ZERO)
    }

    pub fn after_initiation(&self) -> Duration {
        self.interval
    }

    pub fn after_step(&self, _slot: usize) -> Duration {
        self.interval
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::fixed(DEFAULT_PACING)
    }
}

/// Which job codes a run steps through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotPlan {
    /// Slots `0..count`; each slot index is used as the job code, regardless
    /// of what initiation returned.
    Fixed { count: u32 },
    /// The codes initiation actually returned, ascending.
    Initiated,
}

impl SlotPlan {
    pub fn slots(&self, jobs: &[WorkflowJob]) -> Vec<JobCode> {
        match self {
            Self::Fixed { count } => (0..*count).map(JobCode).collect(),
            Self::Initiated => {
                let mut codes: Vec<JobCode> = jobs.iter().map(|j| j.code).collect();
                codes.sort();
                codes.dedup();
                codes
            }
        }
    }
}

impl Default for SlotPlan {
    fn default() -> Self {
        Self::Fixed {
            count: DEFAULT_SLOT_COUNT,
        }
    }
}

/// Orchestrator parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchConfig {
    pub pacing: Pacing,
    pub slot_plan: SlotPlan,
}

impl BatchConfig {
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_slot_plan(mut self, plan: SlotPlan) -> Self {
        self.slot_plan = plan;
        self
    }
}

/// Result of one attempted slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotOutcome {
    pub slot: usize,
    pub code: JobCode,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of one orchestrator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub date: crate::job::SettlementDate,
    /// Terminal phase the run ended in.
    pub phase: BatchPhase,
    /// Slots attempted, in order.
    pub slots: Vec<SlotOutcome>,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl BatchReport {
    pub fn is_finished(&self) -> bool {
        self.phase == BatchPhase::Finished
    }

    pub fn succeeded(&self) -> usize {
        self.slots.iter().filter(|s| s.success).count()
    }

    /// A job failed or the backend could not be reached. An empty batch is
    /// not a failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self.phase,
            BatchPhase::Aborted(
                AbortReason::StepFailed { .. } | AbortReason::InitiationFailed { .. }
            )
        )
    }

    pub fn failed_slot(&self) -> Option<&SlotOutcome> {
        self.slots.iter().find(|s| !s.success)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobState;
    use crate::testing::job;

    #[test]
    fn test_terminal_phases() {
        assert!(!BatchPhase::Idle.is_terminal());
        assert!(!BatchPhase::Initiating.is_terminal());
        assert!(!BatchPhase::Stepping { slot: 2 }.is_terminal());
        assert!(BatchPhase::Finished.is_terminal());
        assert!(BatchPhase::Aborted(AbortReason::EmptyBatch).is_terminal());
    }

    #[test]
    fn test_legal_transitions() {
        assert!(BatchPhase::Idle.can_transition_to(&BatchPhase::Initiating));
        assert!(BatchPhase::Initiating.can_transition_to(&BatchPhase::Stepping { slot: 0 }));
        assert!(
            BatchPhase::Initiating.can_transition_to(&BatchPhase::Aborted(AbortReason::EmptyBatch))
        );
        assert!(
            BatchPhase::Stepping { slot: 1 }.can_transition_to(&BatchPhase::Stepping { slot: 2 })
        );
        assert!(BatchPhase::Stepping { slot: 4 }.can_transition_to(&BatchPhase::Finished));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!BatchPhase::Idle.can_transition_to(&BatchPhase::Stepping { slot: 0 }));
        assert!(!BatchPhase::Initiating.can_transition_to(&BatchPhase::Stepping { slot: 1 }));
        assert!(
            !BatchPhase::Stepping { slot: 1 }.can_transition_to(&BatchPhase::Stepping { slot: 3 })
        );
        assert!(!BatchPhase::Finished.can_transition_to(&BatchPhase::Initiating));
        assert!(
            !BatchPhase::Aborted(AbortReason::EmptyBatch).can_transition_to(&BatchPhase::Initiating)
        );
    }

    #[test]
    fn test_fixed_plan_ignores_initiated_jobs() {
        let jobs = vec![job(7, JobState::Pending), job(9, JobState::Pending)];
        let codes = SlotPlan::Fixed { count: 5 }.slots(&jobs);
        assert_eq!(codes, (0..5).map(JobCode).collect::<Vec<_>>());
        assert!(SlotPlan::Fixed { count: 3 }.slots(&[]).len() == 3);
    }

    #[test]
    fn test_initiated_plan_sorts_and_dedups() {
        let jobs = vec![
            job(3, JobState::Pending),
            job(1, JobState::Completed),
            job(3, JobState::Error),
        ];
        assert_eq!(
            SlotPlan::Initiated.slots(&jobs),
            vec![JobCode(1), JobCode(3)]
        );
    }

    #[test]
    fn test_default_config() {
        let config = BatchConfig::default();
        assert_eq!(config.pacing.interval, Duration::from_millis(1000));
        assert_eq!(config.slot_plan, SlotPlan::Fixed { count: 5 });
        assert_eq!(Pacing::none().after_step(3), Duration::ZERO);
    }

    #[test]
    fn test_phase_display() {
        let phase = BatchPhase::Aborted(AbortReason::StepFailed {
            slot: 1,
            code: JobCode(1),
        });
        assert_eq!(phase.to_string(), "aborted: job 1 failed at slot 1");
        assert_eq!(BatchPhase::Stepping { slot: 3 }.to_string(), "stepping(3)");
    }

    #[test]
    fn test_empty_batch_is_not_a_failure() {
        let report = |phase| BatchReport {
            run_id: Uuid::new_v4(),
            date: crate::testing::date(),
            phase,
            slots: Vec::new(),
            duration: Duration::ZERO,
        };

        assert!(!report(BatchPhase::Finished).is_failure());
        assert!(!report(BatchPhase::Aborted(AbortReason::EmptyBatch)).is_failure());
        assert!(
            report(BatchPhase::Aborted(AbortReason::InitiationFailed {
                error: "connection refused".into()
            }))
            .is_failure()
        );
        assert!(
            report(BatchPhase::Aborted(AbortReason::StepFailed {
                slot: 0,
                code: JobCode(0)
            }))
            .is_failure()
        );
    }
}
