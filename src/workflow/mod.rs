//! Batch settlement workflow.
//!
//! | Component          | Role                                                  |
//! |--------------------|-------------------------------------------------------|
//! | `BatchInitiator`   | Creates a date's batch and seeds the registry         |
//! | `StepExecutor`     | Runs one job with an optimistic `running` overlay     |
//! | `RegistrySync`     | Replaces the registry with the backend's job list     |
//! | `BatchOrchestrator`| Initiates, then steps slots in order until a failure  |

pub mod executor;
pub mod initiator;
pub mod orchestrator;
pub mod state;
pub mod sync;

pub use executor::{StepExecutor, StepResult};
pub use initiator::BatchInitiator;
pub use orchestrator::{BatchEvent, BatchOrchestrator};
pub use state::{AbortReason, BatchConfig, BatchPhase, BatchReport, Pacing, SlotOutcome, SlotPlan};
pub use sync::RegistrySync;
