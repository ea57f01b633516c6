pub mod artifact;
pub mod client;
pub mod config;
pub mod errors;
pub mod job;
pub mod registry;
pub mod ui;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use job::{JobCode, JobState, SettlementDate, WorkflowJob};
pub use registry::JobRegistry;
