//! Migration orchestration for keyport.
//!
//! [`orchestrator::MigrationOrchestrator`] drives one profile through a
//! strictly linear state machine:
//!
//! ```text
//! Idle → ResolvingProfile → MigratingVault → PlanningAssets → SubmittingBatch → Completed
//!                 ↘               ↘                 ↘                ↘
//!                                   Failed(stage, reason)
//! ```
//!
//! Every transition is reported as a [`state::MigrationEvent`]. Runs for
//! the same profile are serialized by [`inflight::InFlightRegistry`];
//! runs for different profiles proceed independently.

pub mod inflight;
pub mod orchestrator;
pub mod state;
pub mod submit;
