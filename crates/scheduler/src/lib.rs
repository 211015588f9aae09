//! Cron-scheduled service jobs: article ingest, bar aggregation, price
//! refresh, and the alert sweep.
//!
//! Jobs are idempotent via upserts, so overlapping or repeated runs
//! converge on the same stored state.

pub mod jobs;
pub mod scheduler;

pub use scheduler::PipelineScheduler;
