//! relens-batch: concurrent, fault-isolated batch execution.
//!
//! Turns a list of immutable [`JobDescriptor`]s into finished files:
//! a bounded worker pool drives each job through
//! load → resample → color grade → save, isolating per-job failures
//! and reporting progress through an advisory completion counter.
//! Lens models and render parameters are built once before submission
//! and only read afterwards, so workers share them without locking;
//! every image buffer stays private to the job that allocated it.

pub mod job;
pub mod pool;

pub use job::{JobDescriptor, JobError, JobState, OutputTarget};
pub use pool::{BatchSummary, run_batch};
