//! Fixed-size worker pool driven in lock-step waves.

mod job;
mod worker;

pub use job::{ParallelJob, Partitioned, Wave};
pub use worker::{ParallelWorker, WorkerError, WorkerState};
