//! Aircraft operation noise and emissions run engine.
//!
//! aeronox computes community noise levels (ECAC Doc29 NPD interpolation with
//! per-segment corrections) and fuel/emissions totals (LTO cycle indices or
//! the Boeing Fuel Flow Method 2) for sets of aircraft operations described by
//! performance profiles. Runs execute as jobs on a single-flight scheduler:
//! jobs are queued FIFO, one runs at a time, and each run fans its operations
//! out over an internal worker pool.
//!
//! # Example
//!
//! ```ignore
//! use aeronox::jobs::{JobManager, NoiseRunJob};
//! use std::sync::Arc;
//!
//! let manager = JobManager::new();
//! let job = Arc::new(NoiseRunJob::new("noise-baseline", spec, performance, constraints, output));
//! manager.queue_job(job.clone());
//! manager.wait_for_jobs();
//! let cumulative = job.output().cumulative_outputs();
//! ```

pub mod atmosphere;
pub mod config;
pub mod constraints;
pub mod coord;
pub mod emissions;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod noise;
pub mod operation;
pub mod run;
pub mod units;

pub use config::EngineConfig;
pub use error::{CalculationError, ModelError, QueueError};
pub use jobs::{Job, JobManager, JobStatus};

/// Numerical floor below which values are treated as zero.
pub(crate) const PRECISION: f64 = 1e-6;
