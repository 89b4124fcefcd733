//! Background calculation jobs.
//!
//! A [`Job`] is a queueable unit of work over the shared study data. Jobs
//! move through a small lifecycle: `Ready` until queued, `Waiting` in the
//! manager's queue, `Running` while their tasks execute, then `Finished` or
//! `Stopped`. The [`JobManager`] runs one job at a time on a scheduler
//! thread; jobs fan their work out over [`queue::TaskQueue`] workers.

pub mod emissions_run;
pub mod manager;
pub mod noise_run;
pub mod queue;

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::QueueError;

pub use emissions_run::EmissionsRunJob;
pub use manager::JobManager;
pub use noise_run::NoiseRunJob;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Not queued, can be edited and queued.
    Ready,
    /// In the manager's queue.
    Waiting,
    /// Tasks are executing.
    Running,
    /// Completed all work.
    Finished,
    /// Stopped before completion, by request or by a failure.
    Stopped,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            JobStatus::Ready => "ready",
            JobStatus::Waiting => "waiting",
            JobStatus::Running => "running",
            JobStatus::Finished => "finished",
            JobStatus::Stopped => "stopped",
        };
        write!(f, "{text}")
    }
}

/// Lock-free status holder shared between the job and its workers.
#[derive(Debug)]
pub(crate) struct StatusCell(AtomicU8);

impl StatusCell {
    pub(crate) fn new(status: JobStatus) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    pub(crate) fn load(&self) -> JobStatus {
        match self.0.load(Ordering::SeqCst) {
            0 => JobStatus::Ready,
            1 => JobStatus::Waiting,
            2 => JobStatus::Running,
            3 => JobStatus::Finished,
            _ => JobStatus::Stopped,
        }
    }

    pub(crate) fn store(&self, status: JobStatus) {
        self.0.store(status as u8, Ordering::SeqCst);
    }
}

/// The operation a run failed on and why.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedOperation {
    pub operation: String,
    pub reason: String,
}

/// First-failure cell shared by the workers of a run.
#[derive(Debug, Default)]
pub struct RunFailure {
    cell: Mutex<Option<FailedOperation>>,
}

impl RunFailure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure. The first recorded failure wins.
    pub fn record(&self, operation: impl Into<String>, reason: impl fmt::Display) {
        let mut guard = lock(&self.cell);
        if guard.is_none() {
            *guard = Some(FailedOperation {
                operation: operation.into(),
                reason: reason.to_string(),
            });
        }
    }

    pub fn get(&self) -> Option<FailedOperation> {
        lock(&self.cell).clone()
    }

    pub fn is_set(&self) -> bool {
        lock(&self.cell).is_some()
    }

    pub fn clear(&self) {
        *lock(&self.cell) = None;
    }
}

/// A queueable calculation over the shared study data.
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    /// Validates inputs and takes the edit blocks. Moves the job from
    /// `Ready` to `Waiting`.
    fn queue(&self) -> Result<(), QueueError>;

    /// Executes the job to completion. Called by the manager thread only.
    fn run(&self);

    /// Requests the job to stop as soon as possible.
    fn stop(&self);

    /// Releases blocks and outputs, returning the job to `Ready`. No effect
    /// while the job is running.
    fn reset(&self);

    /// Completed fraction in [0, 1].
    fn progress(&self) -> f32;

    fn status(&self) -> JobStatus;

    fn ready(&self) -> bool {
        self.status() == JobStatus::Ready
    }

    fn waiting(&self) -> bool {
        self.status() == JobStatus::Waiting
    }

    fn running(&self) -> bool {
        self.status() == JobStatus::Running
    }

    fn finished(&self) -> bool {
        self.status() == JobStatus::Finished
    }

    fn stopped(&self) -> bool {
        self.status() == JobStatus::Stopped
    }
}
