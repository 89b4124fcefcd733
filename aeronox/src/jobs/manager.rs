//! Single-flight job scheduler.
//!
//! The manager owns a FIFO queue of jobs and a scheduler thread that runs
//! them one at a time. Queueing validates the job and takes its edit blocks;
//! `wait_for_jobs` blocks until the queue drains. A job can be stopped and
//! reset from any thread, including while it is the one running.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::jobs::{lock, Job};

struct ManagerInner {
    jobs: Mutex<VecDeque<Arc<dyn Job>>>,
    job_available: Condvar,
    /// Jobs queued but not yet completed.
    pending: Mutex<usize>,
    job_done: Condvar,
    stop: AtomicBool,
    /// Held by the scheduler for the whole of a job's run. Locking it waits
    /// for the current job to leave `run()`.
    run_permit: Mutex<()>,
    /// Serializes reset requests against job completion.
    wait_permit: Mutex<()>,
    current: Mutex<Option<Arc<dyn Job>>>,
}

impl ManagerInner {
    fn scheduler_loop(&self) {
        loop {
            let job = {
                let mut jobs = lock(&self.jobs);
                while jobs.is_empty() && !self.stop.load(Ordering::SeqCst) {
                    jobs = self
                        .job_available
                        .wait(jobs)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
                if self.stop.load(Ordering::SeqCst) {
                    return;
                }
                match jobs.pop_front() {
                    Some(job) => job,
                    None => continue,
                }
            };

            *lock(&self.current) = Some(Arc::clone(&job));

            {
                let _running = lock(&self.run_permit);
                // a reset may have stopped the job between queue and here
                if job.waiting() {
                    job.run();
                } else {
                    debug!(job = job.name(), "skipping job no longer waiting");
                }
                *lock(&self.current) = None;
                let mut pending = lock(&self.pending);
                *pending = pending.saturating_sub(1);
            }
            // let pending resets finish before announcing completion
            drop(lock(&self.wait_permit));
            self.job_done.notify_all();
        }
    }
}

/// Runs queued jobs one at a time on a scheduler thread.
pub struct JobManager {
    inner: Arc<ManagerInner>,
    thread: Option<JoinHandle<()>>,
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new()
    }
}

impl JobManager {
    pub fn new() -> Self {
        let inner = Arc::new(ManagerInner {
            jobs: Mutex::new(VecDeque::new()),
            job_available: Condvar::new(),
            pending: Mutex::new(0),
            job_done: Condvar::new(),
            stop: AtomicBool::new(false),
            run_permit: Mutex::new(()),
            wait_permit: Mutex::new(()),
            current: Mutex::new(None),
        });

        let scheduler = Arc::clone(&inner);
        let thread = thread::Builder::new()
            .name("aeronox-scheduler".to_owned())
            .spawn(move || scheduler.scheduler_loop())
            .expect("Failed to spawn job scheduler thread");

        Self {
            inner,
            thread: Some(thread),
        }
    }

    /// Queues a job. Returns false (and leaves the job `Ready`) when its
    /// validation fails.
    pub fn queue_job(&self, job: Arc<dyn Job>) -> bool {
        match job.queue() {
            Ok(()) => {
                *lock(&self.inner.pending) += 1;
                lock(&self.inner.jobs).push_back(Arc::clone(&job));
                self.inner.job_available.notify_all();
                info!(job = job.name(), "job queued");
                true
            }
            Err(err) => {
                warn!(job = job.name(), error = %err, "job rejected");
                false
            }
        }
    }

    /// Blocks until every queued job has completed.
    pub fn wait_for_jobs(&self) {
        let mut pending = lock(&self.inner.pending);
        while *pending > 0 {
            pending = self
                .inner
                .job_done
                .wait(pending)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Whether the job is the one currently running.
    pub fn is_running(&self, job: &Arc<dyn Job>) -> bool {
        lock(&self.inner.current)
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, job))
    }

    /// Stops the job if needed and returns it to `Ready`. Blocks until a
    /// running job has wound down. No effect on a job that is already
    /// `Ready`; such a job holds no blocks to release.
    pub fn reset_job(&self, job: &Arc<dyn Job>) {
        let _waiting = lock(&self.inner.wait_permit);
        if job.ready() {
            return;
        }
        let was_running = self.is_running(job);
        job.stop();
        if was_running {
            // wait for the scheduler to leave run()
            let _running = lock(&self.inner.run_permit);
            job.reset();
        } else {
            job.reset();
        }
    }

    /// Stops the scheduler thread, dropping queued jobs.
    pub fn shutdown(&mut self) {
        {
            let mut jobs = lock(&self.inner.jobs);
            let dropped = jobs.len();
            jobs.clear();
            let mut pending = lock(&self.inner.pending);
            *pending = pending.saturating_sub(dropped);
        }
        self.inner.stop.store(true, Ordering::SeqCst);
        self.inner.job_available.notify_all();

        if let Some(current) = lock(&self.inner.current).clone() {
            self.reset_job(&current);
        }

        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        self.inner.job_done.notify_all();
        debug!("job manager shut down");
    }
}

impl Drop for JobManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
