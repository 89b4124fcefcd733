//! Integration tests for the job manager.
//!
//! These tests verify the job lifecycle end to end:
//! - FIFO execution of queued jobs, one at a time
//! - Rejected queue attempts leave the job Ready
//! - Reset of finished, running and never-queued jobs
//! - Shutdown while a job is running
//!
//! Run with: `cargo test --test job_manager`

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use aeronox::error::QueueError;
use aeronox::jobs::{Job, JobManager, JobStatus};

// ============================================================================
// Test Helpers
// ============================================================================

/// Minimal job recording its execution into a shared log.
struct TestJob {
    name: String,
    /// queue() fails when false.
    valid: bool,
    /// run() spins until stopped when true.
    blocking: bool,
    status: Mutex<JobStatus>,
    log: Arc<Mutex<Vec<String>>>,
    ran: AtomicBool,
    stops: AtomicUsize,
}

impl TestJob {
    fn new(name: &str, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            valid: true,
            blocking: false,
            status: Mutex::new(JobStatus::Ready),
            log,
            ran: AtomicBool::new(false),
            stops: AtomicUsize::new(0),
        })
    }

    fn invalid(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            valid: false,
            blocking: false,
            status: Mutex::new(JobStatus::Ready),
            log: Arc::new(Mutex::new(Vec::new())),
            ran: AtomicBool::new(false),
            stops: AtomicUsize::new(0),
        })
    }

    fn blocking(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            valid: true,
            blocking: true,
            status: Mutex::new(JobStatus::Ready),
            log: Arc::new(Mutex::new(Vec::new())),
            ran: AtomicBool::new(false),
            stops: AtomicUsize::new(0),
        })
    }

    fn set_status(&self, status: JobStatus) {
        *self.status.lock().unwrap() = status;
    }
}

impl Job for TestJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn queue(&self) -> Result<(), QueueError> {
        if !self.valid {
            return Err(QueueError::NoOperations);
        }
        let mut status = self.status.lock().unwrap();
        if *status != JobStatus::Ready {
            return Err(QueueError::NotReady(*status));
        }
        *status = JobStatus::Waiting;
        Ok(())
    }

    fn run(&self) {
        self.set_status(JobStatus::Running);
        self.ran.store(true, Ordering::SeqCst);
        self.log.lock().unwrap().push(self.name.clone());

        if self.blocking {
            // wind down only when stopped from outside
            while self.running() {
                thread::sleep(Duration::from_millis(5));
            }
            return;
        }
        self.set_status(JobStatus::Finished);
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.set_status(JobStatus::Stopped);
    }

    fn reset(&self) {
        if self.running() {
            return;
        }
        self.set_status(JobStatus::Ready);
    }

    fn progress(&self) -> f32 {
        if self.finished() {
            1.0
        } else {
            0.0
        }
    }

    fn status(&self) -> JobStatus {
        *self.status.lock().unwrap()
    }
}

/// Polls until the predicate holds or the timeout expires.
fn wait_until(predicate: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !predicate() {
        assert!(Instant::now() < deadline, "timed out waiting for condition");
        thread::sleep(Duration::from_millis(2));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_jobs_run_in_fifo_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let manager = JobManager::new();

    let jobs: Vec<_> = (0..3)
        .map(|i| TestJob::new(&format!("job-{i}"), Arc::clone(&log)))
        .collect();
    for job in &jobs {
        let queued = manager.queue_job(Arc::clone(job) as Arc<dyn Job>);
        assert!(queued);
    }
    manager.wait_for_jobs();

    assert_eq!(*log.lock().unwrap(), vec!["job-0", "job-1", "job-2"]);
    for job in &jobs {
        assert!(job.finished());
        assert_eq!(job.progress(), 1.0);
    }
}

#[test]
fn test_rejected_job_stays_ready() {
    let manager = JobManager::new();
    let job = TestJob::invalid("invalid-job");

    let queued = manager.queue_job(Arc::clone(&job) as Arc<dyn Job>);
    assert!(!queued);
    assert!(job.ready());

    // the manager must not run it
    manager.wait_for_jobs();
    assert!(!job.ran.load(Ordering::SeqCst));
}

#[test]
fn test_double_queue_is_rejected() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let job = TestJob::new("job", log);

    assert!(job.queue().is_ok());
    assert!(matches!(
        job.queue(),
        Err(QueueError::NotReady(JobStatus::Waiting))
    ));
}

#[test]
fn test_reset_returns_finished_job_to_ready() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let manager = JobManager::new();
    let job = TestJob::new("job", log);

    manager.queue_job(Arc::clone(&job) as Arc<dyn Job>);
    manager.wait_for_jobs();
    assert!(job.finished());

    let as_dyn: Arc<dyn Job> = job.clone();
    manager.reset_job(&as_dyn);
    assert!(job.ready());
}

#[test]
fn test_reset_of_ready_job_is_a_noop() {
    let manager = JobManager::new();
    let job = TestJob::new("never-queued", Arc::new(Mutex::new(Vec::new())));

    let as_dyn: Arc<dyn Job> = job.clone();
    manager.reset_job(&as_dyn);

    assert!(job.ready());
    assert_eq!(job.stops.load(Ordering::SeqCst), 0);
}

#[test]
fn test_reset_stops_a_running_job() {
    let manager = JobManager::new();
    let job = TestJob::blocking("blocking-job");

    manager.queue_job(Arc::clone(&job) as Arc<dyn Job>);
    wait_until(|| job.running());

    let as_dyn: Arc<dyn Job> = job.clone();
    assert!(manager.is_running(&as_dyn));
    manager.reset_job(&as_dyn);
    assert!(job.ready());

    manager.wait_for_jobs();
}

#[test]
fn test_reset_of_waiting_job_prevents_its_run() {
    let manager = JobManager::new();
    let blocker = TestJob::blocking("blocker");
    let waiting = TestJob::new("waiting", Arc::new(Mutex::new(Vec::new())));

    manager.queue_job(Arc::clone(&blocker) as Arc<dyn Job>);
    wait_until(|| blocker.running());
    manager.queue_job(Arc::clone(&waiting) as Arc<dyn Job>);

    // pull the waiting job back before the blocker finishes
    let waiting_dyn: Arc<dyn Job> = waiting.clone();
    manager.reset_job(&waiting_dyn);
    assert!(waiting.ready());

    let blocker_dyn: Arc<dyn Job> = blocker.clone();
    manager.reset_job(&blocker_dyn);
    manager.wait_for_jobs();
    assert!(!waiting.ran.load(Ordering::SeqCst));
}

#[test]
fn test_shutdown_stops_running_job() {
    let mut manager = JobManager::new();
    let job = TestJob::blocking("blocking-job");

    manager.queue_job(Arc::clone(&job) as Arc<dyn Job>);
    wait_until(|| job.running());

    manager.shutdown();
    assert!(job.ready());
}
