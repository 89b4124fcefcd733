//! Emissions run job.
//!
//! Calculates fuel and emissions for every operation of a performance run.
//! Operations are independent, so the run fans one task per operation out
//! over a pool of workers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::constraints::Constraints;
use crate::emissions::calculator::{EmissionsCalculator, EmissionsModel};
use crate::error::QueueError;
use crate::jobs::queue::{JobWorker, TaskQueue};
use crate::jobs::{Job, JobStatus, RunFailure, StatusCell};
use crate::operation::PerformanceRunOutput;
use crate::run::emissions::{EmissionsRunOutput, EmissionsRunSpec};

fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
}

/// Job calculating fuel and emissions for every operation of a run.
pub struct EmissionsRunJob {
    name: String,
    spec: Arc<EmissionsRunSpec>,
    performance: Arc<PerformanceRunOutput>,
    constraints: Arc<Constraints>,
    output: Arc<EmissionsRunOutput>,
    worker_count: usize,
    status: StatusCell,
    tasks: Arc<TaskQueue>,
    failure: Arc<RunFailure>,
    calculated: Arc<AtomicUsize>,
    total: AtomicUsize,
}

impl EmissionsRunJob {
    pub fn new(
        name: impl Into<String>,
        spec: EmissionsRunSpec,
        performance: Arc<PerformanceRunOutput>,
        constraints: Arc<Constraints>,
        output: Arc<EmissionsRunOutput>,
    ) -> Self {
        Self {
            name: name.into(),
            spec: Arc::new(spec),
            performance,
            constraints,
            output,
            worker_count: default_worker_count(),
            status: StatusCell::new(JobStatus::Ready),
            tasks: Arc::new(TaskQueue::new()),
            failure: Arc::new(RunFailure::new()),
            calculated: Arc::new(AtomicUsize::new(0)),
            total: AtomicUsize::new(0),
        }
    }

    /// Caps the number of worker threads, at least one.
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count.max(1);
        self
    }

    pub fn output(&self) -> &Arc<EmissionsRunOutput> {
        &self.output
    }

    /// The failure that stopped the run, if any.
    pub fn failure(&self) -> &Arc<RunFailure> {
        &self.failure
    }

    fn needs_engines(&self) -> bool {
        self.spec.model != EmissionsModel::FuelOnly
    }

    fn block_constraints(&self) {
        for operation in self.performance.operations() {
            self.constraints.block_operation(operation.name());
            if let Some(engine) = &operation.aircraft().lto_engine {
                self.constraints.block_lto_engine(&engine.name);
            }
        }
    }

    fn unblock_constraints(&self) {
        for operation in self.performance.operations() {
            self.constraints.unblock_operation(operation.name());
            if let Some(engine) = &operation.aircraft().lto_engine {
                self.constraints.unblock_lto_engine(&engine.name);
            }
        }
    }
}

impl Job for EmissionsRunJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn queue(&self) -> Result<(), QueueError> {
        if !self.ready() {
            return Err(QueueError::NotReady(self.status()));
        }
        if self.performance.is_empty() {
            return Err(QueueError::NoOperations);
        }

        if self.needs_engines() {
            for operation in self.performance.operations() {
                let aircraft = operation.aircraft();
                if aircraft.lto_engine.is_none() {
                    return Err(QueueError::MissingLtoEngine(aircraft.name.clone()));
                }
            }
        }

        self.block_constraints();
        self.status.store(JobStatus::Waiting);
        Ok(())
    }

    fn run(&self) {
        self.status.store(JobStatus::Running);
        info!(
            job = self.name(),
            operations = self.performance.len(),
            workers = self.worker_count,
            "emissions run started"
        );
        let started = Instant::now();

        self.total.store(self.performance.len(), Ordering::SeqCst);
        self.calculated.store(0, Ordering::SeqCst);

        let mut calculator = EmissionsCalculator::new(Arc::clone(&self.spec));
        for operation in self.performance.operations() {
            if let Some(engine) = &operation.aircraft().lto_engine {
                calculator.add_engine(engine);
            }
        }
        let calculator = Arc::new(calculator);

        for (operation, points) in self.performance.entries() {
            let calculator = Arc::clone(&calculator);
            let operation = Arc::clone(operation);
            let points = Arc::clone(points);
            let spec = Arc::clone(&self.spec);
            let output = Arc::clone(&self.output);
            let failure = Arc::clone(&self.failure);
            let tasks = Arc::clone(&self.tasks);
            let calculated = Arc::clone(&self.calculated);

            self.tasks.push(move || {
                match calculator.calculate(&operation, &points) {
                    Ok(out) => {
                        output.add_operation_output(&operation, out, spec.save_segment_results);
                        calculated.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(err) => {
                        failure.record(operation.name(), err);
                        tasks.clear();
                    }
                }
            });
        }

        if self.running() {
            let mut workers = Vec::with_capacity(self.worker_count);
            for _ in 0..self.worker_count {
                match JobWorker::spawn(Arc::clone(&self.tasks), Arc::clone(&self.failure)) {
                    Ok(worker) => workers.push(worker),
                    Err(err) => {
                        error!(job = self.name(), error = %err, "failed to spawn worker");
                        break;
                    }
                }
            }
            if workers.is_empty() {
                self.failure.record(self.name(), "no workers could be spawned");
                self.tasks.clear();
            }
            for worker in workers {
                worker.join();
            }
        } else {
            self.tasks.clear();
        }

        if let Some(failed) = self.failure.get() {
            error!(
                job = self.name(),
                operation = failed.operation,
                reason = failed.reason,
                "emissions run stopped"
            );
            self.status.store(JobStatus::Stopped);
            return;
        }

        if self.running() {
            self.status.store(JobStatus::Finished);
            info!(
                job = self.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "emissions run finished"
            );
        }
    }

    fn stop(&self) {
        // only a queued or executing job can be stopped; anything else
        // holds no pending work and must keep its status
        if self.waiting() || self.running() {
            self.status.store(JobStatus::Stopped);
            self.tasks.clear();
        }
    }

    fn reset(&self) {
        if self.running() {
            warn!(job = self.name(), "cannot reset a running job");
            return;
        }
        if !self.ready() {
            self.unblock_constraints();
        }
        self.output.clear();
        self.calculated.store(0, Ordering::SeqCst);
        self.total.store(0, Ordering::SeqCst);
        self.failure.clear();
        self.status.store(JobStatus::Ready);
    }

    fn progress(&self) -> f32 {
        let total = self.total.load(Ordering::SeqCst);
        if total == 0 {
            return 0.0;
        }
        self.calculated.load(Ordering::SeqCst) as f32 / total as f32
    }

    fn status(&self) -> JobStatus {
        self.status.load()
    }
}
