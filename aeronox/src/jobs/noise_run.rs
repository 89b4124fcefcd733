//! Noise run job.
//!
//! Calculates single event noise for every operation of a performance run
//! and folds the results into the run's cumulative metrics. The Doc29
//! calculator already parallelizes over receptors, so the run uses a single
//! worker and one task per operation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::constraints::Constraints;
use crate::error::QueueError;
use crate::jobs::queue::{JobWorker, TaskQueue};
use crate::jobs::{Job, JobStatus, RunFailure, StatusCell};
use crate::noise::calculator::NoiseCalculatorDoc29;
use crate::operation::{OperationKind, PerformanceRunOutput};
use crate::run::noise::{NoiseRunOutput, NoiseRunSpec};

/// Job calculating noise for every operation of a run.
pub struct NoiseRunJob {
    name: String,
    spec: Arc<NoiseRunSpec>,
    performance: Arc<PerformanceRunOutput>,
    constraints: Arc<Constraints>,
    output: Arc<NoiseRunOutput>,
    status: StatusCell,
    tasks: Arc<TaskQueue>,
    failure: Arc<RunFailure>,
    calculated: Arc<AtomicUsize>,
    total: AtomicUsize,
}

impl NoiseRunJob {
    pub fn new(
        name: impl Into<String>,
        spec: NoiseRunSpec,
        performance: Arc<PerformanceRunOutput>,
        constraints: Arc<Constraints>,
        output: Arc<NoiseRunOutput>,
    ) -> Self {
        Self {
            name: name.into(),
            spec: Arc::new(spec),
            performance,
            constraints,
            output,
            status: StatusCell::new(JobStatus::Ready),
            tasks: Arc::new(TaskQueue::new()),
            failure: Arc::new(RunFailure::new()),
            calculated: Arc::new(AtomicUsize::new(0)),
            total: AtomicUsize::new(0),
        }
    }

    pub fn output(&self) -> &Arc<NoiseRunOutput> {
        &self.output
    }

    /// The failure that stopped the run, if any.
    pub fn failure(&self) -> &Arc<RunFailure> {
        &self.failure
    }

    fn block_constraints(&self) {
        for operation in self.performance.operations() {
            self.constraints.block_operation(operation.name());
            if let Some(record) = &operation.aircraft().doc29_noise {
                self.constraints.block_noise_record(&record.name);
            }
        }
    }

    fn unblock_constraints(&self) {
        for operation in self.performance.operations() {
            self.constraints.unblock_operation(operation.name());
            if let Some(record) = &operation.aircraft().doc29_noise {
                self.constraints.unblock_noise_record(&record.name);
            }
        }
    }
}

impl Job for NoiseRunJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn queue(&self) -> Result<(), QueueError> {
        if !self.ready() {
            return Err(QueueError::NotReady(self.status()));
        }
        if self.spec.receptors.is_empty() {
            return Err(QueueError::EmptyReceptorSet);
        }
        if self.performance.is_empty() {
            return Err(QueueError::NoOperations);
        }

        for operation in self.performance.operations() {
            let aircraft = operation.aircraft();
            let record = aircraft
                .doc29_noise
                .as_deref()
                .ok_or_else(|| QueueError::MissingNoiseRecord(aircraft.name.clone()))?;
            let valid = match operation.kind() {
                OperationKind::Arrival => record.valid_arrivals(),
                OperationKind::Departure => record.valid_departures(),
            };
            if !valid {
                return Err(QueueError::InvalidNoiseRecord {
                    record: record.name.clone(),
                    aircraft: aircraft.name.clone(),
                    kind: operation.kind(),
                });
            }
        }

        self.block_constraints();
        self.status.store(JobStatus::Waiting);
        Ok(())
    }

    fn run(&self) {
        self.status.store(JobStatus::Running);
        info!(job = self.name(), operations = self.performance.len(), "noise run started");
        let started = Instant::now();

        self.output
            .start_cumulative(self.spec.receptors.len(), &self.spec.metrics);
        self.total.store(self.performance.len(), Ordering::SeqCst);
        self.calculated.store(0, Ordering::SeqCst);

        let mut calculator = NoiseCalculatorDoc29::new(Arc::clone(&self.spec));
        for operation in self.performance.operations() {
            if let Some(record) = &operation.aircraft().doc29_noise {
                match operation.kind() {
                    OperationKind::Arrival => calculator.add_arrival(record),
                    OperationKind::Departure => calculator.add_departure(record),
                }
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
                    Ok(event) => {
                        output.accumulate(&operation, &event, &spec.metrics);
                        if spec.save_single_event_metrics {
                            output.add_single_event(&operation, event);
                        }
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
            // the calculator fans out over receptors, one worker is enough
            match JobWorker::spawn(Arc::clone(&self.tasks), Arc::clone(&self.failure)) {
                Ok(worker) => worker.join(),
                Err(err) => {
                    error!(job = self.name(), error = %err, "failed to spawn worker");
                    self.failure.record(self.name(), err);
                    self.tasks.clear();
                }
            }
        } else {
            self.tasks.clear();
        }

        if let Some(failed) = self.failure.get() {
            error!(
                job = self.name(),
                operation = failed.operation,
                reason = failed.reason,
                "noise run stopped"
            );
            self.status.store(JobStatus::Stopped);
            return;
        }

        if self.running() {
            self.output.finish_cumulative(&self.spec.metrics);
            self.status.store(JobStatus::Finished);
            info!(
                job = self.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "noise run finished"
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
