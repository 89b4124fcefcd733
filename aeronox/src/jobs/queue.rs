//! Task queue and worker threads.
//!
//! Jobs split their work into tasks, push them onto a shared [`TaskQueue`]
//! and spawn [`JobWorker`] threads that drain it. A worker exits when the
//! queue is empty; a panicking task is recorded as a run failure and the
//! remaining tasks are dropped.

use std::collections::VecDeque;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::error;

use crate::jobs::{lock, RunFailure};

type Task = Box<dyn FnOnce() + Send>;

/// FIFO queue of pending tasks.
#[derive(Default)]
pub struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, task: impl FnOnce() + Send + 'static) {
        lock(&self.tasks).push_back(Box::new(task));
    }

    pub fn pop(&self) -> Option<Task> {
        lock(&self.tasks).pop_front()
    }

    /// Drops all pending tasks.
    pub fn clear(&self) {
        lock(&self.tasks).clear();
    }

    pub fn len(&self) -> usize {
        lock(&self.tasks).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.tasks).is_empty()
    }
}

/// Thread draining a task queue until it is empty.
pub struct JobWorker {
    handle: Option<JoinHandle<()>>,
}

impl JobWorker {
    /// Spawns a worker. A panic in a task clears the queue and records the
    /// failure, so sibling workers wind down instead of working on.
    pub fn spawn(queue: Arc<TaskQueue>, failure: Arc<RunFailure>) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name("aeronox-worker".to_owned())
            .spawn(move || {
                while let Some(task) = queue.pop() {
                    if catch_unwind(AssertUnwindSafe(task)).is_err() {
                        error!("worker task panicked, dropping remaining tasks");
                        failure.record("unknown", "calculation task panicked");
                        queue.clear();
                    }
                }
            })?;
        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Waits for the worker to drain the queue and exit.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            // the worker cannot panic, tasks run under catch_unwind
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_tasks_run_in_fifo_order() {
        let queue = Arc::new(TaskQueue::new());
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..4 {
            let order = Arc::clone(&order);
            queue.push(move || lock(&order).push(i));
        }

        let worker = JobWorker::spawn(Arc::clone(&queue), Arc::new(RunFailure::new())).unwrap();
        worker.join();

        assert_eq!(*lock(&order), vec![0, 1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_multiple_workers_drain_the_queue() {
        let queue = Arc::new(TaskQueue::new());
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..64 {
            let counter = Arc::clone(&counter);
            queue.push(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }

        let failure = Arc::new(RunFailure::new());
        let workers: Vec<_> = (0..4)
            .map(|_| JobWorker::spawn(Arc::clone(&queue), Arc::clone(&failure)).unwrap())
            .collect();
        for worker in workers {
            worker.join();
        }

        assert_eq!(counter.load(Ordering::Relaxed), 64);
        assert!(!failure.is_set());
    }

    #[test]
    fn test_panicking_task_records_failure_and_clears_queue() {
        let queue = Arc::new(TaskQueue::new());
        let counter = Arc::new(AtomicUsize::new(0));

        queue.push(|| panic!("boom"));
        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            queue.push(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }

        let failure = Arc::new(RunFailure::new());
        let worker = JobWorker::spawn(Arc::clone(&queue), Arc::clone(&failure)).unwrap();
        worker.join();

        assert!(failure.is_set());
        assert_eq!(counter.load(Ordering::Relaxed), 0);
        assert!(queue.is_empty());
    }
}
