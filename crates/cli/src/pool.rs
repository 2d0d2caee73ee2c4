// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded worker pool.
//!
//! Generic task-dispatch/result-collection fabric: submit closures tagged
//! with an id, consume outcomes from a channel, correlate by id. At most
//! `concurrency` tasks execute in parallel; `submit` applies back-pressure
//! when the inbound buffer fills. A panicking task becomes an error
//! outcome and its worker moves on to the next task.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

/// Hard cap on worker threads regardless of core count.
pub const MAX_WORKERS: usize = 8;

/// Inbound task buffer size; `submit` blocks beyond this.
pub const TASK_BUFFER: usize = 10_000;

/// Pool width for this host: min(cores, MAX_WORKERS).
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
        .min(MAX_WORKERS)
}

/// A unit of work: an id plus the closure producing the result.
pub struct Task<T> {
    pub id: u64,
    func: Box<dyn FnOnce() -> Result<T, String> + Send>,
}

impl<T> Task<T> {
    /// Wrap a closure as a task.
    pub fn new(id: u64, func: impl FnOnce() -> Result<T, String> + Send + 'static) -> Self {
        Self {
            id,
            func: Box::new(func),
        }
    }
}

/// Result of one task, tagged with its id.
#[derive(Debug)]
pub struct TaskOutcome<T> {
    pub id: u64,
    pub result: Result<T, String>,
}

/// Bounded pool of worker threads consuming tasks from a channel.
pub struct WorkerPool<T> {
    task_tx: Option<Sender<Task<T>>>,
    result_rx: Receiver<TaskOutcome<T>>,
    workers: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Start `concurrency` workers (clamped to 1..=MAX_WORKERS).
    pub fn new(concurrency: usize) -> Self {
        let concurrency = concurrency.clamp(1, MAX_WORKERS);
        let (task_tx, task_rx) = bounded::<Task<T>>(TASK_BUFFER);
        // Results are unbounded so workers never block on a slow consumer
        // and stop() cannot deadlock against an undrained channel.
        let (result_tx, result_rx) = unbounded::<TaskOutcome<T>>();

        let workers = (0..concurrency)
            .map(|worker_idx| {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                std::thread::spawn(move || {
                    for task in task_rx.iter() {
                        let id = task.id;
                        let func = task.func;
                        let result = match catch_unwind(AssertUnwindSafe(func)) {
                            Ok(result) => result,
                            Err(_) => {
                                tracing::error!("task {id} panicked in worker {worker_idx}");
                                Err(format!("task {id} panicked"))
                            }
                        };
                        if result_tx.send(TaskOutcome { id, result }).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();

        Self {
            task_tx: Some(task_tx),
            result_rx,
            workers,
        }
    }

    /// Submit a task; blocks while the inbound buffer is full.
    ///
    /// Returns Err after `stop()` has closed the pool.
    pub fn submit(&self, task: Task<T>) -> Result<(), String> {
        match &self.task_tx {
            Some(tx) => tx
                .send(task)
                .map_err(|_| "worker pool is stopped".to_string()),
            None => Err("worker pool is stopped".to_string()),
        }
    }

    /// Handle to the outcome stream; clone before `stop()` to drain after.
    pub fn results(&self) -> Receiver<TaskOutcome<T>> {
        self.result_rx.clone()
    }

    /// Synchronous barrier: returns once every submitted task has run and
    /// posted its outcome. The result stream closes afterwards.
    pub fn stop(mut self) {
        self.task_tx.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("worker thread panicked outside a task");
            }
        }
    }

    /// Submit a batch and wait for every outcome (convenience wrapper).
    pub fn run_all(self, tasks: Vec<Task<T>>) -> Vec<TaskOutcome<T>> {
        let expected = tasks.len();
        let results = self.results();
        for task in tasks {
            if self.submit(task).is_err() {
                break;
            }
        }
        self.stop();
        results.iter().take(expected).collect()
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
