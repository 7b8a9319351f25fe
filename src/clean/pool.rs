use crate::clean::options::ParallelOptions;
use crate::error::{CleanError, Result};
use std::sync::{mpsc, Mutex};
use tracing::{debug, trace};

/// A bounded set of workers that lives for a single call.
///
/// Jobs sit in a shared task queue; each worker pulls until the queue is
/// empty and pushes its results onto a result channel. The driver blocks on
/// that channel until every worker has hung up, so results come back in
/// arrival order. Callers carry whatever position they need inside `R`.
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Start a pool sized for `jobs` jobs under `options`. Built before any
    /// cell is moved out of a table so a failure leaves the table untouched.
    pub fn new(options: &ParallelOptions, jobs: usize) -> Result<Self> {
        let workers = options.workers_for(jobs);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("gridclean-worker-{i}"))
            .build()
            .map_err(|e| CleanError::WorkerPool(e.to_string()))?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `work` over every job and return the results in arrival order.
    pub fn run<J, R, F>(&self, jobs: Vec<J>, work: F) -> Vec<R>
    where
        J: Send,
        R: Send,
        F: Fn(J) -> R + Sync,
    {
        if jobs.is_empty() {
            return Vec::new();
        }

        let job_count = jobs.len();
        debug!(workers = self.workers, jobs = job_count, "worker pool started");

        let tasks = Mutex::new(jobs.into_iter());
        let (tx, rx) = mpsc::channel::<R>();
        let mut results = Vec::with_capacity(job_count);

        self.pool.in_place_scope(|scope| {
            for worker in 0..self.workers {
                let tx = tx.clone();
                let tasks = &tasks;
                let work = &work;
                scope.spawn(move |_| {
                    let mut done = 0usize;
                    while let Some(job) = next_task(tasks) {
                        if tx.send(work(job)).is_err() {
                            break;
                        }
                        done += 1;
                    }
                    trace!(worker, done, "worker drained");
                });
            }
            // only the workers hold senders now; the loop ends once they all exit
            drop(tx);
            results.extend(rx.iter());
        });

        debug!(results = results.len(), "worker pool drained");
        results
    }
}

fn next_task<I: Iterator>(tasks: &Mutex<I>) -> Option<I::Item> {
    match tasks.lock() {
        Ok(mut queue) => queue.next(),
        Err(poisoned) => poisoned.into_inner().next(),
    }
}
