//! Bounded worker pool with caller-runs backpressure
//!
//! Jobs go through a bounded channel to a fixed set of tokio workers. When
//! the channel is full the submitting task runs the job itself, so nothing is
//! dropped and the queue never grows past its bound.

use crate::{FrontierError, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// A unit of work for the pool
pub type Job = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

#[derive(Default)]
struct PoolState {
    failed: AtomicBool,
    first_error: Mutex<Option<FrontierError>>,
}

impl PoolState {
    fn record(&self, result: Result<()>) {
        if let Err(e) = result {
            tracing::error!("Job failed: {}", e);
            self.failed.store(true, Ordering::SeqCst);
            if let Ok(mut slot) = self.first_error.lock() {
                slot.get_or_insert(e);
            }
        }
    }
}

pub struct BoundedPool {
    tx: mpsc::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    state: Arc<PoolState>,
}

impl BoundedPool {
    /// Spawns `workers` tasks draining a queue of `queue_size` jobs
    pub fn new(workers: usize, queue_size: usize) -> Self {
        let (tx, rx) = mpsc::channel::<Job>(queue_size.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let state = Arc::new(PoolState::default());

        let workers = (0..workers.max(1))
            .map(|id| {
                let rx = rx.clone();
                let state = state.clone();
                tokio::spawn(async move {
                    loop {
                        let job = { rx.lock().await.recv().await };
                        match job {
                            Some(job) => state.record(job.await),
                            None => break,
                        }
                    }
                    tracing::trace!("Worker {} finished", id);
                })
            })
            .collect();

        Self { tx, workers, state }
    }

    /// Queues a job, or runs it on the calling task if the queue is full
    pub async fn submit(&self, job: Job) {
        match self.tx.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) | Err(TrySendError::Closed(job)) => {
                tracing::trace!("Queue full, running job on the caller");
                self.state.record(job.await);
            }
        }
    }

    /// True once any job has failed
    pub fn has_failed(&self) -> bool {
        self.state.failed.load(Ordering::SeqCst)
    }

    /// Waits for queued jobs to finish; returns the first job error
    pub async fn join(self) -> Result<()> {
        drop(self.tx);
        for worker in self.workers {
            if let Err(e) = worker.await {
                return Err(FrontierError::Pipeline(format!("worker panicked: {}", e)));
            }
        }
        let first = self
            .state
            .first_error
            .lock()
            .map_err(|_| FrontierError::Pipeline("pool state poisoned".to_string()))?
            .take();
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// `ceil(workers_per_cpu * available CPUs)`, at least one
pub fn worker_count(workers_per_cpu: f64) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    ((workers_per_cpu * cpus as f64).ceil() as usize).max(1)
}
