//! Fixed-size worker pool draining a bounded task queue.
//!
//! The queue holds at most `threads` pending tasks, so `submit` waits once it
//! is full; that is the only backpressure between listing and transfers.
//! Each worker runs one task at a time on the blocking pool, so at most
//! `threads` tasks execute at any instant. A pool belongs to one run:
//! `finish` closes the queue and waits for every submitted task.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::config;

/// Runs one task to completion. Called from blocking threads.
pub trait TaskExecutor<T>: Send + Sync + 'static {
    fn execute(&self, task: T);
}

pub struct WorkerPool<T> {
    tx: mpsc::Sender<T>,
    workers: JoinSet<()>,
    threads: usize,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Start `threads` workers (validated against the configured bounds).
    /// Must be called from within a tokio runtime.
    pub fn spawn<E>(threads: usize, executor: Arc<E>) -> Result<Self>
    where
        E: TaskExecutor<T>,
    {
        let threads = config::validate_threads(threads)?;
        let (tx, rx) = mpsc::channel::<T>(threads);
        let rx = Arc::new(Mutex::new(rx));
        let mut workers = JoinSet::new();
        for worker in 0..threads {
            let rx = Arc::clone(&rx);
            let executor = Arc::clone(&executor);
            workers.spawn(async move {
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(task) = next else {
                        break;
                    };
                    let executor = Arc::clone(&executor);
                    if let Err(e) = tokio::task::spawn_blocking(move || executor.execute(task)).await {
                        tracing::error!(worker, "task panicked: {}", e);
                    }
                }
            });
        }
        tracing::debug!(threads, "worker pool started");
        Ok(WorkerPool {
            tx,
            workers,
            threads,
        })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Enqueue a task, waiting while the queue is full.
    pub async fn submit(&self, task: T) -> Result<()> {
        self.tx
            .send(task)
            .await
            .map_err(|_| anyhow::anyhow!("worker pool is shut down"))
    }

    /// Close the queue and wait until every submitted task has finished.
    pub async fn finish(self) -> Result<()> {
        let WorkerPool {
            tx, mut workers, ..
        } = self;
        drop(tx);
        while let Some(res) = workers.join_next().await {
            res.map_err(|e| anyhow::anyhow!("worker join: {}", e))?;
        }
        Ok(())
    }
}
