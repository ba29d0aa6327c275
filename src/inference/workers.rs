//! Dedicated worker threads for representative workloads.
//!
//! Measured workloads block for as long as the job takes, so they run here
//! instead of on the async runtime's threads. Results come back over a oneshot.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::warn;

use crate::common::error::{MemError, MemResult};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct Pool {
    tx: Option<mpsc::Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
}

impl Pool {
    pub fn new(size: usize) -> MemResult<Self> {
        let (tx, rx) = mpsc::channel::<Job>();
        let shared_rx = Arc::new(Mutex::new(rx));

        let mut handles = Vec::with_capacity(size.max(1));
        for i in 0..size.max(1) {
            let rx = Arc::clone(&shared_rx);
            let handle = thread::Builder::new()
                .name(format!("workload-{i}"))
                .spawn(move || loop {
                    let job = {
                        let guard = rx.lock();
                        guard.recv()
                    };

                    match job {
                        Ok(job) => {
                            if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                                warn!(ev = "workload_panicked", worker = i);
                            }
                        }
                        Err(_) => break,
                    }
                })?;
            handles.push(handle);
        }

        Ok(Self {
            tx: Some(tx),
            handles,
        })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Queue `job`; the receiver resolves with its return value.
    pub fn submit<F, T>(&self, job: F) -> MemResult<oneshot::Receiver<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let wrapped: Job = Box::new(move || {
            let _ = done_tx.send(job());
        });
        self.tx
            .as_ref()
            .ok_or_else(|| MemError::internal("worker pool is shut down"))?
            .send(wrapped)
            .map_err(|_| MemError::internal("worker pool is shut down"))?;
        Ok(done_rx)
    }

    /// Run `job` on the pool and wait for it without blocking the caller's thread.
    pub async fn run<F, T>(&self, job: F) -> MemResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.submit(job)?
            .await
            .map_err(|_| MemError::Workload("workload panicked".to_string()))
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        // Closing the channel lets every worker fall out of its recv loop.
        self.tx.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn runs_jobs_off_the_calling_thread() {
        let pool = Pool::new(2).unwrap();
        let caller = thread::current().id();
        let worker = pool.run(move || thread::current().id()).await.unwrap();
        assert_ne!(worker, caller);
        assert_eq!(pool.size(), 2);
    }

    #[tokio::test]
    async fn panicking_job_reports_error_and_pool_survives() {
        let pool = Pool::new(1).unwrap();
        let err = pool
            .run(|| -> u32 { panic!("bad workload") })
            .await
            .unwrap_err();
        assert!(matches!(err, MemError::Workload(_)));
        assert_eq!(pool.run(|| 41 + 1).await.unwrap(), 42);
    }

    #[test]
    fn drop_waits_for_queued_jobs() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = Pool::new(3).unwrap();
            for _ in 0..30 {
                let counter = Arc::clone(&counter);
                pool.submit(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 30);
    }
}
