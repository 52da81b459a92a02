//! Fixed-size worker pool with cooperative cancellation
//!
//! Jobs are queued on an unbounded channel and picked up by a fixed number of
//! named threads. Shutdown disconnects a cancellation channel, which every
//! idle worker and every worker blocked on the handoff queue is selecting
//! on, so nobody stays parked. Jobs still queued at that point are dropped
//! without running.
//!
//! A job that never returns keeps its thread forever; there is no per-job
//! timeout, and [`WorkerPool::shutdown`] will wait for it.

use crossbeam_channel::{select, Receiver, Sender, TryRecvError};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Owner side of a cancellation signal
pub struct CancelSource {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        CancelSource { tx, rx }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.rx.clone(),
        }
    }

    /// Fire the signal. Nothing is ever sent; disconnecting wakes every
    /// receiver at once.
    pub fn cancel(self) {
        drop(self.tx);
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a cancellation signal, handed to each job
#[derive(Clone)]
pub struct CancelToken {
    rx: Receiver<()>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Channel to `select!` on; becomes ready once cancelled
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

/// Unit of work run on a pool thread
pub type Job = Box<dyn FnOnce(&CancelToken) + Send>;

/// Fixed-size thread pool
pub struct WorkerPool {
    jobs: Option<Sender<Job>>,
    cancel: Option<CancelSource>,
    workers: Vec<JoinHandle<()>>,
    queued: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Spawn `threads` workers named `{name_prefix}{index}`
    pub fn new(threads: usize, name_prefix: &str) -> io::Result<Self> {
        let (jobs_tx, jobs_rx) = crossbeam_channel::unbounded::<Job>();
        let cancel = CancelSource::new();
        let token = cancel.token();
        let queued = Arc::new(AtomicUsize::new(0));

        let mut pool = WorkerPool {
            jobs: Some(jobs_tx),
            cancel: Some(cancel),
            workers: Vec::with_capacity(threads),
            queued: Arc::clone(&queued),
        };

        for index in 0..threads.max(1) {
            let jobs = jobs_rx.clone();
            let token = token.clone();
            let queued = Arc::clone(&queued);
            let spawned = thread::Builder::new()
                .name(format!("{}{}", name_prefix, index))
                .spawn(move || worker_loop(jobs, token, queued));
            match spawned {
                Ok(handle) => pool.workers.push(handle),
                Err(e) => {
                    pool.shutdown();
                    return Err(e);
                }
            }
        }

        log::info!("Started worker pool with {} threads", pool.workers.len());
        Ok(pool)
    }

    /// Queue a job. Returns `false` once the pool has shut down.
    pub fn submit(&self, job: Job) -> bool {
        let Some(jobs) = &self.jobs else {
            return false;
        };
        self.queued.fetch_add(1, Ordering::SeqCst);
        if jobs.send(job).is_err() {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Jobs submitted but not yet picked up by a worker
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    pub fn is_running(&self) -> bool {
        self.jobs.is_some()
    }

    /// Cancel queued and in-flight jobs, then wait for every worker to exit.
    ///
    /// Idempotent. Returns the number of jobs that never started.
    pub fn shutdown(&mut self) -> usize {
        let Some(cancel) = self.cancel.take() else {
            return 0;
        };
        cancel.cancel();
        self.jobs = None;

        for handle in self.workers.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                log::error!("Worker thread {} exited with a panic", name);
            }
        }

        let dropped = self.queued.swap(0, Ordering::SeqCst);
        log::info!("Worker pool stopped, {} queued jobs cancelled", dropped);
        dropped
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(jobs: Receiver<Job>, token: CancelToken, queued: Arc<AtomicUsize>) {
    loop {
        let next = select! {
            recv(token.receiver()) -> _ => None,
            recv(jobs) -> job => job.ok(),
        };
        let Some(job) = next else {
            break;
        };
        if token.is_cancelled() {
            // Still counted as queued: it never ran
            break;
        }
        queued.fetch_sub(1, Ordering::SeqCst);

        // A panicking job must not take the worker down with it
        if panic::catch_unwind(AssertUnwindSafe(|| job(&token))).is_err() {
            let name = thread::current().name().unwrap_or("worker").to_string();
            log::error!("Job panicked on {}", name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_jobs_run_on_named_threads() {
        let pool = WorkerPool::new(2, "test-worker-").unwrap();
        let (tx, rx) = mpsc::channel();
        for _ in 0..4 {
            let tx = tx.clone();
            pool.submit(Box::new(move |_| {
                let name = thread::current().name().unwrap_or("").to_string();
                tx.send(name).unwrap();
            }));
        }

        for _ in 0..4 {
            let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert!(name.starts_with("test-worker-"));
        }
        assert_eq!(pool.threads(), 2);
    }

    #[test]
    fn test_shutdown_drops_queued_jobs() {
        let mut pool = WorkerPool::new(1, "test-worker-").unwrap();
        let (started_tx, started_rx) = mpsc::channel();
        let (ran_tx, ran_rx) = mpsc::channel::<()>();

        // Occupy the only worker until cancellation
        pool.submit(Box::new(move |token| {
            started_tx.send(()).unwrap();
            let _ = token.receiver().recv();
        }));
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        for _ in 0..3 {
            let ran_tx = ran_tx.clone();
            pool.submit(Box::new(move |_| ran_tx.send(()).unwrap()));
        }
        drop(ran_tx);

        assert_eq!(pool.shutdown(), 3);
        assert!(ran_rx.recv().is_err());
        assert!(!pool.submit(Box::new(|_| {})));
        assert_eq!(pool.shutdown(), 0);
    }

    #[test]
    fn test_panicking_job_keeps_worker_alive() {
        let pool = WorkerPool::new(1, "test-worker-").unwrap();
        let (tx, rx) = mpsc::channel();
        pool.submit(Box::new(|_| panic!("boom")));
        pool.submit(Box::new(move |_| tx.send(7).unwrap()));

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);
    }
}
