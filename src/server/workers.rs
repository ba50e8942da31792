//! Bounded pool of connection workers
//!
//! Each accepted connection runs start to finish on one worker thread. A job
//! goes to a parked worker when one is waiting, otherwise to a new thread up to
//! `max_workers`, otherwise into a queue of `backlog` slots; beyond that it is
//! rejected. A worker that stays idle for `idle_timeout` exits.

use crate::config::WorkerConfig;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select};
use parking_lot::{Condvar, Mutex};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error};

/// How often parked workers look at the shutdown flag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("all {max_workers} workers are busy and the backlog is full")]
    Saturated { max_workers: usize },

    #[error("worker pool is shut down")]
    ShutDown,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

#[derive(Debug, Default)]
struct Counts {
    live: usize,
    idle: usize,
}

struct Shared {
    /// Zero-capacity: a send succeeds only into a parked worker
    handoff: Receiver<Job>,
    backlog: Receiver<Job>,
    counts: Mutex<Counts>,
    all_exited: Condvar,
    shutdown: AtomicBool,
    idle_timeout: Duration,
}

pub struct WorkerPool {
    handoff: Sender<Job>,
    backlog: Sender<Job>,
    shared: Arc<Shared>,
    max_workers: usize,
    next_id: AtomicUsize,
}

impl WorkerPool {
    pub fn new(config: &WorkerConfig) -> Self {
        let (handoff, handoff_rx) = bounded(0);
        let (backlog, backlog_rx) = bounded(config.backlog);
        Self {
            handoff,
            backlog,
            shared: Arc::new(Shared {
                handoff: handoff_rx,
                backlog: backlog_rx,
                counts: Mutex::new(Counts::default()),
                all_exited: Condvar::new(),
                shutdown: AtomicBool::new(false),
                idle_timeout: config.idle_timeout(),
            }),
            max_workers: config.max_workers.max(1),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Run `job` on a worker. A rejected job is dropped without running.
    pub fn execute<F>(&self, job: F) -> Result<(), ExecuteError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.shared.shutdown.load(Ordering::Acquire) {
            return Err(ExecuteError::ShutDown);
        }

        let job = match self.handoff.try_send(Box::new(job)) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(job)) => job,
            Err(TrySendError::Disconnected(_)) => return Err(ExecuteError::ShutDown),
        };

        // workers retire under this lock, so `live` cannot drop behind our back
        let mut counts = self.shared.counts.lock();
        if counts.live < self.max_workers {
            counts.live += 1;
            drop(counts);
            return self.spawn(job);
        }

        match self.backlog.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ExecuteError::Saturated {
                max_workers: self.max_workers,
            }),
            Err(TrySendError::Disconnected(_)) => Err(ExecuteError::ShutDown),
        }
    }

    fn spawn(&self, first: Job) -> Result<(), ExecuteError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("clinrec-worker-{id}"))
            .spawn(move || worker_loop(shared, first));

        match spawned {
            Ok(_) => Ok(()),
            Err(e) => {
                self.shared.counts.lock().live -= 1;
                Err(ExecuteError::Spawn(e))
            }
        }
    }

    /// Worker threads currently alive
    pub fn live_workers(&self) -> usize {
        self.shared.counts.lock().live
    }

    /// Workers parked waiting for a job
    pub fn idle_workers(&self) -> usize {
        self.shared.counts.lock().idle
    }

    /// Jobs waiting in the backlog
    pub fn queued(&self) -> usize {
        self.backlog.len()
    }

    /// Stop accepting jobs and drop the queued ones. Running jobs finish.
    ///
    /// Returns the number of dropped jobs.
    pub fn shutdown(&self) -> usize {
        self.shared.shutdown.store(true, Ordering::Release);
        let mut dropped = 0;
        while let Ok(job) = self.shared.backlog.try_recv() {
            drop(job);
            dropped += 1;
        }
        dropped
    }

    /// Wait for every worker to exit. `false` when `timeout` elapsed first.
    pub fn join(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut counts = self.shared.counts.lock();
        while counts.live > 0 {
            if self
                .shared
                .all_exited
                .wait_until(&mut counts, deadline)
                .timed_out()
            {
                return counts.live == 0;
            }
        }
        true
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

enum Next {
    Job(Job),
    Idle,
    Closed,
}

fn worker_loop(shared: Arc<Shared>, first: Job) {
    run_job(first);

    let mut idle_since = Instant::now();
    shared.counts.lock().idle += 1;

    while !shared.shutdown.load(Ordering::Acquire) {
        let next = match shared.backlog.try_recv() {
            Ok(job) => Next::Job(job),
            Err(_) => select! {
                recv(shared.handoff) -> job => job.map_or(Next::Closed, Next::Job),
                recv(shared.backlog) -> job => job.map_or(Next::Closed, Next::Job),
                default(POLL_INTERVAL) => Next::Idle,
            },
        };

        match next {
            Next::Job(job) => {
                shared.counts.lock().idle -= 1;
                run_job(job);
                shared.counts.lock().idle += 1;
                idle_since = Instant::now();
            }
            Next::Idle if idle_since.elapsed() >= shared.idle_timeout => {
                let counts = shared.counts.lock();
                if shared.backlog.is_empty() {
                    debug!("retiring idle worker");
                    exit(&shared, counts);
                    return;
                }
            }
            Next::Idle => {}
            Next::Closed => break,
        }
    }

    let counts = shared.counts.lock();
    exit(&shared, counts);
}

fn exit(shared: &Shared, mut counts: parking_lot::MutexGuard<'_, Counts>) {
    counts.idle -= 1;
    counts.live -= 1;
    if counts.live == 0 {
        shared.all_exited.notify_all();
    }
}

fn run_job(job: Job) {
    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
        error!("connection worker panicked");
    }
}
