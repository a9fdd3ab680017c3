// worker.rs - Fixed-size barrier-synchronized worker pool
//
// N worker threads and the driving thread meet on one Barrier of size N + 1,
// twice per wave:
//
//   phase A: the job is published, every worker starts it
//   phase B: every worker has finished it, `run` may return
//
// Because `run` never returns before phase B, the job may borrow from the
// caller's stack.
//
// New threads wait on a start gate before their first phase A. The gate opens
// once every thread is spawned, or aborts so a partial set can exit.

use super::job::{ParallelJob, Wave};
use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread::{self, JoinHandle};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("degree of parallelism must be at least 2 (got {degree})")]
    InvalidDegree { degree: usize },
    #[error("failed to spawn worker thread {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("parallel worker has been disposed")]
    Disposed,
    #[error("parallel job panicked on worker(s) {workers:?}")]
    JobPanicked { workers: Vec<usize> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Disposed,
}

/// Lifetime-erased job pointer. Only dereferenced between the two barrier
/// phases of the `run` call that published it.
#[derive(Clone, Copy)]
struct JobRef(*const (dyn ParallelJob + 'static));

// SAFETY: the pointee is `Sync` (ParallelJob: Sync) and outlives every
// dereference, see `ParallelWorker::run`.
unsafe impl Send for JobRef {}
unsafe impl Sync for JobRef {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Gate {
    Closed,
    Open,
    Aborted,
}

type WorkerBody = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    gate: Mutex<Gate>,
    gate_changed: Condvar,
    barrier: Barrier,
    job: Mutex<Option<JobRef>>,
    disposed: AtomicBool,
    running: AtomicBool,
    panicked: Mutex<Vec<usize>>,
    live: AtomicUsize,
    waves: AtomicU64,
}

impl Shared {
    fn release(&self, gate: Gate) {
        *self.gate.lock() = gate;
        self.gate_changed.notify_all();
    }

    fn wait_for_release(&self) -> Gate {
        let mut gate = self.gate.lock();
        while *gate == Gate::Closed {
            self.gate_changed.wait(&mut gate);
        }
        *gate
    }
}

pub struct ParallelWorker {
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
    degree: usize,
    driver: Mutex<()>,
}

impl ParallelWorker {
    /// Spawns exactly `degree` worker threads.
    pub fn new(degree: usize) -> Result<Self, WorkerError> {
        Self::spawn_with(degree, |index, body| {
            thread::Builder::new()
                .name(format!("ember-worker-{index}"))
                .spawn(body)
        })
    }

    fn spawn_with<S>(degree: usize, mut spawn: S) -> Result<Self, WorkerError>
    where
        S: FnMut(usize, WorkerBody) -> std::io::Result<JoinHandle<()>>,
    {
        if degree < 2 {
            return Err(WorkerError::InvalidDegree { degree });
        }

        let shared = Arc::new(Shared {
            gate: Mutex::new(Gate::Closed),
            gate_changed: Condvar::new(),
            barrier: Barrier::new(degree + 1),
            job: Mutex::new(None),
            disposed: AtomicBool::new(false),
            running: AtomicBool::new(false),
            panicked: Mutex::new(Vec::new()),
            live: AtomicUsize::new(0),
            waves: AtomicU64::new(0),
        });

        let mut threads = Vec::with_capacity(degree);
        for index in 0..degree {
            let worker_shared = Arc::clone(&shared);
            shared.live.fetch_add(1, Ordering::AcqRel);
            let body: WorkerBody = Box::new(move || worker_loop(worker_shared, index, degree));
            match spawn(index, body) {
                Ok(handle) => threads.push(handle),
                Err(source) => {
                    shared.live.fetch_sub(1, Ordering::AcqRel);
                    shared.disposed.store(true, Ordering::Release);
                    shared.release(Gate::Aborted);
                    for handle in threads {
                        if handle.join().is_err() {
                            tracing::warn!("worker thread exited abnormally");
                        }
                    }
                    tracing::error!(index, error = %source, "failed to spawn worker thread");
                    return Err(WorkerError::Spawn { index, source });
                }
            }
        }
        shared.release(Gate::Open);

        tracing::info!(degree, "parallel worker started");
        Ok(Self {
            shared,
            threads,
            degree,
            driver: Mutex::new(()),
        })
    }

    #[inline]
    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn state(&self) -> WorkerState {
        if self.shared.disposed.load(Ordering::Acquire) {
            WorkerState::Disposed
        } else if self.shared.running.load(Ordering::Acquire) {
            WorkerState::Running
        } else {
            WorkerState::Idle
        }
    }

    /// Worker threads that have not exited yet.
    pub fn live_threads(&self) -> usize {
        self.shared.live.load(Ordering::Acquire)
    }

    /// Completed waves.
    pub fn waves(&self) -> u64 {
        self.shared.waves.load(Ordering::Acquire)
    }

    /// Runs `job` once on every worker and returns when all are done.
    pub fn run(&self, job: &dyn ParallelJob) -> Result<(), WorkerError> {
        let _driver = self.driver.lock();
        if self.shared.disposed.load(Ordering::Acquire) {
            return Err(WorkerError::Disposed);
        }

        let erased: *const (dyn ParallelJob + '_) = job;
        // SAFETY: only the lifetime bound changes. Workers dereference the
        // pointer strictly between phase A and phase B below, and the slot is
        // cleared before this borrow of `job` ends.
        let erased = unsafe {
            std::mem::transmute::<*const (dyn ParallelJob + '_), *const (dyn ParallelJob + 'static)>(
                erased,
            )
        };
        *self.shared.job.lock() = Some(JobRef(erased));
        self.shared.running.store(true, Ordering::Release);

        self.shared.barrier.wait(); // phase A
        self.shared.barrier.wait(); // phase B

        *self.shared.job.lock() = None;
        self.shared.running.store(false, Ordering::Release);
        let wave = self.shared.waves.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(wave, degree = self.degree, "wave complete");

        let panicked = std::mem::take(&mut *self.shared.panicked.lock());
        if panicked.is_empty() {
            Ok(())
        } else {
            tracing::warn!(wave, workers = ?panicked, "parallel job panicked");
            Err(WorkerError::JobPanicked { workers: panicked })
        }
    }

    /// Closure form of [`ParallelWorker::run`].
    pub fn run_with<F>(&self, job: F) -> Result<(), WorkerError>
    where
        F: Fn(Wave) + Sync,
    {
        self.run(&job)
    }

    /// Stops and joins every worker. Idempotent.
    pub fn dispose(&mut self) {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        // Extra phase A: workers observe the flag and leave their loop.
        self.shared.barrier.wait();
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("worker thread exited abnormally");
            }
        }
        tracing::info!(
            degree = self.degree,
            waves = self.waves(),
            "parallel worker disposed"
        );
    }
}

impl Drop for ParallelWorker {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn worker_loop(shared: Arc<Shared>, index: usize, count: usize) {
    let wave = Wave::new(index, count);
    if shared.wait_for_release() == Gate::Aborted {
        shared.live.fetch_sub(1, Ordering::AcqRel);
        tracing::trace!(index, "worker aborted before start");
        return;
    }
    loop {
        shared.barrier.wait(); // phase A
        if shared.disposed.load(Ordering::Acquire) {
            break;
        }

        let job = *shared.job.lock();
        if let Some(JobRef(job)) = job {
            // SAFETY: see `ParallelWorker::run`.
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| unsafe { (*job).execute(wave) }));
            if outcome.is_err() {
                shared.panicked.lock().push(index);
            }
        }

        shared.barrier.wait(); // phase B
    }
    shared.live.fetch_sub(1, Ordering::AcqRel);
    tracing::trace!(index, "worker exited");
}
