use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::error::{Error, Result};
use crate::work::task::Task;

const POOL_NAME: &str = "leader-followers";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counters describing the pool's election and execution history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of times a worker took over leadership.
    pub elections: u64,
    /// Tasks that ran to completion.
    pub executed: u64,
    /// Tasks that returned an error or panicked.
    pub failed: u64,
    /// Highest number of workers ever observed holding leadership at once.
    pub max_concurrent_leaders: usize,
}

#[derive(Default)]
struct Counters {
    elections: AtomicU64,
    executed: AtomicU64,
    failed: AtomicU64,
    leaders: AtomicUsize,
    max_concurrent_leaders: AtomicUsize,
}

struct Shared {
    rx: Receiver<Task>,
    /// Held by the current leader for as long as it waits on the queue.
    leadership: Mutex<()>,
    leader_active: AtomicBool,
    counters: Counters,
    #[cfg(test)]
    dequeued: Mutex<Vec<crate::work::task::TaskId>>,
}

impl Shared {
    /// Become leader, take the next task in FIFO order and hand leadership over.
    ///
    /// Returns `None` once the pool is stopped and the queue is drained.
    fn lead(&self, worker: usize) -> Option<Task> {
        let _leadership = lock(&self.leadership);

        let leaders = self.counters.leaders.fetch_add(1, Ordering::AcqRel) + 1;
        self.counters
            .max_concurrent_leaders
            .fetch_max(leaders, Ordering::AcqRel);
        if self.leader_active.swap(true, Ordering::AcqRel) {
            tracing::error!(worker, "Leadership taken while another leader was active");
        }
        self.counters.elections.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(worker, "Became leader");

        let next = self.rx.recv().ok();
        if let Some(task) = &next {
            self.record_dequeue(task);
        }

        // Reset before the guard drops so the next follower can win the election.
        self.leader_active.store(false, Ordering::Release);
        self.counters.leaders.fetch_sub(1, Ordering::AcqRel);
        next
    }

    #[cfg(test)]
    fn record_dequeue(&self, task: &Task) {
        lock(&self.dequeued).push(task.id());
    }

    #[cfg(not(test))]
    fn record_dequeue(&self, _task: &Task) {}

    fn stats(&self) -> PoolStats {
        PoolStats {
            elections: self.counters.elections.load(Ordering::Relaxed),
            executed: self.counters.executed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            max_concurrent_leaders: self.counters.max_concurrent_leaders.load(Ordering::Acquire),
        }
    }
}

fn worker_loop(shared: Arc<Shared>, worker: usize) {
    while let Some(task) = shared.lead(worker) {
        let id = task.id();
        tracing::trace!(worker, task = %id, "Executing task");

        // Runs outside leadership, so other workers dequeue meanwhile.
        match task.run() {
            Ok(result) => {
                shared.counters.executed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(worker, task = %id, "Task finished: {result}");
            }
            Err(err) => {
                shared.counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(worker, "{err}");
            }
        }
    }
    tracing::trace!(worker, "Queue closed, worker exiting");
}

/// Fixed-size pool of symmetric workers sharing one FIFO queue.
///
/// Workers take turns as leader: only the leader may dequeue, and it hands
/// leadership to the next follower before executing what it took, so
/// dequeue is serialized while execution runs in parallel. Task failures are
/// logged and never take a worker down.
pub struct LeaderFollowers {
    tx: Mutex<Option<Sender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shared: Arc<Shared>,
    size: usize,
}

impl LeaderFollowers {
    pub fn new(num_threads: usize) -> Result<Self> {
        if num_threads == 0 {
            return Err(Error::InvalidPoolSize(num_threads));
        }

        let (tx, rx) = unbounded();
        let shared = Arc::new(Shared {
            rx,
            leadership: Mutex::new(()),
            leader_active: AtomicBool::new(false),
            counters: Counters::default(),
            #[cfg(test)]
            dequeued: Mutex::new(Vec::new()),
        });

        let pool = Self {
            tx: Mutex::new(Some(tx)),
            workers: Mutex::new(Vec::with_capacity(num_threads)),
            shared,
            size: num_threads,
        };

        for worker in 0..num_threads {
            let shared = Arc::clone(&pool.shared);
            let handle = thread::Builder::new()
                .name(format!("lf-worker-{worker}"))
                .spawn(move || worker_loop(shared, worker))?;
            lock(&pool.workers).push(handle);
        }
        tracing::info!(threads = num_threads, "Leader/followers pool started");

        Ok(pool)
    }

    /// Queue a task without blocking. Rejected once the pool is stopped.
    pub fn add_task(&self, task: Task) -> Result<()> {
        let tx = lock(&self.tx);
        let tx = tx.as_ref().ok_or_else(|| Error::Stopped(POOL_NAME.into()))?;

        let id = task.id();
        tx.send(task).map_err(|_| Error::Stopped(POOL_NAME.into()))?;
        tracing::trace!(task = %id, "Task queued");
        Ok(())
    }

    /// Close the queue, let the workers drain it and join them. Safe to call
    /// repeatedly.
    pub fn stop(&self) {
        let Some(tx) = lock(&self.tx).take() else {
            tracing::trace!("Pool already stopped");
            return;
        };
        drop(tx);

        let workers = mem::take(&mut *lock(&self.workers));
        let current = thread::current().id();
        for worker in workers {
            if worker.thread().id() == current {
                tracing::warn!("Stop requested from a pool worker, not joining it");
                continue;
            }
            if worker.join().is_err() {
                tracing::error!("Pool worker panicked");
            }
        }
        tracing::info!(stats = ?self.stats(), "Leader/followers pool stopped");
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of queued tasks not yet taken by a leader.
    pub fn pending(&self) -> usize {
        self.shared.rx.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.shared.stats()
    }
}

impl Drop for LeaderFollowers {
    fn drop(&mut self) {
        self.stop();
    }
}
