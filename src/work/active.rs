use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{unbounded, Receiver, Sender};
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::work::task::Task;

enum Lifecycle {
    /// Tasks may be queued but no worker exists yet.
    Created { tx: Sender<Task>, rx: Receiver<Task> },
    Running { tx: Sender<Task>, worker: JoinHandle<()> },
    Stopped,
}

struct Shared {
    name: String,
    lifecycle: Mutex<Lifecycle>,
    successor: OnceLock<Weak<Shared>>,
}

impl Shared {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, task: Task) -> Result<()> {
        let lifecycle = self.lifecycle();
        let tx = match &*lifecycle {
            Lifecycle::Created { tx, .. } | Lifecycle::Running { tx, .. } => tx,
            Lifecycle::Stopped => return Err(Error::Stopped(self.name.clone())),
        };

        let id = task.id();
        tx.send(task)
            .map_err(|_| Error::Stopped(self.name.clone()))?;
        tracing::trace!(stage = %self.name, task = %id, "Task enqueued");
        Ok(())
    }

    /// Hand a computed value to the successor as a relay task, or fulfil the
    /// pending reply when this is the last stage.
    fn forward(&self, value: String, reply: Option<oneshot::Sender<String>>) {
        let Some(next) = self.successor.get() else {
            if let Some(reply) = reply {
                if reply.send(value).is_err() {
                    tracing::debug!(stage = %self.name, "Result receiver went away");
                }
            }
            return;
        };

        match next.upgrade() {
            Some(next) => {
                tracing::trace!(stage = %self.name, next = %next.name, "Passing result to next stage");
                if let Err(err) = next.enqueue(Task::relay(value).with_reply(reply)) {
                    tracing::warn!(stage = %self.name, "Relay rejected: {err}");
                }
            }
            None => tracing::warn!(stage = %self.name, "Successor dropped, discarding relay"),
        }
    }
}

fn worker_loop(shared: Arc<Shared>, rx: Receiver<Task>) {
    // `recv` keeps yielding buffered tasks after the sender is dropped, which is
    // what lets `stop` drain the queue before the worker exits.
    while let Ok(task) = rx.recv() {
        let id = task.id();
        tracing::trace!(stage = %shared.name, task = %id, "Task dequeued");

        let (result, reply) = task.execute();
        match result {
            Ok(value) => {
                tracing::debug!(stage = %shared.name, task = %id, bytes = value.len(), "Task executed");
                shared.forward(value, reply);
            }
            Err(err) => tracing::error!(stage = %shared.name, "{err}"),
        }
    }
    tracing::trace!(stage = %shared.name, "Queue closed, worker exiting");
}

/// A single dedicated worker thread executing its private queue in FIFO order.
///
/// Each executed task's result is relayed to the successor, if one is set, as a
/// new [`Task::relay`] on the successor's queue.
pub struct ActiveObject {
    shared: Arc<Shared>,
}

impl ActiveObject {
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, rx) = unbounded();
        let name = name.into();
        tracing::trace!(stage = %name, "Created");
        Self {
            shared: Arc::new(Shared {
                name,
                lifecycle: Mutex::new(Lifecycle::Created { tx, rx }),
                successor: OnceLock::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Spawn the worker. Calling this while already running is a no-op; calling
    /// it after [`ActiveObject::stop`] starts a new worker on an empty queue.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.shared.lifecycle();
        let (tx, rx) = match mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            running @ Lifecycle::Running { .. } => {
                *lifecycle = running;
                tracing::debug!(stage = %self.shared.name, "Already running");
                return Ok(());
            }
            Lifecycle::Created { tx, rx } => (tx, rx),
            Lifecycle::Stopped => unbounded(),
        };

        let shared = Arc::clone(&self.shared);
        let worker_rx = rx.clone();
        let spawned = thread::Builder::new()
            .name(self.shared.name.clone())
            .spawn(move || worker_loop(shared, worker_rx));

        match spawned {
            Ok(worker) => {
                *lifecycle = Lifecycle::Running { tx, worker };
                tracing::debug!(stage = %self.shared.name, "Worker started");
                Ok(())
            }
            Err(err) => {
                *lifecycle = Lifecycle::Created { tx, rx };
                Err(err.into())
            }
        }
    }

    /// Stop accepting tasks, let the worker drain what is already queued and
    /// block until it has exited. Safe to call repeatedly.
    pub fn stop(&self) {
        let previous = mem::replace(&mut *self.shared.lifecycle(), Lifecycle::Stopped);

        match previous {
            Lifecycle::Running { tx, worker } => {
                drop(tx);
                if worker.thread().id() == thread::current().id() {
                    tracing::warn!(stage = %self.shared.name, "Stop requested from own worker, not joining");
                    return;
                }
                match worker.join() {
                    Ok(()) => tracing::debug!(stage = %self.shared.name, "Worker stopped"),
                    Err(_) => tracing::error!(stage = %self.shared.name, "Worker thread panicked"),
                }
            }
            Lifecycle::Created { rx, .. } => {
                if !rx.is_empty() {
                    tracing::warn!(
                        stage = %self.shared.name,
                        discarded = rx.len(),
                        "Stopped before start, discarding queued tasks"
                    );
                }
            }
            Lifecycle::Stopped => tracing::trace!(stage = %self.shared.name, "Already stopped"),
        }
    }

    /// Queue a task without blocking. Rejected once the object is stopped.
    pub fn enqueue(&self, task: Task) -> Result<()> {
        self.shared.enqueue(task)
    }

    /// Link the stage that receives this stage's results. Can only be set once.
    pub fn set_next_stage(&self, next: &ActiveObject) -> Result<()> {
        if Arc::ptr_eq(&self.shared, &next.shared) {
            return Err(Error::InvalidArgument("a stage cannot be its own successor"));
        }
        self.shared
            .successor
            .set(Arc::downgrade(&next.shared))
            .map_err(|_| Error::SuccessorAlreadySet(self.shared.name.clone()))
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.shared.lifecycle(), Lifecycle::Running { .. })
    }

    /// Number of tasks waiting in the queue.
    pub fn pending(&self) -> usize {
        match &*self.shared.lifecycle() {
            Lifecycle::Created { rx, .. } => rx.len(),
            Lifecycle::Running { tx, .. } => tx.len(),
            Lifecycle::Stopped => 0,
        }
    }
}

impl Drop for ActiveObject {
    fn drop(&mut self) {
        self.stop();
    }
}
