//! Task execution substrate.
//!
//! Two interchangeable ways to run [`Task`]s off the caller's thread:
//!
//! - [`ActiveObject`]s, one dedicated worker each, chained into a [`Pipeline`]
//!   that relays every stage's result to the next stage.
//! - [`LeaderFollowers`], a fixed pool of workers that take turns dequeuing
//!   from one shared queue and execute in parallel.
//!
//! Queues are unbounded and FIFO. `stop` drains what was queued before it and
//! joins the workers; submissions after `stop` are rejected.

pub mod active;
pub mod pipeline;
pub mod task;
pub mod worker;

pub use active::ActiveObject;
pub use pipeline::{Pipeline, PipelineHandle};
pub use task::{Task, TaskId};
pub use worker::{LeaderFollowers, PoolStats};

#[cfg(test)]
pub(crate) mod tests {
    use crossbeam::channel::{Receiver, Sender};

    use crate::work::task::Task;

    /// A task that reports its index on `tx` when it runs.
    pub(crate) fn tagged(index: usize, tx: &Sender<usize>) -> Task {
        let tx = tx.clone();
        Task::new(move || {
            tx.send(index)?;
            Ok(index.to_string())
        })
    }

    pub(crate) fn collect_sorted(rx: &Receiver<usize>) -> Vec<usize> {
        let mut seen = rx.try_iter().collect::<Vec<_>>();
        seen.sort_unstable();
        seen
    }
}
