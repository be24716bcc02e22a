use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{Error, Result};

pub type TaskId = Uuid;

type Body = Box<dyn FnOnce() -> anyhow::Result<String> + Send + 'static>;

/// A deferred, zero-argument unit of work producing a string.
///
/// A task is consumed when it runs. Failures, whether returned as `Err` or raised
/// as a panic, are caught by [`Task::run`] so the executing worker survives them.
pub struct Task {
    id: TaskId,
    body: Body,
    reply: Option<oneshot::Sender<String>>,
}

impl Task {
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<String> + Send + 'static,
    {
        Self {
            id: TaskId::new_v4(),
            body: Box::new(body),
            reply: None,
        }
    }

    /// A task that returns an already computed value.
    pub fn relay(value: String) -> Self {
        Self::new(move || {
            tracing::trace!("Relaying value to next stage");
            Ok(value)
        })
    }

    pub(crate) fn with_reply(mut self, reply: Option<oneshot::Sender<String>>) -> Self {
        self.reply = reply;
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Execute the task body inside a failure boundary.
    pub fn run(self) -> Result<String> {
        self.execute().0
    }

    /// Like [`Task::run`] but hands back the completion reply, if any, so the
    /// caller can forward or fulfil it.
    pub(crate) fn execute(self) -> (Result<String>, Option<oneshot::Sender<String>>) {
        let Task { id, body, reply } = self;
        let result = match catch_unwind(AssertUnwindSafe(body)) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(Error::TaskFailed {
                id,
                reason: format!("{err:#}"),
            }),
            Err(panic_info) => Err(Error::TaskPanicked {
                id,
                reason: panic_message(panic_info),
            }),
        };
        (result, reply)
    }
}

impl Debug for Task {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("has_reply", &self.reply.is_some())
            .finish()
    }
}

fn panic_message(panic_info: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_returns_value() {
        let task = Task::new(|| Ok("done".to_string()));
        assert_eq!(task.run().unwrap(), "done");
    }

    #[test]
    fn test_relay_returns_value_unchanged() {
        let task = Task::relay("A".into());
        assert_eq!(task.run().unwrap(), "A");
    }

    #[test]
    fn test_failure_is_contained() {
        let task = Task::new(|| Err(anyhow::anyhow!("bad input")));
        let id = task.id();
        match task.run() {
            Err(Error::TaskFailed { id: failed, reason }) => {
                assert_eq!(failed, id);
                assert_eq!(reason, "bad input");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_panic_is_contained() {
        let task = Task::new(|| panic!("boom"));
        match task.run() {
            Err(Error::TaskPanicked { reason, .. }) => assert_eq!(reason, "boom"),
            other => panic!("unexpected result: {other:?}"),
        }

        let index = 3;
        let task = Task::new(move || panic!("task {index} exploded"));
        match task.run() {
            Err(Error::TaskPanicked { reason, .. }) => assert_eq!(reason, "task 3 exploded"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Task::relay(String::new());
        let b = Task::relay(String::new());
        assert_ne!(a.id(), b.id());
    }
}
