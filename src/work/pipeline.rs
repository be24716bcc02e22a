use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::work::active::ActiveObject;
use crate::work::task::Task;

/// Completion handle for a value sent through [`Pipeline::execute`].
///
/// Resolves with the value once the last stage has run its relay. Call
/// [`PipelineHandle::wait`] from a plain thread or `.await` it from async code.
#[derive(Debug)]
pub struct PipelineHandle {
    rx: oneshot::Receiver<String>,
}

impl PipelineHandle {
    /// Block the current thread until the value has passed every stage.
    ///
    /// Must not be called from inside an async context.
    pub fn wait(self) -> Result<String> {
        self.rx.blocking_recv().map_err(|_| Error::ResultDropped)
    }
}

impl Future for PipelineHandle {
    type Output = Result<String>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| Error::ResultDropped))
    }
}

/// A linear chain of [`ActiveObject`] stages, one per registered task.
///
/// Stage `i` relays each result to stage `i + 1`. Stages run concurrently once
/// started, so only the wiring order is fixed, not completion order.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<ActiveObject>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage with `task` already queued on it. The task runs once the
    /// pipeline is started.
    pub fn add_task(&mut self, task: Task) -> Result<()> {
        let stage = ActiveObject::new(format!("stage-{}", self.stages.len()));
        stage.enqueue(task)?;

        if let Some(previous) = self.stages.last() {
            previous.set_next_stage(&stage)?;
        }

        self.stages.push(stage);
        tracing::debug!(stages = self.stages.len(), "Stage added to pipeline");
        Ok(())
    }

    pub fn start(&self) -> Result<()> {
        tracing::debug!(stages = self.stages.len(), "Starting pipeline");
        for stage in &self.stages {
            stage.start()?;
        }
        Ok(())
    }

    /// Thread `value` through the whole chain, starting at the first stage.
    pub fn execute(&self, value: impl Into<String>) -> Result<PipelineHandle> {
        let first = self.stages.first().ok_or(Error::EmptyPipeline)?;

        let (tx, rx) = oneshot::channel();
        first.enqueue(Task::relay(value.into()).with_reply(Some(tx)))?;
        Ok(PipelineHandle { rx })
    }

    /// Stop every stage in registration order. Each stage drains before the next
    /// one is stopped, so relays in flight still reach their destination.
    pub fn stop(&self) {
        tracing::debug!(stages = self.stages.len(), "Stopping pipeline");
        for stage in &self.stages {
            stage.stop();
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
    }
}
