use thiserror::Error;

use crate::work::task::TaskId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("`{0}` is stopped and no longer accepts tasks")]
    Stopped(String),

    #[error("Pipeline has no stages to execute")]
    EmptyPipeline,

    #[error("Stage `{0}` already has a successor")]
    SuccessorAlreadySet(String),

    #[error("Invalid pool size: {0}")]
    InvalidPoolSize(usize),

    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("Task {id} failed: {reason}")]
    TaskFailed { id: TaskId, reason: String },

    #[error("Task {id} panicked: {reason}")]
    TaskPanicked { id: TaskId, reason: String },

    #[error("Result channel closed before a value was produced")]
    ResultDropped,

    #[error("Invalid vertex {vertex}: graph has {count} vertices")]
    InvalidVertex { vertex: usize, count: usize },

    #[error("Unknown algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("Serde JSON error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = Error::Stopped("stage-0".into());
        assert_eq!(
            error.to_string(),
            "`stage-0` is stopped and no longer accepts tasks"
        );

        let error = Error::InvalidPoolSize(0);
        assert_eq!(error.to_string(), "Invalid pool size: 0");

        let error = Error::InvalidVertex { vertex: 7, count: 3 };
        assert_eq!(error.to_string(), "Invalid vertex 7: graph has 3 vertices");

        let error = Error::UnknownAlgorithm("dijkstra".into());
        assert_eq!(error.to_string(), "Unknown algorithm 'dijkstra'");

        let error = Error::IO(std::io::Error::new(std::io::ErrorKind::Other, "test"));
        assert_eq!(error.to_string(), "IO error: test");
    }
}
