use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Task execution failed: {0}")]
    TaskExecutionFailed(String),

    /// The task rejected the input it was given; the session stays where it was.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Context error: {0}")]
    ContextError(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),
}
