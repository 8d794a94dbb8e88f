use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("task queue is at capacity ({0})")]
    Backpressure(usize),

    #[error("task exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("coordinator is shutting down")]
    ShuttingDown,
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
