//! Errors - エラー型と分類
//!
//! - `TaskFailure`: work function の失敗。Worker 内で回復する（再キュー）
//! - `MismatchedExecutionError`: 異なる execution の state を join しようとした
//! - `BobbinError`: engine / facade から呼び出し側に返るエラー
//!
//! Store のエラーは `ports::execution_store::StoreError` に定義しています。

use thiserror::Error;

use super::ids::{ExecutionId, WorkerId};
use crate::ports::StoreError;

/// Failure cause reported by a work function for one input.
///
/// The only failure signal a work function has; the worker requeues the input and
/// charges the shard's failure budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TaskFailure {
    pub message: String,
}

impl TaskFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Capture any displayable error as a failure cause.
    pub fn from_error(err: impl std::fmt::Display) -> Self {
        Self::new(err.to_string())
    }
}

impl From<String> for TaskFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for TaskFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to join execution states with different ids: {expected} and {found}")]
pub struct MismatchedExecutionError {
    pub expected: ExecutionId,
    pub found: ExecutionId,
}

#[derive(Debug, Error)]
pub enum BobbinError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    MismatchedExecution(#[from] MismatchedExecutionError),

    #[error("worker {worker_id} of execution {execution_id} panicked: {message}")]
    WorkerPanicked {
        execution_id: ExecutionId,
        worker_id: WorkerId,
        message: String,
    },
}
