//! ExecutionStore port - shard snapshot と exception log の永続化
//!
//! # 実装
//! - **FileSystemExecutionStore**: ローカルディレクトリ（本番用）
//! - **InMemoryExecutionStore**: テスト用

use async_trait::async_trait;

use crate::domain::{
    ExecutionId, ExecutionState, MismatchedExecutionError, TaskException, TaskInput, WorkerId,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no state stored for execution {execution_id}{}", worker_suffix(.worker_id))]
    NotFound {
        execution_id: ExecutionId,
        worker_id: Option<WorkerId>,
    },

    #[error(transparent)]
    MismatchedExecution(#[from] MismatchedExecutionError),

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store backend failed: {0}")]
    Backend(String),
}

fn worker_suffix(worker_id: &Option<WorkerId>) -> String {
    worker_id
        .map(|id| format!(" worker {id}"))
        .unwrap_or_default()
}

/// Persistence of per-shard snapshots and the exception log of an execution.
///
/// # 並行性の契約
/// - `store_worker_state` は (execution, worker) ごとに atomic に上書きする
///   （reader が途中まで書かれた snapshot を見ることはない）
/// - `store_task_exception` は並行 append を直列化する（record が混ざらない）
/// - 呼び出し側（worker）は shard ごとに一人なので、同じ key への並行書き込みは起きない
#[async_trait]
pub trait ExecutionStore<I: TaskInput>: Send + Sync {
    /// Overwrite the latest snapshot of one shard.
    async fn store_worker_state(
        &self,
        execution_id: ExecutionId,
        worker_id: WorkerId,
        state: &ExecutionState<I>,
    ) -> Result<(), StoreError>;

    /// Latest snapshot of one shard, or `StoreError::NotFound`.
    async fn load_worker_state(
        &self,
        execution_id: ExecutionId,
        worker_id: WorkerId,
    ) -> Result<ExecutionState<I>, StoreError>;

    /// Every worker id stored for the execution, in no particular order.
    async fn list_worker_ids(&self, execution_id: ExecutionId)
    -> Result<Vec<WorkerId>, StoreError>;

    /// All shards of an execution folded together with `join`.
    ///
    /// Shard enumeration order is unspecified; shards are disjoint so only the order
    /// inside the merged sequences depends on it.
    async fn load_whole_state(
        &self,
        execution_id: ExecutionId,
    ) -> Result<ExecutionState<I>, StoreError> {
        let mut merged = ExecutionState::empty(execution_id);
        for worker_id in self.list_worker_ids(execution_id).await? {
            let shard = self.load_worker_state(execution_id, worker_id).await?;
            merged = merged.join(shard)?;
        }
        Ok(merged)
    }

    /// Append one record to the execution's exception log.
    async fn store_task_exception(
        &self,
        execution_id: ExecutionId,
        exception: &TaskException,
    ) -> Result<(), StoreError>;

    /// Exception log in append order; empty when nothing was recorded.
    async fn load_task_exceptions(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<TaskException>, StoreError>;
}
