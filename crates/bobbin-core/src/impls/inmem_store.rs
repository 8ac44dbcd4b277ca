//! InMemoryExecutionStore - テスト用・組み込み用の store
//!
//! # 実装詳細
//! - snapshot は `serde_json::Value` として保持する（どの input 型の execution も同じ store に置ける）
//! - `RwLock` で排他制御、lock 中に await しない

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::domain::{ExecutionId, ExecutionState, TaskException, TaskInput, WorkerId};
use crate::ports::{ExecutionStore, StoreError};

#[derive(Default)]
struct StoredExecution {
    shards: HashMap<WorkerId, serde_json::Value>,
    exceptions: Vec<TaskException>,
}

/// Store keeping everything in process memory.
///
/// Cloning shares the underlying map, so a clone handed to an executor and the one
/// kept by the caller observe the same executions.
#[derive(Clone, Default)]
pub struct InMemoryExecutionStore {
    executions: Arc<RwLock<HashMap<ExecutionId, StoredExecution>>>,
}

impl InMemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_error(e: impl std::fmt::Display) -> StoreError {
        StoreError::Backend(format!("lock poisoned: {e}"))
    }
}

#[async_trait]
impl<I: TaskInput> ExecutionStore<I> for InMemoryExecutionStore {
    async fn store_worker_state(
        &self,
        execution_id: ExecutionId,
        worker_id: WorkerId,
        state: &ExecutionState<I>,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(state)?;
        let mut executions = self.executions.write().map_err(Self::lock_error)?;
        executions
            .entry(execution_id)
            .or_default()
            .shards
            .insert(worker_id, value);
        Ok(())
    }

    async fn load_worker_state(
        &self,
        execution_id: ExecutionId,
        worker_id: WorkerId,
    ) -> Result<ExecutionState<I>, StoreError> {
        let value = {
            let executions = self.executions.read().map_err(Self::lock_error)?;
            executions
                .get(&execution_id)
                .and_then(|execution| execution.shards.get(&worker_id))
                .cloned()
                .ok_or(StoreError::NotFound {
                    execution_id,
                    worker_id: Some(worker_id),
                })?
        };
        Ok(serde_json::from_value(value)?)
    }

    async fn list_worker_ids(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<WorkerId>, StoreError> {
        let executions = self.executions.read().map_err(Self::lock_error)?;
        let execution = executions.get(&execution_id).ok_or(StoreError::NotFound {
            execution_id,
            worker_id: None,
        })?;
        Ok(execution.shards.keys().copied().collect())
    }

    async fn store_task_exception(
        &self,
        execution_id: ExecutionId,
        exception: &TaskException,
    ) -> Result<(), StoreError> {
        let mut executions = self.executions.write().map_err(Self::lock_error)?;
        executions
            .entry(execution_id)
            .or_default()
            .exceptions
            .push(exception.clone());
        Ok(())
    }

    async fn load_task_exceptions(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<TaskException>, StoreError> {
        let executions = self.executions.read().map_err(Self::lock_error)?;
        Ok(executions
            .get(&execution_id)
            .map(|execution| execution.exceptions.clone())
            .unwrap_or_default())
    }
}
