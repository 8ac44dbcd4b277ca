//! Executor port - execution を shard に分けて worker で実行する engine
//!
//! # 実装
//! - **LocalMultiThreadExecutor**: tokio multi-thread runtime 上の worker task

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{BobbinError, ExecutionState, TaskInput};
use crate::ports::{ExecutionStore, TaskFunction};

/// Drives every unfinished input of `state` through `function`.
///
/// Blocks until every worker has reached a terminal state. Progress is only visible
/// through `store`; partial completion (workers that gave up) is not an error.
#[async_trait]
pub trait Executor<I: TaskInput>: Send + Sync {
    async fn execute(
        &self,
        state: ExecutionState<I>,
        store: Arc<dyn ExecutionStore<I>>,
        function: Arc<dyn TaskFunction<I>>,
    ) -> Result<(), BobbinError>;
}
