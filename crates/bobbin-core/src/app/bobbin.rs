//! Bobbin - start / resume / query の facade
//!
//! # 使用例
//! ```ignore
//! let bobbin = Bobbin::local_multithread("./state", ExecutorConfig::new(4));
//! let id = bobbin.start_from_scratch(1..=100u64, blocking_fn(|n| compute(n))).await?;
//! let state = bobbin.get_state(id).await?;
//! if !state.is_complete() {
//!     let id = bobbin.start_from_past_execution(id, blocking_fn(|n| compute(n))).await?;
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use super::ExecutorConfig;
use crate::domain::{BobbinError, ExecutionId, ExecutionState, TaskException, TaskInput};
use crate::impls::{FileSystemExecutionStore, LocalMultiThreadExecutor};
use crate::ports::{ExecutionStore, Executor, IdGenerator, SystemClock, TaskFunction, UlidGenerator};

/// Entry point of the runner.
///
/// Every start creates a new execution id; past executions are only ever read.
pub struct Bobbin<I: TaskInput> {
    executor: Arc<dyn Executor<I>>,
    store: Arc<dyn ExecutionStore<I>>,
    id_generator: Arc<dyn IdGenerator>,
}

impl<I: TaskInput> Bobbin<I> {
    pub fn new(
        executor: Arc<dyn Executor<I>>,
        store: Arc<dyn ExecutionStore<I>>,
        id_generator: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            executor,
            store,
            id_generator,
        }
    }

    /// Threads on this machine, state under `store_dir`.
    pub fn local_multithread(store_dir: impl Into<PathBuf>, config: ExecutorConfig) -> Self {
        Self::new(
            Arc::new(LocalMultiThreadExecutor::new(config)),
            Arc::new(FileSystemExecutionStore::new(store_dir)),
            Arc::new(UlidGenerator::new(SystemClock)),
        )
    }

    /// Run `function` over `inputs` in a new execution and wait for every worker.
    ///
    /// Returns the new execution id even when some inputs are left unfinished.
    pub async fn start_from_scratch(
        &self,
        inputs: impl IntoIterator<Item = I>,
        function: Arc<dyn TaskFunction<I>>,
    ) -> Result<ExecutionId, BobbinError> {
        let execution_id = self.id_generator.generate_execution_id();
        let state = ExecutionState::new(execution_id, Vec::new(), inputs);
        info!(
            %execution_id,
            inputs = state.unfinished_inputs.len(),
            "starting execution from scratch"
        );

        self.executor
            .execute(state, Arc::clone(&self.store), function)
            .await?;
        Ok(execution_id)
    }

    /// Continue a past execution under a new id.
    ///
    /// The merged state of `past_execution_id` is copied; its shards and exception log
    /// stay as they are, and the new execution starts with an empty exception log.
    /// Inputs finished in the past execution are not run again.
    pub async fn start_from_past_execution(
        &self,
        past_execution_id: ExecutionId,
        function: Arc<dyn TaskFunction<I>>,
    ) -> Result<ExecutionId, BobbinError> {
        let state_so_far = self.store.load_whole_state(past_execution_id).await?;

        let execution_id = self.id_generator.generate_execution_id();
        info!(
            %execution_id,
            %past_execution_id,
            finished = state_so_far.finished_inputs.len(),
            unfinished = state_so_far.unfinished_inputs.len(),
            "resuming from past execution"
        );

        self.executor
            .execute(
                state_so_far.with_execution_id(execution_id),
                Arc::clone(&self.store),
                function,
            )
            .await?;
        Ok(execution_id)
    }

    /// Merged state of all shards of an execution.
    pub async fn get_state(
        &self,
        execution_id: ExecutionId,
    ) -> Result<ExecutionState<I>, BobbinError> {
        Ok(self.store.load_whole_state(execution_id).await?)
    }

    /// Recorded failures of an execution, oldest first.
    pub async fn get_exceptions(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<TaskException>, BobbinError> {
        Ok(self.store.load_task_exceptions(execution_id).await?)
    }
}
