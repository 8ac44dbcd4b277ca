//! Worker runner: drives one shard until it is done or its failure budget is spent.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::app::ExecutorConfig;
use crate::domain::{ExecutionId, ExecutionState, TaskException, TaskFailure, TaskInput, WorkerId};
use crate::ports::{Clock, ExecutionStore, StoreError, TaskFunction};

/// Worker life cycle.
///
/// State transitions:
/// - Running -> Done      (no unfinished inputs left)
/// - Running -> GivingUp  (failure budget exhausted, unfinished inputs persisted as-is)
///
/// Both terminal states persist the same snapshot shape; a stored shard only tells
/// them apart by whether `unfinished_inputs` is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerStatus {
    Running,
    Done,
    GivingUp,
}

impl WorkerStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerStatus::Done | WorkerStatus::GivingUp)
    }
}

/// Summary of a worker that reached a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutcome {
    pub worker_id: WorkerId,
    pub status: WorkerStatus,
    pub finished: usize,
    pub unfinished: usize,
    pub failures: u32,
}

/// Exclusive owner of one shard.
///
/// The shard is a plain value moved into the runner; no other task can see it, so
/// it is mutated without locking. The store is the only shared resource.
pub struct WorkerRunner<I: TaskInput> {
    worker_id: WorkerId,
    state: ExecutionState<I>,
    store: Arc<dyn ExecutionStore<I>>,
    function: Arc<dyn TaskFunction<I>>,
    config: ExecutorConfig,
    clock: Arc<dyn Clock>,
    failures_so_far: u32,
    status: WorkerStatus,
}

impl<I: TaskInput> WorkerRunner<I> {
    pub fn new(
        worker_id: WorkerId,
        state: ExecutionState<I>,
        store: Arc<dyn ExecutionStore<I>>,
        function: Arc<dyn TaskFunction<I>>,
        config: ExecutorConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            worker_id,
            state,
            store,
            function,
            config,
            clock,
            failures_so_far: 0,
            status: WorkerStatus::Running,
        }
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    fn execution_id(&self) -> ExecutionId {
        self.state.execution_id
    }

    /// Run the shard to a terminal state.
    ///
    /// Task failures never escape: the input goes to the back of the queue and the
    /// shard's failure counter grows. Store errors abort the worker; whatever was
    /// flushed last stays the durable record of the shard.
    pub async fn run(mut self) -> Result<WorkerOutcome, StoreError> {
        info!(
            execution_id = %self.execution_id(),
            worker_id = %self.worker_id,
            to_perform = self.state.unfinished_inputs.len(),
            finished = self.state.finished_inputs.len(),
            "starting worker"
        );

        let flush_interval = self.config.flush_interval();

        while !self.state.unfinished_inputs.is_empty() {
            if self.failures_so_far >= self.config.max_worker_retries {
                error!(
                    execution_id = %self.execution_id(),
                    worker_id = %self.worker_id,
                    failures = self.failures_so_far,
                    remaining = self.state.unfinished_inputs.len(),
                    "worker exhausted its failure budget, giving up"
                );
                self.checkpoint().await?;
                self.status = WorkerStatus::GivingUp;
                return Ok(self.outcome());
            }

            let Some(input) = self.state.unfinished_inputs.pop_front() else {
                break;
            };

            match self.function.call(&input).await {
                Ok(()) => {
                    self.state.finished_inputs.push(input);
                    if self.state.finished_inputs.len() % flush_interval == 0
                        || self.state.unfinished_inputs.is_empty()
                    {
                        self.checkpoint().await?;
                    }
                }
                Err(failure) => {
                    self.failures_so_far += 1;
                    warn!(
                        execution_id = %self.execution_id(),
                        worker_id = %self.worker_id,
                        failures = self.failures_so_far,
                        error = %failure,
                        "task failed, requeueing input"
                    );
                    if self.config.store_exceptions {
                        self.record_exception(&input, &failure).await?;
                    }
                    // Other pending inputs get their turn before this one is retried.
                    self.state.unfinished_inputs.push_back(input);
                }
            }
        }

        self.status = WorkerStatus::Done;
        info!(
            execution_id = %self.execution_id(),
            worker_id = %self.worker_id,
            finished = self.state.finished_inputs.len(),
            failures = self.failures_so_far,
            "worker finished"
        );
        Ok(self.outcome())
    }

    async fn checkpoint(&self) -> Result<(), StoreError> {
        debug!(
            execution_id = %self.execution_id(),
            worker_id = %self.worker_id,
            finished = self.state.finished_inputs.len(),
            unfinished = self.state.unfinished_inputs.len(),
            "flushing shard snapshot"
        );
        self.store
            .store_worker_state(self.execution_id(), self.worker_id, &self.state)
            .await
    }

    async fn record_exception(&self, input: &I, failure: &TaskFailure) -> Result<(), StoreError> {
        let input = serde_json::to_value(input)?;
        let exception = TaskException::new(
            self.worker_id,
            input,
            failure,
            self.failures_so_far,
            self.clock.now(),
        );
        self.store
            .store_task_exception(self.execution_id(), &exception)
            .await
    }

    fn outcome(&self) -> WorkerOutcome {
        WorkerOutcome {
            worker_id: self.worker_id,
            status: self.status,
            finished: self.state.finished_inputs.len(),
            unfinished: self.state.unfinished_inputs.len(),
            failures: self.failures_so_far,
        }
    }
}
