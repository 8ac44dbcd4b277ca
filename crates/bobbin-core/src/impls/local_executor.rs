//! LocalMultiThreadExecutor - 1 shard = 1 tokio task の engine
//!
//! # フロー
//! 1. state を `number_of_workers` 個の shard に分割
//! 2. finished shard を worker id 0 に保存
//! 3. 各 unfinished shard の初期 snapshot を worker id 1..=k に保存
//! 4. shard ごとに worker task を spawn し、全員の終了を待つ（barrier）

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::app::ExecutorConfig;
use crate::domain::{BobbinError, ExecutionState, TaskInput, WorkerId};
use crate::ports::{Clock, ExecutionStore, Executor, SystemClock, TaskFunction};
use crate::worker::{WorkerOutcome, WorkerRunner, WorkerStatus};

/// Executor running each shard as its own task on the tokio multi-thread runtime.
///
/// Shards are disjoint, so workers share nothing but the store. The executor never
/// retries a shard itself; a shard that gives up leaves the others untouched.
pub struct LocalMultiThreadExecutor {
    config: ExecutorConfig,
    clock: Arc<dyn Clock>,
}

impl LocalMultiThreadExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Clock stamping exception records.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl<I: TaskInput> Executor<I> for LocalMultiThreadExecutor {
    /// Persist every shard, run them all, and wait for the last worker.
    ///
    /// Initial snapshots are written one by one before any worker starts. If one of
    /// those writes fails, nothing runs and the error is returned, but the shards after
    /// it were never stored: the record of this execution is incomplete and must not be
    /// resumed. Retry from the inputs (or from the past execution) instead.
    async fn execute(
        &self,
        state: ExecutionState<I>,
        store: Arc<dyn ExecutionStore<I>>,
        function: Arc<dyn TaskFunction<I>>,
    ) -> Result<(), BobbinError> {
        let execution_id = state.execution_id;
        info!(
            %execution_id,
            completed_so_far = state.finished_inputs.len(),
            to_complete = state.unfinished_inputs.len(),
            workers = self.config.workers(),
            "starting execution"
        );

        let (finished, unfinished) = state.split_unfinished(self.config.workers());

        store
            .store_worker_state(execution_id, WorkerId::FINISHED, &finished)
            .await?;

        let mut runners = Vec::with_capacity(unfinished.len());
        for (worker_id, shard) in WorkerId::live(unfinished.len()).zip(unfinished) {
            store
                .store_worker_state(execution_id, worker_id, &shard)
                .await?;
            runners.push(WorkerRunner::new(
                worker_id,
                shard,
                Arc::clone(&store),
                Arc::clone(&function),
                self.config.clone(),
                Arc::clone(&self.clock),
            ));
        }

        // Every shard is persisted before the first worker starts.
        let mut workers = JoinSet::new();
        let mut worker_of_task = HashMap::new();
        for runner in runners {
            let worker_id = runner.worker_id();
            let handle = workers.spawn(runner.run());
            worker_of_task.insert(handle.id(), worker_id);
        }

        let mut outcomes: Vec<WorkerOutcome> = Vec::new();
        let mut first_error: Option<BobbinError> = None;
        while let Some(joined) = workers.join_next().await {
            let err = match joined {
                Ok(Ok(outcome)) => {
                    outcomes.push(outcome);
                    continue;
                }
                Ok(Err(store_error)) => {
                    error!(%execution_id, error = %store_error, "worker aborted on store error");
                    BobbinError::from(store_error)
                }
                Err(join_error) => {
                    let worker_id = worker_of_task
                        .get(&join_error.id())
                        .copied()
                        .unwrap_or(WorkerId::FINISHED);
                    error!(%execution_id, %worker_id, error = %join_error, "worker task panicked");
                    BobbinError::WorkerPanicked {
                        execution_id,
                        worker_id,
                        message: join_error.to_string(),
                    }
                }
            };
            first_error.get_or_insert(err);
        }

        let given_up: Vec<WorkerId> = outcomes
            .iter()
            .filter(|o| o.status == WorkerStatus::GivingUp)
            .map(|o| o.worker_id)
            .collect();
        if !given_up.is_empty() {
            warn!(%execution_id, workers = ?given_up, "some workers gave up with unfinished inputs");
        }
        info!(
            %execution_id,
            finished = outcomes.iter().map(|o| o.finished).sum::<usize>(),
            unfinished = outcomes.iter().map(|o| o.unfinished).sum::<usize>(),
            "all workers finished"
        );

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
