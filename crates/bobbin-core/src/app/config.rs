//! Executor configuration: worker count, failure budget, checkpoint cadence.

use serde::{Deserialize, Serialize};

/// Settings for `LocalMultiThreadExecutor`.
///
/// `max_worker_retries` is a budget per shard, not per input: one input that keeps
/// failing can use it up and leave the other inputs of its shard unfinished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub number_of_workers: usize,

    /// Failures a worker tolerates before giving up on its shard.
    pub max_worker_retries: u32,

    /// Successful executions between two snapshot flushes.
    pub executions_before_flush: usize,

    /// Append each failure to the execution's exception log.
    pub store_exceptions: bool,
}

impl ExecutorConfig {
    pub const DEFAULT_MAX_WORKER_RETRIES: u32 = 1000;
    pub const DEFAULT_EXECUTIONS_BEFORE_FLUSH: usize = 1000;

    pub fn new(number_of_workers: usize) -> Self {
        Self {
            number_of_workers,
            ..Self::default()
        }
    }

    pub fn with_max_worker_retries(mut self, max_worker_retries: u32) -> Self {
        self.max_worker_retries = max_worker_retries;
        self
    }

    pub fn with_executions_before_flush(mut self, executions_before_flush: usize) -> Self {
        self.executions_before_flush = executions_before_flush;
        self
    }

    pub fn with_store_exceptions(mut self, store_exceptions: bool) -> Self {
        self.store_exceptions = store_exceptions;
        self
    }

    /// Worker count, between 1 and the number of available worker ids.
    pub fn workers(&self) -> usize {
        self.number_of_workers.clamp(1, u32::MAX as usize)
    }

    /// Flush interval, at least 1.
    pub fn flush_interval(&self) -> usize {
        self.executions_before_flush.max(1)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            number_of_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            max_worker_retries: Self::DEFAULT_MAX_WORKER_RETRIES,
            executions_before_flush: Self::DEFAULT_EXECUTIONS_BEFORE_FLUSH,
            store_exceptions: true,
        }
    }
}
