//! Exception record: one captured failure of the work function.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::TaskFailure;
use super::ids::WorkerId;

/// Entry of an execution's append-only exception log.
///
/// The failing input is kept as JSON so the log can be read without knowing the
/// input type of the execution that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskException {
    pub worker_id: WorkerId,
    pub input: serde_json::Value,
    pub message: String,

    /// Shard failure counter including this failure.
    pub failures_so_far: u32,

    pub occurred_at: DateTime<Utc>,
}

impl TaskException {
    pub fn new(
        worker_id: WorkerId,
        input: serde_json::Value,
        failure: &TaskFailure,
        failures_so_far: u32,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            worker_id,
            input,
            message: failure.message.clone(),
            failures_so_far,
            occurred_at,
        }
    }
}
