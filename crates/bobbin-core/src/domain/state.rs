//! Execution state: which inputs of an execution are finished and which are still pending.
//!
//! The same type describes a whole execution and a single shard of it. A shard is owned
//! by exactly one worker, which mutates it in place; the store folds all shards of an
//! execution back together with [`ExecutionState::join`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::errors::MismatchedExecutionError;
use super::ids::ExecutionId;

/// Snapshot of an execution (or one shard of it).
///
/// State transitions of an input inside one shard:
/// - unfinished (front) -> finished                 on success
/// - unfinished (front) -> unfinished (back)        on failure
///
/// Within a shard an input is always in exactly one of the two sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "I: Serialize", deserialize = "I: Deserialize<'de>"))]
pub struct ExecutionState<I> {
    pub execution_id: ExecutionId,

    /// Completion order.
    pub finished_inputs: Vec<I>,

    /// Front is the next input to attempt.
    pub unfinished_inputs: VecDeque<I>,
}

impl<I> ExecutionState<I> {
    pub fn new(
        execution_id: ExecutionId,
        finished_inputs: Vec<I>,
        unfinished_inputs: impl IntoIterator<Item = I>,
    ) -> Self {
        Self {
            execution_id,
            finished_inputs,
            unfinished_inputs: unfinished_inputs.into_iter().collect(),
        }
    }

    /// Identity element for [`join`](Self::join).
    pub fn empty(execution_id: ExecutionId) -> Self {
        Self::new(execution_id, Vec::new(), Vec::new())
    }

    /// All inputs are finished.
    pub fn is_complete(&self) -> bool {
        self.unfinished_inputs.is_empty()
    }

    pub fn total_inputs(&self) -> usize {
        self.finished_inputs.len() + self.unfinished_inputs.len()
    }

    /// Merge two snapshots of the same execution.
    ///
    /// `finished = self.finished ++ other.finished`, `unfinished = self.unfinished ++ other.unfinished`.
    pub fn join(mut self, other: ExecutionState<I>) -> Result<Self, MismatchedExecutionError> {
        if other.execution_id != self.execution_id {
            return Err(MismatchedExecutionError {
                expected: self.execution_id,
                found: other.execution_id,
            });
        }

        self.finished_inputs.extend(other.finished_inputs);
        self.unfinished_inputs.extend(other.unfinished_inputs);
        Ok(self)
    }

    /// Relabel under another execution id (copy-on-resume).
    pub fn with_execution_id(self, execution_id: ExecutionId) -> Self {
        Self {
            execution_id,
            ..self
        }
    }

    /// Split into the finished shard and up to `into_number` unfinished shards.
    ///
    /// Unfinished inputs are cut into contiguous chunks of `ceil(len / into_number)`;
    /// the last chunk may be shorter and empty chunks are never produced.
    /// `into_number == 0` is treated as 1.
    pub fn split_unfinished(self, into_number: usize) -> (Self, Vec<Self>) {
        let execution_id = self.execution_id;
        let finished = Self::new(execution_id, self.finished_inputs, Vec::new());
        let unfinished = split_into_chunks(self.unfinished_inputs, into_number)
            .into_iter()
            .map(|chunk| Self::new(execution_id, Vec::new(), chunk))
            .collect();

        (finished, unfinished)
    }
}

fn split_into_chunks<I>(inputs: VecDeque<I>, number_of_chunks: usize) -> Vec<Vec<I>> {
    let len = inputs.len();
    if len == 0 {
        return Vec::new();
    }

    let chunk_size = len.div_ceil(number_of_chunks.max(1));
    let mut chunks = Vec::with_capacity(len.div_ceil(chunk_size));
    let mut current = Vec::with_capacity(chunk_size);
    for input in inputs {
        current.push(input);
        if current.len() == chunk_size {
            chunks.push(std::mem::replace(&mut current, Vec::with_capacity(chunk_size)));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
