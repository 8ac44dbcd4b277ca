//! bobbin-core
//!
//! Resumable, fault-isolating local batch runner.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, state, exception, errors）
//! - **ports**: 抽象化レイヤー（ExecutionStore, Executor, TaskFunction, Clock, IdGenerator）
//! - **worker**: 1 shard を完了 / give-up まで実行する worker
//! - **impls**: 実装（FileSystemExecutionStore, InMemoryExecutionStore, LocalMultiThreadExecutor）
//! - **app**: facade（Bobbin）と設定

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod worker;

pub use app::{Bobbin, ExecutorConfig};
pub use domain::{
    BobbinError, ExecutionId, ExecutionState, TaskException, TaskFailure, TaskInput, WorkerId,
};
pub use ports::{ExecutionStore, Executor, StoreError, TaskFunction, blocking_fn, task_fn};
pub use worker::{WorkerOutcome, WorkerStatus};
