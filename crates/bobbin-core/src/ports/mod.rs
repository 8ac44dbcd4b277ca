//! Ports - 抽象化レイヤー
//!
//! 各 trait は engine の外側（永続化、ユーザーの work function、時刻、ID 生成）への
//! インターフェースです。shard / partition / retry のロジックは実装の詳細を知りません。

pub mod clock;
pub mod execution_store;
pub mod executor;
pub mod id_generator;
pub mod task_function;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::execution_store::{ExecutionStore, StoreError};
pub use self::executor::Executor;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::task_function::{TaskFunction, blocking_fn, task_fn};
