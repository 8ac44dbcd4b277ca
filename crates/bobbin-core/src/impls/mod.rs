//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **FileSystemExecutionStore**: ローカルディレクトリへの永続化
//! - **InMemoryExecutionStore**: テスト・組み込み用
//! - **LocalMultiThreadExecutor**: tokio multi-thread runtime 上の engine

pub mod fs_store;
pub mod inmem_store;
pub mod local_executor;

// 主要な型を再エクスポート
pub use self::fs_store::FileSystemExecutionStore;
pub use self::inmem_store::InMemoryExecutionStore;
pub use self::local_executor::LocalMultiThreadExecutor;
