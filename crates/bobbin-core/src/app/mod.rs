//! App - アプリケーション層
//!
//! ports を組み合わせて facade を提供します。
//!
//! # 主要コンポーネント
//! - **Bobbin**: start from scratch / resume / state と exception の参照
//! - **ExecutorConfig**: worker 数、失敗予算、checkpoint 間隔

pub mod bobbin;
pub mod config;

pub use self::bobbin::Bobbin;
pub use self::config::ExecutorConfig;
