//! TaskFunction port - 入力ごとに実行される work function
//!
//! # 二種類のアダプタ
//! - `task_fn`: async closure をそのまま await する
//! - `blocking_fn`: 同期 closure を `spawn_blocking` で実行する（CPU bound / blocking I/O 向け）

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{TaskFailure, TaskInput};

/// The user-supplied work function.
///
/// The return value carries no data; `Err` is the only failure signal. The runner may
/// call it again for the same input on a resumed run, so idempotence is up to the caller.
#[async_trait]
pub trait TaskFunction<I: TaskInput>: Send + Sync {
    async fn call(&self, input: &I) -> Result<(), TaskFailure>;
}

#[async_trait]
impl<I: TaskInput, T: TaskFunction<I> + ?Sized> TaskFunction<I> for Arc<T> {
    async fn call(&self, input: &I) -> Result<(), TaskFailure> {
        (**self).call(input).await
    }
}

/// Adapter for `Fn(I) -> impl Future<Output = Result<(), TaskFailure>>`.
pub struct AsyncFn<F, I> {
    f: F,
    _marker: PhantomData<fn(I)>,
}

#[async_trait]
impl<I, F, Fut> TaskFunction<I> for AsyncFn<F, I>
where
    I: TaskInput,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskFailure>> + Send + 'static,
{
    async fn call(&self, input: &I) -> Result<(), TaskFailure> {
        (self.f)(input.clone()).await
    }
}

/// Wrap an async closure as a work function.
///
/// ```ignore
/// let function = task_fn(|n: u64| async move { fetch(n).await.map_err(TaskFailure::from_error) });
/// ```
pub fn task_fn<I, F, Fut>(f: F) -> Arc<dyn TaskFunction<I>>
where
    I: TaskInput,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskFailure>> + Send + 'static,
{
    Arc::new(AsyncFn {
        f,
        _marker: PhantomData,
    })
}

/// Adapter running a synchronous closure on tokio's blocking pool.
pub struct BlockingFn<F, I> {
    f: Arc<F>,
    _marker: PhantomData<fn(I)>,
}

#[async_trait]
impl<I, F> TaskFunction<I> for BlockingFn<F, I>
where
    I: TaskInput,
    F: Fn(I) -> Result<(), TaskFailure> + Send + Sync + 'static,
{
    async fn call(&self, input: &I) -> Result<(), TaskFailure> {
        let f = Arc::clone(&self.f);
        let input = input.clone();
        // A panic in the closure counts as a failure of this input, not of the worker.
        tokio::task::spawn_blocking(move || f(input))
            .await
            .map_err(|e| TaskFailure::new(format!("task panicked: {e}")))?
    }
}

/// Wrap a blocking closure as a work function.
pub fn blocking_fn<I, F>(f: F) -> Arc<dyn TaskFunction<I>>
where
    I: TaskInput,
    F: Fn(I) -> Result<(), TaskFailure> + Send + Sync + 'static,
{
    Arc::new(BlockingFn {
        f: Arc::new(f),
        _marker: PhantomData,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn task_fn_passes_input_and_result() {
        let function = task_fn(|n: u32| async move {
            if n % 2 == 0 {
                Ok(())
            } else {
                Err(TaskFailure::new(format!("odd {n}")))
            }
        });

        assert!(function.call(&2).await.is_ok());
        assert_eq!(function.call(&3).await.unwrap_err().message, "odd 3");
    }

    #[tokio::test]
    async fn blocking_fn_runs_closure() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let function = blocking_fn(move |n: u32| {
            counter.fetch_add(n, Ordering::SeqCst);
            Ok(())
        });

        function.call(&5).await.unwrap();
        function.call(&7).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 12);
    }

    #[tokio::test]
    async fn blocking_fn_turns_panic_into_failure() {
        let function = blocking_fn(|_: u32| -> Result<(), TaskFailure> { panic!("boom") });

        let failure = function.call(&1).await.unwrap_err();
        assert!(failure.message.contains("panicked"));
    }
}
