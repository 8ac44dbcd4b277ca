use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use bobbin_core::{Bobbin, ExecutorConfig, TaskFailure, TaskFunction, blocking_fn};
use rstest::rstest;
use tempfile::tempdir;

/// Records every input it was called with.
#[derive(Clone, Default)]
struct FactorsCalculator {
    inputs_history: Arc<Mutex<Vec<u64>>>,
}

impl FactorsCalculator {
    fn compute_factors(&self, n: u64) -> HashSet<u64> {
        self.inputs_history.lock().unwrap().push(n);
        let mut factors = HashSet::new();
        let mut i = 1;
        while i * i <= n {
            if n % i == 0 {
                factors.insert(i);
                factors.insert(n / i);
            }
            i += 1;
        }
        factors
    }

    fn history(&self) -> Vec<u64> {
        let mut history = self.inputs_history.lock().unwrap().clone();
        history.sort();
        history
    }

    fn function(&self) -> Arc<dyn TaskFunction<u64>> {
        let calculator = self.clone();
        blocking_fn(move |n| {
            calculator.compute_factors(n);
            Ok(())
        })
    }

    /// Fails for `fail_for` (or for everything when `None`).
    fn failing_function(&self, fail_for: Option<Vec<u64>>) -> Arc<dyn TaskFunction<u64>> {
        let calculator = self.clone();
        blocking_fn(move |n| match &fail_for {
            Some(numbers) if !numbers.contains(&n) => {
                calculator.compute_factors(n);
                Ok(())
            }
            _ => Err(TaskFailure::new(format!("Failed to compute factors for {n}"))),
        })
    }
}

fn sorted(mut inputs: Vec<u64>) -> Vec<u64> {
    inputs.sort();
    inputs
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_input() {
    let dir = tempdir().unwrap();
    let calculator = FactorsCalculator::default();
    let bobbin = Bobbin::local_multithread(dir.path(), ExecutorConfig::new(2));

    let execution_id = bobbin
        .start_from_scratch(vec![1u64], calculator.function())
        .await
        .unwrap();

    let state = bobbin.get_state(execution_id).await.unwrap();
    assert_eq!(state.finished_inputs, vec![1]);
    assert!(state.unfinished_inputs.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn multiple_inputs() {
    let dir = tempdir().unwrap();
    let calculator = FactorsCalculator::default();
    let bobbin = Bobbin::local_multithread(dir.path(), ExecutorConfig::new(2));
    let numbers: Vec<u64> = (1..10_000).collect();

    let execution_id = bobbin
        .start_from_scratch(numbers.clone(), calculator.function())
        .await
        .unwrap();

    let state = bobbin.get_state(execution_id).await.unwrap();
    assert_eq!(sorted(state.finished_inputs), numbers);
    assert!(state.unfinished_inputs.is_empty());
}

#[rstest]
#[case::one_worker(1)]
#[case::even_split(3)]
#[case::uneven_split(7)]
#[case::more_workers_than_inputs(64)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_input_finishes_for_any_worker_count(#[case] workers: usize) {
    let dir = tempdir().unwrap();
    let calculator = FactorsCalculator::default();
    let config = ExecutorConfig::new(workers).with_executions_before_flush(5);
    let bobbin = Bobbin::local_multithread(dir.path(), config);
    let numbers: Vec<u64> = (1..=50).collect();

    let execution_id = bobbin
        .start_from_scratch(numbers.clone(), calculator.function())
        .await
        .unwrap();

    let state = bobbin.get_state(execution_id).await.unwrap();
    assert_eq!(sorted(state.finished_inputs), numbers);
    assert!(state.unfinished_inputs.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn work_not_repeated_when_successful() {
    let dir = tempdir().unwrap();
    let calculator = FactorsCalculator::default();
    let bobbin = Bobbin::local_multithread(dir.path(), ExecutorConfig::new(2));
    let numbers: Vec<u64> = (1..100).collect();

    bobbin
        .start_from_scratch(numbers.clone(), calculator.function())
        .await
        .unwrap();

    assert_eq!(calculator.history(), numbers);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resume_when_failed() {
    let dir = tempdir().unwrap();
    let numbers: Vec<u64> = (1..100).collect();
    let fail_for = vec![11, 56];

    let failing = FactorsCalculator::default();
    let successful = FactorsCalculator::default();
    let bobbin = Bobbin::local_multithread(
        dir.path(),
        ExecutorConfig::new(2).with_max_worker_retries(2),
    );

    let execution_id = bobbin
        .start_from_scratch(numbers.clone(), failing.failing_function(Some(fail_for.clone())))
        .await
        .unwrap();

    let state = bobbin.get_state(execution_id).await.unwrap();
    assert_eq!(state.finished_inputs.len(), numbers.len() - fail_for.len());
    assert_eq!(sorted(state.unfinished_inputs.into_iter().collect()), fail_for);

    let new_execution_id = bobbin
        .start_from_past_execution(execution_id, successful.function())
        .await
        .unwrap();

    let state = bobbin.get_state(new_execution_id).await.unwrap();
    assert_eq!(sorted(state.finished_inputs), numbers);
    assert!(state.unfinished_inputs.is_empty());

    // Only the inputs left unfinished were run again.
    assert_eq!(successful.history(), fail_for);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn give_up_when_max_failures_exceeded() {
    let dir = tempdir().unwrap();
    let calculator = FactorsCalculator::default();
    let bobbin = Bobbin::local_multithread(
        dir.path(),
        ExecutorConfig::new(2).with_max_worker_retries(10_000),
    );

    let execution_id = bobbin
        .start_from_scratch(vec![1u64], calculator.failing_function(None))
        .await
        .unwrap();

    let state = bobbin.get_state(execution_id).await.unwrap();
    assert!(state.finished_inputs.is_empty());
    assert_eq!(state.unfinished_inputs, vec![1]);

    let exceptions = bobbin.get_exceptions(execution_id).await.unwrap();
    assert_eq!(exceptions.len(), 10_000);
    assert_eq!(exceptions.last().unwrap().failures_so_far, 10_000);
}

#[rstest]
#[case::tight_budget(1)]
#[case::some_budget(5)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn always_failing_function_finishes_nothing(#[case] budget: u32) {
    let dir = tempdir().unwrap();
    let calculator = FactorsCalculator::default();
    let bobbin = Bobbin::local_multithread(
        dir.path(),
        ExecutorConfig::new(3).with_max_worker_retries(budget),
    );
    let numbers: Vec<u64> = (1..=20).collect();

    let execution_id = bobbin
        .start_from_scratch(numbers.clone(), calculator.failing_function(None))
        .await
        .unwrap();

    let state = bobbin.get_state(execution_id).await.unwrap();
    assert!(state.finished_inputs.is_empty());
    assert_eq!(sorted(state.unfinished_inputs.into_iter().collect()), numbers);
    assert!(calculator.history().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exceptions_are_not_stored_when_disabled() {
    let dir = tempdir().unwrap();
    let calculator = FactorsCalculator::default();
    let bobbin = Bobbin::local_multithread(
        dir.path(),
        ExecutorConfig::new(2)
            .with_max_worker_retries(3)
            .with_store_exceptions(false),
    );

    let execution_id = bobbin
        .start_from_scratch(vec![1u64, 2, 3], calculator.failing_function(Some(vec![2])))
        .await
        .unwrap();

    assert!(bobbin.get_exceptions(execution_id).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resume_survives_a_new_facade_over_the_same_directory() {
    let dir = tempdir().unwrap();
    let config = ExecutorConfig::new(4).with_max_worker_retries(1);
    let numbers: Vec<u64> = (1..=40).collect();

    let execution_id = {
        let bobbin = Bobbin::local_multithread(dir.path(), config.clone());
        bobbin
            .start_from_scratch(
                numbers.clone(),
                FactorsCalculator::default().failing_function(Some(vec![3, 13, 23, 33])),
            )
            .await
            .unwrap()
    };

    let bobbin = Bobbin::<u64>::local_multithread(dir.path(), config);
    let past = bobbin.get_state(execution_id).await.unwrap();
    assert!(!past.is_complete());

    let successful = FactorsCalculator::default();
    let resumed = bobbin
        .start_from_past_execution(execution_id, successful.function())
        .await
        .unwrap();

    let state = bobbin.get_state(resumed).await.unwrap();
    assert_eq!(sorted(state.finished_inputs), numbers);
    assert_eq!(
        successful.history(),
        sorted(past.unfinished_inputs.into_iter().collect())
    );
}
