//! Negative tests - guard rails on queue management and phase exclusion.

use chainbench_engine::prelude::*;
use chainbench_engine::test_harness::{GatedEstimator, MemoryArchive, MockEstimator, MockRunner};
use chainbench_test_utils::{balances, multi_scenario_request, single_scenario_request};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn engine_with(estimator: MockEstimator) -> Arc<SweepEngine> {
    Arc::new(SweepEngine::new(
        Arc::new(estimator),
        Arc::new(MockRunner::new()),
        Arc::new(MemoryArchive::new()),
    ))
}

async fn running_engine() -> Arc<SweepEngine> {
    let engine = engine_with(MockEstimator::scripted(vec![Ok(dec!(10))]));
    engine.generate(&single_scenario_request()).unwrap();
    engine
        .recalculate(&balances(&[("operator-1", dec!(100))]))
        .await
        .unwrap();
    engine.execute().await.unwrap();
    assert!(engine.is_execution_running());
    engine
}

#[tokio::test]
async fn remove_is_refused_for_pending_scenarios() {
    let engine = engine_with(MockEstimator::with_unit_price(dec!(0.01)));
    engine.generate(&single_scenario_request()).unwrap();

    let err = engine.remove(1).unwrap_err();
    assert_eq!(err, GuardRejection::EstimationInFlight(1));
    assert_eq!(engine.scenarios().len(), 1, "queue unchanged");
}

#[tokio::test]
async fn remove_is_refused_mid_estimation() {
    let estimator = Arc::new(GatedEstimator::new(dec!(10)));
    let engine = Arc::new(SweepEngine::new(
        estimator.clone(),
        Arc::new(MockRunner::new()),
        Arc::new(MemoryArchive::new()),
    ));
    engine.generate(&single_scenario_request()).unwrap();

    let pipeline = tokio::spawn({
        let engine = engine.clone();
        let funds = balances(&[("operator-1", dec!(100))]);
        async move { engine.recalculate(&funds).await }
    });
    estimator.wait_until_entered().await;

    assert_eq!(engine.scenarios()[0].status, ScenarioStatus::Calculating);
    assert_eq!(engine.remove(1).unwrap_err(), GuardRejection::EstimationInFlight(1));
    assert_eq!(engine.clear_all().unwrap_err(), GuardRejection::QueueBusy);

    estimator.release();
    pipeline.await.unwrap().unwrap();
    assert_eq!(engine.scenarios()[0].status, ScenarioStatus::Ready);
}

#[tokio::test]
async fn queue_management_is_refused_while_executing() {
    let engine = running_engine().await;

    assert_eq!(engine.remove(1).unwrap_err(), GuardRejection::ExecutionInProgress);
    assert_eq!(engine.clear_all().unwrap_err(), GuardRejection::ExecutionInProgress);
    assert_eq!(engine.scenarios().len(), 1, "queue unchanged");
}

#[tokio::test]
async fn recalculate_is_refused_while_executing() {
    let engine = running_engine().await;

    let err = engine
        .recalculate(&balances(&[("operator-1", dec!(100))]))
        .await
        .unwrap_err();
    assert_eq!(err, GuardRejection::ExecutionInProgress);
}

#[tokio::test]
async fn execute_is_refused_while_executing() {
    let engine = running_engine().await;

    let err = engine.execute().await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Guard(GuardRejection::ExecutionInProgress)
    ));
}

#[tokio::test]
async fn execute_requires_a_ready_scenario() {
    let engine = engine_with(MockEstimator::with_unit_price(dec!(0.01)));
    engine.generate(&single_scenario_request()).unwrap();

    let err = engine.execute().await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Execute(ExecuteError::NoReadyScenarios)
    ));
    assert!(!engine.is_execution_running());
}

#[tokio::test]
async fn remove_of_unknown_scenario_is_reported() {
    let engine = engine_with(MockEstimator::with_unit_price(dec!(0.01)));
    engine.generate(&single_scenario_request()).unwrap();

    assert_eq!(engine.remove(99).unwrap_err(), GuardRejection::ScenarioNotFound(99));
}

#[tokio::test]
async fn reprocess_requires_a_failed_scenario() {
    let engine = engine_with(MockEstimator::scripted(vec![Ok(dec!(10))]));
    engine.generate(&single_scenario_request()).unwrap();
    engine
        .recalculate(&balances(&[("operator-1", dec!(100))]))
        .await
        .unwrap();

    let err = engine.reprocess(1).unwrap_err();
    assert_eq!(
        err,
        GuardRejection::NotReprocessable {
            id: 1,
            status: ScenarioStatus::Ready,
        }
    );
}

#[tokio::test]
async fn settled_scenarios_can_be_removed_and_cleared() {
    let engine = engine_with(MockEstimator::scripted(vec![Ok(dec!(10)), Ok(dec!(20))]));
    engine.generate(&multi_scenario_request(2)).unwrap();
    engine
        .recalculate(&balances(&[("operator-1", dec!(100))]))
        .await
        .unwrap();

    // Both Ready: neither executing nor mid-estimation, so removal is fine.
    engine.remove(1).unwrap();
    assert_eq!(engine.scenarios().len(), 1);
    engine.clear_all().unwrap();
    assert!(engine.scenarios().is_empty());
}
