//! Engine-level generation behavior: queue replacement and session-scoped
//! uniqueId minting. Expansion arithmetic itself is covered in the
//! generator module tests.

use chainbench_engine::prelude::*;
use chainbench_engine::test_harness::{MemoryArchive, MockEstimator, MockRunner};
use chainbench_test_utils::{chains, multi_scenario_request, single_scenario_request};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn engine() -> Arc<SweepEngine> {
    Arc::new(SweepEngine::new(
        Arc::new(MockEstimator::with_unit_price(dec!(0.01))),
        Arc::new(MockRunner::new()),
        Arc::new(MemoryArchive::new()),
    ))
}

#[test]
fn generate_replaces_the_whole_queue() {
    let engine = engine();

    engine.generate(&multi_scenario_request(3)).unwrap();
    assert_eq!(engine.scenarios().len(), 3);

    engine.generate(&single_scenario_request()).unwrap();
    let queue = engine.scenarios();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, 1);
}

#[test]
fn unique_ids_are_never_reused_across_regenerations() {
    let engine = engine();

    let first = engine.generate(&multi_scenario_request(3)).unwrap();
    let second = engine.generate(&multi_scenario_request(3)).unwrap();

    let mut all: Vec<String> = first
        .iter()
        .chain(second.iter())
        .map(|s| s.unique_id.clone())
        .collect();
    all.sort();
    all.dedup();
    assert_eq!(all.len(), 6, "regeneration must mint fresh uniqueIds");
}

#[test]
fn fresh_scenarios_are_pending_with_zero_cost() {
    let engine = engine();
    let scenarios = engine.generate(&multi_scenario_request(2)).unwrap();

    for s in &scenarios {
        assert_eq!(s.status, ScenarioStatus::Pending);
        assert_eq!(s.cost, Decimal::ZERO);
        assert_eq!(s.fail_reason, None);
        assert!(s.logs.is_empty());
    }

    let stats = engine.stats();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.total_cost, Decimal::ZERO);
}

#[test]
fn target_chains_are_sorted_prefixes() {
    let engine = engine();
    let mut request = single_scenario_request();
    request.selected_chains = chains(&["chain-10", "chain-2", "chain-1"]);
    request.chain_selection = ChainSelection::Range { start: 1, end: 3, step: 1 };

    let scenarios = engine.generate(&request).unwrap();
    assert_eq!(scenarios.len(), 3);

    let full = chains(&["chain-1", "chain-2", "chain-10"]);
    for s in &scenarios {
        assert!(!s.target_chain_ids.is_empty());
        assert!(full.starts_with(&s.target_chain_ids));
    }
}

#[test]
fn invalid_requests_leave_the_queue_untouched() {
    let engine = engine();
    engine.generate(&single_scenario_request()).unwrap();

    let mut bad = single_scenario_request();
    bad.selected_chains.clear();
    assert!(matches!(
        engine.generate(&bad),
        Err(GenerateError::NoChainsSelected)
    ));
    assert_eq!(engine.scenarios().len(), 1, "failed generate must not clear the queue");
}
