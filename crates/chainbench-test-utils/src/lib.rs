//! Testing utilities for the chainbench workspace
//!
//! Shared request builders, balance fixtures, and progress-event helpers.

#![allow(missing_docs)]

use chainbench_engine::progress::{
    ProgressBody, ProgressEvent, ScenarioKey, ScenarioUpdate, Settlement,
};
use chainbench_engine::types::{
    AllocatorStrategy, ChainId, ChainSelection, ExecutionId, SweepRequest, TransmitterStrategy,
    UserId, ValueRange,
};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Minimal single-combination sweep: one allocator, one transmitter, fixed
/// sizes, three chains in fixed mode. Expands to exactly one scenario.
pub fn single_scenario_request() -> SweepRequest {
    SweepRequest {
        project: "test-sweep".to_string(),
        user_id: UserId::new("operator-1"),
        data_size_mb: ValueRange::Fixed(500),
        chunk_size_kb: ValueRange::Fixed(64),
        allocators: vec![AllocatorStrategy::Static],
        transmitters: vec![TransmitterStrategy::OneByOne],
        chain_selection: ChainSelection::Fixed,
        selected_chains: chains(&["chain-1", "chain-2", "chain-3"]),
    }
}

/// Same shape but N scenarios, all for the same user, via N allocators.
pub fn multi_scenario_request(n: usize) -> SweepRequest {
    assert!(n <= AllocatorStrategy::ALL.len(), "at most 5 scenarios");
    let mut request = single_scenario_request();
    request.allocators = AllocatorStrategy::ALL[..n].to_vec();
    request
}

pub fn chains(ids: &[&str]) -> Vec<ChainId> {
    ids.iter().map(|c| ChainId::new(*c)).collect()
}

pub fn balances(pairs: &[(&str, Decimal)]) -> HashMap<UserId, Decimal> {
    pairs
        .iter()
        .map(|(user, amount)| (UserId::new(*user), *amount))
        .collect()
}

pub fn log_event(execution_id: &ExecutionId, unique_id: &str, log: &str) -> ProgressEvent {
    ProgressEvent {
        execution_id: execution_id.clone(),
        body: ProgressBody::Scenario {
            key: ScenarioKey::UniqueId(unique_id.to_string()),
            update: ScenarioUpdate::Log(log.to_string()),
        },
    }
}

pub fn running_event(execution_id: &ExecutionId, unique_id: &str, log: &str) -> ProgressEvent {
    ProgressEvent {
        execution_id: execution_id.clone(),
        body: ProgressBody::Scenario {
            key: ScenarioKey::UniqueId(unique_id.to_string()),
            update: ScenarioUpdate::Running {
                log: Some(log.to_string()),
            },
        },
    }
}

pub fn complete_event(
    execution_id: &ExecutionId,
    unique_id: &str,
    actual_cost: Decimal,
    refund: Decimal,
    current_balance: Decimal,
) -> ProgressEvent {
    ProgressEvent {
        execution_id: execution_id.clone(),
        body: ProgressBody::Scenario {
            key: ScenarioKey::UniqueId(unique_id.to_string()),
            update: ScenarioUpdate::Complete {
                log: Some("done".to_string()),
                settlement: Settlement {
                    actual_cost,
                    refund,
                    current_balance,
                },
            },
        },
    }
}

pub fn failed_event(
    execution_id: &ExecutionId,
    unique_id: &str,
    reason: &str,
    actual_cost: Decimal,
    refund: Decimal,
    current_balance: Decimal,
) -> ProgressEvent {
    ProgressEvent {
        execution_id: execution_id.clone(),
        body: ProgressBody::Scenario {
            key: ScenarioKey::UniqueId(unique_id.to_string()),
            update: ScenarioUpdate::Failed {
                reason: reason.to_string(),
                log: None,
                settlement: Settlement {
                    actual_cost,
                    refund,
                    current_balance,
                },
            },
        },
    }
}

pub fn batch_complete(execution_id: &ExecutionId) -> ProgressEvent {
    ProgressEvent {
        execution_id: execution_id.clone(),
        body: ProgressBody::BatchComplete,
    }
}
