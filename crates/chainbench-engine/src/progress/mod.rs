//! Progress events from the external runner.
//!
//! Events arrive push-driven, unordered, and best-effort, scoped by the
//! `ExecutionId` the runner issued at submission. The payload is a tagged
//! variant so the handler matches exhaustively instead of sniffing optional
//! fields.

use crate::engine::SweepEngine;
use crate::types::ExecutionId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One inbound progress message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub execution_id: ExecutionId,
    pub body: ProgressBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProgressBody {
    /// Per-scenario update.
    Scenario {
        key: ScenarioKey,
        update: ScenarioUpdate,
    },
    /// The whole batch is done; carries no scenario id and mutates none.
    BatchComplete,
}

/// How an event addresses a scenario. uniqueId is the stable key when the
/// numeric id is ambiguous across regenerations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioKey {
    Id(u64),
    UniqueId(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScenarioUpdate {
    /// Bare log line, no status change.
    Log(String),
    /// Non-terminal status update with an optional log line.
    Running { log: Option<String> },
    /// Terminal success; triggers reconciliation and an archive record.
    Complete {
        log: Option<String>,
        settlement: Settlement,
    },
    /// Terminal failure; reconciliation still applies (partial-consumption
    /// fee policy) but no archive record is produced.
    Failed {
        reason: String,
        log: Option<String>,
        settlement: Settlement,
    },
}

/// Server-side settlement reported on terminal events. `current_balance` is
/// authoritative and replaces whatever the shadow ledger assumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub actual_cost: Decimal,
    /// `reserved_cost - actual_cost`.
    pub refund: Decimal,
    pub current_balance: Decimal,
}

/// Consumer loop: applies every inbound event to the engine until the
/// channel closes. Spawn this once per engine instance.
pub async fn drive_progress(engine: Arc<SweepEngine>, mut rx: mpsc::Receiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        engine.on_progress(event);
    }
    tracing::debug!("progress channel closed");
}
