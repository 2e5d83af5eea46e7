//! Collaborator mocks and the sweep simulator.
//!
//! The engine only ever sees the `Estimator`/`Runner`/`ResultSink` seams, so
//! everything here doubles as the reference for what a real backend owes the
//! engine.

pub mod simulator;

pub use simulator::{run_simulator, SimulationReport, SimulatorConfig, Violation};

use crate::api::{Estimator, ResultSink, Runner};
use crate::error::{EstimateError, ExecuteError};
use crate::types::{EstimateRequest, ExecutionId, ResultRecord, Scenario};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// Scriptable estimator.
///
/// With no script queued it prices deterministically:
/// `data_size_mb * chain_count * unit_price`.
pub struct MockEstimator {
    unit_price: Decimal,
    script: Mutex<VecDeque<Result<Decimal, EstimateError>>>,
    calls: Mutex<u64>,
}

impl MockEstimator {
    pub fn with_unit_price(unit_price: Decimal) -> Self {
        Self {
            unit_price,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(0),
        }
    }

    /// Answers each call with the next scripted outcome, in order.
    pub fn scripted(outcomes: Vec<Result<Decimal, EstimateError>>) -> Self {
        Self {
            unit_price: Decimal::ONE,
            script: Mutex::new(outcomes.into()),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        *self.calls.lock()
    }
}

#[async_trait::async_trait]
impl Estimator for MockEstimator {
    async fn estimate(&self, request: &EstimateRequest) -> Result<Decimal, EstimateError> {
        *self.calls.lock() += 1;
        if let Some(outcome) = self.script.lock().pop_front() {
            return outcome;
        }
        let units = request.data_size_mb * request.target_chain_ids.len() as u64;
        Ok(Decimal::from(units) * self.unit_price)
    }
}

/// Estimator that parks inside `estimate` until released, so tests can
/// observe the queue with an estimation genuinely in flight.
pub struct GatedEstimator {
    price: Decimal,
    gate: Arc<Semaphore>,
    entered: Arc<Semaphore>,
}

impl GatedEstimator {
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            gate: Arc::new(Semaphore::new(0)),
            entered: Arc::new(Semaphore::new(0)),
        }
    }

    /// Resolves once a call is parked inside `estimate`.
    pub async fn wait_until_entered(&self) {
        self.entered.acquire().await.expect("gate closed").forget();
    }

    /// Let one parked call through.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait::async_trait]
impl Estimator for GatedEstimator {
    async fn estimate(&self, _request: &EstimateRequest) -> Result<Decimal, EstimateError> {
        self.entered.add_permits(1);
        self.gate.acquire().await.expect("gate closed").forget();
        Ok(self.price)
    }
}

/// Runner that accepts batches and mints uuid execution ids, or fails every
/// submission when told to.
pub struct MockRunner {
    fail_submissions: Mutex<bool>,
    submitted: Mutex<Vec<Vec<Scenario>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            fail_submissions: Mutex::new(false),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_next_submissions(&self, fail: bool) {
        *self.fail_submissions.lock() = fail;
    }

    /// Batches received so far.
    pub fn submitted(&self) -> Vec<Vec<Scenario>> {
        self.submitted.lock().clone()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Runner for MockRunner {
    async fn submit(&self, batch: &[Scenario]) -> Result<ExecutionId, ExecuteError> {
        if *self.fail_submissions.lock() {
            return Err(ExecuteError::Submission("runner unavailable".to_string()));
        }
        self.submitted.lock().push(batch.to_vec());
        Ok(ExecutionId::new(Uuid::new_v4().to_string()))
    }
}

/// In-memory results archive.
#[derive(Default)]
pub struct MemoryArchive {
    records: Mutex<Vec<ResultRecord>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ResultRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl ResultSink for MemoryArchive {
    fn archive(&self, record: ResultRecord) {
        self.records.lock().push(record);
    }
}
