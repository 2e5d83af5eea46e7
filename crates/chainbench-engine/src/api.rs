//! Collaborator seams.
//!
//! The engine never talks to the network itself: pricing and batch execution
//! live behind these traits, and tests swap in the `test_harness` mocks.

use crate::error::{EstimateError, ExecuteError};
use crate::types::{EstimateRequest, ExecutionId, ResultRecord, Scenario};
use rust_decimal::Decimal;

/// External cost estimator.
///
/// Must be a pure, idempotent pricing query from the engine's point of view;
/// failures are transport/validation errors only.
#[async_trait::async_trait]
pub trait Estimator: Send + Sync {
    async fn estimate(&self, request: &EstimateRequest) -> Result<Decimal, EstimateError>;
}

/// External batch runner.
///
/// Accepts one batch of admitted scenarios and returns the handle that all
/// subsequent progress events for the batch are scoped by.
#[async_trait::async_trait]
pub trait Runner: Send + Sync {
    async fn submit(&self, batch: &[Scenario]) -> Result<ExecutionId, ExecuteError>;
}

/// Results archive.
///
/// Receives a fully-formed record for each successfully completed scenario.
/// Persistence is the collaborator's problem; the hand-off is infallible
/// from the engine's side.
pub trait ResultSink: Send + Sync {
    fn archive(&self, record: ResultRecord);
}
