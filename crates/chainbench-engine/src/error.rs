//! Error types for the sweep engine.
//!
//! Each failure family gets its own enum so callers can match on the seam
//! they care about; `EngineError` rolls them up for the operator surface.

use crate::types::ScenarioStatus;

/// Top-level engine error.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Sweep request could not be expanded
    #[error("generation failed: {0}")]
    Generate(#[from] GenerateError),

    /// External estimator rejected or dropped a pricing query
    #[error("estimation failed: {0}")]
    Estimate(#[from] EstimateError),

    /// Batch submission to the runner failed
    #[error("execution failed: {0}")]
    Execute(#[from] ExecuteError),

    /// Operation refused by a queue guard
    #[error("operation refused: {0}")]
    Guard(#[from] GuardRejection),

    /// Illegal scenario status transition
    #[error("illegal transition: {0}")]
    Transition(#[from] TransitionError),
}

impl EngineError {
    /// True when the operator can retry the same operation as-is
    /// (after the blocking condition clears).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Estimate(_) | EngineError::Execute(_) | EngineError::Guard(_)
        )
    }
}

/// Sweep expansion errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("no allocator strategies selected")]
    NoAllocators,

    #[error("no transmitter strategies selected")]
    NoTransmitters,

    /// An empty chain set can never satisfy the non-empty prefix rule.
    #[error("no chains selected")]
    NoChainsSelected,
}

/// External estimator failures. Pricing is a pure query, so these are
/// transport/validation errors only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EstimateError {
    #[error("estimator transport error: {0}")]
    Transport(String),

    #[error("estimator rejected request: {0}")]
    Validation(String),
}

/// Batch submission failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecuteError {
    #[error("no scenarios are ready for execution")]
    NoReadyScenarios,

    #[error("runner submission failed: {0}")]
    Submission(String),
}

/// A guarded queue operation was refused. Not a fault: a rejected no-op the
/// caller surfaces to the operator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardRejection {
    #[error("a batch is currently executing")]
    ExecutionInProgress,

    #[error("estimation is in flight for scenario {0}")]
    EstimationInFlight(u64),

    #[error("estimation is in flight")]
    QueueBusy,

    #[error("scenario {0} not found")]
    ScenarioNotFound(u64),

    #[error("scenario {id} is {status:?}, not Failed")]
    NotReprocessable { id: u64, status: ScenarioStatus },
}

/// An illegal scenario status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: ScenarioStatus,
    pub to: ScenarioStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_rejections_are_retryable() {
        let err = EngineError::Guard(GuardRejection::ExecutionInProgress);
        assert!(err.is_retryable());
    }

    #[test]
    fn generation_errors_are_not_retryable() {
        let err = EngineError::Generate(GenerateError::NoChainsSelected);
        assert!(!err.is_retryable());
    }

    #[test]
    fn display_formats() {
        let err = GuardRejection::NotReprocessable {
            id: 3,
            status: ScenarioStatus::Ready,
        };
        assert!(err.to_string().contains("scenario 3"));
        assert!(EstimateError::Transport("timeout".into())
            .to_string()
            .contains("timeout"));
    }
}
