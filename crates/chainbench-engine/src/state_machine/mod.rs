use crate::error::TransitionError;
use crate::types::ScenarioStatus;

/// Validates a scenario status transition.
///
/// The engine drives every transition itself, so a rejection here means a
/// caller bug or an out-of-order progress event slipping through a guard.
pub fn validate_transition(
    from: ScenarioStatus,
    to: ScenarioStatus,
) -> Result<(), TransitionError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

pub fn allowed_transitions(from: ScenarioStatus) -> Vec<ScenarioStatus> {
    use ScenarioStatus::*;
    match from {
        Pending => vec![Calculating],
        Calculating => vec![Ready, Failed],
        Ready => vec![Running],
        Running => vec![Complete, Failed],
        // Failed re-enters the pipeline via reprocess (-> Pending) or a
        // fresh recalculate pass picking it up directly (-> Calculating).
        Failed => vec![Pending, Calculating],
        Complete => vec![],
    }
}

fn allowed(from: ScenarioStatus, to: ScenarioStatus) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
