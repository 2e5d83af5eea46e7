use crate::api::{Estimator, ResultSink, Runner};
use crate::error::{EngineError, ExecuteError, GenerateError, GuardRejection};
use crate::generator;
use crate::ledger::ShadowLedger;
use crate::progress::{ProgressBody, ProgressEvent, ScenarioKey, ScenarioUpdate, Settlement};
use crate::state_machine;
use crate::types::*;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Batch execution flag plus the runner-issued handle scoping its events.
#[derive(Debug, Default)]
struct ExecutionState {
    running: bool,
    execution_id: Option<ExecutionId>,
}

/// The scenario generation and execution engine.
///
/// Owns the in-memory scenario queue, the operator's user-balance mirror,
/// and the batch execution flag. All mutations are applied as single atomic
/// steps under the queue lock; the estimation pipeline and the progress
/// handler interleave only at `.await` points, never mid-mutation.
///
/// Instances are self-contained and injectable: collaborators come in
/// through the `Estimator`/`Runner`/`ResultSink` traits, so multiple
/// engines can run side by side in tests.
pub struct SweepEngine {
    estimator: Arc<dyn Estimator>,
    runner: Arc<dyn Runner>,
    archive: Arc<dyn ResultSink>,
    queue: RwLock<Vec<Scenario>>,
    /// Live per-user balances: seeded from recalculate snapshots, then
    /// overwritten by authoritative settlement reports.
    users: RwLock<HashMap<UserId, Decimal>>,
    execution: RwLock<ExecutionState>,
    /// Session-monotonic uniqueId sequence; never reset, so uniqueIds are
    /// never reused across regenerations.
    next_unique_seq: RwLock<u64>,
}

impl SweepEngine {
    pub fn new(
        estimator: Arc<dyn Estimator>,
        runner: Arc<dyn Runner>,
        archive: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            estimator,
            runner,
            archive,
            queue: RwLock::new(Vec::new()),
            users: RwLock::new(HashMap::new()),
            execution: RwLock::new(ExecutionState::default()),
            next_unique_seq: RwLock::new(0),
        }
    }

    /// Expand a sweep request and replace the whole queue with the result.
    ///
    /// Every scenario starts at `Pending` with zero cost and empty logs.
    pub fn generate(&self, request: &SweepRequest) -> Result<Vec<Scenario>, GenerateError> {
        let seq_start = *self.next_unique_seq.read();
        let scenarios = generator::generate(request, seq_start)?;
        *self.next_unique_seq.write() = seq_start + scenarios.len() as u64;

        tracing::info!(
            project = %request.project,
            count = scenarios.len(),
            "generated scenario queue"
        );

        *self.queue.write() = scenarios.clone();
        Ok(scenarios)
    }

    /// Run the estimation/admission pipeline over every `Pending` or
    /// `Failed` scenario, in array order.
    ///
    /// Admission is checked against a shadow ledger seeded once from
    /// `balances`; the first insufficiency or estimator error marks that
    /// scenario `Failed` and aborts the rest of the run, leaving later
    /// scenarios untouched at their prior status.
    pub async fn recalculate(
        &self,
        balances: &HashMap<UserId, Decimal>,
    ) -> Result<(), GuardRejection> {
        if self.execution.read().running {
            return Err(GuardRejection::ExecutionInProgress);
        }

        self.users.write().extend(balances.clone());
        let mut ledger = ShadowLedger::seed(balances);

        loop {
            // One atomic step: claim the next target and mark it in flight.
            let claimed = {
                let mut queue = self.queue.write();
                queue
                    .iter_mut()
                    .find(|s| {
                        matches!(s.status, ScenarioStatus::Pending | ScenarioStatus::Failed)
                    })
                    .map(|s| {
                        s.status = ScenarioStatus::Calculating;
                        s.fail_reason = None;
                        (s.unique_id.clone(), s.estimate_request())
                    })
            };
            let Some((unique_id, request)) = claimed else {
                break;
            };

            tracing::debug!(scenario = %unique_id, "estimating");
            let quote = self.estimator.estimate(&request).await;

            let mut queue = self.queue.write();
            let Some(scenario) = queue
                .iter_mut()
                .find(|s| s.unique_id == unique_id && s.status == ScenarioStatus::Calculating)
            else {
                // Queue replaced or scenario mutated while we were pricing.
                tracing::warn!(scenario = %unique_id, "claimed scenario vanished mid-estimation");
                break;
            };

            match quote {
                Ok(cost) => match ledger.debit(&scenario.user_id, cost) {
                    Ok(remaining) => {
                        scenario.status = ScenarioStatus::Ready;
                        scenario.cost = cost;
                        tracing::debug!(
                            scenario = %unique_id,
                            %cost,
                            %remaining,
                            "admitted"
                        );
                    }
                    Err(available) => {
                        scenario.status = ScenarioStatus::Failed;
                        scenario.fail_reason = Some(format!(
                            "insufficient funds: estimated cost {cost} exceeds available balance {available}"
                        ));
                        tracing::warn!(
                            scenario = %unique_id,
                            %cost,
                            %available,
                            "admission rejected, aborting pipeline run"
                        );
                        break;
                    }
                },
                Err(err) => {
                    scenario.status = ScenarioStatus::Failed;
                    scenario.fail_reason = Some("cost estimation failed".to_string());
                    tracing::warn!(
                        scenario = %unique_id,
                        error = %err,
                        "estimator error, aborting pipeline run"
                    );
                    break;
                }
            }
        }

        Ok(())
    }

    /// Submit every `Ready` scenario as one batch to runner.
    ///
    /// Scenarios not `Ready` at submission time stay in the queue for a
    /// future batch. On submission failure the running flag is cleared and
    /// the batch stays `Ready` for a retry.
    pub async fn execute(&self) -> Result<ExecutionId, EngineError> {
        {
            let exec = self.execution.read();
            if exec.running {
                return Err(GuardRejection::ExecutionInProgress.into());
            }
        }

        let batch: Vec<Scenario> = self
            .queue
            .read()
            .iter()
            .filter(|s| s.status == ScenarioStatus::Ready)
            .cloned()
            .collect();
        if batch.is_empty() {
            return Err(ExecuteError::NoReadyScenarios.into());
        }

        self.execution.write().running = true;
        tracing::info!(batch = batch.len(), "submitting batch");

        // The id is stored before the Ready -> Running sweep so that a
        // progress event racing in right after submission is in scope.
        let execution_id = match self.runner.submit(&batch).await {
            Ok(id) => {
                self.execution.write().execution_id = Some(id.clone());
                id
            }
            Err(err) => {
                let mut exec = self.execution.write();
                exec.running = false;
                exec.execution_id = None;
                tracing::warn!(error = %err, "submission failed, batch stays ready");
                return Err(err.into());
            }
        };

        {
            let mut queue = self.queue.write();
            for scenario in queue.iter_mut() {
                if scenario.status == ScenarioStatus::Ready
                    && batch.iter().any(|b| b.unique_id == scenario.unique_id)
                {
                    scenario.status = ScenarioStatus::Running;
                }
            }
        }

        tracing::info!(execution_id = %execution_id.0, "batch running");
        Ok(execution_id)
    }

    /// Apply one inbound progress event.
    ///
    /// Foreign execution ids, unknown scenario keys, and updates to
    /// already-terminal scenarios are ignored: progress delivery is
    /// best-effort and unordered, so none of these are errors.
    pub fn on_progress(&self, event: ProgressEvent) {
        {
            let exec = self.execution.read();
            if exec.execution_id.as_ref() != Some(&event.execution_id) {
                tracing::debug!(
                    execution_id = %event.execution_id.0,
                    "ignoring event for foreign execution"
                );
                return;
            }
        }

        match event.body {
            ProgressBody::BatchComplete => {
                let mut exec = self.execution.write();
                exec.running = false;
                exec.execution_id = None;
                tracing::info!("batch complete");
            }
            ProgressBody::Scenario { key, update } => self.apply_scenario_update(key, update),
        }
    }

    fn apply_scenario_update(&self, key: ScenarioKey, update: ScenarioUpdate) {
        // Settlement side effects are collected under the queue lock and
        // applied after it drops, so a collaborator sink can call back into
        // the engine without deadlocking.
        let mut settled: Option<(UserId, Decimal)> = None;
        let mut record: Option<ResultRecord> = None;

        {
            let mut queue = self.queue.write();
            let Some(scenario) = queue.iter_mut().find(|s| match &key {
                ScenarioKey::Id(id) => s.id == *id,
                ScenarioKey::UniqueId(uid) => s.unique_id == *uid,
            }) else {
                tracing::debug!(?key, "ignoring event for unknown scenario");
                return;
            };

            if scenario.status.is_terminal() {
                tracing::debug!(scenario = %scenario.unique_id, "duplicate event for settled scenario");
                return;
            }

            match update {
                ScenarioUpdate::Log(line) => scenario.logs.push(line),
                ScenarioUpdate::Running { log } => {
                    if scenario.status != ScenarioStatus::Running {
                        match state_machine::validate_transition(
                            scenario.status,
                            ScenarioStatus::Running,
                        ) {
                            Ok(()) => scenario.status = ScenarioStatus::Running,
                            Err(err) => {
                                tracing::warn!(scenario = %scenario.unique_id, %err, "dropping status update");
                            }
                        }
                    }
                    if let Some(line) = log {
                        scenario.logs.push(line);
                    }
                }
                ScenarioUpdate::Complete { log, settlement } => {
                    if let Err(err) = state_machine::validate_transition(
                        scenario.status,
                        ScenarioStatus::Complete,
                    ) {
                        tracing::warn!(scenario = %scenario.unique_id, %err, "dropping terminal event");
                        return;
                    }
                    settled = Some((scenario.user_id.clone(), settlement.current_balance));
                    scenario.cost = settlement.actual_cost;
                    scenario.status = ScenarioStatus::Complete;
                    if let Some(line) = log {
                        scenario.logs.push(line);
                    }
                    record = Some(result_record(scenario, settlement));
                }
                ScenarioUpdate::Failed {
                    reason,
                    log,
                    settlement,
                } => {
                    if let Err(err) = state_machine::validate_transition(
                        scenario.status,
                        ScenarioStatus::Failed,
                    ) {
                        tracing::warn!(scenario = %scenario.unique_id, %err, "dropping terminal event");
                        return;
                    }
                    // Partial-consumption fee policy: the balance update
                    // applies even though no result record is produced.
                    settled = Some((scenario.user_id.clone(), settlement.current_balance));
                    scenario.cost = settlement.actual_cost;
                    scenario.status = ScenarioStatus::Failed;
                    scenario.fail_reason = Some(reason);
                    if let Some(line) = log {
                        scenario.logs.push(line);
                    }
                }
            }
        }

        if let Some((user, balance)) = settled {
            self.users.write().insert(user, balance);
        }
        if let Some(record) = record {
            self.archive.archive(record);
        }
    }

    /// Send a `Failed` scenario back to `Pending` so the next pipeline run
    /// picks it up. Logs are preserved.
    pub fn reprocess(&self, id: u64) -> Result<(), GuardRejection> {
        let mut queue = self.queue.write();
        let scenario = queue
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(GuardRejection::ScenarioNotFound(id))?;
        if scenario.status != ScenarioStatus::Failed {
            return Err(GuardRejection::NotReprocessable {
                id,
                status: scenario.status,
            });
        }
        scenario.status = ScenarioStatus::Pending;
        scenario.cost = Decimal::ZERO;
        scenario.fail_reason = None;
        tracing::info!(scenario = %scenario.unique_id, "reprocessing");
        Ok(())
    }

    /// Remove one scenario. Refused while a batch is executing or while the
    /// scenario is mid-estimation.
    pub fn remove(&self, id: u64) -> Result<(), GuardRejection> {
        if self.execution.read().running {
            return Err(GuardRejection::ExecutionInProgress);
        }
        let mut queue = self.queue.write();
        let index = queue
            .iter()
            .position(|s| s.id == id)
            .ok_or(GuardRejection::ScenarioNotFound(id))?;
        if matches!(
            queue[index].status,
            ScenarioStatus::Pending | ScenarioStatus::Calculating
        ) {
            return Err(GuardRejection::EstimationInFlight(id));
        }
        let removed = queue.remove(index);
        tracing::info!(scenario = %removed.unique_id, "removed from queue");
        Ok(())
    }

    /// Clear the whole queue. Refused while a batch is executing or while
    /// any scenario is mid-estimation.
    pub fn clear_all(&self) -> Result<(), GuardRejection> {
        if self.execution.read().running {
            return Err(GuardRejection::ExecutionInProgress);
        }
        let mut queue = self.queue.write();
        if queue.iter().any(|s| {
            matches!(
                s.status,
                ScenarioStatus::Pending | ScenarioStatus::Calculating
            )
        }) {
            return Err(GuardRejection::QueueBusy);
        }
        let cleared = queue.len();
        queue.clear();
        tracing::info!(cleared, "queue cleared");
        Ok(())
    }

    /// Snapshot of the queue in display order.
    pub fn scenarios(&self) -> Vec<Scenario> {
        self.queue.read().clone()
    }

    pub fn scenario(&self, id: u64) -> Option<Scenario> {
        self.queue.read().iter().find(|s| s.id == id).cloned()
    }

    /// Derived counts/totals for collaborators (UI, notifications).
    pub fn stats(&self) -> QueueStats {
        let queue = self.queue.read();
        let mut stats = QueueStats {
            total: queue.len(),
            ..QueueStats::default()
        };
        for scenario in queue.iter() {
            match scenario.status {
                ScenarioStatus::Pending => stats.pending += 1,
                ScenarioStatus::Calculating => stats.calculating += 1,
                ScenarioStatus::Ready => stats.ready += 1,
                ScenarioStatus::Running => stats.running += 1,
                ScenarioStatus::Complete => stats.complete += 1,
                ScenarioStatus::Failed => stats.failed += 1,
            }
            stats.total_cost += scenario.cost;
        }
        stats
    }

    pub fn balance_of(&self, user: &UserId) -> Option<Decimal> {
        self.users.read().get(user).copied()
    }

    /// True from batch submission until `BatchComplete` arrives. A runner
    /// that never emits `BatchComplete` leaves this set; there is no
    /// internal timeout.
    pub fn is_execution_running(&self) -> bool {
        self.execution.read().running
    }

    pub fn execution_id(&self) -> Option<ExecutionId> {
        self.execution.read().execution_id.clone()
    }
}

fn result_record(scenario: &Scenario, settlement: Settlement) -> ResultRecord {
    ResultRecord {
        record_id: Uuid::new_v4(),
        unique_id: scenario.unique_id.clone(),
        user_id: scenario.user_id.clone(),
        data_size_mb: scenario.data_size_mb,
        chunk_size_kb: scenario.chunk_size_kb,
        allocator: scenario.allocator,
        transmitter: scenario.transmitter,
        target_chain_ids: scenario.target_chain_ids.clone(),
        actual_cost: settlement.actual_cost,
        refund: settlement.refund,
        completed_at: chrono::Utc::now(),
    }
}
