use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId(pub String);

impl ChainId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Batch handle issued by the runner at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub String);

impl ExecutionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// How a scenario's payload is spread across its target chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocatorStrategy {
    Static,
    RoundRobin,
    Random,
    Available,
    Hash,
}

impl AllocatorStrategy {
    pub const ALL: [AllocatorStrategy; 5] = [
        AllocatorStrategy::Static,
        AllocatorStrategy::RoundRobin,
        AllocatorStrategy::Random,
        AllocatorStrategy::Available,
        AllocatorStrategy::Hash,
    ];
}

/// How chunks are pushed onto the network during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransmitterStrategy {
    OneByOne,
    MultiBurst,
}

impl TransmitterStrategy {
    pub const ALL: [TransmitterStrategy; 2] =
        [TransmitterStrategy::OneByOne, TransmitterStrategy::MultiBurst];
}

/// A sweep axis: either a single value or an inclusive stepped range.
///
/// Expansion policy for degenerate ranges (`step == 0` or `start > end`)
/// is to yield `[start]` rather than error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueRange {
    Fixed(u64),
    Range { start: u64, end: u64, step: u64 },
}

impl ValueRange {
    pub fn expand(&self) -> Vec<u64> {
        match *self {
            ValueRange::Fixed(v) => vec![v],
            ValueRange::Range { start, end, step } => {
                if step == 0 || start > end {
                    return vec![start];
                }
                let mut values = Vec::new();
                let mut v = start;
                while v <= end {
                    values.push(v);
                    match v.checked_add(step) {
                        Some(next) => v = next,
                        None => break,
                    }
                }
                values
            }
        }
    }
}

/// Selects how many chains each scenario targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainSelection {
    /// Every scenario targets the full selected-chain set.
    Fixed,
    /// Sweep over the chain count itself.
    Range { start: u64, end: u64, step: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioStatus {
    Pending,
    Calculating,
    Ready,
    Running,
    Complete,
    Failed,
}

impl ScenarioStatus {
    /// Terminal states receive no further pipeline or runner mutations.
    pub fn is_terminal(self) -> bool {
        matches!(self, ScenarioStatus::Complete | ScenarioStatus::Failed)
    }
}

/// Operator-specified sweep: value ranges plus strategy selections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepRequest {
    pub project: String,
    pub user_id: UserId,
    pub data_size_mb: ValueRange,
    pub chunk_size_kb: ValueRange,
    pub allocators: Vec<AllocatorStrategy>,
    pub transmitters: Vec<TransmitterStrategy>,
    pub chain_selection: ChainSelection,
    pub selected_chains: Vec<ChainId>,
}

/// One concrete, priced, executable unit of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Display-order id, unique within a generation batch, 1-based.
    pub id: u64,
    /// Stable session-global key; never reused across regenerations.
    pub unique_id: String,
    pub user_id: UserId,
    pub data_size_mb: u64,
    pub chunk_size_kb: u64,
    pub allocator: AllocatorStrategy,
    pub transmitter: TransmitterStrategy,
    /// Non-empty prefix of the sorted selected-chain set.
    pub target_chain_ids: Vec<ChainId>,
    /// Zero until admission; the settled fee after completion.
    pub cost: Decimal,
    pub status: ScenarioStatus,
    pub fail_reason: Option<String>,
    /// Append-only, never truncated or reordered.
    pub logs: Vec<String>,
}

impl Scenario {
    /// Parameters the estimator prices a scenario by.
    pub fn estimate_request(&self) -> EstimateRequest {
        EstimateRequest {
            user_id: self.user_id.clone(),
            data_size_mb: self.data_size_mb,
            chunk_size_kb: self.chunk_size_kb,
            allocator: self.allocator,
            transmitter: self.transmitter,
            target_chain_ids: self.target_chain_ids.clone(),
        }
    }
}

/// Pricing query payload for the external estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub user_id: UserId,
    pub data_size_mb: u64,
    pub chunk_size_kb: u64,
    pub allocator: AllocatorStrategy,
    pub transmitter: TransmitterStrategy,
    pub target_chain_ids: Vec<ChainId>,
}

/// Archived outcome of a successfully completed scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub record_id: Uuid,
    pub unique_id: String,
    pub user_id: UserId,
    pub data_size_mb: u64,
    pub chunk_size_kb: u64,
    pub allocator: AllocatorStrategy,
    pub transmitter: TransmitterStrategy,
    pub target_chain_ids: Vec<ChainId>,
    pub actual_cost: Decimal,
    pub refund: Decimal,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Read-only derived counts/totals for collaborators (UI, notifications).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub calculating: usize,
    pub ready: usize,
    pub running: usize,
    pub complete: usize,
    pub failed: usize,
    pub total_cost: Decimal,
}
