//! Chainbench engine
//!
//! The sweep engine for the data-chain operator console: expands parameter
//! sweeps into concrete scenarios, prices and admits them against a per-user
//! budget, and tracks batch execution through asynchronous progress events.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use chainbench_engine::prelude::*;
//!
//! let engine = Arc::new(SweepEngine::new(estimator, runner, archive));
//! engine.generate(&request)?;
//! engine.recalculate(&balances).await?;
//! let execution_id = engine.execute().await?;
//!
//! // Progress events flow in through a consumer loop.
//! tokio::spawn(drive_progress(engine.clone(), progress_rx));
//! ```

pub mod api;
pub mod engine;
pub mod error;
pub mod generator;
pub mod ledger;
pub mod progress;
pub mod state_machine;
pub mod types;

pub mod test_harness;

pub use api::*;
pub use engine::SweepEngine;
pub use error::*;
pub use types::*;

pub mod prelude {
    pub use crate::api::{Estimator, ResultSink, Runner};
    pub use crate::engine::SweepEngine;
    pub use crate::error::{
        EngineError, EstimateError, ExecuteError, GenerateError, GuardRejection,
    };
    pub use crate::progress::{
        drive_progress, ProgressBody, ProgressEvent, ScenarioKey, ScenarioUpdate, Settlement,
    };
    pub use crate::types::{
        AllocatorStrategy, ChainId, ChainSelection, ExecutionId, QueueStats, Scenario,
        ScenarioStatus, SweepRequest, TransmitterStrategy, UserId, ValueRange,
    };
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
