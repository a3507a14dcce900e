//! Resumable verification sweeps.
//!
//! A sweep walks every `(k, rule)` cell in order, skips cells the store
//! already settles, asks the oracle about the rest and records the answers.
//! Timed-out cells are retried when the configured timeout grows.

pub mod config;
pub mod driver;

pub use config::{default_max_k, default_store_path, SweepConfig, DEFAULT_TIMEOUT_SECS};
pub use driver::{cells, needs_evaluation, Sweep, SweepSummary};

use cavesweep_formula::FormulaError;
use cavesweep_oracle::OracleError;
use cavesweep_store::StoreError;
use thiserror::Error;

/// Errors that stop a sweep.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid sweep configuration: {0}")]
    Config(String),
}

pub type SweepResult<T> = Result<T, SweepError>;
