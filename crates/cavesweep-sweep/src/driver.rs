//! The sweep loop.

use crate::config::SweepConfig;
use crate::SweepResult;
use cavesweep_formula::{synthesize, Formula};
use cavesweep_oracle::{Evaluation, Invocation, Oracle};
use cavesweep_store::{CellKey, FixedSeconds, Outcome, ResultLog, ResultRecord, ResultStore};
use std::fmt;
use std::ops::RangeInclusive;
use tracing::{debug, info, warn};

/// Whether a cell must be (re-)evaluated under the current timeout.
///
/// Unrecorded cells always are. A timed-out cell is retried only when its
/// recorded bound is strictly below `timeout_secs`. Decided cells never are.
pub fn needs_evaluation(existing: Option<&Outcome>, timeout_secs: u64) -> bool {
    match existing {
        None => true,
        Some(Outcome::TimedOut { bound_secs }) => *bound_secs < timeout_secs,
        Some(Outcome::Decided { .. }) => false,
    }
}

/// All cells for `k_range`, `k` ascending then rule 0..=255.
pub fn cells(k_range: RangeInclusive<usize>) -> impl Iterator<Item = CellKey> {
    k_range.flat_map(|k| (0..=u8::MAX).map(move |rule| CellKey::new(k, rule)))
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Cells whose record already settled them.
    pub skipped: usize,
    /// Oracle invocations made.
    pub evaluated: usize,
    pub holds: usize,
    pub fails: usize,
    pub timeouts: usize,
    /// Invocations whose formula the oracle rejected.
    pub faults: usize,
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} evaluated ({} true, {} false, {} timed out, {} faults), {} skipped",
            self.evaluated, self.holds, self.fails, self.timeouts, self.faults, self.skipped
        )
    }
}

/// One sweep: configuration, the store it owns, and the oracle it asks.
pub struct Sweep<O> {
    config: SweepConfig,
    store: ResultStore,
    oracle: O,
    log: Option<ResultLog>,
}

impl<O: Oracle> Sweep<O> {
    /// Validate `config`, then open its store and results log.
    pub fn open(config: SweepConfig, oracle: O) -> SweepResult<Self> {
        config.validate()?;
        let store = ResultStore::open(&config.store_path, config.save_interval())?;
        let log = match &config.results_log {
            Some(path) => Some(ResultLog::open(path)?),
            None => None,
        };
        Ok(Self {
            config,
            store,
            oracle,
            log,
        })
    }

    /// Sweep over an already loaded store; no results log.
    pub fn with_store(config: SweepConfig, store: ResultStore, oracle: O) -> Self {
        Self {
            config,
            store,
            oracle,
            log: None,
        }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn into_parts(self) -> (ResultStore, O) {
        (self.store, self.oracle)
    }

    /// Write the store unconditionally.
    pub fn flush(&mut self) -> SweepResult<()> {
        self.store.flush()?;
        Ok(())
    }

    /// Evaluate every cell that needs it, then flush.
    ///
    /// The store is flushed even when the loop stops on an error, so
    /// completed cells are not lost.
    pub async fn run(&mut self) -> SweepResult<SweepSummary> {
        self.config.validate()?;
        info!(
            family = %self.config.family,
            k_min = self.config.min_k,
            k_max = self.config.max_k,
            mode = %self.config.mode,
            timeout_secs = self.config.timeout_secs,
            cells = self.config.cell_count(),
            "starting sweep"
        );

        let mut summary = SweepSummary::default();
        let result = self.run_cells(&mut summary).await;
        let flushed = self.flush();
        result?;
        flushed?;

        info!(%summary, "sweep finished");
        Ok(summary)
    }

    async fn run_cells(&mut self, summary: &mut SweepSummary) -> SweepResult<()> {
        let timeout_secs = self.config.timeout_secs;
        for k in self.config.k_range() {
            // Synthesized on first use; shared by every rule at this k.
            let mut formula: Option<Formula> = None;
            for rule in 0..=u8::MAX {
                let key = CellKey::new(k, rule);
                if !needs_evaluation(self.store.get(&key), timeout_secs) {
                    debug!(k, rule, "already settled");
                    summary.skipped += 1;
                    continue;
                }
                let formula: &Formula = match &mut formula {
                    Some(f) => f,
                    slot @ None => slot.insert(synthesize(self.config.family, k)?),
                };
                self.evaluate_cell(key, formula, summary).await?;
            }
        }
        Ok(())
    }

    async fn evaluate_cell(
        &mut self,
        key: CellKey,
        formula: &Formula,
        summary: &mut SweepSummary,
    ) -> SweepResult<()> {
        info!(k = key.k, rule = key.rule, "checking");
        let invocation = Invocation::new(key.rule, formula, self.config.mode);
        let evaluation = self
            .oracle
            .evaluate(&invocation, self.config.timeout())
            .await?;
        summary.evaluated += 1;

        let outcome = match evaluation {
            Evaluation::Verdict { elapsed, holds } => {
                if holds {
                    summary.holds += 1;
                } else {
                    summary.fails += 1;
                }
                Outcome::Decided {
                    elapsed: FixedSeconds::from_duration(elapsed),
                    holds,
                }
            }
            Evaluation::TimedOut { .. } => {
                summary.timeouts += 1;
                Outcome::TimedOut {
                    bound_secs: self.config.timeout_secs,
                }
            }
            Evaluation::SynthesisFault { output } => {
                summary.faults += 1;
                warn!(
                    k = key.k,
                    rule = key.rule,
                    family = %self.config.family,
                    %formula,
                    output = %output.trim(),
                    "oracle rejected formula, cell not recorded"
                );
                return Ok(());
            }
        };

        let record = ResultRecord::new(key, outcome);
        info!(%record, "recorded");
        self.store.record(key, outcome);
        if let Some(log) = &mut self.log {
            log.append(&record)?;
        }
        self.store.flush_if_due()?;
        Ok(())
    }
}
