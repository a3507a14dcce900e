//! Sweep configuration.

use crate::{SweepError, SweepResult};
use cavesweep_formula::PropertyFamily;
use cavesweep_oracle::SemanticsMode;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

/// Default per-cell time bound in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Largest `k` swept when none is given.
pub fn default_max_k(family: PropertyFamily) -> usize {
    match family {
        PropertyFamily::MinInDegree => 6,
        PropertyFamily::KCycle => 16,
    }
}

/// Store file used when none is given.
pub fn default_store_path(family: PropertyFamily) -> PathBuf {
    match family {
        PropertyFamily::MinInDegree => PathBuf::from("./indegree"),
        PropertyFamily::KCycle => PathBuf::from("./cycles"),
    }
}

/// Everything one sweep needs to know.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub family: PropertyFamily,
    pub min_k: usize,
    pub max_k: usize,
    pub mode: SemanticsMode,
    /// Hard per-cell bound; also the value written into timeout tags.
    pub timeout_secs: u64,
    /// Minimum time between two store rewrites.
    pub save_interval_secs: u64,
    pub store_path: PathBuf,
    /// Optional append-only log of every record as it is produced.
    pub results_log: Option<PathBuf>,
}

impl SweepConfig {
    /// Defaults for `family`: its usual `k` bound and store file, omega
    /// semantics, and a save interval equal to the timeout.
    pub fn for_family(family: PropertyFamily) -> Self {
        Self {
            family,
            min_k: family.min_k(),
            max_k: default_max_k(family),
            mode: SemanticsMode::Omega,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            save_interval_secs: DEFAULT_TIMEOUT_SECS,
            store_path: default_store_path(family),
            results_log: None,
        }
    }

    pub fn k_range(&self) -> RangeInclusive<usize> {
        self.min_k..=self.max_k
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }

    /// Number of cells in the sweep space.
    pub fn cell_count(&self) -> usize {
        self.k_range().count() * 256
    }

    pub fn validate(&self) -> SweepResult<()> {
        if self.timeout_secs == 0 {
            return Err(SweepError::Config(
                "timeout must be at least one second".to_string(),
            ));
        }
        if self.min_k > self.max_k {
            return Err(SweepError::Config(format!(
                "empty parameter range {}..={}",
                self.min_k, self.max_k
            )));
        }
        // Both ends must be synthesizable; everything between is too.
        cavesweep_formula::synthesize(self.family, self.min_k)?;
        cavesweep_formula::synthesize(self.family, self.max_k)?;
        Ok(())
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self::for_family(PropertyFamily::KCycle)
    }
}
