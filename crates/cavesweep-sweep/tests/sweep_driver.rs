//! Driver behaviour against a scripted in-process oracle.

use cavesweep_formula::PropertyFamily;
use cavesweep_oracle::{
    CaveOracle, Evaluation, Invocation, Oracle, OracleError, OracleResult, SemanticsMode,
};
use cavesweep_store::{load_records, CellKey, FixedSeconds, Outcome, Records, ResultStore};
use cavesweep_sweep::{cells, Sweep, SweepConfig, SweepError};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One recorded oracle call.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Call {
    rule: u8,
    formula: String,
    mode: SemanticsMode,
    timeout: Duration,
}

/// Answers with `respond` and remembers every question.
struct ScriptedOracle<F> {
    calls: Vec<Call>,
    respond: F,
}

impl<F> ScriptedOracle<F>
where
    F: FnMut(&Invocation<'_>, Duration) -> OracleResult<Evaluation>,
{
    fn new(respond: F) -> Self {
        Self {
            calls: Vec::new(),
            respond,
        }
    }
}

impl<F> Oracle for ScriptedOracle<F>
where
    F: FnMut(&Invocation<'_>, Duration) -> OracleResult<Evaluation>,
{
    async fn evaluate(
        &mut self,
        invocation: &Invocation<'_>,
        timeout: Duration,
    ) -> OracleResult<Evaluation> {
        self.calls.push(Call {
            rule: invocation.rule,
            formula: invocation.formula.to_string(),
            mode: invocation.mode,
            timeout,
        });
        (self.respond)(invocation, timeout)
    }
}

/// Odd rules hold, even rules do not.
fn parity(inv: &Invocation<'_>, _timeout: Duration) -> OracleResult<Evaluation> {
    Ok(Evaluation::Verdict {
        elapsed: Duration::from_millis(250),
        holds: inv.rule % 2 == 1,
    })
}

fn config(store: &Path, family: PropertyFamily, max_k: usize, timeout_secs: u64) -> SweepConfig {
    SweepConfig {
        max_k,
        timeout_secs,
        save_interval_secs: 3600,
        store_path: store.to_path_buf(),
        ..SweepConfig::for_family(family)
    }
}

fn decided(holds: bool) -> Outcome {
    Outcome::Decided {
        elapsed: FixedSeconds::from_tenths(3),
        holds,
    }
}

fn store_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("store")
}

#[tokio::test]
async fn fresh_sweep_evaluates_every_cell_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    let cfg = config(&path, PropertyFamily::KCycle, 3, 60);

    let mut sweep = Sweep::open(cfg, ScriptedOracle::new(parity)).unwrap();
    let summary = sweep.run().await.unwrap();

    assert_eq!(summary.evaluated, 512);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.holds, 256);
    assert_eq!(summary.fails, 256);

    let (store, oracle) = sweep.into_parts();
    let rules: Vec<u8> = oracle.calls.iter().map(|c| c.rule).collect();
    let expected: Vec<u8> = cells(2..=3).map(|c| c.rule).collect();
    assert_eq!(rules, expected);
    assert_eq!(oracle.calls[0].formula, "Ea Eb ((a->b)&(b->a)&~(a==b))");
    assert_eq!(oracle.calls[256].formula, "Ea Eb Ec ((a->b)&(b->c)&(c->a)&~(a==b))");
    assert!(oracle.calls.iter().all(|c| c.mode == SemanticsMode::Omega));
    assert!(oracle.calls.iter().all(|c| c.timeout == Duration::from_secs(60)));

    // Final flush happens even though the save interval never elapsed.
    let on_disk = load_records(&path).unwrap();
    assert_eq!(on_disk.len(), 512);
    assert_eq!(&on_disk, store.records());
    assert_eq!(
        on_disk[&CellKey::new(3, 7)],
        Outcome::Decided {
            elapsed: FixedSeconds::from_tenths(3),
            holds: true
        }
    );
}

#[tokio::test]
async fn settled_store_makes_zero_oracle_calls() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    let cfg = config(&path, PropertyFamily::MinInDegree, 4, 60);

    let records: Records = cells(cfg.k_range()).map(|c| (c, decided(false))).collect();
    let store = ResultStore::with_records(&path, records, cfg.save_interval());

    let mut sweep = Sweep::with_store(cfg, store, ScriptedOracle::new(parity));
    let summary = sweep.run().await.unwrap();

    assert_eq!(summary.evaluated, 0);
    assert_eq!(summary.skipped, 3 * 256);
    assert!(sweep.oracle().calls.is_empty());
}

#[tokio::test]
async fn resumed_sweep_skips_what_the_first_run_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    let cfg = config(&path, PropertyFamily::KCycle, 2, 60);

    let mut first = Sweep::open(cfg.clone(), ScriptedOracle::new(parity)).unwrap();
    first.run().await.unwrap();

    let mut second = Sweep::open(cfg, ScriptedOracle::new(parity)).unwrap();
    let summary = second.run().await.unwrap();
    assert_eq!(summary.evaluated, 0);
    assert_eq!(summary.skipped, 256);
}

#[tokio::test]
async fn timeout_recheck_only_under_a_longer_budget() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    let key = CellKey::new(2, 42);

    let seed = |bound_secs| -> Records {
        cells(2..=2)
            .map(|c| {
                let outcome = if c == key {
                    Outcome::TimedOut { bound_secs }
                } else {
                    decided(true)
                };
                (c, outcome)
            })
            .collect()
    };

    // TIMEOUT@60 under a 120s budget: re-evaluated.
    let cfg = config(&path, PropertyFamily::KCycle, 2, 120);
    let store = ResultStore::with_records(&path, seed(60), cfg.save_interval());
    let mut sweep = Sweep::with_store(cfg, store, ScriptedOracle::new(parity));
    let summary = sweep.run().await.unwrap();
    assert_eq!(summary.evaluated, 1);
    assert_eq!(sweep.oracle().calls[0].rule, 42);
    assert_eq!(sweep.store().get(&key).and_then(Outcome::verdict), Some(false));

    // TIMEOUT@60 under the same 60s budget: left alone.
    let cfg = config(&path, PropertyFamily::KCycle, 2, 60);
    let store = ResultStore::with_records(&path, seed(60), cfg.save_interval());
    let mut sweep = Sweep::with_store(cfg, store, ScriptedOracle::new(parity));
    let summary = sweep.run().await.unwrap();
    assert_eq!(summary.evaluated, 0);
    assert_eq!(
        sweep.store().get(&key),
        Some(&Outcome::TimedOut { bound_secs: 60 })
    );
}

#[tokio::test]
async fn timeouts_are_tagged_with_the_configured_bound() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    let cfg = config(&path, PropertyFamily::KCycle, 2, 90);

    let oracle = ScriptedOracle::new(|inv: &Invocation<'_>, timeout: Duration| {
        if inv.rule == 110 {
            Ok(Evaluation::TimedOut { bound: timeout })
        } else {
            parity(inv, timeout)
        }
    });
    let mut sweep = Sweep::open(cfg, oracle).unwrap();
    let summary = sweep.run().await.unwrap();
    assert_eq!(summary.timeouts, 1);

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.lines().any(|l| l == "2 110 TIMEOUT@90 unknown"));
}

#[tokio::test]
async fn synthesis_fault_is_skipped_and_sweep_continues() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    let cfg = config(&path, PropertyFamily::KCycle, 2, 60);

    let oracle = ScriptedOracle::new(|inv: &Invocation<'_>, timeout: Duration| {
        if inv.rule == 7 {
            Ok(Evaluation::SynthesisFault {
                output: "Error parsing formula".to_string(),
            })
        } else {
            parity(inv, timeout)
        }
    });
    let mut sweep = Sweep::open(cfg, oracle).unwrap();
    let summary = sweep.run().await.unwrap();

    assert_eq!(summary.faults, 1);
    assert_eq!(summary.evaluated, 256);
    assert_eq!(sweep.store().len(), 255);
    assert!(sweep.store().get(&CellKey::new(2, 7)).is_none());
}

#[tokio::test]
async fn launch_failure_aborts_but_keeps_completed_cells() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    let cfg = config(&path, PropertyFamily::KCycle, 2, 60);

    let oracle = ScriptedOracle::new(|inv: &Invocation<'_>, timeout: Duration| {
        if inv.rule == 3 {
            Err(OracleError::Launch {
                program: PathBuf::from("../cave"),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        } else {
            parity(inv, timeout)
        }
    });
    let mut sweep = Sweep::open(cfg, oracle).unwrap();
    let err = sweep.run().await.unwrap_err();
    assert!(matches!(err, SweepError::Oracle(OracleError::Launch { .. })));
    assert_eq!(sweep.oracle().calls.len(), 4);

    let on_disk = load_records(&path).unwrap();
    assert_eq!(on_disk.len(), 3);
}

#[tokio::test]
async fn missing_oracle_executable_is_a_launch_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    let cfg = config(&path, PropertyFamily::MinInDegree, 2, 5);

    let oracle = CaveOracle::new(dir.path().join("no-such-oracle"));
    let mut sweep = Sweep::open(cfg, oracle).unwrap();
    let err = sweep.run().await.unwrap_err();
    assert!(matches!(err, SweepError::Oracle(OracleError::Launch { .. })));
}

#[tokio::test]
async fn zeta_mode_reaches_the_oracle() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    let cfg = SweepConfig {
        mode: SemanticsMode::Zeta,
        ..config(&path, PropertyFamily::MinInDegree, 2, 60)
    };

    let mut sweep = Sweep::open(cfg, ScriptedOracle::new(parity)).unwrap();
    sweep.run().await.unwrap();
    let calls = &sweep.oracle().calls;
    assert!(calls.iter().all(|c| c.mode == SemanticsMode::Zeta));
    assert_eq!(calls[0].formula, "Aa Eb Ec ((b->a)&(c->a)&~(c==b))");
}

#[tokio::test]
async fn results_log_gets_every_recorded_cell() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    let log = dir.path().join("output");
    let cfg = SweepConfig {
        results_log: Some(log.clone()),
        ..config(&path, PropertyFamily::KCycle, 2, 60)
    };

    let mut sweep = Sweep::open(cfg, ScriptedOracle::new(parity)).unwrap();
    sweep.run().await.unwrap();

    let text = std::fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 256);
    assert_eq!(lines[0], "2 0 0.3 false");
    assert_eq!(lines[1], "2 1 0.3 true");
}

#[tokio::test]
async fn oversized_k_is_rejected_before_any_call() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    let cfg = config(&path, PropertyFamily::MinInDegree, 26, 60);
    let store = ResultStore::with_records(&path, Records::new(), cfg.save_interval());

    let mut sweep = Sweep::with_store(cfg, store, ScriptedOracle::new(parity));
    let err = sweep.run().await.unwrap_err();
    assert!(matches!(err, SweepError::Formula(_)));
    assert!(sweep.oracle().calls.is_empty());
}
