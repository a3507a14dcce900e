//! Command-line interface for cavesweep.

use cavesweep_formula::{synthesize, FormulaError, PropertyFamily};
use cavesweep_oracle::{CaveOracle, SemanticsMode, DEFAULT_ORACLE};
use cavesweep_sweep::{
    default_max_k, default_store_path, Sweep, SweepConfig, SweepError, DEFAULT_TIMEOUT_SECS,
};
use clap::{Parser, Subcommand};
use miette::Diagnostic;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status after Ctrl-C, as a shell reports SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CAVESWEEP_BUILD_INFO"),
    ")"
);

/// CLI error with diagnostics for pretty printing.
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("sweep failed: {0}")]
    #[diagnostic(
        code(cavesweep::sweep),
        help("cells completed before the failure were flushed to the store; re-run to resume")
    )]
    Sweep(#[from] SweepError),

    #[error(transparent)]
    #[diagnostic(code(cavesweep::formula))]
    Formula(#[from] FormulaError),

    #[error("failed to start async runtime: {message}")]
    Runtime { message: String },

    #[error("interrupted")]
    #[diagnostic(
        code(cavesweep::interrupted),
        help("the store was flushed; re-run the same command to resume")
    )]
    Interrupted,
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "cavesweep", version, long_version = LONG_VERSION)]
#[command(about = "Resumable oracle sweeps over (k, rule) parameter cells", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run or resume a sweep over k x rule 0..=255
    Sweep {
        /// Property family (in-degree or k-cycle)
        #[arg(short, long, value_name = "FAMILY")]
        family: PropertyFamily,

        /// Smallest k to sweep
        #[arg(long, default_value = "2")]
        min_k: usize,

        /// Largest k to sweep (default: 6 for in-degree, 16 for k-cycle)
        #[arg(long)]
        max_k: Option<usize>,

        /// Use zeta semantics instead of omega
        #[arg(long)]
        zeta: bool,

        /// Hard time bound per cell, in seconds
        #[arg(short, long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,

        /// Minimum seconds between store rewrites (default: the timeout)
        #[arg(long, value_name = "SECS")]
        save_every: Option<u64>,

        /// Result store file (default: ./indegree or ./cycles)
        #[arg(short, long, value_name = "PATH")]
        store: Option<PathBuf>,

        /// Oracle executable
        #[arg(long, value_name = "PATH", default_value = DEFAULT_ORACLE)]
        oracle: PathBuf,

        /// Extra argument placed before the oracle's own arguments (repeatable)
        #[arg(long = "oracle-arg", value_name = "ARG", allow_hyphen_values = true)]
        oracle_args: Vec<String>,

        /// Append every recorded cell to this file as it completes
        #[arg(long, value_name = "PATH")]
        results_log: Option<PathBuf>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the formula for a family and k
    Formula {
        /// Property family (in-degree or k-cycle)
        #[arg(value_name = "FAMILY")]
        family: PropertyFamily,

        /// Parameter size
        #[arg(value_name = "K")]
        k: usize,
    },
}

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .build(),
        )
    }))
    .ok();

    let cli = Cli::parse();

    let filter = if matches!(&cli.command, Commands::Sweep { verbose: true, .. }) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let result = match cli.command {
        Commands::Sweep {
            family,
            min_k,
            max_k,
            zeta,
            timeout,
            save_every,
            store,
            oracle,
            oracle_args,
            results_log,
            verbose: _,
        } => {
            let config = SweepConfig {
                family,
                min_k,
                max_k: max_k.unwrap_or_else(|| default_max_k(family)),
                mode: if zeta {
                    SemanticsMode::Zeta
                } else {
                    SemanticsMode::Omega
                },
                timeout_secs: timeout,
                save_interval_secs: save_every.unwrap_or(timeout),
                store_path: store.unwrap_or_else(|| default_store_path(family)),
                results_log,
            };
            let oracle = CaveOracle::new(oracle).with_leading_args(oracle_args);
            cmd_sweep(config, oracle)
        }
        Commands::Formula { family, k } => cmd_formula(family, k),
    };

    if let Err(e) = result {
        let code = if matches!(e, CliError::Interrupted) {
            EXIT_INTERRUPTED
        } else {
            1
        };
        eprintln!("{:?}", miette::Report::new(e));
        std::process::exit(code);
    }
}

fn cmd_formula(family: PropertyFamily, k: usize) -> CliResult<()> {
    let formula = synthesize(family, k)?;
    println!("{}", formula);
    Ok(())
}

fn cmd_sweep(config: SweepConfig, oracle: CaveOracle) -> CliResult<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime {
            message: e.to_string(),
        })?;
    runtime.block_on(run_sweep(config, oracle))
}

async fn run_sweep(config: SweepConfig, oracle: CaveOracle) -> CliResult<()> {
    let store_path = config.store_path.clone();
    let cells = config.cell_count();
    info!(oracle = %oracle.program().display(), "using oracle");

    let mut sweep = Sweep::open(config, oracle)?;
    let start = Instant::now();

    // Dropping the run future on Ctrl-C kills the running oracle.
    let result = tokio::select! {
        result = sweep.run() => Some(result),
        () = interrupted() => None,
    };

    let Some(result) = result else {
        warn!("interrupted, flushing result store");
        sweep.flush()?;
        return Err(CliError::Interrupted);
    };
    let summary = result?;
    let elapsed = start.elapsed();

    println!();
    println!("Result: SWEEP COMPLETE");
    println!("  Cells: {}", cells);
    println!("  Skipped (already settled): {}", summary.skipped);
    println!("  Evaluated: {}", summary.evaluated);
    println!("    true: {}", summary.holds);
    println!("    false: {}", summary.fails);
    println!("    timed out: {}", summary.timeouts);
    println!("    formula rejected: {}", summary.faults);
    println!("  Records: {}", sweep.store().len());
    println!("  Store: {}", store_path.display());
    println!("  Time: {:.2}s", elapsed.as_secs_f64());

    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
