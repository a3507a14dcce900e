//! Invocation of the external verification oracle.
//!
//! The oracle is an opaque executable. This crate owns its command-line
//! contract ([`Invocation`]), a deadline-bounded process runner
//! ([`run_bounded`]) and the interpretation of its output
//! ([`interpret_output`]).

pub mod exec;
pub mod invocation;
pub mod reply;

pub use exec::{run_bounded, RunOutcome};
pub use invocation::{Invocation, SemanticsMode, UnknownMode};
pub use reply::{interpret_output, Reply};

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default location of the oracle executable.
pub const DEFAULT_ORACLE: &str = "../cave";

/// Oracle invocation error.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("failed to launch oracle '{}': {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed while waiting for oracle (pid {pid:?}): {source}")]
    Wait {
        pid: Option<u32>,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to kill timed-out oracle (pid {pid:?}): {source}")]
    Kill {
        pid: Option<u32>,
        #[source]
        source: std::io::Error,
    },
}

pub type OracleResult<T> = Result<T, OracleError>;

/// Interpreted outcome of one oracle question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// The oracle answered within the bound.
    Verdict { elapsed: Duration, holds: bool },
    /// The oracle was killed at the bound.
    TimedOut { bound: Duration },
    /// The oracle rejected the formula; its output is kept for diagnostics.
    SynthesisFault { output: String },
}

/// Something that can answer oracle questions under a time bound.
#[allow(async_fn_in_trait)]
pub trait Oracle {
    async fn evaluate(
        &mut self,
        invocation: &Invocation<'_>,
        timeout: Duration,
    ) -> OracleResult<Evaluation>;
}

/// The real oracle: an executable run once per question.
#[derive(Debug, Clone)]
pub struct CaveOracle {
    program: PathBuf,
    /// Placed before the invocation's own arguments, e.g. a script path
    /// when `program` is an interpreter.
    leading_args: Vec<String>,
}

impl CaveOracle {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for CaveOracle {
    fn default() -> Self {
        Self::new(DEFAULT_ORACLE)
    }
}

impl Oracle for CaveOracle {
    async fn evaluate(
        &mut self,
        invocation: &Invocation<'_>,
        timeout: Duration,
    ) -> OracleResult<Evaluation> {
        let mut args = self.leading_args.clone();
        args.extend(invocation.args());
        debug!(program = %self.program.display(), ?args, "invoking oracle");

        match run_bounded(&self.program, &args, timeout).await? {
            RunOutcome::Completed {
                elapsed, output, ..
            } => match interpret_output(&output) {
                Reply::Verdict(holds) => Ok(Evaluation::Verdict { elapsed, holds }),
                Reply::ParseError => Ok(Evaluation::SynthesisFault { output }),
            },
            RunOutcome::TimedOut { bound } => Ok(Evaluation::TimedOut { bound }),
        }
    }
}
