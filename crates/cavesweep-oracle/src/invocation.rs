//! Command-line contract of the oracle: `-e <rule> -f <formula> [-Z]`.

use cavesweep_formula::Formula;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How the oracle interprets infinite behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SemanticsMode {
    #[default]
    Omega,
    Zeta,
}

impl SemanticsMode {
    pub fn name(self) -> &'static str {
        match self {
            SemanticsMode::Omega => "omega",
            SemanticsMode::Zeta => "zeta",
        }
    }
}

impl fmt::Display for SemanticsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown semantics mode '{0}' (expected 'omega' or 'zeta')")]
pub struct UnknownMode(pub String);

impl FromStr for SemanticsMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "omega" => Ok(SemanticsMode::Omega),
            "zeta" => Ok(SemanticsMode::Zeta),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// One oracle question: does `formula` hold for automaton rule `rule`?
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub rule: u8,
    pub formula: &'a Formula,
    pub mode: SemanticsMode,
}

impl<'a> Invocation<'a> {
    pub fn new(rule: u8, formula: &'a Formula, mode: SemanticsMode) -> Self {
        Self {
            rule,
            formula,
            mode,
        }
    }

    /// Arguments passed to the oracle executable, without the program name.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-e".to_string(),
            self.rule.to_string(),
            "-f".to_string(),
            self.formula.as_str().to_string(),
        ];
        if self.mode == SemanticsMode::Zeta {
            args.push("-Z".to_string());
        }
        args
    }
}
