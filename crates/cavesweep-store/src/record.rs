//! Result records and their one-line text form.
//!
//! A line is `<k> <rule> <timing-or-tag> <verdict>`. Timings are seconds
//! with one decimal; a timed-out cell carries `TIMEOUT@<bound>` and the
//! verdict `unknown`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Prefix of the timing field for a cell abandoned at its time bound.
pub const TIMEOUT_TAG: &str = "TIMEOUT@";

/// Identifies one sweep cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub k: usize,
    pub rule: u8,
}

impl CellKey {
    pub fn new(k: usize, rule: u8) -> Self {
        Self { k, rule }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(k={}, rule={})", self.k, self.rule)
    }
}

/// Non-negative seconds with one decimal place, stored as tenths so a
/// value survives a write/load cycle unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FixedSeconds(u64);

impl FixedSeconds {
    pub fn from_tenths(tenths: u64) -> Self {
        Self(tenths)
    }

    /// Rounds to the nearest tenth, saturating at `u64::MAX` tenths.
    pub fn from_duration(d: Duration) -> Self {
        Self(u64::try_from((d.as_millis() + 50) / 100).unwrap_or(u64::MAX))
    }

    pub fn tenths(self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 10.0
    }
}

impl fmt::Display for FixedSeconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

impl FromStr for FixedSeconds {
    type Err = LineError;

    /// Decimal seconds such as `12`, `12.3` or `0.05`, rounded half-up to
    /// tenths. Parsed digit by digit so large values stay exact.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || LineError::BadTiming(s.to_string());
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        let is_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !is_digits(whole) || !is_digits(frac) {
            return Err(bad());
        }

        let whole: u64 = whole.parse().map_err(|_| bad())?;
        let mut digits = frac.bytes().map(|b| u64::from(b - b'0'));
        let tenth = digits.next().unwrap_or(0);
        let round_up = u64::from(digits.next().unwrap_or(0) >= 5);

        whole
            .checked_mul(10)
            .and_then(|t| t.checked_add(tenth))
            .and_then(|t| t.checked_add(round_up))
            .map(Self)
            .ok_or_else(bad)
    }
}

/// What is known about a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The oracle answered after `elapsed`.
    Decided { elapsed: FixedSeconds, holds: bool },
    /// The oracle was killed after `bound_secs`; the verdict is unknown.
    TimedOut { bound_secs: u64 },
}

impl Outcome {
    pub fn timeout_bound(&self) -> Option<u64> {
        match self {
            Outcome::TimedOut { bound_secs } => Some(*bound_secs),
            Outcome::Decided { .. } => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.timeout_bound().is_some()
    }

    pub fn verdict(&self) -> Option<bool> {
        match self {
            Outcome::Decided { holds, .. } => Some(*holds),
            Outcome::TimedOut { .. } => None,
        }
    }

    fn timing_field(&self) -> String {
        match self {
            Outcome::Decided { elapsed, .. } => elapsed.to_string(),
            Outcome::TimedOut { bound_secs } => format!("{TIMEOUT_TAG}{bound_secs}"),
        }
    }

    fn verdict_field(&self) -> &'static str {
        match self.verdict() {
            Some(true) => "true",
            Some(false) => "false",
            None => "unknown",
        }
    }
}

/// Why a store line could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("invalid parameter field '{0}'")]
    BadK(String),

    #[error("invalid rule field '{0}' (expected 0..=255)")]
    BadRule(String),

    #[error("invalid timing field '{0}'")]
    BadTiming(String),

    #[error("invalid verdict field '{0}'")]
    BadVerdict(String),

    #[error("timing '{timing}' does not agree with verdict '{verdict}'")]
    Inconsistent { timing: String, verdict: String },
}

/// One persisted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultRecord {
    pub key: CellKey,
    pub outcome: Outcome,
}

impl ResultRecord {
    pub fn new(key: CellKey, outcome: Outcome) -> Self {
        Self { key, outcome }
    }

    /// Parse one line. `Ok(None)` for lines with fewer than four fields.
    pub fn parse_line(line: &str) -> Result<Option<Self>, LineError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return Ok(None);
        }
        let (k, rule, timing, verdict) = (fields[0], fields[1], fields[2], fields[3]);

        let k: usize = k.parse().map_err(|_| LineError::BadK(k.to_string()))?;
        let rule: u8 = rule.parse().map_err(|_| LineError::BadRule(rule.to_string()))?;
        let holds = parse_verdict(verdict)?;

        let inconsistent = || LineError::Inconsistent {
            timing: timing.to_string(),
            verdict: verdict.to_string(),
        };
        let outcome = match timing.strip_prefix(TIMEOUT_TAG) {
            Some(bound) => {
                let bound_secs = bound
                    .parse()
                    .map_err(|_| LineError::BadTiming(timing.to_string()))?;
                if holds.is_some() {
                    return Err(inconsistent());
                }
                Outcome::TimedOut { bound_secs }
            }
            None => {
                let elapsed = timing.parse()?;
                let holds = holds.ok_or_else(inconsistent)?;
                Outcome::Decided { elapsed, holds }
            }
        };

        Ok(Some(Self::new(CellKey::new(k, rule), outcome)))
    }
}

impl fmt::Display for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.key.k,
            self.key.rule,
            self.outcome.timing_field(),
            self.outcome.verdict_field()
        )
    }
}

/// Accepts the lowercase tokens written here and the capitalised ones
/// (`True`, `False`, `None`) found in older store files.
fn parse_verdict(s: &str) -> Result<Option<bool>, LineError> {
    match s {
        "true" | "True" => Ok(Some(true)),
        "false" | "False" => Ok(Some(false)),
        "unknown" | "None" => Ok(None),
        _ => Err(LineError::BadVerdict(s.to_string())),
    }
}
