//! Interpretation of the oracle's unstructured output.
//!
//! The oracle prints free-form text. The only contract is the presence or
//! absence of two literal markers, and every caller goes through
//! [`interpret_output`] so that contract lives in one place.

/// Printed by the oracle when it rejects its `-f` argument.
pub const PARSE_ERROR_MARKER: &str = "Error parsing formula";

/// Any occurrence of this substring is a positive verdict.
pub const TRUE_MARKER: &str = "true";

/// What one finished oracle run said.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// The formula was accepted; `true` if it holds for the rule.
    Verdict(bool),
    /// The oracle could not parse the formula.
    ParseError,
}

/// Classify oracle output. A parse error wins over any verdict text.
pub fn interpret_output(output: &str) -> Reply {
    if output.contains(PARSE_ERROR_MARKER) {
        Reply::ParseError
    } else {
        Reply::Verdict(output.contains(TRUE_MARKER))
    }
}
