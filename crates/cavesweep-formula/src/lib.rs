//! Formula synthesis for oracle sweeps.
//!
//! Maps a property family and a size parameter `k` to a formula in the
//! oracle's quantified input language. Synthesis is pure: no state, no I/O.
//!
//! The concrete syntax is:
//! - quantifiers `A<v>` / `E<v>`, separated by single spaces,
//! - one parenthesised body, a conjunction of clauses joined by `&`,
//! - edges `(<u>-><v>)` and distinctness clauses `~(<u>==<v>)`.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Pool of single-letter variable names available to a formula.
pub const VARIABLES: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

/// Smallest `k` either family accepts.
pub const MIN_K: usize = 2;

/// Formula synthesis error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("invalid parameter: {family} requires {min} <= k <= {max}, got k = {k}")]
    InvalidParameter {
        family: PropertyFamily,
        k: usize,
        min: usize,
        max: usize,
    },
}

pub type FormulaResult<T> = Result<T, FormulaError>;

/// Graph property a formula asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyFamily {
    /// Some vertex has at least `k` distinct in-neighbours.
    MinInDegree,
    /// Some directed cycle has length exactly `k`.
    KCycle,
}

impl PropertyFamily {
    pub const ALL: [PropertyFamily; 2] = [PropertyFamily::MinInDegree, PropertyFamily::KCycle];

    /// Name used on the command line and in logs.
    pub fn name(self) -> &'static str {
        match self {
            PropertyFamily::MinInDegree => "in-degree",
            PropertyFamily::KCycle => "k-cycle",
        }
    }

    pub fn min_k(self) -> usize {
        MIN_K
    }

    /// Largest `k` whose formula fits in the variable pool.
    pub fn max_k(self) -> usize {
        match self {
            // pivot plus k neighbours
            PropertyFamily::MinInDegree => VARIABLES.len() - 1,
            PropertyFamily::KCycle => VARIABLES.len(),
        }
    }

    fn check_k(self, k: usize) -> FormulaResult<()> {
        if k < self.min_k() || k > self.max_k() {
            return Err(FormulaError::InvalidParameter {
                family: self,
                k,
                min: self.min_k(),
                max: self.max_k(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for PropertyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a property family name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown property family '{0}' (expected 'in-degree' or 'k-cycle')")]
pub struct UnknownFamily(pub String);

impl FromStr for PropertyFamily {
    type Err = UnknownFamily;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in-degree" | "indegree" | "min-in-degree" => Ok(PropertyFamily::MinInDegree),
            "k-cycle" | "kcycle" | "cycle" | "cycles" => Ok(PropertyFamily::KCycle),
            _ => Err(UnknownFamily(s.to_string())),
        }
    }
}

/// A synthesized formula in the oracle's input syntax.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Formula(String);

impl Formula {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Quantifier tokens preceding the body.
    fn quantifiers(&self) -> impl Iterator<Item = &str> {
        let prefix = match self.0.find('(') {
            Some(idx) => &self.0[..idx],
            None => self.0.as_str(),
        };
        prefix.split_whitespace()
    }

    pub fn quantifier_count(&self) -> usize {
        self.quantifiers().count()
    }

    pub fn existential_count(&self) -> usize {
        self.quantifiers().filter(|q| q.starts_with('E')).count()
    }

    pub fn universal_count(&self) -> usize {
        self.quantifiers().filter(|q| q.starts_with('A')).count()
    }

    pub fn edge_count(&self) -> usize {
        self.0.matches("->").count()
    }

    pub fn distinctness_count(&self) -> usize {
        self.0.matches("~(").count()
    }

    /// True when every `(` has a matching `)` and nesting never goes negative.
    pub fn is_balanced(&self) -> bool {
        let mut depth: usize = 0;
        for c in self.0.chars() {
            match c {
                '(' => depth += 1,
                ')' => match depth.checked_sub(1) {
                    Some(d) => depth = d,
                    None => return false,
                },
                _ => {}
            }
        }
        depth == 0
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Formula {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Synthesize the formula for `family` at size `k`.
pub fn synthesize(family: PropertyFamily, k: usize) -> FormulaResult<Formula> {
    family.check_k(k)?;
    let formula = match family {
        PropertyFamily::MinInDegree => min_in_degree(k),
        PropertyFamily::KCycle => k_cycle(k),
    };
    Ok(formula)
}

fn var(i: usize) -> char {
    VARIABLES[i] as char
}

/// Accumulates a quantifier prefix and a conjunction of clauses.
struct FormulaBuilder {
    prefix: String,
    clauses: Vec<String>,
}

impl FormulaBuilder {
    fn new() -> Self {
        Self {
            prefix: String::new(),
            clauses: Vec::new(),
        }
    }

    fn forall(&mut self, v: char) {
        self.prefix.push('A');
        self.prefix.push(v);
        self.prefix.push(' ');
    }

    fn exists(&mut self, v: char) {
        self.prefix.push('E');
        self.prefix.push(v);
        self.prefix.push(' ');
    }

    fn edge(&mut self, from: char, to: char) {
        self.clauses.push(format!("({from}->{to})"));
    }

    fn distinct(&mut self, a: char, b: char) {
        self.clauses.push(format!("~({a}=={b})"));
    }

    fn finish(self) -> Formula {
        let mut out = self.prefix;
        out.push('(');
        out.push_str(&self.clauses.join("&"));
        out.push(')');
        Formula(out)
    }
}

/// `Aa Eb .. ((b->a)&..&~(c==b)&..)`: pivot `a` has `k` distinct in-neighbours.
fn min_in_degree(k: usize) -> Formula {
    let pivot = var(0);
    let neighbour = |i: usize| var(i + 1);

    let mut b = FormulaBuilder::new();
    b.forall(pivot);
    for i in 0..k {
        b.exists(neighbour(i));
    }
    for i in 0..k {
        b.edge(neighbour(i), pivot);
    }
    for i in 0..k {
        for j in 0..i {
            b.distinct(neighbour(i), neighbour(j));
        }
    }
    b.finish()
}

/// `Ea Eb .. ((a->b)&..&(z->a)&~(a==v_d)..)`: a ring of `k` vertices whose
/// witness does not repeat with any period `d` dividing `k`, `d < k`.
/// Period 1 is a self-loop, so `~(a==b)` is always present.
fn k_cycle(k: usize) -> Formula {
    let mut b = FormulaBuilder::new();
    for i in 0..k {
        b.exists(var(i));
    }
    for i in 0..k {
        b.edge(var(i), var((i + 1) % k));
    }
    for d in proper_divisors(k) {
        b.distinct(var(0), var(d));
    }
    b.finish()
}

/// Divisors `d` of `k` with `1 <= d < k`, ascending.
pub fn proper_divisors(k: usize) -> impl Iterator<Item = usize> {
    (1..k).filter(move |d| k % d == 0)
}
