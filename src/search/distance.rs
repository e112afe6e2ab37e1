//! Branch distance heuristic.
//!
//! Converts an observed runtime comparison into a continuous fitness signal:
//! how close was the comparison to taking the target side? Raw distances are
//! computed per opcode family over paired operand traces, then normalized
//! into `[0, 1)` with `x / (x + 1)`.

use serde::{Deserialize, Serialize};

use super::SearchError;

/// Comparison opcode observed at an instrumented branch site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    /// Equality.
    Eq,
    /// Inequality.
    Neq,
    /// Greater-than.
    Gt,
    /// Signed greater-than.
    Sgt,
    /// Less-than.
    Lt,
    /// Signed less-than.
    Slt,
    /// Greater-or-equal.
    Ge,
    /// Less-or-equal.
    Le,
}

impl Opcode {
    /// Parse an opcode from its trace mnemonic.
    ///
    /// Unknown mnemonics are an error, never a silent zero distance.
    pub fn parse(mnemonic: &str) -> Result<Self, SearchError> {
        match mnemonic {
            "EQ" => Ok(Self::Eq),
            "NEQ" => Ok(Self::Neq),
            "GT" => Ok(Self::Gt),
            "SGT" => Ok(Self::Sgt),
            "LT" => Ok(Self::Lt),
            "SLT" => Ok(Self::Slt),
            "GE" => Ok(Self::Ge),
            "LE" => Ok(Self::Le),
            other => Err(SearchError::UnknownOpcode(other.to_string())),
        }
    }

    /// Trace mnemonic for this opcode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Neq => "NEQ",
            Self::Gt => "GT",
            Self::Sgt => "SGT",
            Self::Lt => "LT",
            Self::Slt => "SLT",
            Self::Ge => "GE",
            Self::Le => "LE",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized branch distance for covering the `target` side of a comparison.
///
/// `left` and `right` are parallel operand traces from multiple executions of
/// the same comparison site. The result is in `[0, 1)` and is `0` iff the
/// comparison already held for some paired sample under `target`.
pub fn branch_distance(
    opcode: Opcode,
    left: &[f64],
    right: &[f64],
    target: bool,
) -> Result<f64, SearchError> {
    if left.len() != right.len() {
        return Err(SearchError::TraceLengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    if left.is_empty() {
        return Err(SearchError::EmptyTraces);
    }

    let raw = match opcode {
        Opcode::Eq => {
            if target {
                equal(left, right)
            } else {
                not_equal(left, right)
            }
        }
        Opcode::Neq => {
            if target {
                not_equal(left, right)
            } else {
                equal(left, right)
            }
        }
        Opcode::Gt | Opcode::Sgt => {
            if target {
                greater(left, right)
            } else {
                smaller_equal(left, right)
            }
        }
        Opcode::Lt | Opcode::Slt => {
            if target {
                smaller(left, right)
            } else {
                greater_equal(left, right)
            }
        }
        Opcode::Ge => {
            if target {
                greater_equal(left, right)
            } else {
                smaller(left, right)
            }
        }
        Opcode::Le => {
            if target {
                smaller_equal(left, right)
            } else {
                greater(left, right)
            }
        }
    };

    if raw.is_nan() {
        return Err(SearchError::NanDistance {
            context: format!("branch distance for opcode {opcode}"),
        });
    }

    Ok(normalize(raw))
}

/// Normalize a raw distance into `[0, 1)`; strictly increasing, `0` iff raw is `0`.
pub fn normalize(raw: f64) -> f64 {
    raw / (raw + 1.0)
}

/// Minimum gap toward equality across all paired samples.
fn equal(left: &[f64], right: &[f64]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(l, r)| (l - r).abs())
        .fold(f64::MAX, f64::min)
}

/// Step toward inequality: `1` while every sample is equal, `0` once any differs.
fn not_equal(left: &[f64], right: &[f64]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(l, r)| if l == r { 1.0 } else { 0.0 })
        .fold(f64::MAX, f64::min)
}

/// Closest near-miss for `left > right`; satisfied samples contribute `0`.
fn greater(left: &[f64], right: &[f64]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(l, r)| if l > r { 0.0 } else { r - l + 1.0 })
        .fold(f64::MAX, f64::min)
}

fn greater_equal(left: &[f64], right: &[f64]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(l, r)| if l >= r { 0.0 } else { r - l })
        .fold(f64::MAX, f64::min)
}

fn smaller(left: &[f64], right: &[f64]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(l, r)| if l < r { 0.0 } else { l - r + 1.0 })
        .fold(f64::MAX, f64::min)
}

fn smaller_equal(left: &[f64], right: &[f64]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(l, r)| if l <= r { 0.0 } else { l - r })
        .fold(f64::MAX, f64::min)
}
