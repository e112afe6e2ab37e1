//! Execution contract between the search core and the external runner.
//!
//! The runner instruments and executes a candidate test case and reports
//! what happened as an [`ExecutionResult`]. Execution faults of the subject
//! program are data on the result, never errors: a runner that cannot
//! execute an encoding (crash, timeout) degrades to a "maximally uncovered"
//! result instead of propagating a failure into the search loop.

use std::collections::BTreeSet;

use super::TestCase;
use super::distance::Opcode;

/// Operand values observed at one instrumented comparison site across the
/// samples of a single execution.
#[derive(Debug, Clone)]
pub struct ComparisonTrace {
    /// Stable identifier of the comparison site.
    pub site: String,
    /// Comparison operator at the site.
    pub opcode: Opcode,
    /// Left operand samples.
    pub left: Vec<f64>,
    /// Right operand samples, parallel to `left`.
    pub right: Vec<f64>,
}

/// Outcome of executing one encoding.
///
/// Owned by the encoding after evaluation and replaced wholesale on the next
/// run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    traces: Vec<ComparisonTrace>,
    hits: BTreeSet<String>,
    exceptions: Option<String>,
    crashed: bool,
}

impl ExecutionResult {
    /// Empty result (nothing executed, nothing covered).
    pub fn new() -> Self {
        Self::default()
    }

    /// Result for an execution the runner could not complete. Carries no
    /// coverage, so every objective scores it maximally unfit.
    pub fn crashed() -> Self {
        Self {
            crashed: true,
            ..Self::default()
        }
    }

    /// Record a comparison trace.
    pub fn with_trace(mut self, trace: ComparisonTrace) -> Self {
        self.traces.push(trace);
        self
    }

    /// Record a covered construct (function entry, taken branch side).
    pub fn with_hit(mut self, id: impl Into<String>) -> Self {
        self.hits.insert(id.into());
        self
    }

    /// Attach a fault signature raised by the subject program.
    pub fn with_exception(mut self, signature: impl Into<String>) -> Self {
        self.exceptions = Some(signature.into());
        self
    }

    /// Whether the subject program raised a fault during execution.
    pub fn has_exceptions(&self) -> bool {
        self.exceptions.is_some()
    }

    /// Stable, hashable textual fault signature, if any.
    pub fn exceptions(&self) -> Option<&str> {
        self.exceptions.as_deref()
    }

    /// Whether the runner itself failed to execute the encoding.
    pub fn is_crashed(&self) -> bool {
        self.crashed
    }

    /// Trace recorded for the given comparison site, if the site was reached.
    pub fn trace_for(&self, site: &str) -> Option<&ComparisonTrace> {
        self.traces.iter().find(|t| t.site == site)
    }

    /// All recorded comparison traces.
    pub fn traces(&self) -> &[ComparisonTrace] {
        &self.traces
    }

    /// Whether the construct with the given identifier was covered.
    pub fn covers(&self, id: &str) -> bool {
        self.hits.contains(id)
    }

    /// Identifiers of all covered constructs.
    pub fn hits(&self) -> &BTreeSet<String> {
        &self.hits
    }
}

/// External program runner.
///
/// Implementations must always return a well-formed [`ExecutionResult`];
/// use [`ExecutionResult::crashed`] when execution itself fails.
pub trait Runner {
    /// Execute the encoding and report coverage traces and faults.
    fn execute(&mut self, encoding: &TestCase) -> ExecutionResult;
}
