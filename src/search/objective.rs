//! Objective functions and the arena pool that keys them.
//!
//! Objectives are registered in an [`ObjectivePool`] which hands out a
//! monotonically increasing [`ObjectiveId`] per registration. Every map in
//! the core (distance caches, the archive, the lifecycle sets) is keyed by
//! that id, so two structurally identical objectives registered separately
//! stay distinct. Identifier strings are used for one thing only:
//! deduplicating newly synthesized exception objectives by fault hash.

use sha2::{Digest, Sha256};

use super::SearchError;
use super::distance::branch_distance;
use super::encoding::TestCase;

/// Handle of an objective registered in an [`ObjectivePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectiveId(u32);

impl std::fmt::Display for ObjectiveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "o{}", self.0)
    }
}

#[cfg(test)]
impl ObjectiveId {
    pub(crate) fn for_tests(raw: u32) -> Self {
        Self(raw)
    }
}

/// Kind of coverage target an objective represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveKind {
    /// Control-flow target (branch side, function entry).
    Structural,
    /// Synthesized from a distinct fault signature.
    Exception,
}

/// A single coverage target with a distance metric.
///
/// Distances are non-negative; `0` means the encoding covers the target.
/// Implementations compute from the encoding's last execution result and
/// must never return NaN.
pub trait ObjectiveFunction {
    /// Stable identifier of the target (branch/function id plus polarity,
    /// or a fault hash for exception objectives).
    fn identifier(&self) -> &str;

    /// Distance of the encoding to this target.
    fn calculate_distance(&self, encoding: &TestCase) -> Result<f64, SearchError>;

    /// What kind of target this is.
    fn kind(&self) -> ObjectiveKind {
        ObjectiveKind::Structural
    }
}

struct PoolEntry {
    objective: Box<dyn ObjectiveFunction>,
    shallow: bool,
}

/// Arena of registered objectives.
///
/// The pool owns the objective values and their `shallow` flags; a shallow
/// objective is assumed covered and its distance computation is
/// short-circuited to `0`.
#[derive(Default)]
pub struct ObjectivePool {
    entries: Vec<PoolEntry>,
}

impl ObjectivePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an objective, returning its handle.
    pub fn register(&mut self, objective: Box<dyn ObjectiveFunction>) -> ObjectiveId {
        let id = ObjectiveId(self.entries.len() as u32);
        self.entries.push(PoolEntry {
            objective,
            shallow: false,
        });
        id
    }

    /// The objective behind a handle.
    ///
    /// Panics on a handle from another pool; handles are never exposed
    /// before registration, so this indicates a caller bug.
    pub fn get(&self, id: ObjectiveId) -> &dyn ObjectiveFunction {
        self.entries[id.0 as usize].objective.as_ref()
    }

    /// Identifier of the objective behind a handle.
    pub fn identifier(&self, id: ObjectiveId) -> &str {
        self.get(id).identifier()
    }

    /// Handles of all objectives whose identifier equals `identifier`.
    pub fn ids_for(&self, identifier: &str) -> Vec<ObjectiveId> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.objective.identifier() == identifier)
            .map(|(i, _)| ObjectiveId(i as u32))
            .collect()
    }

    /// Whether the objective may skip full distance computation.
    pub fn is_shallow(&self, id: ObjectiveId) -> bool {
        self.entries[id.0 as usize].shallow
    }

    /// Mark an objective as covered-and-shallow. One-way within a run.
    pub fn set_shallow(&mut self, id: ObjectiveId) {
        self.entries[id.0 as usize].shallow = true;
    }

    /// Distance of an encoding to an objective, honoring the shallow
    /// short-circuit and the no-NaN invariant.
    pub fn calculate(&self, id: ObjectiveId, encoding: &TestCase) -> Result<f64, SearchError> {
        if self.is_shallow(id) {
            return Ok(0.0);
        }
        let distance = self.get(id).calculate_distance(encoding)?;
        if distance.is_nan() {
            return Err(SearchError::NanDistance {
                context: format!("objective {}", self.identifier(id)),
            });
        }
        Ok(distance)
    }

    /// Number of registered objectives.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All registered handles, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectiveId> + '_ {
        (0..self.entries.len()).map(|i| ObjectiveId(i as u32))
    }
}

/// Content hash of a textual fault signature.
pub fn fault_signature_hash(signature: &str) -> String {
    let digest = Sha256::digest(signature.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// Coverage target for one side of an instrumented branch.
///
/// Identifier is `<site>:<side>`, matching the hit ids the runner records
/// for taken branch sides.
#[derive(Debug, Clone)]
pub struct BranchObjective {
    site: String,
    target: bool,
    identifier: String,
}

impl BranchObjective {
    pub fn new(site: impl Into<String>, target: bool) -> Self {
        let site = site.into();
        let identifier = format!("{site}:{target}");
        Self {
            site,
            target,
            identifier,
        }
    }

    /// Comparison site this objective targets.
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Which side of the branch this objective wants taken.
    pub fn target(&self) -> bool {
        self.target
    }
}

impl ObjectiveFunction for BranchObjective {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn calculate_distance(&self, encoding: &TestCase) -> Result<f64, SearchError> {
        let Some(result) = encoding.execution_result() else {
            return Ok(1.0);
        };
        if result.covers(&self.identifier) {
            return Ok(0.0);
        }
        match result.trace_for(&self.site) {
            Some(trace) => branch_distance(trace.opcode, &trace.left, &trace.right, self.target),
            // Comparison never reached (or the runner crashed): maximally unfit.
            None => Ok(1.0),
        }
    }
}

/// Coverage target for a function entry.
#[derive(Debug, Clone)]
pub struct FunctionObjective {
    identifier: String,
}

impl FunctionObjective {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }
}

impl ObjectiveFunction for FunctionObjective {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn calculate_distance(&self, encoding: &TestCase) -> Result<f64, SearchError> {
        match encoding.execution_result() {
            Some(result) if result.covers(&self.identifier) => Ok(0.0),
            _ => Ok(1.0),
        }
    }
}

/// Objective synthesized from a distinct fault signature.
///
/// Identifier is the content hash of the signature; the original message is
/// kept for reporting.
#[derive(Debug, Clone)]
pub struct ExceptionObjective {
    hash: String,
    message: String,
}

impl ExceptionObjective {
    pub fn new(hash: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            message: message.into(),
        }
    }

    /// The fault signature this objective was synthesized from.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ObjectiveFunction for ExceptionObjective {
    fn identifier(&self) -> &str {
        &self.hash
    }

    fn calculate_distance(&self, encoding: &TestCase) -> Result<f64, SearchError> {
        let raised = encoding
            .execution_result()
            .and_then(|r| r.exceptions())
            .is_some_and(|signature| fault_signature_hash(signature) == self.hash);
        Ok(if raised { 0.0 } else { 1.0 })
    }

    fn kind(&self) -> ObjectiveKind {
        ObjectiveKind::Exception
    }
}
