//! Search-based test generation.
//!
//! The pieces fit together like this:
//!
//! - [`gene`]: persistent gene trees, the genotype of a test case
//! - [`encoding`]: the individual the search evolves, with its scores
//! - [`distance`]: the branch-distance heuristic scoring comparisons
//! - [`runner`]: execution of an encoding against the subject
//! - [`objective`]: objective functions and the pool that owns them
//! - [`manager`]: the objective lifecycle and coverage policy
//! - [`archive`]: best-known encoding per objective
//! - [`budget`]: evaluation, generation, and wall-clock limits
//! - [`selection`]: dominance ranking and crowding distance
//! - [`sampler`]: seeded generation and variation of encodings
//! - [`algorithm`]: the generational loop tying it all together

pub mod algorithm;
pub mod archive;
pub mod budget;
pub mod distance;
pub mod encoding;
pub mod gene;
pub mod manager;
pub mod objective;
pub mod runner;
pub mod sampler;
pub mod selection;

pub use algorithm::{
    AlgorithmVariant, SearchAlgorithm, SearchResult, SearchState, SearchStats, StopReason,
};
pub use archive::{Archive, ArchiveEntry, ArchivedTest};
pub use budget::{Budget, BudgetManager};
pub use distance::{branch_distance, Opcode};
pub use encoding::{EncodingId, TestCase};
pub use gene::GeneNode;
pub use manager::{CoveragePolicy, ObjectiveManager, ObjectiveSets, StructuralPolicy, Subject};
pub use objective::{
    fault_signature_hash, BranchObjective, ExceptionObjective, FunctionObjective,
    ObjectiveFunction, ObjectiveId, ObjectiveKind, ObjectivePool,
};
pub use runner::{ComparisonTrace, ExecutionResult, Runner};
pub use sampler::{EncodingSampler, TreeSampler};
pub use selection::{assign_crowding_distance, dominates, fast_nondominated_sort};

/// Errors surfaced by the search core.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// An objective function produced NaN, which has no place in a
    /// dominance comparison.
    #[error("NaN distance for {context}")]
    NanDistance { context: String },

    /// A comparison trace recorded different sample counts for its two
    /// operands.
    #[error("operand trace length mismatch: {left} left samples, {right} right samples")]
    TraceLengthMismatch { left: usize, right: usize },

    /// A comparison trace carried no samples at all.
    #[error("comparison trace has no samples")]
    EmptyTraces,

    /// A comparison opcode outside the supported set.
    #[error("unknown comparison opcode `{0}`")]
    UnknownOpcode(String),

    /// Objective and value slices of different lengths.
    #[error("{objectives} objectives but {values} distance values")]
    DistanceArityMismatch { objectives: usize, values: usize },

    /// Evaluation was requested before a subject was loaded.
    #[error("no subject loaded")]
    NoSubject,
}
