//! Test-case encodings: the candidate solutions under evolution.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::SearchError;
use super::gene::GeneNode;
use super::objective::ObjectiveId;
use super::runner::ExecutionResult;

/// Opaque unique identifier of an encoding, collision-free within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncodingId(u64);

static NEXT_ENCODING_ID: AtomicU64 = AtomicU64::new(0);

impl EncodingId {
    fn next() -> Self {
        Self(NEXT_ENCODING_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for EncodingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A candidate test case: a gene tree plus fitness bookkeeping.
///
/// Mutated only by the genetic operators during reproduction; evaluation
/// writes the execution result and the per-objective distance cache but
/// never touches the genotype.
#[derive(Debug, Clone)]
pub struct TestCase {
    id: EncodingId,
    root: GeneNode,
    rank: usize,
    crowding_distance: f64,
    distances: HashMap<ObjectiveId, f64>,
    execution_result: Option<ExecutionResult>,
    assertions: HashMap<String, String>,
    meta_comments: Vec<String>,
}

impl TestCase {
    /// Create an encoding from a gene tree, with a fresh unique id.
    pub fn new(root: GeneNode) -> Self {
        Self {
            id: EncodingId::next(),
            root,
            rank: 0,
            crowding_distance: 0.0,
            distances: HashMap::new(),
            execution_result: None,
            assertions: HashMap::new(),
            meta_comments: Vec::new(),
        }
    }

    /// Evaluation helper: an encoding pre-loaded with distances for the
    /// given objectives. Rejects mismatched slice lengths rather than
    /// padding or truncating.
    pub fn with_distances(
        root: GeneNode,
        objectives: &[ObjectiveId],
        values: &[f64],
    ) -> Result<Self, SearchError> {
        if objectives.len() != values.len() {
            return Err(SearchError::DistanceArityMismatch {
                objectives: objectives.len(),
                values: values.len(),
            });
        }
        let mut encoding = Self::new(root);
        for (objective, value) in objectives.iter().zip(values) {
            encoding.set_distance(*objective, *value)?;
        }
        Ok(encoding)
    }

    /// Unique id of this encoding.
    pub fn id(&self) -> EncodingId {
        self.id
    }

    /// Root of the gene tree.
    pub fn root(&self) -> &GeneNode {
        &self.root
    }

    /// Number of nodes in the gene tree.
    pub fn length(&self) -> usize {
        self.root.size()
    }

    /// Pareto front rank (0 = non-dominated).
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn set_rank(&mut self, rank: usize) {
        self.rank = rank;
    }

    /// Crowding distance within this encoding's front.
    pub fn crowding_distance(&self) -> f64 {
        self.crowding_distance
    }

    pub fn set_crowding_distance(&mut self, value: f64) {
        self.crowding_distance = value;
    }

    /// Cached distance to an objective, if one has been computed.
    pub fn distance(&self, objective: ObjectiveId) -> Option<f64> {
        self.distances.get(&objective).copied()
    }

    /// Cache the distance to an objective.
    ///
    /// A NaN distance is a bug in an objective function, not a value; it is
    /// rejected here so it can never poison dominance comparison.
    pub fn set_distance(&mut self, objective: ObjectiveId, distance: f64) -> Result<(), SearchError> {
        if distance.is_nan() {
            return Err(SearchError::NanDistance {
                context: format!("objective {objective} on encoding {}", self.id),
            });
        }
        self.distances.insert(objective, distance);
        Ok(())
    }

    /// Last execution result, if the encoding has been run.
    pub fn execution_result(&self) -> Option<&ExecutionResult> {
        self.execution_result.as_ref()
    }

    /// Replace the execution result wholesale.
    pub fn set_execution_result(&mut self, result: ExecutionResult) {
        self.execution_result = Some(result);
    }

    /// Assertions attached to this test case (name to expected value).
    pub fn assertions(&self) -> &HashMap<String, String> {
        &self.assertions
    }

    pub fn add_assertion(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.assertions.insert(name.into(), value.into());
    }

    /// Meta comments, as a defensive copy.
    pub fn meta_comments(&self) -> Vec<String> {
        self.meta_comments.clone()
    }

    pub fn add_meta_comment(&mut self, comment: impl Into<String>) {
        self.meta_comments.push(comment.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> GeneNode {
        GeneNode::leaf("1.0", "num")
    }

    #[test]
    fn test_ids_are_unique() {
        let a = TestCase::new(tree());
        let b = TestCase::new(tree());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_distance_cache() {
        let objective = ObjectiveId::for_tests(0);
        let mut encoding = TestCase::new(tree());

        assert_eq!(encoding.distance(objective), None);
        encoding.set_distance(objective, 0.5).unwrap();
        assert_eq!(encoding.distance(objective), Some(0.5));
        encoding.set_distance(objective, 0.0).unwrap();
        assert_eq!(encoding.distance(objective), Some(0.0));
    }

    #[test]
    fn test_nan_distance_rejected() {
        let mut encoding = TestCase::new(tree());
        let err = encoding
            .set_distance(ObjectiveId::for_tests(0), f64::NAN)
            .unwrap_err();
        assert!(matches!(err, SearchError::NanDistance { .. }));
    }

    #[test]
    fn test_with_distances_rejects_arity_mismatch() {
        let objectives = [ObjectiveId::for_tests(0), ObjectiveId::for_tests(1)];
        let err = TestCase::with_distances(tree(), &objectives, &[0.5]).unwrap_err();
        assert!(matches!(
            err,
            SearchError::DistanceArityMismatch {
                objectives: 2,
                values: 1
            }
        ));
    }

    #[test]
    fn test_with_distances() {
        let objectives = [ObjectiveId::for_tests(0), ObjectiveId::for_tests(1)];
        let encoding = TestCase::with_distances(tree(), &objectives, &[0.5, 0.0]).unwrap();
        assert_eq!(encoding.distance(objectives[0]), Some(0.5));
        assert_eq!(encoding.distance(objectives[1]), Some(0.0));
    }

    #[test]
    fn test_meta_comments_defensive_copy() {
        let mut encoding = TestCase::new(tree());
        encoding.add_meta_comment("covers b0");

        let mut copy = encoding.meta_comments();
        copy.push("not recorded".to_string());

        assert_eq!(encoding.meta_comments(), vec!["covers b0".to_string()]);
    }

    #[test]
    fn test_execution_result_replaced_wholesale() {
        let mut encoding = TestCase::new(tree());
        encoding.set_execution_result(ExecutionResult::new().with_hit("f0"));
        encoding.set_execution_result(ExecutionResult::new().with_hit("f1"));

        let result = encoding.execution_result().unwrap();
        assert!(!result.covers("f0"));
        assert!(result.covers("f1"));
    }
}
