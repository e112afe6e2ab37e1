//! Objective lifecycle management: which objectives the search is actively
//! pursuing, which are done, and how coverage of one unlocks the next.

use std::collections::BTreeSet;

use super::archive::Archive;
use super::budget::BudgetManager;
use super::encoding::TestCase;
use super::objective::{
    fault_signature_hash, ExceptionObjective, ObjectiveFunction, ObjectiveId, ObjectiveKind,
    ObjectivePool,
};
use super::runner::Runner;
use super::SearchError;

/// The system under test, as the search sees it: a flat set of objectives
/// plus the reachability structure between them.
pub trait Subject {
    /// Every objective the subject offers, roots and descendants alike.
    fn objectives(&self) -> Vec<Box<dyn ObjectiveFunction>>;

    /// Identifiers of the entry-point objectives, reachable from the start.
    fn root_identifiers(&self) -> Vec<String>;

    /// Identifiers of the objectives directly unlocked by covering
    /// `identifier`.
    fn child_identifiers(&self, identifier: &str) -> Vec<String>;
}

/// The three disjoint lifecycle sets. Every structural objective is in
/// exactly one of them at all times.
#[derive(Debug, Default)]
pub struct ObjectiveSets {
    uncovered: BTreeSet<ObjectiveId>,
    current: BTreeSet<ObjectiveId>,
    covered: BTreeSet<ObjectiveId>,
}

impl ObjectiveSets {
    /// Not yet covered and not actively pursued.
    pub fn uncovered(&self) -> &BTreeSet<ObjectiveId> {
        &self.uncovered
    }

    /// Actively pursued by the search.
    pub fn current(&self) -> &BTreeSet<ObjectiveId> {
        &self.current
    }

    /// Covered at least once during the run.
    pub fn covered(&self) -> &BTreeSet<ObjectiveId> {
        &self.covered
    }

    /// Move an objective into `covered`, removing it from wherever it was.
    /// Idempotent.
    pub fn mark_covered(&mut self, objective: ObjectiveId) {
        self.uncovered.remove(&objective);
        self.current.remove(&objective);
        self.covered.insert(objective);
    }

    /// Promote an objective from `uncovered` to `current`. Returns `false`
    /// if it is already current or covered.
    pub fn activate(&mut self, objective: ObjectiveId) -> bool {
        if self.covered.contains(&objective) || self.current.contains(&objective) {
            return false;
        }
        self.uncovered.remove(&objective);
        self.current.insert(objective)
    }

    fn seed(&mut self, all: impl IntoIterator<Item = ObjectiveId>, roots: &BTreeSet<ObjectiveId>) {
        self.uncovered.clear();
        self.current.clear();
        self.covered.clear();
        for id in all {
            if roots.contains(&id) {
                self.current.insert(id);
            } else {
                self.uncovered.insert(id);
            }
        }
    }
}

/// Hook invoked once per current objective per evaluation, deciding how
/// the lifecycle sets react to the computed distance.
pub trait CoveragePolicy {
    fn on_objective_evaluated(
        &self,
        objective: ObjectiveId,
        encoding: &TestCase,
        distance: f64,
        sets: &mut ObjectiveSets,
        pool: &mut ObjectivePool,
        subject: &dyn Subject,
    );
}

/// Frontier expansion: a covered objective retires and its children become
/// current, so the search only ever pursues objectives one step beyond
/// what it has already reached.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralPolicy;

impl CoveragePolicy for StructuralPolicy {
    fn on_objective_evaluated(
        &self,
        objective: ObjectiveId,
        encoding: &TestCase,
        distance: f64,
        sets: &mut ObjectiveSets,
        pool: &mut ObjectivePool,
        subject: &dyn Subject,
    ) {
        if distance != 0.0 {
            return;
        }

        sets.mark_covered(objective);
        // Covered objectives stay at distance zero for the rest of the run.
        pool.set_shallow(objective);
        log::debug!(
            "objective {} covered by {}",
            pool.identifier(objective),
            encoding.id()
        );

        let identifier = pool.identifier(objective).to_string();
        for child in subject.child_identifiers(&identifier) {
            for child_id in pool.ids_for(&child) {
                if sets.activate(child_id) {
                    log::debug!("objective {child} activated");
                }
            }
        }
    }
}

/// Owns the objective pool, the lifecycle sets, the archive, and the
/// runner, and drives them through encoding evaluations.
pub struct ObjectiveManager<P: CoveragePolicy> {
    pool: ObjectivePool,
    archive: Archive,
    sets: ObjectiveSets,
    runner: Box<dyn Runner>,
    policy: P,
    loaded: bool,
}

impl<P: CoveragePolicy> ObjectiveManager<P> {
    pub fn new(runner: Box<dyn Runner>, policy: P) -> Self {
        Self {
            pool: ObjectivePool::new(),
            archive: Archive::new(),
            sets: ObjectiveSets::default(),
            runner,
            policy,
            loaded: false,
        }
    }

    /// Register a subject's objectives and seed the lifecycle sets: root
    /// objectives become current, everything else starts uncovered. Resets
    /// all prior state, including the archive.
    pub fn load(&mut self, subject: &dyn Subject) {
        self.pool = ObjectivePool::new();
        self.archive.clear();

        let mut ids = Vec::new();
        for objective in subject.objectives() {
            ids.push(self.pool.register(objective));
        }

        let mut roots = BTreeSet::new();
        for identifier in subject.root_identifiers() {
            roots.extend(self.pool.ids_for(&identifier));
        }
        self.sets.seed(ids, &roots);
        self.loaded = true;

        log::info!(
            "loaded subject: {} objectives, {} roots",
            self.pool.len(),
            self.sets.current.len()
        );
    }

    /// Execute one encoding, charge the budget, score it against every
    /// current objective, and react to coverage. Also synthesizes an
    /// exception objective when the execution raised a fault not yet seen.
    pub fn evaluate_one(
        &mut self,
        encoding: &mut TestCase,
        subject: &dyn Subject,
        budget: &mut BudgetManager,
    ) -> Result<(), SearchError> {
        if !self.loaded {
            return Err(SearchError::NoSubject);
        }

        let result = self.runner.execute(encoding);
        budget.evaluation(encoding);
        encoding.set_execution_result(result.clone());

        let current: Vec<ObjectiveId> = self.sets.current.iter().copied().collect();
        for objective in current {
            let distance = self.pool.calculate(objective, encoding)?;
            encoding.set_distance(objective, distance)?;
            if distance == 0.0 {
                self.archive.update(objective, encoding, 0.0);
            }
            let Self {
                pool, sets, policy, ..
            } = self;
            policy.on_objective_evaluated(objective, encoding, distance, sets, pool, subject);
        }

        if let Some(signature) = result.exceptions() {
            self.record_exception(signature, encoding);
        }
        Ok(())
    }

    /// Evaluate encodings until the budget runs out. Encodings past the
    /// cutoff are left unevaluated; a partial pass is not an error.
    pub fn evaluate_many(
        &mut self,
        encodings: &mut [TestCase],
        subject: &dyn Subject,
        budget: &mut BudgetManager,
    ) -> Result<(), SearchError> {
        for encoding in encodings {
            if !budget.has_budget_left() {
                break;
            }
            self.evaluate_one(encoding, subject, budget)?;
        }
        Ok(())
    }

    /// Back-fill distances for current objectives an encoding has not been
    /// scored against, without re-executing it. Needed after coverage
    /// activates objectives that did not exist when the encoding ran.
    pub fn ensure_distances(&self, encodings: &mut [TestCase]) -> Result<(), SearchError> {
        for encoding in encodings {
            for objective in &self.sets.current {
                if encoding.distance(*objective).is_none() {
                    let distance = self.pool.calculate(*objective, encoding)?;
                    encoding.set_distance(*objective, distance)?;
                }
            }
        }
        Ok(())
    }

    /// Synthesize an objective for a raised fault, deduplicated across the
    /// whole run by signature hash. Exception objectives live only in the
    /// pool and the archive, never in the lifecycle sets.
    fn record_exception(&mut self, signature: &str, encoding: &TestCase) {
        let hash = fault_signature_hash(signature);
        let already_seen = self.archive.objectives().any(|id| {
            self.pool.get(id).kind() == ObjectiveKind::Exception
                && self.pool.identifier(id) == hash
        });
        if already_seen {
            return;
        }

        log::debug!("new fault {hash}: {signature}");
        let objective = self
            .pool
            .register(Box::new(ExceptionObjective::new(hash, signature)));
        self.archive.update(objective, encoding, 0.0);
    }

    /// `true` while there is anything left to pursue.
    pub fn has_objectives(&self) -> bool {
        !self.sets.current.is_empty()
    }

    pub fn sets(&self) -> &ObjectiveSets {
        &self.sets
    }

    pub fn pool(&self) -> &ObjectivePool {
        &self.pool
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::budget::Budget;
    use crate::search::gene::GeneNode;
    use crate::search::objective::FunctionObjective;
    use crate::search::runner::ExecutionResult;

    /// One root objective `a`, a child `b` behind it, and an orphan `c`.
    struct ChainSubject;

    impl Subject for ChainSubject {
        fn objectives(&self) -> Vec<Box<dyn ObjectiveFunction>> {
            vec![
                Box::new(FunctionObjective::new("a")),
                Box::new(FunctionObjective::new("b")),
                Box::new(FunctionObjective::new("c")),
            ]
        }

        fn root_identifiers(&self) -> Vec<String> {
            vec!["a".to_string()]
        }

        fn child_identifiers(&self, identifier: &str) -> Vec<String> {
            match identifier {
                "a" => vec!["b".to_string()],
                _ => Vec::new(),
            }
        }
    }

    /// Replays a fixed sequence of execution results.
    struct ScriptedRunner {
        results: Vec<ExecutionResult>,
        next: usize,
    }

    impl ScriptedRunner {
        fn new(results: Vec<ExecutionResult>) -> Self {
            Self { results, next: 0 }
        }
    }

    impl Runner for ScriptedRunner {
        fn execute(&mut self, _encoding: &TestCase) -> ExecutionResult {
            let result = self.results[self.next.min(self.results.len() - 1)].clone();
            self.next += 1;
            result
        }
    }

    fn encoding() -> TestCase {
        TestCase::new(GeneNode::leaf("1.0", "num"))
    }

    fn manager(results: Vec<ExecutionResult>) -> ObjectiveManager<StructuralPolicy> {
        ObjectiveManager::new(Box::new(ScriptedRunner::new(results)), StructuralPolicy)
    }

    fn assert_partition(manager: &ObjectiveManager<StructuralPolicy>, structural: usize) {
        let sets = manager.sets();
        let mut all: Vec<ObjectiveId> = Vec::new();
        all.extend(sets.uncovered());
        all.extend(sets.current());
        all.extend(sets.covered());
        assert_eq!(all.len(), structural);
        all.sort();
        all.dedup();
        assert_eq!(all.len(), structural);
    }

    #[test]
    fn test_load_seeds_roots_as_current() {
        let mut manager = manager(vec![ExecutionResult::new()]);
        manager.load(&ChainSubject);

        assert_eq!(manager.sets().current().len(), 1);
        assert_eq!(manager.sets().uncovered().len(), 2);
        assert!(manager.sets().covered().is_empty());
        assert_partition(&manager, 3);
    }

    #[test]
    fn test_evaluate_before_load_fails() {
        let mut manager = manager(vec![ExecutionResult::new()]);
        let mut budget = BudgetManager::default();
        let err = manager
            .evaluate_one(&mut encoding(), &ChainSubject, &mut budget)
            .unwrap_err();
        assert!(matches!(err, SearchError::NoSubject));
    }

    #[test]
    fn test_coverage_expands_frontier() {
        let mut manager = manager(vec![ExecutionResult::new().with_hit("a")]);
        manager.load(&ChainSubject);
        let mut budget = BudgetManager::default();

        let mut candidate = encoding();
        manager
            .evaluate_one(&mut candidate, &ChainSubject, &mut budget)
            .unwrap();

        // `a` retired, its child `b` activated, orphan `c` untouched.
        assert_eq!(manager.sets().covered().len(), 1);
        assert_eq!(manager.sets().current().len(), 1);
        assert_eq!(manager.sets().uncovered().len(), 1);
        assert_partition(&manager, 3);

        let current = *manager.sets().current().iter().next().unwrap();
        assert_eq!(manager.pool().identifier(current), "b");
        assert!(manager.archive().len() == 1);
    }

    #[test]
    fn test_covering_twice_is_idempotent() {
        let hit = ExecutionResult::new().with_hit("a");
        let mut manager = manager(vec![hit.clone(), hit]);
        manager.load(&ChainSubject);
        let mut budget = BudgetManager::default();

        manager
            .evaluate_one(&mut encoding(), &ChainSubject, &mut budget)
            .unwrap();
        manager
            .evaluate_one(&mut encoding(), &ChainSubject, &mut budget)
            .unwrap();

        assert_eq!(manager.sets().covered().len(), 1);
        assert_partition(&manager, 3);
    }

    #[test]
    fn test_exception_objectives_bypass_lifecycle() {
        let fault = ExecutionResult::new().with_exception("TypeError at foo:3");
        let mut manager = manager(vec![fault.clone(), fault]);
        manager.load(&ChainSubject);
        let mut budget = BudgetManager::default();

        manager
            .evaluate_one(&mut encoding(), &ChainSubject, &mut budget)
            .unwrap();

        // One synthesized objective, archived immediately, sets untouched.
        assert_eq!(manager.pool().len(), 4);
        assert_eq!(manager.archive().len(), 1);
        assert_partition(&manager, 3);

        // Same fault again is deduplicated.
        manager
            .evaluate_one(&mut encoding(), &ChainSubject, &mut budget)
            .unwrap();
        assert_eq!(manager.pool().len(), 4);
        assert_eq!(manager.archive().len(), 1);
    }

    #[test]
    fn test_distinct_faults_archive_separately() {
        let mut manager = manager(vec![
            ExecutionResult::new().with_exception("TypeError at foo:3"),
            ExecutionResult::new().with_exception("RangeError at bar:9"),
            ExecutionResult::new().with_exception("TypeError at foo:3"),
        ]);
        manager.load(&ChainSubject);
        let mut budget = BudgetManager::default();

        for _ in 0..3 {
            manager
                .evaluate_one(&mut encoding(), &ChainSubject, &mut budget)
                .unwrap();
        }

        // Two distinct signatures archived, the repeat folded into the first.
        assert_eq!(manager.pool().len(), 5);
        let faults = manager
            .archive()
            .objectives()
            .filter(|&id| manager.pool().get(id).kind() == ObjectiveKind::Exception)
            .count();
        assert_eq!(faults, 2);
        assert_partition(&manager, 3);
    }

    #[test]
    fn test_evaluate_many_stops_at_budget() {
        let mut manager = manager(vec![ExecutionResult::new()]);
        manager.load(&ChainSubject);
        let mut budget = BudgetManager::new(vec![Budget::evaluations(2)]);
        budget.start();

        let mut population: Vec<TestCase> = (0..5).map(|_| encoding()).collect();
        manager
            .evaluate_many(&mut population, &ChainSubject, &mut budget)
            .unwrap();

        let evaluated = population
            .iter()
            .filter(|e| e.execution_result().is_some())
            .count();
        assert_eq!(evaluated, 2);
        assert_eq!(budget.evaluations_used(), 2);
    }

    #[test]
    fn test_ensure_distances_back_fills() {
        let mut manager = manager(vec![ExecutionResult::new()]);
        manager.load(&ChainSubject);

        let current = *manager.sets().current().iter().next().unwrap();
        let mut population = vec![encoding()];
        assert!(population[0].distance(current).is_none());

        manager.ensure_distances(&mut population).unwrap();
        // Never executed, so the hit is absent and distance is maximal.
        assert_eq!(population[0].distance(current), Some(1.0));
    }

    #[test]
    fn test_load_resets_archive() {
        let mut manager = manager(vec![ExecutionResult::new().with_hit("a")]);
        manager.load(&ChainSubject);
        let mut budget = BudgetManager::default();
        manager
            .evaluate_one(&mut encoding(), &ChainSubject, &mut budget)
            .unwrap();
        assert_eq!(manager.archive().len(), 1);

        manager.load(&ChainSubject);
        assert!(manager.archive().is_empty());
        assert_eq!(manager.sets().current().len(), 1);
    }
}
