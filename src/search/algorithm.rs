//! The generational search loop: seed a population, breed and evaluate
//! offspring, and keep the best encodings per objective until a budget
//! runs out or nothing is left to cover.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::budget::BudgetManager;
use super::encoding::TestCase;
use super::manager::{CoveragePolicy, ObjectiveManager, Subject};
use super::objective::{ObjectiveId, ObjectiveKind};
use super::sampler::EncodingSampler;
use super::selection::{assign_crowding_distance, fast_nondominated_sort};
use super::SearchError;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StopReason {
    /// Every configured budget check failed.
    BudgetExhausted,
    /// No current objectives remain to pursue.
    ObjectivesCovered,
}

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Initializing,
    Running,
    Terminated,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchStats {
    pub generations: u64,
    pub evaluations: u64,
    pub covered_objectives: usize,
    pub total_objectives: usize,
    pub faults_found: usize,
}

impl SearchStats {
    /// Fraction of structural objectives covered, in `[0, 1]`.
    pub fn coverage(&self) -> f64 {
        if self.total_objectives == 0 {
            return 1.0;
        }
        self.covered_objectives as f64 / self.total_objectives as f64
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchResult {
    pub stop_reason: StopReason,
    pub stats: SearchStats,
}

/// Environmental-selection strategy for the next generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmVariant {
    /// Non-dominated sorting with crowding-distance truncation.
    #[default]
    Mosa,
    /// Archive members survive first, dominance ranking fills the rest.
    ArchiveElitist,
}

/// A budget-constrained generational search over encodings.
pub struct SearchAlgorithm<P: CoveragePolicy> {
    manager: ObjectiveManager<P>,
    sampler: Box<dyn EncodingSampler>,
    variant: AlgorithmVariant,
    population_size: usize,
    crossover_rate: f64,
    mutation_rate: f64,
    rng: StdRng,
    population: Vec<TestCase>,
    state: SearchState,
}

impl<P: CoveragePolicy> SearchAlgorithm<P> {
    pub fn new(
        manager: ObjectiveManager<P>,
        sampler: Box<dyn EncodingSampler>,
        variant: AlgorithmVariant,
        population_size: usize,
        crossover_rate: f64,
        mutation_rate: f64,
        seed: u64,
    ) -> Self {
        Self {
            manager,
            sampler,
            variant,
            population_size: population_size.max(2),
            crossover_rate,
            mutation_rate,
            rng: StdRng::seed_from_u64(seed),
            population: Vec::new(),
            state: SearchState::Initializing,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn population(&self) -> &[TestCase] {
        &self.population
    }

    pub fn manager(&self) -> &ObjectiveManager<P> {
        &self.manager
    }

    /// Run the search to completion against one subject.
    pub fn run(
        &mut self,
        subject: &dyn Subject,
        budget: &mut BudgetManager,
    ) -> Result<SearchResult, SearchError> {
        self.manager.load(subject);
        budget.start();
        self.state = SearchState::Running;

        self.population = (0..self.population_size)
            .map(|_| self.sampler.sample())
            .collect();
        self.manager
            .evaluate_many(&mut self.population, subject, budget)?;

        while budget.has_budget_left() && self.manager.has_objectives() {
            budget.generation();

            let mut offspring = self.breed();
            self.manager
                .evaluate_many(&mut offspring, subject, budget)?;

            self.population.append(&mut offspring);
            // Coverage this generation may have activated objectives the
            // parents were never scored against.
            self.manager.ensure_distances(&mut self.population)?;
            self.select_next_generation();

            log::debug!(
                "generation {}: {} covered, {} current",
                budget.generations_used(),
                self.manager.sets().covered().len(),
                self.manager.sets().current().len()
            );
        }

        self.state = SearchState::Terminated;
        let stop_reason = if self.manager.has_objectives() {
            StopReason::BudgetExhausted
        } else {
            StopReason::ObjectivesCovered
        };
        let stats = self.stats(budget);
        log::info!(
            "search stopped ({stop_reason:?}): {:.1}% coverage, {} faults",
            stats.coverage() * 100.0,
            stats.faults_found
        );
        Ok(SearchResult { stop_reason, stats })
    }

    fn stats(&self, budget: &BudgetManager) -> SearchStats {
        let pool = self.manager.pool();
        let structural = pool
            .ids()
            .filter(|&id| pool.get(id).kind() == ObjectiveKind::Structural)
            .count();
        let faults = self
            .manager
            .archive()
            .objectives()
            .filter(|&id| pool.get(id).kind() == ObjectiveKind::Exception)
            .count();
        SearchStats {
            generations: budget.generations_used(),
            evaluations: budget.evaluations_used(),
            covered_objectives: self.manager.sets().covered().len(),
            total_objectives: structural,
            faults_found: faults,
        }
    }

    /// Binary tournament: lower rank wins, crowding distance breaks ties.
    fn tournament(&mut self) -> usize {
        let a = self.rng.gen_range(0..self.population.len());
        let b = self.rng.gen_range(0..self.population.len());
        let (ea, eb) = (&self.population[a], &self.population[b]);
        match ea.rank().cmp(&eb.rank()) {
            std::cmp::Ordering::Less => a,
            std::cmp::Ordering::Greater => b,
            std::cmp::Ordering::Equal => {
                if ea.crowding_distance() >= eb.crowding_distance() {
                    a
                } else {
                    b
                }
            }
        }
    }

    fn breed(&mut self) -> Vec<TestCase> {
        let mut offspring = Vec::with_capacity(self.population_size);
        while offspring.len() < self.population_size {
            let first = self.tournament();
            let second = self.tournament();

            let mut child = if self.rng.gen_bool(self.crossover_rate) {
                self.sampler
                    .crossover(&self.population[first], &self.population[second])
            } else {
                TestCase::new(self.population[first].root().deep_copy())
            };
            if self.rng.gen_bool(self.mutation_rate) {
                let depth = self.rng.gen_range(1..=child.root().depth());
                child = self.sampler.mutate(&child, depth);
            }
            offspring.push(child);
        }
        offspring
    }

    fn select_next_generation(&mut self) {
        let objectives: Vec<ObjectiveId> =
            self.manager.sets().current().iter().copied().collect();

        let survivors = match self.variant {
            AlgorithmVariant::Mosa => self.mosa_selection(&objectives),
            AlgorithmVariant::ArchiveElitist => self.archive_elitist_selection(&objectives),
        };

        let mut next = Vec::with_capacity(self.population_size);
        // Drain in descending index order so earlier picks stay valid.
        let mut picks = survivors;
        picks.sort_unstable_by(|a, b| b.cmp(a));
        for index in picks {
            next.push(self.population.swap_remove(index));
        }
        next.reverse();
        self.population = next;
    }

    /// Non-dominated sorting; the front that straddles the cutoff is
    /// truncated by crowding distance, ties broken by population order.
    fn mosa_selection(&mut self, objectives: &[ObjectiveId]) -> Vec<usize> {
        let fronts = fast_nondominated_sort(&mut self.population, objectives);
        let mut survivors = Vec::with_capacity(self.population_size);

        for front in fronts {
            assign_crowding_distance(&mut self.population, &front, objectives);
            if survivors.len() + front.len() <= self.population_size {
                survivors.extend(front);
                continue;
            }

            let mut remaining = front;
            // Stable sort keeps population order among equal crowding.
            remaining.sort_by(|&a, &b| {
                self.population[b]
                    .crowding_distance()
                    .total_cmp(&self.population[a].crowding_distance())
            });
            remaining.truncate(self.population_size - survivors.len());
            survivors.extend(remaining);
            break;
        }
        survivors
    }

    /// Archive members always survive; the remainder is filled by
    /// dominance rank and crowding.
    fn archive_elitist_selection(&mut self, objectives: &[ObjectiveId]) -> Vec<usize> {
        let mut elites: Vec<usize> = Vec::new();
        for (index, encoding) in self.population.iter().enumerate() {
            if self.manager.archive().contains_encoding(encoding) {
                elites.push(index);
            }
        }
        elites.truncate(self.population_size);
        if elites.len() == self.population_size {
            return elites;
        }

        let mut rest = self.mosa_selection(objectives);
        rest.retain(|index| !elites.contains(index));
        rest.truncate(self.population_size - elites.len());
        elites.extend(rest);
        elites
    }
}
