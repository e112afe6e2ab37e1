//! Search budgets: evaluation counts, generation counts, and wall-clock time.

use std::time::{Duration, Instant};

use super::encoding::TestCase;

/// A single resource limit on the search.
#[derive(Debug, Clone)]
pub enum Budget {
    /// Cap on the number of encoding evaluations.
    Evaluations { used: u64, max: u64 },
    /// Cap on the number of generations.
    Generations { used: u64, max: u64 },
    /// Cap on wall-clock time, measured from [`BudgetManager::start`].
    SearchTime {
        started: Option<Instant>,
        max: Duration,
    },
}

impl Budget {
    pub fn evaluations(max: u64) -> Self {
        Budget::Evaluations { used: 0, max }
    }

    pub fn generations(max: u64) -> Self {
        Budget::Generations { used: 0, max }
    }

    pub fn search_time(max: Duration) -> Self {
        Budget::SearchTime { started: None, max }
    }

    fn has_left(&self) -> bool {
        match self {
            Budget::Evaluations { used, max } => used < max,
            Budget::Generations { used, max } => used < max,
            Budget::SearchTime { started, max } => match started {
                Some(at) => at.elapsed() < *max,
                // Not started yet counts as fully available.
                None => !max.is_zero(),
            },
        }
    }
}

/// Tracks every configured budget and answers whether the search may
/// continue. Consumption is monotonic; counters saturate at their cap and
/// never reset mid-run.
#[derive(Debug, Default)]
pub struct BudgetManager {
    budgets: Vec<Budget>,
}

impl BudgetManager {
    pub fn new(budgets: Vec<Budget>) -> Self {
        Self { budgets }
    }

    /// Mark the start of the search, arming any time budget.
    pub fn start(&mut self) {
        let now = Instant::now();
        for budget in &mut self.budgets {
            if let Budget::SearchTime { started, .. } = budget {
                started.get_or_insert(now);
            }
        }
    }

    /// `true` while every configured budget still has headroom. A manager
    /// with no budgets never exhausts.
    pub fn has_budget_left(&self) -> bool {
        self.budgets.iter().all(Budget::has_left)
    }

    /// Record one completed encoding evaluation.
    pub fn evaluation(&mut self, _encoding: &TestCase) {
        for budget in &mut self.budgets {
            if let Budget::Evaluations { used, max } = budget {
                *used = used.saturating_add(1).min(*max);
            }
        }
    }

    /// Record one completed generation.
    pub fn generation(&mut self) {
        for budget in &mut self.budgets {
            if let Budget::Generations { used, max } = budget {
                *used = used.saturating_add(1).min(*max);
            }
        }
    }

    pub fn evaluations_used(&self) -> u64 {
        self.budgets
            .iter()
            .find_map(|b| match b {
                Budget::Evaluations { used, .. } => Some(*used),
                _ => None,
            })
            .unwrap_or(0)
    }

    pub fn generations_used(&self) -> u64 {
        self.budgets
            .iter()
            .find_map(|b| match b {
                Budget::Generations { used, .. } => Some(*used),
                _ => None,
            })
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::gene::GeneNode;

    fn encoding() -> TestCase {
        TestCase::new(GeneNode::leaf("1.0", "num"))
    }

    #[test]
    fn test_no_budgets_never_exhausts() {
        let mut manager = BudgetManager::default();
        manager.start();
        for _ in 0..1000 {
            manager.evaluation(&encoding());
            manager.generation();
        }
        assert!(manager.has_budget_left());
    }

    #[test]
    fn test_evaluation_budget_exhausts() {
        let mut manager = BudgetManager::new(vec![Budget::evaluations(3)]);
        manager.start();

        for _ in 0..2 {
            manager.evaluation(&encoding());
            assert!(manager.has_budget_left());
        }
        manager.evaluation(&encoding());
        assert!(!manager.has_budget_left());
        assert_eq!(manager.evaluations_used(), 3);
    }

    #[test]
    fn test_counters_saturate_at_cap() {
        let mut manager = BudgetManager::new(vec![Budget::evaluations(2)]);
        manager.start();
        for _ in 0..10 {
            manager.evaluation(&encoding());
        }
        assert_eq!(manager.evaluations_used(), 2);
    }

    #[test]
    fn test_all_budgets_must_have_headroom() {
        let mut manager =
            BudgetManager::new(vec![Budget::evaluations(100), Budget::generations(1)]);
        manager.start();
        assert!(manager.has_budget_left());

        manager.generation();
        assert!(!manager.has_budget_left());
        assert_eq!(manager.evaluations_used(), 0);
        assert_eq!(manager.generations_used(), 1);
    }

    #[test]
    fn test_zero_time_budget_is_exhausted_once_started() {
        let mut manager = BudgetManager::new(vec![Budget::search_time(Duration::ZERO)]);
        assert!(!manager.has_budget_left());
        manager.start();
        assert!(!manager.has_budget_left());
    }

    #[test]
    fn test_generous_time_budget_has_headroom() {
        let mut manager = BudgetManager::new(vec![Budget::search_time(Duration::from_secs(3600))]);
        manager.start();
        manager.generation();
        assert!(manager.has_budget_left());
    }
}
