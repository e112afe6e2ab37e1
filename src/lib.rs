//! Coversearch - Search-based test generation.
//!
//! This crate evolves populations of tree-shaped test encodings against
//! coverage objectives of a subject under test, guided by a branch-distance
//! heuristic and bounded by explicit resource budgets.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration types for search runs
//! - `search`: The search core (encodings, objectives, archive, algorithm)
//!
//! # Example
//!
//! ```rust,no_run
//! use coversearch::{
//!     schema::SearchConfig,
//!     search::{
//!         BudgetManager, ExecutionResult, ObjectiveFunction, ObjectiveManager,
//!         Runner, SearchAlgorithm, StructuralPolicy, Subject, TestCase,
//!         TreeSampler,
//!     },
//! };
//!
//! struct MySubject;
//!
//! impl Subject for MySubject {
//!     fn objectives(&self) -> Vec<Box<dyn ObjectiveFunction>> {
//!         // Branch and function objectives of the code under test.
//!         Vec::new()
//!     }
//!     fn root_identifiers(&self) -> Vec<String> {
//!         Vec::new()
//!     }
//!     fn child_identifiers(&self, _identifier: &str) -> Vec<String> {
//!         Vec::new()
//!     }
//! }
//!
//! struct MyRunner;
//!
//! impl Runner for MyRunner {
//!     fn execute(&mut self, _encoding: &TestCase) -> ExecutionResult {
//!         ExecutionResult::new()
//!     }
//! }
//!
//! let config = SearchConfig::default();
//! config.validate().unwrap();
//!
//! let manager = ObjectiveManager::new(Box::new(MyRunner), StructuralPolicy);
//! let sampler = Box::new(TreeSampler::new(
//!     config.random_seed,
//!     config.sampler.max_depth,
//!     config.sampler.max_arity,
//! ));
//! let mut search = SearchAlgorithm::new(
//!     manager,
//!     sampler,
//!     config.algorithm,
//!     config.population,
//!     config.procreation.crossover_rate,
//!     config.procreation.mutation_rate,
//!     config.random_seed,
//! );
//!
//! let mut budget = BudgetManager::new(config.budget.budgets());
//! let result = search.run(&MySubject, &mut budget).unwrap();
//!
//! println!("coverage: {:.1}%", result.stats.coverage() * 100.0);
//! ```

pub mod schema;
pub mod search;

// Re-export commonly used types
pub use schema::{ConfigError, SearchConfig};
pub use search::{
    Archive, BudgetManager, ObjectiveManager, SearchAlgorithm, SearchError, SearchResult, TestCase,
};
