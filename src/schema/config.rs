//! Configuration types for search runs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::search::{AlgorithmVariant, Budget};

/// Default population size.
fn default_population() -> usize {
    50
}

/// Default RNG seed; fixed so unconfigured runs are reproducible.
fn default_seed() -> u64 {
    42
}

fn default_crossover_rate() -> f64 {
    0.7
}

fn default_mutation_rate() -> f64 {
    0.3
}

fn default_max_depth() -> usize {
    5
}

fn default_max_arity() -> usize {
    4
}

fn default_max_evaluations() -> Option<u64> {
    Some(10_000)
}

/// Top-level search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Environmental-selection variant.
    #[serde(default)]
    pub algorithm: AlgorithmVariant,
    /// Number of encodings per generation.
    #[serde(default = "default_population")]
    pub population: usize,
    /// Resource limits; the run stops when any of them is exhausted.
    #[serde(default)]
    pub budget: BudgetConfig,
    /// Crossover and mutation parameters.
    #[serde(default)]
    pub procreation: ProcreationConfig,
    /// Gene-tree shape limits for sampled encodings.
    #[serde(default)]
    pub sampler: SamplerConfig,
    /// Seed for all randomness in the run.
    #[serde(default = "default_seed")]
    pub random_seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmVariant::default(),
            population: default_population(),
            budget: BudgetConfig::default(),
            procreation: ProcreationConfig::default(),
            sampler: SamplerConfig::default(),
            random_seed: default_seed(),
        }
    }
}

/// Resource limits for a run. A limit left unset does not constrain the
/// search; at least one must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Maximum number of encoding evaluations.
    #[serde(default = "default_max_evaluations")]
    pub max_evaluations: Option<u64>,
    /// Maximum number of generations.
    #[serde(default)]
    pub max_generations: Option<u64>,
    /// Maximum wall-clock time in seconds.
    #[serde(default)]
    pub max_search_time_secs: Option<u64>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_evaluations: default_max_evaluations(),
            max_generations: None,
            max_search_time_secs: None,
        }
    }
}

impl BudgetConfig {
    /// Materialize the configured limits.
    pub fn budgets(&self) -> Vec<Budget> {
        let mut budgets = Vec::new();
        if let Some(max) = self.max_evaluations {
            budgets.push(Budget::evaluations(max));
        }
        if let Some(max) = self.max_generations {
            budgets.push(Budget::generations(max));
        }
        if let Some(secs) = self.max_search_time_secs {
            budgets.push(Budget::search_time(Duration::from_secs(secs)));
        }
        budgets
    }
}

/// Crossover and mutation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcreationConfig {
    /// Probability that an offspring is produced by crossover (0.0-1.0).
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Probability that an offspring is mutated (0.0-1.0).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
}

impl Default for ProcreationConfig {
    fn default() -> Self {
        Self {
            crossover_rate: default_crossover_rate(),
            mutation_rate: default_mutation_rate(),
        }
    }
}

/// Shape limits for sampled gene trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Maximum tree depth.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Maximum children per node.
    #[serde(default = "default_max_arity")]
    pub max_arity: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_arity: default_max_arity(),
        }
    }
}

impl SearchConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population < 2 {
            return Err(ConfigError::PopulationTooSmall);
        }
        if self.budget.max_evaluations.is_none()
            && self.budget.max_generations.is_none()
            && self.budget.max_search_time_secs.is_none()
        {
            return Err(ConfigError::NoBudget);
        }
        if !(0.0..=1.0).contains(&self.procreation.crossover_rate) {
            return Err(ConfigError::InvalidCrossoverRate);
        }
        if !(0.0..=1.0).contains(&self.procreation.mutation_rate) {
            return Err(ConfigError::InvalidMutationRate);
        }
        if self.sampler.max_depth == 0 || self.sampler.max_arity == 0 {
            return Err(ConfigError::InvalidSamplerShape);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Population must be at least 2")]
    PopulationTooSmall,
    #[error("At least one budget limit must be set")]
    NoBudget,
    #[error("Crossover rate must be between 0.0 and 1.0")]
    InvalidCrossoverRate,
    #[error("Mutation rate must be between 0.0 and 1.0")]
    InvalidMutationRate,
    #[error("Sampler depth and arity must be non-zero")]
    InvalidSamplerShape,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_tiny_population() {
        let config = SearchConfig {
            population: 1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PopulationTooSmall)
        ));
    }

    #[test]
    fn test_rejects_missing_budget() {
        let config = SearchConfig {
            budget: BudgetConfig {
                max_evaluations: None,
                max_generations: None,
                max_search_time_secs: None,
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoBudget)));
    }

    #[test]
    fn test_rejects_out_of_range_rates() {
        let config = SearchConfig {
            procreation: ProcreationConfig {
                crossover_rate: 1.5,
                mutation_rate: 0.3,
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCrossoverRate)
        ));
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let config: SearchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.population, 50);
        assert_eq!(config.budget.max_evaluations, Some(10_000));
        assert_eq!(config.algorithm, AlgorithmVariant::Mosa);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_budgets_materialize_configured_limits() {
        let config = BudgetConfig {
            max_evaluations: Some(100),
            max_generations: Some(5),
            max_search_time_secs: None,
        };
        assert_eq!(config.budgets().len(), 2);
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = SearchConfig {
            algorithm: AlgorithmVariant::ArchiveElitist,
            random_seed: 7,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: SearchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.algorithm, AlgorithmVariant::ArchiveElitist);
        assert_eq!(parsed.random_seed, 7);
    }
}
