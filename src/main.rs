//! Coversearch CLI - Run a search against a bundled demo subject.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use coversearch::{
    schema::SearchConfig,
    search::{
        BranchObjective, BudgetManager, ComparisonTrace, ExecutionResult, FunctionObjective,
        ObjectiveFunction, ObjectiveManager, Opcode, Runner, SearchAlgorithm, StructuralPolicy,
        Subject, TestCase, TreeSampler,
    },
};

/// Demo subject: `classify(a, b)` with a branch on `a > b`, a nested
/// branch on `a == 10`, and a fault when the operands are equal.
struct DemoSubject;

impl Subject for DemoSubject {
    fn objectives(&self) -> Vec<Box<dyn ObjectiveFunction>> {
        vec![
            Box::new(FunctionObjective::new("classify")),
            Box::new(BranchObjective::new("b0", true)),
            Box::new(BranchObjective::new("b0", false)),
            Box::new(BranchObjective::new("b1", true)),
            Box::new(BranchObjective::new("b1", false)),
        ]
    }

    fn root_identifiers(&self) -> Vec<String> {
        vec!["classify".to_string()]
    }

    fn child_identifiers(&self, identifier: &str) -> Vec<String> {
        match identifier {
            "classify" => vec!["b0:true".to_string(), "b0:false".to_string()],
            "b0:true" => vec!["b1:true".to_string(), "b1:false".to_string()],
            _ => Vec::new(),
        }
    }
}

/// Interprets an encoding's first two numeric leaves as the arguments of
/// `classify` and records comparison traces the way an instrumented
/// subject would.
struct DemoRunner;

impl DemoRunner {
    fn arguments(encoding: &TestCase) -> (f64, f64) {
        let root = encoding.root();
        let mut values = Vec::new();
        for path in root.leaf_paths() {
            if let Some(node) = root.node_at(&path) {
                if let Ok(value) = node.name().parse::<f64>() {
                    values.push(value);
                    if values.len() == 2 {
                        break;
                    }
                }
            }
        }
        let a = values.first().copied().unwrap_or(0.0);
        let b = values.get(1).copied().unwrap_or(0.0);
        (a, b)
    }
}

impl Runner for DemoRunner {
    fn execute(&mut self, encoding: &TestCase) -> ExecutionResult {
        let (a, b) = Self::arguments(encoding);

        let mut result = ExecutionResult::new().with_hit("classify").with_trace(
            ComparisonTrace {
                site: "b0".to_string(),
                opcode: Opcode::Gt,
                left: vec![a],
                right: vec![b],
            },
        );

        if a == b {
            result = result.with_exception("DivisionByZero in classify");
        }

        if a > b {
            result = result.with_hit("b0:true").with_trace(ComparisonTrace {
                site: "b1".to_string(),
                opcode: Opcode::Eq,
                left: vec![a],
                right: vec![10.0],
            });
            if a == 10.0 {
                result = result.with_hit("b1:true");
            } else {
                result = result.with_hit("b1:false");
            }
        } else {
            result = result.with_hit("b0:false");
        }
        result
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_config();
        return;
    }

    if args.len() > 1 && (args[1] == "--help" || args[1] == "-h") {
        eprintln!("Usage: {} [config.json] [archive-dir]", args[0]);
        eprintln!();
        eprintln!("Run a coverage search against the bundled demo subject.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to search configuration file (default: built-in)");
        eprintln!("  archive-dir  Directory for archived test cases (default: none)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    // Load configuration
    let config: SearchConfig = match args.get(1) {
        Some(path) => {
            let config_str = fs::read_to_string(PathBuf::from(path)).unwrap_or_else(|e| {
                eprintln!("Error reading config file: {}", e);
                std::process::exit(1);
            });
            serde_json::from_str(&config_str).unwrap_or_else(|e| {
                eprintln!("Error parsing config: {}", e);
                std::process::exit(1);
            })
        }
        None => SearchConfig::default(),
    };

    if let Err(e) = config.validate() {
        eprintln!("Invalid config: {}", e);
        std::process::exit(1);
    }

    println!("Coversearch");
    println!("===========");
    println!("Algorithm: {:?}", config.algorithm);
    println!("Population: {}", config.population);
    println!("Seed: {}", config.random_seed);
    println!();

    let manager = ObjectiveManager::new(Box::new(DemoRunner), StructuralPolicy);
    let sampler = Box::new(TreeSampler::new(
        config.random_seed,
        config.sampler.max_depth,
        config.sampler.max_arity,
    ));
    let mut search = SearchAlgorithm::new(
        manager,
        sampler,
        config.algorithm,
        config.population,
        config.procreation.crossover_rate,
        config.procreation.mutation_rate,
        config.random_seed,
    );
    let mut budget = BudgetManager::new(config.budget.budgets());

    println!("Running search...");
    let start = Instant::now();
    let result = match search.run(&DemoSubject, &mut budget) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Search failed: {}", e);
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    println!();
    println!("Stopped: {:?}", result.stop_reason);
    println!(
        "  Coverage: {:.1}% ({}/{} objectives)",
        result.stats.coverage() * 100.0,
        result.stats.covered_objectives,
        result.stats.total_objectives
    );
    println!("  Faults found: {}", result.stats.faults_found);
    println!("  Generations: {}", result.stats.generations);
    println!("  Evaluations: {}", result.stats.evaluations);
    println!("Time: {:.2}s", elapsed.as_secs_f32());

    if let Some(dir) = args.get(2) {
        let archive = search.manager().archive();
        match archive.write_json(search.manager().pool(), dir) {
            Ok(paths) => println!("Archived {} test cases to {}", paths.len(), dir),
            Err(e) => {
                eprintln!("Error writing archive: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn print_example_config() {
    let config = SearchConfig::default();

    println!("Example configuration (config.json):");
    println!("{}", serde_json::to_string_pretty(&config).unwrap());
}
