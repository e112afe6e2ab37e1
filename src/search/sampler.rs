//! Seeded generation and variation of encodings.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use super::encoding::TestCase;
use super::gene::GeneNode;

/// Source of fresh and varied encodings. Variation never touches its
/// inputs; every returned encoding is a new individual with a fresh id.
pub trait EncodingSampler {
    /// Produce a fresh random encoding.
    fn sample(&mut self) -> TestCase;

    /// Produce a mutated copy of an encoding, varying the subtree rooted
    /// at the given depth (1 = root) along a random path.
    fn mutate(&mut self, encoding: &TestCase, depth: usize) -> TestCase;

    /// Produce an offspring combining two parents.
    fn crossover(&mut self, left: &TestCase, right: &TestCase) -> TestCase;
}

/// Samples call-shaped gene trees with numeric argument leaves. Mutation
/// perturbs one leaf with gaussian noise; crossover grafts a subtree of
/// one parent onto the other.
pub struct TreeSampler {
    rng: StdRng,
    max_depth: usize,
    max_arity: usize,
    mutation_sigma: f64,
}

impl TreeSampler {
    pub fn new(seed: u64, max_depth: usize, max_arity: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            max_depth: max_depth.max(1),
            max_arity: max_arity.max(1),
            mutation_sigma: 1.0,
        }
    }

    fn random_leaf(&mut self) -> GeneNode {
        let value: f64 = self.rng.gen_range(-10.0..10.0);
        GeneNode::leaf(format!("{value:.3}"), "num")
    }

    fn random_tree(&mut self, depth: usize) -> GeneNode {
        if depth >= self.max_depth || self.rng.gen_bool(0.3) {
            return self.random_leaf();
        }
        let arity = self.rng.gen_range(1..=self.max_arity);
        let children = (0..arity)
            .map(|_| Arc::new(self.random_tree(depth + 1)))
            .collect();
        GeneNode::with_children("call", "fn", children)
    }

    /// Gaussian perturbation of a numeric leaf. Leaves whose name is not a
    /// number are resampled instead.
    fn perturbed_leaf(&mut self, leaf: &GeneNode) -> GeneNode {
        match leaf.name().parse::<f64>() {
            Ok(value) => {
                let noise: f64 = self.rng.sample(StandardNormal);
                let perturbed = value + noise * self.mutation_sigma;
                GeneNode::leaf(format!("{perturbed:.3}"), leaf.type_tag())
            }
            Err(_) => self.random_leaf(),
        }
    }
}

impl EncodingSampler for TreeSampler {
    fn sample(&mut self) -> TestCase {
        let root = self.random_tree(1);
        TestCase::new(root)
    }

    fn mutate(&mut self, encoding: &TestCase, depth: usize) -> TestCase {
        let root = encoding.root();
        let paths = root.leaf_paths();
        let mut path = paths[self.rng.gen_range(0..paths.len())].clone();
        // A node at depth d sits d - 1 edges below the root.
        path.truncate(depth.saturating_sub(1).min(path.len()));

        let replacement = match root.node_at(&path) {
            Some(node) if !node.has_children() => self.perturbed_leaf(node),
            // Interior target: regrow the subtree within the depth limit.
            Some(_) => self.random_tree(path.len() + 1),
            None => self.random_leaf(),
        };

        // replace_at shares untouched subtrees with the parent tree.
        let mutated = root
            .replace_at(&path, Arc::new(replacement))
            .unwrap_or_else(|| root.deep_copy());
        TestCase::new(mutated)
    }

    fn crossover(&mut self, left: &TestCase, right: &TestCase) -> TestCase {
        let target_paths = left.root().leaf_paths();
        let target = &target_paths[self.rng.gen_range(0..target_paths.len())];

        let donor_paths = right.root().leaf_paths();
        let donor_path = &donor_paths[self.rng.gen_range(0..donor_paths.len())];
        // Fresh ids for the grafted subtree keep node ids unique per tree.
        let donor = right
            .root()
            .node_at(donor_path)
            .map(GeneNode::deep_copy)
            .unwrap_or_else(|| self.random_leaf());

        let offspring = left
            .root()
            .replace_at(target, Arc::new(donor))
            .unwrap_or_else(|| left.root().deep_copy());
        TestCase::new(offspring)
    }
}
