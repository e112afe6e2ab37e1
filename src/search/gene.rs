//! Persistent gene trees for test-case encodings.
//!
//! A gene tree is the composable genotype a [`TestCase`](super::TestCase) is
//! built from: statements and values as typed nodes. Nodes are immutable and
//! shared via `Arc`, so replacing a subtree produces a new root while every
//! holder of a previous root stays valid. Genetic operators work by path
//! replacement rather than in-place mutation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic id source for gene nodes, collision-free within a process.
static NEXT_GENE_ID: AtomicU64 = AtomicU64::new(0);

fn next_gene_id() -> u64 {
    NEXT_GENE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A single typed node in a gene tree.
///
/// The `name` carries the node's payload (an identifier or a value literal);
/// the core treats it as opaque. The derived [`var_name`](GeneNode::var_name)
/// is the handle downstream code generation uses to reference the node.
#[derive(Debug, Clone)]
pub struct GeneNode {
    name: String,
    type_tag: String,
    id: u64,
    children: Vec<Arc<GeneNode>>,
}

impl GeneNode {
    /// Create a leaf node with a fresh unique id.
    pub fn leaf(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self::with_children(name, type_tag, Vec::new())
    }

    /// Create a node with the given children.
    pub fn with_children(
        name: impl Into<String>,
        type_tag: impl Into<String>,
        children: Vec<Arc<GeneNode>>,
    ) -> Self {
        Self {
            name: name.into(),
            type_tag: type_tag.into(),
            id: next_gene_id(),
            children,
        }
    }

    /// Node name (identifier or value literal).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Semantic type tag.
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// Unique node id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Derived variable name: type tag concatenated with the node id.
    pub fn var_name(&self) -> String {
        format!("{}{}", self.type_tag, self.id)
    }

    /// Whether this node has children.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Child nodes.
    pub fn children(&self) -> &[Arc<GeneNode>] {
        &self.children
    }

    /// Total node count of the subtree rooted here.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(|c| c.size()).sum::<usize>()
    }

    /// Depth of the subtree rooted here (a leaf has depth 1).
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|c| c.depth())
            .max()
            .unwrap_or(0)
    }

    /// Replace the subtree at `path` (child indices from this root) with
    /// `subtree`, returning the new root.
    ///
    /// Untouched siblings keep their `Arc`s, so the result structurally
    /// shares everything outside the replaced path with `self`. Returns
    /// `None` if the path does not address a node.
    pub fn replace_at(&self, path: &[usize], subtree: Arc<GeneNode>) -> Option<GeneNode> {
        match path.split_first() {
            None => Some(GeneNode::clone(&subtree)),
            Some((&index, rest)) => {
                let child = self.children.get(index)?;
                let replaced = child.replace_at(rest, subtree)?;
                let mut children = self.children.clone();
                children[index] = Arc::new(replaced);
                Some(Self {
                    name: self.name.clone(),
                    type_tag: self.type_tag.clone(),
                    id: self.id,
                    children,
                })
            }
        }
    }

    /// Node at `path`, if the path addresses one.
    pub fn node_at(&self, path: &[usize]) -> Option<&GeneNode> {
        match path.split_first() {
            None => Some(self),
            Some((&index, rest)) => self.children.get(index)?.node_at(rest),
        }
    }

    /// Exact copy of the subtree with fresh ids throughout, so the copy is
    /// independently addressable by downstream code generation.
    pub fn deep_copy(&self) -> GeneNode {
        Self {
            name: self.name.clone(),
            type_tag: self.type_tag.clone(),
            id: next_gene_id(),
            children: self
                .children
                .iter()
                .map(|c| Arc::new(c.deep_copy()))
                .collect(),
        }
    }

    /// Paths to every leaf of the subtree, in left-to-right order.
    pub fn leaf_paths(&self) -> Vec<Vec<usize>> {
        let mut paths = Vec::new();
        let mut prefix = Vec::new();
        collect_leaf_paths(self, &mut prefix, &mut paths);
        paths
    }
}

fn collect_leaf_paths(node: &GeneNode, prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    if !node.has_children() {
        out.push(prefix.clone());
        return;
    }
    for (index, child) in node.children().iter().enumerate() {
        prefix.push(index);
        collect_leaf_paths(child, prefix, out);
        prefix.pop();
    }
}
