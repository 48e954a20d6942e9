use rand::Rng;
use std::sync::Arc;

use super::ast::{ExprTree, NodeId, NodeValue, Slot};
use crate::functions::registry::FunctionRegistry;
use crate::types::{Coordinate, Genome};

/// Builds random expressions over the enabled functions.
///
/// A random expression is a uniformly chosen function whose arguments are
/// each, with equal odds, a scalar in [0, 1), a coordinate symbol, or
/// another random expression. Depth is unbounded; the two leaf choices
/// make the recursion die out.
#[derive(Debug, Clone)]
pub struct ExprGenerator {
    registry: Arc<FunctionRegistry>,
}

impl ExprGenerator {
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    pub fn random_tree<R: Rng + ?Sized>(&self, rng: &mut R) -> ExprTree {
        let function = self.registry.random_function(rng);
        let mut tree = ExprTree::leaf(NodeValue::Function(function));
        let root = tree.root();
        self.fill_arguments(&mut tree, root, 0, rng);
        tree
    }

    pub fn random_genome<R: Rng + ?Sized>(&self, rng: &mut R) -> Genome {
        self.random_tree(rng).to_genome()
    }

    /// Grow a detached random expression inside `tree`'s arena
    pub fn grow<R: Rng + ?Sized>(&self, tree: &mut ExprTree, rng: &mut R) -> NodeId {
        let function = self.registry.random_function(rng);
        let id = tree.add_node(NodeValue::Function(function));
        self.fill_arguments(tree, id, 0, rng);
        id
    }

    /// Populate argument slots `from..arity` of function node `id`
    pub fn fill_arguments<R: Rng + ?Sized>(
        &self,
        tree: &mut ExprTree,
        id: NodeId,
        from: usize,
        rng: &mut R,
    ) {
        let arity = match tree.value(id) {
            NodeValue::Function(f) => f.arity(),
            _ => 0,
        };
        for index in from..arity {
            let child = self.random_argument(tree, rng);
            if let Some(slot) = Slot::for_argument(index) {
                tree.set_child(id, slot, Some(child));
            }
        }
    }

    fn random_argument<R: Rng + ?Sized>(&self, tree: &mut ExprTree, rng: &mut R) -> NodeId {
        match rng.gen_range(0..3) {
            0 => tree.add_node(NodeValue::Scalar(rng.gen::<f64>())),
            1 => {
                let coordinate = Coordinate::ALL[rng.gen_range(0..Coordinate::ALL.len())];
                tree.add_node(NodeValue::Variable(coordinate))
            }
            _ => self.grow(tree, rng),
        }
    }
}
