use log::debug;
use rand::Rng;
use std::fmt;
use std::sync::Arc;

use super::ast::{ExprTree, NodeId, NodeValue, Slot};
use super::generator::ExprGenerator;
use crate::config::MutationRates;
use crate::error::Result;
use crate::functions::registry::FunctionRegistry;
use crate::types::Genome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Node and descendants replaced by a fresh random expression
    ReplaceWithRandom,
    /// Function swapped for another, arguments reconciled
    Retarget,
    /// Scalar nudged by a uniform [0, 1) amount
    AdjustScalar,
    /// Node pushed down as the first argument of a new function
    WrapInFunction,
    /// Node replaced by one of its own arguments
    CollapseToArgument,
    /// Node replaced by a copy of some node in the same tree
    CopyRandomNode,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationKind::ReplaceWithRandom => "random expression",
            MutationKind::Retarget => "different function",
            MutationKind::AdjustScalar => "adjust scalar",
            MutationKind::WrapInFunction => "become argument of new function",
            MutationKind::CollapseToArgument => "become value of argument",
            MutationKind::CopyRandomNode => "become copy of another node",
        };
        f.write_str(name)
    }
}

const FUNCTION_KINDS: [MutationKind; 5] = [
    MutationKind::ReplaceWithRandom,
    MutationKind::Retarget,
    MutationKind::WrapInFunction,
    MutationKind::CollapseToArgument,
    MutationKind::CopyRandomNode,
];

const SCALAR_KINDS: [MutationKind; 4] = [
    MutationKind::ReplaceWithRandom,
    MutationKind::AdjustScalar,
    MutationKind::WrapInFunction,
    MutationKind::CopyRandomNode,
];

const VARIABLE_KINDS: [MutationKind; 3] = [
    MutationKind::ReplaceWithRandom,
    MutationKind::WrapInFunction,
    MutationKind::CopyRandomNode,
];

/// Index of the interval containing `draw` when `weights` are laid end to
/// end from 0; `None` past the last interval
fn pick_weighted(weights: &[f64], draw: f64) -> Option<usize> {
    let mut lower = 0.0;
    for (index, weight) in weights.iter().enumerate() {
        let upper = lower + weight;
        if draw >= lower && draw < upper {
            return Some(index);
        }
        lower = upper;
    }
    None
}

/// What a mutation pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// No node passed the global rate
    Untouched,
    /// A node was selected; `kind` is `None` when its category draw fell
    /// past the last weight interval
    Selected {
        node: NodeId,
        kind: Option<MutationKind>,
    },
}

/// Arity-aware random rewriting of expression trees
#[derive(Debug, Clone)]
pub struct MutationEngine {
    generator: ExprGenerator,
    rates: MutationRates,
}

impl MutationEngine {
    pub fn new(registry: Arc<FunctionRegistry>, rates: MutationRates) -> Self {
        Self {
            generator: ExprGenerator::new(registry),
            rates,
        }
    }

    pub fn rates(&self) -> &MutationRates {
        &self.rates
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        self.generator.registry()
    }

    /// Parse, mutate and re-serialize a genome
    pub fn mutate<R: Rng + ?Sized>(&self, genome: &str, rng: &mut R) -> Result<Genome> {
        let mut tree = ExprTree::parse(genome, self.registry())?;
        self.mutate_tree(&mut tree, rng);
        Ok(tree.to_genome())
    }

    /// Walk the tree in pre-order, drawing once per node against the global
    /// rate. The first node that passes is mutated and the walk ends there.
    pub fn mutate_tree<R: Rng + ?Sized>(&self, tree: &mut ExprTree, rng: &mut R) -> MutationOutcome {
        let mut stack = vec![tree.root()];
        while let Some(id) = stack.pop() {
            if rng.gen::<f64>() < self.rates.global {
                let kind = self.mutate_node(tree, id, rng);
                debug_assert!(tree.validate().is_ok());
                return MutationOutcome::Selected { node: id, kind };
            }
            let node = tree.node(id);
            for slot in Slot::ALL.iter().rev() {
                if let Some(child) = node.child(*slot) {
                    stack.push(child);
                }
            }
        }
        MutationOutcome::Untouched
    }

    /// Apply one weighted mutation category to node `id`
    pub fn mutate_node<R: Rng + ?Sized>(
        &self,
        tree: &mut ExprTree,
        id: NodeId,
        rng: &mut R,
    ) -> Option<MutationKind> {
        let draw = rng.gen::<f64>();
        let kind = match tree.value(id) {
            NodeValue::Function(_) => {
                pick_weighted(&self.rates.function, draw).map(|i| FUNCTION_KINDS[i])
            }
            NodeValue::Scalar(_) => pick_weighted(&self.rates.scalar, draw).map(|i| SCALAR_KINDS[i]),
            NodeValue::Variable(_) => {
                pick_weighted(&self.rates.variable, draw).map(|i| VARIABLE_KINDS[i])
            }
        }?;

        match kind {
            MutationKind::ReplaceWithRandom => self.replace_with_random(tree, id, rng),
            MutationKind::Retarget => self.retarget(tree, id, rng),
            MutationKind::AdjustScalar => {
                if let NodeValue::Scalar(v) = tree.value(id) {
                    tree.set_value(id, NodeValue::Scalar(v + rng.gen::<f64>()));
                }
            }
            MutationKind::WrapInFunction => self.wrap_in_function(tree, id, rng),
            MutationKind::CollapseToArgument => self.collapse_to_argument(tree, id, rng),
            MutationKind::CopyRandomNode => self.copy_random_node(tree, id, rng),
        }
        debug!("Mutated node {}: {}", id, kind);
        Some(kind)
    }

    fn replace_with_random<R: Rng + ?Sized>(&self, tree: &mut ExprTree, id: NodeId, rng: &mut R) {
        let fresh = self.generator.grow(tree, rng);
        tree.absorb(id, fresh);
    }

    fn retarget<R: Rng + ?Sized>(&self, tree: &mut ExprTree, id: NodeId, rng: &mut R) {
        let current = match tree.value(id) {
            NodeValue::Function(f) => f,
            _ => return,
        };
        let next = self.registry().random_function_except(current, rng);
        if next == current {
            return;
        }
        tree.set_value(id, NodeValue::Function(next));

        let node = tree.node(id).clone();
        match (current.arity(), next.arity()) {
            (old, new) if old == new => {}
            (1, _) | (2, 3) => {
                // Keep existing arguments, grow the new slots
                self.generator.fill_arguments(tree, id, current.arity(), rng);
            }
            (2, 1) => {
                if rng.gen_range(0..2) == 1 {
                    tree.set_child(id, Slot::Left, node.right);
                }
                tree.set_child(id, Slot::Right, None);
            }
            (3, 1) => {
                let keep = match rng.gen_range(0..3) {
                    0 => node.left,
                    1 => node.right,
                    _ => node.l_factor,
                };
                tree.set_child(id, Slot::Left, keep);
                tree.set_child(id, Slot::Right, None);
                tree.set_child(id, Slot::LFactor, None);
            }
            (3, 2) => {
                match rng.gen_range(0..3) {
                    0 => {}
                    1 => tree.set_child(id, Slot::Right, node.l_factor),
                    _ => tree.set_child(id, Slot::Left, node.l_factor),
                }
                tree.set_child(id, Slot::LFactor, None);
            }
            _ => {}
        }
    }

    fn wrap_in_function<R: Rng + ?Sized>(&self, tree: &mut ExprTree, id: NodeId, rng: &mut R) {
        let wrapper = self.registry().random_function(rng);
        let node = tree.node(id).clone();

        // Detached copy of the current node that takes over its children
        let inner = tree.add_node(node.value);
        tree.set_child(inner, Slot::Left, node.left);
        tree.set_child(inner, Slot::Right, node.right);
        tree.set_child(inner, Slot::LFactor, node.l_factor);

        tree.set_value(id, NodeValue::Function(wrapper));
        tree.set_child(id, Slot::Left, Some(inner));
        tree.set_child(id, Slot::Right, None);
        tree.set_child(id, Slot::LFactor, None);
        self.generator.fill_arguments(tree, id, 1, rng);
    }

    fn collapse_to_argument<R: Rng + ?Sized>(&self, tree: &mut ExprTree, id: NodeId, rng: &mut R) {
        let arity = match tree.value(id) {
            NodeValue::Function(f) => f.arity(),
            _ => return,
        };
        let slot = match arity {
            1 => Slot::Left,
            n => Slot::ALL[rng.gen_range(0..n)],
        };
        if let Some(child) = tree.node(id).child(slot) {
            tree.absorb(id, child);
        }
    }

    /// Any node of the tree may be drawn, including `id` itself. Repeated
    /// copies can grow the tree without bound; size limits are the caller's.
    fn copy_random_node<R: Rng + ?Sized>(&self, tree: &mut ExprTree, id: NodeId, rng: &mut R) {
        let root = tree.find_root(id);
        let candidates = tree.preorder_from(root);
        let chosen = candidates[rng.gen_range(0..candidates.len())];
        let copy = tree.duplicate(chosen);
        tree.replace(id, copy);
    }
}
