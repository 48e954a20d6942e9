use log::debug;
use rand::Rng;

use super::ast::ExprTree;
use crate::error::Result;
use crate::functions::registry::FunctionRegistry;
use crate::types::Genome;

/// Subtree-swap crossover: one node is drawn uniformly from each parent and
/// the two subtrees trade places.
pub fn crossover<R: Rng + ?Sized>(
    parent1: &str,
    parent2: &str,
    registry: &FunctionRegistry,
    rng: &mut R,
) -> Result<(Genome, Genome)> {
    let mut tree1 = ExprTree::parse(parent1, registry)?;
    let mut tree2 = ExprTree::parse(parent2, registry)?;
    crossover_trees(&mut tree1, &mut tree2, rng);
    Ok((tree1.to_genome(), tree2.to_genome()))
}

/// Cross over two trees in place, returning the pre-order positions swapped
pub fn crossover_trees<R: Rng + ?Sized>(
    tree1: &mut ExprTree,
    tree2: &mut ExprTree,
    rng: &mut R,
) -> (usize, usize) {
    let pos1 = rng.gen_range(0..tree1.len());
    let pos2 = rng.gen_range(0..tree2.len());
    swap_subtrees_at(tree1, pos1, tree2, pos2);
    debug!("Crossover at positions {} and {}", pos1, pos2);
    (pos1, pos2)
}

/// Swap the subtrees found at pre-order positions `pos1` and `pos2`.
///
/// Each side receives a deep copy of the other's subtree, so the swapped
/// subtree keeps its pre-order position and a second swap at the same
/// positions restores both trees.
///
/// # Panics
/// If either position is past the end of its tree's pre-order.
pub fn swap_subtrees_at(tree1: &mut ExprTree, pos1: usize, tree2: &mut ExprTree, pos2: usize) {
    let at1 = tree1.preorder()[pos1];
    let at2 = tree2.preorder()[pos2];

    let into1 = tree1.import(tree2, at2);
    let into2 = tree2.import(tree1, at1);

    tree1.replace(at1, into1);
    tree2.replace(at2, into2);
}
