pub mod sexpr;
pub mod ast;
pub mod generator;
pub mod mutation;
pub mod operators;
pub mod progress;
pub mod evolver;

pub use ast::{ExprTree, Node, NodeId, NodeValue, Slot};
pub use generator::ExprGenerator;
pub use mutation::{MutationEngine, MutationKind, MutationOutcome};
pub use operators::{crossover, crossover_trees, swap_subtrees_at};
pub use progress::{ConsoleProgressCallback, ProgressCallback, SilentProgress};
pub use evolver::PicEvolver;
