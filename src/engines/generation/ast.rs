//! Expression trees over the primitive library.
//!
//! Nodes live in an arena owned by [`ExprTree`]. Children are referenced by
//! index from their parent's slots; the `parent` index is a non-owning
//! back-reference used only to find the root and to reattach a node after
//! it has been replaced. Replaced nodes stay in the arena, unreachable, until
//! the tree is dropped.

use std::fmt;

use super::sexpr::{self, SExpr};
use crate::error::{PicEvolveError, Result};
use crate::functions::registry::{Function, FunctionRegistry};
use crate::types::{Coordinate, Genome};

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeValue {
    Function(Function),
    Scalar(f64),
    Variable(Coordinate),
}

/// Argument slots of a function node, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Left,
    Right,
    LFactor,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Left, Slot::Right, Slot::LFactor];

    /// Slot holding argument number `index`
    pub fn for_argument(index: usize) -> Option<Slot> {
        Self::ALL.get(index).copied()
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub value: NodeValue,
    pub parent: Option<NodeId>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub l_factor: Option<NodeId>,
}

impl Node {
    fn detached(value: NodeValue) -> Self {
        Self {
            value,
            parent: None,
            left: None,
            right: None,
            l_factor: None,
        }
    }

    pub fn child(&self, slot: Slot) -> Option<NodeId> {
        match slot {
            Slot::Left => self.left,
            Slot::Right => self.right,
            Slot::LFactor => self.l_factor,
        }
    }

    fn child_mut(&mut self, slot: Slot) -> &mut Option<NodeId> {
        match slot {
            Slot::Left => &mut self.left,
            Slot::Right => &mut self.right,
            Slot::LFactor => &mut self.l_factor,
        }
    }

    /// Populated children in slot order
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        Slot::ALL.iter().filter_map(move |slot| self.child(*slot))
    }

    pub fn is_function(&self) -> bool {
        matches!(self.value, NodeValue::Function(_))
    }
}

#[derive(Debug, Clone)]
pub struct ExprTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl ExprTree {
    /// Tree holding a single node
    pub fn leaf(value: NodeValue) -> Self {
        Self {
            nodes: vec![Node::detached(value)],
            root: 0,
        }
    }

    /// Parse genome text, checking every function against `registry`
    pub fn parse(text: &str, registry: &FunctionRegistry) -> Result<Self> {
        let sexpr = sexpr::parse(text)?;
        let mut tree = Self {
            nodes: Vec::new(),
            root: 0,
        };
        tree.root = tree.build(&sexpr, registry)?;
        Ok(tree)
    }

    fn build(&mut self, sexpr: &SExpr, registry: &FunctionRegistry) -> Result<NodeId> {
        match sexpr {
            SExpr::Atom(token) => {
                let value = parse_leaf(token, registry)?;
                Ok(self.add_node(value))
            }
            SExpr::List(items) => {
                let (head, args) = match items.split_first() {
                    Some((SExpr::Atom(head), args)) => (head, args),
                    Some((SExpr::List(_), _)) => {
                        return Err(PicEvolveError::MalformedGenome(
                            "expression must start with a function name".to_string(),
                        ))
                    }
                    None => {
                        return Err(PicEvolveError::MalformedGenome(
                            "empty expression '()'".to_string(),
                        ))
                    }
                };
                let function = registry
                    .get(head)
                    .ok_or_else(|| PicEvolveError::UnknownFunction(head.clone()))?;
                if args.len() != function.arity() {
                    return Err(PicEvolveError::ArityMismatch {
                        function: head.clone(),
                        expected: function.arity(),
                        actual: args.len(),
                    });
                }

                let id = self.add_node(NodeValue::Function(function));
                for (index, arg) in args.iter().enumerate() {
                    let child = self.build(arg, registry)?;
                    if let Some(slot) = Slot::for_argument(index) {
                        self.set_child(id, slot, Some(child));
                    }
                }
                Ok(id)
            }
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn value(&self, id: NodeId) -> NodeValue {
        self.nodes[id].value
    }

    pub fn set_value(&mut self, id: NodeId, value: NodeValue) {
        self.nodes[id].value = value;
    }

    /// Allocate a detached node
    pub fn add_node(&mut self, value: NodeValue) -> NodeId {
        self.nodes.push(Node::detached(value));
        self.nodes.len() - 1
    }

    /// Point `slot` of `parent` at `child`, repairing the child's back-reference
    pub fn set_child(&mut self, parent: NodeId, slot: Slot, child: Option<NodeId>) {
        *self.nodes[parent].child_mut(slot) = child;
        if let Some(c) = child {
            self.nodes[c].parent = Some(parent);
        }
    }

    /// Parent and slot currently holding `id`
    pub fn position(&self, id: NodeId) -> Option<(NodeId, Slot)> {
        let parent = self.nodes[id].parent?;
        Slot::ALL
            .iter()
            .find(|slot| self.nodes[parent].child(**slot) == Some(id))
            .map(|slot| (parent, *slot))
    }

    /// Follow parent links up from `id`
    pub fn find_root(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.nodes[current].parent {
            current = parent;
        }
        current
    }

    /// Put `replacement` where `at` currently sits; `at` becomes unreachable
    pub fn replace(&mut self, at: NodeId, replacement: NodeId) {
        match self.position(at) {
            Some((parent, slot)) => self.set_child(parent, slot, Some(replacement)),
            None => {
                self.nodes[replacement].parent = None;
                self.root = replacement;
            }
        }
        self.nodes[at].parent = None;
    }

    /// Give `target` the value and children of `source`, keeping `target`'s
    /// place in the tree. `source` becomes unreachable.
    pub fn absorb(&mut self, target: NodeId, source: NodeId) {
        let Node {
            value,
            left,
            right,
            l_factor,
            ..
        } = self.nodes[source].clone();
        self.nodes[target].value = value;
        self.set_child(target, Slot::Left, left);
        self.set_child(target, Slot::Right, right);
        self.set_child(target, Slot::LFactor, l_factor);
        let detached = &mut self.nodes[source];
        detached.parent = None;
        detached.left = None;
        detached.right = None;
        detached.l_factor = None;
    }

    /// Deep copy of the subtree at `id`, detached
    pub fn duplicate(&mut self, id: NodeId) -> NodeId {
        let node = self.nodes[id].clone();
        let copy = self.add_node(node.value);
        for slot in Slot::ALL {
            if let Some(child) = node.child(slot) {
                let child_copy = self.duplicate(child);
                self.set_child(copy, slot, Some(child_copy));
            }
        }
        copy
    }

    /// Deep copy of the subtree at `id` in `source` into this arena, detached
    pub fn import(&mut self, source: &ExprTree, id: NodeId) -> NodeId {
        let node = source.node(id);
        let copy = self.add_node(node.value);
        for slot in Slot::ALL {
            if let Some(child) = node.child(slot) {
                let child_copy = self.import(source, child);
                self.set_child(copy, slot, Some(child_copy));
            }
        }
        copy
    }

    /// Reachable nodes under `from`, pre-order
    pub fn preorder_from(&self, from: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            order.push(id);
            let node = &self.nodes[id];
            for slot in Slot::ALL.iter().rev() {
                if let Some(child) = node.child(*slot) {
                    stack.push(child);
                }
            }
        }
        order
    }

    /// Every reachable node, pre-order from the root
    pub fn preorder(&self) -> Vec<NodeId> {
        self.preorder_from(self.root)
    }

    /// Number of reachable nodes
    pub fn len(&self) -> usize {
        self.preorder().len()
    }

    pub fn depth(&self) -> usize {
        fn walk(tree: &ExprTree, id: NodeId) -> usize {
            1 + tree
                .node(id)
                .children()
                .map(|c| walk(tree, c))
                .max()
                .unwrap_or(0)
        }
        walk(self, self.root)
    }

    /// Check the arity and parent-link invariants over the reachable tree
    pub fn validate(&self) -> Result<()> {
        if self.nodes[self.root].parent.is_some() {
            return Err(PicEvolveError::MalformedGenome(
                "root has a parent".to_string(),
            ));
        }
        for id in self.preorder() {
            let node = &self.nodes[id];
            let expected = match node.value {
                NodeValue::Function(f) => f.arity(),
                _ => 0,
            };
            let populated: Vec<Slot> = Slot::ALL
                .iter()
                .copied()
                .filter(|slot| node.child(*slot).is_some())
                .collect();
            if populated.as_slice() != &Slot::ALL[..expected] {
                return Err(PicEvolveError::ArityMismatch {
                    function: self.label(id),
                    expected,
                    actual: populated.len(),
                });
            }
            for child in node.children() {
                if self.nodes[child].parent != Some(id) {
                    return Err(PicEvolveError::MalformedGenome(format!(
                        "child of {} does not point back to it",
                        self.label(id)
                    )));
                }
            }
        }
        Ok(())
    }

    fn label(&self, id: NodeId) -> String {
        match self.nodes[id].value {
            NodeValue::Function(f) => f.name().to_string(),
            NodeValue::Scalar(v) => format!("{:?}", v),
            NodeValue::Variable(c) => c.symbol().to_string(),
        }
    }

    /// Canonical genome text
    pub fn to_genome(&self) -> Genome {
        let mut out = String::new();
        self.write_node(self.root, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id];
        match node.value {
            NodeValue::Function(f) => {
                out.push('(');
                out.push_str(f.name());
                for child in node.children() {
                    out.push(' ');
                    self.write_node(child, out);
                }
                out.push(')');
            }
            _ => out.push_str(&self.label(id)),
        }
    }

    fn subtree_eq(&self, a: NodeId, other: &ExprTree, b: NodeId) -> bool {
        let (na, nb) = (&self.nodes[a], &other.nodes[b]);
        if na.value != nb.value {
            return false;
        }
        Slot::ALL.iter().all(|slot| match (na.child(*slot), nb.child(*slot)) {
            (None, None) => true,
            (Some(ca), Some(cb)) => self.subtree_eq(ca, other, cb),
            _ => false,
        })
    }
}

/// Trees are equal when their reachable structure and values match
impl PartialEq for ExprTree {
    fn eq(&self, other: &Self) -> bool {
        self.subtree_eq(self.root, other, other.root)
    }
}

impl fmt::Display for ExprTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_genome())
    }
}

fn parse_leaf(token: &str, registry: &FunctionRegistry) -> Result<NodeValue> {
    if let Some(coordinate) = Coordinate::from_symbol(token) {
        return Ok(NodeValue::Variable(coordinate));
    }
    if let Ok(value) = token.parse::<f64>() {
        if value.is_finite() {
            return Ok(NodeValue::Scalar(value));
        }
    }
    if registry.get(token).is_some() {
        return Err(PicEvolveError::MalformedGenome(format!(
            "function '{}' used without parentheses",
            token
        )));
    }
    Err(PicEvolveError::MalformedGenome(format!(
        "'{}' is neither a number nor a coordinate",
        token
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ExprTree {
        ExprTree::parse(text, &FunctionRegistry::new()).unwrap()
    }

    #[test]
    fn test_parse_fills_slots_by_arity() {
        let tree = parse("(lerp x (sine y) 0.25)");
        let root = tree.node(tree.root());
        assert_eq!(root.value, NodeValue::Function(Function::Lerp));
        let left = root.left.unwrap();
        let right = root.right.unwrap();
        let l_factor = root.l_factor.unwrap();
        assert_eq!(tree.value(left), NodeValue::Variable(Coordinate::X));
        assert_eq!(tree.value(right), NodeValue::Function(Function::Sine));
        assert_eq!(tree.value(l_factor), NodeValue::Scalar(0.25));
        assert!(tree.node(right).right.is_none());
        assert_eq!(tree.node(left).parent, Some(tree.root()));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_parse_errors_are_classified() {
        let registry = FunctionRegistry::new();
        assert!(matches!(
            ExprTree::parse("(frobnicate x)", &registry),
            Err(PicEvolveError::UnknownFunction(name)) if name == "frobnicate"
        ));
        assert!(matches!(
            ExprTree::parse("(add x)", &registry),
            Err(PicEvolveError::ArityMismatch { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            ExprTree::parse("(sine add)", &registry),
            Err(PicEvolveError::MalformedGenome(_))
        ));
        assert!(matches!(
            ExprTree::parse("((sine x))", &registry),
            Err(PicEvolveError::MalformedGenome(_))
        ));
        assert!(matches!(
            ExprTree::parse("(sine inf)", &registry),
            Err(PicEvolveError::MalformedGenome(_))
        ));
    }

    #[test]
    fn test_registry_subset_rejects_disabled_function() {
        let registry = FunctionRegistry::with_functions(&[Function::Add]);
        assert!(matches!(
            ExprTree::parse("(sine x)", &registry),
            Err(PicEvolveError::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_serialize_is_canonical() {
        let tree = parse("  (add   (sine x)\n 1 ) ");
        assert_eq!(tree.to_genome(), "(add (sine x) 1.0)");
        assert_eq!(parse("0.5").to_genome(), "0.5");
    }

    #[test]
    fn test_replace_root() {
        let mut tree = parse("(add x y)");
        let right = tree.node(tree.root()).right.unwrap();
        let copy = tree.duplicate(right);
        tree.replace(tree.root(), copy);
        assert_eq!(tree.to_genome(), "y");
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_replace_inner_node_repairs_links() {
        let mut tree = parse("(add (sine x) y)");
        let left = tree.node(tree.root()).left.unwrap();
        let replacement = tree.add_node(NodeValue::Scalar(2.0));
        tree.replace(left, replacement);
        assert_eq!(tree.to_genome(), "(add 2.0 y)");
        assert_eq!(tree.position(replacement), Some((tree.root(), Slot::Left)));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_absorb_keeps_position() {
        let mut tree = parse("(mul (sine (cosine x)) r)");
        let sine = tree.node(tree.root()).left.unwrap();
        let cosine = tree.node(sine).left.unwrap();
        tree.absorb(sine, cosine);
        assert_eq!(tree.to_genome(), "(mul (cosine x) r)");
        assert_eq!(tree.position(sine), Some((tree.root(), Slot::Left)));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_preorder_and_find_root() {
        let tree = parse("(add (sine x) (mul y 0.5))");
        let order: Vec<String> = tree.preorder().into_iter().map(|id| tree.label(id)).collect();
        assert_eq!(order, vec!["add", "sine", "x", "mul", "y", "0.5"]);
        for id in tree.preorder() {
            assert_eq!(tree.find_root(id), tree.root());
        }
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn test_import_copies_across_trees() {
        let source = parse("(lerp x y (sine a))");
        let mut target = parse("(add x r)");
        let copied = target.import(&source, source.root());
        let right = target.node(target.root()).right.unwrap();
        target.replace(right, copied);
        assert_eq!(target.to_genome(), "(add x (lerp x y (sine a)))");
        assert!(target.validate().is_ok());
    }

    #[test]
    fn test_equality_ignores_arena_garbage() {
        let mut a = parse("(add x y)");
        let orphan = a.add_node(NodeValue::Scalar(9.0));
        let _ = orphan;
        assert_eq!(a, parse("(add x y)"));
        assert_ne!(a, parse("(add y x)"));
    }
}
