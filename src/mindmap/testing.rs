//! Tree fixtures shared by the layout, edit and reconcile tests.

use std::sync::Arc;

use proptest::prelude::*;

use super::types::{Node, NodeId};

/// Root "Central Idea" with children "A" (which has "A1") and "B".
pub(crate) fn scenario_tree() -> Node {
    Node::new("root".into(), "Central Idea")
        .with_child(Node::new("a".into(), "A").with_child(Node::new("a1".into(), "A1")))
        .with_child(Node::new("b".into(), "B"))
}

#[derive(Debug, Clone)]
pub(crate) struct Shape {
    text: String,
    children: Vec<Shape>,
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    let leaf = "[a-z ]{0,80}".prop_map(|text| Shape {
        text,
        children: Vec::new(),
    });
    leaf.prop_recursive(5, 64, 5, |inner| {
        ("[a-z ]{0,120}", prop::collection::vec(inner, 0..5))
            .prop_map(|(text, children)| Shape { text, children })
    })
}

fn build(shape: &Shape, next: &mut usize) -> Node {
    let mut node = Node::new(NodeId::new(format!("n{}", next)), shape.text.clone());
    *next += 1;
    for child in &shape.children {
        node.children.push(Arc::new(build(child, next)));
    }
    node
}

/// Random trees with unique ids `n0`, `n1`, ... in pre-order.
pub(crate) fn arb_tree() -> impl Strategy<Value = Node> {
    arb_shape().prop_map(|shape| build(&shape, &mut 0))
}
