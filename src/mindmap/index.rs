use std::collections::HashMap;

use super::types::{Node, NodeId};

/// Lookup from node id to its parent id, rebuilt from the tree after every
/// edit. Lets callers find a node's parent and ancestry without walking the
/// whole tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParentIndex {
    root: Option<NodeId>,
    parents: HashMap<NodeId, Option<NodeId>>,
}

impl ParentIndex {
    pub fn build(tree: &Node) -> Self {
        let mut parents = HashMap::with_capacity(tree.node_count());
        tree.walk(&mut |node, parent| {
            parents
                .entry(node.id.clone())
                .or_insert_with(|| parent.map(|p| p.id.clone()));
        });
        Self {
            root: Some(tree.id.clone()),
            parents,
        }
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.parents.contains_key(id)
    }

    pub fn is_root(&self, id: &NodeId) -> bool {
        self.root.as_ref() == Some(id)
    }

    pub fn parent_of(&self, id: &NodeId) -> Option<&NodeId> {
        self.parents.get(id).and_then(Option::as_ref)
    }

    /// Ids from the root down to `id`, inclusive. Empty if `id` is unknown.
    pub fn path_to(&self, id: &NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut path = vec![id.clone()];
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            path.push(parent.clone());
            current = parent;
        }
        path.reverse();
        path
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}
