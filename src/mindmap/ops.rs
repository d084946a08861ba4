use std::sync::Arc;

use super::types::{LayoutResult, Node, NodeId};

/// A single edit of the node tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Append a new child at the end of `parent_id`'s children.
    InsertChild {
        parent_id: NodeId,
        text: String,
        color: Option<String>,
    },
    Rename {
        node_id: NodeId,
        text: String,
    },
    /// Remove a node together with its subtree. The root cannot be deleted.
    Delete { node_id: NodeId },
    /// Move a node by a delta given in layout coordinates.
    Reposition { node_id: NodeId, dx: f32, dy: f32 },
    /// Drop a node's manual override so it follows the computed layout again.
    ResetPosition { node_id: NodeId },
}

impl Operation {
    pub fn insert_child(parent_id: NodeId, text: impl Into<String>) -> Self {
        Self::InsertChild {
            parent_id,
            text: text.into(),
            color: None,
        }
    }

    pub fn rename(node_id: NodeId, text: impl Into<String>) -> Self {
        Self::Rename {
            node_id,
            text: text.into(),
        }
    }

    pub fn delete(node_id: NodeId) -> Self {
        Self::Delete { node_id }
    }

    pub fn reposition(node_id: NodeId, dx: f32, dy: f32) -> Self {
        Self::Reposition { node_id, dx, dy }
    }

    pub fn reset_position(node_id: NodeId) -> Self {
        Self::ResetPosition { node_id }
    }

    /// The node the operation looks up first.
    pub fn target(&self) -> &NodeId {
        match self {
            Self::InsertChild { parent_id, .. } => parent_id,
            Self::Rename { node_id, .. }
            | Self::Delete { node_id }
            | Self::Reposition { node_id, .. }
            | Self::ResetPosition { node_id } => node_id,
        }
    }
}

/// How an operation ended. Only `Applied` produces a new tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The target id is not in the tree.
    NotFound,
    /// Attempted to delete the root.
    RootProtected,
}

#[derive(Debug, Clone)]
pub struct Applied {
    pub tree: Arc<Node>,
    /// For inserts the new node, for deletes the removed node's parent,
    /// otherwise the edited node.
    pub affected_id: Option<NodeId>,
    pub outcome: Outcome,
}

impl Applied {
    fn unchanged(tree: &Arc<Node>, outcome: Outcome) -> Self {
        Self {
            tree: Arc::clone(tree),
            affected_id: None,
            outcome,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.outcome == Outcome::Applied
    }
}

/// Applies `op` to `tree` and returns the resulting tree.
///
/// The input is never modified. Only the nodes on the path from the root to
/// the edited node are copied; every other subtree is shared with the input.
/// When the operation does not apply, the returned tree is the very same
/// `Arc` as the input.
///
/// `last_layout` is the most recent layout of `tree`. It provides the starting
/// point of a [`Operation::Reposition`] for nodes without a manual override;
/// without it such nodes start from (0, 0).
pub fn apply_operation(
    tree: &Arc<Node>,
    op: Operation,
    last_layout: Option<&LayoutResult>,
) -> Applied {
    let Some(path) = tree.find_path(op.target()) else {
        tracing::debug!(target_id = %op.target(), "operation target not found");
        return Applied::unchanged(tree, Outcome::NotFound);
    };

    let (new_tree, affected_id) = match op {
        Operation::InsertChild {
            parent_id: _,
            text,
            color,
        } => {
            let mut child = Node::fresh(text);
            child.color = color;
            let child_id = child.id.clone();
            let tree = rebuild(tree, &path, |parent| parent.children.push(Arc::new(child)));
            (tree, child_id)
        }
        Operation::Rename { node_id, text } => {
            let tree = rebuild(tree, &path, |node| {
                node.text = text;
                node.is_new = false;
            });
            (tree, node_id)
        }
        Operation::Delete { node_id } => {
            let Some((&index, parent_path)) = path.split_last() else {
                tracing::debug!(node_id = %node_id, "refusing to delete the root node");
                return Applied::unchanged(tree, Outcome::RootProtected);
            };
            let parent_id = node_at(tree, parent_path).id.clone();
            let tree = rebuild(tree, parent_path, |parent| {
                parent.children.remove(index);
            });
            (tree, parent_id)
        }
        Operation::Reposition { node_id, dx, dy } => {
            let computed = last_layout
                .and_then(|layout| layout.node(&node_id))
                .map(|laid| (laid.x, laid.y))
                .unwrap_or((0.0, 0.0));
            let tree = rebuild(tree, &path, |node| {
                node.manual_x = Some(node.manual_x.unwrap_or(computed.0) + dx);
                node.manual_y = Some(node.manual_y.unwrap_or(computed.1) + dy);
                node.is_new = false;
            });
            (tree, node_id)
        }
        Operation::ResetPosition { node_id } => {
            let tree = rebuild(tree, &path, |node| {
                node.manual_x = None;
                node.manual_y = None;
            });
            (tree, node_id)
        }
    };

    Applied {
        tree: new_tree,
        affected_id: Some(affected_id),
        outcome: Outcome::Applied,
    }
}

/// Appends one child per suggestion under `target`, in order, each tagged
/// with `color`. Returns the new tree and the ids of the inserted nodes.
pub fn insert_suggestions<I>(
    tree: &Arc<Node>,
    target: &NodeId,
    suggestions: I,
    color: Option<&str>,
) -> (Arc<Node>, Vec<NodeId>)
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut current = Arc::clone(tree);
    let mut inserted = Vec::new();
    for text in suggestions {
        let applied = apply_operation(
            &current,
            Operation::InsertChild {
                parent_id: target.clone(),
                text: text.into(),
                color: color.map(str::to_string),
            },
            None,
        );
        if !applied.is_applied() {
            break;
        }
        current = applied.tree;
        inserted.extend(applied.affected_id);
    }
    (current, inserted)
}

fn node_at<'a>(tree: &'a Node, path: &[usize]) -> &'a Node {
    path.iter().fold(tree, |node, &index| &*node.children[index])
}

/// Copies the nodes along `path`, applying `edit` to the last one. Siblings
/// off the path are shared, not copied.
fn rebuild(node: &Arc<Node>, path: &[usize], edit: impl FnOnce(&mut Node)) -> Arc<Node> {
    let mut copy = Node::clone(node);
    match path.split_first() {
        None => edit(&mut copy),
        Some((&index, rest)) => {
            copy.children[index] = rebuild(&node.children[index], rest, edit);
        }
    }
    Arc::new(copy)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::mindmap::layout::compute_layout;
    use crate::mindmap::testing::{arb_tree, scenario_tree};

    #[test]
    fn insert_then_rename_new_idea() {
        let tree = Arc::new(Node::new("root".into(), "Central Idea"));

        let inserted = apply_operation(&tree, Operation::insert_child("root".into(), "New Idea"), None);
        assert_eq!(inserted.outcome, Outcome::Applied);
        let new_id = inserted.affected_id.clone().unwrap();
        assert_ne!(new_id, tree.id);
        assert_eq!(inserted.tree.children.len(), 1);
        let child = &inserted.tree.children[0];
        assert_eq!(child.id, new_id);
        assert_eq!(child.text, "New Idea");
        assert!(child.is_new);
        assert!(child.children.is_empty());

        let renamed = apply_operation(&inserted.tree, Operation::rename(new_id.clone(), "Renamed"), None);
        let child = renamed.tree.find(&new_id).unwrap();
        assert_eq!(child.text, "Renamed");
        assert!(!child.is_new);
        assert_eq!(renamed.tree.text, "Central Idea");
        // The input tree is untouched.
        assert_eq!(inserted.tree.children[0].text, "New Idea");
        assert!(inserted.tree.children[0].is_new);
    }

    #[test]
    fn inserts_append_in_order_with_fresh_ids() {
        let tree = Arc::new(scenario_tree());
        let first = apply_operation(&tree, Operation::insert_child("a".into(), "one"), None);
        let second = apply_operation(&first.tree, Operation::insert_child("a".into(), "two"), None);

        let a = second.tree.find(&"a".into()).unwrap();
        let texts: Vec<&str> = a.children.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["A1", "one", "two"]);
        assert_ne!(first.affected_id, second.affected_id);
        assert!(second.tree.duplicate_ids().is_empty());
    }

    #[test]
    fn missing_target_returns_same_tree() {
        let tree = Arc::new(scenario_tree());
        for op in [
            Operation::insert_child("ghost".into(), "x"),
            Operation::rename("ghost".into(), "x"),
            Operation::delete("ghost".into()),
            Operation::reposition("ghost".into(), 1.0, 1.0),
            Operation::reset_position("ghost".into()),
        ] {
            let applied = apply_operation(&tree, op, None);
            assert_eq!(applied.outcome, Outcome::NotFound);
            assert!(Arc::ptr_eq(&applied.tree, &tree));
            assert_eq!(applied.affected_id, None);
        }
    }

    #[test]
    fn delete_removes_subtree_and_reports_parent() {
        let tree = Arc::new(scenario_tree());

        let applied = apply_operation(&tree, Operation::delete("a1".into()), None);
        assert_eq!(applied.affected_id, Some(NodeId::from("a")));
        assert!(applied.tree.find(&"a1".into()).is_none());

        let applied = apply_operation(&tree, Operation::delete("a".into()), None);
        assert_eq!(applied.affected_id, Some(NodeId::from("root")));
        assert!(applied.tree.find(&"a".into()).is_none());
        assert!(applied.tree.find(&"a1".into()).is_none());
        assert_eq!(applied.tree.children.len(), 1);
        assert_eq!(applied.tree.children[0].id, NodeId::from("b"));
    }

    #[test]
    fn delete_root_is_rejected() {
        let tree = Arc::new(scenario_tree());
        let applied = apply_operation(&tree, Operation::delete("root".into()), None);
        assert_eq!(applied.outcome, Outcome::RootProtected);
        assert!(Arc::ptr_eq(&applied.tree, &tree));
    }

    #[test]
    fn edits_share_untouched_subtrees() {
        let tree = Arc::new(scenario_tree());
        let applied = apply_operation(&tree, Operation::rename("a1".into(), "changed"), None);

        assert!(Arc::ptr_eq(&applied.tree.children[1], &tree.children[1]));
        assert!(!Arc::ptr_eq(&applied.tree.children[0], &tree.children[0]));
        assert_eq!(tree.find(&"a1".into()).unwrap().text, "A1");
    }

    #[test]
    fn reposition_starts_from_layout_then_accumulates() {
        let tree = Arc::new(scenario_tree());
        let layout = compute_layout(&tree);
        let b = layout.node(&"b".into()).unwrap().clone();

        let moved = apply_operation(&tree, Operation::reposition("b".into(), 10.0, -5.0), Some(&layout));
        let node = moved.tree.find(&"b".into()).unwrap();
        assert_eq!(node.manual_position(), Some((b.x + 10.0, b.y - 5.0)));

        let layout = compute_layout(&moved.tree);
        let moved = apply_operation(&moved.tree, Operation::reposition("b".into(), 1.0, 2.0), Some(&layout));
        let node = moved.tree.find(&"b".into()).unwrap();
        assert_eq!(node.manual_position(), Some((b.x + 11.0, b.y - 3.0)));
    }

    #[test]
    fn reposition_and_rename_clear_new_flag() {
        let tree = Arc::new(Node::new("root".into(), "root"));
        let inserted = apply_operation(&tree, Operation::insert_child("root".into(), "n"), None);
        let id = inserted.affected_id.unwrap();

        let moved = apply_operation(&inserted.tree, Operation::reposition(id.clone(), 0.0, 0.0), None);
        assert!(!moved.tree.find(&id).unwrap().is_new);
    }

    #[test]
    fn manual_position_survives_structural_edits_until_reset() {
        let tree = Arc::new(scenario_tree());
        let moved = apply_operation(&tree, Operation::reposition("a1".into(), 5.0, 5.0), None);
        let grown = apply_operation(&moved.tree, Operation::insert_child("a".into(), "sibling"), None);
        let trimmed = apply_operation(&grown.tree, Operation::delete("b".into()), None);
        assert_eq!(
            trimmed.tree.find(&"a1".into()).unwrap().manual_position(),
            Some((5.0, 5.0))
        );

        let reset = apply_operation(&trimmed.tree, Operation::reset_position("a1".into()), None);
        assert_eq!(reset.tree.find(&"a1".into()).unwrap().manual_position(), None);
    }

    #[test]
    fn duplicate_ids_only_touch_first_match() {
        let tree = Arc::new(scenario_tree().with_child(Node::new("a1".into(), "second a1")));
        let applied = apply_operation(&tree, Operation::rename("a1".into(), "renamed"), None);

        assert_eq!(applied.tree.children[0].children[0].text, "renamed");
        assert_eq!(applied.tree.children[2].text, "second a1");
        assert_eq!(applied.tree.node_count(), tree.node_count());
    }

    #[test]
    fn suggestions_become_children_in_order() {
        let tree = Arc::new(scenario_tree());
        let (tree, ids) = insert_suggestions(&tree, &"b".into(), ["x", "y", "z"], Some("#ff9900"));

        assert_eq!(ids.len(), 3);
        let b = tree.find(&"b".into()).unwrap();
        let texts: Vec<&str> = b.children.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["x", "y", "z"]);
        assert!(b.children.iter().all(|c| c.color.as_deref() == Some("#ff9900") && c.is_new));

        let (same, none) = insert_suggestions(&tree, &"ghost".into(), ["x"], None);
        assert!(Arc::ptr_eq(&same, &tree));
        assert!(none.is_empty());
    }

    proptest! {
        #[test]
        fn delete_root_never_changes_tree(tree in arb_tree()) {
            let tree = Arc::new(tree);
            let root_id = tree.id.clone();
            let applied = apply_operation(&tree, Operation::delete(root_id), None);
            prop_assert!(Arc::ptr_eq(&applied.tree, &tree));
            prop_assert_eq!(applied.outcome, Outcome::RootProtected);
        }

        #[test]
        fn delete_drops_exactly_the_subtree(tree in arb_tree(), pick in any::<prop::sample::Index>()) {
            let tree = Arc::new(tree);
            let mut ids = Vec::new();
            tree.walk(&mut |node, _| ids.push(node.id.clone()));
            let target = &ids[pick.index(ids.len())];
            let removed = tree.find(target).unwrap().node_count();

            let applied = apply_operation(&tree, Operation::delete(target.clone()), None);
            if target == &tree.id {
                prop_assert_eq!(applied.outcome, Outcome::RootProtected);
            } else {
                prop_assert_eq!(applied.tree.node_count(), tree.node_count() - removed);
                prop_assert!(applied.tree.find(target).is_none());
            }
        }
    }
}
