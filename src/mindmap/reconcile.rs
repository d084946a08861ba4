use std::collections::HashMap;

use super::layout::CANVAS_PADDING;
use super::types::{Connection, LaidOutNode, LayoutResult, Node, NodeId};

/// Overlays the manual overrides and current per-node data of `tree` on a
/// computed layout.
///
/// A node with `manual_x`/`manual_y` is displayed there; its descendants keep
/// their computed places. Connectors are rebuilt from the final positions and
/// the canvas only ever grows to fit nodes dragged beyond it.
pub fn reconcile(layout: &LayoutResult, tree: &Node) -> LayoutResult {
    let mut sources: HashMap<&NodeId, &Node> = HashMap::new();
    tree.walk(&mut |node, _| {
        sources.entry(&node.id).or_insert(node);
    });

    let nodes: Vec<LaidOutNode> = layout
        .nodes
        .iter()
        .map(|laid| {
            let mut node = laid.clone();
            if let Some(source) = sources.get(&laid.id) {
                node.text.clone_from(&source.text);
                node.color.clone_from(&source.color);
                node.is_new = source.is_new;
                node.manual_x = source.manual_x;
                node.manual_y = source.manual_y;
            }
            if let Some(x) = node.manual_x {
                node.x = x;
            }
            if let Some(y) = node.manual_y {
                node.y = y;
            }
            node
        })
        .collect();

    let mut positions: HashMap<&NodeId, usize> = HashMap::with_capacity(nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        positions.entry(&node.id).or_insert(index);
    }

    let connections = layout
        .connections
        .iter()
        .filter_map(|connection| {
            let source = positions.get(&connection.source_id);
            let target = positions.get(&connection.target_id);
            match (source, target) {
                (Some(&source), Some(&target)) => Connection::between(&nodes[source], &nodes[target]),
                _ => {
                    tracing::warn!(
                        connection = %connection.id,
                        "skipping connection whose endpoints are not laid out"
                    );
                    None
                }
            }
        })
        .collect();

    let right = nodes.iter().map(LaidOutNode::right).fold(0.0, f32::max);
    let bottom = nodes.iter().map(LaidOutNode::bottom).fold(0.0, f32::max);

    LayoutResult {
        canvas_width: layout.canvas_width.max(right + CANVAS_PADDING),
        canvas_height: layout.canvas_height.max(bottom + CANVAS_PADDING),
        nodes,
        connections,
    }
}
