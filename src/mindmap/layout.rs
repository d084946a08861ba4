use super::geometry::Geometry;
use super::types::{Connection, LaidOutNode, LayoutResult, Node, NodeId, Point};

/// Top-left corner of the root node.
pub const ORIGIN: Point = Point { x: 50.0, y: 50.0 };

/// Smallest coordinate any node may have after normalization.
pub const MIN_MARGIN: f32 = 50.0;

/// Space added right of and below the furthest node.
pub const CANVAS_PADDING: f32 = 50.0;

/// Recentering shifts at or below this are treated as float noise.
const RECENTER_EPSILON: f32 = 0.01;

/// Space claimed by a node together with all of its descendants.
#[derive(Debug, Clone, Copy)]
struct Extent {
    height: f32,
    width: f32,
}

/// Tidy-tree layout for mind maps: the root sits on the left, every depth
/// level is a column to the right of its parent, siblings are stacked top to
/// bottom in child order and each parent is vertically centered on its
/// children.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    geometry: Geometry,
}

impl LayoutEngine {
    pub fn new(geometry: Geometry) -> Result<Self, String> {
        geometry.validate()?;
        Ok(Self { geometry })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Lays out the whole tree. Manual overrides are carried on the output
    /// nodes but do not affect `x`/`y`; see [`super::reconcile`].
    pub fn layout(&self, root: &Node) -> LayoutResult {
        let mut nodes = Vec::with_capacity(root.node_count());
        let mut parents = Vec::with_capacity(nodes.capacity());
        self.place(root, ORIGIN.x, ORIGIN.y, None, 0, &mut nodes, &mut parents);

        let connections = nodes
            .iter()
            .zip(&parents)
            .filter_map(|(child, &parent)| {
                parent.and_then(|index| Connection::between(&nodes[index], child))
            })
            .collect();

        let (canvas_width, canvas_height) = canvas_size(&nodes);
        let mut result = LayoutResult {
            nodes,
            connections,
            canvas_width,
            canvas_height,
        };
        normalize(&mut result);

        tracing::debug!(
            nodes = result.nodes.len(),
            connections = result.connections.len(),
            canvas_width = result.canvas_width,
            canvas_height = result.canvas_height,
            "computed mind map layout"
        );
        result
    }

    /// Places `node` with its top-left corner at (`x`, `y`) and its subtree
    /// below, appending in pre-order so a node's descendants always occupy the
    /// contiguous range right after it.
    #[allow(clippy::too_many_arguments)]
    fn place(
        &self,
        node: &Node,
        x: f32,
        y: f32,
        parent: Option<(usize, &NodeId)>,
        depth: usize,
        out: &mut Vec<LaidOutNode>,
        parents: &mut Vec<Option<usize>>,
    ) -> Extent {
        let width = self.geometry.node_width;
        let height = self.geometry.node_height(&node.text);
        let index = out.len();
        out.push(LaidOutNode {
            id: node.id.clone(),
            text: node.text.clone(),
            color: node.color.clone(),
            is_new: node.is_new,
            manual_x: node.manual_x,
            manual_y: node.manual_y,
            parent_id: parent.map(|(_, id)| id.clone()),
            depth,
            x,
            y,
            width,
            height,
        });
        parents.push(parent.map(|(parent_index, _)| parent_index));

        if node.children.is_empty() {
            return Extent { height, width };
        }

        let child_x = x + self.geometry.column_step();
        let mut offset = 0.0;
        let mut widest_child: f32 = 0.0;
        for child in &node.children {
            let extent = self.place(
                child,
                child_x,
                y + offset,
                Some((index, &node.id)),
                depth + 1,
                out,
                parents,
            );
            offset += extent.height + self.geometry.vertical_spacing;
            widest_child = widest_child.max(extent.width);
        }
        let block_height = offset - self.geometry.vertical_spacing;

        // Center the parent on its children block. Whichever of the two is
        // shorter moves down, so the subtree never leaves the band
        // [y, y + subtree height] reserved for it by the caller.
        let desired_y = y + block_height / 2.0 - height / 2.0;
        let shift = desired_y - y;
        if shift.abs() > RECENTER_EPSILON {
            if shift > 0.0 {
                out[index].y = desired_y;
            } else {
                for descendant in &mut out[index + 1..] {
                    descendant.y -= shift;
                }
            }
        }

        Extent {
            height: height.max(block_height),
            width: self.geometry.column_step() + widest_child,
        }
    }
}

/// Lays out `root` with the default geometry.
pub fn compute_layout(root: &Node) -> LayoutResult {
    LayoutEngine::default().layout(root)
}

fn canvas_size(nodes: &[LaidOutNode]) -> (f32, f32) {
    let width = nodes.iter().map(LaidOutNode::right).fold(0.0, f32::max);
    let height = nodes.iter().map(LaidOutNode::bottom).fold(0.0, f32::max);
    (width + CANVAS_PADDING, height + CANVAS_PADDING)
}

/// Shifts the whole layout so no node sits left of or above [`MIN_MARGIN`].
/// Returns whether anything moved.
fn normalize(result: &mut LayoutResult) -> bool {
    let min_x = result.nodes.iter().map(|n| n.x).fold(f32::INFINITY, f32::min);
    let min_y = result.nodes.iter().map(|n| n.y).fold(f32::INFINITY, f32::min);
    let shift_x = if min_x < MIN_MARGIN { MIN_MARGIN - min_x } else { 0.0 };
    let shift_y = if min_y < MIN_MARGIN { MIN_MARGIN - min_y } else { 0.0 };
    if shift_x == 0.0 && shift_y == 0.0 {
        return false;
    }

    for node in &mut result.nodes {
        node.x += shift_x;
        node.y += shift_y;
    }
    for connection in &mut result.connections {
        for point in [&mut connection.from, &mut connection.to] {
            point.x += shift_x;
            point.y += shift_y;
        }
    }
    (result.canvas_width, result.canvas_height) = canvas_size(&result.nodes);
    true
}
