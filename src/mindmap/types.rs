use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Stable identifier of a node. Assigned once at creation and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random (v4 UUID) identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A node of the mind-map tree.
///
/// Children are held behind `Arc` so that edits can rebuild only the path from
/// the root to the changed node and share every untouched subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub text: String,
    #[serde(default)]
    pub children: Vec<Arc<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_new: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_y: Option<f32>,
}

impl Node {
    pub fn new(id: NodeId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            children: Vec::new(),
            color: None,
            is_new: false,
            manual_x: None,
            manual_y: None,
        }
    }

    /// A freshly created node: new id, `is_new` set, no children.
    pub fn fresh(text: impl Into<String>) -> Self {
        Self {
            is_new: true,
            ..Self::new(NodeId::generate(), text)
        }
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(Arc::new(child));
        self
    }

    /// Manual override as a point, if both coordinates are set.
    pub fn manual_position(&self) -> Option<(f32, f32)> {
        match (self.manual_x, self.manual_y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }

    /// Depth-first pre-order search returning the first node with `id`.
    pub fn find(&self, id: &NodeId) -> Option<&Node> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Child indices leading from `self` to the first node with `id`.
    /// An empty path designates `self`.
    pub fn find_path(&self, id: &NodeId) -> Option<Vec<usize>> {
        fn walk(node: &Node, id: &NodeId, path: &mut Vec<usize>) -> bool {
            if &node.id == id {
                return true;
            }
            for (index, child) in node.children.iter().enumerate() {
                path.push(index);
                if walk(child, id, path) {
                    return true;
                }
                path.pop();
            }
            false
        }

        let mut path = Vec::new();
        walk(self, id, &mut path).then_some(path)
    }

    /// Visits every node in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node, Option<&'a Node>)) {
        fn inner<'a>(
            node: &'a Node,
            parent: Option<&'a Node>,
            visit: &mut impl FnMut(&'a Node, Option<&'a Node>),
        ) {
            visit(node, parent);
            for child in &node.children {
                inner(child, Some(node), visit);
            }
        }
        inner(self, None, visit);
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }

    pub fn edge_count(&self) -> usize {
        self.node_count() - 1
    }

    /// Ids that occur more than once in the tree, in pre-order of their
    /// second occurrence. A well-formed tree returns an empty list.
    pub fn duplicate_ids(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        self.walk(&mut |node, _| {
            if !seen.insert(&node.id) && !duplicates.contains(&node.id) {
                duplicates.push(node.id.clone());
            }
        });
        duplicates
    }
}

/// A 2D point in layout coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A node with its computed placement. Derived on every layout pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaidOutNode {
    pub id: NodeId,
    pub text: String,
    pub color: Option<String>,
    pub is_new: bool,
    pub manual_x: Option<f32>,
    pub manual_y: Option<f32>,
    pub parent_id: Option<NodeId>,
    pub depth: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LaidOutNode {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Where outgoing connectors leave the node.
    pub fn exit_point(&self) -> Point {
        Point::new(self.right(), self.y + self.height / 2.0)
    }

    /// Where the incoming connector enters the node.
    pub fn entry_point(&self) -> Point {
        Point::new(self.x, self.y + self.height / 2.0)
    }
}

/// A parent to child connector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub from: Point,
    pub to: Point,
}

impl Connection {
    /// Connects `parent` to `child`, or `None` when either endpoint is not a
    /// finite coordinate.
    pub fn between(parent: &LaidOutNode, child: &LaidOutNode) -> Option<Self> {
        let from = parent.exit_point();
        let to = child.entry_point();
        if !from.is_finite() || !to.is_finite() {
            tracing::warn!(
                source = %parent.id,
                target = %child.id,
                "omitting connector with non-finite endpoints"
            );
            return None;
        }
        Some(Self {
            id: format!("{}-{}", parent.id, child.id),
            source_id: parent.id.clone(),
            target_id: child.id.clone(),
            from,
            to,
        })
    }
}

/// Output of a layout pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResult {
    pub nodes: Vec<LaidOutNode>,
    pub connections: Vec<Connection>,
    pub canvas_width: f32,
    pub canvas_height: f32,
}

impl LayoutResult {
    pub fn node(&self, id: &NodeId) -> Option<&LaidOutNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Position a node currently displays at. Each axis uses its manual
    /// override if set, otherwise the computed coordinate.
    pub fn effective_position(&self, id: &NodeId) -> Option<(f32, f32)> {
        self.node(id)
            .map(|n| (n.manual_x.unwrap_or(n.x), n.manual_y.unwrap_or(n.y)))
    }
}

/// A named, persisted mind map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMap {
    pub id: String,
    pub title: String,
    pub root: Arc<Node>,
    #[serde(default)]
    pub selected_node_id: Option<NodeId>,
    pub last_modified: u64,
}

pub const DEFAULT_MAP_TITLE: &str = "My New Mind Map";
pub const DEFAULT_ROOT_TEXT: &str = "Central Idea";

impl MindMap {
    pub fn new() -> Self {
        let root = Node::new(NodeId::generate(), DEFAULT_ROOT_TEXT);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: DEFAULT_MAP_TITLE.to_string(),
            selected_node_id: Some(root.id.clone()),
            root: Arc::new(root),
            last_modified: now_millis(),
        }
    }

    pub fn touch(&mut self) {
        self.last_modified = now_millis();
    }
}

impl Default for MindMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
