//! Editor state for one open map.
//!
//! A [`Session`] is the single owner of the current tree. Every edit goes
//! through it, so the raw layout and parent index always describe the tree
//! that is stored in the map.

use crate::mindmap::{
    Applied, LayoutEngine, LayoutResult, MindMap, NodeId, Operation, Outcome, ParentIndex, Point,
    apply_operation, reconcile,
};
use crate::suggest::SuggestRequest;

/// Text of a node created by [`Session::add_child`].
pub const NEW_IDEA_TEXT: &str = "New Idea";
/// Color tag carried by nodes accepted from suggestions.
pub const SUGGESTION_COLOR: &str = "hsl(var(--accent))";

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 3.0;

#[derive(Debug, Clone)]
pub struct Session {
    map: MindMap,
    engine: LayoutEngine,
    layout: LayoutResult,
    index: ParentIndex,
    editing: Option<NodeId>,
    zoom: f32,
    offset: Point,
}

impl Session {
    pub fn new(mut map: MindMap, engine: LayoutEngine) -> Self {
        let layout = engine.layout(&map.root);
        let index = ParentIndex::build(&map.root);
        let selection_known = map
            .selected_node_id
            .as_ref()
            .is_some_and(|id| index.contains(id));
        if !selection_known {
            map.selected_node_id = Some(map.root.id.clone());
        }
        Self {
            map,
            engine,
            layout,
            index,
            editing: None,
            zoom: 1.0,
            offset: Point::new(0.0, 0.0),
        }
    }

    pub fn map(&self) -> &MindMap {
        &self.map
    }

    pub fn into_map(self) -> MindMap {
        self.map
    }

    /// The layout of the current tree, before manual overrides.
    pub fn layout(&self) -> &LayoutResult {
        &self.layout
    }

    pub fn index(&self) -> &ParentIndex {
        &self.index
    }

    pub fn selected(&self) -> Option<&NodeId> {
        self.map.selected_node_id.as_ref()
    }

    pub fn editing(&self) -> Option<&NodeId> {
        self.editing.as_ref()
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    /// What a renderer should draw: the layout with manual overrides applied.
    pub fn display(&self) -> LayoutResult {
        reconcile(&self.layout, &self.map.root)
    }

    /// Returns false, leaving the selection alone, for an unknown id.
    pub fn select(&mut self, id: &NodeId) -> bool {
        if !self.index.contains(id) {
            return false;
        }
        self.map.selected_node_id = Some(id.clone());
        true
    }

    pub fn click_canvas(&mut self) {
        self.map.selected_node_id = Some(self.map.root.id.clone());
        self.editing = None;
    }

    /// Appends a "New Idea" child, selects it and starts editing it.
    pub fn add_child(&mut self, parent: &NodeId) -> Outcome {
        let applied = self.apply(Operation::insert_child(parent.clone(), NEW_IDEA_TEXT));
        if let (Outcome::Applied, Some(id)) = (applied.outcome, applied.affected_id) {
            self.map.selected_node_id = Some(id.clone());
            self.editing = Some(id);
        }
        applied.outcome
    }

    pub fn finish_editing(&mut self, id: &NodeId, text: &str) -> Outcome {
        let outcome = self.apply(Operation::rename(id.clone(), text)).outcome;
        if self.editing.as_ref() == Some(id) {
            self.editing = None;
        }
        outcome
    }

    /// Removes `id` and its subtree, moving the selection to its parent.
    pub fn delete_node(&mut self, id: &NodeId) -> Outcome {
        if self.index.is_root(id) {
            tracing::debug!(node_id = %id, "root node cannot be deleted");
            return Outcome::RootProtected;
        }
        let applied = self.apply(Operation::delete(id.clone()));
        if applied.is_applied() {
            let parent = applied
                .affected_id
                .filter(|parent| self.index.contains(parent))
                .unwrap_or_else(|| self.map.root.id.clone());
            self.map.selected_node_id = Some(parent);
            if self.editing.as_ref().is_some_and(|e| !self.index.contains(e)) {
                self.editing = None;
            }
        }
        applied.outcome
    }

    /// Moves a node by a screen-space delta.
    pub fn drag_node(&mut self, id: &NodeId, dx: f32, dy: f32) -> Outcome {
        let (dx, dy) = (dx / self.zoom, dy / self.zoom);
        self.apply(Operation::reposition(id.clone(), dx, dy)).outcome
    }

    pub fn reset_position(&mut self, id: &NodeId) -> Outcome {
        self.apply(Operation::reset_position(id.clone())).outcome
    }

    pub fn zoom_by(&mut self, amount: f32) -> f32 {
        self.zoom = (self.zoom + amount).clamp(MIN_ZOOM, MAX_ZOOM);
        self.zoom
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.offset = Point::new(self.offset.x + dx, self.offset.y + dy);
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.map.title = title.into();
        self.map.touch();
    }

    /// Adds `text` as a child of `target`, tagged as a suggestion, and
    /// selects it.
    pub fn accept_suggestion(&mut self, target: &NodeId, text: &str) -> Outcome {
        let applied = self.apply(Operation::InsertChild {
            parent_id: target.clone(),
            text: text.to_string(),
            color: Some(SUGGESTION_COLOR.to_string()),
        });
        if let (Outcome::Applied, Some(id)) = (applied.outcome, applied.affected_id) {
            self.map.selected_node_id = Some(id);
        }
        applied.outcome
    }

    /// Node texts from the root down to `id`, joined with `" > "`.
    pub fn branch_context(&self, id: &NodeId) -> Option<String> {
        let path = self.index.path_to(id);
        if path.is_empty() {
            return None;
        }
        let texts: Vec<&str> = path
            .iter()
            .filter_map(|id| self.map.root.find(id))
            .map(|node| node.text.as_str())
            .collect();
        Some(texts.join(" > "))
    }

    /// A suggestion request for children of `id`, with the map title as
    /// context.
    pub fn suggest_request(&self, id: &NodeId, count: usize) -> Option<SuggestRequest> {
        let node = self.map.root.find(id)?;
        Some(SuggestRequest {
            parent_node_text: node.text.clone(),
            mind_map_context: Some(self.map.title.clone()),
            branch_context: self.branch_context(id),
            number_of_suggestions: count,
        })
    }

    fn apply(&mut self, op: Operation) -> Applied {
        let kind = op_name(&op);
        let applied = apply_operation(&self.map.root, op, Some(&self.layout));
        if applied.is_applied() {
            self.map.root = applied.tree.clone();
            self.map.touch();
            self.layout = self.engine.layout(&self.map.root);
            self.index = ParentIndex::build(&self.map.root);
            tracing::debug!(op = kind, nodes = self.index.len(), "applied edit");
        } else {
            tracing::debug!(op = kind, outcome = ?applied.outcome, "edit not applied");
        }
        applied
    }
}

fn op_name(op: &Operation) -> &'static str {
    match op {
        Operation::InsertChild { .. } => "insert",
        Operation::Rename { .. } => "rename",
        Operation::Delete { .. } => "delete",
        Operation::Reposition { .. } => "reposition",
        Operation::ResetPosition { .. } => "reset",
    }
}
