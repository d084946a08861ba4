//! Mind-map tree model, layout and editing.

pub mod export;
mod geometry;
mod index;
mod layout;
mod ops;
mod reconcile;
mod render;
mod types;

#[cfg(test)]
mod testing;

pub use geometry::Geometry;
pub use index::ParentIndex;
pub use layout::{CANVAS_PADDING, LayoutEngine, MIN_MARGIN, ORIGIN, compute_layout};
pub use ops::{Applied, Operation, Outcome, apply_operation, insert_suggestions};
pub use reconcile::reconcile;
pub use render::{RenderStyle, render_svg};
pub use types::{
    Connection, DEFAULT_MAP_TITLE, DEFAULT_ROOT_TEXT, LaidOutNode, LayoutResult, MindMap, Node,
    NodeId, Point, now_millis,
};

/// Layout with manual overrides applied: what a renderer should draw.
pub fn layout_for_display(engine: &LayoutEngine, tree: &Node) -> LayoutResult {
    reconcile(&engine.layout(tree), tree)
}
