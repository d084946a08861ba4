//! Mind-map editing core: a left-to-right tree layout, copy-on-write tree
//! edits with manual position overrides, and the pieces around them
//! (persistence, suggestions, rendering, export).

pub mod config;
pub mod logging;
pub mod mindmap;
pub mod output;
pub mod session;
pub mod store;
pub mod suggest;
pub mod theme;
